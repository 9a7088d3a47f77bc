/// What `add_message` did with one inbound message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestKind {
    /// Stored as a new message
    Inserted,
    /// Folded into an existing multi-part message
    Merged,
    /// Redundant copy; only the repeat counter of the held message moved
    Duplicate,
}

/// Diff produced by one ingestion, for callers that mirror the store elsewhere
#[derive(Debug, Clone, PartialEq)]
pub struct IngestOutcome {
    pub kind: IngestKind,
    /// UID of the message that now carries the data
    pub uid: String,
    /// Key of the group the message landed in
    pub group_key: String,
    /// Old keys folded into `group_key` by a re-key
    pub rekeyed_from: Vec<String>,
    /// UIDs dropped by the per-group cap
    pub dropped_messages: Vec<String>,
    /// Keys of groups evicted by the total-group cap
    pub evicted_groups: Vec<String>,
}

impl IngestOutcome {
    pub(crate) fn new(kind: IngestKind, uid: String, group_key: String) -> Self {
        Self {
            kind,
            uid,
            group_key,
            rekeyed_from: Vec::new(),
            dropped_messages: Vec::new(),
            evicted_groups: Vec::new(),
        }
    }

    /// Whether the message is still held after the caps were enforced
    pub fn retained(&self) -> bool {
        !self.evicted_groups.contains(&self.group_key) && !self.dropped_messages.contains(&self.uid)
    }
}

/// What an explicit `enforce_limits` pass removed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvictionReport {
    pub dropped_messages: Vec<String>,
    pub evicted_groups: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retained() {
        let mut outcome = IngestOutcome::new(IngestKind::Inserted, "u1".to_string(), "UAL123".to_string());
        assert!(outcome.retained());

        outcome.dropped_messages.push("u1".to_string());
        assert!(!outcome.retained());

        outcome.dropped_messages.clear();
        outcome.evicted_groups.push("UAL123".to_string());
        assert!(!outcome.retained());
    }
}
