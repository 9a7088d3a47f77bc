use crate::models::MessageSource;
use serde::Serialize;
use std::collections::HashMap;

/// Counters for what the store did with the messages it was fed
#[derive(Debug, Default, Clone, Serialize)]
pub struct IngestStats {
    /// Messages received, by decoder family
    pub received_by_source: HashMap<MessageSource, u64>,
    /// Total messages received
    pub received: u64,
    pub duplicates: u64,
    /// Fragments folded into an existing multi-part message
    pub merged_parts: u64,
    /// Messages dropped by the per-group cap
    pub dropped_messages: u64,
    /// Groups removed by the total-group cap
    pub evicted_groups: u64,
    pub rekeys: u64,
    /// Messages matched per alert term, counted once per message
    pub alert_term_hits: HashMap<String, u64>,
}

impl IngestStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_received(&mut self, source: MessageSource) {
        self.received += 1;
        *self.received_by_source.entry(source).or_insert(0) += 1;
    }

    /// Decoder families sorted by message count (descending)
    pub fn sources_by_count(&self) -> Vec<(MessageSource, u64)> {
        let mut sources: Vec<_> = self
            .received_by_source
            .iter()
            .map(|(&s, &c)| (s, c))
            .collect();
        sources.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        sources
    }

    pub fn record_alert_terms(&mut self, terms: &[String]) {
        for term in terms {
            *self.alert_term_hits.entry(term.clone()).or_insert(0) += 1;
        }
    }

    /// Alert terms sorted by hit count (descending), then by term
    pub fn alert_terms_by_count(&self) -> Vec<(&str, u64)> {
        let mut terms: Vec<_> = self
            .alert_term_hits
            .iter()
            .map(|(t, &c)| (t.as_str(), c))
            .collect();
        terms.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
        terms
    }

    /// Zero the alert term counters only
    pub fn reset_alert_term_hits(&mut self) {
        self.alert_term_hits.clear();
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
