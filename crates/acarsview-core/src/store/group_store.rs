use super::{dedupe, group_key, multipart};
use crate::alerts::AlertMatcher;
use crate::events::{EvictionReport, IngestKind, IngestOutcome};
use crate::models::{unix_now, AircraftPosition, Identifier, Message, MessageGroup, RawMessage};
use crate::settings::SettingsProvider;
use crate::stats::IngestStats;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Bounded per-aircraft aggregation.
///
/// Every mutation runs to completion before returning: dedupe, re-key,
/// reassemble or insert, then both caps. The alert tally is kept in step with
/// each of those moves rather than recomputed.
pub struct GroupStore {
    groups: HashMap<String, MessageGroup>,
    /// Identifier -> key of the group that owns it
    identifier_index: HashMap<Identifier, String>,
    held_uids: HashSet<String>,
    alert_count: usize,
    stats: IngestStats,
    settings: Arc<dyn SettingsProvider>,
    matcher: Arc<dyn AlertMatcher>,
    /// Per-group cap seen by the previous sweep; a lower value means every
    /// group has to be trimmed, not just the one being touched.
    last_group_cap: usize,
}

impl GroupStore {
    pub fn new(settings: Arc<dyn SettingsProvider>, matcher: Arc<dyn AlertMatcher>) -> Self {
        let last_group_cap = settings.max_messages_per_group();
        Self {
            groups: HashMap::new(),
            identifier_index: HashMap::new(),
            held_uids: HashSet::new(),
            alert_count: 0,
            stats: IngestStats::new(),
            settings,
            matcher,
            last_group_cap,
        }
    }

    pub fn clear(&mut self) {
        self.groups.clear();
        self.identifier_index.clear();
        self.held_uids.clear();
        self.alert_count = 0;
        self.assert_invariants();
    }

    // ===== Getters =====

    /// Groups ordered by most recent activity first
    pub fn groups(&self) -> Vec<&MessageGroup> {
        let mut groups: Vec<_> = self.groups.values().collect();
        groups.sort_by(|a, b| {
            b.last_updated
                .total_cmp(&a.last_updated)
                .then_with(|| a.key.cmp(&b.key))
        });
        groups
    }

    pub fn get_group(&self, key: &str) -> Option<&MessageGroup> {
        self.groups.get(key)
    }

    pub fn group_for(&self, identifier: &Identifier) -> Option<&MessageGroup> {
        self.identifier_index
            .get(identifier)
            .and_then(|key| self.groups.get(key))
    }

    pub fn find_message(&self, uid: &str) -> Option<&Message> {
        if !self.held_uids.contains(uid) {
            return None;
        }
        self.groups.values().find_map(|g| g.get_message(uid))
    }

    pub fn contains_message(&self, uid: &str) -> bool {
        self.held_uids.contains(uid)
    }

    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.groups.values().flat_map(|g| g.messages.iter())
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn message_count(&self) -> usize {
        self.held_uids.len()
    }

    pub fn alert_count(&self) -> usize {
        self.alert_count
    }

    pub fn stats(&self) -> &IngestStats {
        &self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats.reset();
    }

    pub fn reset_alert_term_hits(&mut self) {
        self.stats.reset_alert_term_hits();
    }

    // ===== Mutations =====

    pub fn add_message(&mut self, raw: RawMessage) -> IngestOutcome {
        self.ingest(raw.into_message(unix_now()))
    }

    /// Ingest an already validated message.
    pub fn ingest(&mut self, mut message: Message) -> IngestOutcome {
        self.stats.record_received(message.source);

        let identifiers = message.identifiers();
        let matched = group_key::matching_groups(&identifiers, &self.identifier_index);

        if let Some((uid, key)) = self.suppress_duplicate(&message, &matched) {
            // A lowered cap still catches up while only duplicates arrive
            let report = self.sweep(Some(&key));
            let mut outcome = IngestOutcome::new(IngestKind::Duplicate, uid, key);
            outcome.dropped_messages = report.dropped_messages;
            outcome.evicted_groups = report.evicted_groups;
            self.assert_invariants();
            return outcome;
        }

        if self.held_uids.contains(&message.uid) {
            let fresh = uuid::Uuid::new_v4().to_string();
            tracing::warn!(uid = %message.uid, replacement = %fresh, "uid already held, assigning a new one");
            message.uid = fresh;
        }

        // Re-key completes before any cap is looked at
        let resolution = group_key::resolve_key(&message, &identifiers, &matched, &self.groups);
        let rekeyed_from = self.fold_groups(&resolution);
        let key = resolution.key;

        let group = self
            .groups
            .entry(key.clone())
            .or_insert_with(|| MessageGroup::new(key.clone(), resolution.key_identifier.clone()));
        for id in identifiers {
            self.identifier_index.insert(id.clone(), key.clone());
            group.identifiers.insert(id);
        }

        let merge_target = if multipart::is_fragment(&message) {
            multipart::find_merge_target(&message, group, self.settings.multipart_window_secs())
        } else {
            None
        };

        let mut outcome = match merge_target {
            Some(idx) => {
                let held = &mut group.messages[idx];
                let was_alert = held.is_alert;
                let terms_before = held.matched_terms.len();
                let merged = multipart::merge(held, message);
                debug_assert!(merged, "merge target already held the part");
                let alert = self.matcher.evaluate(held);
                held.apply_alert(alert);
                if held.is_alert && !was_alert {
                    group.alert_count += 1;
                    self.alert_count += 1;
                }
                // apply_alert only appends, so new terms sit at the tail
                self.stats
                    .record_alert_terms(&held.matched_terms[terms_before..]);
                let uid = held.uid.clone();
                group.resort();
                self.stats.merged_parts += 1;
                tracing::debug!(uid = %uid, group = %key, "merged message part");
                IngestOutcome::new(IngestKind::Merged, uid, key.clone())
            }
            None => {
                let alert = self.matcher.evaluate(&message);
                message.apply_alert(alert);
                if message.is_alert {
                    self.alert_count += 1;
                }
                self.stats.record_alert_terms(&message.matched_terms);
                let uid = message.uid.clone();
                self.held_uids.insert(uid.clone());
                group.insert_sorted(message);
                tracing::debug!(uid = %uid, group = %key, "inserted message");
                IngestOutcome::new(IngestKind::Inserted, uid, key.clone())
            }
        };

        outcome.rekeyed_from = rekeyed_from;
        let report = self.sweep(Some(&key));
        outcome.dropped_messages = report.dropped_messages;
        outcome.evicted_groups = report.evicted_groups;

        self.assert_invariants();
        outcome
    }

    /// Apply the current caps to every group. Call after lowering a cap to
    /// shrink immediately instead of on the next ingested message.
    pub fn enforce_limits(&mut self) -> EvictionReport {
        let report = self.sweep(None);
        self.assert_invariants();
        report
    }

    /// Attach the latest ADS-B position to whichever group owns `identifier`.
    /// Returns false when no group does.
    pub fn update_position(&mut self, identifier: &Identifier, position: AircraftPosition) -> bool {
        let Some(group) = self
            .identifier_index
            .get(identifier)
            .and_then(|key| self.groups.get_mut(key))
        else {
            return false;
        };

        let newer = group
            .position
            .as_ref()
            .is_none_or(|current| position.timestamp >= current.timestamp);
        if newer {
            group.position = Some(position);
        }
        true
    }

    // ===== Internals =====

    /// Find a held copy of `message` in any group it would join and bump its
    /// repeat counter. Returns the held UID and its group key.
    fn suppress_duplicate(&mut self, message: &Message, matched: &[String]) -> Option<(String, String)> {
        let window = self.settings.duplicate_window_secs();
        let reassembly_window = self.settings.multipart_window_secs();

        for key in matched {
            let Some(group) = self.groups.get_mut(key) else {
                continue;
            };
            let found = dedupe::find_duplicate(message, group, window)
                .or_else(|| dedupe::find_repeated_part(message, group, reassembly_window));
            if let Some(idx) = found {
                let held = &mut group.messages[idx];
                held.duplicates += 1;
                self.stats.duplicates += 1;
                tracing::debug!(
                    uid = %held.uid,
                    group = %key,
                    repeats = held.duplicates,
                    "duplicate suppressed"
                );
                return Some((held.uid.clone(), key.clone()));
            }
        }
        None
    }

    /// Move every group named by the resolution under its key. Returns the old
    /// keys that went away.
    fn fold_groups(&mut self, resolution: &group_key::KeyResolution) -> Vec<String> {
        let mut folded: Option<MessageGroup> = None;
        let mut rekeyed_from = Vec::new();

        for old_key in &resolution.fold {
            let Some(group) = self.groups.remove(old_key) else {
                continue;
            };
            if *old_key != resolution.key {
                rekeyed_from.push(old_key.clone());
            }
            match folded.as_mut() {
                Some(target) => target.absorb(group),
                None => folded = Some(group),
            }
        }

        if let Some(mut group) = folded {
            group.key = resolution.key.clone();
            group.key_identifier = resolution.key_identifier.clone();
            for id in &group.identifiers {
                self.identifier_index
                    .insert(id.clone(), resolution.key.clone());
            }
            self.groups.insert(resolution.key.clone(), group);
        }

        if !rekeyed_from.is_empty() {
            self.stats.rekeys += 1;
            tracing::debug!(from = ?rekeyed_from, to = %resolution.key, "re-keyed group");
        }

        rekeyed_from
    }

    /// Enforce the per-group cap (on `touched`, or everywhere when the cap shrank
    /// or no group is named) and then the total-group cap.
    fn sweep(&mut self, touched: Option<&str>) -> EvictionReport {
        let mut report = EvictionReport::default();
        let per_group = self.settings.max_messages_per_group().max(1);
        let max_groups = self.settings.max_message_groups().max(1);

        let keys: Vec<String> = match touched {
            Some(key) if per_group >= self.last_group_cap => vec![key.to_string()],
            _ => self.groups.keys().cloned().collect(),
        };
        self.last_group_cap = per_group;

        for key in keys {
            let Some(group) = self.groups.get_mut(&key) else {
                continue;
            };
            for dropped in group.truncate_oldest(per_group) {
                if dropped.is_alert {
                    self.alert_count -= 1;
                }
                self.held_uids.remove(&dropped.uid);
                report.dropped_messages.push(dropped.uid);
            }
        }
        self.stats.dropped_messages += report.dropped_messages.len() as u64;

        if self.groups.len() > max_groups {
            let mut by_age: Vec<(f64, String)> = self
                .groups
                .values()
                .map(|g| (g.last_updated, g.key.clone()))
                .collect();
            by_age.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(&b.1)));

            let excess = self.groups.len() - max_groups;
            for (_, key) in by_age.into_iter().take(excess) {
                self.remove_group(&key);
                report.evicted_groups.push(key);
            }
            self.stats.evicted_groups += report.evicted_groups.len() as u64;
            tracing::info!(evicted = ?report.evicted_groups, "evicted least recently updated groups");
        }

        report
    }

    fn remove_group(&mut self, key: &str) {
        let Some(group) = self.groups.remove(key) else {
            return;
        };
        self.alert_count -= group.alert_count;
        for id in &group.identifiers {
            if self.identifier_index.get(id).is_some_and(|k| k == key) {
                self.identifier_index.remove(id);
            }
        }
        for message in &group.messages {
            self.held_uids.remove(&message.uid);
        }
    }

    /// Bookkeeping checks; a failure here is a bug in this module, not bad input.
    fn assert_invariants(&self) {
        if !cfg!(debug_assertions) {
            return;
        }

        let mut total_alerts = 0;
        let mut total_messages = 0;
        for (key, group) in &self.groups {
            debug_assert_eq!(&group.key, key, "group stored under foreign key");
            debug_assert_eq!(group.alert_count, group.recount_alerts(), "group alert tally drift in {key}");
            debug_assert_eq!(group.has_alerts, group.alert_count > 0);
            for id in &group.identifiers {
                debug_assert_eq!(self.identifier_index.get(id), Some(key), "identifier index drift for {id:?}");
            }
            total_alerts += group.alert_count;
            total_messages += group.messages.len();
        }
        debug_assert_eq!(self.alert_count, total_alerts, "store alert tally drift");
        debug_assert_eq!(self.held_uids.len(), total_messages, "held uid set drift");
    }
}
