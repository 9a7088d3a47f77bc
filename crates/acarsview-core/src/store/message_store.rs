use super::group_store::GroupStore;
use super::persistence::{FilePersistence, PersistencePort};
use super::read_store::{PendingWrite, ReadStore};
use crate::alerts::{AlertMatcher, NoAlerts, TermAlertMatcher};
use crate::config::CoreConfig;
use crate::constants::storage_keys;
use crate::events::{EvictionReport, IngestOutcome};
use crate::models::{AircraftPosition, Identifier, Message, MessageGroup, RawMessage};
use crate::settings::{LiveSettings, SettingsProvider};
use crate::stats::IngestStats;
use std::sync::Arc;

/// Facade over the group store and the read-state store.
///
/// Group data and read state are separate sub-stores: eviction never touches
/// read state and marking never touches groups. Unread counts are the only
/// place the two meet.
pub struct MessageStore {
    groups: GroupStore,
    read_state: ReadStore,
}

impl MessageStore {
    pub fn new(
        settings: Arc<dyn SettingsProvider>,
        matcher: Arc<dyn AlertMatcher>,
        persistence: Box<dyn PersistencePort>,
    ) -> Self {
        Self {
            groups: GroupStore::new(settings, matcher),
            read_state: ReadStore::new(persistence),
        }
    }

    /// Build a store from config: live caps, term matcher and file-backed read
    /// state under the data dir. The returned settings handle changes caps at
    /// runtime.
    pub fn from_config(config: &CoreConfig) -> (Self, Arc<LiveSettings>) {
        let settings = Arc::new(LiveSettings::from_config(config));
        let terms = TermAlertMatcher::new(&config.alert_terms, &config.ignore_terms);
        let matcher: Arc<dyn AlertMatcher> = if terms.is_empty() {
            tracing::debug!("no alert terms configured");
            Arc::new(NoAlerts)
        } else {
            Arc::new(terms)
        };
        let persistence = FilePersistence::new(&config.data_dir, storage_keys::READ_MESSAGES);
        tracing::info!(path = %persistence.path().display(), "read state location");

        let store = Self::new(settings.clone(), matcher, Box::new(persistence));
        (store, settings)
    }

    // ===== Ingestion =====

    pub fn add_message(&mut self, raw: RawMessage) -> IngestOutcome {
        self.groups.add_message(raw)
    }

    pub fn ingest(&mut self, message: Message) -> IngestOutcome {
        self.groups.ingest(message)
    }

    /// Drop every group at once. Read state is kept.
    pub fn clear_messages(&mut self) {
        let groups = self.groups.len();
        let messages = self.groups.message_count();
        self.groups.clear();
        tracing::info!(groups, messages, "cleared all messages");
    }

    pub fn enforce_limits(&mut self) -> EvictionReport {
        self.groups.enforce_limits()
    }

    pub fn update_position(
        &mut self,
        identifier: &Identifier,
        lat: f64,
        lon: f64,
        altitude: Option<i32>,
        timestamp: f64,
    ) -> bool {
        let position = AircraftPosition {
            lat,
            lon,
            altitude,
            timestamp,
        };
        self.groups.update_position(identifier, position)
    }

    // ===== Read state =====
    //
    // Each mutator has a `_deferred` twin returning the serialized state to
    // save, so a caller behind a lock can write it after releasing the lock.

    pub fn mark_read(&mut self, uid: &str) {
        self.read_state.mark_read(uid);
    }

    pub fn mark_read_deferred(&mut self, uid: &str) -> Option<PendingWrite> {
        self.read_state.mark_read_deferred(uid)
    }

    pub fn mark_many_read<I, S>(&mut self, uids: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.read_state.mark_many_read(uids)
    }

    pub fn mark_many_read_deferred<I, S>(&mut self, uids: I) -> (usize, Option<PendingWrite>)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.read_state.mark_many_read_deferred(uids)
    }

    /// Mark every currently held message read. Later arrivals stay unread.
    pub fn mark_all_read(&mut self) -> usize {
        flushed(self.mark_all_read_deferred())
    }

    pub fn mark_all_read_deferred(&mut self) -> (usize, Option<PendingWrite>) {
        let uids: Vec<String> = self.groups.messages().map(|m| m.uid.clone()).collect();
        self.read_state.mark_many_read_deferred(uids)
    }

    pub fn mark_all_alerts_read(&mut self) -> usize {
        flushed(self.mark_all_alerts_read_deferred())
    }

    pub fn mark_all_alerts_read_deferred(&mut self) -> (usize, Option<PendingWrite>) {
        let uids: Vec<String> = self
            .groups
            .messages()
            .filter(|m| m.is_alert)
            .map(|m| m.uid.clone())
            .collect();
        self.read_state.mark_many_read_deferred(uids)
    }

    pub fn reset_read_state(&mut self) {
        self.read_state.reset();
    }

    pub fn reset_read_state_deferred(&mut self) -> Option<PendingWrite> {
        self.read_state.reset_deferred()
    }

    pub fn is_read(&self, uid: &str) -> bool {
        self.read_state.is_read(uid)
    }

    pub fn unread_count(&self) -> usize {
        self.groups
            .messages()
            .filter(|m| !self.read_state.is_read(&m.uid))
            .count()
    }

    pub fn unread_alert_count(&self) -> usize {
        self.groups
            .messages()
            .filter(|m| m.is_alert && !self.read_state.is_read(&m.uid))
            .count()
    }

    // ===== Selectors =====

    /// Groups ordered by `last_updated`, newest first.
    pub fn groups(&self) -> Vec<&MessageGroup> {
        self.groups.groups()
    }

    pub fn group(&self, key: &str) -> Option<&MessageGroup> {
        self.groups.get_group(key)
    }

    pub fn group_for(&self, identifier: &Identifier) -> Option<&MessageGroup> {
        self.groups.group_for(identifier)
    }

    pub fn message(&self, uid: &str) -> Option<&Message> {
        self.groups.find_message(uid)
    }

    pub fn alert_count(&self) -> usize {
        self.groups.alert_count()
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub fn message_count(&self) -> usize {
        self.groups.message_count()
    }

    pub fn stats(&self) -> &IngestStats {
        self.groups.stats()
    }

    pub fn reset_stats(&mut self) {
        self.groups.reset_stats();
    }

    pub fn reset_alert_term_hits(&mut self) {
        self.groups.reset_alert_term_hits();
    }
}

fn flushed((count, write): (usize, Option<PendingWrite>)) -> usize {
    if let Some(write) = write {
        write.flush();
    }
    count
}
