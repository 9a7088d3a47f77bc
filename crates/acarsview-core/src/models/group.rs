use super::message::{Identifier, Message};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Latest correlated ADS-B position for an aircraft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AircraftPosition {
    pub lat: f64,
    pub lon: f64,
    pub altitude: Option<i32>,
    pub timestamp: f64,
}

/// All messages held for one aircraft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageGroup {
    pub key: String,
    /// Identifier the key was taken from. None for single-message UID groups.
    pub key_identifier: Option<Identifier>,
    /// Every identifier ever seen for this aircraft
    pub identifiers: BTreeSet<Identifier>,
    /// Newest first
    pub messages: Vec<Message>,
    /// Max timestamp of the retained messages
    pub last_updated: f64,
    pub has_alerts: bool,
    pub alert_count: usize,
    pub position: Option<AircraftPosition>,
}

impl MessageGroup {
    pub fn new(key: String, key_identifier: Option<Identifier>) -> Self {
        Self {
            key,
            key_identifier,
            identifiers: BTreeSet::new(),
            messages: Vec::new(),
            last_updated: 0.0,
            has_alerts: false,
            alert_count: 0,
            position: None,
        }
    }

    pub fn key_rank(&self) -> u8 {
        self.key_identifier.as_ref().map(Identifier::rank).unwrap_or(0)
    }

    pub fn get_message(&self, uid: &str) -> Option<&Message> {
        self.messages.iter().find(|m| m.uid == uid)
    }

    /// Insert keeping newest-first order. Returns the position used.
    pub(crate) fn insert_sorted(&mut self, message: Message) -> usize {
        if message.is_alert {
            self.alert_count += 1;
        }
        let pos = self
            .messages
            .partition_point(|m| m.timestamp >= message.timestamp);
        self.messages.insert(pos, message);
        self.refresh();
        pos
    }

    /// Restore newest-first order after a message's timestamp moved.
    pub(crate) fn resort(&mut self) {
        self.messages
            .sort_by(|a, b| b.timestamp.total_cmp(&a.timestamp));
        self.refresh();
    }

    /// Drop the oldest messages until at most `cap` remain.
    pub(crate) fn truncate_oldest(&mut self, cap: usize) -> Vec<Message> {
        if self.messages.len() <= cap {
            return Vec::new();
        }
        let dropped = self.messages.split_off(cap);
        let dropped_alerts = dropped.iter().filter(|m| m.is_alert).count();
        self.alert_count -= dropped_alerts;
        self.refresh();
        dropped
    }

    /// Absorb another group's messages and identifiers.
    pub(crate) fn absorb(&mut self, other: MessageGroup) {
        self.identifiers.extend(other.identifiers);
        self.alert_count += other.alert_count;
        self.messages.extend(other.messages);
        let newer_position = match (&self.position, &other.position) {
            (None, Some(_)) => true,
            (Some(ours), Some(theirs)) => theirs.timestamp > ours.timestamp,
            _ => false,
        };
        if newer_position {
            self.position = other.position;
        }
        self.resort();
    }

    /// Re-derive `last_updated` and `has_alerts` from the held messages and tally.
    pub(crate) fn refresh(&mut self) {
        self.last_updated = self
            .messages
            .iter()
            .map(|m| m.timestamp)
            .fold(0.0, f64::max);
        self.has_alerts = self.alert_count > 0;
    }

    /// Count alert messages from scratch. Used to verify the incremental tally.
    pub fn recount_alerts(&self) -> usize {
        self.messages.iter().filter(|m| m.is_alert).count()
    }
}
