//! Live-readable engine settings.
//!
//! The store re-reads every value on each insertion, so a provider may change
//! caps at runtime and the next insertion (or `enforce_limits`) catches up.

use crate::config::CoreConfig;
use crate::constants::{
    DEFAULT_MAX_MESSAGES_PER_GROUP, DEFAULT_MAX_MESSAGE_GROUPS, DUPLICATE_WINDOW_SECS,
    MULTIPART_WINDOW_SECS,
};
use std::sync::atomic::{AtomicUsize, Ordering};

pub trait SettingsProvider: Send + Sync {
    fn max_messages_per_group(&self) -> usize;
    fn max_message_groups(&self) -> usize;

    fn duplicate_window_secs(&self) -> f64 {
        DUPLICATE_WINDOW_SECS
    }

    fn multipart_window_secs(&self) -> f64 {
        MULTIPART_WINDOW_SECS
    }
}

/// Fixed settings, mostly for tests and embedding.
#[derive(Debug, Clone, Copy)]
pub struct StaticSettings {
    pub max_messages_per_group: usize,
    pub max_message_groups: usize,
}

impl StaticSettings {
    pub fn new(max_messages_per_group: usize, max_message_groups: usize) -> Self {
        Self {
            max_messages_per_group,
            max_message_groups,
        }
    }
}

impl Default for StaticSettings {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_MESSAGES_PER_GROUP, DEFAULT_MAX_MESSAGE_GROUPS)
    }
}

impl SettingsProvider for StaticSettings {
    fn max_messages_per_group(&self) -> usize {
        self.max_messages_per_group
    }

    fn max_message_groups(&self) -> usize {
        self.max_message_groups
    }
}

/// Caps that can be changed while the store is running (settings UI).
#[derive(Debug)]
pub struct LiveSettings {
    max_messages_per_group: AtomicUsize,
    max_message_groups: AtomicUsize,
    duplicate_window_secs: f64,
    multipart_window_secs: f64,
}

impl LiveSettings {
    pub fn new(max_messages_per_group: usize, max_message_groups: usize) -> Self {
        Self {
            max_messages_per_group: AtomicUsize::new(max_messages_per_group),
            max_message_groups: AtomicUsize::new(max_message_groups),
            duplicate_window_secs: DUPLICATE_WINDOW_SECS,
            multipart_window_secs: MULTIPART_WINDOW_SECS,
        }
    }

    pub fn from_config(config: &CoreConfig) -> Self {
        Self {
            duplicate_window_secs: config.duplicate_window_secs,
            multipart_window_secs: config.multipart_window_secs,
            ..Self::new(config.max_messages_per_group, config.max_message_groups)
        }
    }

    pub fn set_max_messages_per_group(&self, value: usize) {
        self.max_messages_per_group.store(value, Ordering::Relaxed);
    }

    pub fn set_max_message_groups(&self, value: usize) {
        self.max_message_groups.store(value, Ordering::Relaxed);
    }
}

impl SettingsProvider for LiveSettings {
    fn max_messages_per_group(&self) -> usize {
        self.max_messages_per_group.load(Ordering::Relaxed)
    }

    fn max_message_groups(&self) -> usize {
        self.max_message_groups.load(Ordering::Relaxed)
    }

    fn duplicate_window_secs(&self) -> f64 {
        self.duplicate_window_secs
    }

    fn multipart_window_secs(&self) -> f64 {
        self.multipart_window_secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_live_settings_update() {
        let settings = LiveSettings::new(10, 20);
        assert_eq!(settings.max_messages_per_group(), 10);
        settings.set_max_messages_per_group(3);
        settings.set_max_message_groups(4);
        assert_eq!(settings.max_messages_per_group(), 3);
        assert_eq!(settings.max_message_groups(), 4);
    }

    #[test]
    fn test_live_settings_from_config() {
        let config = CoreConfig {
            max_messages_per_group: 7,
            duplicate_window_secs: 2.5,
            ..CoreConfig::default()
        };
        let settings = LiveSettings::from_config(&config);
        assert_eq!(settings.max_messages_per_group(), 7);
        assert_eq!(settings.max_message_groups(), DEFAULT_MAX_MESSAGE_GROUPS);
        assert_eq!(settings.duplicate_window_secs(), 2.5);
    }
}
