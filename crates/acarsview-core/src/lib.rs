pub mod alerts;
pub mod config;
pub mod constants;
pub mod events;
pub mod models;
pub mod settings;
pub mod stats;
pub mod store;
pub mod tracing_setup;

#[cfg(test)]
mod test_support;

pub use alerts::{AlertMatcher, NoAlerts, TermAlertMatcher};
pub use config::CoreConfig;
pub use events::{EvictionReport, IngestKind, IngestOutcome};
pub use models::{Identifier, Message, MessageGroup, MessageSource, RawMessage};
pub use settings::{LiveSettings, SettingsProvider, StaticSettings};
pub use stats::IngestStats;
pub use store::{MessageStore, SharedMessageStore};
