//! Application-wide constants
//!
//! Defaults for the aggregation caps and timing windows, plus the storage
//! keys used by the persistence port.

/// Default cap on messages retained per aircraft group
pub const DEFAULT_MAX_MESSAGES_PER_GROUP: usize = 50;

/// Default cap on the number of aircraft groups held in memory
pub const DEFAULT_MAX_MESSAGE_GROUPS: usize = 50;

/// Two messages with the same fingerprint closer together than this are the
/// same transmission seen by redundant receivers.
pub const DUPLICATE_WINDOW_SECS: f64 = 10.0;

/// Parts of one multi-part transmission arrive back to back; a part further
/// than this from the newest part already held starts a new logical message.
pub const MULTIPART_WINDOW_SECS: f64 = 8.0;

/// Prefix for the key of a group built around a message with no identifiers
pub const UID_GROUP_PREFIX: &str = "uid:";

/// Data directory name under the platform data dir
pub const DATA_DIR_NAME: &str = "acarsview";

/// Environment variable that enables debug file logging
pub const LOG_FILE_ENV: &str = "ACARSVIEW_LOG_FILE";

// Storage keys for the persistence port
pub mod storage_keys {
    /// Flat JSON array of message UIDs the operator has read
    pub const READ_MESSAGES: &str = "read_messages";
}
