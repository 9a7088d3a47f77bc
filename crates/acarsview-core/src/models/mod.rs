pub mod group;
pub mod message;
pub mod raw;

pub use group::{AircraftPosition, MessageGroup};
pub use message::{
    unix_now, AlertMatch, Identifier, Message, MessagePart, MessageSource, MultiPartInfo,
};
pub use raw::RawMessage;
