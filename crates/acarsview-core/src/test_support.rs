use crate::models::{Message, RawMessage};

/// Raw message with a distinct body so fingerprints never collide by accident.
pub fn raw(uid: &str, timestamp: f64) -> RawMessage {
    RawMessage {
        uid: Some(uid.to_string()),
        timestamp: Some(serde_json::json!(timestamp)),
        source: Some("ACARS".to_string()),
        text: Some(format!("BODY {uid}")),
        ..Default::default()
    }
}

pub fn raw_flight(uid: &str, timestamp: f64, flight: &str) -> RawMessage {
    RawMessage {
        flight: Some(flight.to_string()),
        ..raw(uid, timestamp)
    }
}

pub fn raw_fragment(uid: &str, timestamp: f64, flight: &str, msgno: &str, text: &str) -> RawMessage {
    RawMessage {
        msgno: Some(msgno.to_string()),
        text: Some(text.to_string()),
        ..raw_flight(uid, timestamp, flight)
    }
}

pub fn message(uid: &str, timestamp: f64) -> Message {
    raw(uid, timestamp).into_message(timestamp)
}
