//! Decoder boundary.
//!
//! `RawMessage` mirrors the loosely-typed JSON emitted by the decoders and the
//! web backend. Everything is optional here; `into_message` validates once and
//! produces a `Message` the engine can trust.

use super::message::{Message, MessagePart, MessageSource, MultiPartInfo};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawMessage {
    #[serde(default)]
    pub uid: Option<String>,
    /// Seconds since the epoch, as a number or numeric string
    #[serde(default, alias = "time")]
    pub timestamp: Option<Value>,
    #[serde(default, alias = "message_type", alias = "source_type")]
    pub source: Option<String>,
    #[serde(default)]
    pub station_id: Option<String>,
    #[serde(default)]
    pub flight: Option<String>,
    #[serde(default)]
    pub tail: Option<String>,
    /// Decimal 24-bit address as sent by acarsdec/dumpvdl2
    #[serde(default)]
    pub icao: Option<Value>,
    #[serde(default)]
    pub icao_hex: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default, alias = "msg_text")]
    pub text: Option<String>,
    #[serde(default)]
    pub libacars: Option<Value>,
    #[serde(default, alias = "freq")]
    pub frequency: Option<f64>,
    #[serde(default)]
    pub msgno: Option<String>,
}

impl RawMessage {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Validate and normalize into an engine `Message`.
    ///
    /// Missing or unparseable timestamps fall back to `received_at`, a missing
    /// UID is generated, blank strings are treated as absent and identifiers
    /// are trimmed and upper-cased.
    pub fn into_message(self, received_at: f64) -> Message {
        let timestamp = self
            .timestamp
            .as_ref()
            .and_then(parse_timestamp)
            .unwrap_or_else(|| {
                tracing::debug!("message without usable timestamp, using receive time");
                received_at
            });

        let uid = non_blank(self.uid).unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        let icao_hex = normalize_identifier(self.icao_hex)
            .or_else(|| self.icao.as_ref().and_then(icao_to_hex));

        let libacars = self.libacars.and_then(|v| match v {
            Value::Null => None,
            Value::String(s) => non_blank(Some(s)),
            other => Some(other.to_string()),
        });

        let msgno = non_blank(self.msgno).map(|m| m.trim().to_string());
        let multipart = msgno.as_deref().and_then(MultiPartInfo::parse);
        if msgno.is_some() && multipart.is_none() {
            tracing::debug!(msgno = ?msgno, "unparseable message number, treating as single message");
        }

        let mut message = Message {
            uid,
            timestamp,
            source: self
                .source
                .as_deref()
                .map(MessageSource::from_tag)
                .unwrap_or(MessageSource::Unknown),
            station_id: non_blank(self.station_id),
            flight: normalize_identifier(self.flight),
            tail: normalize_identifier(self.tail),
            icao_hex,
            label: non_blank(self.label),
            text: non_blank(self.text),
            libacars,
            frequency: self.frequency,
            msgno,
            multipart,
            parts: Vec::new(),
            is_alert: false,
            matched_terms: Vec::new(),
            duplicates: 0,
            fingerprint: String::new(),
        };

        message.fingerprint = message.compute_fingerprint();

        if let (Some(info), Some(msgno)) = (&message.multipart, &message.msgno) {
            message.parts.push(MessagePart {
                index: info.part,
                msgno: msgno.clone(),
                text: message.text.clone().unwrap_or_default(),
                timestamp,
                fingerprint: message.fingerprint.clone(),
            });
        }

        message
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn normalize_identifier(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().trim_start_matches('.').to_ascii_uppercase())
        .filter(|v| !v.is_empty())
}

fn parse_timestamp(value: &Value) -> Option<f64> {
    let ts = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    (ts.is_finite() && ts > 0.0).then_some(ts)
}

fn icao_to_hex(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => n.as_u64().map(|n| format!("{n:06X}")),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                None
            } else if let Ok(n) = s.parse::<u64>() {
                Some(format!("{n:06X}"))
            } else if s.chars().all(|c| c.is_ascii_hexdigit()) {
                Some(s.to_ascii_uppercase())
            } else {
                None
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_acarshub_json() {
        let json = r#"{
            "timestamp": 1700000000.25,
            "station_id": "KSEA-1",
            "message_type": "VDL-M2",
            "flight": " ual123 ",
            "tail": ".N12345",
            "icao": 10597059,
            "label": "H1",
            "msg_text": "HELLO",
            "msgno": "M01A",
            "freq": 136.975
        }"#;

        let message = RawMessage::from_json(json).unwrap().into_message(5.0);

        assert_eq!(message.timestamp, 1700000000.25);
        assert_eq!(message.source, MessageSource::Vdlm2);
        assert_eq!(message.flight.as_deref(), Some("UAL123"));
        assert_eq!(message.tail.as_deref(), Some("N12345"));
        assert_eq!(message.icao_hex.as_deref(), Some("A1B2C3"));
        assert_eq!(message.text.as_deref(), Some("HELLO"));
        assert_eq!(message.frequency, Some(136.975));
        assert!(message.is_fragment());
        assert_eq!(message.parts.len(), 1);
        assert_eq!(message.msgno_parts(), vec!["M01A"]);
        assert!(!message.uid.is_empty());
    }

    #[test]
    fn test_missing_timestamp_uses_receive_time() {
        let raw = RawMessage {
            text: Some("NO TIME".to_string()),
            ..Default::default()
        };
        let message = raw.into_message(42.5);
        assert_eq!(message.timestamp, 42.5);
    }

    #[test]
    fn test_garbage_timestamp_uses_receive_time() {
        let raw = RawMessage::from_json(r#"{"time": "yesterday"}"#).unwrap();
        assert_eq!(raw.into_message(7.0).timestamp, 7.0);
    }

    #[test]
    fn test_blank_fields_are_absent() {
        let raw = RawMessage {
            uid: Some("u1".to_string()),
            flight: Some("   ".to_string()),
            tail: Some(String::new()),
            text: Some(" ".to_string()),
            ..Default::default()
        };
        let message = raw.into_message(1.0);
        assert_eq!(message.uid, "u1");
        assert!(message.flight.is_none());
        assert!(message.tail.is_none());
        assert!(message.text.is_none());
        assert!(message.identifiers().is_empty());
    }

    #[test]
    fn test_bad_msgno_is_single_message() {
        let raw = RawMessage {
            msgno: Some("XYZ".to_string()),
            ..Default::default()
        };
        let message = raw.into_message(1.0);
        assert!(!message.is_fragment());
        assert!(message.parts.is_empty());
        assert_eq!(message.msgno.as_deref(), Some("XYZ"));
    }

    #[test]
    fn test_icao_hex_string_passthrough() {
        let raw = RawMessage::from_json(r#"{"icao": "abc123"}"#).unwrap();
        assert_eq!(raw.into_message(1.0).icao_hex.as_deref(), Some("ABC123"));
    }

    #[test]
    fn test_same_payload_same_fingerprint() {
        let a = RawMessage {
            station_id: Some("A".to_string()),
            text: Some("SAME".to_string()),
            ..Default::default()
        }
        .into_message(1.0);
        let b = RawMessage {
            station_id: Some("B".to_string()),
            text: Some("SAME".to_string()),
            ..Default::default()
        }
        .into_message(2.0);
        assert_eq!(a.fingerprint, b.fingerprint);
        assert_ne!(a.uid, b.uid);
    }
}
