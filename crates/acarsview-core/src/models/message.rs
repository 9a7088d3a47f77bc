use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Decoder family that produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MessageSource {
    Acars,
    Vdlm2,
    Hfdl,
    Imsl,
    Irdm,
    Unknown,
}

impl MessageSource {
    /// Parse the decoder tag carried on the wire. Unrecognized tags map to `Unknown`.
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_ascii_uppercase().as_str() {
            "ACARS" => MessageSource::Acars,
            "VDLM2" | "VDL-M2" | "VDLM" => MessageSource::Vdlm2,
            "HFDL" => MessageSource::Hfdl,
            "IMSL" | "IMS-L" => MessageSource::Imsl,
            "IRDM" | "IRIDIUM" => MessageSource::Irdm,
            _ => MessageSource::Unknown,
        }
    }
}

impl fmt::Display for MessageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageSource::Acars => write!(f, "ACARS"),
            MessageSource::Vdlm2 => write!(f, "VDL-M2"),
            MessageSource::Hfdl => write!(f, "HFDL"),
            MessageSource::Imsl => write!(f, "IMSL"),
            MessageSource::Irdm => write!(f, "IRDM"),
            MessageSource::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// One way of addressing an aircraft. Variants are ordered by grouping priority.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Identifier {
    Flight(String),
    Tail(String),
    IcaoHex(String),
}

impl Identifier {
    /// Higher rank wins when choosing a group key.
    pub fn rank(&self) -> u8 {
        match self {
            Identifier::Flight(_) => 3,
            Identifier::Tail(_) => 2,
            Identifier::IcaoHex(_) => 1,
        }
    }

    pub fn value(&self) -> &str {
        match self {
            Identifier::Flight(v) | Identifier::Tail(v) | Identifier::IcaoHex(v) => v,
        }
    }
}

/// Sequence metadata parsed from an ACARS message number such as `M01A`.
///
/// The first and last characters name the sequence, the digits between them
/// the part number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiPartInfo {
    pub sequence: String,
    pub part: u16,
}

impl MultiPartInfo {
    pub fn parse(msgno: &str) -> Option<Self> {
        let chars: Vec<char> = msgno.trim().chars().collect();
        if chars.len() != 4 {
            return None;
        }
        let (first, last) = (chars[0], chars[3]);
        if !first.is_ascii_alphanumeric() || !last.is_ascii_alphanumeric() {
            return None;
        }
        if !chars[1].is_ascii_digit() || !chars[2].is_ascii_digit() {
            return None;
        }
        let part = chars[1..3].iter().collect::<String>().parse().ok()?;

        Some(Self {
            sequence: format!("{first}{last}"),
            part,
        })
    }
}

/// One received fragment of a multi-part message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessagePart {
    pub index: u16,
    pub msgno: String,
    pub text: String,
    pub timestamp: f64,
    pub fingerprint: String,
}

/// Result of the external alert predicate for one message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlertMatch {
    pub is_match: bool,
    pub matched_terms: Vec<String>,
}

impl AlertMatch {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn matched(terms: Vec<String>) -> Self {
        Self {
            is_match: !terms.is_empty(),
            matched_terms: terms,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Stable for the lifetime of the message, including across merges
    pub uid: String,
    /// Seconds since the epoch. For a reassembled message, the newest part.
    pub timestamp: f64,
    pub source: MessageSource,
    pub station_id: Option<String>,
    pub flight: Option<String>,
    pub tail: Option<String>,
    pub icao_hex: Option<String>,
    pub label: Option<String>,
    pub text: Option<String>,
    /// Decoded libacars payload, kept as its JSON text
    pub libacars: Option<String>,
    pub frequency: Option<f64>,
    pub msgno: Option<String>,
    pub multipart: Option<MultiPartInfo>,
    /// Parts received so far, ordered by part number. Empty for single messages.
    pub parts: Vec<MessagePart>,
    pub is_alert: bool,
    pub matched_terms: Vec<String>,
    /// How many redundant copies of this message were discarded
    pub duplicates: u32,
    pub fingerprint: String,
}

impl Message {
    /// Identifiers carried by this message, strongest first.
    pub fn identifiers(&self) -> Vec<Identifier> {
        let mut ids = Vec::with_capacity(3);
        if let Some(flight) = &self.flight {
            ids.push(Identifier::Flight(flight.clone()));
        }
        if let Some(tail) = &self.tail {
            ids.push(Identifier::Tail(tail.clone()));
        }
        if let Some(hex) = &self.icao_hex {
            ids.push(Identifier::IcaoHex(hex.clone()));
        }
        ids
    }

    pub fn is_fragment(&self) -> bool {
        self.multipart.is_some()
    }

    /// Message numbers of the parts received so far, in part order.
    pub fn msgno_parts(&self) -> Vec<&str> {
        self.parts.iter().map(|p| p.msgno.as_str()).collect()
    }

    /// Content fingerprint shared by redundant copies of one transmission.
    ///
    /// Covers the decoder family and the payload, not the receiving station or
    /// the arrival time, so the same message heard by two receivers collides.
    pub fn compute_fingerprint(&self) -> String {
        let source = self.source.to_string();
        let mut hasher = Sha256::new();
        for field in [
            Some(source.as_str()),
            self.label.as_deref(),
            self.msgno.as_deref(),
            self.text.as_deref(),
            self.libacars.as_deref(),
        ] {
            hasher.update(field.unwrap_or("").as_bytes());
            hasher.update([0x1f]);
        }
        hex::encode(hasher.finalize())
    }

    pub(crate) fn apply_alert(&mut self, alert: AlertMatch) {
        self.is_alert = self.is_alert || alert.is_match;
        for term in alert.matched_terms {
            if !self.matched_terms.contains(&term) {
                self.matched_terms.push(term);
            }
        }
    }
}

/// Current wall-clock time in fractional seconds since the epoch.
pub fn unix_now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_msgno() {
        let info = MultiPartInfo::parse("M01A").unwrap();
        assert_eq!(info.sequence, "MA");
        assert_eq!(info.part, 1);

        let info = MultiPartInfo::parse("M12B").unwrap();
        assert_eq!(info.sequence, "MB");
        assert_eq!(info.part, 12);
    }

    #[test]
    fn test_parse_msgno_rejects_malformed() {
        assert!(MultiPartInfo::parse("").is_none());
        assert!(MultiPartInfo::parse("M1A").is_none());
        assert!(MultiPartInfo::parse("MXXA").is_none());
        assert!(MultiPartInfo::parse("M01AB").is_none());
    }

    #[test]
    fn test_source_tags() {
        assert_eq!(MessageSource::from_tag("VDL-M2"), MessageSource::Vdlm2);
        assert_eq!(MessageSource::from_tag("acars"), MessageSource::Acars);
        assert_eq!(MessageSource::from_tag("something"), MessageSource::Unknown);
        assert_eq!(MessageSource::Hfdl.to_string(), "HFDL");
    }

    #[test]
    fn test_identifier_priority() {
        let flight = Identifier::Flight("UAL123".to_string());
        let tail = Identifier::Tail("N12345".to_string());
        let hex = Identifier::IcaoHex("A1B2C3".to_string());
        assert!(flight.rank() > tail.rank());
        assert!(tail.rank() > hex.rank());
        assert_eq!(hex.value(), "A1B2C3");
    }

    #[test]
    fn test_apply_alert_never_clears() {
        let mut message = crate::test_support::message("u1", 100.0);
        message.apply_alert(AlertMatch::matched(vec!["WXR".to_string()]));
        message.apply_alert(AlertMatch::none());
        assert!(message.is_alert);
        assert_eq!(message.matched_terms, vec!["WXR".to_string()]);
    }
}
