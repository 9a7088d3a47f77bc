//! Group key resolution.
//!
//! Priority: flight, then tail, then ICAO hex, then a per-message UID key.
//! Every identifier belongs to at most one group; a message whose identifiers
//! span several groups folds them into one.

use crate::constants::UID_GROUP_PREFIX;
use crate::models::{Identifier, Message, MessageGroup};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub struct KeyResolution {
    pub key: String,
    pub key_identifier: Option<Identifier>,
    /// Existing groups to fold under `key` (may include `key` itself)
    pub fold: Vec<String>,
}

pub fn strongest(identifiers: &[Identifier]) -> Option<&Identifier> {
    identifiers.iter().max_by_key(|id| id.rank())
}

pub fn fallback_key(uid: &str) -> String {
    format!("{UID_GROUP_PREFIX}{uid}")
}

/// Keys of existing groups that share any identifier with the message.
pub fn matching_groups(
    identifiers: &[Identifier],
    index: &HashMap<Identifier, String>,
) -> Vec<String> {
    let mut keys: Vec<String> = Vec::new();
    for id in identifiers {
        if let Some(key) = index.get(id) {
            if !keys.contains(key) {
                keys.push(key.clone());
            }
        }
    }
    keys
}

/// Choose the key a message lands under and which groups must be folded.
///
/// The strongest existing group (by key rank, then recency) keeps its key
/// unless the message carries a strictly stronger identifier.
pub fn resolve_key(
    message: &Message,
    identifiers: &[Identifier],
    matched: &[String],
    groups: &HashMap<String, MessageGroup>,
) -> KeyResolution {
    let best = strongest(identifiers);

    let base = matched.iter().filter_map(|k| groups.get(k)).max_by(|a, b| {
        a.key_rank()
            .cmp(&b.key_rank())
            .then(a.last_updated.total_cmp(&b.last_updated))
    });

    let (key, key_identifier) = match (base, best) {
        (Some(group), Some(id)) if id.rank() > group.key_rank() => {
            (id.value().to_string(), Some(id.clone()))
        }
        (Some(group), _) => (group.key.clone(), group.key_identifier.clone()),
        (None, Some(id)) => (id.value().to_string(), Some(id.clone())),
        (None, None) => (fallback_key(&message.uid), None),
    };

    let mut fold = matched.to_vec();
    // Same key string reached through a different kind of identifier
    if groups.contains_key(&key) && !fold.contains(&key) {
        fold.push(key.clone());
    }

    KeyResolution {
        key,
        key_identifier,
        fold,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RawMessage;

    fn msg(flight: Option<&str>, tail: Option<&str>, hex: Option<&str>) -> Message {
        RawMessage {
            uid: Some("u1".to_string()),
            flight: flight.map(String::from),
            tail: tail.map(String::from),
            icao_hex: hex.map(String::from),
            ..Default::default()
        }
        .into_message(1.0)
    }

    fn group(key: &str, id: Identifier, last_updated: f64) -> MessageGroup {
        let mut g = MessageGroup::new(key.to_string(), Some(id.clone()));
        g.identifiers.insert(id);
        g.last_updated = last_updated;
        g
    }

    #[test]
    fn test_new_key_priority() {
        let groups = HashMap::new();
        for (m, expected) in [
            (msg(Some("UAL123"), Some("N1"), Some("ABC")), "UAL123"),
            (msg(None, Some("N1"), Some("ABC")), "N1"),
            (msg(None, None, Some("ABC")), "ABC"),
            (msg(None, None, None), "uid:u1"),
        ] {
            let ids = m.identifiers();
            let resolution = resolve_key(&m, &ids, &[], &groups);
            assert_eq!(resolution.key, expected);
            assert!(resolution.fold.is_empty());
        }
    }

    #[test]
    fn test_stronger_identifier_rekeys() {
        let mut groups = HashMap::new();
        groups.insert(
            "ABC".to_string(),
            group("ABC", Identifier::IcaoHex("ABC".to_string()), 10.0),
        );

        let m = msg(None, Some("N1"), Some("ABC"));
        let ids = m.identifiers();
        let resolution = resolve_key(&m, &ids, &["ABC".to_string()], &groups);

        assert_eq!(resolution.key, "N1");
        assert_eq!(resolution.key_identifier, Some(Identifier::Tail("N1".to_string())));
        assert_eq!(resolution.fold, vec!["ABC".to_string()]);
    }

    #[test]
    fn test_weaker_identifier_keeps_key() {
        let mut groups = HashMap::new();
        groups.insert(
            "UAL123".to_string(),
            group("UAL123", Identifier::Flight("UAL123".to_string()), 10.0),
        );

        let m = msg(Some("UAL123"), None, Some("ABC"));
        let ids = m.identifiers();
        let resolution = resolve_key(&m, &ids, &["UAL123".to_string()], &groups);
        assert_eq!(resolution.key, "UAL123");
    }

    #[test]
    fn test_matching_groups_dedups() {
        let mut index = HashMap::new();
        index.insert(Identifier::Tail("N1".to_string()), "UAL1".to_string());
        index.insert(Identifier::IcaoHex("ABC".to_string()), "UAL1".to_string());

        let m = msg(None, Some("N1"), Some("ABC"));
        assert_eq!(matching_groups(&m.identifiers(), &index), vec!["UAL1".to_string()]);
    }
}
