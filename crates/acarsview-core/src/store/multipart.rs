//! Multi-part reassembly.
//!
//! Long ACARS downlinks are split into blocks that share a message number
//! family (`M01A`, `M02A`, ...). Blocks are folded into the first held message
//! of the family, ordered by part number rather than by arrival.

use crate::models::{Message, MessageGroup, MessagePart};

pub fn is_fragment(candidate: &Message) -> bool {
    candidate.is_fragment()
}

/// Index of the held message a fragment belongs to.
///
/// The held message must come from the same decoder family, share the sequence
/// key, lack this part, and have its newest part within `window_secs` of the
/// fragment.
pub fn find_merge_target(
    candidate: &Message,
    group: &MessageGroup,
    window_secs: f64,
) -> Option<usize> {
    let info = candidate.multipart.as_ref()?;

    group.messages.iter().position(|held| {
        held.source == candidate.source
            && held
                .multipart
                .as_ref()
                .is_some_and(|h| h.sequence == info.sequence)
            && !held.parts.iter().any(|p| p.index == info.part)
            && newest_part(held).is_some_and(|ts| (ts - candidate.timestamp).abs() <= window_secs)
    })
}

fn newest_part(held: &Message) -> Option<f64> {
    held.parts.iter().map(|p| p.timestamp).reduce(f64::max)
}

/// Fold `fragment` into `existing`. Returns false when the part is already held
/// (or the fragment carries no part metadata), leaving `existing` untouched.
pub fn merge(existing: &mut Message, fragment: Message) -> bool {
    let Some(info) = fragment.multipart.as_ref() else {
        return false;
    };
    if existing.parts.iter().any(|p| p.index == info.part) {
        return false;
    }

    let part = MessagePart {
        index: info.part,
        msgno: fragment.msgno.clone().unwrap_or_default(),
        text: fragment.text.clone().unwrap_or_default(),
        timestamp: fragment.timestamp,
        fingerprint: fragment.fingerprint.clone(),
    };
    let pos = existing.parts.partition_point(|p| p.index < part.index);
    existing.parts.insert(pos, part);

    let joined: String = existing.parts.iter().map(|p| p.text.as_str()).collect();
    existing.text = (!joined.is_empty()).then_some(joined);
    existing.timestamp = existing.timestamp.max(fragment.timestamp);
    existing.is_alert = existing.is_alert || fragment.is_alert;

    // Later blocks sometimes carry fields the first one lacked
    fill(&mut existing.station_id, fragment.station_id);
    fill(&mut existing.flight, fragment.flight);
    fill(&mut existing.tail, fragment.tail);
    fill(&mut existing.icao_hex, fragment.icao_hex);
    fill(&mut existing.label, fragment.label);
    fill(&mut existing.libacars, fragment.libacars);
    fill(&mut existing.frequency, fragment.frequency);

    for term in fragment.matched_terms {
        if !existing.matched_terms.contains(&term) {
            existing.matched_terms.push(term);
        }
    }

    true
}

fn fill<T>(slot: &mut Option<T>, value: Option<T>) {
    if slot.is_none() {
        *slot = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::raw_fragment;

    fn fragment(uid: &str, ts: f64, msgno: &str, text: &str) -> Message {
        raw_fragment(uid, ts, "UAL123", msgno, text).into_message(ts)
    }

    #[test]
    fn test_merge_orders_by_part_number() {
        let mut held = fragment("u1", 100.0, "M02A", "WORLD");
        assert!(merge(&mut held, fragment("u2", 101.0, "M01A", "HELLO ")));

        assert_eq!(held.uid, "u1");
        assert_eq!(held.text.as_deref(), Some("HELLO WORLD"));
        assert_eq!(held.msgno_parts(), vec!["M01A", "M02A"]);
        assert_eq!(held.timestamp, 101.0);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let mut held = fragment("u1", 100.0, "M01A", "HELLO ");
        assert!(merge(&mut held, fragment("u2", 101.0, "M02A", "WORLD")));
        let before = held.clone();

        assert!(!merge(&mut held, fragment("u3", 102.0, "M02A", "WORLD")));
        assert_eq!(held, before);
    }

    #[test]
    fn test_find_target_requires_sequence_and_window() {
        let mut group = MessageGroup::new("UAL123".to_string(), None);
        group.insert_sorted(fragment("u1", 100.0, "M01A", "A"));

        assert_eq!(
            find_merge_target(&fragment("u2", 104.0, "M02A", "B"), &group, 8.0),
            Some(0)
        );
        // Different sequence letter
        assert!(find_merge_target(&fragment("u3", 104.0, "M02B", "B"), &group, 8.0).is_none());
        // Too late
        assert!(find_merge_target(&fragment("u4", 200.0, "M02A", "B"), &group, 8.0).is_none());
        // Part already held
        assert!(find_merge_target(&fragment("u5", 101.0, "M01A", "X"), &group, 8.0).is_none());
    }

    #[test]
    fn test_merge_fills_missing_fields() {
        let mut held = fragment("u1", 100.0, "M01A", "A");
        held.tail = None;
        let mut next = fragment("u2", 101.0, "M02A", "B");
        next.tail = Some("N12345".to_string());

        assert!(merge(&mut held, next));
        assert_eq!(held.tail.as_deref(), Some("N12345"));
        assert!(is_fragment(&held));
    }
}
