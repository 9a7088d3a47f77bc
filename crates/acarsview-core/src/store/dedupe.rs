//! Duplicate detection.
//!
//! Redundant receivers and decoders hand us the same transmission more than
//! once within a few seconds. A candidate is a duplicate of a held message when
//! it is the same record (same UID) or carries the same content fingerprint
//! within the duplicate window. For reassembled messages each part is checked
//! separately against its own arrival time.

use crate::models::{Message, MessageGroup};

/// Index of the held message the candidate duplicates, if any.
pub fn find_duplicate(candidate: &Message, group: &MessageGroup, window_secs: f64) -> Option<usize> {
    group
        .messages
        .iter()
        .position(|held| is_duplicate_of(candidate, held, window_secs))
}

/// UID of the held message the candidate duplicates. A candidate with no
/// group to join is never a duplicate.
pub fn is_duplicate<'a>(
    candidate: &Message,
    group: Option<&'a MessageGroup>,
    window_secs: f64,
) -> Option<&'a str> {
    let group = group?;
    find_duplicate(candidate, group, window_secs).map(|idx| group.messages[idx].uid.as_str())
}

/// Index of a held multi-part message that already carries this exact part and
/// is still being reassembled (newest part within `reassembly_window_secs`).
///
/// Catches a part repeated after the duplicate window has passed for the part
/// itself but while later parts are still arriving.
pub fn find_repeated_part(
    candidate: &Message,
    group: &MessageGroup,
    reassembly_window_secs: f64,
) -> Option<usize> {
    let info = candidate.multipart.as_ref()?;

    group.messages.iter().position(|held| {
        held.source == candidate.source
            && held
                .multipart
                .as_ref()
                .is_some_and(|h| h.sequence == info.sequence)
            && held
                .parts
                .iter()
                .any(|p| p.index == info.part && p.fingerprint == candidate.fingerprint)
            && held
                .parts
                .iter()
                .map(|p| p.timestamp)
                .reduce(f64::max)
                .is_some_and(|ts| within(ts, candidate.timestamp, reassembly_window_secs))
    })
}

fn is_duplicate_of(candidate: &Message, held: &Message, window_secs: f64) -> bool {
    if held.uid == candidate.uid {
        return true;
    }

    if held.parts.is_empty() {
        held.fingerprint == candidate.fingerprint
            && within(held.timestamp, candidate.timestamp, window_secs)
    } else {
        held.parts.iter().any(|part| {
            part.fingerprint == candidate.fingerprint
                && within(part.timestamp, candidate.timestamp, window_secs)
        })
    }
}

fn within(a: f64, b: f64, window_secs: f64) -> bool {
    (a - b).abs() <= window_secs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RawMessage;
    use crate::test_support::{message, raw_fragment};

    fn group_with(messages: Vec<Message>) -> MessageGroup {
        let mut group = MessageGroup::new("UAL123".to_string(), None);
        for m in messages {
            group.insert_sorted(m);
        }
        group
    }

    fn copy_of(held: &Message, uid: &str, timestamp: f64) -> Message {
        RawMessage {
            uid: Some(uid.to_string()),
            timestamp: Some(serde_json::json!(timestamp)),
            source: Some(held.source.to_string()),
            station_id: Some("OTHER-RX".to_string()),
            text: held.text.clone(),
            msgno: held.msgno.clone(),
            ..Default::default()
        }
        .into_message(timestamp)
    }

    #[test]
    fn test_copy_within_window() {
        let held = message("u1", 100.0);
        let group = group_with(vec![held.clone()]);

        let copy = copy_of(&held, "u2", 103.0);
        assert_eq!(find_duplicate(&copy, &group, 10.0), Some(0));
        assert_eq!(is_duplicate(&copy, Some(&group), 10.0), Some("u1"));
    }

    #[test]
    fn test_copy_outside_window_is_new() {
        let held = message("u1", 100.0);
        let group = group_with(vec![held.clone()]);

        let late = copy_of(&held, "u2", 400.0);
        assert!(find_duplicate(&late, &group, 10.0).is_none());
    }

    #[test]
    fn test_same_uid_is_duplicate() {
        let group = group_with(vec![message("u1", 100.0)]);
        let mut again = message("u1", 5000.0);
        again.text = Some("different".to_string());
        assert!(is_duplicate(&again, Some(&group), 10.0).is_some());
    }

    #[test]
    fn test_unknown_group_never_duplicate() {
        assert!(is_duplicate(&message("u1", 1.0), None, 10.0).is_none());
    }

    #[test]
    fn test_part_fingerprints_checked() {
        let part = raw_fragment("u1", 100.0, "UAL123", "M01A", "PART ONE").into_message(100.0);
        let group = group_with(vec![part.clone()]);

        let copy = copy_of(&part, "u9", 101.0);
        assert!(copy.is_fragment());
        assert_eq!(find_duplicate(&copy, &group, 10.0), Some(0));
    }

    #[test]
    fn test_repeated_part_while_reassembling() {
        let mut held = raw_fragment("u1", 100.0, "UAL123", "M01A", "HELLO ").into_message(100.0);
        let second = raw_fragment("u2", 107.0, "UAL123", "M02A", "WORLD").into_message(107.0);
        crate::store::multipart::merge(&mut held, second);
        let group = group_with(vec![held]);

        // First part again, past its own duplicate window but inside reassembly
        let again = raw_fragment("u3", 112.0, "UAL123", "M01A", "HELLO ").into_message(112.0);
        assert!(find_duplicate(&again, &group, 10.0).is_none());
        assert_eq!(find_repeated_part(&again, &group, 8.0), Some(0));

        // Same index with different content is not a repeat
        let other = raw_fragment("u4", 112.0, "UAL123", "M01A", "OTHER ").into_message(112.0);
        assert!(find_repeated_part(&other, &group, 8.0).is_none());

        // Reassembly long finished
        let late = raw_fragment("u5", 300.0, "UAL123", "M01A", "HELLO ").into_message(300.0);
        assert!(find_repeated_part(&late, &group, 8.0).is_none());
    }
}
