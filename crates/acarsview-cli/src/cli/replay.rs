use acarsview_core::{IngestKind, MessageStore, RawMessage};
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

/// Counts for one replay run
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ReplayReport {
    pub lines: usize,
    pub inserted: usize,
    pub merged: usize,
    pub duplicates: usize,
    /// Lines that were not a JSON message object
    pub skipped: usize,
}

/// Open `path` for line reading; `-` is stdin.
pub fn open_input(path: &str) -> Result<Box<dyn BufRead>> {
    if path == "-" {
        return Ok(Box::new(BufReader::new(io::stdin())));
    }
    let file = File::open(Path::new(path))
        .with_context(|| format!("Failed to open input file: {}", path))?;
    Ok(Box::new(BufReader::new(file)))
}

/// Feed every JSON line of `reader` into `store`.
///
/// Malformed lines are logged and skipped; only read errors abort the run.
pub fn replay<R: BufRead>(reader: R, store: &mut MessageStore) -> Result<ReplayReport> {
    let mut report = ReplayReport::default();

    for (idx, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("Failed to read input line {}", idx + 1))?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        report.lines += 1;

        let raw = match RawMessage::from_json(line) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(line = idx + 1, error = %e, "skipping malformed message");
                report.skipped += 1;
                continue;
            }
        };

        match store.add_message(raw).kind {
            IngestKind::Inserted => report.inserted += 1,
            IngestKind::Merged => report.merged += 1,
            IngestKind::Duplicate => report.duplicates += 1,
        }
    }

    tracing::info!(
        lines = report.lines,
        inserted = report.inserted,
        skipped = report.skipped,
        "replay finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use acarsview_core::store::MemoryPersistence;
    use acarsview_core::{StaticSettings, TermAlertMatcher};
    use std::io::{Cursor, Write};
    use std::sync::Arc;

    fn store() -> MessageStore {
        MessageStore::new(
            Arc::new(StaticSettings::default()),
            Arc::new(TermAlertMatcher::new(["MAYDAY"], Vec::<String>::new())),
            Box::new(MemoryPersistence::new()),
        )
    }

    #[test]
    fn test_replay_counts() {
        let input = r#"
{"uid": "u1", "timestamp": 100, "message_type": "ACARS", "flight": "UAL123", "msg_text": "HELLO"}
{"uid": "u2", "timestamp": 101, "message_type": "ACARS", "flight": "UAL123", "msg_text": "HELLO"}
not json at all
{"uid": "u3", "timestamp": 102, "message_type": "ACARS", "flight": "UAL123", "msgno": "M01A", "msg_text": "PART ONE "}
{"uid": "u4", "timestamp": 103, "message_type": "ACARS", "flight": "UAL123", "msgno": "M02A", "msg_text": "MAYDAY"}
"#;
        let mut store = store();
        let report = replay(Cursor::new(input), &mut store).unwrap();

        assert_eq!(
            report,
            ReplayReport {
                lines: 5,
                inserted: 2,
                merged: 1,
                duplicates: 1,
                skipped: 1,
            }
        );
        assert_eq!(store.message_count(), 2);
        assert_eq!(store.alert_count(), 1);
    }

    #[test]
    fn test_open_input_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"uid": "u1", "timestamp": 100, "tail": "N12345"}}"#).unwrap();

        let path = file.path().to_string_lossy().to_string();
        let mut store = store();
        let report = replay(open_input(&path).unwrap(), &mut store).unwrap();
        assert_eq!(report.inserted, 1);
        assert!(store.group("N12345").is_some());
    }

    #[test]
    fn test_open_missing_file() {
        let err = open_input("/nonexistent/acarsview/input.jsonl").err().unwrap();
        assert!(err.to_string().contains("Failed to open input file"));
    }
}
