use acarsview_core::models::AircraftPosition;
use acarsview_core::{IngestStats, MessageGroup, MessageStore};
use chrono::{TimeZone, Utc};
use serde::Serialize;
use std::fmt::Write;

/// One line of the group listing
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupSummary {
    pub key: String,
    pub identifiers: Vec<String>,
    pub messages: usize,
    pub alerts: usize,
    pub unread: usize,
    pub duplicates: u32,
    pub last_updated: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<AircraftPosition>,
    /// Newest message body, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_text: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreSummary {
    pub groups: Vec<GroupSummary>,
    pub message_count: usize,
    pub alert_count: usize,
    pub unread_count: usize,
    pub unread_alert_count: usize,
    pub stats: IngestStats,
}

pub fn summarize(store: &MessageStore) -> StoreSummary {
    StoreSummary {
        groups: store
            .groups()
            .into_iter()
            .map(|g| summarize_group(store, g))
            .collect(),
        message_count: store.message_count(),
        alert_count: store.alert_count(),
        unread_count: store.unread_count(),
        unread_alert_count: store.unread_alert_count(),
        stats: store.stats().clone(),
    }
}

fn summarize_group(store: &MessageStore, group: &MessageGroup) -> GroupSummary {
    GroupSummary {
        key: group.key.clone(),
        identifiers: group.identifiers.iter().map(|id| id.value().to_string()).collect(),
        messages: group.messages.len(),
        alerts: group.alert_count,
        unread: group
            .messages
            .iter()
            .filter(|m| !store.is_read(&m.uid))
            .count(),
        duplicates: group.messages.iter().map(|m| m.duplicates).sum(),
        last_updated: group.last_updated,
        position: group.position.clone(),
        latest_text: group.messages.first().and_then(|m| m.text.clone()),
    }
}

pub fn format_timestamp(timestamp: f64) -> String {
    let secs = timestamp.floor() as i64;
    let nanos = ((timestamp - timestamp.floor()) * 1e9) as u32;
    match Utc.timestamp_opt(secs, nanos).single() {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        None => format!("{timestamp}"),
    }
}

/// Plain-text report for terminals
pub fn render_text(summary: &StoreSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} groups, {} messages, {} alerts ({} unread), {} unread",
        summary.groups.len(),
        summary.message_count,
        summary.alert_count,
        summary.unread_alert_count,
        summary.unread_count,
    );

    for group in &summary.groups {
        let marker = if group.alerts > 0 { "!" } else { " " };
        let _ = writeln!(
            out,
            "{marker} {:<10} {:>3} msgs {:>3} unread  {}  [{}]",
            group.key,
            group.messages,
            group.unread,
            format_timestamp(group.last_updated),
            group.identifiers.join(", "),
        );
        if let Some(pos) = &group.position {
            let altitude = pos
                .altitude
                .map(|a| format!(" {a} ft"))
                .unwrap_or_default();
            let _ = writeln!(out, "    position {:.4}, {:.4}{altitude}", pos.lat, pos.lon);
        }
        if let Some(text) = &group.latest_text {
            let _ = writeln!(out, "    {}", text.replace(['\r', '\n'], " "));
        }
    }

    let sources: Vec<String> = summary
        .stats
        .sources_by_count()
        .into_iter()
        .map(|(source, count)| format!("{source}={count}"))
        .collect();
    if !sources.is_empty() {
        let _ = writeln!(
            out,
            "received {} ({}), {} duplicates, {} merged parts, {} dropped, {} groups evicted",
            summary.stats.received,
            sources.join(" "),
            summary.stats.duplicates,
            summary.stats.merged_parts,
            summary.stats.dropped_messages,
            summary.stats.evicted_groups,
        );
    }

    let terms: Vec<String> = summary
        .stats
        .alert_terms_by_count()
        .into_iter()
        .map(|(term, count)| format!("{term}={count}"))
        .collect();
    if !terms.is_empty() {
        let _ = writeln!(out, "alert terms: {}", terms.join(" "));
    }

    out
}
