//! Terminal rendering for the CLI.

use chrono::{DateTime, Local, Utc};
use serde::Serialize;

use crate::domain::{
    AggregatedCounts, ConnectionStatus, ConversationItem, ConversationKind, format_relative,
    format_summary,
};
use crate::monitor::{GroupedSection, MonitorSnapshot};

const IDLE_SUMMARY: &str = "No unread messages";

/// Summary line, or a fixed message when nothing is unread.
pub fn summary_line(agg: &AggregatedCounts, now: DateTime<Utc>) -> String {
    let summary = format_summary(agg, now);
    if summary.is_empty() {
        IDLE_SUMMARY.to_string()
    } else {
        summary
    }
}

/// One line per update in `watch` mode.
pub fn render_update(snapshot: &MonitorSnapshot, now: DateTime<Utc>) -> String {
    let clock = now.with_timezone(&Local).format("%H:%M:%S");
    match &snapshot.status {
        ConnectionStatus::Connected => {
            format!("[{clock}] {}", summary_line(&snapshot.aggregated, now))
        }
        status if snapshot.last_success_at.is_some() => format!(
            "[{clock}] {} ({status})",
            summary_line(&snapshot.aggregated, now)
        ),
        status => format!("[{clock}] {status}"),
    }
}

fn item_label(item: &ConversationItem) -> String {
    match item.kind {
        ConversationKind::Dm | ConversationKind::Mpim => item.name.clone(),
        ConversationKind::Mention | ConversationKind::Channel => format!("#{}", item.name),
    }
}

fn render_item(item: &ConversationItem, now: DateTime<Utc>) -> String {
    let mut line = format!("  {}", item_label(item));
    if item.mention_count > 0 {
        line.push_str(&format!("  @{}", item.mention_count));
    }
    if let Some(ts) = item.latest_at {
        line.push_str(&format!("  {}", format_relative(ts, now)));
    }
    line
}

/// Full report for `status`: connection, summary and grouped sections.
pub fn render_report(snapshot: &MonitorSnapshot, now: DateTime<Utc>) -> String {
    let mut lines = vec![format!("Status: {}", snapshot.status)];
    if let Some(at) = snapshot.last_success_at {
        lines.push(format!("Updated: {} ago", format_relative(at, now)));
    }
    lines.push(summary_line(&snapshot.aggregated, now));

    for group in snapshot.groups() {
        lines.push(String::new());
        lines.push(format!("{} ({})", group.name, group.items.len()));
        lines.extend(group.items.iter().map(|item| render_item(item, now)));
    }
    lines.join("\n")
}

/// Machine-readable form of [`render_report`].
#[derive(Debug, Serialize)]
pub struct StatusReport<'a> {
    pub status: &'a ConnectionStatus,
    pub summary: String,
    pub aggregated: &'a AggregatedCounts,
    pub last_success_at: Option<DateTime<Utc>>,
    pub groups: Vec<GroupedSection>,
}

impl<'a> StatusReport<'a> {
    pub fn new(snapshot: &'a MonitorSnapshot, now: DateTime<Utc>) -> Self {
        Self {
            status: &snapshot.status,
            summary: format_summary(&snapshot.aggregated, now),
            aggregated: &snapshot.aggregated,
            last_success_at: snapshot.last_success_at,
            groups: snapshot.groups(),
        }
    }
}
