//! One-line unread summary, e.g. `💬 4 (3m)  @ 2 (1h)  # 15 (45m)`.

use chrono::{DateTime, Utc};

use super::conversation::AggregatedCounts;

const DM_GLYPH: &str = "\u{1F4AC}";
const MENTION_GLYPH: &str = "@";
const CHANNEL_GLYPH: &str = "#";
const SEPARATOR: &str = "  ";

/// Compact age of `then` relative to `now`: `Ns`, `Nm`, `Nh` or `Nd`.
///
/// Future instants are treated as zero seconds old.
pub fn format_relative(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (now - then).num_seconds().max(0);
    if seconds < 60 {
        return format!("{seconds}s");
    }
    let minutes = seconds / 60;
    if minutes < 60 {
        return format!("{minutes}m");
    }
    let hours = minutes / 60;
    if hours < 24 {
        return format!("{hours}h");
    }
    format!("{}d", hours / 24)
}

fn part(glyph: &str, count: usize, latest: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Option<String> {
    if count == 0 {
        return None;
    }
    Some(match latest {
        Some(ts) => format!("{glyph} {count} ({})", format_relative(ts, now)),
        None => format!("{glyph} {count}"),
    })
}

/// Render the summary line; empty when nothing is unread.
pub fn format_summary(agg: &AggregatedCounts, now: DateTime<Utc>) -> String {
    [
        part(DM_GLYPH, agg.total_dms, agg.most_recent_dm, now),
        part(MENTION_GLYPH, agg.total_mentions, agg.most_recent_mention, now),
        part(CHANNEL_GLYPH, agg.total_channels, agg.most_recent_channel, now),
    ]
    .into_iter()
    .flatten()
    .collect::<Vec<_>>()
    .join(SEPARATOR)
}
