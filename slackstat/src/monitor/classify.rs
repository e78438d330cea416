//! Turn raw `client.counts` entries into surfaced conversations.

use std::collections::HashSet;

use slack_api::{ClientCountsResponse, ConversationCount};

use crate::domain::{ConversationItem, ConversationKind};

/// Classify every conversation with activity.
///
/// Mentions always surface, even in muted channels. Plain unreads surface
/// only for unmuted channels. Group DMs are reported as DMs. The result is
/// ordered mentions, channels, IMs, MPIMs, keeping input order within each.
pub fn classify(
    counts: &ClientCountsResponse,
    muted: &HashSet<String>,
    team_id: &str,
) -> Vec<ConversationItem> {
    let mut mentions = Vec::new();
    let mut channels = Vec::new();

    for count in &counts.channels {
        if count.mention_count > 0 {
            mentions.push(ConversationItem::from_count(
                count,
                ConversationKind::Mention,
                team_id,
            ));
        } else if count.has_unreads && !is_muted(count, muted) {
            channels.push(ConversationItem::from_count(
                count,
                ConversationKind::Channel,
                team_id,
            ));
        }
    }

    let directs = counts
        .ims
        .iter()
        .chain(&counts.mpims)
        .filter(|c| c.has_activity())
        .map(|c| ConversationItem::from_count(c, ConversationKind::Dm, team_id));

    mentions.extend(channels);
    mentions.extend(directs);
    mentions
}

fn is_muted(count: &ConversationCount, muted: &HashSet<String>) -> bool {
    count.is_muted == Some(true) || muted.contains(&count.id)
}
