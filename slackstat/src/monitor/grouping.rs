//! Arrange unread conversations into the user's sidebar sections.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use slack_api::ChannelSection;

use crate::domain::{ConversationItem, ConversationKind};

pub const MENTIONS_GROUP: &str = "Mentions";
pub const UNCATEGORIZED_GROUP: &str = "Uncategorized";
pub const DIRECT_MESSAGES_GROUP: &str = "Direct Messages";
pub const CHANNELS_GROUP: &str = "Channels";

/// A named, ordered bucket of conversations for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupedSection {
    /// Section id, or a synthetic id for the built-in groups.
    pub id: String,
    pub name: String,
    pub items: Vec<ConversationItem>,
}

impl GroupedSection {
    fn new(id: &str, name: &str, mut items: Vec<ConversationItem>) -> Self {
        sort_group(&mut items);
        Self {
            id: id.to_string(),
            name: name.to_string(),
            items,
        }
    }
}

/// Which conversations a virtual section collects.
fn virtual_claims(section_type: &str, item: &ConversationItem) -> bool {
    match section_type {
        "channels" | "default_channels" => {
            item.kind == ConversationKind::Channel && !item.is_ext_shared
        }
        "slack_connect" | "shared_channels" => {
            item.kind == ConversationKind::Channel && item.is_ext_shared
        }
        "direct_messages" | "default_dms" => item.kind.is_direct(),
        _ => false,
    }
}

/// Group `items` by `sections`.
///
/// Mentions always form the first group. Remaining items are claimed by
/// sections listing them explicitly, then by virtual sections by type; an
/// item belongs to at most one group. Groups follow the declared section
/// order, empty groups are dropped and leftovers go to "Uncategorized".
/// Without sections a fixed DM/Mentions/Channels layout is used.
pub fn group_by_sections(
    items: &[ConversationItem],
    sections: &[ChannelSection],
) -> Vec<GroupedSection> {
    if sections.is_empty() {
        return fallback_groups(items);
    }

    let mut claimed = vec![false; items.len()];
    let mut mentions = Vec::new();
    for (idx, item) in items.iter().enumerate() {
        if item.kind == ConversationKind::Mention {
            claimed[idx] = true;
            mentions.push(item.clone());
        }
    }

    let mut buckets: Vec<Vec<ConversationItem>> = vec![Vec::new(); sections.len()];

    for (slot, section) in sections.iter().enumerate() {
        if section.is_virtual() {
            continue;
        }
        let members: HashSet<&str> = section.channel_ids.iter().map(String::as_str).collect();
        for (idx, item) in items.iter().enumerate() {
            if !claimed[idx] && members.contains(item.id.as_str()) {
                claimed[idx] = true;
                buckets[slot].push(item.clone());
            }
        }
    }

    for (slot, section) in sections.iter().enumerate() {
        if !section.is_virtual() {
            continue;
        }
        for (idx, item) in items.iter().enumerate() {
            if !claimed[idx] && virtual_claims(&section.section_type, item) {
                claimed[idx] = true;
                buckets[slot].push(item.clone());
            }
        }
    }

    let leftovers: Vec<ConversationItem> = items
        .iter()
        .zip(&claimed)
        .filter(|(_, claimed)| !**claimed)
        .map(|(item, _)| item.clone())
        .collect();

    let mut groups = Vec::with_capacity(sections.len() + 2);
    if !mentions.is_empty() {
        groups.push(GroupedSection::new("mentions", MENTIONS_GROUP, mentions));
    }
    for (section, bucket) in sections.iter().zip(buckets) {
        if !bucket.is_empty() {
            groups.push(GroupedSection::new(&section.id, &section.name, bucket));
        }
    }
    if !leftovers.is_empty() {
        groups.push(GroupedSection::new(
            "uncategorized",
            UNCATEGORIZED_GROUP,
            leftovers,
        ));
    }
    groups
}

fn fallback_groups(items: &[ConversationItem]) -> Vec<GroupedSection> {
    let pick = |pred: fn(&ConversationItem) -> bool| -> Vec<ConversationItem> {
        items.iter().filter(|i| pred(i)).cloned().collect()
    };

    [
        (
            "direct_messages",
            DIRECT_MESSAGES_GROUP,
            pick(|i| i.kind.is_direct()),
        ),
        (
            "mentions",
            MENTIONS_GROUP,
            pick(|i| i.kind == ConversationKind::Mention),
        ),
        (
            "channels",
            CHANNELS_GROUP,
            pick(|i| i.kind == ConversationKind::Channel),
        ),
    ]
    .into_iter()
    .filter(|(_, _, items)| !items.is_empty())
    .map(|(id, name, items)| GroupedSection::new(id, name, items))
    .collect()
}

/// Newest first, missing timestamps last; ties by id so regrouping is stable.
fn sort_group(items: &mut [ConversationItem]) {
    items.sort_by(|a, b| b.latest_at.cmp(&a.latest_at).then_with(|| a.id.cmp(&b.id)));
}
