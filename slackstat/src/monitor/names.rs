//! Conversation and user name resolution with a process-lifetime memo.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use parking_lot::Mutex;
use slack_api::{ConversationInfo, SlackApi};
use tracing::debug;

use crate::domain::ConversationItem;

/// What is known about a conversation or user id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameEntry {
    pub channel_name: Option<String>,
    pub is_private: bool,
    pub is_ext_shared: bool,
    /// Display label, for user ids.
    pub user_name: Option<String>,
    /// Counterpart user, for DM ids.
    pub dm_user_id: Option<String>,
    /// Set once `conversations.info` answered for this id, even if it carried
    /// no usable name.
    pub conversation_resolved: bool,
}

impl NameEntry {
    fn from_conversation(info: &ConversationInfo) -> Self {
        Self {
            channel_name: info.name.clone().filter(|n| !n.is_empty()),
            is_private: info.is_private_channel(),
            is_ext_shared: info.is_ext_shared.unwrap_or(false),
            user_name: None,
            dm_user_id: info.counterpart_user().map(str::to_string),
            conversation_resolved: true,
        }
    }
}

/// Names keyed by conversation or user id. Entries live until restart.
#[derive(Debug, Default)]
pub struct NameCache {
    entries: Mutex<HashMap<String, NameEntry>>,
}

impl NameCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<NameEntry> {
        self.entries.lock().get(id).cloned()
    }

    pub fn set(&self, id: impl Into<String>, entry: NameEntry) {
        self.entries.lock().insert(id.into(), entry);
    }

    /// Modify the entry for `id` in place, creating a default one first.
    pub fn update<F>(&self, id: &str, f: F)
    where
        F: FnOnce(&mut NameEntry),
    {
        let mut entries = self.entries.lock();
        f(entries.entry(id.to_string()).or_default());
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

/// Fills in display names, asking the API only on cache misses.
#[derive(Debug, Clone, Default)]
pub struct NameResolver {
    cache: Arc<NameCache>,
}

impl NameResolver {
    pub fn new(cache: Arc<NameCache>) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &Arc<NameCache> {
        &self.cache
    }

    /// Resolve every item concurrently. Failures leave the raw id as name.
    pub async fn resolve_all(
        &self,
        api: &dyn SlackApi,
        items: Vec<ConversationItem>,
    ) -> Vec<ConversationItem> {
        join_all(items.into_iter().map(|item| self.resolve(api, item))).await
    }

    pub async fn resolve(&self, api: &dyn SlackApi, mut item: ConversationItem) -> ConversationItem {
        let Some(entry) = self.conversation_entry(api, &item.id).await else {
            return item;
        };

        item.is_private = entry.is_private;
        item.is_ext_shared = entry.is_ext_shared;
        item.user_id = entry.dm_user_id.clone();

        let user_label = match (&entry.dm_user_id, item.kind.is_direct()) {
            (Some(user_id), true) => self.user_label(api, user_id).await,
            _ => None,
        };
        if let Some(name) = user_label.or(entry.channel_name) {
            item.name = name;
        }
        item
    }

    async fn conversation_entry(&self, api: &dyn SlackApi, id: &str) -> Option<NameEntry> {
        if let Some(entry) = self.cache.get(id).filter(|e| e.conversation_resolved) {
            return Some(entry);
        }

        match api.conversation_info(id).await {
            Ok(info) => {
                let entry = NameEntry::from_conversation(&info);
                self.cache.update(id, |cached| {
                    cached.channel_name = entry.channel_name.clone();
                    cached.is_private = entry.is_private;
                    cached.is_ext_shared = entry.is_ext_shared;
                    cached.dm_user_id = entry.dm_user_id.clone();
                    cached.conversation_resolved = true;
                });
                Some(entry)
            }
            Err(e) => {
                debug!(conversation = %id, error = %e, "Failed to resolve conversation");
                None
            }
        }
    }

    async fn user_label(&self, api: &dyn SlackApi, user_id: &str) -> Option<String> {
        if let Some(name) = self.cache.get(user_id).and_then(|e| e.user_name) {
            return Some(name);
        }

        match api.user_info(user_id).await {
            Ok(user) => {
                let label = user.display_label().to_string();
                if label.is_empty() {
                    return None;
                }
                self.cache
                    .update(user_id, |cached| cached.user_name = Some(label.clone()));
                Some(label)
            }
            Err(e) => {
                debug!(user = %user_id, error = %e, "Failed to resolve user");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ConversationKind;
    use crate::monitor::fakes::FakeSlackApi;
    use slack_api::{UserInfo, UserProfile};
    use std::sync::atomic::Ordering;

    fn item(id: &str, kind: ConversationKind) -> ConversationItem {
        ConversationItem {
            id: id.to_string(),
            name: id.to_string(),
            kind,
            team_id: "T1".into(),
            has_unreads: true,
            mention_count: 0,
            latest_at: None,
            user_id: None,
            is_private: false,
            is_ext_shared: false,
        }
    }

    fn api() -> FakeSlackApi {
        FakeSlackApi::new()
            .with_conversation(ConversationInfo {
                id: "C1".into(),
                name: Some("general".into()),
                is_channel: Some(true),
                is_ext_shared: Some(true),
                ..Default::default()
            })
            .with_conversation(ConversationInfo {
                id: "D1".into(),
                is_im: Some(true),
                user: Some("U1".into()),
                ..Default::default()
            })
            .with_user(UserInfo {
                id: "U1".into(),
                name: "ada".into(),
                real_name: Some("Ada Lovelace".into()),
                profile: UserProfile {
                    display_name: String::new(),
                    image_32: None,
                },
                is_bot: None,
            })
    }

    #[test]
    fn test_cache_update_creates_entry() {
        let cache = NameCache::new();
        assert!(cache.is_empty());
        cache.update("U1", |e| e.user_name = Some("ada".into()));
        assert_eq!(cache.get("U1").unwrap().user_name.as_deref(), Some("ada"));

        cache.set("U1", NameEntry::default());
        assert_eq!(cache.get("U1"), Some(NameEntry::default()));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_resolves_channel_and_dm() {
        let api = api();
        let resolver = NameResolver::default();

        let items = resolver
            .resolve_all(
                &api,
                vec![
                    item("C1", ConversationKind::Channel),
                    item("D1", ConversationKind::Dm),
                ],
            )
            .await;

        assert_eq!(items[0].name, "general");
        assert!(items[0].is_ext_shared);
        assert_eq!(items[1].name, "Ada Lovelace");
        assert_eq!(items[1].user_id.as_deref(), Some("U1"));
    }

    #[tokio::test]
    async fn test_second_resolution_hits_cache() {
        let api = api();
        let resolver = NameResolver::default();

        resolver.resolve(&api, item("D1", ConversationKind::Dm)).await;
        let again = resolver.resolve(&api, item("D1", ConversationKind::Dm)).await;

        assert_eq!(again.name, "Ada Lovelace");
        assert_eq!(api.info_calls.load(Ordering::SeqCst), 1);
        assert_eq!(api.user_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_nameless_conversation_cached() {
        let api = FakeSlackApi::new().with_conversation(ConversationInfo {
            id: "G1".into(),
            ..Default::default()
        });
        let resolver = NameResolver::default();

        let first = resolver.resolve(&api, item("G1", ConversationKind::Channel)).await;
        let second = resolver.resolve(&api, item("G1", ConversationKind::Channel)).await;

        assert_eq!(first.name, "G1");
        assert_eq!(second.name, "G1");
        assert_eq!(api.info_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_user_entry_does_not_mask_conversation_lookup() {
        let api = api();
        let resolver = NameResolver::default();
        resolver
            .cache()
            .update("C1", |e| e.user_name = Some("stale".into()));

        let resolved = resolver.resolve(&api, item("C1", ConversationKind::Channel)).await;
        assert_eq!(resolved.name, "general");
        assert_eq!(api.info_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failure_keeps_raw_id() {
        let api = FakeSlackApi::new();
        let resolver = NameResolver::default();

        let resolved = resolver.resolve(&api, item("C404", ConversationKind::Channel)).await;
        assert_eq!(resolved.name, "C404");
        assert!(resolver.cache().get("C404").is_none());
    }
}
