//! Unread monitor service.
//!
//! Runs poll cycles against the Slack API, keeps the latest snapshot of
//! unread conversations and reports connection health.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use slack_api::{ApiError, ChannelSection, SlackApi, SlackClient};
use tracing::{debug, info, instrument, warn};

use super::classify::classify;
use super::events::{MonitorEvent, MonitorEventBroadcaster};
use super::grouping::{GroupedSection, group_by_sections};
use super::names::{NameCache, NameResolver};
use super::scheduler::PollCycle;
use crate::credentials::{CredentialExtractor, Credentials, WorkspaceMetadata};
use crate::domain::{AggregatedCounts, ConnectionStatus, ConversationItem, sort_by_latest};

/// Builds an API client for a set of credentials.
pub trait ApiFactory: Send + Sync {
    fn create(&self, credentials: &Credentials) -> Result<Arc<dyn SlackApi>, ApiError>;
}

/// Production factory: one [`SlackClient`] per session over a shared
/// `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct SlackApiFactory {
    http: reqwest::Client,
}

impl SlackApiFactory {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }
}

impl ApiFactory for SlackApiFactory {
    fn create(&self, credentials: &Credentials) -> Result<Arc<dyn SlackApi>, ApiError> {
        let mut client = SlackClient::new(
            self.http.clone(),
            credentials.token(),
            credentials.cookie(),
            credentials.domain(),
        )?;
        if let Some(team_id) = credentials.team_id() {
            client = client.with_team_id(team_id);
        }
        debug!(base_url = %client.base_url(), "Created Slack API client");
        Ok(Arc::new(client))
    }
}

/// Immutable view of the monitor state, replaced whole on every change.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MonitorSnapshot {
    /// Unread conversations, newest first.
    pub items: Vec<ConversationItem>,
    pub aggregated: AggregatedCounts,
    pub status: ConnectionStatus,
    pub sections: Vec<ChannelSection>,
    pub last_success_at: Option<DateTime<Utc>>,
}

impl MonitorSnapshot {
    /// Items arranged by the current sidebar sections.
    pub fn groups(&self) -> Vec<GroupedSection> {
        group_by_sections(&self.items, &self.sections)
    }
}

/// An authenticated session: credentials plus the client built from them.
struct Session {
    credentials: Credentials,
    api: Arc<dyn SlackApi>,
}

/// Tracks unread conversations for the active workspace.
pub struct UnreadMonitor {
    extractor: Arc<dyn CredentialExtractor>,
    factory: Arc<dyn ApiFactory>,
    session: Mutex<Option<Arc<Session>>>,
    snapshot: RwLock<Arc<MonitorSnapshot>>,
    resolver: NameResolver,
    events: MonitorEventBroadcaster,
}

impl UnreadMonitor {
    pub fn new(extractor: Arc<dyn CredentialExtractor>, factory: Arc<dyn ApiFactory>) -> Self {
        Self {
            extractor,
            factory,
            session: Mutex::new(None),
            snapshot: RwLock::new(Arc::new(MonitorSnapshot::default())),
            resolver: NameResolver::new(Arc::new(NameCache::new())),
            events: MonitorEventBroadcaster::new(),
        }
    }

    pub fn with_events(mut self, events: MonitorEventBroadcaster) -> Self {
        self.events = events;
        self
    }

    pub fn snapshot(&self) -> Arc<MonitorSnapshot> {
        self.snapshot.read().clone()
    }

    pub fn status(&self) -> ConnectionStatus {
        self.snapshot.read().status.clone()
    }

    pub fn events(&self) -> &MonitorEventBroadcaster {
        &self.events
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<MonitorEvent> {
        self.events.subscribe()
    }

    pub fn name_cache(&self) -> &Arc<NameCache> {
        self.resolver.cache()
    }

    /// Workspace of the current session, if authenticated.
    pub fn active_workspace(&self) -> Option<WorkspaceMetadata> {
        self.session
            .lock()
            .as_ref()
            .and_then(|s| s.credentials.workspace.clone())
    }

    pub fn has_session(&self) -> bool {
        self.session.lock().is_some()
    }

    /// Run one poll cycle and return the resulting snapshot.
    ///
    /// Failures never propagate: they become the snapshot status and the
    /// last good item list is kept.
    #[instrument(skip(self))]
    pub async fn poll_once(&self) -> Arc<MonitorSnapshot> {
        let Some(session) = self.ensure_session().await else {
            return self.snapshot();
        };

        let (counts, prefs) = tokio::join!(session.api.counts(), session.api.user_prefs());

        let counts = match counts {
            Ok(counts) => counts,
            Err(e) => {
                self.handle_counts_error(&session, e);
                return self.snapshot();
            }
        };

        let muted = match prefs {
            Ok(prefs) => prefs.muted_channel_ids(),
            Err(e) => {
                warn!(error = %e, "Failed to fetch mute preferences, treating all channels as unmuted");
                HashSet::new()
            }
        };

        let team_id = session.credentials.team_id().unwrap_or_default();
        let classified = classify(&counts, &muted, team_id);
        let mut items = self
            .resolver
            .resolve_all(session.api.as_ref(), classified)
            .await;
        sort_by_latest(&mut items);

        let aggregated = AggregatedCounts::from_items(&items);
        let item_count = items.len();
        let now = Utc::now();
        let old_status = self.update_snapshot(|snapshot| {
            snapshot.items = items;
            snapshot.aggregated = aggregated.clone();
            snapshot.last_success_at = Some(now);
            std::mem::replace(&mut snapshot.status, ConnectionStatus::Connected)
        });
        debug!(
            items = item_count,
            dms = aggregated.total_dms,
            mentions = aggregated.total_mentions,
            channels = aggregated.total_channels,
            "Poll cycle complete"
        );
        self.events.publish(MonitorEvent::Updated {
            item_count,
            aggregated,
            timestamp: now,
        });
        if old_status != ConnectionStatus::Connected {
            self.publish_status_change(old_status, ConnectionStatus::Connected);
        }

        if self.snapshot.read().sections.is_empty() {
            self.refresh_sections_with(&session).await;
        }

        self.snapshot()
    }

    /// Refresh sidebar sections for the current session, if any.
    pub async fn refresh_sections(&self) {
        let session = self.session.lock().clone();
        match session {
            Some(session) => self.refresh_sections_with(&session).await,
            None => debug!("No session, skipping section refresh"),
        }
    }

    async fn refresh_sections_with(&self, session: &Session) {
        match session.api.sidebar_sections().await {
            Ok(sections) if sections.is_empty() => {
                debug!("Workspace reported no sidebar sections");
            }
            Ok(sections) => {
                let section_count = sections.len();
                self.update_snapshot(|snapshot| snapshot.sections = sections);
                debug!(sections = section_count, "Refreshed sidebar sections");
                self.events.publish(MonitorEvent::SectionsUpdated {
                    section_count,
                    timestamp: Utc::now(),
                });
            }
            Err(e) => {
                warn!(error = %e, "Failed to refresh sidebar sections, keeping cached list");
            }
        }
    }

    async fn ensure_session(&self) -> Option<Arc<Session>> {
        if let Some(session) = self.session.lock().clone() {
            return Some(session);
        }

        let credentials = match self.extractor.extract().await {
            Ok(credentials) => credentials,
            Err(e) => {
                warn!(error = %e, "Credential extraction failed");
                self.set_status(ConnectionStatus::Error(e.to_string()));
                return None;
            }
        };

        let api = match self.factory.create(&credentials) {
            Ok(api) => api,
            Err(e) => {
                warn!(error = %e, "Failed to create API client");
                self.set_status(ConnectionStatus::Error(e.to_string()));
                return None;
            }
        };

        info!(
            workspace = credentials.team_id().unwrap_or("-"),
            domain = credentials.domain().unwrap_or("-"),
            "Session established"
        );
        let session = Arc::new(Session { credentials, api });
        *self.session.lock() = Some(session.clone());
        Some(session)
    }

    fn handle_counts_error(&self, session: &Arc<Session>, error: ApiError) {
        match error {
            ApiError::Auth => {
                warn!("Session rejected, credentials will be re-read");
                self.discard_session(session);
                self.set_status(ConnectionStatus::Reconnecting);
            }
            ApiError::RateLimited { retry_after } => {
                warn!(
                    retry_after_secs = retry_after.as_secs(),
                    "Rate limited, skipping cycle"
                );
            }
            ApiError::Transport(e) => {
                warn!(error = %e, "Slack unreachable");
                self.set_status(ConnectionStatus::Offline);
            }
            other => {
                warn!(error = %other, "Unread counts request failed");
                self.discard_session(session);
                self.set_status(ConnectionStatus::Error(other.to_string()));
            }
        }
    }

    /// Drop `failed` unless another cycle has already replaced it.
    fn discard_session(&self, failed: &Arc<Session>) {
        let mut slot = self.session.lock();
        if slot.as_ref().is_some_and(|current| Arc::ptr_eq(current, failed)) {
            *slot = None;
        }
    }

    /// Apply `f` to a copy of the snapshot and publish the copy in one write.
    fn update_snapshot<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut MonitorSnapshot) -> R,
    {
        let mut guard = self.snapshot.write();
        let mut next = MonitorSnapshot::clone(&guard);
        let result = f(&mut next);
        *guard = Arc::new(next);
        result
    }

    fn set_status(&self, new_status: ConnectionStatus) {
        let old_status = {
            let mut guard = self.snapshot.write();
            if guard.status == new_status {
                return;
            }
            let mut next = MonitorSnapshot::clone(&guard);
            let old = std::mem::replace(&mut next.status, new_status.clone());
            *guard = Arc::new(next);
            old
        };
        self.publish_status_change(old_status, new_status);
    }

    fn publish_status_change(&self, old_status: ConnectionStatus, new_status: ConnectionStatus) {
        info!(from = %old_status, to = %new_status, "Connection status changed");
        self.events.publish(MonitorEvent::StatusChanged {
            old_status,
            new_status,
            timestamp: Utc::now(),
        });
    }
}

#[async_trait]
impl PollCycle for UnreadMonitor {
    async fn poll(&self) {
        self.poll_once().await;
    }

    async fn refresh_sections(&self) {
        UnreadMonitor::refresh_sections(self).await;
    }
}
