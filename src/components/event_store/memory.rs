use super::EventStore;
use crate::components::feed_sync::models::{CalendarFeed, PersistedEvent};
use crate::error::{persistence_error, SyncResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Default)]
struct Tables {
    feeds: BTreeMap<String, CalendarFeed>,
    /// calendar id -> event id -> row
    events: HashMap<String, BTreeMap<String, PersistedEvent>>,
}

/// Process-local store, used when Redis is not configured
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with feeds
    pub async fn with_feeds(feeds: impl IntoIterator<Item = CalendarFeed>) -> Self {
        let store = Self::new();
        {
            let mut tables = store.tables.lock().await;
            for feed in feeds {
                tables.feeds.insert(feed.calendar_id.clone(), feed);
            }
        }
        store
    }
}

#[async_trait]
impl EventStore for InMemoryStore {
    async fn get_feed(&self, calendar_id: &str) -> SyncResult<Option<CalendarFeed>> {
        let tables = self.tables.lock().await;
        Ok(tables.feeds.get(calendar_id).cloned())
    }

    async fn list_feeds(&self) -> SyncResult<Vec<CalendarFeed>> {
        let tables = self.tables.lock().await;
        Ok(tables.feeds.values().cloned().collect())
    }

    async fn save_feed(&self, feed: &CalendarFeed) -> SyncResult<()> {
        let mut tables = self.tables.lock().await;
        tables.feeds.insert(feed.calendar_id.clone(), feed.clone());
        Ok(())
    }

    async fn upsert_event(&self, event: &PersistedEvent) -> SyncResult<()> {
        let mut tables = self.tables.lock().await;
        tables
            .events
            .entry(event.calendar_id.clone())
            .or_default()
            .insert(event.event_id.clone(), event.clone());
        Ok(())
    }

    async fn list_event_ids(&self, calendar_id: &str) -> SyncResult<HashSet<String>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .events
            .get(calendar_id)
            .map(|rows| rows.keys().cloned().collect())
            .unwrap_or_default())
    }

    async fn list_events(&self, calendar_id: &str) -> SyncResult<Vec<PersistedEvent>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .events
            .get(calendar_id)
            .map(|rows| rows.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn delete_events(&self, calendar_id: &str, event_ids: &[String]) -> SyncResult<()> {
        let mut tables = self.tables.lock().await;
        if let Some(rows) = tables.events.get_mut(calendar_id) {
            for event_id in event_ids {
                rows.remove(event_id);
            }
        }
        Ok(())
    }

    async fn touch_last_synced(&self, calendar_id: &str, at: DateTime<Utc>) -> SyncResult<()> {
        let mut tables = self.tables.lock().await;
        let feed = tables
            .feeds
            .get_mut(calendar_id)
            .ok_or_else(|| persistence_error(&format!("No feed stored for {}", calendar_id)))?;
        feed.last_synced = Some(at);
        Ok(())
    }
}
