mod memory;
mod redis_store;

pub use self::memory::InMemoryStore;
pub use self::redis_store::RedisStore;

use crate::components::feed_sync::models::{CalendarFeed, PersistedEvent};
use crate::error::SyncResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashSet;

/// Persistence for feeds and their synced events.
///
/// All event operations are scoped to one calendar id, so runs for
/// different calendars never touch each other's rows.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Look up a feed, `None` when the calendar does not exist
    async fn get_feed(&self, calendar_id: &str) -> SyncResult<Option<CalendarFeed>>;

    async fn list_feeds(&self) -> SyncResult<Vec<CalendarFeed>>;

    /// Create or replace a feed record
    async fn save_feed(&self, feed: &CalendarFeed) -> SyncResult<()>;

    /// Insert or overwrite the row keyed by `(calendar_id, event_id)`
    async fn upsert_event(&self, event: &PersistedEvent) -> SyncResult<()>;

    async fn list_event_ids(&self, calendar_id: &str) -> SyncResult<HashSet<String>>;

    async fn list_events(&self, calendar_id: &str) -> SyncResult<Vec<PersistedEvent>>;

    async fn delete_events(&self, calendar_id: &str, event_ids: &[String]) -> SyncResult<()>;

    async fn touch_last_synced(&self, calendar_id: &str, at: DateTime<Utc>) -> SyncResult<()>;
}
