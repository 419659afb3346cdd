use super::EventStore;
use crate::components::feed_sync::models::{CalendarFeed, PersistedEvent};
use crate::error::{persistence_error, SyncResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::{AsyncCommands, Client as RedisClient};
use std::collections::HashSet;
use tracing::{debug, info};

/// Redis key layout
pub mod keys {
    /// Set of all calendar ids with a stored feed
    pub const FEEDS: &str = "familysync:feeds";
    /// Feed JSON, suffixed with the calendar id
    pub const FEED_PREFIX: &str = "familysync:feed:";
    /// Hash of event id -> event JSON, suffixed with the calendar id
    pub const EVENTS_PREFIX: &str = "familysync:events:";

    pub fn feed(calendar_id: &str) -> String {
        format!("{}{}", FEED_PREFIX, calendar_id)
    }

    pub fn events(calendar_id: &str) -> String {
        format!("{}{}", EVENTS_PREFIX, calendar_id)
    }
}

/// Redis-backed store
#[derive(Clone)]
pub struct RedisStore {
    client: RedisClient,
}

impl RedisStore {
    /// Create a client for the given URL; no connection is made yet
    pub fn new(redis_url: &str) -> SyncResult<Self> {
        info!("Connecting to Redis at {}", redis_url);

        let client = RedisClient::open(redis_url)
            .map_err(|e| persistence_error(&format!("Failed to create Redis client: {}", e)))?;

        Ok(Self { client })
    }

    /// Get a Redis connection from the client
    async fn get_connection(&self) -> SyncResult<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| persistence_error(&format!("Failed to connect to Redis: {}", e)))
    }

    /// Verify the server is reachable
    pub async fn ping(&self) -> SyncResult<()> {
        let mut conn = self.get_connection().await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}

#[async_trait]
impl EventStore for RedisStore {
    async fn get_feed(&self, calendar_id: &str) -> SyncResult<Option<CalendarFeed>> {
        let mut conn = self.get_connection().await?;

        let data: Option<String> = conn.get(keys::feed(calendar_id)).await?;
        match data {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn list_feeds(&self) -> SyncResult<Vec<CalendarFeed>> {
        let mut conn = self.get_connection().await?;

        let calendar_ids: Vec<String> = conn.smembers(keys::FEEDS).await?;
        let mut feeds = Vec::with_capacity(calendar_ids.len());
        for calendar_id in calendar_ids {
            let data: Option<String> = conn.get(keys::feed(&calendar_id)).await?;
            if let Some(json) = data {
                feeds.push(serde_json::from_str(&json)?);
            }
        }

        Ok(feeds)
    }

    async fn save_feed(&self, feed: &CalendarFeed) -> SyncResult<()> {
        let mut conn = self.get_connection().await?;

        let json = serde_json::to_string(feed)?;
        conn.set::<_, _, ()>(keys::feed(&feed.calendar_id), json).await?;
        conn.sadd::<_, _, ()>(keys::FEEDS, &feed.calendar_id).await?;

        Ok(())
    }

    async fn upsert_event(&self, event: &PersistedEvent) -> SyncResult<()> {
        let mut conn = self.get_connection().await?;

        let json = serde_json::to_string(event)?;
        conn.hset::<_, _, _, ()>(keys::events(&event.calendar_id), &event.event_id, json)
            .await?;

        debug!("Stored event {} for {}", event.event_id, event.calendar_id);
        Ok(())
    }

    async fn list_event_ids(&self, calendar_id: &str) -> SyncResult<HashSet<String>> {
        let mut conn = self.get_connection().await?;

        let ids: Vec<String> = conn.hkeys(keys::events(calendar_id)).await?;
        Ok(ids.into_iter().collect())
    }

    async fn list_events(&self, calendar_id: &str) -> SyncResult<Vec<PersistedEvent>> {
        let mut conn = self.get_connection().await?;

        let rows: Vec<String> = conn.hvals(keys::events(calendar_id)).await?;
        rows.iter()
            .map(|json| serde_json::from_str(json).map_err(Into::into))
            .collect()
    }

    async fn delete_events(&self, calendar_id: &str, event_ids: &[String]) -> SyncResult<()> {
        if event_ids.is_empty() {
            return Ok(());
        }
        let mut conn = self.get_connection().await?;

        conn.hdel::<_, _, ()>(keys::events(calendar_id), event_ids.to_vec())
            .await?;

        info!("Deleted {} events for {}", event_ids.len(), calendar_id);
        Ok(())
    }

    async fn touch_last_synced(&self, calendar_id: &str, at: DateTime<Utc>) -> SyncResult<()> {
        let mut feed = self
            .get_feed(calendar_id)
            .await?
            .ok_or_else(|| persistence_error(&format!("No feed stored for {}", calendar_id)))?;
        feed.last_synced = Some(at);

        let mut conn = self.get_connection().await?;
        let json = serde_json::to_string(&feed)?;
        conn.set::<_, _, ()>(keys::feed(calendar_id), json).await?;

        Ok(())
    }
}
