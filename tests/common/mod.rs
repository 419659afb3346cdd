#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use familysync::components::event_store::{EventStore, InMemoryStore};
use familysync::components::feed_sync::{validate_feed_url, CalendarFeed, FeedSource, PersistedEvent};
use familysync::error::{persistence_error, Error, SyncResult};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Fixed "now" used by reconciliation tests
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

/// One VEVENT block with explicit start and end
pub fn vevent(uid: &str, start: &str, end: &str) -> String {
    format!("BEGIN:VEVENT\r\nUID:{uid}\r\nSUMMARY:Event {uid}\r\nDTSTART:{start}\r\nDTEND:{end}\r\nEND:VEVENT\r\n")
}

/// Wrap VEVENT blocks in a VCALENDAR
pub fn calendar(events: &[String]) -> String {
    format!(
        "BEGIN:VCALENDAR\r\nVERSION:2.0\r\nPRODID:-//familysync//tests//EN\r\n{}END:VCALENDAR\r\n",
        events.concat()
    )
}

pub fn feed(owner_id: &str, calendar_id: &str) -> CalendarFeed {
    CalendarFeed::new(
        owner_id,
        calendar_id,
        Some(&format!("https://feeds.example.com/{calendar_id}.ics")),
    )
}

/// Feed source serving canned bodies by URL
#[derive(Clone, Default)]
pub struct StubFeedSource {
    bodies: Arc<Mutex<HashMap<String, String>>>,
    fetches: Arc<AtomicUsize>,
    active: Arc<AtomicUsize>,
    peak_active: Arc<AtomicUsize>,
    panic_next: Arc<AtomicBool>,
    delay: Option<Duration>,
}

impl StubFeedSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every fetch waits this long before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub async fn serve(&self, url: &str, body: String) {
        self.bodies.lock().await.insert(url.to_string(), body);
    }

    pub async fn serve_feed(&self, feed: &CalendarFeed, body: String) {
        self.serve(feed.url.as_deref().unwrap(), body).await;
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Most fetches that were in progress at the same time
    pub fn peak_concurrency(&self) -> usize {
        self.peak_active.load(Ordering::SeqCst)
    }

    /// Make the next fetch panic instead of answering
    pub fn panic_on_next_fetch(&self) {
        self.panic_next.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl FeedSource for StubFeedSource {
    async fn fetch(&self, url: &str) -> SyncResult<String> {
        validate_feed_url(url)?;
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.panic_next.swap(false, Ordering::SeqCst) {
            panic!("feed host sent something the stub cannot handle");
        }

        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_active.fetch_max(active, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.active.fetch_sub(1, Ordering::SeqCst);

        self.bodies
            .lock()
            .await
            .get(url)
            .cloned()
            .ok_or(Error::FetchStatus {
                status: 404,
                reason: "Not Found".to_string(),
            })
    }
}

/// In-memory store that fails selected operations
#[derive(Clone, Default)]
pub struct FailingStore {
    pub inner: InMemoryStore,
    pub fail_upserts: HashSet<String>,
    pub fail_list: bool,
    pub fail_delete: bool,
    pub fail_touch: bool,
}

impl FailingStore {
    pub fn new(inner: InMemoryStore) -> Self {
        Self {
            inner,
            ..Self::default()
        }
    }
}

#[async_trait]
impl EventStore for FailingStore {
    async fn get_feed(&self, calendar_id: &str) -> SyncResult<Option<CalendarFeed>> {
        self.inner.get_feed(calendar_id).await
    }

    async fn list_feeds(&self) -> SyncResult<Vec<CalendarFeed>> {
        self.inner.list_feeds().await
    }

    async fn save_feed(&self, feed: &CalendarFeed) -> SyncResult<()> {
        self.inner.save_feed(feed).await
    }

    async fn upsert_event(&self, event: &PersistedEvent) -> SyncResult<()> {
        if self.fail_upserts.contains(&event.event_id) {
            return Err(persistence_error("upsert rejected"));
        }
        self.inner.upsert_event(event).await
    }

    async fn list_event_ids(&self, calendar_id: &str) -> SyncResult<HashSet<String>> {
        if self.fail_list {
            return Err(persistence_error("list rejected"));
        }
        self.inner.list_event_ids(calendar_id).await
    }

    async fn list_events(&self, calendar_id: &str) -> SyncResult<Vec<PersistedEvent>> {
        self.inner.list_events(calendar_id).await
    }

    async fn delete_events(&self, calendar_id: &str, event_ids: &[String]) -> SyncResult<()> {
        if self.fail_delete {
            return Err(persistence_error("delete rejected"));
        }
        self.inner.delete_events(calendar_id, event_ids).await
    }

    async fn touch_last_synced(&self, calendar_id: &str, at: DateTime<Utc>) -> SyncResult<()> {
        if self.fail_touch {
            return Err(persistence_error("touch rejected"));
        }
        self.inner.touch_last_synced(calendar_id, at).await
    }
}

/// Format a UTC instant as an iCalendar DATE-TIME value
pub fn stamp(at: DateTime<Utc>) -> String {
    at.format("%Y%m%dT%H%M%SZ").to_string()
}
