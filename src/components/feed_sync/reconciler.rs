use super::fetcher::{fetch_and_parse, FeedSource};
use super::models::{CalendarFeed, PersistedEvent, SyncReport};
use crate::components::event_store::EventStore;
use crate::config::{Config, DEFAULT_WINDOW_FUTURE_DAYS, DEFAULT_WINDOW_PAST_DAYS};
use crate::error::{input_error, Error, SyncResult};
use crate::ical::{CalendarEvent, IcalParser};
use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Range of event times mirrored into the store, relative to now
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncWindow {
    pub past_days: i64,
    pub future_days: i64,
}

impl Default for SyncWindow {
    fn default() -> Self {
        Self {
            past_days: DEFAULT_WINDOW_PAST_DAYS,
            future_days: DEFAULT_WINDOW_FUTURE_DAYS,
        }
    }
}

impl SyncWindow {
    /// `[now - past_days, now + future_days)`
    pub fn bounds(&self, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        let start = Duration::try_days(self.past_days)
            .and_then(|past| now.checked_sub_signed(past))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let end = Duration::try_days(self.future_days)
            .and_then(|future| now.checked_add_signed(future))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        (start, end)
    }

    /// Whether an interval overlaps the window at all
    pub fn overlaps(&self, now: DateTime<Utc>, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        let (window_start, window_end) = self.bounds(now);
        end > window_start && start < window_end
    }
}

/// Mirrors one feed's current window into the event store.
///
/// Runs for the same calendar must not overlap: pruning reads the stored ids
/// after upserting, so a concurrent run could delete rows the other just
/// wrote. `SyncActor` enforces this; direct callers must do the same.
///
/// Repeating a run is a no-op for events that carry a UID. Events without
/// one get a fresh placeholder on every parse, so each run replaces their
/// row: one upsert plus one prune per such event.
pub struct Reconciler {
    store: Arc<dyn EventStore>,
    source: Arc<dyn FeedSource>,
    parser: IcalParser,
    zone: Tz,
    window: SyncWindow,
}

impl Reconciler {
    pub fn new(store: Arc<dyn EventStore>, source: Arc<dyn FeedSource>) -> Self {
        Self {
            store,
            source,
            parser: IcalParser::default(),
            zone: chrono_tz::UTC,
            window: SyncWindow::default(),
        }
    }

    /// Build a reconciler with the configured zone and window
    pub fn from_config(
        config: &Config,
        store: Arc<dyn EventStore>,
        source: Arc<dyn FeedSource>,
    ) -> SyncResult<Self> {
        Ok(Self::new(store, source)
            .with_zone(config.floating_zone()?)
            .with_window(SyncWindow {
                past_days: config.window_past_days,
                future_days: config.window_future_days,
            }))
    }

    pub fn with_parser(mut self, parser: IcalParser) -> Self {
        self.parser = parser;
        self
    }

    /// Zone for floating and date-only times
    pub fn with_zone(mut self, zone: Tz) -> Self {
        self.zone = zone;
        self
    }

    pub fn with_window(mut self, window: SyncWindow) -> Self {
        self.window = window;
        self
    }

    pub fn store(&self) -> &Arc<dyn EventStore> {
        &self.store
    }

    /// Sync a calendar on behalf of `caller`.
    ///
    /// A calendar owned by someone else is reported as not found.
    pub async fn sync(&self, calendar_id: &str, caller: &str) -> SyncResult<SyncReport> {
        if calendar_id.trim().is_empty() {
            return Err(input_error("calendarId is required"));
        }
        if caller.trim().is_empty() {
            return Err(Error::Unauthorized);
        }

        let feed = self
            .store
            .get_feed(calendar_id)
            .await?
            .filter(|feed| feed.owner_id == caller)
            .ok_or_else(|| Error::CalendarNotFound(calendar_id.to_string()))?;

        self.reconcile(&feed).await
    }

    pub async fn reconcile(&self, feed: &CalendarFeed) -> SyncResult<SyncReport> {
        self.reconcile_at(feed, Utc::now()).await
    }

    /// Run one reconciliation as if the current time were `now`.
    ///
    /// Fetch and parse failures abort before the store is touched. After
    /// that, individual write failures are counted in the report.
    pub async fn reconcile_at(
        &self,
        feed: &CalendarFeed,
        now: DateTime<Utc>,
    ) -> SyncResult<SyncReport> {
        let url = feed
            .url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| input_error("Calendar has no feed URL to sync"))?;

        let events = fetch_and_parse(self.source.as_ref(), &self.parser, url).await?;
        let parsed_count = events.len();
        let rows = self.window_events(feed, events, now);

        let mut report = SyncReport {
            calendar_id: feed.calendar_id.clone(),
            total: rows.len(),
            ..SyncReport::default()
        };

        for row in &rows {
            match self.store.upsert_event(row).await {
                Ok(()) => report.synced += 1,
                Err(e) => {
                    warn!(
                        "Failed to store event {} for calendar {}: {}",
                        row.event_id, feed.calendar_id, e
                    );
                    report.errors += 1;
                }
            }
        }

        let feed_ids: HashSet<&str> = rows.iter().map(|row| row.event_id.as_str()).collect();
        match self.store.list_event_ids(&feed.calendar_id).await {
            Ok(existing) => {
                let stale: Vec<String> = existing
                    .into_iter()
                    .filter(|id| !feed_ids.contains(id.as_str()))
                    .collect();
                if !stale.is_empty() {
                    match self.store.delete_events(&feed.calendar_id, &stale).await {
                        Ok(()) => report.pruned = stale.len(),
                        Err(e) => {
                            warn!(
                                "Failed to prune {} events for calendar {}: {}",
                                stale.len(),
                                feed.calendar_id,
                                e
                            );
                            report.errors += 1;
                        }
                    }
                }
            }
            Err(e) => {
                warn!(
                    "Failed to list stored events for calendar {}: {}",
                    feed.calendar_id, e
                );
                report.errors += 1;
            }
        }

        if let Err(e) = self.store.touch_last_synced(&feed.calendar_id, now).await {
            warn!(
                "Failed to update last synced time for calendar {}: {}",
                feed.calendar_id, e
            );
        }

        info!(
            "Synced calendar {}: {} parsed, {} in window, {} stored, {} pruned, {} errors",
            feed.calendar_id,
            parsed_count,
            report.total,
            report.synced,
            report.pruned,
            report.errors
        );

        Ok(report)
    }

    /// Normalize to UTC, keep events overlapping the window and collapse
    /// repeated uids so each store row is written once.
    fn window_events(
        &self,
        feed: &CalendarFeed,
        events: Vec<CalendarEvent>,
        now: DateTime<Utc>,
    ) -> Vec<PersistedEvent> {
        let mut rows: Vec<PersistedEvent> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();

        for event in events {
            let (Some(start_time), Some(end_time)) =
                (event.start.to_utc(&self.zone), event.end.to_utc(&self.zone))
            else {
                warn!("Skipping event {} with unresolvable times", event.uid);
                continue;
            };

            if !self.window.overlaps(now, start_time, end_time) {
                debug!("Event {} is outside the sync window", event.uid);
                continue;
            }

            let row = PersistedEvent {
                calendar_id: feed.calendar_id.clone(),
                owner_id: feed.owner_id.clone(),
                event_id: event.uid,
                title: event.summary,
                start_time,
                end_time,
                is_busy: event.is_busy,
            };

            match positions.get(&row.event_id) {
                Some(&idx) => {
                    debug!("Duplicate uid {} in feed, keeping the later one", row.event_id);
                    rows[idx] = row;
                }
                None => {
                    positions.insert(row.event_id.clone(), rows.len());
                    rows.push(row);
                }
            }
        }

        rows
    }
}
