use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An external calendar feed owned by one user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarFeed {
    pub owner_id: String,
    pub calendar_id: String,
    /// Feed URL, absent for calendars that are not URL based
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub last_synced: Option<DateTime<Utc>>,
}

impl CalendarFeed {
    pub fn new(owner_id: &str, calendar_id: &str, url: Option<&str>) -> Self {
        Self {
            owner_id: owner_id.to_string(),
            calendar_id: calendar_id.to_string(),
            url: url.map(str::to_string),
            last_synced: None,
        }
    }
}

/// Stored busy/free interval, unique on `(calendar_id, event_id)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedEvent {
    pub calendar_id: String,
    pub owner_id: String,
    /// The feed's UID
    pub event_id: String,
    pub title: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub is_busy: bool,
}

/// Outcome of one reconciliation run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub calendar_id: String,
    /// Events written successfully
    pub synced: usize,
    /// Failed writes, deletes or listings
    pub errors: usize,
    /// Events inside the sync window
    pub total: usize,
    /// Stored events removed because they left the feed window
    pub pruned: usize,
}
