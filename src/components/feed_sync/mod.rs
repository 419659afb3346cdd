mod actor;
pub mod fetcher;
mod handle;
pub mod models;
pub mod reconciler;
mod scheduler;

pub use actor::CalendarOutcome;
pub use fetcher::{fetch_and_parse, validate_feed_url, FeedSource, HttpFeedFetcher};
pub use handle::SyncHandle;
pub use models::{CalendarFeed, PersistedEvent, SyncReport};
pub use reconciler::{Reconciler, SyncWindow};

use crate::components::event_store::EventStore;
use crate::config::Config;
use crate::error::SyncResult;
use async_trait::async_trait;
use scheduler::start_scheduler;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::info;

/// Periodically mirrors every stored feed into the event store
#[derive(Default)]
pub struct FeedSync {
    handle: RwLock<Option<SyncHandle>>,
    scheduler: RwLock<Option<JoinHandle<()>>>,
}

impl FeedSync {
    /// Create a new feed sync component
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the handle if the component has been initialized
    pub async fn get_handle(&self) -> Option<SyncHandle> {
        let handle_lock = self.handle.read().await;
        handle_lock.clone()
    }
}

#[async_trait]
impl super::Component for FeedSync {
    fn name(&self) -> &'static str {
        "feed_sync"
    }

    async fn init(&self, config: Arc<RwLock<Config>>, store: Arc<dyn EventStore>) -> SyncResult<()> {
        let config = config.read().await.clone();

        let fetcher = HttpFeedFetcher::new(
            &config.user_agent,
            Duration::from_secs(config.fetch_timeout_secs),
        )?;
        let reconciler = Reconciler::from_config(&config, store, Arc::new(fetcher))?;

        let mut handle_lock = self.handle.write().await;
        let handle = handle_lock
            .get_or_insert_with(|| SyncHandle::new(Arc::new(reconciler)))
            .clone();
        drop(handle_lock);

        if config.sync_interval_secs > 0 {
            let every = Duration::from_secs(config.sync_interval_secs);
            let previous = self
                .scheduler
                .write()
                .await
                .replace(start_scheduler(handle, every));
            if let Some(previous) = previous {
                previous.abort();
            }
            info!("Scheduled feed sync every {}s", config.sync_interval_secs);
        } else {
            info!("Scheduled feed sync disabled");
        }

        Ok(())
    }

    async fn shutdown(&self) -> SyncResult<()> {
        if let Some(scheduler) = self.scheduler.write().await.take() {
            scheduler.abort();
        }

        let handle_lock = self.handle.read().await;
        if let Some(handle) = &*handle_lock {
            handle.shutdown().await?;
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::event_store::InMemoryStore;
    use crate::components::Component;

    #[tokio::test]
    async fn test_reinit_replaces_scheduler() {
        let config = Arc::new(RwLock::new(Config {
            sync_interval_secs: 3600,
            ..Config::default()
        }));
        let store: Arc<dyn EventStore> = Arc::new(InMemoryStore::new());
        let feed_sync = FeedSync::new();

        feed_sync.init(Arc::clone(&config), Arc::clone(&store)).await.unwrap();
        let first = feed_sync
            .scheduler
            .read()
            .await
            .as_ref()
            .unwrap()
            .abort_handle();

        feed_sync.init(config, store).await.unwrap();
        for _ in 0..50 {
            if first.is_finished() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(first.is_finished());

        let second = feed_sync
            .scheduler
            .read()
            .await
            .as_ref()
            .unwrap()
            .abort_handle();
        assert!(!second.is_finished());

        feed_sync.shutdown().await.unwrap();
    }
}
