use crate::components::event_store::{EventStore, InMemoryStore, RedisStore};
use crate::components::{ComponentManager, FeedSync};
use crate::config::Config;
use crate::error::{Error, SyncResult};
use crate::shutdown;
use std::sync::Arc;
use tokio::sync::{oneshot, RwLock};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Initialize logging with environment-based configuration
pub fn init_logging() -> miette::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,redis=warn,reqwest=warn,hyper=warn")),
        )
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| Error::Other(format!("Failed to set up logging: {}", e)))?;

    Ok(())
}

/// Load and initialize the application config
pub async fn load_config() -> miette::Result<Arc<RwLock<Config>>> {
    match Config::load() {
        Ok(config) => Ok(Arc::new(RwLock::new(config))),
        Err(e) => {
            error!("Failed to load configuration: {:?}", e);
            Err(e.into())
        }
    }
}

/// Connect to Redis when configured, falling back to the in-memory store
pub async fn build_store(config: &Config) -> Arc<dyn EventStore> {
    if let Some(redis_url) = &config.redis_url {
        match RedisStore::new(redis_url) {
            Ok(store) => match store.ping().await {
                Ok(()) => {
                    info!("Connected to Redis successfully");
                    return Arc::new(store);
                }
                Err(e) => error!("Failed to reach Redis: {}", e),
            },
            Err(e) => error!("Failed to connect to Redis: {}", e),
        }
        warn!("Using in-memory store as fallback; synced events will not survive a restart");
    } else {
        info!("REDIS_URL not set, using in-memory store");
    }
    Arc::new(InMemoryStore::new())
}

/// Write configured feeds into the store, keeping last-synced times of
/// feeds that already exist
pub async fn seed_feeds(store: &dyn EventStore, config: &Config) -> SyncResult<()> {
    for feed in &config.feeds {
        let mut feed = feed.clone();
        if let Some(existing) = store.get_feed(&feed.calendar_id).await? {
            feed.last_synced = existing.last_synced;
        }
        store.save_feed(&feed).await?;
        info!("Registered feed for calendar {}", feed.calendar_id);
    }
    Ok(())
}

/// Start the sync service and run until a shutdown signal arrives
pub async fn start_service(config: Arc<RwLock<Config>>) -> miette::Result<()> {
    let store = {
        let config_read = config.read().await;
        let store = build_store(&config_read).await;
        seed_feeds(store.as_ref(), &config_read).await?;
        store
    };

    // Initialize component manager
    let mut component_manager = ComponentManager::new(Arc::clone(&config));

    // Register feed sync component
    component_manager.register(FeedSync::new());

    let component_manager = Arc::new(component_manager);
    component_manager.init_all(store).await?;

    // Create shutdown channel
    let (shutdown_send, shutdown_recv) = oneshot::channel();

    // Spawn signal handler task
    let shutdown_components = Arc::clone(&component_manager);
    tokio::spawn(async move {
        shutdown::handle_signals(shutdown_send, shutdown_components).await;
    });

    info!("familysync is running");

    if shutdown_recv.await.is_err() {
        error!("Shutdown handler stopped unexpectedly");
    }
    info!("Received shutdown signal, exiting");
    Ok(())
}
