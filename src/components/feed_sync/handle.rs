use super::actor::{CalendarOutcome, SyncActor, SyncActorHandle};
use super::models::SyncReport;
use super::reconciler::Reconciler;
use crate::error::SyncResult;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Handle for interacting with the feed sync actor
#[derive(Clone)]
pub struct SyncHandle {
    actor_handle: SyncActorHandle,
    _actor_task: Arc<JoinHandle<()>>,
}

impl SyncHandle {
    /// Create a new SyncHandle and spawn the actor
    pub fn new(reconciler: Arc<Reconciler>) -> Self {
        let (mut actor, handle) = SyncActor::new(reconciler);

        let actor_task = tokio::spawn(async move {
            actor.run().await;
        });

        Self {
            actor_handle: handle,
            _actor_task: Arc::new(actor_task),
        }
    }

    /// Sync one calendar; fails with `SyncInProgress` if it is already running
    pub async fn sync_calendar(&self, calendar_id: &str, caller: &str) -> SyncResult<SyncReport> {
        self.actor_handle.sync_calendar(calendar_id, caller).await
    }

    /// Sync all stored feeds concurrently
    pub async fn sync_all(&self) -> SyncResult<Vec<CalendarOutcome>> {
        self.actor_handle.sync_all().await
    }

    /// Shutdown the actor
    pub async fn shutdown(&self) -> SyncResult<()> {
        self.actor_handle.shutdown().await
    }
}
