use super::models::SyncReport;
use super::reconciler::Reconciler;
use crate::error::{component_error, Error, SyncResult};
use futures::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Result of one calendar inside a sync-all run
#[derive(Debug)]
pub struct CalendarOutcome {
    pub calendar_id: String,
    pub result: SyncResult<SyncReport>,
}

/// Commands that can be sent to the sync actor
pub enum SyncCommand {
    SyncCalendar {
        calendar_id: String,
        caller: String,
        respond_to: oneshot::Sender<SyncResult<SyncReport>>,
    },
    SyncAll(oneshot::Sender<SyncResult<Vec<CalendarOutcome>>>),
    /// Sent by a finished run to release its calendar
    Finished(String),
    Shutdown,
}

/// Handle for communicating with the sync actor
#[derive(Clone)]
pub struct SyncActorHandle {
    command_tx: mpsc::Sender<SyncCommand>,
}

impl SyncActorHandle {
    /// Sync one calendar on behalf of its owner
    pub async fn sync_calendar(&self, calendar_id: &str, caller: &str) -> SyncResult<SyncReport> {
        let (respond_to, response_rx) = oneshot::channel();
        self.command_tx
            .send(SyncCommand::SyncCalendar {
                calendar_id: calendar_id.to_string(),
                caller: caller.to_string(),
                respond_to,
            })
            .await
            .map_err(|e| component_error(&format!("Actor mailbox error: {}", e)))?;

        response_rx
            .await
            .map_err(|_| component_error("Response channel closed"))?
    }

    /// Sync every stored feed that has a URL
    pub async fn sync_all(&self) -> SyncResult<Vec<CalendarOutcome>> {
        let (respond_to, response_rx) = oneshot::channel();
        self.command_tx
            .send(SyncCommand::SyncAll(respond_to))
            .await
            .map_err(|e| component_error(&format!("Actor mailbox error: {}", e)))?;

        response_rx
            .await
            .map_err(|_| component_error("Response channel closed"))?
    }

    /// Shutdown the actor
    pub async fn shutdown(&self) -> SyncResult<()> {
        let _ = self.command_tx.send(SyncCommand::Shutdown).await;
        Ok(())
    }
}

/// Serializes runs per calendar while letting different calendars sync in
/// parallel
pub struct SyncActor {
    reconciler: Arc<Reconciler>,
    command_rx: mpsc::Receiver<SyncCommand>,
    /// Used by spawned runs to report completion without keeping the
    /// mailbox open
    self_tx: mpsc::WeakSender<SyncCommand>,
    in_flight: HashSet<String>,
}

impl SyncActor {
    /// Create a new actor and return its handle
    pub fn new(reconciler: Arc<Reconciler>) -> (Self, SyncActorHandle) {
        let (command_tx, command_rx) = mpsc::channel(32);

        let actor = Self {
            reconciler,
            command_rx,
            self_tx: command_tx.downgrade(),
            in_flight: HashSet::new(),
        };

        let handle = SyncActorHandle { command_tx };

        (actor, handle)
    }

    /// Start the actor's processing loop
    pub async fn run(&mut self) {
        info!("Feed sync actor started");

        while let Some(cmd) = self.command_rx.recv().await {
            match cmd {
                SyncCommand::SyncCalendar {
                    calendar_id,
                    caller,
                    respond_to,
                } => {
                    if !self.in_flight.insert(calendar_id.clone()) {
                        warn!("Sync already running for calendar {}", calendar_id);
                        let _ = respond_to.send(Err(Error::SyncInProgress(calendar_id)));
                        continue;
                    }

                    let reconciler = Arc::clone(&self.reconciler);
                    let done_tx = self.self_tx.clone();
                    let run = {
                        let calendar_id = calendar_id.clone();
                        tokio::spawn(async move { reconciler.sync(&calendar_id, &caller).await })
                    };
                    tokio::spawn(async move {
                        let result = supervise(run, &done_tx, calendar_id).await;
                        let _ = respond_to.send(result);
                    });
                }
                SyncCommand::SyncAll(respond_to) => {
                    let feeds = match self.reconciler.store().list_feeds().await {
                        Ok(feeds) => feeds,
                        Err(e) => {
                            error!("Failed to list feeds: {}", e);
                            let _ = respond_to.send(Err(e));
                            continue;
                        }
                    };

                    let mut runs = Vec::new();
                    let mut skipped = Vec::new();
                    for feed in feeds.into_iter().filter(|feed| feed.url.is_some()) {
                        if !self.in_flight.insert(feed.calendar_id.clone()) {
                            skipped.push(CalendarOutcome {
                                result: Err(Error::SyncInProgress(feed.calendar_id.clone())),
                                calendar_id: feed.calendar_id,
                            });
                            continue;
                        }

                        let reconciler = Arc::clone(&self.reconciler);
                        let done_tx = self.self_tx.clone();
                        let calendar_id = feed.calendar_id.clone();
                        let run = tokio::spawn(async move { reconciler.reconcile(&feed).await });
                        runs.push(async move {
                            let result = supervise(run, &done_tx, calendar_id.clone()).await;
                            CalendarOutcome {
                                calendar_id,
                                result,
                            }
                        });
                    }

                    info!("Syncing {} calendars", runs.len());
                    tokio::spawn(async move {
                        let mut outcomes = skipped;
                        outcomes.extend(join_all(runs).await);
                        let _ = respond_to.send(Ok(outcomes));
                    });
                }
                SyncCommand::Finished(calendar_id) => {
                    self.in_flight.remove(&calendar_id);
                }
                SyncCommand::Shutdown => {
                    info!("Feed sync actor shutting down");
                    break;
                }
            }
        }

        info!("Feed sync actor shut down");
    }
}

/// Wait for a spawned run and release its calendar, whether the run
/// returned or panicked. The release is queued before the caller hears back.
async fn supervise(
    run: JoinHandle<SyncResult<SyncReport>>,
    done_tx: &mpsc::WeakSender<SyncCommand>,
    calendar_id: String,
) -> SyncResult<SyncReport> {
    let result = match run.await {
        Ok(result) => result,
        Err(e) => {
            error!("Sync task for calendar {} panicked: {}", calendar_id, e);
            Err(component_error(&format!("Sync task for {} panicked", calendar_id)))
        }
    };
    if let Err(e) = &result {
        error!("Sync failed for calendar {}: {}", calendar_id, e);
    }

    if let Some(tx) = done_tx.upgrade() {
        let _ = tx.send(SyncCommand::Finished(calendar_id)).await;
    }
    result
}
