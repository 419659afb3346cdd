use super::handle::SyncHandle;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{error, info, warn};

/// Start the periodic sync-all loop. The first run happens immediately.
pub fn start_scheduler(handle: SyncHandle, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            match handle.sync_all().await {
                Ok(outcomes) => {
                    let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
                    for outcome in &outcomes {
                        if let Err(e) = &outcome.result {
                            warn!("Scheduled sync of {} failed: {}", outcome.calendar_id, e);
                        }
                    }
                    info!(
                        "Scheduled sync finished: {} calendars, {} failed. Next run in {}s",
                        outcomes.len(),
                        failed,
                        every.as_secs()
                    );
                }
                Err(e) => {
                    error!("Scheduled sync could not run: {}", e);
                }
            }
        }
    })
}
