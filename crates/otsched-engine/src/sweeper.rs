//! Background release of theatres whose cases have run to their end time.

use otsched_core::{Occupancy, TheatreId, UpdateCause};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};

use crate::context::EngineContext;
use crate::error::Result;
use crate::retry::try_transact;

/// Periodically frees every occupied theatre, and its doctor, once the
/// scheduled end time has passed.
#[derive(Debug, Clone)]
pub struct LifecycleSweeper {
    ctx: EngineContext,
}

/// Running sweeper task.
#[derive(Debug)]
pub struct SweeperHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Stops the sweeper and waits for the current tick, if any, to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            warn!(error = %e, "Sweeper task ended abnormally");
        }
    }
}

impl LifecycleSweeper {
    pub fn new(ctx: EngineContext) -> Self {
        Self { ctx }
    }

    /// Releases every due theatre in one commit.
    ///
    /// Returns the released theatre ids, empty when nothing was due. Nothing
    /// is written or published in that case.
    pub async fn tick(&self) -> Result<Vec<TheatreId>> {
        let now = self.ctx.now();
        let committed = try_transact(
            &self.ctx.store,
            "sweep",
            self.ctx.settings.max_retries,
            |snapshot| {
                let due = snapshot.state.due_theatres(now);
                Ok((!due.is_empty()).then_some(due))
            },
            |roster, due| {
                due.into_iter()
                    .map(|id| roster.release(id).map(|occupancy| (id, occupancy)))
                    .collect::<std::result::Result<Vec<(TheatreId, Occupancy)>, _>>()
            },
        )
        .await?;
        let Some(committed) = committed else {
            return Ok(Vec::new());
        };

        let released = committed.value;
        for (id, occupancy) in &released {
            info!(
                ot_id = id,
                doctor_id = occupancy.assigned_doctor_id,
                case_id = %occupancy.case.id,
                "Released theatre after scheduled end"
            );
        }

        let ids: Vec<TheatreId> = released.into_iter().map(|(id, _)| id).collect();
        self.ctx.announce(
            UpdateCause::Released,
            &committed.snapshot,
            ids.clone(),
            None,
            now,
        );
        Ok(ids)
    }

    /// Start the sweeper in a background task.
    ///
    /// A failing tick is logged and retried on the next interval.
    pub fn start(self) -> SweeperHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let period = self.ctx.settings.sweep_interval();

        let task = tokio::spawn(async move {
            info!(
                interval_secs = period.as_secs(),
                "Lifecycle sweeper started"
            );

            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        match self.tick().await {
                            Ok(released) if released.is_empty() => debug!("Sweep found nothing due"),
                            Ok(released) => debug!(count = released.len(), "Sweep released theatres"),
                            Err(e) => warn!(error = %e, category = %e.category(), "Sweep failed, will retry next tick"),
                        }
                    }
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            info!("Lifecycle sweeper shutting down");
                            break;
                        }
                    }
                }
            }
        });

        SweeperHandle {
            shutdown: shutdown_tx,
            task,
        }
    }
}
