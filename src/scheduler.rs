//! Fixed-period ingestion scheduler
//!
//! Each tick awaits a full pipeline cycle before the next tick is taken, so
//! two cycles for the same target never run at once. Ticks missed while a
//! slow cycle was running are skipped rather than replayed.

use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info};

use crate::pipeline::{Pipeline, Target};

/// Default time between ingestion cycles
pub const DEFAULT_PERIOD: Duration = Duration::from_secs(60);

/// Drives [`Pipeline::run`] for one target at a fixed cadence
pub struct Scheduler {
    pipeline: Pipeline,
    target: Target,
    period: Duration,
}

impl Scheduler {
    #[must_use]
    pub fn new(pipeline: Pipeline, target: Target, period: Duration) -> Self {
        Self {
            pipeline,
            target,
            period,
        }
    }

    /// Run cycles until `shutdown` fires or its sender is dropped.
    ///
    /// The first cycle starts immediately. Shutdown is only observed between
    /// cycles; a cycle in progress always completes.
    pub async fn run(self, mut shutdown: watch::Receiver<()>) {
        info!(
            city = %self.target.city,
            "Air quality scheduler started ({}s interval)",
            self.period.as_secs()
        );

        let mut interval = time::interval(self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let outcome = self.pipeline.run(&self.target).await;
                    debug!(?outcome, "Ingestion cycle finished");
                }
                _ = shutdown.changed() => {
                    info!("Shutdown signal received, scheduler exiting");
                    break;
                }
            }
        }
    }

    /// Run the scheduler on its own task
    pub fn spawn(self, shutdown: watch::Receiver<()>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }
}
