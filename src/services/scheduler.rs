use std::{panic::AssertUnwindSafe, sync::Arc};

use async_trait::async_trait;
use futures_util::FutureExt;
use tokio_util::sync::CancellationToken;

use crate::{config::Schedule, error::EngineError};

/// Outcome counters of one pass over a loop's active set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub checked: usize,
    pub fired: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// One periodically re-run unit of background work.
///
/// Implementations check `cancel` before every item and return early once
/// it is set; the item in progress is always finished.
#[async_trait]
pub trait PeriodicJob: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    async fn run_cycle(&self, cancel: &CancellationToken) -> Result<CycleReport, EngineError>;
}

/// Runs `job` until `cancel` fires, sleeping `schedule.interval` after each
/// finished cycle and `schedule.cooldown` after a failed or panicking one.
pub async fn run_periodic(job: Arc<dyn PeriodicJob>, schedule: Schedule, cancel: CancellationToken) {
    let name = job.name();
    tracing::info!(job = name, interval = ?schedule.interval, "background loop started");

    loop {
        if cancel.is_cancelled() {
            break;
        }

        let outcome = AssertUnwindSafe(job.run_cycle(&cancel)).catch_unwind().await;

        let pause = match outcome {
            Ok(Ok(report)) => {
                tracing::info!(
                    job = name,
                    checked = report.checked,
                    fired = report.fired,
                    skipped = report.skipped,
                    failed = report.failed,
                    "cycle finished"
                );
                schedule.interval
            }
            Ok(Err(e)) => {
                tracing::error!(job = name, error = %e, "cycle failed");
                schedule.cooldown
            }
            Err(panic) => {
                let msg = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                tracing::error!(job = name, panic = %msg, "cycle panicked");
                schedule.cooldown
            }
        };

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(pause) => {}
        }
    }

    tracing::info!(job = name, "background loop stopped");
}
