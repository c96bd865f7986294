//! Lifecycle owner for the background loops.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio_util::{sync::CancellationToken, task::TaskTracker};

use crate::{
    config::Schedule,
    services::scheduler::{PeriodicJob, run_periodic},
};

struct Running {
    cancel: CancellationToken,
    tracker: TaskTracker,
}

pub struct Engine {
    jobs: Vec<(Arc<dyn PeriodicJob>, Schedule)>,
    running: Mutex<Option<Running>>,
}

impl Engine {
    pub fn new() -> Self {
        Self {
            jobs: Vec::new(),
            running: Mutex::new(None),
        }
    }

    pub fn with_job(mut self, job: Arc<dyn PeriodicJob>, schedule: Schedule) -> Self {
        self.jobs.push((job, schedule));
        self
    }

    /// Spawns every job. Returns false, and does nothing, if already running.
    pub async fn start(&self) -> bool {
        let mut running = self.running.lock().await;
        if running.is_some() {
            tracing::debug!("engine already running");
            return false;
        }

        let cancel = CancellationToken::new();
        let tracker = TaskTracker::new();
        for (job, schedule) in &self.jobs {
            tracker.spawn(run_periodic(job.clone(), *schedule, cancel.child_token()));
        }
        tracker.close();

        tracing::info!(jobs = self.jobs.len(), "engine started");
        *running = Some(Running { cancel, tracker });
        true
    }

    /// Signals every loop and waits for their in-flight items to finish.
    /// The lock is held until then, so a concurrent `start` waits for the
    /// old loops to be gone.
    pub async fn stop(&self) {
        let mut guard = self.running.lock().await;
        let Some(running) = guard.take() else {
            return;
        };

        running.cancel.cancel();
        running.tracker.wait().await;
        drop(guard);
        tracing::info!("engine stopped");
    }

    pub async fn is_running(&self) -> bool {
        self.running.lock().await.is_some()
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}
