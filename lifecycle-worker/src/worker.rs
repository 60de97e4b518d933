use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::service::WorkerState;

/// A launched background loop: the token that stops it and the handle to await it.
pub(crate) struct WorkerTask {
    pub(crate) token: CancellationToken,
    pub(crate) handle: JoinHandle<()>,
}

impl WorkerTask {
    /// Launch a loop marked as running under `launch`, a value unique to this launch.
    pub(crate) fn spawn(state: Arc<WorkerState>, launch: u64) -> Self {
        let token = CancellationToken::new();
        let handle = tokio::spawn(run(state, launch, token.clone()));
        Self { token, handle }
    }
}

/// Clears the running marker when the loop exits, however it exits, unless a
/// later launch has already replaced it.
struct RunningGuard<'a> {
    running: &'a AtomicU64,
    launch: u64,
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        let _ = self
            .running
            .compare_exchange(self.launch, 0, Ordering::SeqCst, Ordering::SeqCst);
    }
}

/// Process pending jobs once per interval until `token` is cancelled. The first
/// step runs one full interval after launch.
async fn run(state: Arc<WorkerState>, launch: u64, token: CancellationToken) {
    let _running = RunningGuard {
        running: &state.running,
        launch,
    };
    let period = state.config.interval.0;
    let mut ticker = time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(interval = %state.config.interval, "worker loop started");

    loop {
        tokio::select! {
            biased;

            _ = token.cancelled() => {
                info!("worker loop stopping");
                return;
            }
            _ = ticker.tick() => {
                let processed = state.process_jobs(&token).await;
                debug!(processed, "worker processing step finished");
            }
        }
    }
}
