//! Hard deadline for host polling.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// One-shot timer that cancels a polling cycle when its deadline passes.
///
/// Cancelling an already cancelled target is a no-op, so the watchdog does
/// not care whether polling finished on its own first.
#[derive(Clone)]
pub struct Watchdog {
    disarm: CancellationToken,
    fired: Arc<AtomicBool>,
    deadline: Duration,
}

impl Watchdog {
    /// Start the timer. `target` is cancelled when `deadline` elapses.
    ///
    /// Must be called from within a tokio runtime.
    pub fn arm(deadline: Duration, target: CancellationToken) -> Self {
        let disarm = CancellationToken::new();
        let fired = Arc::new(AtomicBool::new(false));

        let disarmed = disarm.clone();
        let fired_flag = Arc::clone(&fired);
        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = disarmed.cancelled() => {}
                _ = tokio::time::sleep(deadline) => {
                    fired_flag.store(true, Ordering::SeqCst);
                    if !target.is_cancelled() {
                        tracing::info!(
                            deadline_ms = deadline.as_millis() as u64,
                            "host audio subsystem not found before deadline, polling stopped"
                        );
                    }
                    target.cancel();
                }
            }
        });

        Self {
            disarm,
            fired,
            deadline,
        }
    }

    /// Stop the timer without touching the target.
    pub fn disarm(&self) {
        self.disarm.cancel();
    }

    pub fn has_fired(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }

    pub fn is_armed(&self) -> bool {
        !self.disarm.is_cancelled() && !self.has_fired()
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }
}
