//! Host hook installer - finds the host audio subsystem and hooks it.
//!
//! Waits on the host's ready signal when it offers one, otherwise polls on a
//! fixed interval. Either way the cycle is bounded by a [`Watchdog`] deadline
//! and by a maximum number of poll attempts.

use crate::config::UnlockConfig;
use crate::hook::{install_hook, HookMode, LateBindingHook};
use crate::lock;
use crate::watchdog::Watchdog;
use janua_host::HostLocator;
use serde::Serialize;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Observable state of the polling sub-machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PollingStatus {
    Idle,
    Polling,
    HookInstalled(HookMode),
    /// Deadline or attempt bound reached without finding the host.
    Expired,
    /// Stopped explicitly before either of the above.
    Stopped,
}

/// How a polling cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    HookInstalled(HookMode),
    Expired,
    AttemptsExhausted,
    Stopped,
}

impl PollOutcome {
    fn status(self) -> PollingStatus {
        match self {
            PollOutcome::HookInstalled(mode) => PollingStatus::HookInstalled(mode),
            PollOutcome::Expired | PollOutcome::AttemptsExhausted => PollingStatus::Expired,
            PollOutcome::Stopped => PollingStatus::Stopped,
        }
    }
}

/// Timers belonging to one polling cycle.
struct PollCycle {
    poll: CancellationToken,
    watchdog: Watchdog,
    task: Option<JoinHandle<PollOutcome>>,
}

/// Everything the polling task needs, moved onto it.
struct CycleContext {
    locator: Arc<dyn HostLocator>,
    hook: Arc<LateBindingHook>,
    config: UnlockConfig,
    poll: CancellationToken,
    watchdog: Watchdog,
    status: Arc<watch::Sender<PollingStatus>>,
}

/// Background installer for the late-binding hook.
pub struct HostHookInstaller {
    locator: Arc<dyn HostLocator>,
    hook: Arc<LateBindingHook>,
    config: UnlockConfig,
    status: Arc<watch::Sender<PollingStatus>>,
    cycle: Mutex<Option<PollCycle>>,
}

impl HostHookInstaller {
    pub fn new(
        locator: Arc<dyn HostLocator>,
        hook: Arc<LateBindingHook>,
        config: UnlockConfig,
    ) -> Self {
        let (status, _) = watch::channel(PollingStatus::Idle);
        Self {
            locator,
            hook,
            config,
            status: Arc::new(status),
            cycle: Mutex::new(None),
        }
    }

    /// Begin a polling cycle. Returns false if one is already running.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self) -> bool {
        let mut cycle = lock(&self.cycle);
        if self.is_running() {
            tracing::warn!("host hook installer already running");
            return false;
        }

        let poll = CancellationToken::new();
        let watchdog = Watchdog::arm(self.config.deadline(), poll.clone());
        self.status.send_replace(PollingStatus::Polling);

        let task = tokio::spawn(run_cycle(CycleContext {
            locator: Arc::clone(&self.locator),
            hook: Arc::clone(&self.hook),
            config: self.config.clone(),
            poll: poll.clone(),
            watchdog: watchdog.clone(),
            status: Arc::clone(&self.status),
        }));

        *cycle = Some(PollCycle {
            poll,
            watchdog,
            task: Some(task),
        });
        true
    }

    /// Cancel the current cycle, if any.
    pub fn stop(&self) {
        if let Some(cycle) = lock(&self.cycle).as_ref() {
            cycle.poll.cancel();
            cycle.watchdog.disarm();
        }
    }

    /// Wait for the current cycle to finish.
    ///
    /// Returns `None` if no cycle was started or its outcome was already taken.
    pub async fn wait(&self) -> Option<PollOutcome> {
        let task = lock(&self.cycle).as_mut().and_then(|cycle| cycle.task.take())?;
        task.await.ok()
    }

    pub fn status(&self) -> PollingStatus {
        *self.status.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<PollingStatus> {
        self.status.subscribe()
    }

    pub fn is_running(&self) -> bool {
        self.status() == PollingStatus::Polling
    }

    /// Whether the deadline of the current cycle has fired.
    pub fn deadline_fired(&self) -> bool {
        lock(&self.cycle)
            .as_ref()
            .is_some_and(|cycle| cycle.watchdog.has_fired())
    }
}

impl Drop for HostHookInstaller {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run_cycle(ctx: CycleContext) -> PollOutcome {
    tracing::debug!(
        interval_ms = ctx.config.poll_interval_ms,
        deadline_ms = ctx.config.deadline_ms,
        "looking for host audio subsystem"
    );

    let outcome = match ctx.locator.ready_signal() {
        Some(signal) => {
            tokio::select! {
                biased;
                _ = ctx.poll.cancelled() => cancelled_outcome(&ctx.watchdog),
                _ = signal => match ctx.locator.locate() {
                    Some(subsystem) => {
                        PollOutcome::HookInstalled(install_hook(subsystem.as_ref(), &ctx.hook))
                    }
                    None => {
                        tracing::debug!("host signalled ready without a subsystem, polling instead");
                        poll_until_found(&ctx).await
                    }
                },
            }
        }
        None => poll_until_found(&ctx).await,
    };

    // Whichever of (found, deadline) came first, both timers end here.
    ctx.poll.cancel();
    ctx.watchdog.disarm();

    match outcome {
        PollOutcome::HookInstalled(mode) => tracing::debug!(?mode, "host polling finished"),
        PollOutcome::AttemptsExhausted => tracing::info!(
            attempts = ctx.config.max_poll_attempts,
            "host audio subsystem not found, polling stopped"
        ),
        PollOutcome::Expired | PollOutcome::Stopped => {}
    }

    ctx.status.send_replace(outcome.status());
    outcome
}

async fn poll_until_found(ctx: &CycleContext) -> PollOutcome {
    let interval = ctx.config.poll_interval();
    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut attempts = 0u32;
    loop {
        tokio::select! {
            biased;
            _ = ctx.poll.cancelled() => return cancelled_outcome(&ctx.watchdog),
            _ = ticker.tick() => {}
        }

        attempts += 1;
        if let Some(subsystem) = ctx.locator.locate() {
            tracing::debug!(attempts, "host audio subsystem found");
            return PollOutcome::HookInstalled(install_hook(subsystem.as_ref(), &ctx.hook));
        }

        if attempts >= ctx.config.max_poll_attempts {
            return PollOutcome::AttemptsExhausted;
        }
    }
}

fn cancelled_outcome(watchdog: &Watchdog) -> PollOutcome {
    if watchdog.has_fired() {
        PollOutcome::Expired
    } else {
        PollOutcome::Stopped
    }
}
