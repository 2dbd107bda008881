//! Shared unlock flags.

use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::watch;

/// Where the page is in the unlock lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnlockPhase {
    NotAttempted,
    ListenersAttached,
    Resumed,
}

/// The single "has playback been unlocked" record for a page session.
///
/// `resumed` only ever moves from false to true. `listeners_attached`
/// mirrors whether a gesture listener set is currently registered.
pub struct UnlockState {
    listeners_attached: AtomicBool,
    resumed: watch::Sender<bool>,
}

impl Default for UnlockState {
    fn default() -> Self {
        let (resumed, _) = watch::channel(false);
        Self {
            listeners_attached: AtomicBool::new(false),
            resumed,
        }
    }
}

impl UnlockState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_resumed(&self) -> bool {
        *self.resumed.borrow()
    }

    pub fn listeners_attached(&self) -> bool {
        self.listeners_attached.load(Ordering::SeqCst)
    }

    pub fn phase(&self) -> UnlockPhase {
        if self.is_resumed() {
            UnlockPhase::Resumed
        } else if self.listeners_attached() {
            UnlockPhase::ListenersAttached
        } else {
            UnlockPhase::NotAttempted
        }
    }

    /// Receiver that observes the `resumed` flag.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.resumed.subscribe()
    }

    /// Set `resumed`. Returns true only for the call that flipped it.
    pub(crate) fn mark_resumed(&self) -> bool {
        self.resumed.send_if_modified(|resumed| {
            if *resumed {
                false
            } else {
                *resumed = true;
                true
            }
        })
    }

    /// Claim the right to register listeners. Returns false if already attached.
    pub(crate) fn try_attach(&self) -> bool {
        self.listeners_attached
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    pub(crate) fn mark_detached(&self) -> bool {
        self.listeners_attached.swap(false, Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resumed_is_monotonic() {
        let state = UnlockState::new();
        assert_eq!(state.phase(), UnlockPhase::NotAttempted);

        assert!(state.mark_resumed());
        assert!(!state.mark_resumed());
        assert!(state.is_resumed());
        assert_eq!(state.phase(), UnlockPhase::Resumed);
    }

    #[test]
    fn test_attach_is_claimed_once() {
        let state = UnlockState::new();
        assert!(state.try_attach());
        assert!(!state.try_attach());
        assert_eq!(state.phase(), UnlockPhase::ListenersAttached);

        assert!(state.mark_detached());
        assert!(!state.mark_detached());
        assert!(state.try_attach());
    }

    #[tokio::test]
    async fn test_subscribers_see_resume() {
        let state = UnlockState::new();
        let mut rx = state.subscribe();
        state.mark_resumed();
        assert!(rx.wait_for(|resumed| *resumed).await.is_ok());
    }
}
