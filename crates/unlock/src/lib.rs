//! Audio unlock for the Janua remote desktop web client.
//!
//! Browsers suspend newly created audio output until the user interacts with
//! the page. This crate waits for the first qualifying gesture and resumes the
//! host's audio context, then removes its own listeners.
//!
//! Three independent paths can lead to a resume attempt:
//! - the eager path: listeners attached once the document is ready
//! - the late-binding path: the host subsystem loads later, gets hooked, and
//!   attaches listeners the first time it hands out a suspended context
//! - gestures themselves, which drive [`ResumeCoordinator::attempt_resume`]
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                         AudioUnlock                           │
//! │  page-ready bootstrap, owns everything below                  │
//! └───────────────────────────────────────────────────────────────┘
//!        │                        │                        │
//!        ▼                        ▼                        ▼
//! ┌──────────────────┐  ┌──────────────────┐  ┌──────────────────────┐
//! │ GestureListener- │  │ ResumeCoordinator│  │ HostHookInstaller    │
//! │ Set (listeners)  │─▶│ (coordinator.rs) │  │ (installer.rs)       │
//! └──────────────────┘  └──────────────────┘  │  + Watchdog          │
//!        ▲                        │           │  + LateBindingHook   │
//!        │                        ▼           └──────────────────────┘
//!        │                ┌──────────────────┐           │
//!        └────────────────│   UnlockState    │◀──────────┘
//!                         └──────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use janua_unlock::{AudioUnlock, UnlockConfig};
//!
//! let unlock = AudioUnlock::new(document, locator, UnlockConfig::default())?;
//! unlock.install();
//! ```

mod config;
mod coordinator;
mod hook;
mod installer;
mod listeners;
mod state;
mod unlock;
mod watchdog;

pub use config::{
    ConfigError, UnlockConfig, DEFAULT_DEADLINE_MS, DEFAULT_MAX_POLL_ATTEMPTS,
    DEFAULT_POLL_INTERVAL_MS,
};
pub use coordinator::{PlayOutcome, ResumeAttempt, ResumeCoordinator, ResumeOutcome};
pub use hook::{install_hook, HookMode, LateBindingHook, UnlockingAccessor};
pub use installer::{HostHookInstaller, PollOutcome, PollingStatus};
pub use listeners::GestureListenerSet;
pub use state::{UnlockPhase, UnlockState};
pub use unlock::{AudioUnlock, UnlockReport};
pub use watchdog::Watchdog;

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock a mutex, recovering the data if a previous holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
