//! Page-level wiring of the unlock components.

use crate::config::{ConfigError, UnlockConfig};
use crate::coordinator::ResumeCoordinator;
use crate::hook::LateBindingHook;
use crate::installer::{HostHookInstaller, PollingStatus};
use crate::listeners::GestureListenerSet;
use crate::state::{UnlockPhase, UnlockState};
use janua_host::{Document, HostLocator};
use serde::Serialize;
use std::sync::Arc;

/// Snapshot of the unlock for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnlockReport {
    pub phase: UnlockPhase,
    pub resumed: bool,
    pub listeners_attached: bool,
    pub registered_listeners: usize,
    pub polling: PollingStatus,
    pub resume_attempts: u64,
    pub resume_requests: u64,
    pub hook_triggers: u64,
}

/// Owns the unlock components for one page session.
pub struct AudioUnlock {
    document: Arc<dyn Document>,
    state: Arc<UnlockState>,
    coordinator: Arc<ResumeCoordinator>,
    listeners: Arc<GestureListenerSet>,
    hook: Arc<LateBindingHook>,
    installer: HostHookInstaller,
}

impl AudioUnlock {
    pub fn new(
        document: Arc<dyn Document>,
        locator: Arc<dyn HostLocator>,
        config: UnlockConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let state = Arc::new(UnlockState::new());
        let coordinator = Arc::new(ResumeCoordinator::new(
            Arc::clone(&state),
            Arc::clone(&locator),
            Arc::clone(&document),
        ));
        let listeners = GestureListenerSet::new(Arc::clone(&document), Arc::clone(&coordinator));
        let hook = Arc::new(LateBindingHook::new(Arc::clone(&state), &listeners));
        let installer = HostHookInstaller::new(locator, Arc::clone(&hook), config);

        Ok(Self {
            document,
            state,
            coordinator,
            listeners,
            hook,
            installer,
        })
    }

    /// Attach listeners once the page is ready and start looking for the host.
    ///
    /// Must be called from within a tokio runtime.
    pub fn install(&self) {
        if self.document.ready_state().is_loading() {
            tracing::debug!("document still loading, deferring listener setup");
            let listeners = Arc::downgrade(&self.listeners);
            self.document.on_ready(Box::new(move || {
                if let Some(listeners) = listeners.upgrade() {
                    listeners.setup();
                }
            }));
        } else {
            self.listeners.setup();
        }

        self.installer.start();
    }

    pub fn state(&self) -> &Arc<UnlockState> {
        &self.state
    }

    pub fn coordinator(&self) -> &Arc<ResumeCoordinator> {
        &self.coordinator
    }

    pub fn listeners(&self) -> &Arc<GestureListenerSet> {
        &self.listeners
    }

    pub fn installer(&self) -> &HostHookInstaller {
        &self.installer
    }

    pub fn report(&self) -> UnlockReport {
        UnlockReport {
            phase: self.state.phase(),
            resumed: self.state.is_resumed(),
            listeners_attached: self.state.listeners_attached(),
            registered_listeners: self.listeners.registered(),
            polling: self.installer.status(),
            resume_attempts: self.coordinator.attempts(),
            resume_requests: self.coordinator.resume_requests(),
            hook_triggers: self.hook.triggered(),
        }
    }
}
