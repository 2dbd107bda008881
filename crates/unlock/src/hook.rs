//! Late binding into the host audio subsystem.
//!
//! When the host subsystem loads after the page, its suspended context may be
//! handed out before any listener exists. The hook watches those hand-outs and
//! attaches the gesture listeners on demand. It is installed either as an
//! access observer, when the host offers one, or as a decorator around the
//! host's context accessor.

use crate::listeners::GestureListenerSet;
use crate::state::UnlockState;
use janua_host::{AudioSubsystem, ContextAccessor, HostAudioContext};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// How the hook ended up attached to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HookMode {
    /// Registered through the host's access observer API.
    Observer,
    /// Wrapped the host's accessor in an [`UnlockingAccessor`].
    Decorator,
    /// The hook was already attached to the host; nothing changed.
    AlreadyInstalled,
}

/// Reacts to the host handing out its audio context.
pub struct LateBindingHook {
    state: Arc<UnlockState>,
    listeners: Weak<GestureListenerSet>,
    triggered: AtomicU64,
    installed: AtomicBool,
}

impl LateBindingHook {
    pub fn new(state: Arc<UnlockState>, listeners: &Arc<GestureListenerSet>) -> Self {
        Self {
            state,
            listeners: Arc::downgrade(listeners),
            triggered: AtomicU64::new(0),
            installed: AtomicBool::new(false),
        }
    }

    /// Attach listeners if `context` is still suspended and playback is locked.
    ///
    /// Returns true if this call attached them.
    pub fn on_context(&self, context: &dyn HostAudioContext) -> bool {
        if !context.state().is_suspended() || self.state.is_resumed() {
            return false;
        }
        let Some(listeners) = self.listeners.upgrade() else {
            return false;
        };

        let attached = listeners.setup();
        if attached {
            self.triggered.fetch_add(1, Ordering::SeqCst);
            tracing::info!("host handed out a suspended audio context, waiting for a user gesture");
        }
        attached
    }

    /// Number of times the hook attached listeners.
    pub fn triggered(&self) -> u64 {
        self.triggered.load(Ordering::SeqCst)
    }

    /// Whether `install_hook` has already run for this hook.
    pub fn is_installed(&self) -> bool {
        self.installed.load(Ordering::SeqCst)
    }

    /// Claim the single installation. Returns false if already claimed.
    fn claim_install(&self) -> bool {
        self.installed
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }
}

/// Decorator around the host's original context accessor.
pub struct UnlockingAccessor {
    inner: Arc<dyn ContextAccessor>,
    hook: Arc<LateBindingHook>,
}

impl UnlockingAccessor {
    pub fn new(inner: Arc<dyn ContextAccessor>, hook: Arc<LateBindingHook>) -> Self {
        Self { inner, hook }
    }
}

impl ContextAccessor for UnlockingAccessor {
    fn audio_context(&self) -> Option<Arc<dyn HostAudioContext>> {
        let context = self.inner.audio_context()?;
        self.hook.on_context(context.as_ref());
        Some(context)
    }

    fn is_unlock_hook(&self) -> bool {
        true
    }
}

/// Attach `hook` to `subsystem`, preferring the observer API.
///
/// A hook is installed at most once, whichever mode was used.
pub fn install_hook(subsystem: &dyn AudioSubsystem, hook: &Arc<LateBindingHook>) -> HookMode {
    if !hook.claim_install() {
        tracing::debug!("audio context hook already installed");
        return HookMode::AlreadyInstalled;
    }

    let observer_hook = Arc::clone(hook);
    let accepted = subsystem.register_access_observer(Arc::new(
        move |context: &Arc<dyn HostAudioContext>| {
            observer_hook.on_context(context.as_ref());
        },
    ));
    if accepted {
        tracing::info!("registered audio context observer with host");
        return HookMode::Observer;
    }

    let current = subsystem.accessor();
    if current.is_unlock_hook() {
        tracing::debug!("host audio context accessor already hooked");
        return HookMode::AlreadyInstalled;
    }

    subsystem.replace_accessor(Arc::new(UnlockingAccessor::new(current, Arc::clone(hook))));
    tracing::info!("hooked into host audio context factory");
    HookMode::Decorator
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::ResumeCoordinator;
    use janua_host::fake::{FakeAudioContext, FakeDocument, FakeSubsystem};
    use janua_host::{AudioContextState, NullLocator};

    struct Fixture {
        document: Arc<FakeDocument>,
        state: Arc<UnlockState>,
        _listeners: Arc<GestureListenerSet>,
        hook: Arc<LateBindingHook>,
    }

    fn fixture() -> Fixture {
        let document = Arc::new(FakeDocument::default());
        let state = Arc::new(UnlockState::new());
        let coordinator = Arc::new(ResumeCoordinator::new(
            Arc::clone(&state),
            Arc::new(NullLocator),
            document.clone(),
        ));
        let listeners = GestureListenerSet::new(document.clone(), coordinator);
        let hook = Arc::new(LateBindingHook::new(Arc::clone(&state), &listeners));
        Fixture {
            document,
            state,
            _listeners: listeners,
            hook,
        }
    }

    fn context(state: AudioContextState) -> Option<Arc<dyn HostAudioContext>> {
        Some(Arc::new(FakeAudioContext::new(state)))
    }

    #[test]
    fn test_decorator_installed_once() {
        let f = fixture();
        let subsystem = FakeSubsystem::new(context(AudioContextState::Suspended));

        assert_eq!(install_hook(&subsystem, &f.hook), HookMode::Decorator);
        assert_eq!(install_hook(&subsystem, &f.hook), HookMode::AlreadyInstalled);
        assert_eq!(subsystem.replacements(), 1);
        assert!(subsystem.accessor().is_unlock_hook());
    }

    #[test]
    fn test_observer_preferred_when_offered() {
        let f = fixture();
        let subsystem = FakeSubsystem::with_observers(context(AudioContextState::Suspended));

        assert_eq!(install_hook(&subsystem, &f.hook), HookMode::Observer);
        assert_eq!(subsystem.replacements(), 0);
        assert_eq!(subsystem.observer_count(), 1);

        assert!(subsystem.audio_context().is_some());
        assert_eq!(f.document.total_listeners(), 4);
    }

    #[test]
    fn test_observer_registered_once() {
        let f = fixture();
        let subsystem = FakeSubsystem::with_observers(context(AudioContextState::Suspended));

        assert_eq!(install_hook(&subsystem, &f.hook), HookMode::Observer);
        assert_eq!(install_hook(&subsystem, &f.hook), HookMode::AlreadyInstalled);
        assert_eq!(subsystem.observer_count(), 1);
        assert!(f.hook.is_installed());
    }

    #[test]
    fn test_foreign_hook_not_wrapped_again() {
        let f = fixture();
        let other = fixture();
        let subsystem = FakeSubsystem::new(context(AudioContextState::Suspended));

        assert_eq!(install_hook(&subsystem, &f.hook), HookMode::Decorator);
        assert_eq!(install_hook(&subsystem, &other.hook), HookMode::AlreadyInstalled);
        assert_eq!(subsystem.replacements(), 1);
    }

    #[test]
    fn test_suspended_context_attaches_listeners() {
        let f = fixture();
        let subsystem = FakeSubsystem::new(context(AudioContextState::Suspended));
        install_hook(&subsystem, &f.hook);

        assert!(subsystem.audio_context().is_some());
        assert!(subsystem.audio_context().is_some());
        assert_eq!(f.document.total_listeners(), 4);
        assert_eq!(f.hook.triggered(), 1);
        assert_eq!(subsystem.factory().calls(), 2);
    }

    #[test]
    fn test_running_context_does_not_attach() {
        let f = fixture();
        let subsystem = FakeSubsystem::new(context(AudioContextState::Running));
        install_hook(&subsystem, &f.hook);

        assert!(subsystem.audio_context().is_some());
        assert_eq!(f.document.total_listeners(), 0);
    }

    #[test]
    fn test_resumed_state_does_not_attach() {
        let f = fixture();
        f.state.mark_resumed();
        let subsystem = FakeSubsystem::new(context(AudioContextState::Suspended));
        install_hook(&subsystem, &f.hook);

        assert!(subsystem.audio_context().is_some());
        assert_eq!(f.document.total_listeners(), 0);
        assert_eq!(f.hook.triggered(), 0);
    }

    #[test]
    fn test_missing_context_passes_through() {
        let f = fixture();
        let subsystem = FakeSubsystem::new(None);
        install_hook(&subsystem, &f.hook);

        assert!(subsystem.audio_context().is_none());
        assert_eq!(f.document.total_listeners(), 0);
    }
}
