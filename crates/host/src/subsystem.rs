//! Host audio subsystem contract.
//!
//! The remote-desktop client owns a factory that hands out its shared audio
//! context. The subsystem may load after the page, so it is reached through a
//! [`HostLocator`] that can be asked repeatedly.

use crate::context::HostAudioContext;
use futures::future::BoxFuture;
use std::sync::Arc;

/// Callback invoked every time the host hands out its audio context.
pub type AccessObserver = Arc<dyn Fn(&Arc<dyn HostAudioContext>) + Send + Sync + 'static>;

/// The function the host uses to obtain its audio context.
pub trait ContextAccessor: Send + Sync {
    /// Returns the shared context, or `None` if the host has not created one.
    fn audio_context(&self) -> Option<Arc<dyn HostAudioContext>>;

    /// True for accessors installed by the unlock itself.
    fn is_unlock_hook(&self) -> bool {
        false
    }
}

/// The host's audio subsystem, once loaded.
pub trait AudioSubsystem: Send + Sync {
    /// The accessor currently in use by the host.
    fn accessor(&self) -> Arc<dyn ContextAccessor>;

    /// Swap the accessor the host uses from now on.
    fn replace_accessor(&self, accessor: Arc<dyn ContextAccessor>);

    /// Register an observer for context access, if the host supports it.
    ///
    /// Returns `false` when the host has no such extension point.
    fn register_access_observer(&self, _observer: AccessObserver) -> bool {
        false
    }

    /// Obtain the context through whichever accessor is installed.
    fn audio_context(&self) -> Option<Arc<dyn HostAudioContext>> {
        self.accessor().audio_context()
    }
}

/// Finds the host audio subsystem.
pub trait HostLocator: Send + Sync {
    /// Returns the subsystem if it has loaded.
    fn locate(&self) -> Option<Arc<dyn AudioSubsystem>>;

    /// A signal that resolves once the subsystem is loaded, if the host offers one.
    fn ready_signal(&self) -> Option<BoxFuture<'static, ()>> {
        None
    }
}

/// Locator for pages without a host audio subsystem.
pub struct NullLocator;

impl HostLocator for NullLocator {
    fn locate(&self) -> Option<Arc<dyn AudioSubsystem>> {
        None
    }
}
