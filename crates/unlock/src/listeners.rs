//! Gesture listener registration.

use crate::coordinator::ResumeCoordinator;
use crate::lock;
use janua_host::{Document, GestureEvent, GestureHandler, GestureKind, ListenerId};
use std::sync::{Arc, Mutex, Weak};

/// One capture-phase listener per gesture kind, registered on the document.
///
/// Every listener shares a single handler. Once playback is unlocked the set
/// removes itself, either from the handler (when the unlock was immediate) or
/// from a watcher task that waits for an in-flight resume to succeed.
pub struct GestureListenerSet {
    document: Arc<dyn Document>,
    coordinator: Arc<ResumeCoordinator>,
    registered: Mutex<Vec<(GestureKind, ListenerId)>>,
    this: Weak<GestureListenerSet>,
}

impl GestureListenerSet {
    pub fn new(document: Arc<dyn Document>, coordinator: Arc<ResumeCoordinator>) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            document,
            coordinator,
            registered: Mutex::new(Vec::new()),
            this: this.clone(),
        })
    }

    /// Attach the listeners. Returns true if this call attached them.
    ///
    /// No-op when listeners are already attached or playback is already
    /// unlocked.
    pub fn setup(&self) -> bool {
        let state = self.coordinator.state();
        if state.is_resumed() || !state.try_attach() {
            return false;
        }

        let this = self.this.clone();
        let handler: GestureHandler = Arc::new(move |event: &GestureEvent| {
            if let Some(set) = this.upgrade() {
                set.on_gesture(event);
            }
        });

        {
            let mut registered = lock(&self.registered);
            for kind in GestureKind::ALL {
                let id = self.document.add_listener(kind, true, Arc::clone(&handler));
                registered.push((kind, id));
            }
        }

        self.watch_for_resume();
        tracing::info!("audio context resume listeners attached");
        true
    }

    /// Number of listeners currently registered by this set.
    pub fn registered(&self) -> usize {
        lock(&self.registered).len()
    }

    /// Remove every registered listener. Returns how many were removed.
    pub fn teardown(&self) -> usize {
        let registered: Vec<_> = lock(&self.registered).drain(..).collect();
        if registered.is_empty() {
            return 0;
        }

        for (kind, id) in &registered {
            if !self.document.remove_listener(*kind, true, *id) {
                tracing::debug!(%kind, "gesture listener was already gone");
            }
        }
        self.coordinator.state().mark_detached();

        tracing::info!(count = registered.len(), "audio context resume listeners removed");
        registered.len()
    }

    fn on_gesture(&self, event: &GestureEvent) {
        tracing::debug!(kind = %event.kind, "user gesture");

        // A requested resume finishes on its own task.
        let _attempt = self.coordinator.attempt_resume();

        if self.coordinator.state().is_resumed() {
            self.teardown();
        }
    }

    /// Tear down once a resume issued by a gesture completes.
    fn watch_for_resume(&self) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::debug!("no runtime, resume watcher not started");
            return;
        };

        let mut resumed = self.coordinator.state().subscribe();
        let this = self.this.clone();
        runtime.spawn(async move {
            let unlocked = resumed.wait_for(|resumed| *resumed).await.is_ok();
            if unlocked {
                if let Some(set) = this.upgrade() {
                    set.teardown();
                }
            }
        });
    }
}

impl Drop for GestureListenerSet {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::UnlockState;
    use janua_host::fake::{
        FakeAudioContext, FakeDocument, FakeLocator, FakeMediaElement, FakeSubsystem,
    };
    use janua_host::{HostAudioContext, NullLocator};

    fn listener_set(document: Arc<FakeDocument>) -> Arc<GestureListenerSet> {
        let coordinator = Arc::new(ResumeCoordinator::new(
            Arc::new(UnlockState::new()),
            Arc::new(NullLocator),
            document.clone(),
        ));
        GestureListenerSet::new(document, coordinator)
    }

    #[tokio::test]
    async fn test_setup_registers_capture_listener_per_kind() {
        let document = Arc::new(FakeDocument::default());
        let set = listener_set(document.clone());

        assert!(set.setup());
        for kind in GestureKind::ALL {
            assert_eq!(document.capture_listener_count(kind), 1, "{kind}");
        }
        assert_eq!(set.registered(), 4);
    }

    #[tokio::test]
    async fn test_setup_is_idempotent() {
        let document = Arc::new(FakeDocument::default());
        let set = listener_set(document.clone());

        assert!(set.setup());
        assert!(!set.setup());
        assert!(!set.setup());
        assert_eq!(document.total_listeners(), 4);
        assert_eq!(document.listeners_added(), 4);
    }

    #[tokio::test]
    async fn test_teardown_removes_everything_once() {
        let document = Arc::new(FakeDocument::default());
        let set = listener_set(document.clone());
        set.setup();

        assert_eq!(set.teardown(), 4);
        assert_eq!(set.teardown(), 0);
        assert_eq!(document.total_listeners(), 0);
        assert!(!set.coordinator.state().listeners_attached());
    }

    #[tokio::test]
    async fn test_setup_refused_after_resume() {
        let document = Arc::new(FakeDocument::default());
        let set = listener_set(document.clone());
        set.coordinator.state().mark_resumed();

        assert!(!set.setup());
        assert_eq!(document.total_listeners(), 0);
    }

    #[test]
    fn test_setup_without_runtime_still_attaches() {
        let document = Arc::new(FakeDocument::default());
        let set = listener_set(document.clone());

        assert!(set.setup());
        assert_eq!(document.total_listeners(), 4);
    }

    #[test]
    fn test_gesture_without_runtime_keeps_listeners() {
        let context = Arc::new(FakeAudioContext::suspended());
        let subsystem = Arc::new(FakeSubsystem::new(Some(
            Arc::clone(&context) as Arc<dyn HostAudioContext>
        )));
        let document = Arc::new(FakeDocument::default());
        let element = Arc::new(FakeMediaElement::paused());
        document.add_media(element.clone());
        let coordinator = Arc::new(ResumeCoordinator::new(
            Arc::new(UnlockState::new()),
            Arc::new(FakeLocator::with_subsystem(subsystem)),
            document.clone(),
        ));
        let set = GestureListenerSet::new(document.clone(), coordinator);

        assert!(set.setup());
        assert_eq!(document.dispatch(GestureKind::Click), 1);

        assert!(!set.coordinator.state().is_resumed());
        assert!(set.coordinator.state().listeners_attached());
        assert_eq!(document.total_listeners(), 4);
        assert_eq!(context.resume_calls(), 0);
        assert_eq!(element.play_calls(), 0);
    }

    #[tokio::test]
    async fn test_drop_removes_listeners() {
        let document = Arc::new(FakeDocument::default());
        let set = listener_set(document.clone());
        let state = Arc::clone(set.coordinator.state());
        set.setup();
        assert_eq!(document.total_listeners(), 4);

        drop(set);
        assert_eq!(document.total_listeners(), 0);
        assert!(!state.listeners_attached());
    }
}
