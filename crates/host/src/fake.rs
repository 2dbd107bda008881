//! In-memory implementations of the collaborator contracts.
//!
//! Used by tests and by the scenario simulator. Every fake records what was
//! asked of it so assertions can be made afterwards.

use crate::context::{AudioContextState, HostAudioContext, ResumeError};
use crate::document::{
    Document, GestureEvent, GestureHandler, GestureKind, ListenerId, MediaElement, PlayError,
    ReadyCallback, ReadyState,
};
use crate::subsystem::{AccessObserver, AudioSubsystem, ContextAccessor, HostLocator};
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A scripted answer to one `resume()` call.
#[derive(Debug, Clone)]
struct ScriptedResume {
    delay: Duration,
    result: Result<(), ResumeError>,
}

/// Audio context whose resume results are scripted in advance.
///
/// Unscripted resumes succeed immediately.
pub struct FakeAudioContext {
    state: Mutex<AudioContextState>,
    script: Mutex<VecDeque<ScriptedResume>>,
    resume_calls: AtomicUsize,
}

impl FakeAudioContext {
    pub fn new(state: AudioContextState) -> Self {
        Self {
            state: Mutex::new(state),
            script: Mutex::new(VecDeque::new()),
            resume_calls: AtomicUsize::new(0),
        }
    }

    pub fn suspended() -> Self {
        Self::new(AudioContextState::Suspended)
    }

    pub fn set_state(&self, state: AudioContextState) {
        *lock(&self.state) = state;
    }

    /// Queue the result of the next unanswered `resume()` call.
    pub fn push_result(&self, result: Result<(), ResumeError>) {
        self.push_delayed(Duration::ZERO, result);
    }

    /// Queue a result that settles only after `delay`.
    pub fn push_delayed(&self, delay: Duration, result: Result<(), ResumeError>) {
        lock(&self.script).push_back(ScriptedResume { delay, result });
    }

    pub fn resume_calls(&self) -> usize {
        self.resume_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HostAudioContext for FakeAudioContext {
    fn state(&self) -> AudioContextState {
        *lock(&self.state)
    }

    async fn resume(&self) -> Result<(), ResumeError> {
        self.resume_calls.fetch_add(1, Ordering::SeqCst);
        let scripted = lock(&self.script).pop_front().unwrap_or(ScriptedResume {
            delay: Duration::ZERO,
            result: Ok(()),
        });

        if !scripted.delay.is_zero() {
            tokio::time::sleep(scripted.delay).await;
        }

        let mut state = lock(&self.state);
        if *state == AudioContextState::Closed {
            return Err(ResumeError::Closed);
        }
        if scripted.result.is_ok() {
            *state = AudioContextState::Running;
        }
        scripted.result
    }
}

/// Media element with a fixed `play()` answer.
pub struct FakeMediaElement {
    paused: AtomicBool,
    result: Mutex<Result<(), PlayError>>,
    play_calls: AtomicUsize,
}

impl FakeMediaElement {
    pub fn paused() -> Self {
        Self {
            paused: AtomicBool::new(true),
            result: Mutex::new(Ok(())),
            play_calls: AtomicUsize::new(0),
        }
    }

    pub fn playing() -> Self {
        let element = Self::paused();
        element.paused.store(false, Ordering::SeqCst);
        element
    }

    /// Make every `play()` call reject with `error`.
    pub fn rejecting(error: PlayError) -> Self {
        let element = Self::paused();
        *lock(&element.result) = Err(error);
        element
    }

    pub fn play_calls(&self) -> usize {
        self.play_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaElement for FakeMediaElement {
    fn paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    async fn play(&self) -> Result<(), PlayError> {
        self.play_calls.fetch_add(1, Ordering::SeqCst);
        let result = lock(&self.result).clone();
        if result.is_ok() {
            self.paused.store(false, Ordering::SeqCst);
        }
        result
    }
}

struct Registered {
    id: ListenerId,
    capture: bool,
    handler: GestureHandler,
}

/// Document with synchronous event dispatch.
pub struct FakeDocument {
    ready: Mutex<ReadyState>,
    ready_callbacks: Mutex<Vec<ReadyCallback>>,
    listeners: Mutex<HashMap<GestureKind, Vec<Registered>>>,
    media: Mutex<Vec<Arc<dyn MediaElement>>>,
    web_audio: AtomicBool,
    next_id: AtomicU64,
    added: AtomicUsize,
    removed: AtomicUsize,
}

impl Default for FakeDocument {
    fn default() -> Self {
        Self::new(ReadyState::Complete)
    }
}

impl FakeDocument {
    pub fn new(ready: ReadyState) -> Self {
        Self {
            ready: Mutex::new(ready),
            ready_callbacks: Mutex::new(Vec::new()),
            listeners: Mutex::new(HashMap::new()),
            media: Mutex::new(Vec::new()),
            web_audio: AtomicBool::new(true),
            next_id: AtomicU64::new(1),
            added: AtomicUsize::new(0),
            removed: AtomicUsize::new(0),
        }
    }

    pub fn loading() -> Self {
        Self::new(ReadyState::Loading)
    }

    /// Leave `Loading` and run pending ready callbacks.
    pub fn finish_loading(&self) {
        *lock(&self.ready) = ReadyState::Interactive;
        let callbacks: Vec<_> = lock(&self.ready_callbacks).drain(..).collect();
        for callback in callbacks {
            callback();
        }
    }

    pub fn add_media(&self, element: Arc<dyn MediaElement>) {
        lock(&self.media).push(element);
    }

    pub fn set_web_audio_supported(&self, supported: bool) {
        self.web_audio.store(supported, Ordering::SeqCst);
    }

    /// Dispatch a gesture: capture-phase listeners first, then bubble-phase.
    ///
    /// Returns the number of handlers invoked.
    pub fn dispatch(&self, kind: GestureKind) -> usize {
        let handlers: Vec<GestureHandler> = {
            let listeners = lock(&self.listeners);
            let Some(registered) = listeners.get(&kind) else {
                return 0;
            };
            let capture = registered.iter().filter(|r| r.capture);
            let bubble = registered.iter().filter(|r| !r.capture);
            capture.chain(bubble).map(|r| Arc::clone(&r.handler)).collect()
        };

        tracing::trace!(%kind, handlers = handlers.len(), "dispatching gesture");
        let event = GestureEvent::new(kind);
        for handler in &handlers {
            handler(&event);
        }
        handlers.len()
    }

    pub fn listener_count(&self, kind: GestureKind) -> usize {
        lock(&self.listeners).get(&kind).map_or(0, Vec::len)
    }

    pub fn capture_listener_count(&self, kind: GestureKind) -> usize {
        lock(&self.listeners)
            .get(&kind)
            .map_or(0, |r| r.iter().filter(|r| r.capture).count())
    }

    pub fn total_listeners(&self) -> usize {
        lock(&self.listeners).values().map(Vec::len).sum()
    }

    pub fn pending_ready_callbacks(&self) -> usize {
        lock(&self.ready_callbacks).len()
    }

    pub fn listeners_added(&self) -> usize {
        self.added.load(Ordering::SeqCst)
    }

    pub fn listeners_removed(&self) -> usize {
        self.removed.load(Ordering::SeqCst)
    }
}

impl Document for FakeDocument {
    fn ready_state(&self) -> ReadyState {
        *lock(&self.ready)
    }

    fn on_ready(&self, callback: ReadyCallback) {
        if self.ready_state().is_loading() {
            lock(&self.ready_callbacks).push(callback);
        } else {
            callback();
        }
    }

    fn add_listener(&self, kind: GestureKind, capture: bool, handler: GestureHandler) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::SeqCst));
        lock(&self.listeners).entry(kind).or_default().push(Registered {
            id,
            capture,
            handler,
        });
        self.added.fetch_add(1, Ordering::SeqCst);
        id
    }

    fn remove_listener(&self, kind: GestureKind, capture: bool, id: ListenerId) -> bool {
        let mut listeners = lock(&self.listeners);
        let Some(registered) = listeners.get_mut(&kind) else {
            return false;
        };
        let before = registered.len();
        registered.retain(|r| !(r.id == id && r.capture == capture));
        let removed = registered.len() < before;
        if removed {
            self.removed.fetch_add(1, Ordering::SeqCst);
        }
        removed
    }

    fn media_elements(&self) -> Vec<Arc<dyn MediaElement>> {
        lock(&self.media).clone()
    }

    fn web_audio_supported(&self) -> bool {
        self.web_audio.load(Ordering::SeqCst)
    }
}

/// The host's own context factory.
pub struct FakeFactory {
    context: Mutex<Option<Arc<dyn HostAudioContext>>>,
    calls: AtomicUsize,
}

impl FakeFactory {
    pub fn new(context: Option<Arc<dyn HostAudioContext>>) -> Self {
        Self {
            context: Mutex::new(context),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn set_context(&self, context: Option<Arc<dyn HostAudioContext>>) {
        *lock(&self.context) = context;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ContextAccessor for FakeFactory {
    fn audio_context(&self) -> Option<Arc<dyn HostAudioContext>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        lock(&self.context).clone()
    }
}

/// Host audio subsystem backed by a [`FakeFactory`].
pub struct FakeSubsystem {
    factory: Arc<FakeFactory>,
    accessor: Mutex<Arc<dyn ContextAccessor>>,
    observers: Mutex<Vec<AccessObserver>>,
    supports_observers: bool,
    replacements: AtomicUsize,
}

impl FakeSubsystem {
    /// Subsystem without an observer extension point.
    pub fn new(context: Option<Arc<dyn HostAudioContext>>) -> Self {
        Self::build(context, false)
    }

    /// Subsystem that accepts access observers.
    pub fn with_observers(context: Option<Arc<dyn HostAudioContext>>) -> Self {
        Self::build(context, true)
    }

    fn build(context: Option<Arc<dyn HostAudioContext>>, supports_observers: bool) -> Self {
        let factory = Arc::new(FakeFactory::new(context));
        Self {
            accessor: Mutex::new(Arc::clone(&factory) as Arc<dyn ContextAccessor>),
            factory,
            observers: Mutex::new(Vec::new()),
            supports_observers,
            replacements: AtomicUsize::new(0),
        }
    }

    pub fn factory(&self) -> &Arc<FakeFactory> {
        &self.factory
    }

    pub fn replacements(&self) -> usize {
        self.replacements.load(Ordering::SeqCst)
    }

    pub fn observer_count(&self) -> usize {
        lock(&self.observers).len()
    }
}

impl AudioSubsystem for FakeSubsystem {
    fn accessor(&self) -> Arc<dyn ContextAccessor> {
        Arc::clone(&lock(&self.accessor))
    }

    fn replace_accessor(&self, accessor: Arc<dyn ContextAccessor>) {
        *lock(&self.accessor) = accessor;
        self.replacements.fetch_add(1, Ordering::SeqCst);
    }

    fn register_access_observer(&self, observer: AccessObserver) -> bool {
        if !self.supports_observers {
            return false;
        }
        lock(&self.observers).push(observer);
        true
    }

    fn audio_context(&self) -> Option<Arc<dyn HostAudioContext>> {
        let context = self.accessor().audio_context()?;
        let observers: Vec<_> = lock(&self.observers).clone();
        for observer in observers {
            observer(&context);
        }
        Some(context)
    }
}

/// Locator whose subsystem can be made available at any time.
pub struct FakeLocator {
    subsystem: Mutex<Option<Arc<dyn AudioSubsystem>>>,
    ready: watch::Sender<bool>,
    signals_ready: bool,
    lookups: AtomicUsize,
}

impl FakeLocator {
    /// Locator that must be polled.
    pub fn empty() -> Self {
        Self::build(false)
    }

    /// Locator that also offers a ready signal.
    pub fn signalling() -> Self {
        Self::build(true)
    }

    pub fn with_subsystem(subsystem: Arc<dyn AudioSubsystem>) -> Self {
        let locator = Self::empty();
        locator.make_available(subsystem);
        locator
    }

    fn build(signals_ready: bool) -> Self {
        let (ready, _) = watch::channel(false);
        Self {
            subsystem: Mutex::new(None),
            ready,
            signals_ready,
            lookups: AtomicUsize::new(0),
        }
    }

    /// Simulate the host subsystem finishing its load.
    pub fn make_available(&self, subsystem: Arc<dyn AudioSubsystem>) {
        *lock(&self.subsystem) = Some(subsystem);
        self.ready.send_replace(true);
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

impl HostLocator for FakeLocator {
    fn locate(&self) -> Option<Arc<dyn AudioSubsystem>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        lock(&self.subsystem).clone()
    }

    fn ready_signal(&self) -> Option<BoxFuture<'static, ()>> {
        if !self.signals_ready {
            return None;
        }
        let mut rx = self.ready.subscribe();
        Some(Box::pin(async move {
            let _ = rx.wait_for(|ready| *ready).await;
        }))
    }
}
