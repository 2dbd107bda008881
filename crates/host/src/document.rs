//! Browser document contract: readiness, gesture listeners and media elements.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// User-input events accepted as proof of interaction by autoplay policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GestureKind {
    Click,
    KeyDown,
    TouchStart,
    MouseDown,
}

impl GestureKind {
    /// The fixed set of gestures the unlock listens for.
    pub const ALL: [GestureKind; 4] = [
        GestureKind::Click,
        GestureKind::KeyDown,
        GestureKind::TouchStart,
        GestureKind::MouseDown,
    ];

    /// DOM event type name.
    pub fn event_type(&self) -> &'static str {
        match self {
            GestureKind::Click => "click",
            GestureKind::KeyDown => "keydown",
            GestureKind::TouchStart => "touchstart",
            GestureKind::MouseDown => "mousedown",
        }
    }
}

impl fmt::Display for GestureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.event_type())
    }
}

/// A gesture event as delivered to a listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GestureEvent {
    pub kind: GestureKind,
}

impl GestureEvent {
    pub fn new(kind: GestureKind) -> Self {
        Self { kind }
    }
}

/// Document loading state (`document.readyState`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadyState {
    Loading,
    Interactive,
    Complete,
}

impl ReadyState {
    pub fn is_loading(&self) -> bool {
        matches!(self, ReadyState::Loading)
    }
}

/// Token identifying one registered listener, needed to remove it again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// Listener invoked synchronously from event dispatch.
pub type GestureHandler = Arc<dyn Fn(&GestureEvent) + Send + Sync + 'static>;

/// One-shot callback fired when the document finishes loading.
pub type ReadyCallback = Box<dyn FnOnce() + Send + 'static>;

/// Reasons a media element refuses to start playing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlayError {
    #[error("play() not allowed before user interaction")]
    NotAllowed,

    #[error("play() interrupted")]
    Aborted,

    #[error("play() failed: {0}")]
    Failed(String),
}

/// An `<audio>` or `<video>` element present on the page.
#[async_trait]
pub trait MediaElement: Send + Sync {
    fn paused(&self) -> bool;

    async fn play(&self) -> Result<(), PlayError>;
}

/// The page document as seen by the unlock.
pub trait Document: Send + Sync {
    fn ready_state(&self) -> ReadyState;

    /// Run `callback` once the document leaves `Loading`.
    fn on_ready(&self, callback: ReadyCallback);

    /// Register `handler` for `kind`. `capture` selects the capture phase.
    fn add_listener(&self, kind: GestureKind, capture: bool, handler: GestureHandler) -> ListenerId;

    /// Remove a listener previously returned by `add_listener`.
    ///
    /// Returns `false` if the listener was not registered.
    fn remove_listener(&self, kind: GestureKind, capture: bool, id: ListenerId) -> bool;

    /// Snapshot of the media elements currently on the page.
    fn media_elements(&self) -> Vec<Arc<dyn MediaElement>>;

    /// Whether the page exposes a Web Audio implementation at all.
    fn web_audio_supported(&self) -> bool {
        true
    }
}
