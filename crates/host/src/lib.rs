//! Collaborator contracts for the Janua audio unlock.
//!
//! The unlock logic never talks to a browser or to the remote-desktop client's
//! audio stack directly. Everything it consumes is described here as a trait:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     Browser environment                       │
//! │  document.rs - ready state, gesture listeners, media elements │
//! └──────────────────────────────────────────────────────────────┘
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    Host audio subsystem                       │
//! │  context.rs   - audio context state and resume               │
//! │  subsystem.rs - context accessor, observers, locator          │
//! └──────────────────────────────────────────────────────────────┘
//! ┌──────────────────────────────────────────────────────────────┐
//! │                           Fakes                               │
//! │  fake.rs - in-memory implementations for tests and replays    │
//! └──────────────────────────────────────────────────────────────┘
//! ```

mod context;
mod document;
mod subsystem;

pub mod fake;

pub use context::{AudioContextState, HostAudioContext, ResumeError};
pub use document::{
    Document, GestureEvent, GestureHandler, GestureKind, ListenerId, MediaElement, PlayError,
    ReadyCallback, ReadyState,
};
pub use subsystem::{AccessObserver, AudioSubsystem, ContextAccessor, HostLocator, NullLocator};
