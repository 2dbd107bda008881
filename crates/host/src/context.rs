//! Host audio context contract.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Lifecycle state reported by a host audio context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioContextState {
    Suspended,
    Running,
    Closed,
}

impl AudioContextState {
    pub fn as_str(&self) -> &'static str {
        match self {
            AudioContextState::Suspended => "suspended",
            AudioContextState::Running => "running",
            AudioContextState::Closed => "closed",
        }
    }

    pub fn is_suspended(&self) -> bool {
        matches!(self, AudioContextState::Suspended)
    }
}

impl fmt::Display for AudioContextState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reasons a resume request can be rejected by the host.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResumeError {
    /// The browser still considers playback blocked.
    #[error("resume denied by autoplay policy")]
    Denied,

    /// The context was closed before or while resuming.
    #[error("audio context is closed")]
    Closed,

    #[error("resume failed: {0}")]
    Failed(String),
}

/// An audio output object owned by the host subsystem.
///
/// The unlock never creates or closes contexts. It only reads the state and
/// asks for a resume. Implementations must tolerate `resume` being called
/// while a previous resume is still in flight or after the context is
/// already running.
#[async_trait]
pub trait HostAudioContext: Send + Sync {
    /// Current state of the context.
    fn state(&self) -> AudioContextState;

    /// Ask the host to move the context out of `Suspended`.
    async fn resume(&self) -> Result<(), ResumeError>;
}
