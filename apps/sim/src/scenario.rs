//! Scenario file format.

use janua_host::{AudioContextState, GestureKind, PlayError, ReadyState, ResumeError};
use janua_unlock::UnlockConfig;
use serde::Deserialize;

/// A scripted page session.
#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub config: UnlockConfig,
    #[serde(default = "default_ready_state")]
    pub ready_state: ReadyState,
    #[serde(default = "default_true")]
    pub web_audio: bool,
    #[serde(default)]
    pub host: HostScript,
    #[serde(default)]
    pub media: Vec<MediaScript>,
    #[serde(default)]
    pub steps: Vec<Step>,
    /// How long to keep the session alive after the last step.
    #[serde(default = "default_tail_ms")]
    pub tail_ms: u64,
}

fn default_ready_state() -> ReadyState {
    ReadyState::Complete
}

fn default_true() -> bool {
    true
}

fn default_context() -> Option<AudioContextState> {
    Some(AudioContextState::Suspended)
}

fn default_tail_ms() -> u64 {
    1_000
}

/// The host audio subsystem as it behaves in this session.
#[derive(Debug, Clone, Deserialize)]
pub struct HostScript {
    /// Initial context state; `null` means the host never creates one.
    #[serde(default = "default_context")]
    pub context: Option<AudioContextState>,
    /// Host exposes an access observer API.
    #[serde(default)]
    pub observers: bool,
    /// Host announces readiness instead of being polled for.
    #[serde(default)]
    pub ready_signal: bool,
    /// Answers to successive `resume()` calls. Unlisted calls succeed.
    #[serde(default)]
    pub resume: Vec<ResumeStep>,
}

impl Default for HostScript {
    fn default() -> Self {
        Self {
            context: Some(AudioContextState::Suspended),
            observers: false,
            ready_signal: false,
            resume: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResumeStep {
    #[serde(default)]
    pub delay_ms: u64,
    pub result: ScriptedResult,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptedResult {
    Ok,
    Denied,
    Closed,
}

impl ScriptedResult {
    pub fn into_result(self) -> Result<(), ResumeError> {
        match self {
            ScriptedResult::Ok => Ok(()),
            ScriptedResult::Denied => Err(ResumeError::Denied),
            ScriptedResult::Closed => Err(ResumeError::Closed),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MediaScript {
    #[serde(default = "default_true")]
    pub paused: bool,
    #[serde(default)]
    pub rejects: bool,
}

impl MediaScript {
    pub fn rejection(&self) -> Option<PlayError> {
        self.rejects.then_some(PlayError::NotAllowed)
    }
}

/// One timed event in the session, relative to install.
#[derive(Debug, Clone, Deserialize)]
pub struct Step {
    pub at_ms: u64,
    #[serde(flatten)]
    pub action: Action,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    /// The user interacts with the page.
    Gesture { kind: GestureKind },
    /// The document finishes loading.
    PageReady,
    /// The host audio subsystem finishes loading.
    HostLoads,
    /// Host code asks its factory for the audio context.
    HostAccess,
}

impl Scenario {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        let mut scenario: Scenario = serde_json::from_str(json)?;
        scenario.steps.sort_by_key(|step| step.at_ms);
        Ok(scenario)
    }
}
