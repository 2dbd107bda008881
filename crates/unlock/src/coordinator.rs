//! Resume coordination.
//!
//! [`ResumeCoordinator::attempt_resume`] runs synchronously inside a gesture
//! handler up to the point where the host's `resume()` is issued. The resume
//! itself settles later on its own task, so completions can arrive in any
//! order. `UnlockState::mark_resumed` is monotonic, which makes that safe.

use crate::state::UnlockState;
use janua_host::{
    AudioContextState, Document, HostAudioContext, HostLocator, MediaElement, PlayError,
    ResumeError,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// What a single `attempt_resume` call did.
#[derive(Debug)]
pub enum ResumeAttempt {
    /// Playback was already unlocked; nothing was touched.
    AlreadyResumed,
    /// The host subsystem or its context is not there yet.
    HostUnavailable,
    /// The context was not suspended, so playback counts as unlocked.
    NotNeeded(AudioContextState),
    /// A resume was issued. The handle yields its outcome.
    Requested(JoinHandle<ResumeOutcome>),
}

impl ResumeAttempt {
    pub fn is_requested(&self) -> bool {
        matches!(self, ResumeAttempt::Requested(_))
    }
}

/// How an issued resume settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResumeOutcome {
    Resumed,
    Rejected(ResumeError),
}

/// How a best-effort media `play()` settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayOutcome {
    Started,
    Rejected(PlayError),
}

/// Performs resume attempts against the host audio context.
pub struct ResumeCoordinator {
    state: Arc<UnlockState>,
    locator: Arc<dyn HostLocator>,
    document: Arc<dyn Document>,
    attempts: AtomicU64,
    resume_requests: AtomicU64,
}

impl ResumeCoordinator {
    pub fn new(
        state: Arc<UnlockState>,
        locator: Arc<dyn HostLocator>,
        document: Arc<dyn Document>,
    ) -> Self {
        Self {
            state,
            locator,
            document,
            attempts: AtomicU64::new(0),
            resume_requests: AtomicU64::new(0),
        }
    }

    pub fn state(&self) -> &Arc<UnlockState> {
        &self.state
    }

    /// Number of times `attempt_resume` has been called.
    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Number of host `resume()` calls issued.
    pub fn resume_requests(&self) -> u64 {
        self.resume_requests.load(Ordering::SeqCst)
    }

    /// Try to unlock playback.
    ///
    /// Never fails: a rejected resume is logged and left for the next gesture.
    /// The resume and media plays continue on tasks of the current tokio
    /// runtime. Outside a runtime nothing is issued and the attempt reports
    /// [`ResumeAttempt::HostUnavailable`].
    pub fn attempt_resume(&self) -> ResumeAttempt {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if self.state.is_resumed() {
            return ResumeAttempt::AlreadyResumed;
        }

        let Ok(runtime) = Handle::try_current() else {
            tracing::debug!(attempt, "no runtime, resume attempt skipped");
            return ResumeAttempt::HostUnavailable;
        };

        let context = self
            .locator
            .locate()
            .and_then(|subsystem| subsystem.audio_context());

        let result = match context {
            None => {
                tracing::debug!(attempt, "host audio context not available yet");
                ResumeAttempt::HostUnavailable
            }
            Some(context) => {
                let state = context.state();
                if state.is_suspended() {
                    ResumeAttempt::Requested(self.request_resume(&runtime, attempt, context))
                } else {
                    if self.state.mark_resumed() {
                        tracing::info!(%state, "audio context not suspended, nothing to unlock");
                    }
                    ResumeAttempt::NotNeeded(state)
                }
            }
        };

        if self.document.web_audio_supported() {
            self.play_paused_media(&runtime);
        }

        result
    }

    fn request_resume(
        &self,
        runtime: &Handle,
        attempt: u64,
        context: Arc<dyn HostAudioContext>,
    ) -> JoinHandle<ResumeOutcome> {
        self.resume_requests.fetch_add(1, Ordering::SeqCst);
        let state = Arc::clone(&self.state);
        tracing::debug!(attempt, "requesting audio context resume");

        runtime.spawn(async move {
            match context.resume().await {
                Ok(()) => {
                    if state.mark_resumed() {
                        tracing::info!(attempt, "audio context resumed successfully");
                    }
                    ResumeOutcome::Resumed
                }
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "failed to resume audio context");
                    ResumeOutcome::Rejected(e)
                }
            }
        })
    }

    /// Kick every paused media element. Rejections are expected and dropped.
    fn play_paused_media(&self, runtime: &Handle) {
        for element in self.document.media_elements() {
            if !element.paused() {
                continue;
            }
            // Outcome is recorded at trace level only; nobody awaits it.
            drop(runtime.spawn(play_element(element)));
        }
    }
}

async fn play_element(element: Arc<dyn MediaElement>) -> PlayOutcome {
    match element.play().await {
        Ok(()) => PlayOutcome::Started,
        Err(e) => {
            tracing::trace!(error = %e, "media element refused to play");
            PlayOutcome::Rejected(e)
        }
    }
}
