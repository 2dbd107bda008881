//! Replays a scripted page session against the audio unlock and prints the
//! resulting report as JSON.
//!
//! ```text
//! janua-sim scenarios/late-host.json
//! ```

mod scenario;

use anyhow::{bail, Context, Result};
use janua_host::fake::{
    FakeAudioContext, FakeDocument, FakeLocator, FakeMediaElement, FakeSubsystem,
};
use janua_host::{AudioSubsystem, HostAudioContext};
use janua_unlock::{AudioUnlock, UnlockReport};
use scenario::{Action, Scenario};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Serialize)]
struct SessionSummary {
    unlock: UnlockReport,
    host_resume_calls: usize,
    media_play_calls: Vec<usize>,
    locator_lookups: usize,
    elapsed_ms: u64,
}

#[tokio::main(flavor = "current_thread", start_paused = true)]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,janua=debug")),
        )
        .with_writer(std::io::stderr)
        .init();

    let Some(path) = std::env::args().nth(1) else {
        bail!("usage: janua-sim <scenario.json>");
    };
    let json = std::fs::read_to_string(&path).with_context(|| format!("reading {path}"))?;
    let scenario = Scenario::from_json(&json).with_context(|| format!("parsing {path}"))?;

    tracing::info!(%path, steps = scenario.steps.len(), "replaying scenario");
    let summary = replay(scenario).await?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

async fn replay(scenario: Scenario) -> Result<SessionSummary> {
    let document = Arc::new(FakeDocument::new(scenario.ready_state));
    document.set_web_audio_supported(scenario.web_audio);

    let media: Vec<Arc<FakeMediaElement>> = scenario
        .media
        .iter()
        .map(|script| {
            Arc::new(match (script.paused, script.rejection()) {
                (false, _) => FakeMediaElement::playing(),
                (true, Some(error)) => FakeMediaElement::rejecting(error),
                (true, None) => FakeMediaElement::paused(),
            })
        })
        .collect();
    for element in &media {
        document.add_media(element.clone());
    }

    let context = scenario.host.context.map(|state| {
        let context = Arc::new(FakeAudioContext::new(state));
        for step in &scenario.host.resume {
            context.push_delayed(Duration::from_millis(step.delay_ms), step.result.into_result());
        }
        context
    });
    let host_context = context.clone().map(|c| c as Arc<dyn HostAudioContext>);
    let subsystem = Arc::new(if scenario.host.observers {
        FakeSubsystem::with_observers(host_context)
    } else {
        FakeSubsystem::new(host_context)
    });
    let locator = Arc::new(if scenario.host.ready_signal {
        FakeLocator::signalling()
    } else {
        FakeLocator::empty()
    });

    let unlock = AudioUnlock::new(document.clone(), locator.clone(), scenario.config.clone())
        .context("invalid unlock config")?;
    let start = Instant::now();
    unlock.install();

    for step in &scenario.steps {
        tokio::time::sleep_until(start + Duration::from_millis(step.at_ms)).await;
        tracing::debug!(at_ms = step.at_ms, action = ?step.action, "step");
        match &step.action {
            Action::Gesture { kind } => {
                document.dispatch(*kind);
            }
            Action::PageReady => document.finish_loading(),
            Action::HostLoads => locator.make_available(subsystem.clone()),
            Action::HostAccess => {
                let _context = subsystem.audio_context();
            }
        }
    }

    tokio::time::sleep(Duration::from_millis(scenario.tail_ms)).await;

    Ok(SessionSummary {
        unlock: unlock.report(),
        host_resume_calls: context.as_ref().map_or(0, |c| c.resume_calls()),
        media_play_calls: media.iter().map(|m| m.play_calls()).collect(),
        locator_lookups: locator.lookups(),
        elapsed_ms: start.elapsed().as_millis() as u64,
    })
}
