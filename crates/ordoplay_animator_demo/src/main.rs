// SPDX-License-Identifier: MIT OR Apache-2.0
//! `OrdoPlay` animator demo
//!
//! Plays an animation script on a headless element whose transitions
//! finish on a timer, logging every style change.
//!
//! Usage: `ordoplay_animator_demo [script.ron]`

mod timed_element;

use ordoplay_animator::{completion, AnimationScript, Sequencer, TokioScheduler};
use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use timed_element::TimedElement;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

const BUILTIN_SCRIPT: &str = include_str!("../scripts/showcase.ron");

fn main() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("ordoplay_animator=debug,ordoplay_animator_demo=info")
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting OrdoPlay animator demo v{}", env!("CARGO_PKG_VERSION"));

    let script = match std::env::args().nth(1).map(PathBuf::from) {
        Some(path) => AnimationScript::load(&path),
        None => AnimationScript::from_ron(BUILTIN_SCRIPT),
    };
    let script = match script {
        Ok(script) => script,
        Err(e) => {
            tracing::error!("Failed to load animation script: {e}");
            std::process::exit(1);
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!("Failed to start runtime: {e}");
            std::process::exit(1);
        }
    };

    let local = tokio::task::LocalSet::new();
    local.block_on(&runtime, play(script));
}

async fn play(script: AnimationScript) {
    tracing::info!(
        "Playing '{}' ({} steps, nominal {:?})",
        script.name,
        script.step_count(),
        script.nominal_duration()
    );

    let element = Rc::new(TimedElement::new());
    let sequencer = Sequencer::new(element.clone(), Rc::new(TokioScheduler));

    let (done, finished) = completion::channel();
    let done = RefCell::new(Some(done));
    sequencer
        .set_on_start(|| tracing::info!("Sequence started"))
        .set_on_completed(move || {
            if let Some(done) = done.borrow_mut().take() {
                done.fire();
            }
        })
        .enqueue_script(&script)
        .start();

    if let Err(e) = finished.await {
        tracing::error!("Sequence did not complete: {e}");
        return;
    }

    tracing::info!("Sequence completed");
    for (name, value) in element.styles() {
        tracing::info!("  {name}: {value}");
    }
}
