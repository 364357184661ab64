// SPDX-License-Identifier: MIT OR Apache-2.0
//! Per-element animation sequencer for OrdoPlay.
//!
//! This crate queues visual transitions on a single element and runs them
//! strictly one after another:
//! - Opacity, translate, rotate and scale steps
//! - Barriers and callback checkpoints
//! - Start/completion callbacks
//! - Cancellation that ignores late completion signals
//!
//! ## Architecture
//!
//! The sequencer is built on:
//! - An [`Element`] trait for the animated object
//! - A [`Scheduler`] trait for delays and the drain task
//! - One-shot completion signals
//! - RON scripts and settings

pub mod completion;
pub mod config;
pub mod element;
pub mod error;
pub mod scheduler;
pub mod script;
pub mod sequencer;
pub mod step;

pub use completion::{CompletionSender, CompletionSignal};
pub use config::{SequencerConfig, ZeroDurationPolicy};
pub use element::{Element, HeadlessElement, StyleMutation, TransitionSpec, TRANSITION_END};
pub use error::{Result, SequencerError};
pub use scheduler::{FrameScheduler, Scheduler, TokioScheduler};
pub use script::{AnimationScript, ScriptStep};
pub use sequencer::Sequencer;
pub use step::{CustomStep, PendingStep, StepAction, StepId, StepKind, StyleProperty, Timing};
