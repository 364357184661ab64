// SPDX-License-Identifier: MIT OR Apache-2.0
//! Serializable animation scripts.
//!
//! A script is a named list of steps stored as RON, so animations can be
//! authored as data and queued on any sequencer:
//!
//! ```ron
//! (
//!     name: "fade_and_spin",
//!     steps: [
//!         Effect(kind: Alpha(0.0), duration_ms: 200),
//!         Effect(kind: Rotate(180.0), duration_ms: 400, delay_ms: 50),
//!         Barrier,
//!         Effect(kind: Alpha(1.0), duration_ms: 200),
//!     ],
//! )
//! ```

use crate::error::Result;
use crate::step::{PendingStep, StepKind, Timing};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// A step in a script
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ScriptStep {
    /// Style transition
    Effect {
        /// Effect to apply
        kind: StepKind,
        /// Transition duration in milliseconds
        duration_ms: u64,
        /// Delay before the effect in milliseconds
        #[serde(default)]
        delay_ms: u64,
    },
    /// Ordering checkpoint
    Barrier,
}

impl ScriptStep {
    /// Create an effect step
    pub fn effect(kind: StepKind, duration_ms: u64, delay_ms: u64) -> Self {
        Self::Effect {
            kind,
            duration_ms,
            delay_ms,
        }
    }

    /// Convert to a queueable step
    pub fn to_pending(&self) -> PendingStep {
        match *self {
            Self::Effect {
                kind,
                duration_ms,
                delay_ms,
            } => PendingStep::effect(kind, Timing::millis(duration_ms).delay_ms(delay_ms)),
            Self::Barrier => PendingStep::barrier(),
        }
    }

    /// Delay plus duration
    pub fn span(&self) -> Duration {
        match self {
            Self::Effect {
                duration_ms,
                delay_ms,
                ..
            } => Duration::from_millis(duration_ms + delay_ms),
            Self::Barrier => Duration::ZERO,
        }
    }
}

/// Named list of animation steps
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AnimationScript {
    /// Script name
    pub name: String,
    /// Steps in execution order
    pub steps: Vec<ScriptStep>,
}

impl AnimationScript {
    /// Create an empty script
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
        }
    }

    /// Append a step
    pub fn with_step(mut self, step: ScriptStep) -> Self {
        self.steps.push(step);
        self
    }

    /// Get step count
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Nominal run time if every effect completes on schedule
    pub fn nominal_duration(&self) -> Duration {
        self.steps.iter().map(ScriptStep::span).sum()
    }

    /// Build queueable steps in order
    pub fn to_steps(&self) -> impl Iterator<Item = PendingStep> + '_ {
        self.steps.iter().map(ScriptStep::to_pending)
    }

    /// Parse a script from RON
    pub fn from_ron(source: &str) -> Result<Self> {
        Ok(ron::from_str(source)?)
    }

    /// Serialize to RON
    pub fn to_ron(&self) -> Result<String> {
        Ok(ron::ser::to_string_pretty(
            self,
            ron::ser::PrettyConfig::default(),
        )?)
    }

    /// Load a script from a RON file
    pub fn load(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path)?;
        let script = Self::from_ron(&source)?;
        tracing::debug!(
            name = %script.name,
            steps = script.step_count(),
            "Loaded animation script from {}",
            path.display()
        );
        Ok(script)
    }
}
