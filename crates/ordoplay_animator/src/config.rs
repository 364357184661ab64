// SPDX-License-Identifier: MIT OR Apache-2.0
//! Sequencer configuration.
//!
//! Settings are plain serde data and round-trip through RON, the same
//! format used for animation scripts.

use crate::element::TRANSITION_END;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How an effect step with a zero duration is handled
///
/// A zero-length style transition never produces a transition-end event
/// on most elements, so waiting for one would stall the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ZeroDurationPolicy {
    /// Write the style without a transition hint and resolve at once
    #[default]
    ResolveImmediately,
    /// Treat it like any other step and wait for the completion event
    AwaitSignal,
}

/// Sequencer settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequencerConfig {
    /// Event the element dispatches when a transition ends
    pub completion_event: String,
    /// Zero-duration handling
    pub zero_duration: ZeroDurationPolicy,
}

impl SequencerConfig {
    /// Parse settings from RON
    pub fn from_ron(source: &str) -> Result<Self> {
        Ok(ron::from_str(source)?)
    }

    /// Serialize settings to RON
    pub fn to_ron(&self) -> Result<String> {
        Ok(ron::ser::to_string_pretty(
            self,
            ron::ser::PrettyConfig::default(),
        )?)
    }

    /// Load settings from a RON file
    pub fn load(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_ron(&source)
    }
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            completion_event: TRANSITION_END.to_string(),
            zero_duration: ZeroDurationPolicy::default(),
        }
    }
}
