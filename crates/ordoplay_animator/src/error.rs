// SPDX-License-Identifier: MIT OR Apache-2.0
//! Error types for the animator.

use thiserror::Error;

/// Animator errors
#[derive(Debug, Error)]
pub enum SequencerError {
    /// The element is missing or not attached
    #[error("Element is not attached")]
    ElementUnavailable,

    /// A completion sender was dropped without firing
    #[error("Completion signal dropped before firing")]
    SignalDropped,

    /// Script or config failed to parse
    #[error("Parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// Script or config failed to serialize
    #[error("Serialization error: {0}")]
    Serialize(#[from] ron::Error),

    /// IO error while reading a script or config file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for animator operations
pub type Result<T> = std::result::Result<T, SequencerError>;
