// SPDX-License-Identifier: MIT OR Apache-2.0
//! Step definitions for the sequencer.

use crate::completion::CompletionSignal;
use crate::element::Element;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

/// Unique identifier for a queued step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StepId(pub Uuid);

impl StepId {
    /// Create a new random step ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for StepId {
    fn default() -> Self {
        Self::new()
    }
}

/// Style property animated by a step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StyleProperty {
    /// Element opacity
    Opacity,
    /// Element transform
    Transform,
}

impl StyleProperty {
    /// Get the style property name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Opacity => "opacity",
            Self::Transform => "transform",
        }
    }
}

impl fmt::Display for StyleProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Visual effect applied by a step
///
/// Translations are in pixels, rotations in degrees, scales are factors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum StepKind {
    /// Opacity (0 to 1)
    Alpha(f32),
    /// Translate on both axes
    Translate {
        /// Horizontal offset
        x: f32,
        /// Vertical offset
        y: f32,
    },
    /// Translate horizontally
    TranslateX(f32),
    /// Translate vertically
    TranslateY(f32),
    /// Rotate in the plane
    Rotate(f32),
    /// Rotate around the X axis
    RotateX(f32),
    /// Rotate around the Y axis
    RotateY(f32),
    /// Scale on both axes
    Scale {
        /// Horizontal factor
        x: f32,
        /// Vertical factor
        y: f32,
    },
    /// Scale horizontally
    ScaleX(f32),
    /// Scale vertically
    ScaleY(f32),
}

impl StepKind {
    /// The property this step mutates
    pub fn property(&self) -> StyleProperty {
        match self {
            Self::Alpha(_) => StyleProperty::Opacity,
            _ => StyleProperty::Transform,
        }
    }

    /// The style value written to the property
    pub fn style_value(&self) -> String {
        match *self {
            Self::Alpha(a) => format!("{a}"),
            Self::Translate { x, y } => format!("translate({x}px, {y}px)"),
            Self::TranslateX(x) => format!("translateX({x}px)"),
            Self::TranslateY(y) => format!("translateY({y}px)"),
            Self::Rotate(a) => format!("rotate({a}deg)"),
            Self::RotateX(a) => format!("rotateX({a}deg)"),
            Self::RotateY(a) => format!("rotateY({a}deg)"),
            Self::Scale { x, y } => format!("scale({x}, {y})"),
            Self::ScaleX(x) => format!("scaleX({x})"),
            Self::ScaleY(y) => format!("scaleY({y})"),
        }
    }
}

/// Duration and start delay of a step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Timing {
    /// Transition duration
    pub duration: Duration,
    /// Wait before the effect is applied
    pub delay: Duration,
}

impl Timing {
    /// Timing with no delay
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            delay: Duration::ZERO,
        }
    }

    /// Timing from milliseconds, no delay
    pub fn millis(duration_ms: u64) -> Self {
        Self::new(Duration::from_millis(duration_ms))
    }

    /// Set the start delay
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Set the start delay in milliseconds
    pub fn delay_ms(self, delay_ms: u64) -> Self {
        self.with_delay(Duration::from_millis(delay_ms))
    }
}

impl From<Duration> for Timing {
    fn from(duration: Duration) -> Self {
        Self::new(duration)
    }
}

/// Caller-supplied step body
pub type CustomStep = Box<dyn FnOnce(&dyn Element) -> CompletionSignal>;

/// What a step does once its delay has elapsed
pub enum StepAction {
    /// Apply a style transition and wait for it to finish
    Effect {
        /// Effect to apply
        kind: StepKind,
        /// Transition duration
        duration: Duration,
    },
    /// No-op ordering checkpoint
    Barrier,
    /// Checkpoint that runs a closure when reached
    Callback(Box<dyn FnOnce()>),
    /// Opaque step that produces its own completion signal
    Custom(CustomStep),
}

impl fmt::Debug for StepAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Effect { kind, duration } => f
                .debug_struct("Effect")
                .field("kind", kind)
                .field("duration", duration)
                .finish(),
            Self::Barrier => f.write_str("Barrier"),
            Self::Callback(_) => f.write_str("Callback"),
            Self::Custom(_) => f.write_str("Custom"),
        }
    }
}

/// A deferred unit of work in the queue
#[derive(Debug)]
pub struct PendingStep {
    /// Unique step ID
    pub id: StepId,
    /// Wait before the action runs
    pub delay: Duration,
    /// The action
    pub action: StepAction,
}

impl PendingStep {
    /// Create a step from an action
    pub fn new(action: StepAction, delay: Duration) -> Self {
        Self {
            id: StepId::new(),
            delay,
            action,
        }
    }

    /// Create an effect step
    pub fn effect(kind: StepKind, timing: impl Into<Timing>) -> Self {
        let timing = timing.into();
        Self::new(
            StepAction::Effect {
                kind,
                duration: timing.duration,
            },
            timing.delay,
        )
    }

    /// Create a barrier step
    pub fn barrier() -> Self {
        Self::new(StepAction::Barrier, Duration::ZERO)
    }

    /// Create a barrier that runs `callback` when reached
    pub fn call(callback: impl FnOnce() + 'static) -> Self {
        Self::new(StepAction::Callback(Box::new(callback)), Duration::ZERO)
    }

    /// Create an opaque step
    pub fn custom(
        delay: Duration,
        run: impl FnOnce(&dyn Element) -> CompletionSignal + 'static,
    ) -> Self {
        Self::new(StepAction::Custom(Box::new(run)), delay)
    }

    /// Whether the step is a checkpoint that leaves the element untouched
    pub fn is_barrier(&self) -> bool {
        matches!(self.action, StepAction::Barrier | StepAction::Callback(_))
    }
}
