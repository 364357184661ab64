// SPDX-License-Identifier: MIT OR Apache-2.0
//! Element whose transitions finish on a tokio timer.

use indexmap::IndexMap;
use ordoplay_animator::{completion, CompletionSender, CompletionSignal, Element};
use std::cell::{Cell, RefCell};
use std::time::Duration;

/// Headless element that dispatches transition-end after the transition
/// duration elapses
pub struct TimedElement {
    styles: RefCell<IndexMap<String, String>>,
    transition: Cell<Option<Duration>>,
    listeners: RefCell<Vec<CompletionSender>>,
}

impl TimedElement {
    /// Create an element with no styles
    pub fn new() -> Self {
        Self {
            styles: RefCell::new(IndexMap::new()),
            transition: Cell::new(None),
            listeners: RefCell::new(Vec::new()),
        }
    }

    /// Current styles in first-write order
    pub fn styles(&self) -> Vec<(String, String)> {
        self.styles
            .borrow()
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }
}

impl Default for TimedElement {
    fn default() -> Self {
        Self::new()
    }
}

impl Element for TimedElement {
    fn set_style_property(&self, name: &str, value: &str) {
        tracing::info!("{name} -> {value}");
        self.styles
            .borrow_mut()
            .insert(name.to_string(), value.to_string());

        let Some(duration) = self.transition.get() else {
            return;
        };
        let listeners = std::mem::take(&mut *self.listeners.borrow_mut());
        if listeners.is_empty() {
            return;
        }
        tokio::task::spawn_local(async move {
            tokio::time::sleep(duration).await;
            for listener in listeners {
                listener.fire();
            }
        });
    }

    fn set_transition(&self, property: &str, duration: Duration) {
        tracing::debug!("transition: {property} {}ms", duration.as_millis());
        self.transition.set(Some(duration));
    }

    fn clear_transition(&self) {
        self.transition.set(None);
    }

    fn subscribe_once(&self, _event: &str) -> CompletionSignal {
        let (sender, signal) = completion::channel();
        self.listeners.borrow_mut().push(sender);
        signal
    }
}
