// SPDX-License-Identifier: MIT OR Apache-2.0
//! Element binding for the sequencer.
//!
//! The sequencer never animates anything itself. It writes style
//! properties, configures a transition hint and waits for the element to
//! report that the transition finished. [`Element`] is that contract;
//! [`HeadlessElement`] is an in-memory implementation for frame-driven
//! hosts and tests.

use crate::completion::{self, CompletionSender, CompletionSignal};
use indexmap::IndexMap;
use std::cell::{Cell, RefCell};
use std::time::Duration;

/// Event name dispatched when a style transition ends
pub const TRANSITION_END: &str = "transitionend";

/// Visual element animated by a sequencer
///
/// All methods take `&self`; implementations use interior mutability so
/// the sequencer and host can share the element.
pub trait Element {
    /// Whether the element is ready to be animated
    fn is_attached(&self) -> bool {
        true
    }

    /// Write a style property
    fn set_style_property(&self, name: &str, value: &str);

    /// Configure which property animates and for how long
    fn set_transition(&self, property: &str, duration: Duration);

    /// Remove any pending transition hint
    fn clear_transition(&self);

    /// Register a listener that fires once for `event`, then unregisters
    fn subscribe_once(&self, event: &str) -> CompletionSignal;
}

/// Active transition hint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionSpec {
    /// Animated property
    pub property: String,
    /// Transition duration
    pub duration: Duration,
}

/// A recorded mutation on a [`HeadlessElement`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StyleMutation {
    /// A style property was written
    Style {
        /// Property name
        name: String,
        /// New value
        value: String,
    },
    /// A transition hint was set
    Transition(TransitionSpec),
    /// The transition hint was cleared
    ClearTransition,
}

/// In-memory element
///
/// Stores style properties in write order, records every mutation and
/// holds once-listeners until [`dispatch`](Self::dispatch) fires them.
#[derive(Debug)]
pub struct HeadlessElement {
    attached: bool,
    styles: RefCell<IndexMap<String, String>>,
    transition: RefCell<Option<TransitionSpec>>,
    listeners: RefCell<Vec<(String, CompletionSender)>>,
    mutations: RefCell<Vec<StyleMutation>>,
    max_listeners: Cell<usize>,
}

impl HeadlessElement {
    /// Create an attached element
    pub fn new() -> Self {
        Self {
            attached: true,
            styles: RefCell::new(IndexMap::new()),
            transition: RefCell::new(None),
            listeners: RefCell::new(Vec::new()),
            mutations: RefCell::new(Vec::new()),
            max_listeners: Cell::new(0),
        }
    }

    /// Create an element that reports itself as not attached
    pub fn detached() -> Self {
        Self {
            attached: false,
            ..Self::new()
        }
    }

    /// Get a style property
    pub fn style(&self, name: &str) -> Option<String> {
        self.styles.borrow().get(name).cloned()
    }

    /// Get the active transition hint
    pub fn transition(&self) -> Option<TransitionSpec> {
        self.transition.borrow().clone()
    }

    /// Get all recorded mutations
    pub fn mutations(&self) -> Vec<StyleMutation> {
        self.mutations.borrow().clone()
    }

    /// Get the style writes in order, as `(name, value)` pairs
    pub fn style_writes(&self) -> Vec<(String, String)> {
        self.mutations
            .borrow()
            .iter()
            .filter_map(|m| match m {
                StyleMutation::Style { name, value } => Some((name.clone(), value.clone())),
                _ => None,
            })
            .collect()
    }

    /// Number of listeners still waiting for an event
    pub fn pending_listeners(&self) -> usize {
        self.listeners.borrow().len()
    }

    /// Highest number of listeners that were pending at the same time
    pub fn max_concurrent_listeners(&self) -> usize {
        self.max_listeners.get()
    }

    /// Fire and unregister every listener for `event`
    ///
    /// Returns the number of listeners fired.
    pub fn dispatch(&self, event: &str) -> usize {
        let fired: Vec<CompletionSender> = {
            let mut listeners = self.listeners.borrow_mut();
            let (matching, rest): (Vec<_>, Vec<_>) =
                listeners.drain(..).partition(|(name, _)| name == event);
            *listeners = rest;
            matching.into_iter().map(|(_, sender)| sender).collect()
        };

        let count = fired.len();
        for sender in fired {
            sender.fire();
        }
        count
    }

    /// Finish the running transition
    pub fn finish_transition(&self) -> usize {
        self.dispatch(TRANSITION_END)
    }

    /// Forget the mutation log
    pub fn clear_mutations(&self) {
        self.mutations.borrow_mut().clear();
    }
}

impl Default for HeadlessElement {
    fn default() -> Self {
        Self::new()
    }
}

impl Element for HeadlessElement {
    fn is_attached(&self) -> bool {
        self.attached
    }

    fn set_style_property(&self, name: &str, value: &str) {
        self.styles
            .borrow_mut()
            .insert(name.to_string(), value.to_string());
        self.mutations.borrow_mut().push(StyleMutation::Style {
            name: name.to_string(),
            value: value.to_string(),
        });
    }

    fn set_transition(&self, property: &str, duration: Duration) {
        let spec = TransitionSpec {
            property: property.to_string(),
            duration,
        };
        *self.transition.borrow_mut() = Some(spec.clone());
        self.mutations
            .borrow_mut()
            .push(StyleMutation::Transition(spec));
    }

    fn clear_transition(&self) {
        *self.transition.borrow_mut() = None;
        self.mutations
            .borrow_mut()
            .push(StyleMutation::ClearTransition);
    }

    fn subscribe_once(&self, event: &str) -> CompletionSignal {
        let (sender, signal) = completion::channel();
        let mut listeners = self.listeners.borrow_mut();
        // Listeners whose signal was dropped can never be observed
        listeners.retain(|(_, sender)| !sender.is_abandoned());
        listeners.push((event.to_string(), sender));
        self.max_listeners
            .set(self.max_listeners.get().max(listeners.len()));
        signal
    }
}
