// SPDX-License-Identifier: MIT OR Apache-2.0
//! Per-element animation sequencer.
//!
//! Steps are queued through the fluent builders and run strictly one after
//! another once [`Sequencer::start`] is called. Each step waits its delay,
//! applies its effect and waits for the element's completion signal before
//! the next one may begin.
//!
//! ```rust,ignore
//! let element = Rc::new(HeadlessElement::new());
//! let scheduler = Rc::new(FrameScheduler::new());
//! let sequencer = Sequencer::new(element.clone(), scheduler.clone());
//!
//! sequencer
//!     .alpha(0.0, Timing::millis(200))
//!     .rotate(90.0, Timing::millis(300).delay_ms(50))
//!     .barrier()
//!     .alpha(1.0, Duration::from_millis(200))
//!     .start();
//! ```

use crate::completion::CompletionSignal;
use crate::config::{SequencerConfig, ZeroDurationPolicy};
use crate::element::Element;
use crate::error::{Result, SequencerError};
use crate::scheduler::Scheduler;
use crate::script::AnimationScript;
use crate::step::{PendingStep, StepAction, StepId, StepKind, Timing};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::{Rc, Weak};
use std::time::Duration;

type Callback = Rc<dyn Fn()>;

/// Mutable run state
#[derive(Default)]
struct SequencerState {
    /// Steps waiting to run, front first
    queue: VecDeque<PendingStep>,
    /// Whether a drain is in progress
    running: bool,
    /// Inside `start()`, while the start callback runs
    starting: bool,
    /// Step currently in flight
    current: Option<StepId>,
    /// Run generation, bumped on cancel
    epoch: u64,
    on_start: Option<Callback>,
    on_completed: Option<Callback>,
}

struct Shared {
    element: Rc<dyn Element>,
    scheduler: Rc<dyn Scheduler>,
    config: SequencerConfig,
    state: RefCell<SequencerState>,
}

/// Animation sequencer bound to one element
///
/// Cloning yields another handle to the same sequencer. A sequencer built
/// on a detached element accepts every call but does nothing. A run stops
/// once every handle is dropped.
#[derive(Clone)]
pub struct Sequencer {
    shared: Option<Rc<Shared>>,
}

impl Sequencer {
    /// Create a sequencer with default settings
    ///
    /// A detached element is logged and yields an inert sequencer.
    pub fn new(element: Rc<dyn Element>, scheduler: Rc<dyn Scheduler>) -> Self {
        Self::with_config(element, scheduler, SequencerConfig::default())
    }

    /// Create a sequencer with custom settings
    pub fn with_config(
        element: Rc<dyn Element>,
        scheduler: Rc<dyn Scheduler>,
        config: SequencerConfig,
    ) -> Self {
        match Self::try_with_config(element, scheduler, config) {
            Ok(sequencer) => sequencer,
            Err(e) => {
                tracing::error!("Cannot initialize animation sequencer: {e}");
                Self { shared: None }
            }
        }
    }

    /// Create a sequencer, failing if the element is detached
    pub fn try_new(element: Rc<dyn Element>, scheduler: Rc<dyn Scheduler>) -> Result<Self> {
        Self::try_with_config(element, scheduler, SequencerConfig::default())
    }

    /// Create a sequencer with custom settings, failing if the element is detached
    pub fn try_with_config(
        element: Rc<dyn Element>,
        scheduler: Rc<dyn Scheduler>,
        config: SequencerConfig,
    ) -> Result<Self> {
        if !element.is_attached() {
            return Err(SequencerError::ElementUnavailable);
        }
        Ok(Self {
            shared: Some(Rc::new(Shared {
                element,
                scheduler,
                config,
                state: RefCell::new(SequencerState::default()),
            })),
        })
    }

    /// Whether the sequencer is bound to an attached element
    pub fn is_attached(&self) -> bool {
        self.shared.is_some()
    }

    /// Append a step to the queue
    pub fn enqueue(&self, step: PendingStep) -> &Self {
        match &self.shared {
            Some(shared) => {
                tracing::trace!(step = ?step.id, action = ?step.action, "Queued animation step");
                shared.state.borrow_mut().queue.push_back(step);
            }
            None => tracing::trace!("Dropping step queued on a detached sequencer"),
        }
        self
    }

    /// Queue a no-op checkpoint
    pub fn barrier(&self) -> &Self {
        self.enqueue(PendingStep::barrier())
    }

    /// Queue a checkpoint that runs `callback` once every earlier step finished
    pub fn then_call(&self, callback: impl FnOnce() + 'static) -> &Self {
        self.enqueue(PendingStep::call(callback))
    }

    /// Queue every step of a script
    pub fn enqueue_script(&self, script: &AnimationScript) -> &Self {
        for step in script.to_steps() {
            self.enqueue(step);
        }
        self
    }

    /// Set the callback invoked when a run starts
    pub fn set_on_start(&self, callback: impl Fn() + 'static) -> &Self {
        self.update_state(|state| state.on_start = Some(Rc::new(callback)));
        self
    }

    /// Remove the start callback
    pub fn clear_on_start(&self) -> &Self {
        self.update_state(|state| state.on_start = None);
        self
    }

    /// Set the callback invoked when a run drains its queue
    pub fn set_on_completed(&self, callback: impl Fn() + 'static) -> &Self {
        self.update_state(|state| state.on_completed = Some(Rc::new(callback)));
        self
    }

    /// Remove the completion callback
    pub fn clear_on_completed(&self) -> &Self {
        self.update_state(|state| state.on_completed = None);
        self
    }

    /// Start draining the queue
    ///
    /// Invokes the start callback, then returns; steps run on the
    /// scheduler. Calling this while a run is in progress does nothing.
    pub fn start(&self) -> &Self {
        let Some(shared) = &self.shared else {
            tracing::warn!("start() called on a detached sequencer");
            return self;
        };

        let (on_start, epoch) = {
            let mut state = shared.state.borrow_mut();
            if state.running || state.starting {
                tracing::debug!("Animation sequence already running");
                return self;
            }
            state.starting = true;
            tracing::debug!(pending = state.queue.len(), "Starting animation sequence");
            (state.on_start.clone(), state.epoch)
        };

        if let Some(callback) = on_start {
            callback();
        }

        {
            let mut state = shared.state.borrow_mut();
            state.starting = false;
            // The start callback may have cancelled the sequencer
            if state.running || state.epoch != epoch {
                return self;
            }
            state.running = true;
        }

        shared
            .scheduler
            .spawn_local(Box::pin(drain(Rc::downgrade(shared), epoch)));
        self
    }

    /// Stop the run and discard every pending step
    ///
    /// The completion callback is not invoked. Signals from the step that
    /// was in flight are ignored when they fire.
    pub fn cancel(&self) {
        let Some(shared) = &self.shared else {
            return;
        };

        let discarded = {
            let mut state = shared.state.borrow_mut();
            if state.running {
                tracing::debug!(
                    discarded = state.queue.len(),
                    "Cancelling animation sequence"
                );
            }
            state.running = false;
            state.current = None;
            state.epoch = state.epoch.wrapping_add(1);
            std::mem::take(&mut state.queue)
        };
        shared.element.clear_transition();
        drop(discarded);
    }

    /// Whether a run is in progress
    pub fn is_running(&self) -> bool {
        self.shared
            .as_ref()
            .is_some_and(|shared| shared.state.borrow().running)
    }

    /// Number of steps waiting in the queue
    pub fn pending_steps(&self) -> usize {
        self.shared
            .as_ref()
            .map_or(0, |shared| shared.state.borrow().queue.len())
    }

    /// ID of the step in flight
    pub fn current_step(&self) -> Option<StepId> {
        self.shared
            .as_ref()
            .and_then(|shared| shared.state.borrow().current)
    }

    /// Settings in use
    pub fn config(&self) -> Option<&SequencerConfig> {
        self.shared.as_ref().map(|shared| &shared.config)
    }

    fn update_state(&self, f: impl FnOnce(&mut SequencerState)) {
        if let Some(shared) = &self.shared {
            f(&mut shared.state.borrow_mut());
        }
    }
}

impl std::fmt::Debug for Sequencer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sequencer")
            .field("attached", &self.is_attached())
            .field("running", &self.is_running())
            .field("pending", &self.pending_steps())
            .finish_non_exhaustive()
    }
}

/// Generates one fluent builder per step kind
macro_rules! step_builders {
    ($( $(#[$meta:meta])* $name:ident ( $($arg:ident),+ ) => $kind:expr; )+) => {
        impl Sequencer {
            $(
                $(#[$meta])*
                pub fn $name(&self, $($arg: f32,)+ timing: impl Into<Timing>) -> &Self {
                    self.enqueue(PendingStep::effect($kind, timing))
                }
            )+
        }
    };
}

step_builders! {
    /// Fade to `alpha` (0 to 1)
    alpha(alpha) => StepKind::Alpha(alpha);
    /// Move to (`left`, `top`) in pixels
    set_position(left, top) => StepKind::Translate { x: left, y: top };
    /// Move horizontally to `left` pixels
    position_x(left) => StepKind::TranslateX(left);
    /// Move vertically to `top` pixels
    position_y(top) => StepKind::TranslateY(top);
    /// Rotate to `angle` degrees
    rotate(angle) => StepKind::Rotate(angle);
    /// Rotate around the X axis to `angle` degrees
    rotate_x(angle) => StepKind::RotateX(angle);
    /// Rotate around the Y axis to `angle` degrees
    rotate_y(angle) => StepKind::RotateY(angle);
    /// Scale by (`x`, `y`)
    scale(x, y) => StepKind::Scale { x, y };
    /// Scale horizontally by `x`
    scale_x(x) => StepKind::ScaleX(x);
    /// Scale vertically by `y`
    scale_y(y) => StepKind::ScaleY(y);
    /// Translate by (`left`, `top`) pixels
    translate(left, top) => StepKind::Translate { x: left, y: top };
    /// Translate horizontally by `left` pixels
    translate_x(left) => StepKind::TranslateX(left);
    /// Translate vertically by `top` pixels
    translate_y(top) => StepKind::TranslateY(top);
}

/// Drain loop for one run
///
/// The task only holds a weak reference while parked, so a cancelled or
/// abandoned run does not keep the sequencer (and its scheduler) alive.
async fn drain(shared: Weak<Shared>, epoch: u64) {
    loop {
        let step = {
            let Some(this) = shared.upgrade() else {
                return;
            };
            let mut state = this.state.borrow_mut();
            if state.epoch != epoch {
                return;
            }
            match state.queue.pop_front() {
                Some(step) => {
                    state.current = Some(step.id);
                    step
                }
                None => {
                    drop(state);
                    this.finish();
                    return;
                }
            }
        };

        if !run_step(&shared, step, epoch).await {
            return;
        }
    }
}

/// Run one step; returns false if the run must stop
async fn run_step(shared: &Weak<Shared>, step: PendingStep, epoch: u64) -> bool {
    let PendingStep { id, delay, action } = step;
    tracing::trace!(step = ?id, ?delay, ?action, "Running animation step");

    if !delay.is_zero() {
        let Some(signal) = shared.upgrade().map(|this| this.scheduler.delay(delay)) else {
            return false;
        };
        if let Err(e) = signal.await {
            tracing::warn!(step = ?id, "Animation step delay never fired: {e}");
            return false;
        }
    }

    let signal = {
        let Some(this) = shared.upgrade() else {
            return false;
        };
        if !this.is_live(epoch, id) {
            return false;
        }
        match action {
            StepAction::Effect { kind, duration } => this.apply_effect(kind, duration),
            StepAction::Barrier => CompletionSignal::resolved(),
            StepAction::Callback(callback) => {
                callback();
                CompletionSignal::resolved()
            }
            StepAction::Custom(run) => run(&*this.element),
        }
    };

    if let Err(e) = signal.await {
        // A signal that can never fire stalls the run until cancel()
        tracing::warn!(step = ?id, "Animation step stalled: {e}");
        return false;
    }

    let Some(this) = shared.upgrade() else {
        return false;
    };
    let mut state = this.state.borrow_mut();
    if state.epoch != epoch || state.current != Some(id) {
        tracing::trace!(step = ?id, "Ignoring completion from a cancelled run");
        return false;
    }
    state.current = None;
    true
}

impl Shared {
    fn is_live(&self, epoch: u64, id: StepId) -> bool {
        let state = self.state.borrow();
        state.epoch == epoch && state.current == Some(id)
    }

    fn apply_effect(&self, kind: StepKind, duration: Duration) -> CompletionSignal {
        let property = kind.property().as_str();
        let value = kind.style_value();

        if duration.is_zero() && self.config.zero_duration == ZeroDurationPolicy::ResolveImmediately
        {
            self.element.clear_transition();
            self.element.set_style_property(property, &value);
            return CompletionSignal::resolved();
        }

        let signal = self.element.subscribe_once(&self.config.completion_event);
        self.element.set_transition(property, duration);
        self.element.set_style_property(property, &value);
        signal
    }

    fn finish(&self) {
        let on_completed = {
            let mut state = self.state.borrow_mut();
            state.running = false;
            state.current = None;
            state.on_completed.clone()
        };
        self.element.clear_transition();
        tracing::debug!("Animation sequence completed");

        if let Some(callback) = on_completed {
            callback();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion;
    use crate::element::{HeadlessElement, StyleMutation, TransitionSpec};
    use crate::scheduler::FrameScheduler;
    use crate::script::ScriptStep;
    use std::cell::Cell;

    fn setup() -> (Rc<HeadlessElement>, Rc<FrameScheduler>, Sequencer) {
        let element = Rc::new(HeadlessElement::new());
        let scheduler = Rc::new(FrameScheduler::new());
        let sequencer = Sequencer::new(element.clone(), scheduler.clone());
        (element, scheduler, sequencer)
    }

    fn counter() -> (Rc<Cell<u32>>, impl Fn() + 'static) {
        let count = Rc::new(Cell::new(0));
        let inc = count.clone();
        (count, move || inc.set(inc.get() + 1))
    }

    /// Custom step that logs its label and hands out its sender
    fn logged_step(
        label: &'static str,
        log: &Rc<RefCell<Vec<&'static str>>>,
        senders: &Rc<RefCell<Vec<completion::CompletionSender>>>,
    ) -> PendingStep {
        let log = log.clone();
        let senders = senders.clone();
        PendingStep::custom(Duration::ZERO, move |_| {
            log.borrow_mut().push(label);
            let (sender, signal) = completion::channel();
            senders.borrow_mut().push(sender);
            signal
        })
    }

    #[test]
    fn test_fade_out_then_in() {
        let (element, scheduler, sequencer) = setup();
        let (completed, on_completed) = counter();
        sequencer.set_on_completed(on_completed);

        sequencer
            .alpha(0.0, Timing::millis(200))
            .alpha(1.0, Timing::millis(200))
            .start();
        assert!(sequencer.is_running());

        scheduler.run_until_stalled();
        assert_eq!(element.style("opacity").as_deref(), Some("0"));
        assert_eq!(
            element.transition(),
            Some(TransitionSpec {
                property: "opacity".to_string(),
                duration: Duration::from_millis(200),
            })
        );
        assert_eq!(sequencer.pending_steps(), 1);

        element.finish_transition();
        scheduler.run_until_stalled();
        assert_eq!(element.style("opacity").as_deref(), Some("1"));
        assert_eq!(completed.get(), 0);
        assert!(sequencer.is_running());

        element.finish_transition();
        scheduler.run_until_stalled();
        assert_eq!(completed.get(), 1);
        assert!(!sequencer.is_running());
        assert_eq!(element.transition(), None);
        assert_eq!(element.mutations().last(), Some(&StyleMutation::ClearTransition));
    }

    #[test]
    fn test_fifo_and_exclusive() {
        let (element, scheduler, sequencer) = setup();
        let log = Rc::new(RefCell::new(Vec::new()));
        let senders = Rc::new(RefCell::new(Vec::new()));

        for label in ["a", "b", "c", "d"] {
            sequencer.enqueue(logged_step(label, &log, &senders));
        }
        sequencer.start();

        for expected in 1..=4 {
            scheduler.run_until_stalled();
            // Exactly one step in flight, the next not yet started
            assert_eq!(log.borrow().len(), expected);
            assert_eq!(senders.borrow().len(), 1);
            assert!(sequencer.current_step().is_some());
            let sender = senders.borrow_mut().pop().unwrap();
            sender.fire();
        }
        scheduler.run_until_stalled();

        assert_eq!(*log.borrow(), vec!["a", "b", "c", "d"]);
        assert!(!sequencer.is_running());
        assert_eq!(sequencer.current_step(), None);
        assert!(element.style_writes().is_empty());
    }

    #[test]
    fn test_effects_never_overlap() {
        let (element, scheduler, sequencer) = setup();
        let (completed, on_completed) = counter();
        sequencer.set_on_completed(on_completed);

        sequencer
            .translate(10.0, 20.0, Timing::millis(100))
            .rotate(45.0, Timing::millis(100))
            .scale(2.0, 2.0, Timing::millis(100))
            .scale_y(0.5, Timing::millis(100))
            .start();

        let mut rounds = 0;
        while sequencer.is_running() {
            scheduler.run_until_stalled();
            assert!(element.pending_listeners() <= 1);
            element.finish_transition();
            rounds += 1;
            assert!(rounds <= 5);
        }

        assert_eq!(element.max_concurrent_listeners(), 1);
        assert_eq!(completed.get(), 1);
        assert_eq!(
            element.style_writes(),
            vec![
                ("transform".to_string(), "translate(10px, 20px)".to_string()),
                ("transform".to_string(), "rotate(45deg)".to_string()),
                ("transform".to_string(), "scale(2, 2)".to_string()),
                ("transform".to_string(), "scaleY(0.5)".to_string()),
            ]
        );
    }

    #[test]
    fn test_cancel_discards_remainder() {
        let (element, scheduler, sequencer) = setup();
        let (completed, on_completed) = counter();
        sequencer.set_on_completed(on_completed);

        for i in 1..=5 {
            sequencer.position_x(i as f32 * 10.0, Timing::millis(50));
        }
        sequencer.start();

        scheduler.run_until_stalled();
        element.finish_transition();
        scheduler.run_until_stalled();
        element.finish_transition();
        scheduler.run_until_stalled();
        // Third step in flight
        assert_eq!(element.style_writes().len(), 3);

        sequencer.cancel();
        assert!(!sequencer.is_running());
        assert_eq!(sequencer.pending_steps(), 0);
        assert_eq!(sequencer.current_step(), None);
        assert_eq!(element.transition(), None);

        element.finish_transition();
        scheduler.run_until_stalled();
        assert_eq!(
            element.style_writes().last().map(|(_, v)| v.clone()),
            Some("translateX(30px)".to_string())
        );
        assert_eq!(element.style_writes().len(), 3);
        assert_eq!(completed.get(), 0);
    }

    #[test]
    fn test_stale_signal_does_not_advance_new_run() {
        let (_element, scheduler, sequencer) = setup();
        let (completed, on_completed) = counter();
        sequencer.set_on_completed(on_completed);
        let log = Rc::new(RefCell::new(Vec::new()));
        let senders = Rc::new(RefCell::new(Vec::new()));

        sequencer
            .enqueue(logged_step("old-1", &log, &senders))
            .enqueue(logged_step("old-2", &log, &senders))
            .start();
        scheduler.run_until_stalled();
        let stale = senders.borrow_mut().pop().unwrap();

        sequencer.cancel();
        sequencer
            .enqueue(logged_step("new-1", &log, &senders))
            .enqueue(logged_step("new-2", &log, &senders))
            .start();
        scheduler.run_until_stalled();
        assert_eq!(*log.borrow(), vec!["old-1", "new-1"]);

        // The cancelled step finishing late must not move the new run
        stale.fire();
        scheduler.run_until_stalled();
        assert_eq!(*log.borrow(), vec!["old-1", "new-1"]);
        assert!(sequencer.is_running());
        assert_eq!(completed.get(), 0);

        let live = senders.borrow_mut().pop().unwrap();
        live.fire();
        scheduler.run_until_stalled();
        assert_eq!(*log.borrow(), vec!["old-1", "new-1", "new-2"]);

        senders.borrow_mut().pop().unwrap().fire();
        scheduler.run_until_stalled();
        assert_eq!(completed.get(), 1);
        assert!(!sequencer.is_running());
    }

    #[test]
    fn test_cancel_after_second_step_resolves() {
        let (element, scheduler, sequencer) = setup();
        let (completed, on_completed) = counter();
        sequencer.set_on_completed(on_completed);

        for i in 1..=5 {
            sequencer.position_x(i as f32 * 10.0, Timing::millis(50));
        }
        sequencer.start();

        scheduler.run_until_stalled();
        element.finish_transition();
        scheduler.run_until_stalled();
        // Second step resolves, but the drain has not picked up the third yet
        element.finish_transition();
        sequencer.cancel();
        scheduler.run_until_stalled();

        assert_eq!(element.style_writes().len(), 2);
        assert_eq!(element.style("transform").as_deref(), Some("translateX(20px)"));
        assert_eq!(element.pending_listeners(), 0);
        assert!(!sequencer.is_running());
        assert_eq!(completed.get(), 0);
    }

    #[test]
    fn test_cancelled_run_releases_sequencer() {
        let (element, scheduler, sequencer) = setup();
        sequencer.alpha(0.0, Timing::millis(10)).start();
        scheduler.run_until_stalled();
        assert_eq!(element.pending_listeners(), 1);

        sequencer.cancel();
        drop(sequencer);
        drop(scheduler);

        // The parked drain task must not keep the element alive
        assert_eq!(Rc::strong_count(&element), 1);
    }

    #[test]
    fn test_dropped_handles_end_parked_run() {
        let (element, scheduler, sequencer) = setup();
        let (completed, on_completed) = counter();
        sequencer.set_on_completed(on_completed);
        sequencer.rotate(90.0, Timing::millis(10)).start();
        scheduler.run_until_stalled();

        drop(sequencer);
        element.finish_transition();
        scheduler.run_until_stalled();

        assert_eq!(completed.get(), 0);
        assert_eq!(Rc::strong_count(&element), 1);
    }

    #[test]
    fn test_on_start_runs_before_running_flag() {
        let (_element, scheduler, sequencer) = setup();
        let handle = sequencer.clone();
        let seen = Rc::new(Cell::new(None));
        let seen_in_callback = seen.clone();
        sequencer.set_on_start(move || seen_in_callback.set(Some(handle.is_running())));

        sequencer.alpha(0.0, Timing::millis(100)).start();
        assert_eq!(seen.get(), Some(false));
        assert!(sequencer.is_running());

        scheduler.run_until_stalled();
        assert!(sequencer.is_running());
    }

    #[test]
    fn test_start_from_on_start_is_noop() {
        let (element, scheduler, sequencer) = setup();
        let handle = sequencer.clone();
        let (started, on_start) = counter();
        sequencer.set_on_start(move || {
            on_start();
            handle.start();
        });

        sequencer.alpha(0.0, Timing::millis(100)).start();
        scheduler.run_until_stalled();

        assert_eq!(started.get(), 1);
        assert!(sequencer.is_running());
        assert_eq!(element.style_writes().len(), 1);
        assert_eq!(element.pending_listeners(), 1);
    }

    #[test]
    fn test_stale_signal_after_cancel_is_ignored() {
        let (element, scheduler, sequencer) = setup();
        let (completed, on_completed) = counter();
        sequencer.set_on_completed(on_completed);

        sequencer
            .rotate_x(30.0, Timing::millis(100))
            .rotate_y(60.0, Timing::millis(100))
            .start();
        scheduler.run_until_stalled();

        sequencer.cancel();
        element.finish_transition();
        scheduler.run_until_stalled();

        assert_eq!(element.style_writes().len(), 1);
        assert_eq!(completed.get(), 0);
        assert!(!sequencer.is_running());
    }

    #[test]
    fn test_cancel_during_delay_skips_effect() {
        let (element, scheduler, sequencer) = setup();
        sequencer
            .scale_x(3.0, Timing::millis(100).delay_ms(500))
            .start();
        scheduler.run_until_stalled();
        assert_eq!(scheduler.pending_timers(), 1);

        sequencer.cancel();
        scheduler.advance_ms(500);
        assert!(element.style_writes().is_empty());
        assert_eq!(element.pending_listeners(), 0);
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let (element, _scheduler, sequencer) = setup();
        sequencer.alpha(0.5, Timing::millis(10));
        sequencer.cancel();
        sequencer.cancel();
        assert!(!sequencer.is_running());
        assert_eq!(sequencer.pending_steps(), 0);
        assert_eq!(
            element.mutations(),
            vec![StyleMutation::ClearTransition, StyleMutation::ClearTransition]
        );
    }

    #[test]
    fn test_barrier_passthrough() {
        let (element, scheduler, sequencer) = setup();
        let (completed, on_completed) = counter();
        sequencer.set_on_completed(on_completed);

        sequencer
            .barrier()
            .barrier()
            .translate_y(15.0, Timing::millis(80))
            .start();
        scheduler.run_until_stalled();

        // Barriers resolve without touching the element or waiting on time
        assert_eq!(scheduler.now(), Duration::ZERO);
        assert_eq!(
            element.style_writes(),
            vec![("transform".to_string(), "translateY(15px)".to_string())]
        );

        element.finish_transition();
        scheduler.run_until_stalled();
        assert_eq!(completed.get(), 1);
    }

    #[test]
    fn test_then_call_runs_after_prior_steps() {
        let (element, scheduler, sequencer) = setup();
        let reached = Rc::new(Cell::new(false));
        let flag = reached.clone();

        sequencer
            .alpha(0.0, Timing::millis(100))
            .then_call(move || flag.set(true))
            .alpha(1.0, Timing::millis(100))
            .start();
        scheduler.run_until_stalled();
        assert!(!reached.get());

        element.finish_transition();
        scheduler.run_until_stalled();
        assert!(reached.get());
        assert_eq!(element.style("opacity").as_deref(), Some("1"));
    }

    #[test]
    fn test_enqueue_then_start_from_idle() {
        let (element, scheduler, sequencer) = setup();
        let (completed, on_completed) = counter();
        sequencer.set_on_completed(on_completed);
        assert!(!sequencer.is_running());

        sequencer.position_y(40.0, Timing::millis(60)).start();
        scheduler.run_until_stalled();
        element.finish_transition();
        scheduler.run_until_stalled();

        assert_eq!(completed.get(), 1);
        assert!(!sequencer.is_running());

        // A second run reuses the same callbacks
        sequencer.set_position(1.0, 2.0, Timing::millis(60)).start();
        scheduler.run_until_stalled();
        element.finish_transition();
        scheduler.run_until_stalled();
        assert_eq!(completed.get(), 2);
    }

    #[test]
    fn test_enqueue_during_run_extends_queue() {
        let (element, scheduler, sequencer) = setup();
        let (completed, on_completed) = counter();
        sequencer.set_on_completed(on_completed);

        sequencer.alpha(0.2, Timing::millis(100)).start();
        scheduler.run_until_stalled();

        sequencer.alpha(0.8, Timing::millis(100));
        element.finish_transition();
        scheduler.run_until_stalled();
        assert_eq!(element.style("opacity").as_deref(), Some("0.8"));
        assert_eq!(completed.get(), 0);

        element.finish_transition();
        scheduler.run_until_stalled();
        assert_eq!(completed.get(), 1);
    }

    #[test]
    fn test_empty_start_completes() {
        let (_element, scheduler, sequencer) = setup();
        let (started, on_start) = counter();
        let (completed, on_completed) = counter();
        sequencer.set_on_start(on_start).set_on_completed(on_completed);

        sequencer.start();
        assert_eq!(started.get(), 1);
        assert!(sequencer.is_running());

        scheduler.run_until_stalled();
        assert!(!sequencer.is_running());
        assert_eq!(completed.get(), 1);
    }

    #[test]
    fn test_double_start_is_noop() {
        let (element, scheduler, sequencer) = setup();
        let (started, on_start) = counter();
        sequencer.set_on_start(on_start);

        sequencer.alpha(0.0, Timing::millis(100)).alpha(1.0, Timing::millis(100));
        sequencer.start();
        sequencer.start();
        scheduler.run_until_stalled();

        assert_eq!(started.get(), 1);
        assert_eq!(element.style_writes().len(), 1);
        assert_eq!(element.pending_listeners(), 1);
    }

    #[test]
    fn test_callbacks_last_write_wins() {
        let (_element, scheduler, sequencer) = setup();
        let (first, on_first) = counter();
        let (second, on_second) = counter();

        sequencer.set_on_completed(on_first).set_on_completed(on_second);
        sequencer.start();
        scheduler.run_until_stalled();
        assert_eq!(first.get(), 0);
        assert_eq!(second.get(), 1);

        sequencer.clear_on_completed();
        sequencer.start();
        scheduler.run_until_stalled();
        assert_eq!(second.get(), 1);
    }

    #[test]
    fn test_on_completed_can_restart() {
        let (element, scheduler, sequencer) = setup();
        let handle = sequencer.clone();
        let loops = Rc::new(Cell::new(0));
        let loop_count = loops.clone();

        sequencer.set_on_completed(move || {
            loop_count.set(loop_count.get() + 1);
            if loop_count.get() < 3 {
                handle.rotate(360.0, Timing::millis(100)).start();
            }
        });
        sequencer.rotate(360.0, Timing::millis(100)).start();

        for _ in 0..3 {
            scheduler.run_until_stalled();
            element.finish_transition();
        }
        scheduler.run_until_stalled();

        assert_eq!(loops.get(), 3);
        assert!(!sequencer.is_running());
        assert_eq!(element.style_writes().len(), 3);
    }

    #[test]
    fn test_on_start_cancel_prevents_run() {
        let (element, scheduler, sequencer) = setup();
        let handle = sequencer.clone();
        let (completed, on_completed) = counter();
        sequencer
            .set_on_start(move || handle.cancel())
            .set_on_completed(on_completed);

        sequencer.alpha(0.0, Timing::millis(100)).start();
        scheduler.run_until_stalled();

        assert!(!sequencer.is_running());
        assert!(element.style_writes().is_empty());
        assert_eq!(completed.get(), 0);
    }

    #[test]
    fn test_delay_before_effect() {
        let (element, scheduler, sequencer) = setup();
        sequencer
            .alpha(0.0, Timing::millis(200).delay_ms(150))
            .start();

        scheduler.run_until_stalled();
        assert!(element.style_writes().is_empty());

        scheduler.advance_ms(100);
        assert!(element.style_writes().is_empty());

        scheduler.advance_ms(50);
        assert_eq!(element.style("opacity").as_deref(), Some("0"));
    }

    #[test]
    fn test_zero_duration_resolves_immediately() {
        let (element, scheduler, sequencer) = setup();
        let (completed, on_completed) = counter();
        sequencer.set_on_completed(on_completed);

        sequencer
            .alpha(0.0, Duration::ZERO)
            .rotate(10.0, Duration::ZERO)
            .start();
        scheduler.run_until_stalled();

        assert_eq!(completed.get(), 1);
        assert_eq!(element.pending_listeners(), 0);
        assert_eq!(element.style("transform").as_deref(), Some("rotate(10deg)"));
    }

    #[test]
    fn test_zero_duration_can_await_signal() {
        let element = Rc::new(HeadlessElement::new());
        let scheduler = Rc::new(FrameScheduler::new());
        let config = SequencerConfig {
            zero_duration: ZeroDurationPolicy::AwaitSignal,
            ..SequencerConfig::default()
        };
        let sequencer = Sequencer::with_config(element.clone(), scheduler.clone(), config);

        sequencer.alpha(0.0, Duration::ZERO).start();
        scheduler.run_until_stalled();
        assert!(sequencer.is_running());
        assert_eq!(element.pending_listeners(), 1);

        element.finish_transition();
        scheduler.run_until_stalled();
        assert!(!sequencer.is_running());
    }

    #[test]
    fn test_custom_completion_event() {
        let element = Rc::new(HeadlessElement::new());
        let scheduler = Rc::new(FrameScheduler::new());
        let config = SequencerConfig {
            completion_event: "animationend".to_string(),
            ..SequencerConfig::default()
        };
        let sequencer = Sequencer::with_config(element.clone(), scheduler.clone(), config);

        sequencer.scale(1.5, 1.5, Timing::millis(100)).start();
        scheduler.run_until_stalled();

        assert_eq!(element.finish_transition(), 0);
        assert_eq!(element.dispatch("animationend"), 1);
        scheduler.run_until_stalled();
        assert!(!sequencer.is_running());
    }

    #[test]
    fn test_dropped_signal_stalls_until_cancel() {
        let (_element, scheduler, sequencer) = setup();
        sequencer
            .enqueue(PendingStep::custom(Duration::ZERO, |_| {
                let (sender, signal) = completion::channel();
                drop(sender);
                signal
            }))
            .alpha(1.0, Timing::millis(100))
            .start();
        scheduler.run_until_stalled();

        assert!(sequencer.is_running());
        assert_eq!(sequencer.pending_steps(), 1);

        sequencer.cancel();
        assert!(!sequencer.is_running());
    }

    #[test]
    fn test_detached_element() {
        let element = Rc::new(HeadlessElement::detached());
        let scheduler = Rc::new(FrameScheduler::new());

        assert!(matches!(
            Sequencer::try_new(element.clone(), scheduler.clone()),
            Err(SequencerError::ElementUnavailable)
        ));

        let sequencer = Sequencer::new(element.clone(), scheduler.clone());
        assert!(!sequencer.is_attached());
        assert!(sequencer.config().is_none());

        // Chained calls are accepted and do nothing
        sequencer
            .alpha(0.0, Timing::millis(100))
            .barrier()
            .set_on_start(|| panic!("must not start"))
            .start();
        sequencer.cancel();
        scheduler.run_until_stalled();

        assert!(!sequencer.is_running());
        assert_eq!(sequencer.pending_steps(), 0);
        assert!(element.mutations().is_empty());
    }

    #[test]
    fn test_enqueue_script() {
        let (element, scheduler, sequencer) = setup();
        let script = AnimationScript::new("pulse")
            .with_step(ScriptStep::effect(StepKind::ScaleX(1.2), 100, 0))
            .with_step(ScriptStep::Barrier)
            .with_step(ScriptStep::effect(StepKind::ScaleX(1.0), 100, 0));

        sequencer.enqueue_script(&script);
        assert_eq!(sequencer.pending_steps(), 3);

        sequencer.start();
        while sequencer.is_running() {
            scheduler.run_until_stalled();
            element.finish_transition();
        }
        assert_eq!(element.style("transform").as_deref(), Some("scaleX(1)"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_scheduler_runs_sequence() {
        use crate::scheduler::TokioScheduler;

        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let element = Rc::new(HeadlessElement::new());
                let sequencer = Sequencer::new(element.clone(), Rc::new(TokioScheduler));
                let (completed, on_completed) = counter();
                sequencer.set_on_completed(on_completed);

                sequencer
                    .alpha(0.0, Timing::millis(100).delay_ms(300))
                    .start();

                tokio::time::sleep(Duration::from_millis(100)).await;
                assert!(element.style_writes().is_empty());

                tokio::time::sleep(Duration::from_millis(250)).await;
                assert_eq!(element.style("opacity").as_deref(), Some("0"));

                element.finish_transition();
                tokio::time::sleep(Duration::from_millis(1)).await;
                assert_eq!(completed.get(), 1);
                assert!(!sequencer.is_running());
            })
            .await;
    }
}
