// SPDX-License-Identifier: MIT OR Apache-2.0
//! Scheduling backends.
//!
//! A [`Scheduler`] provides the two capabilities the sequencer needs from
//! its host: running the single-threaded drain task and waiting for a
//! delay. Two backends are provided:
//! - [`FrameScheduler`] for hosts with a frame loop; time only moves when
//!   the host calls [`FrameScheduler::advance`]
//! - [`TokioScheduler`] for hosts running a tokio `LocalSet`

use crate::completion::{self, CompletionSender, CompletionSignal};
use futures::executor::{LocalPool, LocalSpawner};
use futures::future::LocalBoxFuture;
use futures::task::LocalSpawnExt;
use std::cell::{Cell, RefCell};
use std::time::Duration;

/// Host capabilities used by the sequencer
pub trait Scheduler {
    /// Run a task on the current thread
    fn spawn_local(&self, task: LocalBoxFuture<'static, ()>);

    /// Get a signal that fires once `duration` has elapsed
    fn delay(&self, duration: Duration) -> CompletionSignal;
}

/// Delay waiting in a [`FrameScheduler`]
#[derive(Debug)]
struct Timer {
    deadline: Duration,
    sender: CompletionSender,
}

/// Frame-driven scheduler
///
/// Tasks run only inside [`advance`](Self::advance) or
/// [`run_until_stalled`](Self::run_until_stalled). Neither may be called
/// from inside a task.
pub struct FrameScheduler {
    pool: RefCell<LocalPool>,
    spawner: LocalSpawner,
    now: Cell<Duration>,
    timers: RefCell<Vec<Timer>>,
}

impl FrameScheduler {
    /// Create a new scheduler at time zero
    pub fn new() -> Self {
        let pool = LocalPool::new();
        let spawner = pool.spawner();
        Self {
            pool: RefCell::new(pool),
            spawner,
            now: Cell::new(Duration::ZERO),
            timers: RefCell::new(Vec::new()),
        }
    }

    /// Current scheduler time
    pub fn now(&self) -> Duration {
        self.now.get()
    }

    /// Number of delays that have not fired yet
    pub fn pending_timers(&self) -> usize {
        self.timers.borrow().len()
    }

    /// Run spawned tasks until none can make progress
    pub fn run_until_stalled(&self) {
        self.pool.borrow_mut().run_until_stalled();
    }

    /// Move time forward, fire due delays and run tasks
    pub fn advance(&self, delta: Duration) {
        self.now.set(self.now.get() + delta);
        let now = self.now.get();

        let mut due: Vec<Timer> = {
            let mut timers = self.timers.borrow_mut();
            let (due, waiting): (Vec<_>, Vec<_>) =
                timers.drain(..).partition(|t| t.deadline <= now);
            *timers = waiting;
            due
        };
        due.sort_by_key(|t| t.deadline);

        for timer in due {
            timer.sender.fire();
        }
        self.run_until_stalled();
    }

    /// Advance by a number of milliseconds
    pub fn advance_ms(&self, delta_ms: u64) {
        self.advance(Duration::from_millis(delta_ms));
    }
}

impl Default for FrameScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FrameScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameScheduler")
            .field("now", &self.now.get())
            .field("pending_timers", &self.pending_timers())
            .finish_non_exhaustive()
    }
}

impl Scheduler for FrameScheduler {
    fn spawn_local(&self, task: LocalBoxFuture<'static, ()>) {
        if let Err(e) = self.spawner.spawn_local(task) {
            tracing::warn!("Failed to spawn sequencer task: {}", e);
        }
    }

    fn delay(&self, duration: Duration) -> CompletionSignal {
        if duration.is_zero() {
            return CompletionSignal::resolved();
        }
        let (sender, signal) = completion::channel();
        self.timers.borrow_mut().push(Timer {
            deadline: self.now.get() + duration,
            sender,
        });
        signal
    }
}

/// Scheduler backed by the tokio runtime
///
/// Must be used from within a `tokio::task::LocalSet`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioScheduler;

impl Scheduler for TokioScheduler {
    fn spawn_local(&self, task: LocalBoxFuture<'static, ()>) {
        tokio::task::spawn_local(task);
    }

    fn delay(&self, duration: Duration) -> CompletionSignal {
        if duration.is_zero() {
            return CompletionSignal::resolved();
        }
        let (sender, signal) = completion::channel();
        tokio::task::spawn_local(async move {
            tokio::time::sleep(duration).await;
            sender.fire();
        });
        signal
    }
}
