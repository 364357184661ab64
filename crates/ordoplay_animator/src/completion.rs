// SPDX-License-Identifier: MIT OR Apache-2.0
//! One-shot completion signals.
//!
//! A [`CompletionSignal`] is the receiving half of a single-resolution
//! channel. Collaborators hand it out from `subscribe_once` or `delay` and
//! keep the matching [`CompletionSender`]; firing consumes the sender, so a
//! signal resolves at most once.

use crate::error::{Result, SequencerError};
use futures::channel::oneshot;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Create a connected sender/signal pair
pub fn channel() -> (CompletionSender, CompletionSignal) {
    let (tx, rx) = oneshot::channel();
    (
        CompletionSender(tx),
        CompletionSignal {
            inner: SignalInner::Pending(rx),
        },
    )
}

/// Sending half of a completion signal
#[derive(Debug)]
pub struct CompletionSender(oneshot::Sender<()>);

impl CompletionSender {
    /// Resolve the paired signal
    pub fn fire(self) {
        // The receiver may already be gone (e.g. a cancelled run dropped it).
        let _ = self.0.send(());
    }

    /// Whether the paired signal has been dropped
    pub fn is_abandoned(&self) -> bool {
        self.0.is_canceled()
    }
}

#[derive(Debug)]
enum SignalInner {
    Ready,
    Pending(oneshot::Receiver<()>),
    Done,
}

/// Receiving half of a completion signal
///
/// Resolves to `Ok(())` once fired, or to [`SequencerError::SignalDropped`]
/// if the sender went away without firing.
#[derive(Debug)]
#[must_use = "completion signals do nothing unless awaited"]
pub struct CompletionSignal {
    inner: SignalInner,
}

impl CompletionSignal {
    /// A signal that is already complete
    pub fn resolved() -> Self {
        Self {
            inner: SignalInner::Ready,
        }
    }

    /// Check without blocking whether the signal has fired
    pub fn is_resolved(&mut self) -> bool {
        if let SignalInner::Pending(rx) = &mut self.inner {
            if let Ok(Some(())) = rx.try_recv() {
                self.inner = SignalInner::Ready;
            }
        }
        matches!(self.inner, SignalInner::Ready | SignalInner::Done)
    }
}

impl Future for CompletionSignal {
    type Output = Result<()>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &mut self.inner {
            SignalInner::Ready => {
                self.inner = SignalInner::Done;
                Poll::Ready(Ok(()))
            }
            SignalInner::Pending(rx) => match Pin::new(rx).poll(cx) {
                Poll::Ready(Ok(())) => {
                    self.inner = SignalInner::Done;
                    Poll::Ready(Ok(()))
                }
                Poll::Ready(Err(oneshot::Canceled)) => {
                    self.inner = SignalInner::Done;
                    Poll::Ready(Err(SequencerError::SignalDropped))
                }
                Poll::Pending => Poll::Pending,
            },
            SignalInner::Done => Poll::Ready(Ok(())),
        }
    }
}
