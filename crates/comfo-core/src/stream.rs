// ── Update subscriptions ──
//
// Watch-backed handles for consuming coordinator refresh outcomes.
// Subscribing is registering a watch receiver; unsubscribing is dropping
// the handle, so both are inherently idempotent.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::{CancellationToken, WaitForCancellationFutureOwned};

use crate::error::CoreError;
use crate::snapshot::Snapshot;

/// The latest refresh outcome observable by subscribers.
///
/// Subscribers must tolerate both shapes: a fresh snapshot after a
/// successful refresh, or the classified error after a failed one (the
/// previously cached snapshot stays authoritative in that case).
#[derive(Debug, Clone)]
pub enum Update {
    /// No refresh has completed yet.
    Pending,
    /// A refresh succeeded; this is the new authoritative snapshot.
    Snapshot(Arc<Snapshot>),
    /// A refresh failed; the cache was left untouched.
    Failed(CoreError),
}

impl Update {
    /// The snapshot carried by this update, if it is one.
    pub fn snapshot(&self) -> Option<&Arc<Snapshot>> {
        match self {
            Update::Snapshot(snapshot) => Some(snapshot),
            Update::Pending | Update::Failed(_) => None,
        }
    }
}

/// A subscription to coordinator refresh outcomes.
///
/// Provides both point-in-time access (a subscriber registered after the
/// first successful refresh synchronously sees that snapshot via
/// [`current`](Self::current)) and reactive change notification through
/// [`changed`](Self::changed) or conversion into a `Stream`.
///
/// The subscription ends when the coordinator stops: a pending
/// [`changed`](Self::changed) resolves `None`, and the `Stream` form
/// terminates.
pub struct UpdateStream {
    current: Update,
    receiver: watch::Receiver<Update>,
    cancel: CancellationToken,
}

impl UpdateStream {
    pub(crate) fn new(receiver: watch::Receiver<Update>, cancel: CancellationToken) -> Self {
        let current = receiver.borrow().clone();
        Self {
            current,
            receiver,
            cancel,
        }
    }

    /// The update captured at subscription time.
    pub fn current(&self) -> &Update {
        &self.current
    }

    /// The latest update (may have changed since subscription).
    pub fn latest(&self) -> Update {
        self.receiver.borrow().clone()
    }

    /// Wait for the next refresh outcome. Returns `None` once the
    /// coordinator has been stopped or dropped.
    pub async fn changed(&mut self) -> Option<Update> {
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => None,
            changed = self.receiver.changed() => {
                changed.ok()?;
                let update = self.receiver.borrow_and_update().clone();
                self.current = update.clone();
                Some(update)
            }
        }
    }

    /// Convert into a `Stream` for use with `StreamExt` combinators.
    pub fn into_stream(self) -> UpdateWatchStream {
        UpdateWatchStream {
            inner: WatchStream::new(self.receiver),
            cancel: self.cancel.clone(),
            cancelled: Box::pin(self.cancel.cancelled_owned()),
        }
    }
}

/// `Stream` adapter backed by the coordinator's `watch` channel.
/// Terminates when the coordinator stops.
pub struct UpdateWatchStream {
    inner: WatchStream<Update>,
    cancel: CancellationToken,
    cancelled: Pin<Box<WaitForCancellationFutureOwned>>,
}

impl Stream for UpdateWatchStream {
    type Item = Update;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        // The is_cancelled check keeps the completed cancellation future
        // from being polled again if the consumer polls past the end.
        if this.cancel.is_cancelled() || this.cancelled.as_mut().poll(cx).is_ready() {
            return Poll::Ready(None);
        }
        Pin::new(&mut this.inner).poll_next(cx)
    }
}
