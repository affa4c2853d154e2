// ── Refresh debouncer ──
//
// Coalesces bursts of refresh demand into a bounded number of actual
// executions. One worker task owns the single-flight state machine:
//
//   Idle      -- no execution pending or in flight. Demand executes
//                immediately (or after one cooldown in deferred mode).
//   Executing -- demand arriving now is recorded; when the execution
//                finishes, exactly one trailing execution starts
//                immediately, skipping the cooldown. Correctness after
//                a write matters more than shaving one extra call.
//   Cooldown  -- demand arriving now waits out the remainder of the
//                window, then executes once.
//
// Waiters are carried until the execution that completes the burst, so
// every caller resolves against state at least as fresh as its request.

use std::future::Future;
use std::time::Duration;

use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::trace;

type Waiter<T> = oneshot::Sender<T>;

/// One unit of refresh demand. `None` carries no reply channel
/// (fire-and-forget, used by the periodic poll timer).
type Demand<T> = Option<Waiter<T>>;

/// Single-flight execution coalescer.
///
/// Concurrent demand never spawns parallel executions; at most one
/// execution runs per cooldown window under steady low-frequency
/// demand, and a burst costs at most two (one immediate, one trailing).
pub(crate) struct Debouncer<T> {
    tx: mpsc::UnboundedSender<Demand<T>>,
}

// Clones are cheap sender handles onto the one worker task; a derive
// would needlessly require `T: Clone`.
impl<T> Clone for Debouncer<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<T: Clone + Send + 'static> Debouncer<T> {
    /// Spawn the worker task. `op` is the guarded execution; it is never
    /// invoked concurrently with itself. Cancelling `cancel` tears the
    /// worker down: pending timers are dropped, an in-flight execution
    /// completes but its result is discarded.
    pub(crate) fn new<F, Fut>(
        cooldown: Duration,
        immediate: bool,
        cancel: CancellationToken,
        op: F,
    ) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_worker(rx, cooldown, immediate, cancel, op));
        Self { tx }
    }

    /// Request an execution and wait for the one that covers this call.
    ///
    /// Resolves with the result of an execution that started at or after
    /// this request was enqueued. Returns `None` if the debouncer was
    /// torn down before an execution could cover the request.
    pub(crate) async fn call(&self) -> Option<T> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx.send(Some(reply_tx)).ok()?;
        reply_rx.await.ok()
    }

    /// Fire-and-forget demand: schedule an execution without waiting
    /// for its outcome.
    pub(crate) fn request(&self) {
        let _ = self.tx.send(None);
    }
}

// ── Worker ───────────────────────────────────────────────────────────

/// How a cooldown window ended.
enum WindowEnd {
    /// Demand arrived inside the window; execute when it closes.
    Demanded,
    /// The window elapsed untouched; go back to idle.
    Quiet,
    /// Cancelled or all handles dropped.
    Torn,
}

async fn run_worker<T, F, Fut>(
    mut rx: mpsc::UnboundedReceiver<Demand<T>>,
    cooldown: Duration,
    immediate: bool,
    cancel: CancellationToken,
    mut op: F,
) where
    T: Clone + Send + 'static,
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = T> + Send + 'static,
{
    let mut waiters: Vec<Waiter<T>> = Vec::new();

    'idle: loop {
        // Idle: block until the first demand of a burst.
        let demand = tokio::select! {
            biased;
            () = cancel.cancelled() => break 'idle,
            d = rx.recv() => match d {
                Some(d) => d,
                None => break 'idle,
            },
        };
        if let Some(waiter) = demand {
            waiters.push(waiter);
        }

        // Deferred mode: hold the first execution back one full
        // cooldown, coalescing any demand that arrives meanwhile.
        if !immediate
            && matches!(
                collect_window(&mut rx, &mut waiters, &cancel, cooldown).await,
                WindowEnd::Torn
            )
        {
            break 'idle;
        }

        // Burst loop: executions stay serialized through here.
        loop {
            drain_ready(&mut rx, &mut waiters);
            trace!(waiters = waiters.len(), "starting execution");
            let result = op().await;

            if cancel.is_cancelled() {
                // Teardown raced the execution. Discard the result;
                // dropping the waiters resolves their callers as torn
                // down.
                break 'idle;
            }

            // Demand that arrived while executing wins one trailing
            // execution immediately. Existing waiters ride along so the
            // whole burst resolves against the freshest state.
            if drain_ready(&mut rx, &mut waiters) {
                trace!("trailing execution wanted");
                continue;
            }

            for waiter in waiters.drain(..) {
                let _ = waiter.send(result.clone());
            }

            match collect_window(&mut rx, &mut waiters, &cancel, cooldown).await {
                WindowEnd::Demanded => continue,
                WindowEnd::Quiet => continue 'idle,
                WindowEnd::Torn => break 'idle,
            }
        }
    }
}

/// Move every already-queued demand into `waiters`. Returns whether any
/// demand (with or without a reply channel) was pending.
fn drain_ready<T>(rx: &mut mpsc::UnboundedReceiver<Demand<T>>, waiters: &mut Vec<Waiter<T>>) -> bool {
    let mut any = false;
    loop {
        match rx.try_recv() {
            Ok(demand) => {
                any = true;
                if let Some(waiter) = demand {
                    waiters.push(waiter);
                }
            }
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => return any,
        }
    }
}

/// Sit out one cooldown window, collecting demand as it arrives.
async fn collect_window<T>(
    rx: &mut mpsc::UnboundedReceiver<Demand<T>>,
    waiters: &mut Vec<Waiter<T>>,
    cancel: &CancellationToken,
    window: Duration,
) -> WindowEnd {
    let sleep = tokio::time::sleep_until(Instant::now() + window);
    tokio::pin!(sleep);
    let mut demanded = false;

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => return WindowEnd::Torn,
            () = &mut sleep => {
                return if demanded { WindowEnd::Demanded } else { WindowEnd::Quiet };
            }
            d = rx.recv() => match d {
                Some(demand) => {
                    if let Some(waiter) = demand {
                        waiters.push(waiter);
                    }
                    demanded = true;
                }
                None => return WindowEnd::Torn,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tokio::time::{advance, sleep};

    use super::*;

    const MS: fn(u64) -> Duration = Duration::from_millis;

    /// Debouncer whose op sleeps `latency` then returns the execution
    /// ordinal (1-based).
    fn counting(
        cooldown: Duration,
        immediate: bool,
        latency: Duration,
        cancel: CancellationToken,
    ) -> (Arc<Debouncer<usize>>, Arc<AtomicUsize>) {
        let executions = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&executions);
        let debouncer = Debouncer::new(cooldown, immediate, cancel, move || {
            let counter = Arc::clone(&counter);
            async move {
                sleep(latency).await;
                counter.fetch_add(1, Ordering::SeqCst) + 1
            }
        });
        (Arc::new(debouncer), executions)
    }

    #[tokio::test(start_paused = true)]
    async fn immediate_first_call_executes_right_away() {
        let (debouncer, executions) =
            counting(MS(2000), true, Duration::ZERO, CancellationToken::new());

        let started = Instant::now();
        assert_eq!(debouncer.call().await, Some(1));
        assert_eq!(started.elapsed(), Duration::ZERO);
        assert_eq!(executions.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn burst_costs_at_most_two_executions() {
        // cooldown=2s, op latency=0.5s; calls at t=0.0, 0.1, 0.3.
        let (debouncer, executions) =
            counting(MS(2000), true, MS(500), CancellationToken::new());

        let first = tokio::spawn({
            let d = Arc::clone(&debouncer);
            async move { d.call().await }
        });
        sleep(MS(100)).await;
        let second = tokio::spawn({
            let d = Arc::clone(&debouncer);
            async move { d.call().await }
        });
        sleep(MS(200)).await;
        let third = tokio::spawn({
            let d = Arc::clone(&debouncer);
            async move { d.call().await }
        });

        // One immediate execution plus one trailing; every caller
        // resolves with the trailing result.
        assert_eq!(first.await.expect("join"), Some(2));
        assert_eq!(second.await.expect("join"), Some(2));
        assert_eq!(third.await.expect("join"), Some(2));
        assert_eq!(executions.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn demand_during_cooldown_waits_out_the_window() {
        let (debouncer, executions) =
            counting(MS(2000), true, Duration::ZERO, CancellationToken::new());

        assert_eq!(debouncer.call().await, Some(1));

        // t=0.1: inside the cooldown window opened at t=0.0. The second
        // execution must not start before the window closes at t=2.0.
        sleep(MS(100)).await;
        let started = Instant::now();
        assert_eq!(debouncer.call().await, Some(2));
        assert_eq!(started.elapsed(), MS(1900));
        assert_eq!(executions.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn cooldown_demand_coalesces() {
        let (debouncer, executions) =
            counting(MS(2000), true, Duration::ZERO, CancellationToken::new());

        assert_eq!(debouncer.call().await, Some(1));

        // Several requests land inside the same cooldown window; one
        // execution serves all of them when it closes.
        let calls: Vec<_> = (0..4)
            .map(|_| {
                tokio::spawn({
                    let d = Arc::clone(&debouncer);
                    async move { d.call().await }
                })
            })
            .collect();
        for call in calls {
            assert_eq!(call.await.expect("join"), Some(2));
        }
        assert_eq!(executions.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn deferred_mode_waits_one_cooldown_before_first_execution() {
        let (debouncer, executions) =
            counting(MS(2000), false, Duration::ZERO, CancellationToken::new());

        let started = Instant::now();
        assert_eq!(debouncer.call().await, Some(1));
        assert_eq!(started.elapsed(), MS(2000));
        assert_eq!(executions.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn fire_and_forget_request_schedules_an_execution() {
        let (debouncer, executions) =
            counting(MS(2000), true, Duration::ZERO, CancellationToken::new());

        debouncer.request();
        // Yield to the worker; no time needs to pass for an immediate
        // execution.
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
        assert_eq!(executions.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn idle_after_cooldown_executes_immediately_again() {
        let (debouncer, executions) =
            counting(MS(2000), true, Duration::ZERO, CancellationToken::new());

        assert_eq!(debouncer.call().await, Some(1));
        advance(MS(2500)).await;

        let started = Instant::now();
        assert_eq!(debouncer.call().await, Some(2));
        assert_eq!(started.elapsed(), Duration::ZERO);
        assert_eq!(executions.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_discards_in_flight_result() {
        let cancel = CancellationToken::new();
        let (debouncer, executions) = counting(MS(2000), true, MS(500), cancel.clone());

        let call = tokio::spawn({
            let d = Arc::clone(&debouncer);
            async move { d.call().await }
        });
        sleep(MS(100)).await;
        cancel.cancel();

        // The in-flight execution completes, but its result is
        // discarded: the caller observes teardown, not a value.
        assert_eq!(call.await.expect("join"), None);
        assert_eq!(executions.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn call_after_cancel_resolves_as_torn_down() {
        let cancel = CancellationToken::new();
        let (debouncer, _executions) =
            counting(MS(2000), true, Duration::ZERO, cancel.clone());

        cancel.cancel();
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
        assert_eq!(debouncer.call().await, None);
    }
}
