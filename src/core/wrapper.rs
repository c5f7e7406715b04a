//! # SubscriberWrapper: one subscription, one mailbox, one dispatch task.
//!
//! Isolates a subscriber from the publisher and from every other subscription.
//!
//! ## State machine
//! ```text
//! Created ──start()──► Running ──cancel──► Draining ──mailbox empty──► Stopped
//!    │                                                                    ▲
//!    └──────────────────────────── stop() before start ───────────────────┘
//! ```
//!
//! ## Dispatch loop
//! ```text
//! loop {
//!   select! {
//!     token.cancelled() ─► break
//!     mailbox.recv()    ─► handle_event(ev, token.child_token())
//!   }
//! }
//! close mailbox (no new sends)
//! while let Some(ev) = try_recv() ─► handle_event(ev, fresh token)   (drain)
//! stopped.cancel()   (wait() returns)
//! ```
//!
//! ## handle_event
//! - Runs `Subscribe::handle` under `catch_unwind` and the per-event timeout.
//! - On timeout the handler's token is cancelled and its future dropped; code that
//!   blocks the thread without awaiting cannot be interrupted.
//! - A handler that returns at or after its deadline counts as a timeout, whatever
//!   it returned.
//! - Exactly one outcome is recorded per event: success, error, timeout or panic.
//!
//! ## Rules
//! - Cancellation is observed at the mailbox wait only; an in-flight handler is
//!   never abandoned, it just sees its token cancelled.
//! - Drained events get a fresh token so they run with their full budget.
//! - FIFO within one wrapper; nothing is retried.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::core::config::BusConfig;
use crate::core::mailbox::{Mailbox, MailboxReceiver, SendError, mailbox};
use crate::error::HandlerError;
use crate::events::{Category, Event};
use crate::stats::{Outcome, SubscriberStats, SubscriberStatsSnapshot};
use crate::subscribers::Subscribe;

/// Lifecycle of one subscription's dispatch task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WrapperState {
    /// Built, dispatch task not spawned yet.
    Created,
    /// Waiting for or handling events.
    Running,
    /// Cancelled; handling whatever was still queued.
    Draining,
    /// Dispatch task exited.
    Stopped,
}

/// Runtime wrapper around one registration of a [`Subscribe`] implementation.
pub(crate) struct SubscriberWrapper {
    subscriber: Arc<dyn Subscribe>,
    category: Category,
    mailbox: Mailbox,
    /// Taken by `start()`; `None` afterwards (start happens once).
    receiver: Mutex<Option<MailboxReceiver>>,
    /// Stop signal, child of the bus token.
    token: CancellationToken,
    /// Fired when the dispatch task has exited.
    stopped: CancellationToken,
    state: Mutex<WrapperState>,
    stats: SubscriberStats,
    timeout: Option<Duration>,
}

impl SubscriberWrapper {
    /// Creates a wrapper in [`WrapperState::Created`].
    pub(crate) fn new(
        subscriber: Arc<dyn Subscribe>,
        category: Category,
        cfg: &BusConfig,
        token: CancellationToken,
    ) -> Self {
        let (tx, rx) = mailbox(cfg.mailbox_capacity);
        Self {
            subscriber,
            category,
            mailbox: tx,
            receiver: Mutex::new(Some(rx)),
            token,
            stopped: CancellationToken::new(),
            state: Mutex::new(WrapperState::Created),
            stats: SubscriberStats::new(cfg.enable_stats),
            timeout: cfg.handler_timeout(),
        }
    }

    #[inline]
    pub(crate) fn id(&self) -> &str {
        self.subscriber.id()
    }

    #[inline]
    pub(crate) fn category(&self) -> &Category {
        &self.category
    }

    pub(crate) fn state(&self) -> WrapperState {
        *self.state.lock()
    }

    pub(crate) fn stats(&self) -> SubscriberStatsSnapshot {
        self.stats.snapshot()
    }

    /// True once the dispatch task has exited (or the wrapper was stopped before starting).
    pub(crate) fn is_stopped(&self) -> bool {
        self.stopped.is_cancelled()
    }

    /// Spawns the dispatch task on `runtime`. Later calls are no-ops.
    pub(crate) fn start(self: &Arc<Self>, runtime: &Handle) {
        let Some(rx) = self.receiver.lock().take() else {
            return;
        };
        self.set_state(WrapperState::Running);

        let me = Arc::clone(self);
        runtime.spawn(async move { me.run(rx).await });
    }

    /// Signals the dispatch task to drain and exit. Does not wait.
    pub(crate) fn stop(&self) {
        self.token.cancel();

        // Never started: there is no task to observe the token.
        if let Some(rx) = self.receiver.lock().take() {
            drop(rx);
            self.set_state(WrapperState::Stopped);
            self.stopped.cancel();
        }
    }

    /// Non-blocking enqueue used by the publish fan-out.
    pub(crate) fn send(&self, event: &Arc<Event>) -> Result<(), SendError> {
        if self.token.is_cancelled() {
            return Err(SendError::Closed);
        }
        self.mailbox.try_send(Arc::clone(event))
    }

    /// Resolves once the dispatch task has fully exited.
    pub(crate) async fn wait(&self) {
        self.stopped.cancelled().await;
    }

    fn set_state(&self, state: WrapperState) {
        *self.state.lock() = state;
    }

    async fn run(self: Arc<Self>, mut rx: MailboxReceiver) {
        let _stopped = self.stopped.clone().drop_guard();
        tracing::debug!(subscriber = self.id(), category = %self.category, "dispatch task started");

        loop {
            tokio::select! {
                biased;
                _ = self.token.cancelled() => break,
                maybe = rx.recv() => match maybe {
                    Some(ev) => self.handle_event(&ev, self.token.child_token()).await,
                    None => break,
                },
            }
        }

        self.set_state(WrapperState::Draining);
        rx.close();

        let mut drained = 0usize;
        while let Some(ev) = rx.try_recv() {
            self.handle_event(&ev, CancellationToken::new()).await;
            drained += 1;
        }

        self.set_state(WrapperState::Stopped);
        tracing::debug!(
            subscriber = self.id(),
            category = %self.category,
            drained,
            "dispatch task exited"
        );
    }

    /// Handles one event and records exactly one outcome.
    async fn handle_event(&self, event: &Event, ctx: CancellationToken) {
        let started = Instant::now();
        let fut = AssertUnwindSafe(self.subscriber.handle(ctx.clone(), event)).catch_unwind();

        let res = match self.timeout {
            Some(dur) => match time::timeout(dur, fut).await {
                Ok(r) => Some(r),
                Err(_elapsed) => {
                    ctx.cancel();
                    None
                }
            },
            None => Some(fut.await),
        };

        let elapsed = started.elapsed();
        // A handler that blocked the thread past its budget completes in a single
        // poll, so `time::timeout` never fires for it.
        let late = self.timeout.is_some_and(|dur| elapsed >= dur);

        let outcome = match res {
            Some(Ok(_)) if late => {
                tracing::warn!(
                    subscriber = self.id(),
                    category = %event.category,
                    seq = event.seq,
                    timeout = ?self.timeout,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "handler returned after its deadline"
                );
                Outcome::Timeout
            }
            Some(Ok(Ok(()))) => Outcome::Success,
            Some(Ok(Err(HandlerError::Timeout))) | None => {
                tracing::warn!(
                    subscriber = self.id(),
                    category = %event.category,
                    seq = event.seq,
                    timeout = ?self.timeout,
                    "handler timed out"
                );
                Outcome::Timeout
            }
            Some(Ok(Err(err))) => {
                tracing::warn!(
                    subscriber = self.id(),
                    category = %event.category,
                    seq = event.seq,
                    error = %err,
                    "handler failed"
                );
                Outcome::Error
            }
            Some(Err(panic)) => {
                tracing::error!(
                    subscriber = self.id(),
                    category = %event.category,
                    seq = event.seq,
                    info = %panic_message(&*panic),
                    "handler panicked"
                );
                Outcome::Panic
            }
        };

        tracing::trace!(
            subscriber = self.id(),
            seq = event.seq,
            outcome = outcome.as_label(),
            elapsed_us = elapsed.as_micros() as u64,
            "event handled"
        );
        self.stats.record(outcome, elapsed);
    }
}

/// Extracts a readable message from a panic payload.
fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
