//! # Per-subscription mailbox.
//!
//! A FIFO of `Arc<Event>` between the publisher fan-out and one dispatch task.
//!
//! ## Modes
//! - **Buffered** (`capacity > 0`): bounded `tokio::sync::mpsc`; a send fails with
//!   [`SendError::Full`] once `capacity` events are waiting.
//! - **Rendezvous** (`capacity == 0`): a send succeeds only while the dispatch task is
//!   parked in [`MailboxReceiver::recv`]. The sender claims the idle slot with a CAS,
//!   so at most one event is ever handed over per wait.
//!
//! ## Rules
//! - Sends never block.
//! - After [`MailboxReceiver::close`] every send fails with [`SendError::Closed`];
//!   events already queued stay readable through [`MailboxReceiver::try_recv`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::mpsc;

use crate::events::Event;

/// Why a non-blocking send was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SendError {
    /// No room (buffered) or nobody waiting (rendezvous).
    Full,
    /// Receiver closed or gone.
    Closed,
}

impl SendError {
    pub(crate) fn as_label(self) -> &'static str {
        match self {
            SendError::Full => "full",
            SendError::Closed => "closed",
        }
    }
}

/// Creates a connected mailbox pair.
pub(crate) fn mailbox(capacity: usize) -> (Mailbox, MailboxReceiver) {
    let (tx, rx) = mpsc::channel::<Arc<Event>>(capacity.max(1));
    let idle = (capacity == 0).then(|| Arc::new(AtomicBool::new(false)));
    (
        Mailbox {
            tx,
            idle: idle.clone(),
        },
        MailboxReceiver { rx, idle },
    )
}

/// Sending half, owned by the subscription wrapper.
pub(crate) struct Mailbox {
    tx: mpsc::Sender<Arc<Event>>,
    idle: Option<Arc<AtomicBool>>,
}

impl Mailbox {
    /// Attempts to enqueue without waiting.
    pub(crate) fn try_send(&self, event: Arc<Event>) -> Result<(), SendError> {
        if let Some(idle) = &self.idle {
            if idle
                .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
            {
                return Err(SendError::Full);
            }
        }
        self.tx.try_send(event).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SendError::Full,
            mpsc::error::TrySendError::Closed(_) => SendError::Closed,
        })
    }
}

/// Receiving half, owned by the dispatch task.
pub(crate) struct MailboxReceiver {
    rx: mpsc::Receiver<Arc<Event>>,
    idle: Option<Arc<AtomicBool>>,
}

impl MailboxReceiver {
    /// Waits for the next event; `None` once every sender is gone.
    ///
    /// Cancel-safe: dropping the future loses no event.
    pub(crate) async fn recv(&mut self) -> Option<Arc<Event>> {
        if let Some(idle) = &self.idle {
            idle.store(true, Ordering::Release);
        }
        self.rx.recv().await
    }

    /// Refuses further sends; queued events remain readable.
    pub(crate) fn close(&mut self) {
        if let Some(idle) = &self.idle {
            idle.store(false, Ordering::Release);
        }
        self.rx.close();
    }

    /// Takes the next queued event, if any.
    pub(crate) fn try_recv(&mut self) -> Option<Arc<Event>> {
        self.rx.try_recv().ok()
    }
}
