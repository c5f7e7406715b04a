//! # Bus configuration.
//!
//! Provides [`BusConfig`], the immutable settings applied when an
//! [`EventBus`](crate::EventBus) is constructed. There is no way to change them
//! afterwards; build a new bus instead.
//!
//! ## Sentinel values
//! - `mailbox_capacity = 0` → rendezvous mailbox: a publish only lands if the
//!   dispatch task is idle and waiting at that moment
//! - `timeout = 0s` → no per-event timeout (see [`BusConfig::handler_timeout`])
//!
//! A zero timeout does **not** mean "already expired". Every real budget must be
//! positive; zero is reserved to switch the deadline off entirely, and a handler
//! then runs until it returns or its subscription is stopped.

use std::time::Duration;

/// Configuration for an event bus.
///
/// ## Field semantics
/// - `mailbox_capacity`: events buffered per registration before publishes start dropping
/// - `timeout`: budget for one `Subscribe::handle` call
/// - `enable_stats`: record counters (when `false`, every snapshot is zero)
///
/// ## Notes
/// Fields are public so a config can be written as a struct literal. Read the
/// zero sentinels through [`handler_timeout`](Self::handler_timeout) and
/// [`is_rendezvous`](Self::is_rendezvous).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BusConfig {
    /// Capacity of each subscription's mailbox.
    ///
    /// - `0` = rendezvous (no buffering)
    /// - `n > 0` = up to `n` queued events
    pub mailbox_capacity: usize,

    /// Per-event processing timeout.
    ///
    /// Must be positive to bound handlers. `Duration::ZERO` disables the bound
    /// instead of expiring every event immediately.
    ///
    /// When it elapses the wrapper stops waiting, cancels the handler's token,
    /// drops the handler future and counts a timeout.
    pub timeout: Duration,

    /// Whether bus-wide and per-subscriber counters are recorded.
    pub enable_stats: bool,
}

impl BusConfig {
    /// Returns the per-event timeout as an `Option`.
    ///
    /// - `None` → handlers run unbounded
    /// - `Some(d)` → each handler call is bounded by `d`
    #[inline]
    pub fn handler_timeout(&self) -> Option<Duration> {
        if self.timeout == Duration::ZERO {
            None
        } else {
            Some(self.timeout)
        }
    }

    /// True if mailboxes hand events over without buffering.
    #[inline]
    pub fn is_rendezvous(&self) -> bool {
        self.mailbox_capacity == 0
    }
}

impl Default for BusConfig {
    /// Default configuration:
    ///
    /// - `mailbox_capacity = 100`
    /// - `timeout = 5s`
    /// - `enable_stats = true`
    fn default() -> Self {
        Self {
            mailbox_capacity: 100,
            timeout: Duration::from_secs(5),
            enable_stats: true,
        }
    }
}
