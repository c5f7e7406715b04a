//! # Bus-wide and per-subscriber counters.
//!
//! Counters are plain atomics, so recording never serializes event processing
//! and never touches the registry lock. Duration aggregates (total / last
//! processing time) live behind a small `RwLock` so a snapshot sees a
//! consistent pair.
//!
//! ## Rules
//! - All counters only grow during a bus lifetime (no reset operation).
//! - With statistics disabled nothing is recorded and every snapshot is zero.
//! - Snapshots are consistent per field, not atomic across fields.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime};

use parking_lot::RwLock;

/// Point-in-time copy of bus-wide counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BusStatsSnapshot {
    /// Events accepted by `publish`.
    pub published: u64,
    /// Deliveries enqueued into a subscriber mailbox.
    pub delivered: u64,
    /// Deliveries dropped (mailbox full or subscriber stopped).
    pub delivery_failed: u64,
    /// Registered subscriber wrappers across all categories.
    pub subscribers: u64,
    /// Categories with at least one subscriber.
    pub categories: u64,
}

/// Bus-wide counters.
#[derive(Debug)]
pub(crate) struct BusStats {
    enabled: bool,
    published: AtomicU64,
    delivered: AtomicU64,
    delivery_failed: AtomicU64,
    subscribers: AtomicU64,
    categories: AtomicU64,
}

impl BusStats {
    /// Creates zeroed counters; `enabled = false` turns every recorder into a no-op.
    pub(crate) fn new(enabled: bool) -> Self {
        Self {
            enabled,
            published: AtomicU64::new(0),
            delivered: AtomicU64::new(0),
            delivery_failed: AtomicU64::new(0),
            subscribers: AtomicU64::new(0),
            categories: AtomicU64::new(0),
        }
    }

    #[inline]
    pub(crate) fn inc_published(&self) {
        if self.enabled {
            self.published.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[inline]
    pub(crate) fn inc_delivered(&self) {
        if self.enabled {
            self.delivered.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[inline]
    pub(crate) fn inc_delivery_failed(&self) {
        if self.enabled {
            self.delivery_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Stores registry gauges (called with the registry write lock held).
    pub(crate) fn set_counts(&self, subscribers: usize, categories: usize) {
        if self.enabled {
            self.subscribers.store(subscribers as u64, Ordering::Relaxed);
            self.categories.store(categories as u64, Ordering::Relaxed);
        }
    }

    /// Returns a snapshot; all zero when disabled.
    pub(crate) fn snapshot(&self) -> BusStatsSnapshot {
        if !self.enabled {
            return BusStatsSnapshot::default();
        }
        BusStatsSnapshot {
            published: self.published.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            delivery_failed: self.delivery_failed.load(Ordering::Relaxed),
            subscribers: self.subscribers.load(Ordering::Relaxed),
            categories: self.categories.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of one subscriber's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubscriberStatsSnapshot {
    /// Handler returned `Ok`.
    pub succeeded: u64,
    /// Handler returned [`HandlerError::Fail`](crate::HandlerError::Fail).
    pub failed: u64,
    /// Handler exceeded the per-event timeout (or reported [`HandlerError::Timeout`](crate::HandlerError::Timeout)).
    pub timed_out: u64,
    /// Handler panicked.
    pub panicked: u64,
    /// Sum of processing time over every handled event.
    pub total_duration: Duration,
    /// Processing time of the most recent event.
    pub last_duration: Duration,
    /// Wall-clock time the most recent event finished processing.
    pub last_processed_at: Option<SystemTime>,
}

impl SubscriberStatsSnapshot {
    /// Number of events handled, whatever the outcome.
    pub fn handled(&self) -> u64 {
        self.succeeded + self.failed + self.timed_out + self.panicked
    }
}

#[derive(Debug, Default)]
struct Timing {
    total: Duration,
    last: Duration,
    last_at: Option<SystemTime>,
}

/// Outcome of one handler invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Outcome {
    Success,
    Error,
    Timeout,
    Panic,
}

impl Outcome {
    pub(crate) fn as_label(self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::Error => "error",
            Outcome::Timeout => "timeout",
            Outcome::Panic => "panic",
        }
    }
}

/// Per-subscriber counters, owned by one dispatch wrapper.
#[derive(Debug)]
pub(crate) struct SubscriberStats {
    enabled: bool,
    succeeded: AtomicU64,
    failed: AtomicU64,
    timed_out: AtomicU64,
    panicked: AtomicU64,
    timing: RwLock<Timing>,
}

impl SubscriberStats {
    pub(crate) fn new(enabled: bool) -> Self {
        Self {
            enabled,
            succeeded: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            timed_out: AtomicU64::new(0),
            panicked: AtomicU64::new(0),
            timing: RwLock::new(Timing::default()),
        }
    }

    /// Records one handled event: bumps the outcome counter and accumulates `elapsed`.
    pub(crate) fn record(&self, outcome: Outcome, elapsed: Duration) {
        if !self.enabled {
            return;
        }
        let counter = match outcome {
            Outcome::Success => &self.succeeded,
            Outcome::Error => &self.failed,
            Outcome::Timeout => &self.timed_out,
            Outcome::Panic => &self.panicked,
        };
        counter.fetch_add(1, Ordering::Relaxed);

        let mut timing = self.timing.write();
        timing.total += elapsed;
        timing.last = elapsed;
        timing.last_at = Some(SystemTime::now());
    }

    /// Returns a snapshot; all zero when disabled.
    pub(crate) fn snapshot(&self) -> SubscriberStatsSnapshot {
        if !self.enabled {
            return SubscriberStatsSnapshot::default();
        }
        let timing = self.timing.read();
        SubscriberStatsSnapshot {
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            timed_out: self.timed_out.load(Ordering::Relaxed),
            panicked: self.panicked.load(Ordering::Relaxed),
            total_duration: timing.total,
            last_duration: timing.last,
            last_processed_at: timing.last_at,
        }
    }
}
