//! Error types used by the event bus and by subscriber handlers.
//!
//! This module defines two main error enums:
//!
//! - [`BusError`]: structural errors returned synchronously by [`EventBus`](crate::EventBus) operations.
//! - [`HandlerError`]: failures reported by a subscriber while handling one event.
//!
//! Per-event failures never travel back to the publisher: the dispatch wrapper
//! records them in statistics and logs. Both types provide `as_label` for logs/metrics.

use std::time::Duration;
use thiserror::Error;

use crate::events::Category;

/// # Errors produced by the event bus.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BusError {
    /// Shutdown has begun; the bus no longer accepts subscribe/unsubscribe/publish.
    #[error("event bus is closed")]
    Closed,

    /// No subscription for this subscriber id under the given category.
    #[error("subscriber {subscriber:?} not found for category {category}")]
    NotFound {
        /// Category that was looked up.
        category: Category,
        /// Subscriber id that was looked up.
        subscriber: String,
    },

    /// `subscribe` was called outside a Tokio runtime, so no dispatch task could be spawned.
    #[error("no Tokio runtime to run the dispatch task")]
    NoRuntime,

    /// Shutdown deadline elapsed before every dispatch task exited.
    ///
    /// Cancellation was still signaled; the remaining tasks keep draining in the background.
    #[error("shutdown timeout {grace:?} exceeded; still running: {stuck:?}")]
    GraceExceeded {
        /// The deadline given to [`EventBus::shutdown`](crate::EventBus::shutdown).
        grace: Duration,
        /// Ids of subscribers whose dispatch task had not exited yet.
        stuck: Vec<String>,
    },
}

impl BusError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use eventvisor::BusError;
    ///
    /// assert_eq!(BusError::Closed.as_label(), "bus_closed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            BusError::Closed => "bus_closed",
            BusError::NotFound { .. } => "bus_not_found",
            BusError::NoRuntime => "bus_no_runtime",
            BusError::GraceExceeded { .. } => "bus_grace_exceeded",
        }
    }
}

/// # Errors reported by a subscriber handler.
///
/// Returned from [`Subscribe::handle`](crate::Subscribe::handle). The dispatch
/// wrapper classifies them into the per-subscriber counters; nothing is retried.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HandlerError {
    /// Handling failed (counted as an error).
    #[error("handler failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// Handler gave up because its own deadline passed (counted as a timeout).
    ///
    /// Return this when the cancellation token handed to the handler fires
    /// and the work could not complete.
    #[error("handler deadline exceeded")]
    Timeout,
}

impl HandlerError {
    /// Shorthand for [`HandlerError::Fail`] from anything printable.
    ///
    /// # Example
    /// ```
    /// use eventvisor::HandlerError;
    ///
    /// let err = HandlerError::fail("smtp unavailable");
    /// assert_eq!(err.to_string(), "handler failed: smtp unavailable");
    /// ```
    pub fn fail(error: impl std::fmt::Display) -> Self {
        HandlerError::Fail {
            error: error.to_string(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            HandlerError::Fail { .. } => "handler_failed",
            HandlerError::Timeout => "handler_timeout",
        }
    }
}
