//! # Event subscriber trait.
//!
//! Provides [`Subscribe`], the extension point for plugging event handlers into the bus.
//!
//! Each registration of a subscriber gets:
//! - **Dedicated dispatch task** (runs independently)
//! - **Bounded mailbox** (capacity from [`BusConfig::mailbox_capacity`](crate::BusConfig))
//! - **Per-event timeout** (from [`BusConfig::timeout`](crate::BusConfig))
//! - **Panic isolation** (panics are caught and counted, the task keeps running)
//!
//! ## Architecture
//! ```text
//! EventBus::publish ──► [mailbox] ──► dispatch task ──► subscriber.handle(ctx, &event)
//!                                                  ├─► Ok      → succeeded
//!                                                  ├─► Err     → failed / timed_out
//!                                                  ├─► elapsed → timed_out
//!                                                  └─► panic   → panicked
//! ```
//!
//! ## Rules
//! - A slow subscriber only fills its own mailbox.
//! - A full mailbox drops the event **for this subscriber only**.
//! - Events are handled sequentially (FIFO) per registration.
//!
//! ## Example
//! ```rust
//! use async_trait::async_trait;
//! use tokio_util::sync::CancellationToken;
//! use eventvisor::{Event, HandlerError, Subscribe};
//!
//! struct Audit;
//!
//! #[async_trait]
//! impl Subscribe for Audit {
//!     fn id(&self) -> &str { "audit" }
//!
//!     async fn handle(&self, ctx: CancellationToken, ev: &Event) -> Result<(), HandlerError> {
//!         if ctx.is_cancelled() {
//!             return Err(HandlerError::Timeout);
//!         }
//!         // write an audit record for `ev`...
//!         let _ = ev.category.as_str();
//!         Ok(())
//!     }
//! }
//! ```

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::HandlerError;
use crate::events::Event;

/// Event subscriber.
///
/// ### Implementation requirements
/// - Use async I/O; avoid blocking the executor (a blocked handler cannot be timed out).
/// - Watch `ctx`: it is cancelled when the per-event timeout elapses or the
///   subscription is stopped while the event is in flight.
/// - Report failures through `Err`; panics are contained but discouraged.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Returns the identity used for lookup, unsubscribe and logs.
    fn id(&self) -> &str;

    /// Handles a single event.
    ///
    /// Called from the subscription's dispatch task, never in the publisher context.
    async fn handle(&self, ctx: CancellationToken, event: &Event) -> Result<(), HandlerError>;
}
