//! # eventvisor
//!
//! **Eventvisor** is a concurrent publish-subscribe event bus for Tokio.
//!
//! Independent components subscribe to named event categories and receive
//! asynchronously dispatched notifications. Every subscription is isolated:
//! it owns a bounded mailbox and a dedicated dispatch task, each event is
//! handled under a timeout, and panics or errors are contained and counted.
//! Shutdown is two-phase and drains what is already queued.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │  publisher   │   │  publisher   │   │  publisher   │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼ publish(Event)   ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  EventBus                                                         │
//! │  - Registry (category → subscriptions, closed flag)               │
//! │  - BusStats (published / delivered / delivery_failed / gauges)    │
//! │  - bus CancellationToken (parent of every subscription token)     │
//! └──────┬──────────────────┬──────────────────┬──────────────────────┘
//!        │ try_send         │ try_send         │ try_send (full → dropped)
//!        ▼                  ▼                  ▼
//!     [mailbox 1]        [mailbox 2]        [mailbox N]
//!        ▼                  ▼                  ▼
//!     dispatch 1         dispatch 2         dispatch N
//!        ▼                  ▼                  ▼
//!     sub1.handle()      sub2.handle()      subN.handle()
//!     (timeout, catch_unwind, SubscriberStats)
//! ```
//!
//! ### Lifecycle
//! ```text
//! EventBus::builder()...build()
//!   ├─► subscribe(category, sub)   → wrapper Created → Running (task spawned)
//!   ├─► publish(event)             → non-blocking fan-out
//!   ├─► unsubscribe(category, id)  → wrapper Draining → Stopped (not awaited)
//!   └─► shutdown(grace)
//!         ├─ close (further calls → BusError::Closed)
//!         ├─ cancel all wrappers  → Draining → Stopped
//!         └─ wait up to grace     → Ok | BusError::GraceExceeded
//! ```
//!
//! ## Features
//! | Area              | Description                                                   | Key types / traits                         |
//! |-------------------|---------------------------------------------------------------|--------------------------------------------|
//! | **Bus**           | Subscribe, publish, unsubscribe, graceful shutdown.           | [`EventBus`], [`EventBusBuilder`]          |
//! | **Subscribers**   | Plug handlers into categories.                                | [`Subscribe`], [`SubscriberFn`]            |
//! | **Events**        | Category-tagged, timestamped, opaque payload.                 | [`Event`], [`Category`]                    |
//! | **Statistics**    | Bus-wide and per-subscriber counters.                         | [`BusStatsSnapshot`], [`SubscriberStatsSnapshot`] |
//! | **Errors**        | Structural bus errors and handler failures.                   | [`BusError`], [`HandlerError`]             |
//! | **Configuration** | Mailbox capacity, per-event timeout, stats on/off.            | [`BusConfig`]                              |
//!
//! ## Optional features
//! - `logging` (default): exports [`LogWriter`], a subscriber that logs every event through `tracing`.
//!
//! ## Delivery policy
//! Delivery is at-most-once and best-effort: a full mailbox drops the event for
//! that subscription and counts it as `delivery_failed`. There is no persistence,
//! no ordering across subscriptions and no transactional publish.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use async_trait::async_trait;
//! use tokio_util::sync::CancellationToken;
//! use eventvisor::{Event, EventBus, HandlerError, Subscribe};
//!
//! struct Audit;
//!
//! #[async_trait]
//! impl Subscribe for Audit {
//!     fn id(&self) -> &str { "audit" }
//!
//!     async fn handle(&self, _ctx: CancellationToken, ev: &Event) -> Result<(), HandlerError> {
//!         println!("audit: {} #{}", ev.category, ev.seq);
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let bus = EventBus::builder()
//!         .mailbox_capacity(64)
//!         .timeout(Duration::from_secs(2))
//!         .build();
//!
//!     bus.subscribe("user.login", Arc::new(Audit))?;
//!     bus.publish(Event::new("user.login").with_payload("alice"))?;
//!
//!     bus.shutdown(Duration::from_secs(5)).await?;
//!     assert_eq!(bus.subscriber_stats("user.login", "audit")?.succeeded, 1);
//!     Ok(())
//! }
//! ```
mod core;
mod error;
mod events;
mod stats;
mod subscribers;

// ---- Public re-exports ----

pub use self::core::{BusConfig, EventBus, EventBusBuilder, WrapperState};
pub use error::{BusError, HandlerError};
pub use events::{Category, Event};
pub use stats::{BusStatsSnapshot, SubscriberStatsSnapshot};
pub use subscribers::{Subscribe, SubscriberFn};

// Optional: a built-in subscriber that logs every event (demo/reference).
// Enabled by default; disable with `default-features = false`.
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
