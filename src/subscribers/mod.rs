//! # Event subscribers.
//!
//! This module provides the [`Subscribe`] trait and small built-in implementations
//! for handling events routed by the [`EventBus`](crate::EventBus).
//!
//! ## Architecture
//! ```text
//! Event flow:
//!   publisher ── publish(Event) ──► EventBus ──► mailbox per registration
//!                                                     │
//!                                                     └──► Subscribe::handle(ctx, &Event)
//!                                                               │
//!                                                      ┌────────┼─────────┬───────┐
//!                                                      ▼        ▼         ▼       ▼
//!                                                  LogWriter  SubscriberFn Custom  ...
//! ```
//!
//! ## Subscriber types
//! - [`SubscriberFn`]: closure with an id, handy for tests and glue code
//! - [`LogWriter`]: logs every event through `tracing` (feature `logging`)
//! - anything implementing [`Subscribe`]

#[cfg(feature = "logging")]
mod log;
mod subscriber;
mod subscriber_fn;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use subscriber::Subscribe;
pub use subscriber_fn::SubscriberFn;
