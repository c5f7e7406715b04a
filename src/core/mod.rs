//! Bus core: routing, dispatch and lifecycle.
//!
//! The public API from this module is [`EventBus`] (with [`EventBusBuilder`] and
//! [`BusConfig`]) plus the [`WrapperState`] diagnostic enum.
//!
//! Internal modules:
//! - [`bus`]: registry owner, fan-out publish, two-phase shutdown;
//! - [`wrapper`]: one subscription's mailbox, dispatch task, timeout and panic containment;
//! - [`mailbox`]: bounded or rendezvous non-blocking FIFO;
//! - [`registry`]: category → wrappers table and the closed flag;
//! - [`config`]: immutable bus settings;
//! - [`builder`]: options-style construction.

mod builder;
mod bus;
mod config;
mod mailbox;
mod registry;
mod wrapper;

pub use builder::EventBusBuilder;
pub use bus::EventBus;
pub use config::BusConfig;
pub use wrapper::WrapperState;
