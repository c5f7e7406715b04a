//! Event data model.
//!
//! ## Contents
//! - [`Category`] routing tag
//! - [`Event`] category + timestamp + sequence + opaque payload
//!
//! Events are created by publishers, shared with every matching subscriber as
//! `Arc<Event>` and never mutated after creation.

mod event;

pub use event::{Category, Event};
