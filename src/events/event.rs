//! # Events routed through the bus.
//!
//! An [`Event`] is a category tag, a creation timestamp and an optional opaque
//! payload. The bus only ever looks at the [`Category`]; payload contents belong
//! to publishers and subscribers.
//!
//! ## Ordering
//! Each event also carries a globally unique sequence number (`seq`) that grows
//! monotonically. Use it to restore publish order in logs, since deliveries to
//! different subscribers are not ordered.
//!
//! ## Example
//! ```rust
//! use eventvisor::Event;
//!
//! struct Login { user: String }
//!
//! let ev = Event::new("user.login").with_payload(Login { user: "alice".into() });
//!
//! assert_eq!(ev.category.as_str(), "user.login");
//! assert_eq!(ev.payload::<Login>().map(|l| l.user.as_str()), Some("alice"));
//! assert!(ev.payload::<u32>().is_none());
//! ```

use std::any::Any;
use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Routing tag of an event (e.g. `"user.login"`).
///
/// Cheap to clone (`Arc<str>` inside).
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Category(Arc<str>);

impl Category {
    /// Returns the tag as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Category {
    fn from(s: &str) -> Self {
        Self(Arc::from(s))
    }
}

impl From<String> for Category {
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

impl From<&Category> for Category {
    fn from(c: &Category) -> Self {
        c.clone()
    }
}

impl Borrow<str> for Category {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Category {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

/// Immutable, category-tagged, timestamped message.
///
/// - `category`: routing key
/// - `at`: wall-clock creation time
/// - `seq`: monotonic global sequence
/// - payload: optional, type-erased, shared (`Arc`) so fan-out never copies it
#[derive(Clone)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock creation timestamp.
    pub at: SystemTime,
    /// Routing key.
    pub category: Category,

    payload: Option<Arc<dyn Any + Send + Sync>>,
}

impl Event {
    /// Creates an event of the given category stamped with the current time and next sequence number.
    pub fn new(category: impl Into<Category>) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            category: category.into(),
            payload: None,
        }
    }

    /// Attaches an opaque payload.
    #[inline]
    pub fn with_payload<T: Any + Send + Sync>(mut self, payload: T) -> Self {
        self.payload = Some(Arc::new(payload));
        self
    }

    /// Returns the payload if one is attached and it is a `T`.
    #[inline]
    pub fn payload<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.payload.as_deref()?.downcast_ref::<T>()
    }

    /// True if a payload is attached.
    #[inline]
    pub fn has_payload(&self) -> bool {
        self.payload.is_some()
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("seq", &self.seq)
            .field("at", &self.at)
            .field("category", &self.category)
            .field("payload", &self.payload.is_some())
            .finish()
    }
}
