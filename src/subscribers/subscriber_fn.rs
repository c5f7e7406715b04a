//! # Function-backed subscriber (`SubscriberFn`)
//!
//! [`SubscriberFn`] wraps a closure `F: Fn(CancellationToken, Event) -> Fut`, producing a fresh
//! future per event. The closure receives its own clone of the event (the payload is shared,
//! not copied), so the future can be `'static`.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//! use eventvisor::{Event, HandlerError, Subscribe, SubscriberFn};
//!
//! let s: Arc<dyn Subscribe> = SubscriberFn::arc("printer", |_ctx: CancellationToken, ev: Event| async move {
//!     println!("got {}", ev.category);
//!     Ok::<_, HandlerError>(())
//! });
//!
//! assert_eq!(s.id(), "printer");
//! ```

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::HandlerError;
use crate::events::Event;
use crate::subscribers::Subscribe;

/// Function-backed subscriber implementation.
#[derive(Debug)]
pub struct SubscriberFn<F> {
    id: Cow<'static, str>,
    f: F,
}

impl<F> SubscriberFn<F> {
    /// Creates a new function-backed subscriber.
    ///
    /// Prefer [`SubscriberFn::arc`] when you immediately need an `Arc<dyn Subscribe>`.
    pub fn new(id: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self { id: id.into(), f }
    }

    /// Creates the subscriber and returns it as a shared handle.
    pub fn arc(id: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(id, f))
    }
}

#[async_trait]
impl<F, Fut> Subscribe for SubscriberFn<F>
where
    F: Fn(CancellationToken, Event) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
{
    fn id(&self) -> &str {
        &self.id
    }

    async fn handle(&self, ctx: CancellationToken, event: &Event) -> Result<(), HandlerError> {
        (self.f)(ctx, event.clone()).await
    }
}
