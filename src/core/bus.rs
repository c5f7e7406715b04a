//! # EventBus: registry owner, fan-out publisher and shutdown coordinator.
//!
//! ## Key responsibilities
//! - keep the category → subscription table ([`Registry`])
//! - create and start one [`SubscriberWrapper`] per `subscribe` call
//! - **fan-out** each published event with non-blocking sends
//! - two-phase graceful shutdown bounded by a caller-supplied grace period
//!
//! ## High-level architecture
//! ```text
//! subscribe(category, sub) ──► Handle::try_current()   (no runtime → NoRuntime, nothing registered)
//!                          ──► SubscriberWrapper::new(sub, bus_token.child_token())
//!                                 └─► wrapper.start(handle) (spawn dispatch task) ─► registry.insert()
//!
//! publish(event):
//!   registry.read() ─► wrappers for event.category
//!        ├──► wrapper1.send() ─► [mailbox 1] ─► dispatch 1 ─► sub1.handle()
//!        ├──► wrapper2.send() ─► [mailbox 2] ─► dispatch 2 ─► sub2.handle()
//!        └──► wrapperN.send() ─► full/closed ─► delivery_failed += 1 (dropped)
//!
//! shutdown(grace):
//!   1. registry.write().close()          (subscribe/unsubscribe/publish → Closed)
//!   2. bus_token.cancel()                (propagates to every wrapper token)
//!   3. timeout(grace, join_all(wrapper.wait()))
//!         ├─ Ok      → Ok(())
//!         └─ elapsed → Err(GraceExceeded { stuck })   (tasks keep draining)
//! ```
//!
//! ## Rules
//! - `publish` never waits for a handler; a full mailbox drops the event for that subscriber.
//! - The closed flag lives inside the registry lock, so a check and the following
//!   mutation can never interleave with shutdown.
//! - Per-event failures never reach the publisher; they show up in statistics and logs.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//! use eventvisor::{Event, EventBus, HandlerError};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let bus = EventBus::builder()
//!         .mailbox_capacity(16)
//!         .timeout(Duration::from_secs(1))
//!         .build();
//!
//!     bus.subscribe_fn("user.login", "greeter", |_ctx: CancellationToken, ev: Event| async move {
//!         println!("welcome back ({})", ev.category);
//!         Ok::<_, HandlerError>(())
//!     })?;
//!
//!     bus.publish(Event::new("user.login"))?;
//!     bus.shutdown(Duration::from_secs(5)).await?;
//!
//!     assert_eq!(bus.stats().published, 1);
//!     Ok(())
//! }
//! ```

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::runtime::Handle;
use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::core::builder::EventBusBuilder;
use crate::core::config::BusConfig;
use crate::core::registry::Registry;
use crate::core::wrapper::{SubscriberWrapper, WrapperState};
use crate::error::{BusError, HandlerError};
use crate::events::{Category, Event};
use crate::stats::{BusStats, BusStatsSnapshot, SubscriberStatsSnapshot};
use crate::subscribers::{Subscribe, SubscriberFn};

/// Publish-subscribe event bus with per-subscriber dispatch tasks.
///
/// Create it with [`EventBus::new`] or [`EventBus::builder`], share it (usually as
/// `Arc<EventBus>`) with publishers, and call [`EventBus::shutdown`] before exit.
/// Dropping the bus without shutdown cancels every dispatch task; they still drain
/// their mailboxes in the background.
pub struct EventBus {
    cfg: BusConfig,
    /// Parent of every wrapper token.
    token: CancellationToken,
    registry: RwLock<Registry>,
    stats: BusStats,
}

impl EventBus {
    /// Creates a bus with the given configuration.
    pub fn new(cfg: BusConfig) -> Self {
        let stats = BusStats::new(cfg.enable_stats);
        Self {
            cfg,
            token: CancellationToken::new(),
            registry: RwLock::new(Registry::new()),
            stats,
        }
    }

    /// Starts building a bus from the default configuration.
    pub fn builder() -> EventBusBuilder {
        EventBusBuilder::new()
    }

    /// Configuration the bus was built with.
    pub fn config(&self) -> &BusConfig {
        &self.cfg
    }

    /// True once [`shutdown`](Self::shutdown) has begun.
    pub fn is_closed(&self) -> bool {
        self.registry.read().is_closed()
    }

    /// Registers `subscriber` for `category` and starts its dispatch task.
    ///
    /// Every call creates an independent subscription with its own mailbox, even
    /// for an id already registered under the same category.
    ///
    /// The dispatch task is spawned on the Tokio runtime of the caller.
    ///
    /// # Errors
    /// - [`BusError::Closed`] once shutdown has begun
    /// - [`BusError::NoRuntime`] when called outside a Tokio runtime (nothing is registered)
    pub fn subscribe(
        &self,
        category: impl Into<Category>,
        subscriber: Arc<dyn Subscribe>,
    ) -> Result<(), BusError> {
        let runtime = Handle::try_current().map_err(|_| BusError::NoRuntime)?;
        let category = category.into();
        let mut reg = self.registry.write();
        if reg.is_closed() {
            return Err(BusError::Closed);
        }

        let wrapper = Arc::new(SubscriberWrapper::new(
            subscriber,
            category.clone(),
            &self.cfg,
            self.token.child_token(),
        ));
        wrapper.start(&runtime);
        reg.insert(Arc::clone(&wrapper));
        self.update_counts(&reg);
        drop(reg);

        tracing::info!(subscriber = wrapper.id(), category = %category, "subscribed");
        Ok(())
    }

    /// Registers a closure as subscriber `id` for `category`.
    ///
    /// Shorthand for `subscribe(category, SubscriberFn::arc(id, f))`.
    pub fn subscribe_fn<F, Fut>(
        &self,
        category: impl Into<Category>,
        id: impl Into<std::borrow::Cow<'static, str>>,
        f: F,
    ) -> Result<(), BusError>
    where
        F: Fn(CancellationToken, Event) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        self.subscribe(category, SubscriberFn::arc(id, f))
    }

    /// Removes the first subscription of `id` under `category` and signals it to stop.
    ///
    /// Does not wait: the dispatch task finishes its in-flight event and drains its
    /// mailbox in the background.
    ///
    /// # Errors
    /// - [`BusError::Closed`] once shutdown has begun
    /// - [`BusError::NotFound`] if no such subscription exists
    pub fn unsubscribe(&self, category: &str, id: &str) -> Result<(), BusError> {
        let mut reg = self.registry.write();
        if reg.is_closed() {
            return Err(BusError::Closed);
        }

        let Some(wrapper) = reg.remove(category, id) else {
            return Err(not_found(category, id));
        };
        wrapper.stop();
        self.update_counts(&reg);
        drop(reg);

        tracing::info!(subscriber = id, category, "unsubscribed");
        Ok(())
    }

    /// Offers `event` to every subscription of its category without waiting.
    ///
    /// A subscription whose mailbox is full, or that is already stopping, loses
    /// the event (counted in `delivery_failed`). The result does not tell partial
    /// from full delivery; consult [`stats`](Self::stats) for that.
    ///
    /// # Errors
    /// [`BusError::Closed`] once shutdown has begun.
    pub fn publish(&self, event: impl Into<Arc<Event>>) -> Result<(), BusError> {
        let event = event.into();
        let reg = self.registry.read();
        if reg.is_closed() {
            return Err(BusError::Closed);
        }
        self.stats.inc_published();

        let Some(wrappers) = reg.get(event.category.as_str()) else {
            tracing::debug!(category = %event.category, seq = event.seq, "no subscribers for category");
            return Ok(());
        };

        let mut delivered = 0usize;
        for wrapper in wrappers {
            match wrapper.send(&event) {
                Ok(()) => {
                    delivered += 1;
                    self.stats.inc_delivered();
                }
                Err(reason) => {
                    self.stats.inc_delivery_failed();
                    tracing::warn!(
                        subscriber = wrapper.id(),
                        category = %event.category,
                        seq = event.seq,
                        reason = reason.as_label(),
                        "event dropped for subscriber"
                    );
                }
            }
        }

        tracing::debug!(
            category = %event.category,
            seq = event.seq,
            delivered,
            total = wrappers.len(),
            "event published"
        );
        Ok(())
    }

    /// Stops the bus: closes it, cancels every dispatch task and waits up to `grace`
    /// for all of them to drain and exit.
    ///
    /// Idempotent: only the first call does anything, later calls return `Ok(())`.
    ///
    /// # Errors
    /// [`BusError::GraceExceeded`] if some dispatch tasks were still running when
    /// `grace` elapsed. They are not killed and keep draining in the background.
    pub async fn shutdown(&self, grace: Duration) -> Result<(), BusError> {
        let wrappers = {
            let mut reg = self.registry.write();
            if !reg.close() {
                return Ok(());
            }
            reg.wrappers()
        };

        tracing::info!(subscriptions = wrappers.len(), ?grace, "event bus shutting down");
        self.token.cancel();

        let all_stopped = futures::future::join_all(wrappers.iter().map(|w| w.wait()));
        match time::timeout(grace, all_stopped).await {
            Ok(_) => {
                tracing::info!("event bus stopped");
                Ok(())
            }
            Err(_elapsed) => {
                let stuck: Vec<String> = wrappers
                    .iter()
                    .filter(|w| !w.is_stopped())
                    .map(|w| w.id().to_string())
                    .collect();
                tracing::warn!(?grace, ?stuck, "event bus shutdown exceeded grace period");
                Err(BusError::GraceExceeded { grace, stuck })
            }
        }
    }

    /// Point-in-time copy of bus-wide counters (zero when statistics are disabled).
    pub fn stats(&self) -> BusStatsSnapshot {
        self.stats.snapshot()
    }

    /// Counters of the first subscription of `id` under `category`.
    ///
    /// Still available after shutdown.
    ///
    /// # Errors
    /// [`BusError::NotFound`] if no such subscription exists.
    pub fn subscriber_stats(
        &self,
        category: &str,
        id: &str,
    ) -> Result<SubscriberStatsSnapshot, BusError> {
        self.registry
            .read()
            .find(category, id)
            .map(|w| w.stats())
            .ok_or_else(|| not_found(category, id))
    }

    /// Lifecycle state of the first subscription of `id` under `category`.
    ///
    /// # Errors
    /// [`BusError::NotFound`] if no such subscription exists.
    pub fn subscriber_state(&self, category: &str, id: &str) -> Result<WrapperState, BusError> {
        self.registry
            .read()
            .find(category, id)
            .map(|w| w.state())
            .ok_or_else(|| not_found(category, id))
    }

    /// Category → subscriber ids in registration order (diagnostics).
    pub fn list_subscriptions(&self) -> BTreeMap<Category, Vec<String>> {
        self.registry.read().list()
    }

    fn update_counts(&self, reg: &Registry) {
        let (subscribers, categories) = reg.counts();
        self.stats.set_counts(subscribers, categories);
    }
}

impl Drop for EventBus {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

fn not_found(category: &str, id: &str) -> BusError {
    BusError::NotFound {
        category: Category::from(category),
        subscriber: id.to_string(),
    }
}
