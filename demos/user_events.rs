//! # Example: user_events
//!
//! Walks through the event bus end to end with user-account events.
//!
//! Shows how to:
//! - Build a bus with [`EventBus::builder`].
//! - Implement the [`Subscribe`] trait for a stateful metrics subscriber.
//! - Register closures with [`EventBus::subscribe_fn`] and the built-in [`LogWriter`].
//! - Observe error isolation: a failing subscriber does not affect its neighbours.
//! - Shut down gracefully and read bus-wide and per-subscriber statistics.
//!
//! ## Flow
//! ```text
//! main
//!   ├─► subscribe(user.login,    [log, metrics, audit])
//!   ├─► subscribe(user.logout,   [log, metrics, sessions])
//!   ├─► subscribe(user.register, [metrics, welcome])
//!   ├─► subscribe(config.change, [metrics, config-watcher, flaky])
//!   ├─► publish(...) ──► EventBus ──► mailbox per subscription ──► handle()
//!   └─► shutdown(5s) ──► drain ──► stats
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=info cargo run --example user_events
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use eventvisor::{Event, EventBus, HandlerError, LogWriter, Subscribe};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

const USER_LOGIN: &str = "user.login";
const USER_LOGOUT: &str = "user.logout";
const USER_REGISTER: &str = "user.register";
const USER_UPDATE: &str = "user.update";
const CONFIG_CHANGE: &str = "config.change";

#[derive(Debug)]
struct Login {
    user_id: String,
    ip: String,
}

#[derive(Debug)]
struct Logout {
    user_id: String,
    session_id: String,
}

#[derive(Debug)]
struct Register {
    user_id: String,
    username: String,
    email: String,
}

#[derive(Debug)]
struct ConfigChange {
    key: String,
    old: String,
    new: String,
}

/// Counts events per category.
/// In real life, you could export these to a metrics backend.
#[derive(Default)]
struct Metrics {
    logins: AtomicU64,
    logouts: AtomicU64,
    registrations: AtomicU64,
    updates: AtomicU64,
    config_changes: AtomicU64,
}

#[async_trait]
impl Subscribe for Metrics {
    fn id(&self) -> &str {
        "metrics"
    }

    async fn handle(&self, _ctx: CancellationToken, ev: &Event) -> Result<(), HandlerError> {
        let counter = match ev.category.as_str() {
            USER_LOGIN => &self.logins,
            USER_LOGOUT => &self.logouts,
            USER_REGISTER => &self.registrations,
            USER_UPDATE => &self.updates,
            CONFIG_CHANGE => &self.config_changes,
            other => return Err(HandlerError::fail(format!("unexpected category {other}"))),
        };
        counter.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let bus = EventBus::builder()
        .mailbox_capacity(100)
        .timeout(Duration::from_secs(5))
        .stats(true)
        .build();

    let metrics = Arc::new(Metrics::default());
    let log = Arc::new(LogWriter::new("log"));

    for category in [USER_LOGIN, USER_LOGOUT, USER_REGISTER, USER_UPDATE, CONFIG_CHANGE] {
        bus.subscribe(category, metrics.clone())?;
    }
    bus.subscribe(USER_LOGIN, log.clone())?;
    bus.subscribe(USER_LOGOUT, log)?;

    bus.subscribe_fn(USER_LOGIN, "audit", |_ctx: CancellationToken, ev: Event| async move {
        if let Some(login) = ev.payload::<Login>() {
            println!("[audit] login user={} ip={} seq={}", login.user_id, login.ip, ev.seq);
        }
        Ok::<_, HandlerError>(())
    })?;

    bus.subscribe_fn(USER_LOGOUT, "sessions", |_ctx: CancellationToken, ev: Event| async move {
        if let Some(logout) = ev.payload::<Logout>() {
            println!("[sessions] closing {} for {}", logout.session_id, logout.user_id);
        }
        Ok::<_, HandlerError>(())
    })?;

    bus.subscribe_fn(USER_REGISTER, "welcome", |_ctx: CancellationToken, ev: Event| async move {
        if let Some(reg) = ev.payload::<Register>() {
            println!(
                "[welcome] sending mail to {} <{}> (id={})",
                reg.username, reg.email, reg.user_id
            );
        }
        Ok::<_, HandlerError>(())
    })?;

    bus.subscribe_fn(CONFIG_CHANGE, "config-watcher", |_ctx: CancellationToken, ev: Event| async move {
        if let Some(change) = ev.payload::<ConfigChange>() {
            println!("[config] {}: {} -> {}", change.key, change.old, change.new);
        }
        Ok::<_, HandlerError>(())
    })?;

    // Always fails; the other config.change subscribers are unaffected.
    bus.subscribe_fn(CONFIG_CHANGE, "flaky", |_ctx: CancellationToken, _ev: Event| async move {
        Err::<(), _>(HandlerError::fail("simulated failure"))
    })?;

    println!("subscriptions: {:?}", bus.list_subscriptions());

    for i in 1..=3 {
        bus.publish(Event::new(USER_LOGIN).with_payload(Login {
            user_id: format!("user-{i}"),
            ip: "192.168.1.100".into(),
        }))?;
    }
    bus.publish(Event::new(USER_REGISTER).with_payload(Register {
        user_id: "user-new".into(),
        username: "bob".into(),
        email: "bob@example.com".into(),
    }))?;
    bus.publish(Event::new(USER_UPDATE))?;
    bus.publish(Event::new(USER_LOGOUT).with_payload(Logout {
        user_id: "user-1".into(),
        session_id: "session-456".into(),
    }))?;
    bus.publish(Event::new(CONFIG_CHANGE).with_payload(ConfigChange {
        key: "database.host".into(),
        old: "localhost".into(),
        new: "192.168.1.100".into(),
    }))?;

    // Nobody listens here: counted as published, delivered nowhere.
    bus.publish(Event::new("system.alert"))?;

    bus.shutdown(Duration::from_secs(5)).await?;

    let s = bus.stats();
    println!(
        "[bus] published={} delivered={} failed={} subscribers={} categories={}",
        s.published, s.delivered, s.delivery_failed, s.subscribers, s.categories
    );
    println!(
        "[metrics] login={} logout={} register={} update={} config={}",
        metrics.logins.load(Ordering::Relaxed),
        metrics.logouts.load(Ordering::Relaxed),
        metrics.registrations.load(Ordering::Relaxed),
        metrics.updates.load(Ordering::Relaxed),
        metrics.config_changes.load(Ordering::Relaxed),
    );

    for id in ["config-watcher", "flaky"] {
        let st = bus.subscriber_stats(CONFIG_CHANGE, id)?;
        println!(
            "[{id}] succeeded={} failed={} timed_out={} panicked={} total={:?}",
            st.succeeded, st.failed, st.timed_out, st.panicked, st.total_duration
        );
    }
    Ok(())
}
