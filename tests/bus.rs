use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use eventvisor::{BusConfig, BusError, Event, EventBus, HandlerError, Subscribe, WrapperState};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

fn bus(capacity: usize, timeout: Duration) -> Arc<EventBus> {
    EventBus::builder()
        .mailbox_capacity(capacity)
        .timeout(timeout)
        .build()
}

fn ok() -> Result<(), HandlerError> {
    Ok(())
}

async fn eventually(mut cond: impl FnMut() -> bool) {
    for _ in 0..400 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached");
}

#[tokio::test]
async fn every_subscription_is_either_delivered_or_dropped() {
    let bus = bus(1, Duration::from_secs(1));
    for id in ["a", "b", "c"] {
        bus.subscribe_fn("tick", id, |_ctx: CancellationToken, _ev: Event| async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            ok()
        })
        .unwrap();
    }

    for _ in 0..5 {
        bus.publish(Event::new("tick")).unwrap();
    }

    let s = bus.stats();
    assert_eq!(s.published, 5);
    assert_eq!(s.delivered + s.delivery_failed, 15);
    assert!(s.delivery_failed > 0);

    bus.shutdown(Duration::from_secs(2)).await.unwrap();
    for id in ["a", "b", "c"] {
        let st = bus.subscriber_stats("tick", id).unwrap();
        assert_eq!(st.succeeded, 1, "subscriber {id}");
    }
}

#[tokio::test]
async fn full_mailbox_drops_second_event() {
    let bus = bus(1, Duration::from_secs(1));
    bus.subscribe_fn("a", "only", |_ctx: CancellationToken, _ev: Event| async { ok() })
        .unwrap();

    // The dispatch task has not run yet, so the first event is still queued.
    bus.publish(Event::new("a")).unwrap();
    bus.publish(Event::new("a")).unwrap();

    let s = bus.stats();
    assert_eq!(s.published, 2);
    assert_eq!(s.delivered, 1);
    assert_eq!(s.delivery_failed, 1);

    bus.shutdown(Duration::from_secs(1)).await.unwrap();
    assert_eq!(bus.subscriber_stats("a", "only").unwrap().succeeded, 1);
}

#[tokio::test]
async fn slow_handler_with_capacity_one_drops_second_event() {
    let bus = bus(1, Duration::from_secs(2));
    bus.subscribe_fn("x", "slow", |_ctx: CancellationToken, _ev: Event| async {
        tokio::time::sleep(Duration::from_secs(1)).await;
        ok()
    })
    .unwrap();

    bus.publish(Event::new("x")).unwrap();
    bus.publish(Event::new("x")).unwrap();

    let s = bus.stats();
    assert_eq!(s.published, 2);
    assert_eq!(s.delivered, 1);
    assert_eq!(s.delivery_failed, 1);

    bus.shutdown(Duration::from_secs(5)).await.unwrap();
    assert_eq!(bus.subscriber_stats("x", "slow").unwrap().succeeded, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn slow_handler_with_capacity_one_drops_under_parallel_runtime() {
    let bus = bus(1, Duration::from_secs(2));
    bus.subscribe_fn("x", "slow", |_ctx: CancellationToken, _ev: Event| async {
        tokio::time::sleep(Duration::from_secs(1)).await;
        ok()
    })
    .unwrap();

    // The dispatch task may take one event off the mailbox, the mailbox holds
    // one more, and the handler stays busy for a second: at least one of three
    // back-to-back publishes has nowhere to go.
    for _ in 0..3 {
        bus.publish(Event::new("x")).unwrap();
    }

    let s = bus.stats();
    assert_eq!(s.published, 3);
    assert_eq!(s.delivered + s.delivery_failed, 3);
    assert!(s.delivery_failed >= 1);
    assert!(s.delivered >= 1);

    bus.shutdown(Duration::from_secs(5)).await.unwrap();
    assert_eq!(
        bus.subscriber_stats("x", "slow").unwrap().succeeded,
        s.delivered
    );
}

#[tokio::test]
async fn handler_blocking_past_deadline_counts_as_timeout() {
    let bus = bus(10, Duration::from_millis(20));
    bus.subscribe_fn("b", "blocker", |_ctx: CancellationToken, _ev: Event| async {
        std::thread::sleep(Duration::from_millis(100));
        ok()
    })
    .unwrap();

    bus.publish(Event::new("b")).unwrap();
    bus.shutdown(Duration::from_secs(2)).await.unwrap();

    let st = bus.subscriber_stats("b", "blocker").unwrap();
    assert_eq!(st.timed_out, 1);
    assert_eq!(st.succeeded, 0);
}

#[test]
fn subscribe_without_runtime_is_rejected_cleanly() {
    let bus = bus(10, Duration::from_secs(1));
    let res = bus.subscribe_fn("x", "z", |_ctx: CancellationToken, _ev: Event| async { ok() });
    assert_eq!(res, Err(BusError::NoRuntime));
    assert!(bus.list_subscriptions().is_empty());

    let rt = tokio::runtime::Runtime::new().unwrap();
    rt.block_on(async {
        bus.shutdown(Duration::from_millis(100)).await.unwrap();
    });
}

#[tokio::test]
async fn publish_does_not_wait_for_slow_handlers() {
    let bus = bus(100, Duration::ZERO);
    bus.subscribe_fn("slow", "sleeper", |ctx: CancellationToken, _ev: Event| async move {
        tokio::select! {
            _ = tokio::time::sleep(Duration::from_millis(500)) => {}
            _ = ctx.cancelled() => {}
        }
        ok()
    })
    .unwrap();

    let started = Instant::now();
    for _ in 0..10 {
        bus.publish(Event::new("slow")).unwrap();
    }
    assert!(started.elapsed() < Duration::from_millis(100));
    assert_eq!(bus.stats().delivered, 10);
}

#[tokio::test]
async fn events_are_handled_in_publish_order() {
    let bus = bus(100, Duration::from_secs(1));
    let seen = Arc::new(Mutex::new(Vec::new()));
    let s = seen.clone();
    bus.subscribe_fn("seq", "recorder", move |_ctx: CancellationToken, ev: Event| {
        let s = s.clone();
        async move {
            if let Some(n) = ev.payload::<u32>() {
                s.lock().push((*n, ev.seq));
            }
            ok()
        }
    })
    .unwrap();

    for n in 0..50u32 {
        bus.publish(Event::new("seq").with_payload(n)).unwrap();
    }
    bus.shutdown(Duration::from_secs(2)).await.unwrap();

    let seen = seen.lock();
    let payloads: Vec<u32> = seen.iter().map(|(n, _)| *n).collect();
    assert_eq!(payloads, (0..50).collect::<Vec<_>>());
    assert!(seen.windows(2).all(|w| w[0].1 < w[1].1));
}

#[tokio::test]
async fn panicking_subscriber_does_not_affect_neighbours() {
    const N: u64 = 10;
    let bus = bus(100, Duration::from_secs(1));
    bus.subscribe_fn("x", "bad", |_ctx: CancellationToken, _ev: Event| async {
        if true {
            panic!("subscriber bug");
        }
        ok()
    })
    .unwrap();
    bus.subscribe_fn("x", "failing", |_ctx: CancellationToken, _ev: Event| async {
        Err::<(), _>(HandlerError::fail("nope"))
    })
    .unwrap();
    bus.subscribe_fn("x", "good", |_ctx: CancellationToken, _ev: Event| async { ok() })
        .unwrap();

    for _ in 0..N {
        bus.publish(Event::new("x")).unwrap();
    }
    bus.shutdown(Duration::from_secs(2)).await.unwrap();

    let bad = bus.subscriber_stats("x", "bad").unwrap();
    let failing = bus.subscriber_stats("x", "failing").unwrap();
    let good = bus.subscriber_stats("x", "good").unwrap();
    assert_eq!(bad.panicked, N);
    assert_eq!(failing.failed, N);
    assert_eq!(good.succeeded, N);
    assert_eq!(good.handled(), N);
    assert_eq!(bus.stats().delivered, 3 * N);
}

#[tokio::test]
async fn timeouts_are_counted_and_cancel_the_handler_token() {
    let bus = bus(100, Duration::from_millis(20));
    let cancelled = Arc::new(AtomicUsize::new(0));
    let c = cancelled.clone();
    bus.subscribe_fn("t", "stubborn", move |ctx: CancellationToken, _ev: Event| {
        let c = c.clone();
        async move {
            // Observe the token from outside the handler future, which gets dropped.
            tokio::spawn(async move {
                ctx.cancelled().await;
                c.fetch_add(1, Ordering::SeqCst);
            });
            tokio::time::sleep(Duration::from_secs(10)).await;
            ok()
        }
    })
    .unwrap();

    for _ in 0..3 {
        bus.publish(Event::new("t")).unwrap();
    }
    bus.shutdown(Duration::from_secs(2)).await.unwrap();

    let st = bus.subscriber_stats("t", "stubborn").unwrap();
    assert_eq!(st.timed_out, 3);
    assert_eq!(st.succeeded, 0);
    assert!(st.last_duration >= Duration::from_millis(20));
    assert!(st.last_processed_at.is_some());
    eventually(|| cancelled.load(Ordering::SeqCst) == 3).await;
}

#[tokio::test]
async fn shutdown_drains_queued_events() {
    let bus = bus(10, Duration::from_secs(1));
    let hits = Arc::new(AtomicUsize::new(0));
    let h = hits.clone();
    bus.subscribe_fn("d", "drainer", move |_ctx: CancellationToken, _ev: Event| {
        let h = h.clone();
        async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            h.fetch_add(1, Ordering::SeqCst);
            ok()
        }
    })
    .unwrap();

    for _ in 0..5 {
        bus.publish(Event::new("d")).unwrap();
    }
    bus.shutdown(Duration::from_secs(2)).await.unwrap();

    assert_eq!(hits.load(Ordering::SeqCst), 5);
    assert_eq!(
        bus.subscriber_state("d", "drainer").unwrap(),
        WrapperState::Stopped
    );
}

#[tokio::test]
async fn shutdown_is_idempotent_and_closes_the_bus() {
    let bus = bus(10, Duration::from_secs(1));
    bus.subscribe_fn("a", "one", |_ctx: CancellationToken, _ev: Event| async { ok() })
        .unwrap();

    let (first, second) = tokio::join!(
        bus.shutdown(Duration::from_secs(1)),
        bus.shutdown(Duration::from_secs(1))
    );
    assert!(first.is_ok());
    assert!(second.is_ok());
    assert!(bus.shutdown(Duration::from_secs(1)).await.is_ok());

    assert!(bus.is_closed());
    assert_eq!(bus.publish(Event::new("a")), Err(BusError::Closed));
    assert_eq!(bus.unsubscribe("a", "one"), Err(BusError::Closed));
    let again = bus.subscribe_fn("a", "two", |_ctx: CancellationToken, _ev: Event| async { ok() });
    assert_eq!(again, Err(BusError::Closed));

    // rejected publish is not counted
    assert_eq!(bus.stats().published, 0);
    assert_eq!(bus.list_subscriptions().get("a").unwrap(), &vec!["one"]);
}

#[tokio::test]
async fn grace_exceeded_reports_stuck_subscribers() {
    let bus = bus(10, Duration::ZERO);
    bus.subscribe_fn("s", "stuck", |_ctx: CancellationToken, _ev: Event| async {
        // ignores its token on purpose
        tokio::time::sleep(Duration::from_secs(30)).await;
        ok()
    })
    .unwrap();
    bus.subscribe_fn("s", "quick", |_ctx: CancellationToken, _ev: Event| async { ok() })
        .unwrap();

    bus.publish(Event::new("s")).unwrap();
    eventually(|| bus.subscriber_stats("s", "quick").unwrap().succeeded == 1).await;

    let err = bus.shutdown(Duration::from_millis(50)).await.unwrap_err();
    match err {
        BusError::GraceExceeded { grace, stuck } => {
            assert_eq!(grace, Duration::from_millis(50));
            assert_eq!(stuck, vec!["stuck".to_string()]);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(
        bus.subscriber_state("s", "quick").unwrap(),
        WrapperState::Stopped
    );
    assert_ne!(
        bus.subscriber_state("s", "stuck").unwrap(),
        WrapperState::Stopped
    );
}

#[tokio::test]
async fn rendezvous_mailbox_only_accepts_when_idle() {
    let bus = EventBus::new(BusConfig {
        mailbox_capacity: 0,
        ..BusConfig::default()
    });
    let (release_tx, release_rx) = tokio::sync::watch::channel(false);
    bus.subscribe_fn("r", "gate", move |_ctx: CancellationToken, _ev: Event| {
        let mut release = release_rx.clone();
        async move {
            let _ = release.wait_for(|open| *open).await;
            ok()
        }
    })
    .unwrap();

    // dispatch task has not parked yet
    bus.publish(Event::new("r")).unwrap();
    assert_eq!(bus.stats().delivery_failed, 1);

    tokio::time::sleep(Duration::from_millis(20)).await;
    bus.publish(Event::new("r")).unwrap();
    // handed over; nobody is waiting now
    bus.publish(Event::new("r")).unwrap();

    let s = bus.stats();
    assert_eq!(s.published, 3);
    assert_eq!(s.delivered, 1);
    assert_eq!(s.delivery_failed, 2);

    release_tx.send(true).unwrap();
    bus.shutdown(Duration::from_secs(1)).await.unwrap();
    assert_eq!(bus.subscriber_stats("r", "gate").unwrap().succeeded, 1);
}

#[tokio::test]
async fn unsubscribe_stops_delivery_but_finishes_backlog() {
    let bus = bus(10, Duration::from_secs(1));
    let hits = Arc::new(AtomicUsize::new(0));
    let h = hits.clone();
    bus.subscribe_fn("u", "leaving", move |_ctx: CancellationToken, _ev: Event| {
        let h = h.clone();
        async move {
            h.fetch_add(1, Ordering::SeqCst);
            ok()
        }
    })
    .unwrap();

    bus.publish(Event::new("u")).unwrap();
    bus.publish(Event::new("u")).unwrap();
    bus.unsubscribe("u", "leaving").unwrap();
    assert!(matches!(
        bus.unsubscribe("u", "leaving"),
        Err(BusError::NotFound { .. })
    ));

    bus.publish(Event::new("u")).unwrap();
    eventually(|| hits.load(Ordering::SeqCst) == 2).await;
    assert_eq!(bus.stats().delivered, 2);
    assert!(matches!(
        bus.subscriber_stats("u", "leaving"),
        Err(BusError::NotFound { .. })
    ));

    bus.shutdown(Duration::from_secs(1)).await.unwrap();
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn same_subscriber_registered_twice_gets_two_deliveries() {
    struct Counter(AtomicUsize);

    #[async_trait]
    impl Subscribe for Counter {
        fn id(&self) -> &str {
            "counter"
        }

        async fn handle(&self, _ctx: CancellationToken, _ev: &Event) -> Result<(), HandlerError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    let bus = bus(10, Duration::from_secs(1));
    let counter = Arc::new(Counter(AtomicUsize::new(0)));
    bus.subscribe("dup", counter.clone()).unwrap();
    bus.subscribe("dup", counter.clone()).unwrap();
    assert_eq!(bus.stats().subscribers, 2);
    assert_eq!(bus.stats().categories, 1);

    bus.publish(Event::new("dup")).unwrap();
    bus.unsubscribe("dup", "counter").unwrap();
    assert_eq!(bus.list_subscriptions().get("dup").unwrap(), &vec!["counter"]);

    bus.shutdown(Duration::from_secs(1)).await.unwrap();
    assert_eq!(counter.0.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn dropping_the_bus_stops_dispatch_tasks() {
    struct Flagged(Arc<AtomicBool>);

    impl Drop for Flagged {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl Subscribe for Flagged {
        fn id(&self) -> &str {
            "flagged"
        }

        async fn handle(&self, _ctx: CancellationToken, _ev: &Event) -> Result<(), HandlerError> {
            Ok(())
        }
    }

    let dropped = Arc::new(AtomicBool::new(false));
    let bus = bus(10, Duration::from_secs(1));
    bus.subscribe("x", Arc::new(Flagged(dropped.clone()))).unwrap();
    bus.publish(Event::new("x")).unwrap();
    drop(bus);

    eventually(|| dropped.load(Ordering::SeqCst)).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_publishers_lose_nothing_with_room() {
    let bus = bus(5_000, Duration::from_secs(1));
    let hits = Arc::new(AtomicUsize::new(0));
    let h = hits.clone();
    bus.subscribe_fn("c", "sink", move |_ctx: CancellationToken, _ev: Event| {
        let h = h.clone();
        async move {
            h.fetch_add(1, Ordering::SeqCst);
            ok()
        }
    })
    .unwrap();

    let publishers: Vec<_> = (0..4)
        .map(|_| {
            let bus = bus.clone();
            tokio::spawn(async move {
                for _ in 0..250 {
                    bus.publish(Event::new("c")).unwrap();
                }
            })
        })
        .collect();
    for p in publishers {
        p.await.unwrap();
    }

    bus.shutdown(Duration::from_secs(5)).await.unwrap();
    let s = bus.stats();
    assert_eq!(s.published, 1000);
    assert_eq!(s.delivered, 1000);
    assert_eq!(s.delivery_failed, 0);
    assert_eq!(hits.load(Ordering::SeqCst), 1000);
}

#[tokio::test]
async fn disabled_stats_still_deliver() {
    let bus = EventBus::builder().stats(false).build();
    let hits = Arc::new(AtomicUsize::new(0));
    let h = hits.clone();
    bus.subscribe_fn("q", "quiet", move |_ctx: CancellationToken, _ev: Event| {
        let h = h.clone();
        async move {
            h.fetch_add(1, Ordering::SeqCst);
            ok()
        }
    })
    .unwrap();

    bus.publish(Event::new("q")).unwrap();
    bus.shutdown(Duration::from_secs(1)).await.unwrap();

    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert_eq!(bus.stats().published, 0);
    assert_eq!(bus.subscriber_stats("q", "quiet").unwrap().succeeded, 0);
}
