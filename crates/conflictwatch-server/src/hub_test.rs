use super::*;

fn parse(text: &str) -> serde_json::Value {
    serde_json::from_str(text).expect("valid json")
}

#[tokio::test]
async fn subscribe_queues_initial_heartbeat_with_count() {
    let hub = Arc::new(BroadcastHub::new(8));
    let _first = hub.subscribe();
    let mut second = hub.subscribe();

    let greeting = parse(&second.recv().await.expect("heartbeat"));
    assert_eq!(greeting["type"], "heartbeat");
    assert_eq!(greeting["data"]["subscribers"], 2);
    assert_eq!(greeting["data"]["status"], "connected");
    assert_eq!(hub.subscriber_count(), 2);
}

#[tokio::test]
async fn publish_reaches_every_subscriber_in_order() {
    let hub = Arc::new(BroadcastHub::new(8));
    let mut a = hub.subscribe();
    let mut b = hub.subscribe();

    hub.publish(&BroadcastMessage::heartbeat(2, CycleStatus::Quiet));
    hub.publish(&BroadcastMessage::heartbeat(2, CycleStatus::Active));

    for sub in [&mut a, &mut b] {
        let _greeting = sub.recv().await;
        let first = parse(&sub.recv().await.expect("first"));
        let second = parse(&sub.recv().await.expect("second"));
        assert_eq!(first["data"]["status"], "quiet");
        assert_eq!(second["data"]["status"], "active");
    }
}

#[tokio::test]
async fn full_subscriber_is_dropped_without_affecting_others() {
    let hub = Arc::new(BroadcastHub::new(2));
    let mut stalled = hub.subscribe();
    let mut healthy = hub.subscribe();

    // The stalled subscriber never reads: greeting + one message fills it.
    let mut last = PublishReport::default();
    for _ in 0..3 {
        let _ = healthy.recv().await;
        last = hub.publish(&BroadcastMessage::heartbeat(2, CycleStatus::Quiet));
    }

    assert_eq!(hub.subscriber_count(), 1);
    assert_eq!(last.delivered, 1);
    assert!(healthy.recv().await.is_some());

    // Whatever was queued before removal drains, then the stream ends.
    while stalled.try_recv().is_some() {}
    assert!(stalled.recv().await.is_none());
}

#[tokio::test]
async fn closed_subscriber_is_removed_and_others_still_receive() {
    let hub = Arc::new(BroadcastHub::new(8));
    let mut broken = hub.subscribe();
    let mut healthy = hub.subscribe();
    broken.rx.close();

    let report = hub.publish(&BroadcastMessage::heartbeat(2, CycleStatus::Quiet));
    assert_eq!(report.delivered, 1);
    assert_eq!(report.dropped, 1);
    assert_eq!(hub.subscriber_count(), 1);

    let _greeting = healthy.recv().await;
    let msg = parse(&healthy.recv().await.expect("delivered"));
    assert_eq!(msg["data"]["status"], "quiet");
}

#[tokio::test]
async fn unsubscribe_is_idempotent() {
    let hub = Arc::new(BroadcastHub::new(8));
    let sub = hub.subscribe();
    let id = sub.id();
    assert!(hub.unsubscribe(id));
    assert!(!hub.unsubscribe(id));
    drop(sub);
    assert_eq!(hub.subscriber_count(), 0);
}

#[tokio::test]
async fn nothing_is_observed_after_close() {
    let hub = Arc::new(BroadcastHub::new(8));
    let mut sub = hub.subscribe();
    hub.publish(&BroadcastMessage::heartbeat(1, CycleStatus::Quiet));

    sub.close();
    hub.publish(&BroadcastMessage::heartbeat(0, CycleStatus::Quiet));

    assert!(sub.try_recv().is_none());
    assert!(sub.recv().await.is_none());
    assert_eq!(hub.subscriber_count(), 0);
}

#[tokio::test]
async fn dropping_subscription_unregisters() {
    let hub = Arc::new(BroadcastHub::new(8));
    for _ in 0..100 {
        let sub = hub.subscribe();
        drop(sub);
    }
    assert_eq!(hub.subscriber_count(), 0);
}

#[tokio::test]
async fn publish_without_subscribers_is_a_no_op() {
    let hub = BroadcastHub::new(8);
    let report = hub.publish(&BroadcastMessage::heartbeat(0, CycleStatus::Quiet));
    assert_eq!(report, PublishReport::default());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_churn_and_publish_is_safe() {
    let hub = Arc::new(BroadcastHub::new(4));

    let churn: Vec<_> = (0..8)
        .map(|_| {
            let hub = Arc::clone(&hub);
            tokio::spawn(async move {
                for _ in 0..50 {
                    let mut sub = hub.subscribe();
                    let _ = sub.try_recv();
                    tokio::task::yield_now().await;
                    sub.close();
                }
            })
        })
        .collect();

    let publisher = {
        let hub = Arc::clone(&hub);
        tokio::spawn(async move {
            for _ in 0..200 {
                hub.publish(&BroadcastMessage::heartbeat(hub.subscriber_count(), CycleStatus::Quiet));
                tokio::task::yield_now().await;
            }
        })
    };

    for handle in churn {
        handle.await.expect("churn task panicked");
    }
    publisher.await.expect("publisher panicked");
    assert_eq!(hub.subscriber_count(), 0);
}
