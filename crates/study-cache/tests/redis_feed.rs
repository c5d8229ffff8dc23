//! Change events through a live Redis server
//!
//! These tests require a running Redis server.
//! Set REDIS_URL environment variable before running:
//!
//! ```bash
//! export REDIS_URL="redis://127.0.0.1:6379"
//! cargo test -p study-cache --test redis_feed
//! ```

use std::time::Duration;

use study_cache::{
    QueryCache, QueryCacheSettings, QueryKey, RealtimeBridge, RealtimeChannel, ReceivedChange,
    RedisChangePublisher, RedisPool, Subscriber, SubscriberConfig,
};
use study_common::RedisConfig;
use study_core::events::{ChangeEvent, ChangeKind, INVITES_TABLE};
use study_core::traits::ChangePublisher;
use study_core::RecordId;
use tokio::sync::broadcast;

/// Pool and subscriber against REDIS_URL, or `None` when unavailable
async fn connect() -> Option<(RedisPool, Subscriber)> {
    let url = std::env::var("REDIS_URL").ok()?;
    let config = RedisConfig {
        url,
        max_connections: 4,
    };
    let pool = RedisPool::from_config(&config).ok()?;
    pool.ping().await.ok()?;
    let subscriber = Subscriber::connect(SubscriberConfig::from(&config)).await.ok()?;
    Some((pool, subscriber))
}

fn invite_event(group_id: RecordId) -> ChangeEvent {
    ChangeEvent::new(INVITES_TABLE, ChangeKind::Insert).with_record(serde_json::json!({
        "token": format!("tok-{group_id}"),
        "group_id": group_id,
        "status": "pending",
    }))
}

/// Next change carrying `event`, skipping traffic from parallel tests
async fn receive(rx: &mut broadcast::Receiver<ReceivedChange>, event: &ChangeEvent) -> ReceivedChange {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let change = rx.recv().await.unwrap();
            if change.event.as_ref() == Some(event) {
                return change;
            }
        }
    })
    .await
    .unwrap()
}

#[tokio::test]
async fn test_published_event_reaches_subscriber() {
    let Some((pool, subscriber)) = connect().await else {
        eprintln!("Skipping test: REDIS_URL not set");
        return;
    };
    let mut rx = subscriber.receiver();
    let event = invite_event(RecordId::new_v4());

    RedisChangePublisher::new(pool).publish(event.clone()).await.unwrap();

    let change = receive(&mut rx, &event).await;
    assert_eq!(change.channel, RealtimeChannel::table(INVITES_TABLE));
}

#[tokio::test]
async fn test_redis_feed_invalidates_observed_partition() {
    let Some((pool, subscriber)) = connect().await else {
        eprintln!("Skipping test: REDIS_URL not set");
        return;
    };
    let group_id = RecordId::new_v4();
    let key = QueryKey::GroupInvites(group_id);

    let cache = QueryCache::new(QueryCacheSettings::default());
    cache.set(key, &Vec::<String>::new()).unwrap();
    RealtimeBridge::new(cache.clone()).spawn(subscriber.receiver());

    let mut rx = subscriber.receiver();
    let event = invite_event(group_id);
    RedisChangePublisher::new(pool).publish(event.clone()).await.unwrap();
    receive(&mut rx, &event).await;

    let mut stale = false;
    for _ in 0..100 {
        if !cache.is_fresh(&key) {
            stale = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(stale);
}
