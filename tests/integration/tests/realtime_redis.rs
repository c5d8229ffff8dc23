//! Cross-viewer cache sync over Redis Pub/Sub.
//!
//! Requires a running Redis server; skipped when REDIS_URL is not set.
//!
//! Run with: REDIS_URL=redis://127.0.0.1:6379 cargo test -p integration-tests --test realtime_redis

use std::sync::Arc;

use integration_tests::{eventually, test_cache_settings, TestWorld};
use study_cache::{QueryCache, QueryKey, RedisPool, Subscriber, SubscriberConfig};
use study_common::RedisConfig;
use study_service::dto::{CreateInviteRequest, MemberView};
use study_service::{InviteLifecycleController, ServiceContext};

/// A context publishing to Redis plus a subscriber on the invite tables
async fn redis_context(world: &TestWorld) -> Option<(ServiceContext, Subscriber)> {
    let url = std::env::var("REDIS_URL").ok()?;
    let config = RedisConfig {
        url,
        max_connections: 4,
    };
    let pool = RedisPool::from_config(&config).ok()?;
    pool.ping().await.ok()?;
    let subscriber = Subscriber::connect(SubscriberConfig::from(&config)).await.ok()?;

    let ctx = ServiceContext::builder()
        .in_memory(&world.store)
        .clock(Arc::new(world.clock.clone()))
        .redis(pool)
        .build()
        .ok()?;
    Some((ctx, subscriber))
}

#[tokio::test]
async fn test_remote_accept_reaches_admin_through_redis() {
    let world = TestWorld::new();
    let Some((ctx, subscriber)) = redis_context(&world).await else {
        eprintln!("Skipping test: REDIS_URL not set");
        return;
    };
    let user = world.add_user("Rin");

    let admin = InviteLifecycleController::new(
        ctx.clone(),
        world.admin.caller.clone(),
        QueryCache::new(test_cache_settings()),
    );
    admin.follow(subscriber.receiver());
    let viewer = InviteLifecycleController::new(
        ctx,
        user.caller.clone(),
        QueryCache::new(test_cache_settings()),
    );

    let key = QueryKey::GroupMembers(world.group.id);
    assert_eq!(admin.group_members(world.group.id).await.unwrap().len(), 1);
    let _watch = admin.watch(key);

    let created = admin
        .create_invite(CreateInviteRequest::user(world.group.id, user.id()))
        .await
        .unwrap();
    viewer.accept_invite(&created.invite.token).await.unwrap();

    let cache = admin.cache().clone();
    let user_id = user.id();
    assert!(
        eventually(|| {
            cache
                .get::<Vec<MemberView>>(&key)
                .is_some_and(|members| members.iter().any(|m| m.member.user_id == user_id))
        })
        .await
    );
}
