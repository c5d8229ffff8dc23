//! Per-viewer cache behavior: optimistic updates, rollback, realtime
//! invalidation and read-time expiry.
//!
//! Run with: cargo test -p integration-tests

use chrono::Duration;
use integration_tests::{eventually, settle, TestWorld};
use study_cache::QueryKey;
use study_core::entities::{GroupInvite, Profile};
use study_core::{EffectiveStatus, InviteStatus};
use study_service::dto::{CreateInviteRequest, MemberView};
use study_service::{FeedbackKind, InviteAction, RetryPolicy, ServiceError};

// ============================================================================
// Optimistic updates
// ============================================================================

#[tokio::test]
async fn test_create_removes_candidate_from_cached_non_members() {
    let world = TestWorld::new();
    let user = world.add_user("Ada");
    let admin = world.controller_for(&world.admin);
    let key = QueryKey::NonMembers(world.group.id);

    let before = admin.non_members(world.group.id).await.unwrap();
    assert!(before.iter().any(|p| p.id == user.id()));

    admin
        .create_invite(CreateInviteRequest::user(world.group.id, user.id()))
        .await
        .unwrap();

    // Committed optimistic value, marked for reconciliation
    let cached: Vec<Profile> = admin.cache().get(&key).unwrap();
    assert!(cached.iter().all(|p| p.id != user.id()));
    assert!(!admin.cache().is_fresh(&key));

    let after = admin.non_members(world.group.id).await.unwrap();
    assert!(after.iter().all(|p| p.id != user.id()));
}

#[tokio::test]
async fn test_failed_create_restores_candidate() {
    let world = TestWorld::with_retry_policy(RetryPolicy::none());
    let user = world.add_user("Ben");
    let admin = world.controller_for(&world.admin);
    let mut feedback = admin.subscribe_feedback();
    let key = QueryKey::NonMembers(world.group.id);

    admin.non_members(world.group.id).await.unwrap();

    world.store.fail_next(1);
    let err = admin
        .create_invite(CreateInviteRequest::user(world.group.id, user.id()))
        .await
        .unwrap_err();
    assert!(err.is_transient());

    let cached: Vec<Profile> = admin.cache().get(&key).unwrap();
    assert!(cached.iter().any(|p| p.id == user.id()));

    let message = feedback.recv().await.unwrap();
    assert_eq!(message.kind, FeedbackKind::Error);
    assert_eq!(message.action, InviteAction::Create);
}

#[tokio::test]
async fn test_failed_accept_rolls_back_status() {
    let world = TestWorld::with_retry_policy(RetryPolicy::none());
    let user = world.add_user("Cas");
    let admin = world.controller_for(&world.admin);
    let viewer = world.controller_for(&user);
    let key = QueryKey::MyInvites(user.id());

    let created = admin
        .create_invite(CreateInviteRequest::user(world.group.id, user.id()))
        .await
        .unwrap();
    let token = created.invite.token;

    let mine = viewer.my_invites().await.unwrap();
    assert_eq!(mine[0].invite.status, InviteStatus::Pending);

    let mut feedback = viewer.subscribe_feedback();
    world.store.fail_next(1);
    viewer.accept_invite(&token).await.unwrap_err();

    let cached: Vec<GroupInvite> = viewer.cache().get(&key).unwrap();
    assert_eq!(cached[0].status, InviteStatus::Pending);
    assert!(!viewer.is_in_flight(&token));
    assert_eq!(world.store.membership_rows(world.group.id, user.id()), 0);

    let message = feedback.recv().await.unwrap();
    assert_eq!(message.kind, FeedbackKind::Error);
    assert_eq!(message.token.as_ref(), Some(&token));
}

#[tokio::test]
async fn test_second_mutation_on_same_token_is_rejected_while_first_retries() {
    let world = TestWorld::new();
    let user = world.add_user("Dov");
    let admin = world.controller_for(&world.admin);
    let viewer = world.controller_for(&user);

    let created = admin
        .create_invite(CreateInviteRequest::user(world.group.id, user.id()))
        .await
        .unwrap();
    let token = created.invite.token;

    // The first accept parks in a retry backoff, holding the token
    world.store.fail_next(1);
    let (first, second) = tokio::join!(viewer.accept_invite(&token), viewer.decline_invite(&token));

    assert!(first.unwrap().applied);
    assert!(matches!(
        second.unwrap_err(),
        ServiceError::MutationInFlight { .. }
    ));
    assert_eq!(world.store.membership_rows(world.group.id, user.id()), 1);
}

#[tokio::test]
async fn test_already_processed_is_informational() {
    let world = TestWorld::new();
    let user = world.add_user("Eve");
    let admin = world.controller_for(&world.admin);
    let viewer = world.controller_for(&user);

    let created = admin
        .create_invite(CreateInviteRequest::user(world.group.id, user.id()))
        .await
        .unwrap();
    let token = created.invite.token;
    admin.revoke_invite(&token).await.unwrap();

    let mut feedback = viewer.subscribe_feedback();
    let err = viewer.accept_invite(&token).await.unwrap_err();
    assert!(err.is_conflict());

    let message = feedback.recv().await.unwrap();
    assert_eq!(message.kind, FeedbackKind::Info);
    assert_eq!(message.action, InviteAction::Accept);
}

// ============================================================================
// Read-time expiry
// ============================================================================

#[tokio::test]
async fn test_cached_pending_invite_renders_expired_without_refetch() {
    let world = TestWorld::new();
    let user = world.add_user("Fin");
    let admin = world.controller_for(&world.admin);
    let viewer = world.controller_for(&user);
    let key = QueryKey::MyInvites(user.id());

    admin
        .create_invite(
            CreateInviteRequest::user(world.group.id, user.id())
                .expires_at(world.now() + Duration::hours(1)),
        )
        .await
        .unwrap();
    settle().await;

    let mine = viewer.my_invites().await.unwrap();
    assert_eq!(mine[0].effective_status, EffectiveStatus::Pending);
    let cached_at = viewer.cache().entry(&key).unwrap().updated_at;

    world.clock.advance(Duration::hours(2));

    let mine = viewer.my_invites().await.unwrap();
    assert_eq!(mine[0].effective_status, EffectiveStatus::Expired);
    assert_eq!(viewer.cache().entry(&key).unwrap().updated_at, cached_at);
}

#[tokio::test]
async fn test_counts_use_effective_status() {
    let world = TestWorld::new();
    let first = world.add_user("Gil");
    let second = world.add_user("Hana");
    let third = world.add_user("Ivo");
    let admin = world.controller_for(&world.admin);
    let expires_at = world.now() + Duration::hours(1);

    let declined = admin
        .create_invite(CreateInviteRequest::user(world.group.id, first.id()))
        .await
        .unwrap();
    admin
        .create_invite(
            CreateInviteRequest::user(world.group.id, second.id()).expires_at(expires_at),
        )
        .await
        .unwrap();
    admin
        .create_invite(CreateInviteRequest::user(world.group.id, third.id()))
        .await
        .unwrap();

    world
        .controller_for(&first)
        .decline_invite(&declined.invite.token)
        .await
        .unwrap();
    world.clock.advance(Duration::hours(2));

    let counts = admin.count_by_effective_status(world.group.id).await.unwrap();
    assert_eq!(counts.pending, 1);
    assert_eq!(counts.expired, 1);
    assert_eq!(counts.declined, 1);
    assert_eq!(counts.total(), 3);
}

// ============================================================================
// Realtime
// ============================================================================

#[tokio::test]
async fn test_watched_members_refetch_after_remote_accept() {
    let world = TestWorld::new();
    let user = world.add_user("Jin");
    let admin = world.controller_for(&world.admin);
    let viewer = world.controller_for(&user);
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

#[tokio::test]
async fn test_remote_revoke_reaches_watched_invite_list() {
    let world = TestWorld::new();
    let user = world.add_user("Kai");
    let admin = world.controller_for(&world.admin);
    let viewer = world.controller_for(&user);
    let key = QueryKey::MyInvites(user.id());

    let created = admin
        .create_invite(CreateInviteRequest::user(world.group.id, user.id()))
        .await
        .unwrap();

    assert_eq!(viewer.my_invites().await.unwrap().len(), 1);
    let _watch = viewer.watch(key);

    admin.revoke_invite(&created.invite.token).await.unwrap();

    let cache = viewer.cache().clone();
    assert!(
        eventually(|| {
            cache.is_fresh(&key)
                && cache
                    .get::<Vec<GroupInvite>>(&key)
                    .is_some_and(|invites| invites[0].status == InviteStatus::Revoked)
        })
        .await
    );
}

#[tokio::test]
async fn test_unwatched_keys_are_only_marked_stale() {
    let world = TestWorld::new();
    let user = world.add_user("Lev");
    let admin = world.controller_for(&world.admin);
    let viewer = world.controller_for(&user);
    let key = QueryKey::GroupInvites(world.group.id);

    admin.group_invites(world.group.id).await.unwrap();
    let mut updates = admin.cache().subscribe_updates();

    let created = admin
        .create_invite(CreateInviteRequest::user(world.group.id, user.id()))
        .await
        .unwrap();
    viewer.decline_invite(&created.invite.token).await.unwrap();

    let cache = admin.cache().clone();
    assert!(eventually(|| !cache.is_fresh(&key)).await);
    settle().await;
    assert!(updates.try_recv().is_err());

    // Next read reconciles with the store
    let invites = admin.group_invites(world.group.id).await.unwrap();
    assert_eq!(invites[0].effective_status, EffectiveStatus::Declined);
}
