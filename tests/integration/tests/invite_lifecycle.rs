//! Invite lifecycle scenarios against the service layer
//!
//! Run with: cargo test -p integration-tests

use chrono::Duration;
use integration_tests::{unique_email, TestWorld};
use study_core::entities::{GroupInvite, InviteTarget};
use study_core::{DomainError, EffectiveStatus, GroupRole, InviteStatus, InviteToken};
use study_service::dto::CreateInviteRequest;
use study_service::{InviteService, MemberService, ServiceError};

fn domain(err: &ServiceError) -> Option<&DomainError> {
    err.as_domain()
}

// ============================================================================
// Creation
// ============================================================================

#[tokio::test]
async fn test_create_accept_joins_group() {
    let world = TestWorld::new();
    let user = world.add_user("Bea");
    let invites = InviteService::new(&world.ctx);

    let created = invites
        .create_invite(
            &world.admin.caller,
            CreateInviteRequest::user(world.group.id, user.id())
                .with_names("Study Group", "Admin"),
        )
        .await
        .unwrap();
    assert!(created.warning.is_none());

    // Candidate with an active invite is not invitable again
    let candidates = invites
        .get_non_members(&world.admin.caller, world.group.id)
        .await
        .unwrap();
    assert!(candidates.iter().all(|p| p.id != user.id()));

    let outcome = invites
        .accept_invite(&user.caller, &created.invite.token)
        .await
        .unwrap();
    assert!(outcome.applied);
    assert_eq!(outcome.invite.status, InviteStatus::Accepted);

    let members = MemberService::new(&world.ctx)
        .get_group_members(&world.admin.caller, world.group.id)
        .await
        .unwrap();
    let joined = members
        .iter()
        .find(|m| m.member.user_id == user.id())
        .unwrap();
    assert_eq!(joined.member.role, GroupRole::Member);
    assert_eq!(
        joined.profile.as_ref().map(|p| p.display_name.as_str()),
        Some("Bea")
    );

    let group_invites = invites
        .get_group_invites(&world.admin.caller, world.group.id)
        .await
        .unwrap();
    assert_eq!(group_invites.len(), 1);
    assert_eq!(group_invites[0].effective_status, EffectiveStatus::Accepted);

    let candidates = invites
        .get_non_members(&world.admin.caller, world.group.id)
        .await
        .unwrap();
    assert!(candidates.iter().all(|p| p.id != user.id()));
}

#[tokio::test]
async fn test_duplicate_email_invite_rejected() {
    let world = TestWorld::new();
    let invites = InviteService::new(&world.ctx);
    let email = unique_email("guest");

    invites
        .create_invite(
            &world.admin.caller,
            CreateInviteRequest::email(world.group.id, email.clone()),
        )
        .await
        .unwrap();

    // Same address with different case is the same recipient
    let err = invites
        .create_invite(
            &world.admin.caller,
            CreateInviteRequest::email(world.group.id, email.to_uppercase()),
        )
        .await
        .unwrap_err();
    assert!(matches!(domain(&err), Some(DomainError::DuplicateInvite)));
    assert!(err.is_conflict());
}

#[tokio::test]
async fn test_outsider_cannot_invite() {
    let world = TestWorld::new();
    let outsider = world.add_user("Cy");
    let user = world.add_user("Dee");

    let err = InviteService::new(&world.ctx)
        .create_invite(
            &outsider.caller,
            CreateInviteRequest::user(world.group.id, user.id()),
        )
        .await
        .unwrap_err();
    assert!(matches!(domain(&err), Some(DomainError::NotGroupMember)));
    assert!(err.is_authorization());
}

#[tokio::test]
async fn test_existing_member_cannot_be_invited() {
    let world = TestWorld::new();
    let member = world.add_member("Cal", GroupRole::Member);

    let err = InviteService::new(&world.ctx)
        .create_invite(
            &world.admin.caller,
            CreateInviteRequest::user(world.group.id, member.id()),
        )
        .await
        .unwrap_err();
    assert!(matches!(domain(&err), Some(DomainError::AlreadyMember)));
}

#[tokio::test]
async fn test_moderator_can_invite_but_not_revoke() {
    let world = TestWorld::new();
    let moderator = world.add_member("Mo", GroupRole::Moderator);
    let user = world.add_user("Eli");
    let invites = InviteService::new(&world.ctx);

    let created = invites
        .create_invite(
            &moderator.caller,
            CreateInviteRequest::user(world.group.id, user.id()),
        )
        .await
        .unwrap();

    let err = invites
        .revoke_invite(&moderator.caller, &created.invite.token)
        .await
        .unwrap_err();
    assert!(err.is_authorization());
}

// ============================================================================
// Expiry
// ============================================================================

#[tokio::test]
async fn test_expiry_boundary_is_exclusive() {
    let world = TestWorld::new();
    let user = world.add_user("Fay");
    let invites = InviteService::new(&world.ctx);

    let expires_at = world.now() + Duration::hours(1);
    let created = invites
        .create_invite(
            &world.admin.caller,
            CreateInviteRequest::user(world.group.id, user.id()).expires_at(expires_at),
        )
        .await
        .unwrap();

    world.clock.set(expires_at);
    let mine = invites.get_my_invites(&user.caller).await.unwrap();
    assert_eq!(mine[0].effective_status, EffectiveStatus::Pending);

    world.clock.advance(Duration::milliseconds(1));
    let mine = invites.get_my_invites(&user.caller).await.unwrap();
    assert_eq!(mine[0].effective_status, EffectiveStatus::Expired);

    let err = invites
        .accept_invite(&user.caller, &created.invite.token)
        .await
        .unwrap_err();
    assert!(err.is_expired());
    assert_eq!(world.store.membership_rows(world.group.id, user.id()), 0);
}

#[tokio::test]
async fn test_invite_expired_an_hour_ago() {
    let world = TestWorld::new();
    let user = world.add_user("Gus");
    let now = world.now();

    let invite = GroupInvite::new(
        world.group.id,
        world.admin.id(),
        InviteTarget::User(user.id()),
        InviteToken::generate(32),
        now - Duration::days(7),
        now - Duration::hours(1),
    );
    world.store.insert_invite(invite.clone());

    let invites = InviteService::new(&world.ctx);
    let mine = invites.get_my_invites(&user.caller).await.unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].effective_status, EffectiveStatus::Expired);
    // Stored status is untouched
    assert_eq!(mine[0].invite.status, InviteStatus::Pending);

    let err = invites
        .accept_invite(&user.caller, &invite.token)
        .await
        .unwrap_err();
    assert!(matches!(domain(&err), Some(DomainError::InviteExpired)));

    let err = invites.validate_invite(&invite.token).await.unwrap_err();
    assert!(err.is_expired());

    // An expired invite no longer blocks a fresh one
    invites
        .create_invite(
            &world.admin.caller,
            CreateInviteRequest::user(world.group.id, user.id()),
        )
        .await
        .unwrap();
}

// ============================================================================
// Terminal transitions
// ============================================================================

#[tokio::test]
async fn test_accept_after_decline_is_already_processed() {
    let world = TestWorld::new();
    let user = world.add_user("Hal");
    let invites = InviteService::new(&world.ctx);

    let created = invites
        .create_invite(
            &world.admin.caller,
            CreateInviteRequest::user(world.group.id, user.id()),
        )
        .await
        .unwrap();
    invites
        .decline_invite(&user.caller, &created.invite.token)
        .await
        .unwrap();

    let err = invites
        .accept_invite(&user.caller, &created.invite.token)
        .await
        .unwrap_err();
    assert!(matches!(
        domain(&err),
        Some(DomainError::AlreadyProcessed {
            status: InviteStatus::Declined
        })
    ));
    assert_eq!(world.store.membership_rows(world.group.id, user.id()), 0);
}

#[tokio::test]
async fn test_revoke_then_accept_is_already_processed() {
    let world = TestWorld::new();
    let user = world.add_user("Ida");
    let invites = InviteService::new(&world.ctx);

    let created = invites
        .create_invite(
            &world.admin.caller,
            CreateInviteRequest::user(world.group.id, user.id()),
        )
        .await
        .unwrap();
    let revoked = invites
        .revoke_invite(&world.admin.caller, &created.invite.token)
        .await
        .unwrap();
    assert!(revoked.applied);

    let err = invites
        .accept_invite(&user.caller, &created.invite.token)
        .await
        .unwrap_err();
    assert!(matches!(
        domain(&err),
        Some(DomainError::AlreadyProcessed {
            status: InviteStatus::Revoked
        })
    ));

    // Revoked links look like they never existed
    let err = invites
        .validate_invite(&created.invite.token)
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    // Back among the candidates
    let candidates = invites
        .get_non_members(&world.admin.caller, world.group.id)
        .await
        .unwrap();
    assert!(candidates.iter().any(|p| p.id == user.id()));
}

#[tokio::test]
async fn test_accept_is_idempotent_and_leaves_my_invites() {
    let world = TestWorld::new();
    let user = world.add_user("Jo");
    let invites = InviteService::new(&world.ctx);

    let created = invites
        .create_invite(
            &world.admin.caller,
            CreateInviteRequest::user(world.group.id, user.id()),
        )
        .await
        .unwrap();

    assert!(invites
        .accept_invite(&user.caller, &created.invite.token)
        .await
        .unwrap()
        .applied);
    assert!(!invites
        .accept_invite(&user.caller, &created.invite.token)
        .await
        .unwrap()
        .applied);

    let mine = invites.get_my_invites(&user.caller).await.unwrap();
    assert!(mine
        .iter()
        .all(|view| view.effective_status != EffectiveStatus::Pending));
    assert_eq!(world.store.membership_rows(world.group.id, user.id()), 1);
}

#[tokio::test]
async fn test_old_invite_is_not_a_way_back_in() {
    let world = TestWorld::new();
    let leaver = world.add_user("Kim");
    let removed = world.add_user("Kye");
    let invites = InviteService::new(&world.ctx);
    let members = MemberService::new(&world.ctx);

    let mut tokens = Vec::new();
    for user in [&leaver, &removed] {
        let created = invites
            .create_invite(
                &world.admin.caller,
                CreateInviteRequest::user(world.group.id, user.id()),
            )
            .await
            .unwrap();
        invites
            .accept_invite(&user.caller, &created.invite.token)
            .await
            .unwrap();
        tokens.push(created.invite.token);
    }

    members.leave_group(&leaver.caller, world.group.id).await.unwrap();
    members
        .remove_member(&world.admin.caller, world.group.id, removed.id())
        .await
        .unwrap();

    for (user, token) in [&leaver, &removed].into_iter().zip(&tokens) {
        let outcome = invites.accept_invite(&user.caller, token).await.unwrap();
        assert!(!outcome.applied);
        assert_eq!(world.store.membership_rows(world.group.id, user.id()), 0);
    }
}

#[tokio::test]
async fn test_concurrent_accept_creates_one_membership() {
    let world = TestWorld::new();
    let user = world.add_user("Kit");
    let invites = InviteService::new(&world.ctx);

    let created = invites
        .create_invite(
            &world.admin.caller,
            CreateInviteRequest::user(world.group.id, user.id()),
        )
        .await
        .unwrap();
    let token = &created.invite.token;

    let (first, second) = tokio::join!(
        invites.accept_invite(&user.caller, token),
        invites.accept_invite(&user.caller, token),
    );
    let first = first.unwrap();
    let second = second.unwrap();

    // Exactly one caller applied the transition
    assert!(first.applied ^ second.applied);
    assert_eq!(world.store.membership_rows(world.group.id, user.id()), 1);
}

#[tokio::test]
async fn test_accept_by_someone_else_is_identity_mismatch() {
    let world = TestWorld::new();
    let user = world.add_user("Lu");
    let stranger = world.add_user("Max");
    let invites = InviteService::new(&world.ctx);

    let created = invites
        .create_invite(
            &world.admin.caller,
            CreateInviteRequest::user(world.group.id, user.id()),
        )
        .await
        .unwrap();

    let err = invites
        .accept_invite(&stranger.caller, &created.invite.token)
        .await
        .unwrap_err();
    assert!(matches!(domain(&err), Some(DomainError::IdentityMismatch)));
}

#[tokio::test]
async fn test_email_invite_accepted_by_verified_address() {
    let world = TestWorld::new();
    let user = world.add_user("Nia");
    let invites = InviteService::new(&world.ctx);

    let created = invites
        .create_invite(
            &world.admin.caller,
            CreateInviteRequest::email(world.group.id, user.email()),
        )
        .await
        .unwrap();

    let mine = invites.get_my_invites(&user.caller).await.unwrap();
    assert_eq!(mine.len(), 1);

    let preview = invites
        .validate_invite(&created.invite.token)
        .await
        .unwrap();
    assert_eq!(preview.group.name, "Study Group");
    assert_eq!(preview.group.member_count, 1);

    invites
        .accept_invite(&user.caller, &created.invite.token)
        .await
        .unwrap();
    assert_eq!(world.store.membership_rows(world.group.id, user.id()), 1);
}

// ============================================================================
// Delete
// ============================================================================

#[tokio::test]
async fn test_delete_requires_terminal_invite() {
    let world = TestWorld::new();
    let user = world.add_user("Oz");
    let invites = InviteService::new(&world.ctx);

    let created = invites
        .create_invite(
            &world.admin.caller,
            CreateInviteRequest::user(world.group.id, user.id()),
        )
        .await
        .unwrap();
    let token = &created.invite.token;

    let err = invites.delete_invite(&user.caller, token).await.unwrap_err();
    assert!(matches!(domain(&err), Some(DomainError::InviteStillPending)));

    invites.decline_invite(&user.caller, token).await.unwrap();
    assert!(invites.delete_invite(&user.caller, token).await.unwrap());
    assert!(!invites.delete_invite(&user.caller, token).await.unwrap());

    assert!(world
        .store
        .invite_row(token)
        .is_some_and(|row| row.is_deleted()));
    assert!(invites.get_my_invites(&user.caller).await.unwrap().is_empty());
}

// ============================================================================
// Authenticated callers
// ============================================================================

#[tokio::test]
async fn test_caller_from_access_token_accepts_email_invite() {
    let world = TestWorld::new();
    let user = world.add_user("Pia");
    let jwt = study_common::JwtService::new("integration-test-secret");
    let invites = InviteService::new(&world.ctx);

    let created = invites
        .create_invite(
            &world.admin.caller,
            CreateInviteRequest::email(world.group.id, user.email()),
        )
        .await
        .unwrap();

    let token = jwt.issue(&user.caller, Duration::minutes(15)).unwrap();
    let caller = jwt.authenticate(&token).unwrap();
    assert_eq!(caller.user_id, user.id());

    invites
        .accept_invite(&caller, &created.invite.token)
        .await
        .unwrap();
    assert_eq!(world.store.membership_rows(world.group.id, user.id()), 1);
}
