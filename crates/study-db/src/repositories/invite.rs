//! PostgreSQL implementation of InviteRepository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;

use study_core::entities::{GroupInvite, GroupMember};
use study_core::error::DomainError;
use study_core::traits::{InviteRepository, RepoResult};
use study_core::value_objects::{InviteStatus, InviteToken, RecordId};

use crate::mappers::{InviteInsert, MemberInsert};
use crate::models::InviteModel;

use super::error::{invite_not_found, map_db_error, map_unique_violation};

/// PostgreSQL implementation of InviteRepository
#[derive(Clone)]
pub struct PgInviteRepository {
    pool: PgPool,
}

impl PgInviteRepository {
    /// Create a new PgInviteRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn into_invites(rows: Vec<InviteModel>) -> RepoResult<Vec<GroupInvite>> {
    rows.into_iter().map(GroupInvite::try_from).collect()
}

/// Advisory-lock key serializing creation per group and recipient
fn recipient_lock_key(invite: &GroupInvite) -> String {
    match (invite.invitee_id(), invite.email()) {
        (Some(id), _) => format!("invite:{}:user:{id}", invite.group_id),
        (None, Some(email)) => format!("invite:{}:email:{}", invite.group_id, email.to_lowercase()),
        (None, None) => format!("invite:{}", invite.group_id),
    }
}

#[async_trait]
impl InviteRepository for PgInviteRepository {
    #[instrument(skip(self))]
    async fn find_by_token(&self, token: &InviteToken) -> RepoResult<Option<GroupInvite>> {
        let result = sqlx::query_as::<_, InviteModel>(
            r#"
            SELECT id, token, group_id, invited_by, invitee_id, email, status,
                   created_at, expires_at, deleted_at
            FROM group_invites
            WHERE token = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(token.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        result.map(GroupInvite::try_from).transpose()
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, id: RecordId) -> RepoResult<Option<GroupInvite>> {
        let result = sqlx::query_as::<_, InviteModel>(
            r#"
            SELECT id, token, group_id, invited_by, invitee_id, email, status,
                   created_at, expires_at, deleted_at
            FROM group_invites
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        result.map(GroupInvite::try_from).transpose()
    }

    #[instrument(skip(self))]
    async fn find_by_group(&self, group_id: RecordId) -> RepoResult<Vec<GroupInvite>> {
        let results = sqlx::query_as::<_, InviteModel>(
            r#"
            SELECT id, token, group_id, invited_by, invitee_id, email, status,
                   created_at, expires_at, deleted_at
            FROM group_invites
            WHERE group_id = $1 AND deleted_at IS NULL
            ORDER BY created_at DESC
            "#,
        )
        .bind(group_id.into_inner())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        into_invites(results)
    }

    #[instrument(skip(self))]
    async fn find_for_user(
        &self,
        user_id: RecordId,
        email: Option<&str>,
    ) -> RepoResult<Vec<GroupInvite>> {
        let results = sqlx::query_as::<_, InviteModel>(
            r#"
            SELECT id, token, group_id, invited_by, invitee_id, email, status,
                   created_at, expires_at, deleted_at
            FROM group_invites
            WHERE deleted_at IS NULL
              AND (invitee_id = $1 OR ($2::text IS NOT NULL AND lower(email) = lower($2)))
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id.into_inner())
        .bind(email)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        into_invites(results)
    }

    #[instrument(skip(self, invite), fields(token = %invite.token, group_id = %invite.group_id))]
    async fn create_if_no_active(
        &self,
        invite: &GroupInvite,
        now: DateTime<Utc>,
    ) -> RepoResult<()> {
        let insert = InviteInsert::new(invite);
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(recipient_lock_key(invite))
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?;

        let result = sqlx::query(
            r#"
            INSERT INTO group_invites (id, token, group_id, invited_by, invitee_id, email,
                                       status, created_at, expires_at)
            SELECT $1, $2, $3, $4, $5, $6, $7, $8, $9
            WHERE NOT EXISTS (
                SELECT 1 FROM group_invites
                WHERE group_id = $3
                  AND deleted_at IS NULL
                  AND status = 'pending'
                  AND expires_at >= $10
                  AND ((invitee_id IS NOT NULL AND invitee_id = $5)
                    OR (email IS NOT NULL AND lower(email) = lower($6)))
            )
            "#,
        )
        .bind(insert.id)
        .bind(insert.token)
        .bind(insert.group_id)
        .bind(insert.invited_by)
        .bind(insert.invitee_id)
        .bind(insert.email)
        .bind(insert.status)
        .bind(insert.created_at)
        .bind(insert.expires_at)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_unique_violation(e, || DomainError::DuplicateInvite))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::DuplicateInvite);
        }

        tx.commit().await.map_err(map_db_error)?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn transition(
        &self,
        token: &InviteToken,
        to: InviteStatus,
    ) -> RepoResult<Option<GroupInvite>> {
        let result = sqlx::query_as::<_, InviteModel>(
            r#"
            UPDATE group_invites
            SET status = $2
            WHERE token = $1 AND status = 'pending' AND deleted_at IS NULL
            RETURNING id, token, group_id, invited_by, invitee_id, email, status,
                      created_at, expires_at, deleted_at
            "#,
        )
        .bind(token.as_str())
        .bind(to.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        result.map(GroupInvite::try_from).transpose()
    }

    #[instrument(skip(self, member), fields(user_id = %member.user_id))]
    async fn accept(
        &self,
        token: &InviteToken,
        member: &GroupMember,
    ) -> RepoResult<Option<(GroupInvite, bool)>> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        let updated = sqlx::query_as::<_, InviteModel>(
            r#"
            UPDATE group_invites
            SET status = 'accepted'
            WHERE token = $1 AND status = 'pending' AND deleted_at IS NULL
            RETURNING id, token, group_id, invited_by, invitee_id, email, status,
                      created_at, expires_at, deleted_at
            "#,
        )
        .bind(token.as_str())
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_db_error)?;

        // Dropping the transaction rolls it back
        let Some(updated) = updated else {
            return Ok(None);
        };

        let insert = MemberInsert::new(member);
        let joined = sqlx::query(
            r#"
            INSERT INTO group_members (group_id, user_id, role, joined_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (group_id, user_id) DO NOTHING
            "#,
        )
        .bind(insert.group_id)
        .bind(insert.user_id)
        .bind(insert.role)
        .bind(insert.joined_at)
        .execute(&mut *tx)
        .await
        .map_err(map_db_error)?
        .rows_affected()
            == 1;

        tx.commit().await.map_err(map_db_error)?;
        Ok(Some((GroupInvite::try_from(updated)?, joined)))
    }

    #[instrument(skip(self))]
    async fn soft_delete(&self, token: &InviteToken, now: DateTime<Utc>) -> RepoResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE group_invites
            SET deleted_at = $2
            WHERE token = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(token.as_str())
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            return Err(invite_not_found(token));
        }

        Ok(())
    }
}
