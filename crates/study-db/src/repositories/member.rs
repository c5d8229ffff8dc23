//! PostgreSQL implementation of MemberRepository

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

use study_core::entities::GroupMember;
use study_core::traits::{MemberRepository, RepoResult};
use study_core::value_objects::RecordId;

use crate::mappers::MemberInsert;
use crate::models::MemberModel;

use super::error::{map_db_error, member_not_found};

/// PostgreSQL implementation of MemberRepository
#[derive(Clone)]
pub struct PgMemberRepository {
    pool: PgPool,
}

impl PgMemberRepository {
    /// Create a new PgMemberRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MemberRepository for PgMemberRepository {
    #[instrument(skip(self))]
    async fn find(
        &self,
        group_id: RecordId,
        user_id: RecordId,
    ) -> RepoResult<Option<GroupMember>> {
        let result = sqlx::query_as::<_, MemberModel>(
            r#"
            SELECT group_id, user_id, role, joined_at
            FROM group_members
            WHERE group_id = $1 AND user_id = $2
            "#,
        )
        .bind(group_id.into_inner())
        .bind(user_id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        result.map(GroupMember::try_from).transpose()
    }

    #[instrument(skip(self))]
    async fn find_by_group(&self, group_id: RecordId) -> RepoResult<Vec<GroupMember>> {
        let results = sqlx::query_as::<_, MemberModel>(
            r#"
            SELECT group_id, user_id, role, joined_at
            FROM group_members
            WHERE group_id = $1
            ORDER BY joined_at
            "#,
        )
        .bind(group_id.into_inner())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        results.into_iter().map(GroupMember::try_from).collect()
    }

    #[instrument(skip(self))]
    async fn is_member(&self, group_id: RecordId, user_id: RecordId) -> RepoResult<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM group_members WHERE group_id = $1 AND user_id = $2
            )
            "#,
        )
        .bind(group_id.into_inner())
        .bind(user_id.into_inner())
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(exists)
    }

    #[instrument(skip(self, member), fields(group_id = %member.group_id, user_id = %member.user_id))]
    async fn create(&self, member: &GroupMember) -> RepoResult<bool> {
        let insert = MemberInsert::new(member);
        let result = sqlx::query(
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
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.rows_affected() == 1)
    }

    #[instrument(skip(self))]
    async fn delete(&self, group_id: RecordId, user_id: RecordId) -> RepoResult<()> {
        let result = sqlx::query(
            r#"
            DELETE FROM group_members
            WHERE group_id = $1 AND user_id = $2
            "#,
        )
        .bind(group_id.into_inner())
        .bind(user_id.into_inner())
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            return Err(member_not_found());
        }

        Ok(())
    }
}
