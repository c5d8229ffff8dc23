//! PostgreSQL implementation of GroupRepository

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

use study_core::entities::{Group, GroupSummary};
use study_core::traits::{GroupRepository, RepoResult};
use study_core::value_objects::RecordId;

use crate::models::{GroupModel, GroupWithCountModel};

use super::error::map_db_error;

/// PostgreSQL implementation of GroupRepository
#[derive(Clone)]
pub struct PgGroupRepository {
    pool: PgPool,
}

impl PgGroupRepository {
    /// Create a new PgGroupRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GroupRepository for PgGroupRepository {
    #[instrument(skip(self))]
    async fn find_by_id(&self, id: RecordId) -> RepoResult<Option<Group>> {
        let result = sqlx::query_as::<_, GroupModel>(
            r#"
            SELECT id, name, subject, description, avatar_url, owner_id, created_at
            FROM groups
            WHERE id = $1
            "#,
        )
        .bind(id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.map(Group::from))
    }

    #[instrument(skip(self))]
    async fn find_by_user(&self, user_id: RecordId) -> RepoResult<Vec<Group>> {
        let results = sqlx::query_as::<_, GroupModel>(
            r#"
            SELECT g.id, g.name, g.subject, g.description, g.avatar_url, g.owner_id, g.created_at
            FROM groups g
            INNER JOIN group_members m ON m.group_id = g.id
            WHERE m.user_id = $1
            ORDER BY g.name
            "#,
        )
        .bind(user_id.into_inner())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(results.into_iter().map(Group::from).collect())
    }

    #[instrument(skip(self))]
    async fn find_summaries_by_user(&self, user_id: RecordId) -> RepoResult<Vec<GroupSummary>> {
        let results = sqlx::query_as::<_, GroupWithCountModel>(
            r#"
            SELECT g.id, g.name, g.subject, g.description, g.avatar_url, g.owner_id, g.created_at,
                   (SELECT COUNT(*) FROM group_members c WHERE c.group_id = g.id) AS member_count
            FROM groups g
            INNER JOIN group_members m ON m.group_id = g.id
            WHERE m.user_id = $1
            ORDER BY g.name
            "#,
        )
        .bind(user_id.into_inner())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(results.into_iter().map(GroupSummary::from).collect())
    }

    #[instrument(skip(self, group), fields(group_id = %group.id))]
    async fn create(&self, group: &Group) -> RepoResult<()> {
        sqlx::query(
            r#"
            INSERT INTO groups (id, name, subject, description, avatar_url, owner_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(group.id.into_inner())
        .bind(&group.name)
        .bind(&group.subject)
        .bind(&group.description)
        .bind(&group.avatar_url)
        .bind(group.owner_id.into_inner())
        .bind(group.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn member_count(&self, group_id: RecordId) -> RepoResult<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM group_members WHERE group_id = $1
            "#,
        )
        .bind(group_id.into_inner())
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(count)
    }
}
