//! Loads cache partitions from the services

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use study_cache::{QueryFetcher, QueryKey};
use study_core::entities::GroupInvite;
use study_core::{Caller, DomainError};

use crate::services::{
    GroupService, InviteService, MemberService, ServiceContext, ServiceError, ServiceResult,
};

/// Fetches partitions as seen by one viewer.
///
/// Invite partitions hold raw invites; effective status is computed on read.
#[derive(Debug, Clone)]
pub struct ServiceFetcher {
    ctx: ServiceContext,
    caller: Caller,
}

impl ServiceFetcher {
    pub fn new(ctx: ServiceContext, caller: Caller) -> Self {
        Self { ctx, caller }
    }

    /// Load a partition, retrying transient failures
    pub async fn load(&self, key: &QueryKey) -> ServiceResult<Value> {
        let operation = key.name();
        self.ctx
            .retry_policy()
            .run(&operation, || self.load_once(key))
            .await
    }

    async fn load_once(&self, key: &QueryKey) -> ServiceResult<Value> {
        let caller = &self.caller;
        match *key {
            QueryKey::GroupInvites(group_id) => {
                let views = InviteService::new(&self.ctx)
                    .get_group_invites(caller, group_id)
                    .await?;
                to_value(views.into_iter().map(GroupInvite::from).collect::<Vec<_>>())
            }
            QueryKey::MyInvites(user_id) => {
                self.require_viewer(key, user_id)?;
                let views = InviteService::new(&self.ctx).get_my_invites(caller).await?;
                to_value(views.into_iter().map(GroupInvite::from).collect::<Vec<_>>())
            }
            QueryKey::NonMembers(group_id) => to_value(
                InviteService::new(&self.ctx)
                    .get_non_members(caller, group_id)
                    .await?,
            ),
            QueryKey::GroupMembers(group_id) => to_value(
                MemberService::new(&self.ctx)
                    .get_group_members(caller, group_id)
                    .await?,
            ),
            QueryKey::UserGroups(user_id) => {
                self.require_viewer(key, user_id)?;
                to_value(GroupService::new(&self.ctx).get_my_groups(caller).await?)
            }
        }
    }

    fn require_viewer(&self, key: &QueryKey, user_id: study_core::RecordId) -> ServiceResult<()> {
        if user_id == self.caller.user_id {
            Ok(())
        } else {
            Err(DomainError::NotAuthorized(format!("{key} belongs to another viewer")).into())
        }
    }
}

fn to_value<T: Serialize>(data: T) -> ServiceResult<Value> {
    serde_json::to_value(data).map_err(|e| ServiceError::internal(e.to_string()))
}

#[async_trait]
impl QueryFetcher for ServiceFetcher {
    async fn fetch(&self, key: &QueryKey) -> Result<Value, DomainError> {
        self.load(key).await.map_err(DomainError::from)
    }
}
