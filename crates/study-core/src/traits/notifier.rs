//! Invite notification port (email delivery or similar)

use async_trait::async_trait;

use crate::entities::GroupInvite;
use crate::traits::RepoResult;

/// Sends the invitee a notice that an invite was created
#[async_trait]
pub trait InviteNotifier: Send + Sync {
    async fn invite_created(
        &self,
        invite: &GroupInvite,
        group_name: &str,
        inviter_name: &str,
    ) -> RepoResult<()>;
}

/// Notifier that does nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

#[async_trait]
impl InviteNotifier for NoopNotifier {
    async fn invite_created(
        &self,
        _invite: &GroupInvite,
        _group_name: &str,
        _inviter_name: &str,
    ) -> RepoResult<()> {
        Ok(())
    }
}
