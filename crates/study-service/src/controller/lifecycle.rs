//! Mutation handlers and cached reads for one viewer

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use dashmap::DashSet;
use serde::de::DeserializeOwned;
use study_cache::{
    ChangeSource, Observation, OptimisticUpdate, QueryCache, QueryKey, RealtimeBridge,
};
use study_core::entities::{GroupInvite, GroupSummary, InviteTarget, Profile, StatusCounts};
use study_core::{Caller, InviteStatus, InviteToken, RecordId};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};

use crate::dto::{CreateInviteRequest, CreatedInvite, InviteOutcome, InviteView, MemberView};
use crate::services::{InviteService, ServiceContext, ServiceError, ServiceResult};

use super::feedback::{Feedback, InviteAction};
use super::fetcher::ServiceFetcher;

const FEEDBACK_BUFFER: usize = 64;

/// Keeps one viewer's query cache consistent with server state.
///
/// The controller is the only writer of invite-related partitions. Each
/// mutation snapshots the partitions it predicts, applies the prediction,
/// calls the service, then either invalidates the affected partitions or
/// restores the snapshot. Reads annotate invites with their effective status
/// at read time.
#[derive(Clone)]
pub struct InviteLifecycleController {
    ctx: ServiceContext,
    caller: Caller,
    cache: QueryCache,
    fetcher: Arc<ServiceFetcher>,
    in_flight: Arc<DashSet<InviteToken>>,
    feedback: broadcast::Sender<Feedback>,
}

impl std::fmt::Debug for InviteLifecycleController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InviteLifecycleController")
            .field("caller", &self.caller.user_id)
            .field("in_flight", &self.in_flight.len())
            .finish_non_exhaustive()
    }
}

/// Marks a token busy until dropped
struct InFlight {
    tokens: Arc<DashSet<InviteToken>>,
    token: InviteToken,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.tokens.remove(&self.token);
    }
}

impl InviteLifecycleController {
    /// Create a controller and register it as the cache's refetch source
    pub fn new(ctx: ServiceContext, caller: Caller, cache: QueryCache) -> Self {
        let fetcher = Arc::new(ServiceFetcher::new(ctx.clone(), caller.clone()));
        cache.set_fetcher(fetcher.clone());
        let (feedback, _) = broadcast::channel(FEEDBACK_BUFFER);

        Self {
            ctx,
            caller,
            cache,
            fetcher,
            in_flight: Arc::new(DashSet::new()),
            feedback,
        }
    }

    pub fn caller(&self) -> &Caller {
        &self.caller
    }

    /// Read access to the cache
    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    /// Success and failure messages for every mutation
    pub fn subscribe_feedback(&self) -> broadcast::Receiver<Feedback> {
        self.feedback.subscribe()
    }

    /// Whether the action controls for this token should be disabled
    pub fn is_in_flight(&self, token: &InviteToken) -> bool {
        self.in_flight.contains(token)
    }

    /// Keep a partition refetching in the background while the guard lives
    pub fn watch(&self, key: QueryKey) -> Observation {
        self.cache.observe(key)
    }

    /// Apply realtime change events from a feed to this viewer's cache
    pub fn follow<T: ChangeSource>(&self, feed: broadcast::Receiver<T>) -> JoinHandle<()> {
        RealtimeBridge::new(self.cache.clone()).spawn(feed)
    }

    // ========================================================================
    // Reads
    // ========================================================================

    pub async fn group_invites(&self, group_id: RecordId) -> ServiceResult<Vec<InviteView>> {
        let invites: Vec<GroupInvite> = self.read(QueryKey::GroupInvites(group_id)).await?;
        Ok(InviteView::annotate(invites, self.ctx.now()))
    }

    pub async fn my_invites(&self) -> ServiceResult<Vec<InviteView>> {
        let invites: Vec<GroupInvite> = self.read(QueryKey::MyInvites(self.caller.user_id)).await?;
        Ok(InviteView::annotate(invites, self.ctx.now()))
    }

    pub async fn non_members(&self, group_id: RecordId) -> ServiceResult<Vec<Profile>> {
        self.read(QueryKey::NonMembers(group_id)).await
    }

    pub async fn group_members(&self, group_id: RecordId) -> ServiceResult<Vec<MemberView>> {
        self.read(QueryKey::GroupMembers(group_id)).await
    }

    pub async fn my_groups(&self) -> ServiceResult<Vec<GroupSummary>> {
        self.read(QueryKey::UserGroups(self.caller.user_id)).await
    }

    /// Group invite totals bucketed by effective status
    pub async fn count_by_effective_status(&self, group_id: RecordId) -> ServiceResult<StatusCounts> {
        let invites: Vec<GroupInvite> = self.read(QueryKey::GroupInvites(group_id)).await?;
        Ok(StatusCounts::tally(&invites, self.ctx.now()))
    }

    /// Fresh cached data, or a fetch that refills the cache
    async fn read<T: DeserializeOwned>(&self, key: QueryKey) -> ServiceResult<T> {
        if self.cache.is_fresh(&key) {
            if let Some(data) = self.cache.get(&key) {
                return Ok(data);
            }
        }

        let data = self.fetcher.load(&key).await?;
        self.cache.set_value(key, data.clone());
        serde_json::from_value(data).map_err(|e| ServiceError::internal(e.to_string()))
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    #[instrument(skip(self, request), fields(caller_id = %self.caller.user_id, group_id = %request.group_id))]
    pub async fn create_invite(&self, request: CreateInviteRequest) -> ServiceResult<CreatedInvite> {
        let group_id = request.group_id;
        let non_members = QueryKey::NonMembers(group_id);
        let target = InviteTarget::from_parts(request.invitee_id, request.email.as_deref()).ok();

        let update = OptimisticUpdate::begin(&self.cache, [non_members]);
        if let Some(target) = &target {
            // The candidate is no longer invitable
            update.apply::<Vec<Profile>, _>(&non_members, |profiles| {
                profiles.retain(|p| !p.is_target_of(target));
            });
        }

        let service = InviteService::new(&self.ctx);
        let caller = &self.caller;
        let result = self
            .ctx
            .retry_policy()
            .run(InviteAction::Create.as_str(), || {
                let request = request.clone();
                let service = &service;
                async move { service.create_invite(caller, request).await }
            })
            .await;

        match result {
            Ok(created) => {
                update.commit();

                let mut keys = vec![
                    QueryKey::GroupInvites(group_id),
                    non_members,
                    QueryKey::GroupMembers(group_id),
                ];
                if self.caller.matches_target(&created.invite.target) {
                    keys.push(QueryKey::MyInvites(self.caller.user_id));
                }
                self.invalidate(&keys);

                let mut feedback =
                    Feedback::success(InviteAction::Create, Some(created.invite.token.clone()));
                if let Some(warning) = &created.warning {
                    feedback = feedback.with_warning(warning);
                }
                self.emit(feedback);
                Ok(created)
            }
            Err(e) => {
                self.fail(update, InviteAction::Create, None, &e);
                Err(e)
            }
        }
    }

    pub async fn accept_invite(&self, token: &InviteToken) -> ServiceResult<InviteOutcome> {
        self.transition(InviteAction::Accept, token, InviteStatus::Accepted)
            .await
    }

    pub async fn decline_invite(&self, token: &InviteToken) -> ServiceResult<InviteOutcome> {
        self.transition(InviteAction::Decline, token, InviteStatus::Declined)
            .await
    }

    pub async fn revoke_invite(&self, token: &InviteToken) -> ServiceResult<InviteOutcome> {
        self.transition(InviteAction::Revoke, token, InviteStatus::Revoked)
            .await
    }

    #[instrument(skip(self), fields(caller_id = %self.caller.user_id))]
    pub async fn delete_invite(&self, token: &InviteToken) -> ServiceResult<bool> {
        let _busy = self.claim(InviteAction::Delete, token)?;
        let group_id = self.locate(token).map(|invite| invite.group_id);

        let update = OptimisticUpdate::begin(&self.cache, self.invite_lists(group_id));
        for key in update.keys() {
            update.apply::<Vec<GroupInvite>, _>(key, |invites| {
                invites.retain(|invite| &invite.token != token);
            });
        }

        let service = InviteService::new(&self.ctx);
        let caller = &self.caller;
        let attempts = AtomicU32::new(0);
        let result = self
            .ctx
            .retry_policy()
            .run(InviteAction::Delete.as_str(), || {
                let service = &service;
                attempts.fetch_add(1, Ordering::Relaxed);
                async move { service.delete_invite(caller, token).await }
            })
            .await;

        match result {
            Ok(deleted) => {
                update.commit();
                self.invalidate_after(InviteAction::Delete, group_id);
                // A retry may find the row already removed by the attempt
                // whose reply was lost
                let retried = attempts.load(Ordering::Relaxed) > 1;
                self.emit(if deleted || retried {
                    Feedback::success(InviteAction::Delete, Some(token.clone()))
                } else {
                    Feedback::unchanged(InviteAction::Delete, Some(token.clone()))
                });
                Ok(deleted)
            }
            Err(e) => {
                self.fail(update, InviteAction::Delete, Some(token), &e);
                Err(e)
            }
        }
    }

    #[instrument(skip(self), fields(caller_id = %self.caller.user_id))]
    async fn transition(
        &self,
        action: InviteAction,
        token: &InviteToken,
        to: InviteStatus,
    ) -> ServiceResult<InviteOutcome> {
        let _busy = self.claim(action, token)?;
        let group_id = self.locate(token).map(|invite| invite.group_id);

        let update = OptimisticUpdate::begin(&self.cache, self.invite_lists(group_id));
        for key in update.keys() {
            update.apply::<Vec<GroupInvite>, _>(key, |invites| {
                for invite in invites.iter_mut().filter(|i| &i.token == token) {
                    invite.status = to;
                }
            });
        }

        let service = InviteService::new(&self.ctx);
        let caller = &self.caller;
        let attempts = AtomicU32::new(0);
        let result = self
            .ctx
            .retry_policy()
            .run(action.as_str(), || {
                let service = &service;
                attempts.fetch_add(1, Ordering::Relaxed);
                async move {
                    match to {
                        InviteStatus::Accepted => service.accept_invite(caller, token).await,
                        InviteStatus::Declined => service.decline_invite(caller, token).await,
                        InviteStatus::Revoked => service.revoke_invite(caller, token).await,
                        InviteStatus::Pending => {
                            Err(ServiceError::validation("an invite cannot return to pending"))
                        }
                    }
                }
            })
            .await;

        match result {
            Ok(outcome) => {
                update.commit();
                self.invalidate_after(action, Some(outcome.invite.group_id));
                let attempts = attempts.load(Ordering::Relaxed);
                info!(
                    token = %token,
                    action = action.as_str(),
                    applied = outcome.applied,
                    attempts,
                    "Invite mutation settled"
                );

                // After a retry the target status may have been written by an
                // earlier attempt whose reply was lost
                let landed = outcome.applied || (attempts > 1 && outcome.invite.status == to);
                self.emit(if landed {
                    Feedback::success(action, Some(token.clone()))
                } else {
                    Feedback::unchanged(action, Some(token.clone()))
                });
                Ok(outcome)
            }
            Err(e) => {
                self.fail(update, action, Some(token), &e);
                Err(e)
            }
        }
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    /// Reserve a token for one mutation at a time
    fn claim(&self, action: InviteAction, token: &InviteToken) -> ServiceResult<InFlight> {
        if !self.in_flight.insert(token.clone()) {
            let err = ServiceError::MutationInFlight {
                token: token.clone(),
            };
            self.emit(Feedback::failure(action, Some(token.clone()), &err));
            return Err(err);
        }
        Ok(InFlight {
            tokens: self.in_flight.clone(),
            token: token.clone(),
        })
    }

    /// Find a cached copy of the invite to learn its group
    fn locate(&self, token: &InviteToken) -> Option<GroupInvite> {
        let mine = QueryKey::MyInvites(self.caller.user_id);
        let group_lists = self
            .cache
            .keys()
            .into_iter()
            .filter(|key| matches!(key, QueryKey::GroupInvites(_)));

        std::iter::once(mine)
            .chain(group_lists)
            .filter_map(|key| self.cache.get::<Vec<GroupInvite>>(&key))
            .flatten()
            .find(|invite| &invite.token == token)
    }

    /// Invite lists that may show the token
    fn invite_lists(&self, group_id: Option<RecordId>) -> Vec<QueryKey> {
        let mut keys = vec![QueryKey::MyInvites(self.caller.user_id)];
        if let Some(group_id) = group_id {
            keys.push(QueryKey::GroupInvites(group_id));
        }
        keys
    }

    /// Invalidate the partitions a settled mutation affects
    fn invalidate_after(&self, action: InviteAction, group_id: Option<RecordId>) {
        let me = self.caller.user_id;
        let mut keys = vec![QueryKey::MyInvites(me)];

        match group_id {
            Some(group_id) => {
                keys.push(QueryKey::GroupInvites(group_id));
                keys.push(QueryKey::NonMembers(group_id));
                if action == InviteAction::Accept {
                    keys.push(QueryKey::GroupMembers(group_id));
                    keys.push(QueryKey::UserGroups(me));
                }
            }
            None => {
                self.cache.invalidate_prefix(study_cache::query::GROUP_INVITES_PREFIX);
                self.cache.invalidate_prefix(study_cache::query::NON_MEMBERS_PREFIX);
            }
        }
        self.invalidate(&keys);
    }

    fn invalidate(&self, keys: &[QueryKey]) {
        for key in keys {
            self.cache.invalidate(key);
        }
    }

    /// Roll back, reconcile the touched partitions, and report
    fn fail(
        &self,
        update: OptimisticUpdate,
        action: InviteAction,
        token: Option<&InviteToken>,
        error: &ServiceError,
    ) {
        let touched = update.rollback();
        warn!(
            action = action.as_str(),
            token = token.map(InviteToken::as_str),
            error = %error,
            rolled_back = touched.len(),
            "Invite mutation failed, optimistic update rolled back"
        );
        self.invalidate(&touched);
        self.emit(Feedback::failure(action, token.cloned(), error));
    }

    fn emit(&self, feedback: Feedback) {
        // No listeners is fine
        let _ = self.feedback.send(feedback);
    }
}
