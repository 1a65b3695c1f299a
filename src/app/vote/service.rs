//! 投票业务服务
//!
//! 先写投票记录，再原子地调整产品票数；票数调整失败时补偿投票记录，
//! 保证存储中不会留下与票数不一致的投票。

use async_trait::async_trait;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::model::{apply_vote, NewVote, Vote, VoteAction, VoteOutcome, VoteState, VoteTally, VoteType};
use crate::core::{error::CoreError, session::RequestContext};
use crate::infrastructure::store::{SharedStore, StoreResult};

/// 客户端看到的远端投票接口
#[async_trait]
pub trait VoteGateway: Send + Sync {
    async fn submit_vote(
        &self,
        ctx: &RequestContext,
        product_id: Uuid,
        requested: VoteType,
    ) -> Result<VoteOutcome, CoreError>;
}

#[derive(Clone)]
pub struct VoteService {
    store: SharedStore,
}

impl VoteService {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// 投票、撤销或改票
    pub async fn vote(
        &self,
        ctx: &RequestContext,
        product_id: Uuid,
        requested: VoteType,
    ) -> Result<VoteOutcome, CoreError> {
        let actor = ctx.require_actor()?;
        let product = self.store.read_product(product_id).await?;
        let existing = self.store.find_vote(actor.id, product_id).await?;

        let state = VoteState::new(existing.as_ref().map(|v| v.vote_type), product.votes);
        let transition = apply_vote(Some(actor), state, requested)?;

        let inserted = self
            .record(actor.id, product_id, existing.as_ref(), transition.action)
            .await
            .map_err(CoreError::from_write)?;

        let updated = match self
            .store
            .adjust_product_votes(product_id, transition.delta)
            .await
        {
            Ok(updated) => updated,
            Err(err) => {
                warn!(
                    "产品 {} 票数调整失败，回滚投票记录: {}",
                    product_id, err
                );
                if let Err(undo_err) = self
                    .undo(actor.id, product_id, existing.as_ref(), inserted.as_ref(), transition.action)
                    .await
                {
                    error!(
                        "用户 {} 在产品 {} 上的投票回滚失败: {}",
                        actor.id, product_id, undo_err
                    );
                }
                return Err(CoreError::from_write(err));
            }
        };

        info!(
            "用户 {} 对产品 {} {:?}，票数 {} -> {}",
            actor.id, product_id, transition.action, product.votes, updated.votes
        );

        Ok(VoteOutcome {
            product_id,
            active: transition.state.active,
            votes: updated.votes,
            delta: transition.delta,
        })
    }

    /// 当前用户的投票状态；匿名用户没有有效票
    pub async fn current(&self, ctx: &RequestContext, product_id: Uuid) -> Result<VoteState, CoreError> {
        let product = self.store.read_product(product_id).await?;
        let active = match ctx.current_actor() {
            Some(actor) => self
                .store
                .find_vote(actor.id, product_id)
                .await?
                .map(|v| v.vote_type),
            None => None,
        };

        Ok(VoteState::new(active, product.votes))
    }

    pub async fn tally(&self, product_id: Uuid) -> Result<VoteTally, CoreError> {
        self.store.read_product(product_id).await?;
        Ok(self.store.tally_votes(product_id).await?)
    }

    /// 持久化一次转换，返回新插入的投票（若有）
    async fn record(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        existing: Option<&Vote>,
        action: VoteAction,
    ) -> StoreResult<Option<Vote>> {
        match (action, existing) {
            (VoteAction::Cast(vote_type), _) => {
                let vote = self
                    .store
                    .insert_vote(NewVote {
                        user_id,
                        product_id,
                        vote_type,
                    })
                    .await?;
                Ok(Some(vote))
            }
            (VoteAction::Retract(_), Some(vote)) => {
                self.store.delete_vote(vote.id).await?;
                Ok(None)
            }
            (VoteAction::Switch { to, .. }, Some(vote)) => {
                self.store.update_vote(vote.id, to).await?;
                Ok(None)
            }
            (_, None) => Ok(None),
        }
    }

    /// 补偿 `record` 的写入
    async fn undo(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        existing: Option<&Vote>,
        inserted: Option<&Vote>,
        action: VoteAction,
    ) -> StoreResult<()> {
        match action {
            VoteAction::Cast(_) => match inserted {
                Some(vote) => self.store.delete_vote(vote.id).await,
                None => Ok(()),
            },
            VoteAction::Retract(vote_type) => self
                .store
                .insert_vote(NewVote {
                    user_id,
                    product_id,
                    vote_type,
                })
                .await
                .map(|_| ()),
            VoteAction::Switch { from, .. } => match existing {
                Some(vote) => self.store.update_vote(vote.id, from).await.map(|_| ()),
                None => Ok(()),
            },
        }
    }
}

#[async_trait]
impl VoteGateway for VoteService {
    async fn submit_vote(
        &self,
        ctx: &RequestContext,
        product_id: Uuid,
        requested: VoteType,
    ) -> Result<VoteOutcome, CoreError> {
        self.vote(ctx, product_id, requested).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::app::product::model::NewProduct;
    use crate::core::session::Actor;
    use crate::infrastructure::store::{MemoryStore, RecordStore, StoreOp};

    async fn setup(votes: i64) -> (Arc<MemoryStore>, VoteService, Uuid) {
        let store = Arc::new(MemoryStore::new());
        let product = store
            .insert_product(
                Uuid::new_v4(),
                NewProduct {
                    title: "Teff Yield Tracker".to_string(),
                    description: "harvest reports".to_string(),
                    category: "agritech".to_string(),
                    votes,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let service = VoteService::new(store.clone());
        (store, service, product.id)
    }

    #[tokio::test]
    async fn anonymous_vote_changes_nothing() {
        let (store, service, product_id) = setup(10).await;

        let result = service
            .vote(&RequestContext::anonymous(), product_id, VoteType::Up)
            .await;

        assert!(matches!(result, Err(CoreError::Unauthenticated)));
        assert_eq!(store.read_product(product_id).await.unwrap().votes, 10);
        assert_eq!(store.tally_votes(product_id).await.unwrap(), VoteTally::default());
    }

    #[tokio::test]
    async fn vote_then_toggle_off() {
        let (store, service, product_id) = setup(10).await;
        let actor = Actor::new(Uuid::new_v4());
        let ctx = RequestContext::signed_in(actor);

        let cast = service.vote(&ctx, product_id, VoteType::Up).await.unwrap();
        assert_eq!(cast.votes, 11);
        assert_eq!(cast.active, Some(VoteType::Up));
        assert_eq!(store.vote_records(actor.id, product_id), 1);

        let retracted = service.vote(&ctx, product_id, VoteType::Up).await.unwrap();
        assert_eq!(retracted.votes, 10);
        assert_eq!(retracted.active, None);
        assert_eq!(store.vote_records(actor.id, product_id), 0);
    }

    #[tokio::test]
    async fn switching_moves_by_two() {
        let (store, service, product_id) = setup(10).await;
        let actor = Actor::new(Uuid::new_v4());
        let ctx = RequestContext::signed_in(actor);

        service.vote(&ctx, product_id, VoteType::Up).await.unwrap();
        let switched = service.vote(&ctx, product_id, VoteType::Down).await.unwrap();

        assert_eq!(switched.votes, 9);
        assert_eq!(switched.delta, -2);
        assert_eq!(switched.active, Some(VoteType::Down));
        assert_eq!(store.vote_records(actor.id, product_id), 1);
        assert_eq!(service.tally(product_id).await.unwrap().net(), -1);
    }

    #[tokio::test]
    async fn current_state_reflects_stored_vote() {
        let (_store, service, product_id) = setup(3).await;
        let ctx = RequestContext::signed_in(Actor::new(Uuid::new_v4()));

        service.vote(&ctx, product_id, VoteType::Down).await.unwrap();

        let mine = service.current(&ctx, product_id).await.unwrap();
        assert_eq!(mine, VoteState::new(Some(VoteType::Down), 2));

        let anonymous = service
            .current(&RequestContext::anonymous(), product_id)
            .await
            .unwrap();
        assert_eq!(anonymous, VoteState::new(None, 2));
    }

    #[tokio::test]
    async fn failed_count_update_restores_vote_record() {
        let (store, service, product_id) = setup(10).await;
        let actor = Actor::new(Uuid::new_v4());
        let ctx = RequestContext::signed_in(actor);
        service.vote(&ctx, product_id, VoteType::Up).await.unwrap();

        store.fail_on(StoreOp::AdjustVotes);
        let result = service.vote(&ctx, product_id, VoteType::Down).await;
        assert!(matches!(result, Err(CoreError::WriteFailed(_))));

        // 投票记录回到改票前
        let vote = store.find_vote(actor.id, product_id).await.unwrap().unwrap();
        assert_eq!(vote.vote_type, VoteType::Up);
        assert_eq!(store.read_product(product_id).await.unwrap().votes, 11);

        store.recover(StoreOp::AdjustVotes);
        let retried = service.vote(&ctx, product_id, VoteType::Down).await.unwrap();
        assert_eq!(retried.votes, 9);
    }

    #[tokio::test]
    async fn failed_first_vote_leaves_no_record() {
        let (store, service, product_id) = setup(0).await;
        let actor = Actor::new(Uuid::new_v4());
        let ctx = RequestContext::signed_in(actor);

        store.fail_on(StoreOp::AdjustVotes);
        let result = service.vote(&ctx, product_id, VoteType::Up).await;

        assert!(result.unwrap_err().is_retryable());
        assert_eq!(store.vote_records(actor.id, product_id), 0);
    }

    #[tokio::test]
    async fn failed_retract_reinstates_vote() {
        let (store, service, product_id) = setup(0).await;
        let actor = Actor::new(Uuid::new_v4());
        let ctx = RequestContext::signed_in(actor);
        service.vote(&ctx, product_id, VoteType::Down).await.unwrap();

        store.fail_on(StoreOp::AdjustVotes);
        assert!(service.vote(&ctx, product_id, VoteType::Down).await.is_err());

        let state = service.current(&ctx, product_id).await.unwrap();
        assert_eq!(state, VoteState::new(Some(VoteType::Down), -1));
    }

    #[tokio::test]
    async fn failed_vote_write_touches_nothing() {
        let (store, service, product_id) = setup(5).await;
        let ctx = RequestContext::signed_in(Actor::new(Uuid::new_v4()));

        store.fail_on(StoreOp::InsertVote);
        let result = service.vote(&ctx, product_id, VoteType::Up).await;

        assert!(matches!(result, Err(CoreError::WriteFailed(_))));
        assert_eq!(store.read_product(product_id).await.unwrap().votes, 5);
    }

    #[tokio::test]
    async fn unknown_product_is_not_found() {
        let (_store, service, _) = setup(0).await;
        let ctx = RequestContext::signed_in(Actor::new(Uuid::new_v4()));

        let result = service.vote(&ctx, Uuid::new_v4(), VoteType::Up).await;
        assert!(matches!(result, Err(CoreError::NotFound(_))));
    }
}
