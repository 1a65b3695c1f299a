//! 会话内的乐观投票镜像
//!
//! 按键后立即更新显示状态，远端确认后采用权威票数；
//! 远端失败时回滚到按键前的状态。

use uuid::Uuid;

use super::model::{apply_vote, VoteOutcome, VoteState, VoteType};
use super::service::VoteGateway;
use crate::core::{error::CoreError, session::RequestContext};

/// 一次尚未确认的按键
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingVote {
    pub requested: VoteType,
    pub previous: VoteState,
    pub optimistic: VoteState,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteMirror {
    product_id: Uuid,
    state: VoteState,
}

impl VoteMirror {
    pub fn new(product_id: Uuid, state: VoteState) -> Self {
        Self { product_id, state }
    }

    pub fn product_id(&self) -> Uuid {
        self.product_id
    }

    pub fn state(&self) -> VoteState {
        self.state
    }

    /// 本地应用转换；匿名用户被拒绝且状态不变
    pub fn begin(&mut self, ctx: &RequestContext, requested: VoteType) -> Result<PendingVote, CoreError> {
        let transition = apply_vote(ctx.current_actor(), self.state, requested)?;
        let pending = PendingVote {
            requested,
            previous: self.state,
            optimistic: transition.state,
        };
        self.state = transition.state;
        Ok(pending)
    }

    /// 采用远端结果，或回滚并返回错误
    pub fn settle(
        &mut self,
        pending: PendingVote,
        result: Result<VoteOutcome, CoreError>,
    ) -> Result<VoteState, CoreError> {
        match result {
            Ok(outcome) => {
                self.state = outcome.state();
                Ok(self.state)
            }
            Err(err) => {
                self.state = pending.previous;
                Err(err)
            }
        }
    }

    pub async fn press<G>(
        &mut self,
        gateway: &G,
        ctx: &RequestContext,
        requested: VoteType,
    ) -> Result<VoteState, CoreError>
    where
        G: VoteGateway + ?Sized,
    {
        let pending = self.begin(ctx, requested)?;
        let result = gateway.submit_vote(ctx, self.product_id, requested).await;
        self.settle(pending, result)
    }
}
