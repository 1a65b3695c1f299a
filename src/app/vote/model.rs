//! 投票数据模型与计票规则
//!
//! 每个 (用户, 产品) 最多一张有效票：
//! - 无票时投票：+1 / -1
//! - 重复同向投票视为撤销：-1 / +1
//! - 反向投票视为改票：+2 / -2

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::{error::CoreError, session::Actor};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteType {
    Up,
    Down,
}

impl VoteType {
    /// 一张有效票对票数的贡献
    pub fn weight(self) -> i64 {
        match self {
            VoteType::Up => 1,
            VoteType::Down => -1,
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            VoteType::Up => VoteType::Down,
            VoteType::Down => VoteType::Up,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VoteType::Up => "up",
            VoteType::Down => "down",
        }
    }
}

impl fmt::Display for VoteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VoteType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "up" => Ok(VoteType::Up),
            "down" => Ok(VoteType::Down),
            other => Err(CoreError::BadRequest(format!("unknown vote type: {other}"))),
        }
    }
}

/// 投票记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub id: Uuid,
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub vote_type: VoteType,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewVote {
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub vote_type: VoteType,
}

/// 用户在某产品上的投票状态及显示票数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VoteState {
    pub active: Option<VoteType>,
    pub displayed_count: i64,
}

/// 一次按键对应的持久化动作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteAction {
    Cast(VoteType),
    Retract(VoteType),
    Switch { from: VoteType, to: VoteType },
}

impl VoteAction {
    pub fn delta(self) -> i64 {
        match self {
            VoteAction::Cast(vote_type) => vote_type.weight(),
            VoteAction::Retract(vote_type) => -vote_type.weight(),
            VoteAction::Switch { from, to } => to.weight() - from.weight(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteTransition {
    pub state: VoteState,
    pub delta: i64,
    pub action: VoteAction,
}

impl VoteState {
    pub fn new(active: Option<VoteType>, displayed_count: i64) -> Self {
        Self {
            active,
            displayed_count,
        }
    }

    /// 纯状态转换，不做任何 I/O
    pub fn apply(self, requested: VoteType) -> VoteTransition {
        let (active, action) = match self.active {
            None => (Some(requested), VoteAction::Cast(requested)),
            Some(current) if current == requested => (None, VoteAction::Retract(current)),
            Some(current) => (
                Some(requested),
                VoteAction::Switch {
                    from: current,
                    to: requested,
                },
            ),
        };
        let delta = action.delta();

        VoteTransition {
            state: VoteState {
                active,
                displayed_count: self.displayed_count + delta,
            },
            delta,
            action,
        }
    }
}

/// 带认证前置条件的投票转换；匿名用户不产生任何状态变化
pub fn apply_vote(
    actor: Option<&Actor>,
    state: VoteState,
    requested: VoteType,
) -> Result<VoteTransition, CoreError> {
    actor.ok_or(CoreError::Unauthenticated)?;
    Ok(state.apply(requested))
}

/// 服务端计票：COUNT(up) - COUNT(down)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VoteTally {
    pub up: i64,
    pub down: i64,
}

impl VoteTally {
    pub fn net(&self) -> i64 {
        self.up - self.down
    }
}

/// 投票结果，票数取自存储中的权威值
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteOutcome {
    pub product_id: Uuid,
    pub active: Option<VoteType>,
    pub votes: i64,
    pub delta: i64,
}

impl VoteOutcome {
    pub fn state(&self) -> VoteState {
        VoteState::new(self.active, self.votes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_vote_moves_count_by_one() {
        let up = VoteState::new(None, 10).apply(VoteType::Up);
        assert_eq!(up.state, VoteState::new(Some(VoteType::Up), 11));
        assert_eq!(up.delta, 1);
        assert_eq!(up.action, VoteAction::Cast(VoteType::Up));

        let down = VoteState::new(None, 10).apply(VoteType::Down);
        assert_eq!(down.state, VoteState::new(Some(VoteType::Down), 9));
        assert_eq!(down.delta, -1);
    }

    #[test]
    fn repeating_a_vote_retracts_it() {
        let cast = VoteState::new(None, 10).apply(VoteType::Up);
        let retracted = cast.state.apply(VoteType::Up);
        assert_eq!(retracted.state, VoteState::new(None, 10));
        assert_eq!(retracted.delta, -1);
        assert_eq!(retracted.action, VoteAction::Retract(VoteType::Up));

        let down_retracted = VoteState::new(Some(VoteType::Down), 4).apply(VoteType::Down);
        assert_eq!(down_retracted.delta, 1);
        assert_eq!(down_retracted.state, VoteState::new(None, 5));
    }

    #[test]
    fn opposite_vote_switches_by_two() {
        let cast = VoteState::new(None, 10).apply(VoteType::Up);
        let switched = cast.state.apply(VoteType::Down);
        assert_eq!(switched.state, VoteState::new(Some(VoteType::Down), 9));
        assert_eq!(switched.delta, -2);
        assert_eq!(
            switched.action,
            VoteAction::Switch {
                from: VoteType::Up,
                to: VoteType::Down
            }
        );

        let back = switched.state.apply(VoteType::Up);
        assert_eq!(back.delta, 2);
        assert_eq!(back.state.displayed_count, 11);
    }

    #[test]
    fn anonymous_vote_is_rejected() {
        let result = apply_vote(None, VoteState::new(None, 10), VoteType::Up);
        assert!(matches!(result, Err(CoreError::Unauthenticated)));
    }

    #[test]
    fn signed_in_vote_applies_transition() {
        let actor = Actor::new(Uuid::new_v4());
        let transition = apply_vote(Some(&actor), VoteState::new(None, 0), VoteType::Down).unwrap();
        assert_eq!(transition.state.displayed_count, -1);
    }

    #[test]
    fn vote_type_round_trips_through_text() {
        assert_eq!("up".parse::<VoteType>().unwrap(), VoteType::Up);
        assert_eq!(VoteType::Down.to_string(), "down");
        assert!("sideways".parse::<VoteType>().is_err());
        assert_eq!(VoteType::Up.opposite(), VoteType::Down);
    }
}
