//! 认捐数据模型与筹款进度计算

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::app::product::model::Product;
use crate::core::error::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    #[default]
    Card,
    Mobile,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Card => "card",
            PaymentMethod::Mobile => "mobile",
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "card" => Ok(PaymentMethod::Card),
            "mobile" => Ok(PaymentMethod::Mobile),
            other => Err(CoreError::BadRequest(format!("unknown payment method: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PledgeStatus {
    Pending,
    #[default]
    Completed,
    Failed,
}

impl PledgeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PledgeStatus::Pending => "pending",
            PledgeStatus::Completed => "completed",
            PledgeStatus::Failed => "failed",
        }
    }
}

impl FromStr for PledgeStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PledgeStatus::Pending),
            "completed" => Ok(PledgeStatus::Completed),
            "failed" => Ok(PledgeStatus::Failed),
            other => Err(CoreError::BadRequest(format!("unknown pledge status: {other}"))),
        }
    }
}

/// 认捐（支付）记录，只追加不撤销
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pledge {
    pub id: Uuid,
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub amount: f64,
    pub method: PaymentMethod,
    pub status: PledgeStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NewPledge {
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub amount: PledgeAmount,
    pub method: PaymentMethod,
    pub status: PledgeStatus,
}

/// 经过校验的认捐金额：有限且大于 0
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct PledgeAmount(f64);

impl PledgeAmount {
    /// 解析表单输入
    pub fn parse(input: &str) -> Result<Self, CoreError> {
        let value: f64 = input.trim().parse().map_err(|_| CoreError::InvalidAmount)?;
        Self::try_from(value)
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for PledgeAmount {
    type Error = CoreError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if value.is_finite() && value > 0.0 {
            Ok(PledgeAmount(value))
        } else {
            Err(CoreError::InvalidAmount)
        }
    }
}

/// 表单提交的原始金额，可能是数字也可能是文本
///
/// 其他 JSON 值（布尔、null、对象）以及缺失的字段落入 `Other`，
/// 在认证之后统一按 `InvalidAmount` 拒绝。
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum AmountInput {
    Number(f64),
    Text(String),
    Other(serde_json::Value),
}

impl Default for AmountInput {
    fn default() -> Self {
        AmountInput::Other(serde_json::Value::Null)
    }
}

impl AmountInput {
    pub fn validate(&self) -> Result<PledgeAmount, CoreError> {
        match self {
            AmountInput::Number(value) => PledgeAmount::try_from(*value),
            AmountInput::Text(text) => PledgeAmount::parse(text),
            AmountInput::Other(_) => Err(CoreError::InvalidAmount),
        }
    }
}

impl From<f64> for AmountInput {
    fn from(value: f64) -> Self {
        AmountInput::Number(value)
    }
}

impl From<&str> for AmountInput {
    fn from(value: &str) -> Self {
        AmountInput::Text(value.to_string())
    }
}

/// 筹款百分比，始终落在 [0, 100]
///
/// 目标缺失或为 0、已筹为 0 时返回 0；已筹达到目标时恰好为 100。
pub fn compute_progress(goal: Option<f64>, raised: f64) -> f64 {
    let Some(goal) = goal.filter(|g| g.is_finite() && *g > 0.0) else {
        return 0.0;
    };
    if !(raised > 0.0) {
        return 0.0;
    }
    if raised >= goal {
        return 100.0;
    }

    (raised / goal * 100.0).clamp(0.0, 100.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FundingProgress {
    pub goal: Option<f64>,
    pub raised: f64,
    pub percentage: f64,
}

impl FundingProgress {
    pub fn new(goal: Option<f64>, raised: f64) -> Self {
        Self {
            goal,
            raised,
            percentage: compute_progress(goal, raised),
        }
    }

    pub fn for_product(product: &Product) -> Self {
        product.funding_progress()
    }

    /// 进度条上显示的整数百分比，只有达到目标时才显示 100
    pub fn whole_percent(&self) -> u8 {
        self.percentage.floor() as u8
    }

    pub fn goal_reached(&self) -> bool {
        self.percentage >= 100.0
    }
}

/// 认捐回执
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PledgeReceipt {
    pub pledge: Pledge,
    pub product: Product,
    pub progress: FundingProgress,
    /// 产品的累计金额是否已按认捐记录重新计算并保存
    pub funding_synced: bool,
}
