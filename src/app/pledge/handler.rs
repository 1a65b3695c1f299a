//! 认捐处理器

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use uuid::Uuid;

use super::model::{AmountInput, FundingProgress, PaymentMethod, PledgeReceipt};
use crate::app::AppState;
use crate::core::{
    error::CoreError, extract::JsonBody, response::ApiResponse, session::RequestContext,
};

#[derive(Debug, Deserialize)]
pub struct PledgeRequest {
    #[serde(default)]
    pub amount: AmountInput,
    #[serde(default)]
    pub method: PaymentMethod,
}

pub async fn create_pledge(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(product_id): Path<Uuid>,
    body: Result<JsonBody<PledgeRequest>, CoreError>,
) -> Result<(StatusCode, Json<ApiResponse<PledgeReceipt>>), CoreError> {
    // 未登录时先要求登录，再检查请求体
    ctx.require_actor()?;
    let JsonBody(request) = body?;

    let receipt = state
        .pledges
        .record_pledge(&ctx, product_id, request.amount, request.method)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(receipt))))
}

pub async fn funding_progress(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> Result<Json<ApiResponse<FundingProgress>>, CoreError> {
    let progress = state.pledges.funding(product_id).await?;
    Ok(Json(ApiResponse::success(progress)))
}
