//! 投票处理器

use axum::{
    extract::{Path, State},
    response::Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::model::{VoteOutcome, VoteState, VoteType};
use crate::app::AppState;
use crate::core::{
    error::CoreError, extract::JsonBody, response::ApiResponse, session::RequestContext,
};

#[derive(Debug, Deserialize)]
pub struct VoteRequest {
    #[serde(rename = "type")]
    pub vote_type: VoteType,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TallyView {
    pub up: i64,
    pub down: i64,
    pub net: i64,
}

pub async fn current_vote(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(product_id): Path<Uuid>,
) -> Result<Json<ApiResponse<VoteState>>, CoreError> {
    let vote_state = state.votes.current(&ctx, product_id).await?;
    Ok(Json(ApiResponse::success(vote_state)))
}

pub async fn cast_vote(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(product_id): Path<Uuid>,
    body: Result<JsonBody<VoteRequest>, CoreError>,
) -> Result<Json<ApiResponse<VoteOutcome>>, CoreError> {
    // 未登录时先要求登录，再检查请求体
    ctx.require_actor()?;
    let JsonBody(request) = body?;
    let outcome = state.votes.vote(&ctx, product_id, request.vote_type).await?;
    Ok(Json(ApiResponse::success(outcome)))
}

pub async fn vote_tally(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> Result<Json<ApiResponse<TallyView>>, CoreError> {
    let tally = state.votes.tally(product_id).await?;
    Ok(Json(ApiResponse::success(TallyView {
        up: tally.up,
        down: tally.down,
        net: tally.net(),
    })))
}
