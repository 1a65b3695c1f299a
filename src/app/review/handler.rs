//! 评论处理器

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use uuid::Uuid;

use super::model::{RatingBreakdown, Review, ReviewReceipt, SubmitReview};
use crate::app::AppState;
use crate::core::{
    error::CoreError, extract::JsonBody, response::ApiResponse, session::RequestContext,
};

pub async fn list_reviews(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<Review>>>, CoreError> {
    let reviews = state.reviews.list(product_id).await?;
    Ok(Json(ApiResponse::success(reviews)))
}

pub async fn submit_review(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(product_id): Path<Uuid>,
    body: Result<JsonBody<SubmitReview>, CoreError>,
) -> Result<(StatusCode, Json<ApiResponse<ReviewReceipt>>), CoreError> {
    ctx.require_actor()?;
    let JsonBody(request) = body?;

    let receipt = state.reviews.submit(&ctx, product_id, request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(receipt))))
}

pub async fn rating_breakdown(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> Result<Json<ApiResponse<RatingBreakdown>>, CoreError> {
    let breakdown = state.reviews.breakdown(product_id).await?;
    Ok(Json(ApiResponse::success(breakdown)))
}

pub async fn mark_helpful(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(review_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Review>>, CoreError> {
    let review = state.reviews.mark_helpful(&ctx, review_id).await?;
    Ok(Json(ApiResponse::success(review)))
}
