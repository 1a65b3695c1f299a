//! 产品处理器

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use uuid::Uuid;

use super::model::{MarketStats, NewProduct, ProductQuery, ProductView};
use crate::app::AppState;
use crate::core::{
    error::CoreError, extract::JsonBody, response::ApiResponse, session::RequestContext,
};

pub async fn list_products(
    State(state): State<AppState>,
    ctx: RequestContext,
    Query(query): Query<ProductQuery>,
) -> Result<Json<ApiResponse<Vec<ProductView>>>, CoreError> {
    let products = state.products.list(&ctx, &query).await?;
    Ok(Json(ApiResponse::success(products)))
}

pub async fn create_product(
    State(state): State<AppState>,
    ctx: RequestContext,
    body: Result<JsonBody<NewProduct>, CoreError>,
) -> Result<(StatusCode, Json<ApiResponse<ProductView>>), CoreError> {
    ctx.require_actor()?;
    let JsonBody(payload) = body?;

    let product = state.products.create(&ctx, payload).await?;
    let view = ProductView::localized(&product, ctx.language);
    Ok((StatusCode::CREATED, Json(ApiResponse::success(view))))
}

pub async fn get_product(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ProductView>>, CoreError> {
    let view = state.products.view(&ctx, id).await?;
    Ok(Json(ApiResponse::success(view)))
}

pub async fn market_stats(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<MarketStats>>, CoreError> {
    let stats = state.products.stats().await?;
    Ok(Json(ApiResponse::success(stats)))
}
