//! 应用层：按领域划分的模型、服务与处理器

use std::time::Duration;

use axum::{
    middleware,
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::core::middleware::request_logging_middleware;
use crate::infrastructure::store::SharedStore;

pub mod pledge;
pub mod product;
pub mod review;
pub mod vote;

use pledge::service::PledgeService;
use product::service::ProductService;
use review::service::ReviewService;
use vote::service::VoteService;

/// 所有处理器共享的状态，服务共用同一个记录存储
#[derive(Clone)]
pub struct AppState {
    pub products: ProductService,
    pub votes: VoteService,
    pub pledges: PledgeService,
    pub reviews: ReviewService,
}

impl AppState {
    pub fn new(store: SharedStore) -> Self {
        Self {
            products: ProductService::new(store.clone()),
            votes: VoteService::new(store.clone()),
            pledges: PledgeService::new(store.clone()),
            reviews: ReviewService::new(store),
        }
    }
}

pub fn router(state: AppState, timeout: Duration) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/stats", get(product::handler::market_stats))
        .route(
            "/products",
            get(product::handler::list_products).post(product::handler::create_product),
        )
        .route("/products/:id", get(product::handler::get_product))
        .route(
            "/products/:id/vote",
            get(vote::handler::current_vote).post(vote::handler::cast_vote),
        )
        .route("/products/:id/votes/tally", get(vote::handler::vote_tally))
        .route("/products/:id/funding", get(pledge::handler::funding_progress))
        .route("/products/:id/pledges", post(pledge::handler::create_pledge))
        .route(
            "/products/:id/reviews",
            get(review::handler::list_reviews).post(review::handler::submit_review),
        )
        .route("/products/:id/ratings", get(review::handler::rating_breakdown))
        .route("/reviews/:id/helpful", post(review::handler::mark_helpful))
        .layer(middleware::from_fn(request_logging_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TimeoutLayer::new(timeout))
        .with_state(state)
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}
