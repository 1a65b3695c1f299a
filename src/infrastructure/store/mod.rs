//! 记录存储端口
//!
//! 业务层只依赖这里的单记录读写与聚合查询，不依赖具体后端的
//! 一致性保证；并发投票时以后端的行级写入语义为准（后写覆盖）。

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::app::{
    pledge::model::{NewPledge, Pledge},
    product::model::{NewProduct, Product},
    review::model::{NewReview, Review, StarCounts},
    vote::model::{NewVote, Vote, VoteTally, VoteType},
};

pub mod memory;
#[cfg(feature = "database")]
pub mod postgres;
pub mod seed;

pub use memory::{MemoryStore, StoreOp};
#[cfg(feature = "database")]
pub use postgres::PgRecordStore;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: Uuid },
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("store backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

pub type SharedStore = Arc<dyn RecordStore>;

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn insert_product(&self, owner_id: Uuid, new: NewProduct) -> StoreResult<Product>;
    async fn read_product(&self, id: Uuid) -> StoreResult<Product>;
    async fn list_products(&self) -> StoreResult<Vec<Product>>;
    /// 原子地把 delta 加到产品票数上
    async fn adjust_product_votes(&self, id: Uuid, delta: i64) -> StoreResult<Product>;
    async fn set_product_funding(&self, id: Uuid, current_funding: f64) -> StoreResult<Product>;
    async fn set_product_rating(
        &self,
        id: Uuid,
        rating: f64,
        review_count: i64,
    ) -> StoreResult<Product>;

    async fn find_vote(&self, user_id: Uuid, product_id: Uuid) -> StoreResult<Option<Vote>>;
    async fn insert_vote(&self, new: NewVote) -> StoreResult<Vote>;
    async fn update_vote(&self, vote_id: Uuid, vote_type: VoteType) -> StoreResult<Vote>;
    async fn delete_vote(&self, vote_id: Uuid) -> StoreResult<()>;
    async fn tally_votes(&self, product_id: Uuid) -> StoreResult<VoteTally>;

    async fn insert_pledge(&self, new: NewPledge) -> StoreResult<Pledge>;
    /// 只统计已完成的认捐
    async fn sum_pledges(&self, product_id: Uuid) -> StoreResult<f64>;

    async fn insert_review(&self, new: NewReview) -> StoreResult<Review>;
    async fn list_reviews(&self, product_id: Uuid) -> StoreResult<Vec<Review>>;
    async fn rating_counts(&self, product_id: Uuid) -> StoreResult<StarCounts>;
    /// 每个用户对同一条评论只计一次，返回评论及本次是否新增
    async fn mark_review_helpful(&self, review_id: Uuid, user_id: Uuid)
        -> StoreResult<(Review, bool)>;
}
