//! 评论业务服务

use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use super::model::{NewReview, RatingBreakdown, Review, ReviewReceipt, SubmitReview};
use crate::app::product::model::Product;
use crate::core::{error::CoreError, session::RequestContext};
use crate::infrastructure::store::SharedStore;

#[derive(Clone)]
pub struct ReviewService {
    store: SharedStore,
}

impl ReviewService {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// 写入评论并按星级分布重算产品评分
    ///
    /// 评论写入成功后评分刷新失败不会让请求失败，回执中 `rating_synced` 为 false，
    /// 之后调用 [`ReviewService::refresh_rating`] 即可补齐。
    pub async fn submit(
        &self,
        ctx: &RequestContext,
        product_id: Uuid,
        request: SubmitReview,
    ) -> Result<ReviewReceipt, CoreError> {
        let actor = ctx.require_actor()?;
        let request = request.normalized();
        request.validate()?;
        self.store.read_product(product_id).await?;

        let review = self
            .store
            .insert_review(NewReview {
                user_id: actor.id,
                product_id,
                rating: request.rating,
                comment: request.comment,
            })
            .await
            .map_err(CoreError::from_write)?;

        let rating_synced = match self.refresh_rating(product_id).await {
            Ok(_) => true,
            Err(err) => {
                warn!("产品 {} 评分刷新失败，稍后重算: {}", product_id, err);
                false
            }
        };

        info!("产品 {} 新增 {} 星评论", product_id, review.rating);
        Ok(ReviewReceipt {
            review,
            rating_synced,
        })
    }

    /// 按星级分布重算平均评分与评论数并保存到产品上
    pub async fn refresh_rating(&self, product_id: Uuid) -> Result<Product, CoreError> {
        let breakdown = self.breakdown(product_id).await?;
        let review_count = i64::try_from(breakdown.total)
            .map_err(|e| CoreError::Internal(e.to_string()))?;
        let product = self
            .store
            .set_product_rating(product_id, breakdown.average, review_count)
            .await
            .map_err(CoreError::from_write)?;

        info!(
            "产品 {} 平均评分 {:.2} ({} 条)",
            product_id, breakdown.average, review_count
        );
        Ok(product)
    }

    pub async fn list(&self, product_id: Uuid) -> Result<Vec<Review>, CoreError> {
        self.store.read_product(product_id).await?;
        Ok(self.store.list_reviews(product_id).await?)
    }

    pub async fn breakdown(&self, product_id: Uuid) -> Result<RatingBreakdown, CoreError> {
        let counts = self.store.rating_counts(product_id).await?;
        Ok(RatingBreakdown::from_counts(counts))
    }

    /// 每个用户对同一条评论只计一次
    pub async fn mark_helpful(&self, ctx: &RequestContext, review_id: Uuid) -> Result<Review, CoreError> {
        let actor = ctx.require_actor()?;
        let (review, newly_marked) = self
            .store
            .mark_review_helpful(review_id, actor.id)
            .await
            .map_err(CoreError::from_write)?;

        if newly_marked {
            info!("评论 {} 被用户 {} 标记为有用", review_id, actor.id);
        }
        Ok(review)
    }
}
