//! PostgreSQL 记录存储
//!
//! 全部使用运行时检查的 `sqlx::query`，编译时不需要数据库。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{RecordStore, StoreError, StoreResult};
use crate::app::{
    pledge::model::{NewPledge, Pledge},
    product::model::{NewProduct, Product},
    review::model::{NewReview, Review, StarCounts},
    vote::model::{NewVote, Vote, VoteTally, VoteType},
};

const PRODUCT_COLUMNS: &str = "id, owner_id, title, title_am, description, description_am, \
     category, tags, votes, rating, review_count, funding_goal, current_funding, status, \
     is_featured, created_at";
const VOTE_COLUMNS: &str = "id, user_id, product_id, vote_type, created_at";
const PLEDGE_COLUMNS: &str = "id, user_id, product_id, amount, payment_method, status, created_at";
const REVIEW_COLUMNS: &str = "id, user_id, product_id, rating, comment, helpful_count, created_at";

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StoreError::Conflict(db.message().to_string())
            }
            _ => StoreError::Backend(err.to_string()),
        }
    }
}

/// 外键失败说明引用的产品不存在
fn product_reference(err: sqlx::Error, product_id: Uuid) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => StoreError::NotFound {
            entity: "product",
            id: product_id,
        },
        _ => err.into(),
    }
}

fn not_found(entity: &'static str, id: Uuid) -> StoreError {
    StoreError::NotFound { entity, id }
}

fn corrupt(column: &str, err: impl std::fmt::Display) -> StoreError {
    StoreError::Backend(format!("invalid {column} column: {err}"))
}

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: Uuid,
    owner_id: Uuid,
    title: String,
    title_am: Option<String>,
    description: String,
    description_am: Option<String>,
    category: String,
    tags: Vec<String>,
    votes: i64,
    rating: f64,
    review_count: i64,
    funding_goal: Option<f64>,
    current_funding: Option<f64>,
    status: String,
    is_featured: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = StoreError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        Ok(Product {
            id: row.id,
            owner_id: row.owner_id,
            title: row.title,
            title_am: row.title_am,
            description: row.description,
            description_am: row.description_am,
            category: row.category,
            tags: row.tags,
            votes: row.votes,
            rating: row.rating,
            review_count: row.review_count,
            funding_goal: row.funding_goal,
            current_funding: row.current_funding,
            status: row.status.parse().map_err(|e| corrupt("status", e))?,
            is_featured: row.is_featured,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct VoteRow {
    id: Uuid,
    user_id: Uuid,
    product_id: Uuid,
    vote_type: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<VoteRow> for Vote {
    type Error = StoreError;

    fn try_from(row: VoteRow) -> Result<Self, Self::Error> {
        Ok(Vote {
            id: row.id,
            user_id: row.user_id,
            product_id: row.product_id,
            vote_type: row.vote_type.parse().map_err(|e| corrupt("vote_type", e))?,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct PledgeRow {
    id: Uuid,
    user_id: Uuid,
    product_id: Uuid,
    amount: f64,
    payment_method: String,
    status: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<PledgeRow> for Pledge {
    type Error = StoreError;

    fn try_from(row: PledgeRow) -> Result<Self, Self::Error> {
        Ok(Pledge {
            id: row.id,
            user_id: row.user_id,
            product_id: row.product_id,
            amount: row.amount,
            method: row
                .payment_method
                .parse()
                .map_err(|e| corrupt("payment_method", e))?,
            status: row.status.parse().map_err(|e| corrupt("status", e))?,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ReviewRow {
    id: Uuid,
    user_id: Uuid,
    product_id: Uuid,
    rating: i16,
    comment: String,
    helpful_count: i64,
    created_at: DateTime<Utc>,
}

impl TryFrom<ReviewRow> for Review {
    type Error = StoreError;

    fn try_from(row: ReviewRow) -> Result<Self, Self::Error> {
        Ok(Review {
            id: row.id,
            user_id: row.user_id,
            product_id: row.product_id,
            rating: stars(row.rating)?,
            comment: row.comment,
            helpful: row.helpful_count,
            created_at: row.created_at,
        })
    }
}

/// 把 `GROUP BY rating` 的结果放进 1 到 5 星的计数槽
fn star_counts(rows: Vec<(i16, i64)>) -> StoreResult<StarCounts> {
    let mut counts: StarCounts = [0; 5];
    for (rating, count) in rows {
        let slot = stars(rating)? as usize - 1;
        counts[slot] = u64::try_from(count).map_err(|e| corrupt("count", e))?;
    }
    Ok(counts)
}

fn stars(rating: i16) -> StoreResult<u8> {
    match u8::try_from(rating) {
        Ok(value @ 1..=5) => Ok(value),
        _ => Err(corrupt("rating", format!("{rating} is outside 1..=5"))),
    }
}

pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn product_update(&self, sql: String, id: Uuid, bind: ProductUpdate) -> StoreResult<Product> {
        let query = sqlx::query_as::<_, ProductRow>(&sql).bind(id);
        let query = match bind {
            ProductUpdate::Votes(delta) => query.bind(delta),
            ProductUpdate::Funding(total) => query.bind(total),
            ProductUpdate::Rating(rating, count) => query.bind(rating).bind(count),
        };

        query
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| not_found("product", id))?
            .try_into()
    }
}

enum ProductUpdate {
    Votes(i64),
    Funding(f64),
    Rating(f64, i64),
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn insert_product(&self, owner_id: Uuid, new: NewProduct) -> StoreResult<Product> {
        let sql = format!(
            "INSERT INTO products (id, owner_id, title, title_am, description, description_am, \
             category, tags, votes, funding_goal, current_funding, status, is_featured) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) \
             RETURNING {PRODUCT_COLUMNS}"
        );

        sqlx::query_as::<_, ProductRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(owner_id)
            .bind(new.title)
            .bind(new.title_am)
            .bind(new.description)
            .bind(new.description_am)
            .bind(new.category)
            .bind(new.tags)
            .bind(new.votes)
            .bind(new.funding_goal)
            .bind(new.funding_goal.map(|_| 0.0_f64))
            .bind(new.status.as_str())
            .bind(new.is_featured)
            .fetch_one(&self.pool)
            .await?
            .try_into()
    }

    async fn read_product(&self, id: Uuid) -> StoreResult<Product> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1");

        sqlx::query_as::<_, ProductRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| not_found("product", id))?
            .try_into()
    }

    async fn list_products(&self) -> StoreResult<Vec<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products ORDER BY created_at DESC");

        sqlx::query_as::<_, ProductRow>(&sql)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Product::try_from)
            .collect()
    }

    async fn adjust_product_votes(&self, id: Uuid, delta: i64) -> StoreResult<Product> {
        let sql = format!(
            "UPDATE products SET votes = votes + $2 WHERE id = $1 RETURNING {PRODUCT_COLUMNS}"
        );
        self.product_update(sql, id, ProductUpdate::Votes(delta)).await
    }

    async fn set_product_funding(&self, id: Uuid, current_funding: f64) -> StoreResult<Product> {
        let sql = format!(
            "UPDATE products SET current_funding = $2 WHERE id = $1 RETURNING {PRODUCT_COLUMNS}"
        );
        self.product_update(sql, id, ProductUpdate::Funding(current_funding))
            .await
    }

    async fn set_product_rating(
        &self,
        id: Uuid,
        rating: f64,
        review_count: i64,
    ) -> StoreResult<Product> {
        let sql = format!(
            "UPDATE products SET rating = $2, review_count = $3 WHERE id = $1 \
             RETURNING {PRODUCT_COLUMNS}"
        );
        self.product_update(sql, id, ProductUpdate::Rating(rating, review_count))
            .await
    }

    async fn find_vote(&self, user_id: Uuid, product_id: Uuid) -> StoreResult<Option<Vote>> {
        let sql = format!("SELECT {VOTE_COLUMNS} FROM votes WHERE user_id = $1 AND product_id = $2");

        sqlx::query_as::<_, VoteRow>(&sql)
            .bind(user_id)
            .bind(product_id)
            .fetch_optional(&self.pool)
            .await?
            .map(Vote::try_from)
            .transpose()
    }

    async fn insert_vote(&self, new: NewVote) -> StoreResult<Vote> {
        let sql = format!(
            "INSERT INTO votes (id, user_id, product_id, vote_type) VALUES ($1, $2, $3, $4) \
             RETURNING {VOTE_COLUMNS}"
        );

        sqlx::query_as::<_, VoteRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(new.user_id)
            .bind(new.product_id)
            .bind(new.vote_type.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| product_reference(e, new.product_id))?
            .try_into()
    }

    async fn update_vote(&self, vote_id: Uuid, vote_type: VoteType) -> StoreResult<Vote> {
        let sql = format!("UPDATE votes SET vote_type = $2 WHERE id = $1 RETURNING {VOTE_COLUMNS}");

        sqlx::query_as::<_, VoteRow>(&sql)
            .bind(vote_id)
            .bind(vote_type.as_str())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| not_found("vote", vote_id))?
            .try_into()
    }

    async fn delete_vote(&self, vote_id: Uuid) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM votes WHERE id = $1")
            .bind(vote_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(not_found("vote", vote_id));
        }
        Ok(())
    }

    async fn tally_votes(&self, product_id: Uuid) -> StoreResult<VoteTally> {
        let (up, down): (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*) FILTER (WHERE vote_type = 'up'), \
                    COUNT(*) FILTER (WHERE vote_type = 'down') \
             FROM votes WHERE product_id = $1",
        )
        .bind(product_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(VoteTally { up, down })
    }

    async fn insert_pledge(&self, new: NewPledge) -> StoreResult<Pledge> {
        let sql = format!(
            "INSERT INTO payments (id, user_id, product_id, amount, payment_method, status) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {PLEDGE_COLUMNS}"
        );

        sqlx::query_as::<_, PledgeRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(new.user_id)
            .bind(new.product_id)
            .bind(new.amount.value())
            .bind(new.method.as_str())
            .bind(new.status.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| product_reference(e, new.product_id))?
            .try_into()
    }

    async fn sum_pledges(&self, product_id: Uuid) -> StoreResult<f64> {
        let total: f64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(amount), 0)::DOUBLE PRECISION FROM payments \
             WHERE product_id = $1 AND status = 'completed'",
        )
        .bind(product_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(total)
    }

    async fn insert_review(&self, new: NewReview) -> StoreResult<Review> {
        let sql = format!(
            "INSERT INTO reviews (id, user_id, product_id, rating, comment) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {REVIEW_COLUMNS}"
        );

        sqlx::query_as::<_, ReviewRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(new.user_id)
            .bind(new.product_id)
            .bind(i16::from(new.rating))
            .bind(new.comment)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| product_reference(e, new.product_id))?
            .try_into()
    }

    async fn list_reviews(&self, product_id: Uuid) -> StoreResult<Vec<Review>> {
        let sql = format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews WHERE product_id = $1 ORDER BY created_at DESC"
        );

        sqlx::query_as::<_, ReviewRow>(&sql)
            .bind(product_id)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Review::try_from)
            .collect()
    }

    async fn rating_counts(&self, product_id: Uuid) -> StoreResult<StarCounts> {
        let rows: Vec<(i16, i64)> = sqlx::query_as(
            "SELECT rating, COUNT(*) FROM reviews WHERE product_id = $1 GROUP BY rating",
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;

        star_counts(rows)
    }

    async fn mark_review_helpful(
        &self,
        review_id: Uuid,
        user_id: Uuid,
    ) -> StoreResult<(Review, bool)> {
        let mut tx = self.pool.begin().await?;

        let exists: Option<Uuid> = sqlx::query_scalar("SELECT id FROM reviews WHERE id = $1 FOR UPDATE")
            .bind(review_id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(not_found("review", review_id));
        }

        let inserted = sqlx::query(
            "INSERT INTO review_helpful_marks (review_id, user_id) VALUES ($1, $2) \
             ON CONFLICT DO NOTHING",
        )
        .bind(review_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?
        .rows_affected()
            == 1;

        let sql = if inserted {
            format!(
                "UPDATE reviews SET helpful_count = helpful_count + 1 WHERE id = $1 \
                 RETURNING {REVIEW_COLUMNS}"
            )
        } else {
            format!("SELECT {REVIEW_COLUMNS} FROM reviews WHERE id = $1")
        };
        let row = sqlx::query_as::<_, ReviewRow>(&sql)
            .bind(review_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok((Review::try_from(row)?, inserted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product_row(status: &str) -> ProductRow {
        ProductRow {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            title: "Solar Kiosk".to_string(),
            title_am: None,
            description: "prepaid charging".to_string(),
            description_am: None,
            category: "energy".to_string(),
            tags: vec!["solar".to_string()],
            votes: 3,
            rating: 0.0,
            review_count: 0,
            funding_goal: Some(500.0),
            current_funding: None,
            status: status.to_string(),
            is_featured: false,
            created_at: Utc::now(),
        }
    }

    fn review_row(rating: i16) -> ReviewRow {
        ReviewRow {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            rating,
            comment: "reliable".to_string(),
            helpful_count: 0,
            created_at: Utc::now(),
        }
    }

    fn assert_corrupt<T: std::fmt::Debug>(result: StoreResult<T>, column: &str) {
        match result {
            Err(StoreError::Backend(msg)) => assert!(msg.contains(column), "{msg}"),
            other => panic!("expected backend error for {column}, got {other:?}"),
        }
    }

    #[test]
    fn product_row_status_is_checked() {
        let product = Product::try_from(product_row("funding")).unwrap();
        assert_eq!(product.status.as_str(), "funding");

        assert_corrupt(Product::try_from(product_row("archived")), "status");
    }

    #[test]
    fn vote_row_type_is_checked() {
        let row = |vote_type: &str| VoteRow {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            vote_type: vote_type.to_string(),
            created_at: Utc::now(),
        };

        assert_eq!(Vote::try_from(row("down")).unwrap().vote_type, VoteType::Down);
        assert_corrupt(Vote::try_from(row("sideways")), "vote_type");
    }

    #[test]
    fn pledge_row_enums_are_checked() {
        let row = |method: &str, status: &str| PledgeRow {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            amount: 25.0,
            payment_method: method.to_string(),
            status: status.to_string(),
            created_at: Utc::now(),
        };

        assert_corrupt(Pledge::try_from(row("barter", "completed")), "payment_method");
        assert_corrupt(Pledge::try_from(row("mobile", "lost")), "status");
    }

    #[test]
    fn review_row_rating_must_be_a_star_value() {
        assert_eq!(Review::try_from(review_row(5)).unwrap().rating, 5);
        for rating in [-1, 0, 6, 300] {
            assert_corrupt(Review::try_from(review_row(rating)), "rating");
        }
    }

    #[test]
    fn star_counts_fill_matching_slots() {
        let counts = star_counts(vec![(5, 7), (1, 2), (3, 1)]).unwrap();
        assert_eq!(counts, [2, 0, 1, 0, 7]);
        assert_eq!(star_counts(Vec::new()).unwrap(), [0; 5]);
    }

    #[test]
    fn star_counts_reject_bad_rows() {
        assert_corrupt(star_counts(vec![(0, 1)]), "rating");
        assert_corrupt(star_counts(vec![(6, 1)]), "rating");
        assert_corrupt(star_counts(vec![(-2, 1)]), "rating");
        assert_corrupt(star_counts(vec![(4, -1)]), "count");
    }
}
