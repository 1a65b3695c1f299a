//! 内存记录存储，用于本地运行和测试

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::{RecordStore, StoreError, StoreResult};
use crate::app::{
    pledge::model::{NewPledge, Pledge, PledgeStatus},
    product::model::{NewProduct, Product},
    review::model::{NewReview, Review, StarCounts},
    vote::model::{NewVote, Vote, VoteTally, VoteType},
};

/// 可注入故障的存储操作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    InsertProduct,
    ReadProduct,
    AdjustVotes,
    SetFunding,
    SetRating,
    FindVote,
    InsertVote,
    UpdateVote,
    DeleteVote,
    InsertPledge,
    SumPledges,
    InsertReview,
    MarkHelpful,
}

#[derive(Default)]
struct Tables {
    products: HashMap<Uuid, Product>,
    votes: HashMap<Uuid, Vote>,
    pledges: Vec<Pledge>,
    reviews: HashMap<Uuid, Review>,
    helpful_marks: HashSet<(Uuid, Uuid)>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    failing: Mutex<HashSet<StoreOp>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 让指定操作持续失败，模拟后端不可用
    pub fn fail_on(&self, op: StoreOp) {
        if let Ok(mut failing) = self.failing.lock() {
            failing.insert(op);
        }
    }

    pub fn recover(&self, op: StoreOp) {
        if let Ok(mut failing) = self.failing.lock() {
            failing.remove(&op);
        }
    }

    /// 某 (用户, 产品) 的投票记录数
    pub fn vote_records(&self, user_id: Uuid, product_id: Uuid) -> usize {
        self.tables
            .lock()
            .map(|t| {
                t.votes
                    .values()
                    .filter(|v| v.user_id == user_id && v.product_id == product_id)
                    .count()
            })
            .unwrap_or_default()
    }

    pub fn pledges_for(&self, product_id: Uuid) -> Vec<Pledge> {
        self.tables
            .lock()
            .map(|t| {
                t.pledges
                    .iter()
                    .filter(|p| p.product_id == product_id)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    fn check(&self, op: StoreOp) -> StoreResult<()> {
        let failing = self
            .failing
            .lock()
            .map_err(|_| StoreError::Backend("fault table poisoned".to_string()))?;
        if failing.contains(&op) {
            return Err(StoreError::Backend(format!("injected failure on {op:?}")));
        }
        Ok(())
    }

    fn tables(&self) -> StoreResult<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Backend("memory store poisoned".to_string()))
    }
}

fn product_mut(tables: &mut Tables, id: Uuid) -> StoreResult<&mut Product> {
    tables.products.get_mut(&id).ok_or(StoreError::NotFound {
        entity: "product",
        id,
    })
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn insert_product(&self, owner_id: Uuid, new: NewProduct) -> StoreResult<Product> {
        self.check(StoreOp::InsertProduct)?;
        let product = Product {
            id: Uuid::new_v4(),
            owner_id,
            title: new.title,
            title_am: new.title_am,
            description: new.description,
            description_am: new.description_am,
            category: new.category,
            tags: new.tags,
            votes: new.votes,
            rating: 0.0,
            review_count: 0,
            current_funding: new.funding_goal.map(|_| 0.0),
            funding_goal: new.funding_goal,
            status: new.status,
            is_featured: new.is_featured,
            created_at: Utc::now(),
        };

        self.tables()?.products.insert(product.id, product.clone());
        Ok(product)
    }

    async fn read_product(&self, id: Uuid) -> StoreResult<Product> {
        self.check(StoreOp::ReadProduct)?;
        self.tables()?
            .products
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound {
                entity: "product",
                id,
            })
    }

    async fn list_products(&self) -> StoreResult<Vec<Product>> {
        Ok(self.tables()?.products.values().cloned().collect())
    }

    async fn adjust_product_votes(&self, id: Uuid, delta: i64) -> StoreResult<Product> {
        self.check(StoreOp::AdjustVotes)?;
        let mut tables = self.tables()?;
        let product = product_mut(&mut tables, id)?;
        product.votes += delta;
        Ok(product.clone())
    }

    async fn set_product_funding(&self, id: Uuid, current_funding: f64) -> StoreResult<Product> {
        self.check(StoreOp::SetFunding)?;
        let mut tables = self.tables()?;
        let product = product_mut(&mut tables, id)?;
        product.current_funding = Some(current_funding);
        Ok(product.clone())
    }

    async fn set_product_rating(
        &self,
        id: Uuid,
        rating: f64,
        review_count: i64,
    ) -> StoreResult<Product> {
        self.check(StoreOp::SetRating)?;
        let mut tables = self.tables()?;
        let product = product_mut(&mut tables, id)?;
        product.rating = rating;
        product.review_count = review_count;
        Ok(product.clone())
    }

    async fn find_vote(&self, user_id: Uuid, product_id: Uuid) -> StoreResult<Option<Vote>> {
        self.check(StoreOp::FindVote)?;
        Ok(self
            .tables()?
            .votes
            .values()
            .find(|v| v.user_id == user_id && v.product_id == product_id)
            .cloned())
    }

    async fn insert_vote(&self, new: NewVote) -> StoreResult<Vote> {
        self.check(StoreOp::InsertVote)?;
        let mut tables = self.tables()?;
        let duplicate = tables
            .votes
            .values()
            .any(|v| v.user_id == new.user_id && v.product_id == new.product_id);
        if duplicate {
            return Err(StoreError::Conflict(format!(
                "user {} already voted on product {}",
                new.user_id, new.product_id
            )));
        }

        let vote = Vote {
            id: Uuid::new_v4(),
            user_id: new.user_id,
            product_id: new.product_id,
            vote_type: new.vote_type,
            created_at: Utc::now(),
        };
        tables.votes.insert(vote.id, vote.clone());
        Ok(vote)
    }

    async fn update_vote(&self, vote_id: Uuid, vote_type: VoteType) -> StoreResult<Vote> {
        self.check(StoreOp::UpdateVote)?;
        let mut tables = self.tables()?;
        let vote = tables.votes.get_mut(&vote_id).ok_or(StoreError::NotFound {
            entity: "vote",
            id: vote_id,
        })?;
        vote.vote_type = vote_type;
        Ok(vote.clone())
    }

    async fn delete_vote(&self, vote_id: Uuid) -> StoreResult<()> {
        self.check(StoreOp::DeleteVote)?;
        self.tables()?
            .votes
            .remove(&vote_id)
            .map(|_| ())
            .ok_or(StoreError::NotFound {
                entity: "vote",
                id: vote_id,
            })
    }

    async fn tally_votes(&self, product_id: Uuid) -> StoreResult<VoteTally> {
        let tables = self.tables()?;
        let mut tally = VoteTally::default();
        for vote in tables.votes.values().filter(|v| v.product_id == product_id) {
            match vote.vote_type {
                VoteType::Up => tally.up += 1,
                VoteType::Down => tally.down += 1,
            }
        }
        Ok(tally)
    }

    async fn insert_pledge(&self, new: NewPledge) -> StoreResult<Pledge> {
        self.check(StoreOp::InsertPledge)?;
        let mut tables = self.tables()?;
        if !tables.products.contains_key(&new.product_id) {
            return Err(StoreError::NotFound {
                entity: "product",
                id: new.product_id,
            });
        }

        let pledge = Pledge {
            id: Uuid::new_v4(),
            user_id: new.user_id,
            product_id: new.product_id,
            amount: new.amount.value(),
            method: new.method,
            status: new.status,
            created_at: Utc::now(),
        };
        tables.pledges.push(pledge.clone());
        Ok(pledge)
    }

    async fn sum_pledges(&self, product_id: Uuid) -> StoreResult<f64> {
        self.check(StoreOp::SumPledges)?;
        Ok(self
            .tables()?
            .pledges
            .iter()
            .filter(|p| p.product_id == product_id && p.status == PledgeStatus::Completed)
            .map(|p| p.amount)
            .sum())
    }

    async fn insert_review(&self, new: NewReview) -> StoreResult<Review> {
        self.check(StoreOp::InsertReview)?;
        let mut tables = self.tables()?;
        if !tables.products.contains_key(&new.product_id) {
            return Err(StoreError::NotFound {
                entity: "product",
                id: new.product_id,
            });
        }

        let review = Review {
            id: Uuid::new_v4(),
            user_id: new.user_id,
            product_id: new.product_id,
            rating: new.rating,
            comment: new.comment,
            helpful: 0,
            created_at: Utc::now(),
        };
        tables.reviews.insert(review.id, review.clone());
        Ok(review)
    }

    async fn list_reviews(&self, product_id: Uuid) -> StoreResult<Vec<Review>> {
        let mut reviews: Vec<Review> = self
            .tables()?
            .reviews
            .values()
            .filter(|r| r.product_id == product_id)
            .cloned()
            .collect();
        reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(reviews)
    }

    async fn rating_counts(&self, product_id: Uuid) -> StoreResult<StarCounts> {
        let mut counts: StarCounts = [0; 5];
        for review in self
            .tables()?
            .reviews
            .values()
            .filter(|r| r.product_id == product_id)
        {
            if (1..=5).contains(&review.rating) {
                counts[usize::from(review.rating - 1)] += 1;
            }
        }
        Ok(counts)
    }

    async fn mark_review_helpful(
        &self,
        review_id: Uuid,
        user_id: Uuid,
    ) -> StoreResult<(Review, bool)> {
        self.check(StoreOp::MarkHelpful)?;
        let mut tables = self.tables()?;
        if !tables.reviews.contains_key(&review_id) {
            return Err(StoreError::NotFound {
                entity: "review",
                id: review_id,
            });
        }

        let newly_marked = tables.helpful_marks.insert((review_id, user_id));
        let review = tables
            .reviews
            .get_mut(&review_id)
            .ok_or(StoreError::NotFound {
                entity: "review",
                id: review_id,
            })?;
        if newly_marked {
            review.helpful += 1;
        }
        Ok((review.clone(), newly_marked))
    }
}
