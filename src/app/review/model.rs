//! 评论数据模型

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub id: Uuid,
    pub user_id: Uuid,
    pub product_id: Uuid,
    /// 1-5 星
    pub rating: u8,
    pub comment: String,
    pub helpful: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReview {
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub rating: u8,
    pub comment: String,
}

/// 提交评论请求
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SubmitReview {
    #[validate(range(min = 1, max = 5, message = "rating must be between 1 and 5 stars"))]
    pub rating: u8,
    #[validate(length(min = 1, max = 2000, message = "comment must be between 1 and 2000 characters"))]
    pub comment: String,
}

impl SubmitReview {
    /// 去掉评论首尾空白，校验与存储都基于处理后的文本
    pub fn normalized(mut self) -> Self {
        let trimmed = self.comment.trim();
        if trimmed.len() != self.comment.len() {
            self.comment = trimmed.to_string();
        }
        self
    }
}

/// 提交评论的结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewReceipt {
    pub review: Review,
    /// 产品的平均评分与评论数是否已按星级分布重新计算并保存
    pub rating_synced: bool,
}

/// 每个星级的评论数，下标 0 对应 1 星
pub type StarCounts = [u64; 5];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StarBucket {
    pub stars: u8,
    pub count: u64,
    pub percentage: f64,
}

/// 评分分布，由真实评论聚合得出
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingBreakdown {
    pub total: u64,
    pub average: f64,
    /// 从 5 星到 1 星
    pub buckets: Vec<StarBucket>,
}

impl RatingBreakdown {
    pub fn from_counts(counts: StarCounts) -> Self {
        let total: u64 = counts.iter().sum();
        let weighted: u64 = counts
            .iter()
            .zip(1u64..)
            .map(|(count, stars)| count * stars)
            .sum();
        let average = if total == 0 {
            0.0
        } else {
            weighted as f64 / total as f64
        };

        let buckets = (1..=5u8)
            .rev()
            .map(|stars| {
                let count = counts[usize::from(stars - 1)];
                let percentage = if total == 0 {
                    0.0
                } else {
                    count as f64 / total as f64 * 100.0
                };
                StarBucket {
                    stars,
                    count,
                    percentage,
                }
            })
            .collect();

        Self {
            total,
            average,
            buckets,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_comment_fails_after_trimming() {
        let blank = SubmitReview {
            rating: 4,
            comment: "   ".to_string(),
        }
        .normalized();
        assert_eq!(blank.comment, "");
        assert!(blank.validate().is_err());

        let padded = SubmitReview {
            rating: 4,
            comment: "  works offline \n".to_string(),
        }
        .normalized();
        assert_eq!(padded.comment, "works offline");
        assert!(padded.validate().is_ok());
    }

    #[test]
    fn empty_breakdown_has_zero_shares() {
        let breakdown = RatingBreakdown::from_counts([0; 5]);
        assert_eq!(breakdown.total, 0);
        assert_eq!(breakdown.average, 0.0);
        assert_eq!(breakdown.buckets.len(), 5);
        assert!(breakdown.buckets.iter().all(|b| b.percentage == 0.0));
    }

    #[test]
    fn breakdown_reflects_counts() {
        // 1★ x1, 4★ x1, 5★ x2
        let breakdown = RatingBreakdown::from_counts([1, 0, 0, 1, 2]);
        assert_eq!(breakdown.total, 4);
        assert!((breakdown.average - 3.75).abs() < 1e-9);

        let five = breakdown.buckets[0];
        assert_eq!(five.stars, 5);
        assert_eq!(five.count, 2);
        assert!((five.percentage - 50.0).abs() < 1e-9);

        let one = breakdown.buckets[4];
        assert_eq!(one.stars, 1);
        assert!((one.percentage - 25.0).abs() < 1e-9);

        let share: f64 = breakdown.buckets.iter().map(|b| b.percentage).sum();
        assert!((share - 100.0).abs() < 1e-9);
    }

    #[test]
    fn submit_review_validates_rating_and_comment() {
        let ok = SubmitReview {
            rating: 4,
            comment: "Works offline, great for rural clinics".to_string(),
        };
        assert!(ok.validate().is_ok());

        let zero_stars = SubmitReview {
            rating: 0,
            comment: "x".to_string(),
        };
        assert!(zero_stars.validate().is_err());

        let empty = SubmitReview {
            rating: 5,
            comment: String::new(),
        };
        assert!(empty.validate().is_err());
    }
}
