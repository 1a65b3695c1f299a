//! 产品数据模型

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::app::pledge::model::FundingProgress;
use crate::core::{error::CoreError, session::Language};

/// 产品状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus {
    #[default]
    Active,
    Funding,
    Completed,
}

impl ProductStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductStatus::Active => "active",
            ProductStatus::Funding => "funding",
            ProductStatus::Completed => "completed",
        }
    }
}

impl FromStr for ProductStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(ProductStatus::Active),
            "funding" => Ok(ProductStatus::Funding),
            "completed" => Ok(ProductStatus::Completed),
            other => Err(CoreError::BadRequest(format!("unknown product status: {other}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub title_am: Option<String>,
    pub description: String,
    pub description_am: Option<String>,
    pub category: String,
    pub tags: Vec<String>,
    /// 显示票数：赞成减反对，加上初始基数
    pub votes: i64,
    /// 平均评分 [0, 5]
    pub rating: f64,
    pub review_count: i64,
    pub funding_goal: Option<f64>,
    pub current_funding: Option<f64>,
    pub status: ProductStatus,
    pub is_featured: bool,
    pub created_at: DateTime<Utc>,
}

impl Product {
    pub fn title_for(&self, language: Language) -> &str {
        match (language, self.title_am.as_deref()) {
            (Language::Am, Some(title)) if !title.is_empty() => title,
            _ => &self.title,
        }
    }

    pub fn description_for(&self, language: Language) -> &str {
        match (language, self.description_am.as_deref()) {
            (Language::Am, Some(description)) if !description.is_empty() => description,
            _ => &self.description,
        }
    }

    pub fn funding_progress(&self) -> FundingProgress {
        FundingProgress::new(self.funding_goal, self.current_funding.unwrap_or(0.0))
    }

    fn matches_search(&self, needle: &str) -> bool {
        let lowered = needle.to_lowercase();
        let contains = |text: &str| text.to_lowercase().contains(&lowered);

        contains(&self.title)
            || contains(&self.description)
            || contains(&self.category)
            || self.tags.iter().any(|tag| contains(tag))
            || self.title_am.as_deref().is_some_and(|t| t.contains(needle))
            || self.description_am.as_deref().is_some_and(|d| d.contains(needle))
    }
}

/// 创建产品请求
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct NewProduct {
    #[validate(length(min = 1, max = 120, message = "title must be between 1 and 120 characters"))]
    pub title: String,
    #[validate(length(max = 120, message = "Amharic title must be at most 120 characters"))]
    pub title_am: Option<String>,
    #[validate(length(min = 1, max = 5000, message = "description must be between 1 and 5000 characters"))]
    pub description: String,
    pub description_am: Option<String>,
    #[validate(length(min = 1, max = 60, message = "category must be between 1 and 60 characters"))]
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// 初始票数，只供导入数据使用
    #[serde(skip_deserializing)]
    pub votes: i64,
    #[validate(range(min = 1.0, message = "funding goal must be at least 1"))]
    pub funding_goal: Option<f64>,
    #[serde(default)]
    pub status: ProductStatus,
    #[serde(default)]
    pub is_featured: bool,
}

/// 列表排序方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortBy {
    #[default]
    Votes,
    Recent,
    Funding,
}

/// 列表查询参数
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductQuery {
    pub search: Option<String>,
    pub category: Option<String>,
    pub sort: Option<SortBy>,
}

impl ProductQuery {
    /// 先按关键字过滤，再按分类过滤，最后排序
    pub fn apply(&self, products: Vec<Product>) -> Vec<Product> {
        let search = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty());
        let category = self
            .category
            .as_deref()
            .map(|c| c.trim().to_lowercase())
            .filter(|c| !c.is_empty() && c != "all");

        let mut filtered: Vec<Product> = products
            .into_iter()
            .filter(|p| search.map_or(true, |needle| p.matches_search(needle)))
            .filter(|p| {
                category
                    .as_deref()
                    .map_or(true, |c| p.category.to_lowercase().contains(c))
            })
            .collect();

        match self.sort.unwrap_or_default() {
            SortBy::Votes => filtered.sort_by(|a, b| b.votes.cmp(&a.votes)),
            SortBy::Recent => filtered.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            SortBy::Funding => filtered.sort_by(|a, b| {
                b.current_funding
                    .unwrap_or(0.0)
                    .total_cmp(&a.current_funding.unwrap_or(0.0))
            }),
        }

        filtered
    }
}

/// 按界面语言本地化后的产品视图
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductView {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub description: String,
    pub category: String,
    pub tags: Vec<String>,
    pub votes: i64,
    pub rating: f64,
    pub review_count: i64,
    pub status: ProductStatus,
    pub is_featured: bool,
    pub funding: Option<FundingProgress>,
    pub created_at: DateTime<Utc>,
}

impl ProductView {
    pub fn localized(product: &Product, language: Language) -> Self {
        Self {
            id: product.id,
            owner_id: product.owner_id,
            title: product.title_for(language).to_string(),
            description: product.description_for(language).to_string(),
            category: product.category.clone(),
            tags: product.tags.clone(),
            votes: product.votes,
            rating: product.rating,
            review_count: product.review_count,
            status: product.status,
            is_featured: product.is_featured,
            funding: product
                .funding_goal
                .is_some()
                .then(|| product.funding_progress()),
            created_at: product.created_at,
        }
    }
}

/// 首页统计
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketStats {
    pub product_count: usize,
    pub total_votes: i64,
    pub total_funding: f64,
}

impl MarketStats {
    pub fn from_products(products: &[Product]) -> Self {
        Self {
            product_count: products.len(),
            total_votes: products.iter().map(|p| p.votes).sum(),
            total_funding: products.iter().filter_map(|p| p.current_funding).sum(),
        }
    }
}
