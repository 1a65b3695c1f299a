//! 数据库基础设施

use sqlx::{
    postgres::{PgPool, PgPoolOptions},
    Error,
};
use tracing::info;

use crate::core::config::DatabaseConfig;

pub struct DatabaseManager {
    pool: PgPool,
}

impl DatabaseManager {
    pub async fn new(database_url: &str, config: &DatabaseConfig) -> Result<Self, Error> {
        info!(
            "连接数据库: {}",
            redact_password(database_url)
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.acquire_timeout())
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    pub fn get_pool(&self) -> &PgPool {
        &self.pool
    }

    /// 幂等地创建表结构
    pub async fn migrate(&self) -> Result<(), Error> {
        info!("创建数据库表...");

        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }

        info!("数据库表创建完成");
        Ok(())
    }
}

fn redact_password(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            let credentials = &url[scheme_end + 3..at];
            match credentials.split_once(':') {
                Some((user, _)) => format!("{}{}:***{}", &url[..scheme_end + 3], user, &url[at..]),
                None => url.to_string(),
            }
        }
        _ => url.to_string(),
    }
}

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS products (
        id UUID PRIMARY KEY,
        owner_id UUID NOT NULL,
        title TEXT NOT NULL,
        title_am TEXT,
        description TEXT NOT NULL,
        description_am TEXT,
        category TEXT NOT NULL,
        tags TEXT[] NOT NULL DEFAULT '{}',
        votes BIGINT NOT NULL DEFAULT 0,
        rating DOUBLE PRECISION NOT NULL DEFAULT 0 CHECK (rating >= 0 AND rating <= 5),
        review_count BIGINT NOT NULL DEFAULT 0,
        funding_goal DOUBLE PRECISION,
        current_funding DOUBLE PRECISION,
        status TEXT NOT NULL DEFAULT 'active',
        is_featured BOOLEAN NOT NULL DEFAULT FALSE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS votes (
        id UUID PRIMARY KEY,
        user_id UUID NOT NULL,
        product_id UUID NOT NULL REFERENCES products(id),
        vote_type TEXT NOT NULL CHECK (vote_type IN ('up', 'down')),
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        UNIQUE (user_id, product_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS payments (
        id UUID PRIMARY KEY,
        user_id UUID NOT NULL,
        product_id UUID NOT NULL REFERENCES products(id),
        amount DOUBLE PRECISION NOT NULL CHECK (amount > 0),
        payment_method TEXT NOT NULL,
        status TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS reviews (
        id UUID PRIMARY KEY,
        user_id UUID NOT NULL,
        product_id UUID NOT NULL REFERENCES products(id),
        rating SMALLINT NOT NULL CHECK (rating BETWEEN 1 AND 5),
        comment TEXT NOT NULL,
        helpful_count BIGINT NOT NULL DEFAULT 0,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS review_helpful_marks (
        review_id UUID NOT NULL REFERENCES reviews(id),
        user_id UUID NOT NULL,
        PRIMARY KEY (review_id, user_id)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS payments_product_idx ON payments (product_id)",
    "CREATE INDEX IF NOT EXISTS reviews_product_idx ON reviews (product_id)",
];
