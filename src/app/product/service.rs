//! 产品业务服务

use tracing::info;
use uuid::Uuid;
use validator::Validate;

use super::model::{MarketStats, NewProduct, Product, ProductQuery, ProductView};
use crate::core::{error::CoreError, session::RequestContext};
use crate::infrastructure::store::SharedStore;

#[derive(Clone)]
pub struct ProductService {
    store: SharedStore,
}

impl ProductService {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    pub async fn create(&self, ctx: &RequestContext, new: NewProduct) -> Result<Product, CoreError> {
        let actor = ctx.require_actor()?;
        new.validate()?;

        let product = self
            .store
            .insert_product(actor.id, new)
            .await
            .map_err(CoreError::from_write)?;

        info!("新产品 {} 由用户 {} 创建", product.id, actor.id);
        Ok(product)
    }

    pub async fn get(&self, id: Uuid) -> Result<Product, CoreError> {
        Ok(self.store.read_product(id).await?)
    }

    pub async fn view(&self, ctx: &RequestContext, id: Uuid) -> Result<ProductView, CoreError> {
        let product = self.get(id).await?;
        Ok(ProductView::localized(&product, ctx.language))
    }

    pub async fn list(
        &self,
        ctx: &RequestContext,
        query: &ProductQuery,
    ) -> Result<Vec<ProductView>, CoreError> {
        let products = self.store.list_products().await?;

        Ok(query
            .apply(products)
            .iter()
            .map(|product| ProductView::localized(product, ctx.language))
            .collect())
    }

    pub async fn stats(&self) -> Result<MarketStats, CoreError> {
        let products = self.store.list_products().await?;
        Ok(MarketStats::from_products(&products))
    }
}
