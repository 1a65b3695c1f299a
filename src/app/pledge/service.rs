//! 认捐业务服务

use tracing::{info, warn};
use uuid::Uuid;

use super::model::{
    AmountInput, FundingProgress, NewPledge, PaymentMethod, PledgeReceipt, PledgeStatus,
};
use crate::app::product::model::Product;
use crate::core::{error::CoreError, session::RequestContext};
use crate::infrastructure::store::SharedStore;

#[derive(Clone)]
pub struct PledgeService {
    store: SharedStore,
}

impl PledgeService {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// 记录一笔已完成的认捐，并按认捐记录重新计算累计金额
    ///
    /// 检查顺序：登录、金额、产品存在。只有认捐写入本身失败时
    /// 调用方需要重试；累计金额刷新失败不影响已写入的认捐。
    pub async fn record_pledge(
        &self,
        ctx: &RequestContext,
        product_id: Uuid,
        amount: AmountInput,
        method: PaymentMethod,
    ) -> Result<PledgeReceipt, CoreError> {
        let actor = ctx.require_actor()?;
        let amount = amount.validate()?;
        let product = self.store.read_product(product_id).await?;

        let pledge = self
            .store
            .insert_pledge(NewPledge {
                user_id: actor.id,
                product_id,
                amount,
                method,
                status: PledgeStatus::Completed,
            })
            .await
            .map_err(CoreError::from_write)?;

        info!(
            "用户 {} 向产品 {} 认捐 {:.2} ({})",
            actor.id,
            product_id,
            pledge.amount,
            method.as_str()
        );

        let (product, funding_synced) = match self.refresh_funding(product_id).await {
            Ok(updated) => (updated, true),
            Err(err) => {
                warn!("产品 {} 累计金额刷新失败，稍后重算: {}", product_id, err);
                (product, false)
            }
        };

        Ok(PledgeReceipt {
            progress: product.funding_progress(),
            pledge,
            product,
            funding_synced,
        })
    }

    /// 重新汇总已完成认捐并保存到产品上
    pub async fn refresh_funding(&self, product_id: Uuid) -> Result<Product, CoreError> {
        let total = self.store.sum_pledges(product_id).await?;
        let product = self
            .store
            .set_product_funding(product_id, total)
            .await
            .map_err(CoreError::from_write)?;

        info!("产品 {} 累计筹款 {:.2}", product_id, total);
        Ok(product)
    }

    pub async fn funding(&self, product_id: Uuid) -> Result<FundingProgress, CoreError> {
        let product = self.store.read_product(product_id).await?;
        Ok(FundingProgress::for_product(&product))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::app::product::model::NewProduct;
    use crate::core::session::Actor;
    use crate::infrastructure::store::{MemoryStore, RecordStore, StoreOp};

    async fn setup(goal: Option<f64>) -> (Arc<MemoryStore>, PledgeService, Uuid) {
        let store = Arc::new(MemoryStore::new());
        let product = store
            .insert_product(
                Uuid::new_v4(),
                NewProduct {
                    title: "Clinic Queue".to_string(),
                    description: "appointments".to_string(),
                    category: "health".to_string(),
                    funding_goal: goal,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let service = PledgeService::new(store.clone());
        (store, service, product.id)
    }

    fn backer() -> RequestContext {
        RequestContext::signed_in(Actor::new(Uuid::new_v4()))
    }

    #[tokio::test]
    async fn pledges_accumulate_and_progress_clamps() {
        let (_store, service, product_id) = setup(Some(1000.0)).await;
        let ctx = backer();

        let first = service
            .record_pledge(&ctx, product_id, 250.0.into(), PaymentMethod::Card)
            .await
            .unwrap();
        assert_eq!(first.product.current_funding, Some(250.0));
        assert_eq!(first.progress.percentage, 25.0);
        assert!(first.funding_synced);

        let second = service
            .record_pledge(&ctx, product_id, 900.0.into(), PaymentMethod::Mobile)
            .await
            .unwrap();
        assert_eq!(second.product.current_funding, Some(1150.0));
        assert_eq!(second.progress.percentage, 100.0);
        assert!(second.progress.goal_reached());
    }

    #[tokio::test]
    async fn invalid_amounts_write_nothing() {
        let (store, service, product_id) = setup(Some(1000.0)).await;
        let ctx = backer();

        for amount in [AmountInput::from(0.0), AmountInput::from(-5.0), AmountInput::from("abc")] {
            let result = service
                .record_pledge(&ctx, product_id, amount, PaymentMethod::Card)
                .await;
            assert!(matches!(result, Err(CoreError::InvalidAmount)));
        }
        assert!(store.pledges_for(product_id).is_empty());
    }

    #[tokio::test]
    async fn anonymous_is_rejected_before_amount_check() {
        let (store, service, product_id) = setup(Some(1000.0)).await;

        let result = service
            .record_pledge(
                &RequestContext::anonymous(),
                product_id,
                0.0.into(),
                PaymentMethod::Card,
            )
            .await;

        assert!(matches!(result, Err(CoreError::Unauthenticated)));
        assert!(store.pledges_for(product_id).is_empty());
    }

    #[tokio::test]
    async fn failed_insert_is_retryable() {
        let (store, service, product_id) = setup(Some(1000.0)).await;
        store.fail_on(StoreOp::InsertPledge);

        let err = service
            .record_pledge(&backer(), product_id, 100.0.into(), PaymentMethod::Card)
            .await
            .unwrap_err();

        assert!(err.is_retryable());
        let product = store.read_product(product_id).await.unwrap();
        assert_eq!(product.current_funding, Some(0.0));
    }

    #[tokio::test]
    async fn unsynced_total_is_recomputed_later() {
        let (store, service, product_id) = setup(Some(1000.0)).await;
        store.fail_on(StoreOp::SetFunding);

        let receipt = service
            .record_pledge(&backer(), product_id, 400.0.into(), PaymentMethod::Card)
            .await
            .unwrap();
        assert!(!receipt.funding_synced);
        assert_eq!(store.pledges_for(product_id).len(), 1);

        store.recover(StoreOp::SetFunding);
        let product = service.refresh_funding(product_id).await.unwrap();
        assert_eq!(product.current_funding, Some(400.0));
        assert_eq!(service.funding(product_id).await.unwrap().percentage, 40.0);
    }

    #[tokio::test]
    async fn unknown_product_is_not_found() {
        let (store, service, _) = setup(None).await;
        let missing = Uuid::new_v4();

        let result = service
            .record_pledge(&backer(), missing, 10.0.into(), PaymentMethod::Card)
            .await;

        assert!(matches!(result, Err(CoreError::NotFound(_))));
        assert!(store.pledges_for(missing).is_empty());
    }
}
