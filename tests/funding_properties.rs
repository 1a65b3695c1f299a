use std::sync::Arc;

use proptest::prelude::*;
use uuid::Uuid;

use market_hub::app::pledge::{
    model::{compute_progress, PaymentMethod},
    service::PledgeService,
};
use market_hub::app::product::model::NewProduct;
use market_hub::core::session::{Actor, RequestContext};
use market_hub::infrastructure::store::{MemoryStore, RecordStore};

// 金额按分生成，避免无意义的浮点边界
fn birr(cents: u64) -> f64 {
    cents as f64 / 100.0
}

proptest! {
    #[test]
    fn progress_is_bounded(goal in 1u64..10_000_000, raised in 0u64..20_000_000) {
        let (goal, raised) = (birr(goal), birr(raised));
        let percentage = compute_progress(Some(goal), raised);

        prop_assert!((0.0..=100.0).contains(&percentage));
        prop_assert_eq!(percentage == 100.0, raised >= goal);
    }

    #[test]
    fn progress_without_goal_is_zero(raised in 0u64..20_000_000) {
        prop_assert_eq!(compute_progress(None, birr(raised)), 0.0);
        prop_assert_eq!(compute_progress(Some(0.0), birr(raised)), 0.0);
    }

    #[test]
    fn funding_never_decreases(amounts in prop::collection::vec(1u64..1_000_000, 1..15)) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let store = Arc::new(MemoryStore::new());
            let product = store
                .insert_product(
                    Uuid::new_v4(),
                    NewProduct {
                        title: "Mobile Wallet".to_string(),
                        description: "payments".to_string(),
                        category: "fintech".to_string(),
                        funding_goal: Some(5_000.0),
                        ..Default::default()
                    },
                )
                .await
                .unwrap();
            let service = PledgeService::new(store.clone());
            let ctx = RequestContext::signed_in(Actor::new(Uuid::new_v4()));

            let mut previous_funding = 0.0;
            let mut previous_percentage = 0.0;
            for cents in amounts {
                let receipt = service
                    .record_pledge(&ctx, product.id, birr(cents).into(), PaymentMethod::Card)
                    .await
                    .unwrap();
                let funding = receipt.product.current_funding.unwrap();

                assert!(funding >= previous_funding);
                assert!(receipt.progress.percentage >= previous_percentage);
                previous_funding = funding;
                previous_percentage = receipt.progress.percentage;
            }
        });
    }
}
