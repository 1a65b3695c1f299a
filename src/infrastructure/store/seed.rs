//! 演示数据

use tracing::info;
use uuid::Uuid;

use super::{RecordStore, StoreResult};
use crate::app::product::model::{NewProduct, Product, ProductStatus};

/// 写入一组双语演示产品
pub async fn seed_demo_catalog(store: &dyn RecordStore) -> StoreResult<Vec<Product>> {
    let owner = Uuid::new_v4();
    let catalog = vec![
        NewProduct {
            title: "Teff Yield Tracker".to_string(),
            title_am: Some("የጤፍ ምርት መከታተያ".to_string()),
            description: "SMS-based harvest reporting for smallholder teff farmers.".to_string(),
            description_am: Some("ለአነስተኛ የጤፍ አርሶ አደሮች በኤስኤምኤስ የምርት ሪፖርት።".to_string()),
            category: "agritech".to_string(),
            tags: vec!["sms".to_string(), "farming".to_string()],
            votes: 42,
            funding_goal: Some(15000.0),
            status: ProductStatus::Funding,
            is_featured: true,
        },
        NewProduct {
            title: "Addis Transit Live".to_string(),
            title_am: Some("አዲስ ትራንዚት".to_string()),
            description: "Real-time minibus and light-rail arrival estimates.".to_string(),
            description_am: None,
            category: "mobility".to_string(),
            tags: vec!["maps".to_string(), "transport".to_string()],
            votes: 27,
            funding_goal: None,
            status: ProductStatus::Active,
            is_featured: false,
        },
        NewProduct {
            title: "Clinic Queue".to_string(),
            title_am: Some("የክሊኒክ ወረፋ".to_string()),
            description: "Appointment queueing for public health centers.".to_string(),
            description_am: Some("ለሕዝብ ጤና ጣቢያዎች የቀጠሮ ወረፋ ስርዓት።".to_string()),
            category: "health".to_string(),
            tags: vec!["health".to_string(), "queue".to_string()],
            votes: 10,
            funding_goal: Some(1000.0),
            status: ProductStatus::Funding,
            is_featured: false,
        },
    ];

    let mut products = Vec::with_capacity(catalog.len());
    for new in catalog {
        products.push(store.insert_product(owner, new).await?);
    }

    info!("✅ 已初始化 {} 个示例产品", products.len());
    Ok(products)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::store::MemoryStore;

    #[tokio::test]
    async fn seeds_bilingual_catalog() {
        let store = MemoryStore::new();
        let products = seed_demo_catalog(&store).await.unwrap();

        assert_eq!(products.len(), 3);
        assert!(products.iter().all(|p| p.title_am.is_some()));
        assert_eq!(store.list_products().await.unwrap().len(), 3);
    }
}
