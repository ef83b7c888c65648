pub mod appraisal;
pub mod classifier;
pub mod generator;
pub mod resolver;

// 重新导出数据模型
pub use crate::models::{PriceQuote, Tier, TierBounds};

// 重新导出核心入口
pub use appraisal::{appraise, stack_value, Appraisal, AppraisalLine};
pub use classifier::{matching_rule, resolve, rules, Rule, DEFAULT_TIER};
pub use generator::{generate_price, item_seed, SeededRandom};
pub use resolver::PriceResolver;

// -----------------------------------------------------------------------------
// 默认参数定义
// -----------------------------------------------------------------------------
pub use crate::config::DEFAULT_PRICE_SEED;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::config::PricingConfig;
    use crate::storage::PriceStore;
    use std::sync::Arc;

    #[test]
    fn test_pricing_pipeline_integration() {
        let dir = tempfile::TempDir::new().unwrap();
        let catalog = Arc::new(Catalog::new(["COBBLESTONE", "IRON_INGOT", "ELYTRA", "DRAGON_EGG"]));

        // 1. 分类
        assert_eq!(resolve("COBBLESTONE"), Tier::Junk);
        assert_eq!(resolve("IRON_INGOT"), Tier::Uncommon);

        // 2. 首次会话：生成并刷写
        let store = PriceStore::open_in(dir.path(), catalog.clone());
        let mut resolver = PriceResolver::new(catalog.clone(), store, PricingConfig::default());
        let prices: Vec<u32> = catalog.iter().map(|(id, _)| resolver.get_price(id)).collect();
        assert!(resolver.save_to_disk());

        // 3. 重启：同一文件、同一目录，价格不变且无需重新生成
        let store = PriceStore::open_in(dir.path(), catalog.clone());
        assert_eq!(store.len(), catalog.len());
        let mut restarted = PriceResolver::new(catalog.clone(), store, PricingConfig::default());
        let again: Vec<u32> = catalog.iter().map(|(id, _)| restarted.get_price(id)).collect();
        assert_eq!(prices, again);

        // 4. 各价格落在各自稀有度区间内
        for ((id, name), price) in catalog.iter().zip(&prices) {
            let b = resolver.bounds_of(resolve(name));
            assert!((b.min as u32..=b.max as u32).contains(price), "{} {} -> {}", id, name, price);
        }
    }
}
