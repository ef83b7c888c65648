//! Price Resolver
//!
//! 每次查询都按固定优先级求值：
//!   1. special-items 覆盖 (永远优先)
//!   2. 黑名单 → 0
//!   3. 缓存命中
//!   4. 分类 + 种子化生成 → 写回缓存
//!
//! 配置以不可变快照持有：`apply_config` 仅替换快照 (覆盖/黑名单立即生效，
//! 已缓存价格保持不变)；`reload` 替换快照并清空缓存，后续查询按新区间重新生成。

use crate::catalog::{Catalog, ItemId};
use crate::config::PricingConfig;
use crate::models::{PriceQuote, Tier, TierBounds};
use crate::pricing::{classifier, generator};
use crate::storage::PriceStore;
use std::sync::Arc;
use tracing::{debug, info};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

pub struct PriceResolver {
    catalog: Arc<Catalog>,
    store: PriceStore,
    config: PricingConfig,
}

impl PriceResolver {
    pub fn new(catalog: Arc<Catalog>, store: PriceStore, config: PricingConfig) -> Self {
        Self { catalog, store, config }
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn config(&self) -> &PricingConfig {
        &self.config
    }

    pub fn store(&self) -> &PriceStore {
        &self.store
    }

    // -------------------------------------------------------------------------
    // 核心查询
    // -------------------------------------------------------------------------

    /// 全函数：对目录中任意物品返回非负价格，永不失败
    pub fn get_price(&mut self, id: ItemId) -> u32 {
        let name = self.catalog.name(id);

        if let Some(price) = self.config.override_for(name) {
            return price;
        }
        if self.config.is_blacklisted(name) {
            return 0;
        }
        if self.store.has(id) {
            return self.store.get(id);
        }

        let price = self.generate(id);
        self.store.set(id, price);
        price
    }

    pub fn has_special_override(&self, id: ItemId) -> bool {
        self.config.has_special_override(self.catalog.name(id))
    }

    pub fn is_blacklisted(&self, id: ItemId) -> bool {
        self.config.is_blacklisted(self.catalog.name(id))
    }

    pub fn tier_of(&self, id: ItemId) -> Tier {
        classifier::resolve(self.catalog.name(id))
    }

    pub fn bounds_of(&self, tier: Tier) -> TierBounds {
        self.config.bounds_for(tier)
    }

    /// 展示层使用的完整报价
    pub fn quote(&mut self, id: ItemId) -> PriceQuote {
        PriceQuote {
            price: self.get_price(id) as i64,
            tier: self.tier_of(id) as i32,
            is_special: self.has_special_override(id) as i32,
            is_blacklisted: self.is_blacklisted(id) as i32,
            _padding: 0,
        }
    }

    // -------------------------------------------------------------------------
    // 生命周期
    // -------------------------------------------------------------------------

    /// 热更新配置快照，不触碰缓存
    pub fn apply_config(&mut self, config: PricingConfig) {
        self.config = config;
    }

    /// 替换配置快照并清空缓存 (含磁盘镜像)
    pub fn reload(&mut self, config: PricingConfig) {
        self.config = config;
        self.store.clear_cache();
        info!("价格缓存已清空，后续查询将按新配置重新生成");
    }

    pub fn save_to_disk(&mut self) -> bool {
        self.store.save_to_disk()
    }

    /// 为目录中所有未拉黑物品解析价格并刷写磁盘，返回正价物品数量
    ///
    /// 未命中缓存的物品先并行生成 (生成过程只读快照)，再由当前线程串行写回。
    pub fn precompute_all(&mut self) -> usize {
        let misses: Vec<ItemId> = self
            .catalog
            .iter()
            .filter(|(id, name)| {
                !self.config.is_blacklisted(name)
                    && self.config.override_for(name).is_none()
                    && !self.store.has(*id)
            })
            .map(|(id, _)| id)
            .collect();

        let generated = self.generate_many(&misses);
        for (id, price) in generated {
            self.store.set(id, price);
        }

        let ids: Vec<ItemId> = self.catalog.iter().map(|(id, _)| id).collect();
        let mut positive = 0usize;
        for id in ids {
            if self.is_blacklisted(id) {
                continue;
            }
            if self.get_price(id) > 0 {
                positive += 1;
            }
        }
        self.store.save_to_disk();

        info!(
            generated = misses.len(),
            positive,
            "Precomputed {} item prices -> prices.yml",
            positive
        );
        positive
    }

    // -------------------------------------------------------------------------
    // 内部生成
    // -------------------------------------------------------------------------

    fn generate(&self, id: ItemId) -> u32 {
        let tier = self.tier_of(id);
        let bounds = self.bounds_of(tier);
        let price = generator::generate_price(bounds, self.config.price_seed, id.ordinal());
        debug!(item = self.catalog.name(id), %tier, price, "生成新价格");
        price
    }

    fn generate_many(&self, ids: &[ItemId]) -> Vec<(ItemId, u32)> {
        let job = |id: &ItemId| {
            let tier = classifier::resolve(self.catalog.name(*id));
            let bounds = self.config.bounds_for(tier);
            (*id, generator::generate_price(bounds, self.config.price_seed, id.ordinal()))
        };

        #[cfg(feature = "parallel")]
        {
            ids.par_iter().map(job).collect()
        }
        #[cfg(not(feature = "parallel"))]
        {
            ids.iter().map(job).collect()
        }
    }
}
