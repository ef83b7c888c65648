//! Stack & Inventory Appraisal
//!
//! 单价 × 数量的估值，以及按物品聚合的背包总估值。
//! 黑名单物品与零价物品不计入。金额使用 u64，避免整组高价物品溢出。

use crate::catalog::ItemId;
use crate::pricing::resolver::PriceResolver;
use std::collections::BTreeMap;

#[inline]
pub fn stack_value(unit_price: u32, amount: u32) -> u64 {
    unit_price as u64 * amount as u64
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppraisalLine {
    pub item: ItemId,
    pub amount: u64,
    pub unit_price: u32,
    pub subtotal: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Appraisal {
    pub lines: Vec<AppraisalLine>,
    pub total: u64,
}

impl Appraisal {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// 按物品聚合估值，行按目录序号排序
pub fn appraise<I>(resolver: &mut PriceResolver, stacks: I) -> Appraisal
where
    I: IntoIterator<Item = (ItemId, u32)>,
{
    let mut amounts: BTreeMap<ItemId, u64> = BTreeMap::new();
    for (item, amount) in stacks {
        if amount == 0 || resolver.is_blacklisted(item) {
            continue;
        }
        *amounts.entry(item).or_insert(0) += amount as u64;
    }

    let mut appraisal = Appraisal::default();
    for (item, amount) in amounts {
        let unit_price = resolver.get_price(item);
        if unit_price == 0 {
            continue;
        }
        let subtotal = (unit_price as u64).saturating_mul(amount);
        appraisal.total = appraisal.total.saturating_add(subtotal);
        appraisal.lines.push(AppraisalLine { item, amount, unit_price, subtotal });
    }
    appraisal
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::config::PricingConfig;
    use crate::storage::PriceStore;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn resolver(dir: &TempDir, yaml: &str) -> PriceResolver {
        let catalog = Arc::new(Catalog::new(["STONE", "DIAMOND", "BEDROCK", "DIRT"]));
        let store = PriceStore::open_in(dir.path(), catalog.clone());
        PriceResolver::new(catalog, store, PricingConfig::from_yaml_str(yaml).unwrap())
    }

    #[test]
    fn stack_value_does_not_overflow() {
        assert_eq!(stack_value(u32::MAX, 64), u32::MAX as u64 * 64);
        assert_eq!(stack_value(12, 0), 0);
    }

    #[test]
    fn groups_stacks_and_skips_worthless_items() {
        let dir = TempDir::new().unwrap();
        let mut r = resolver(
            &dir,
            "special-items:\n  STONE: 3\n  DIAMOND: 100\n  DIRT: 0\nblacklist: [BEDROCK]\n",
        );
        let cat = r.catalog().clone();
        let stone = cat.id("STONE").unwrap();
        let diamond = cat.id("DIAMOND").unwrap();

        let result = appraise(
            &mut r,
            [
                (diamond, 2),
                (stone, 64),
                (cat.id("BEDROCK").unwrap(), 10),
                (stone, 16),
                (cat.id("DIRT").unwrap(), 5),
            ],
        );

        assert_eq!(
            result.lines,
            vec![
                AppraisalLine { item: stone, amount: 80, unit_price: 3, subtotal: 240 },
                AppraisalLine { item: diamond, amount: 2, unit_price: 100, subtotal: 200 },
            ]
        );
        assert_eq!(result.total, 440);
    }

    #[test]
    fn nothing_of_value_is_empty() {
        let dir = TempDir::new().unwrap();
        let mut r = resolver(&dir, "blacklist: [STONE]\n");
        let stone = r.catalog().id("STONE").unwrap();
        let result = appraise(&mut r, [(stone, 32)]);
        assert!(result.is_empty());
        assert_eq!(result.total, 0);
    }
}
