//! Worth Items - Shared Data Models
//!
//! # 核心准则
//! 1. **C 布局**: `TierBounds` 与 `PriceQuote` 跨 FFI 边界传递，布局必须与 JVM 侧绑定一致。
//! 2. **非负价格**: 所有对外价格均为非负整数，以 `c_longlong` 传出。
//! 3. **有序稀有度**: `Tier` 的声明顺序即稀有度顺序 (JUNK 最低, LEGENDARY 最高)。

use libc::{c_int, c_longlong};
use std::fmt;

// ==================== 1. 稀有度等级 (Tier) ====================

/// 物品稀有度分级，决定价格生成区间
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Tier {
    Junk = 0,
    Common = 1,
    Uncommon = 2,
    Rare = 3,
    Epic = 4,
    Legendary = 5,
}

impl Tier {
    pub const ALL: [Tier; 6] = [
        Tier::Junk,
        Tier::Common,
        Tier::Uncommon,
        Tier::Rare,
        Tier::Epic,
        Tier::Legendary,
    ];

    /// config.yml 中 `tiers.<key>` 使用的小写键名
    pub fn key(self) -> &'static str {
        match self {
            Tier::Junk => "junk",
            Tier::Common => "common",
            Tier::Uncommon => "uncommon",
            Tier::Rare => "rare",
            Tier::Epic => "epic",
            Tier::Legendary => "legendary",
        }
    }

    /// 未配置时的硬编码默认区间
    pub fn default_bounds(self) -> TierBounds {
        let (min, max) = match self {
            Tier::Junk => (0, 5),
            Tier::Common => (5, 15),
            Tier::Uncommon => (15, 40),
            Tier::Rare => (40, 120),
            Tier::Epic => (120, 400),
            Tier::Legendary => (400, 3000),
        };
        TierBounds { min, max }
    }

    pub fn from_code(code: c_int) -> Option<Tier> {
        Tier::ALL.get(usize::try_from(code).ok()?).copied()
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Tier::Junk => "JUNK",
            Tier::Common => "COMMON",
            Tier::Uncommon => "UNCOMMON",
            Tier::Rare => "RARE",
            Tier::Epic => "EPIC",
            Tier::Legendary => "LEGENDARY",
        })
    }
}

// ==================== 2. 价格区间 (Bounds) ====================

/// 闭区间 [min, max] (16 bytes)
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TierBounds {
    pub min: c_longlong, // Offset 0
    pub max: c_longlong, // Offset 8
}

impl TierBounds {
    /// min >= max 时区间退化为单点 min
    #[inline]
    pub fn is_degenerate(&self) -> bool {
        self.min >= self.max
    }

    /// 两端钳位到价格可表示的范围 [0, u32::MAX]
    #[inline]
    pub fn clamped(self) -> Self {
        let ceiling = u32::MAX as c_longlong;
        Self {
            min: self.min.clamp(0, ceiling),
            max: self.max.clamp(0, ceiling),
        }
    }
}

// ==================== 3. 报价结果 (Quote) ====================

/// 单个物品的完整报价，供展示层标注 "自定义价格" 等信息 (24 bytes)
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PriceQuote {
    pub price: c_longlong,      // 0
    pub tier: c_int,            // 8
    pub is_special: c_int,      // 12: 1 = 存在 special-items 覆盖
    pub is_blacklisted: c_int,  // 16: 1 = 位于黑名单
    pub _padding: c_int,        // 20
}

// ==================== 4. 静态布局一致性测试 ====================

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem;

    #[test]
    fn verify_ffi_layout() {
        assert_eq!(mem::size_of::<TierBounds>(), 16);
        assert_eq!(mem::size_of::<PriceQuote>(), 24);
        assert_eq!(mem::size_of::<Tier>(), 4);

        assert_eq!(mem::offset_of!(TierBounds, max), 8);
        assert_eq!(mem::offset_of!(PriceQuote, tier), 8);
        assert_eq!(mem::offset_of!(PriceQuote, is_blacklisted), 16);
    }

    #[test]
    fn tiers_are_ordered_by_rarity() {
        let mut sorted = Tier::ALL;
        sorted.sort();
        assert_eq!(sorted, Tier::ALL);
        assert!(Tier::Junk < Tier::Legendary);
    }

    #[test]
    fn tier_codes_round_trip_through_ffi_ints() {
        for tier in Tier::ALL {
            assert_eq!(Tier::from_code(tier as c_int), Some(tier));
        }
        assert_eq!(Tier::from_code(-1), None);
        assert_eq!(Tier::from_code(6), None);
    }

    #[test]
    fn default_bounds_are_well_formed() {
        for tier in Tier::ALL {
            let b = tier.default_bounds();
            assert!(b.min < b.max, "{} 默认区间不应退化", tier);
        }
        assert_eq!(Tier::Legendary.default_bounds(), TierBounds { min: 400, max: 3000 });
    }

    #[test]
    fn bounds_clamp_into_price_range() {
        assert_eq!(TierBounds { min: 5, max: 15 }.clamped(), TierBounds { min: 5, max: 15 });
        assert_eq!(TierBounds { min: -1, max: 10 }.clamped(), TierBounds { min: 0, max: 10 });
        let wide = TierBounds { min: i64::MIN, max: i64::MAX }.clamped();
        assert_eq!(wide, TierBounds { min: 0, max: u32::MAX as c_longlong });
        assert!(TierBounds { min: 10, max: 10 }.is_degenerate());
        assert!(!wide.is_degenerate());
    }
}
