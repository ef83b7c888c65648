//! Deterministic Price Generator
//!
//! 价格生成器与 JVM 宿主的 `java.util.Random` 逐位一致：
//! 48 位线性同余生成器，乘数 0x5DEECE66D，增量 0xB，
//! 构造时以 `seed ^ 0x5DEECE66D` 扰动，有界抽样使用拒绝采样。
//! 这样宿主历史写出的 prices.yml 与本核心重新生成的价格完全相同。

use crate::models::TierBounds;

// ==================== LCG 常量 ====================

const MULTIPLIER: u64 = 0x5_DEEC_E66D;
const ADDEND: u64 = 0xB;
const MASK: u64 = (1 << 48) - 1;

/// 单物品种子化随机源
#[derive(Debug, Clone)]
pub struct SeededRandom {
    state: u64,
}

impl SeededRandom {
    pub fn new(seed: i64) -> Self {
        Self {
            state: (seed as u64 ^ MULTIPLIER) & MASK,
        }
    }

    #[inline]
    fn next_bits(&mut self, bits: u32) -> i32 {
        self.state = self.state.wrapping_mul(MULTIPLIER).wrapping_add(ADDEND) & MASK;
        (self.state >> (48 - bits)) as u32 as i32
    }

    pub fn next_i32(&mut self) -> i32 {
        self.next_bits(32)
    }

    /// [0, bound) 上的均匀整数；bound 必须为正
    pub fn next_bounded(&mut self, bound: i32) -> i32 {
        debug_assert!(bound > 0);
        let mut r = self.next_bits(31);
        let m = bound - 1;
        if bound & m == 0 {
            // 2 的幂：取高位
            return ((bound as i64 * r as i64) >> 31) as i32;
        }
        let mut u = r;
        loop {
            r = u % bound;
            // u - r + m 溢出为负说明落在不完整的尾段，需重抽
            if u.wrapping_sub(r).wrapping_add(m) < 0 {
                u = self.next_bits(31);
            } else {
                return r;
            }
        }
    }
}

/// 派生单物品种子：`globalSeed XOR ordinal`
#[inline]
pub fn item_seed(global_seed: i64, ordinal: u32) -> i64 {
    global_seed ^ ordinal as i64
}

/// 在闭区间 [min, max] 内为物品生成确定性价格
///
/// 两端先钳位到 [0, u32::MAX]；区间退化 (min >= max) 时直接返回 min，不抽样。
/// 区间宽度超出 i32 时按 i32::MAX 截断，与宿主的 int 语义保持一致。
pub fn generate_price(bounds: TierBounds, global_seed: i64, ordinal: u32) -> u32 {
    let bounds = bounds.clamped();
    if bounds.is_degenerate() {
        return bounds.min as u32;
    }
    let span = (bounds.max - bounds.min + 1).min(i32::MAX as i64) as i32;
    let mut rng = SeededRandom::new(item_seed(global_seed, ordinal));
    (bounds.min + rng.next_bounded(span) as i64) as u32
}
