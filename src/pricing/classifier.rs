//! Tier Classifier (Rule Table)
//!
//! 纯函数：物品标识符 → 稀有度。无状态、无 I/O，跨进程结果恒定。
//!
//! 规则自上而下求值，首个命中即返回；全部未命中时回退 COMMON，保证全函数性。
//! 规则彼此并不互斥，因此 **顺序本身就是契约**：
//! 1. 精确集合 (LEGENDARY → EPIC → JUNK)
//! 2. 材质/护甲子串 (NETHERITE 必须先于 DIAMOND)
//! 3. 矿石子串
//! 4. 食物子串 (熟食先于生食)
//! 5. 自然方块子串
//! 6. 粘土类
//!
//! 存储方块 (DIAMOND_BLOCK / IRON_BLOCK / GOLD_BLOCK) 以及 GOLD_ORE / IRON_ORE
//! 已被第 2 组的材质子串覆盖，不单独列出规则。

use crate::models::Tier;
use lazy_static::lazy_static;
use std::collections::HashSet;

// ==================== 精确集合 ====================

const LEGENDARY_ITEMS: &[&str] = &[
    "DRAGON_EGG",
    "NETHER_STAR",
    "BEACON",
    "END_CRYSTAL",
    "HEART_OF_THE_SEA",
];

const EPIC_ITEMS: &[&str] = &[
    "ELYTRA",
    "TOTEM_OF_UNDYING",
    "ENCHANTED_GOLDEN_APPLE",
    "TRIDENT",
    "NETHERITE_INGOT",
    "NETHERITE_SCRAP",
    "NETHERITE_SWORD",
    "NETHERITE_PICKAXE",
    "NETHERITE_AXE",
    "NETHERITE_SHOVEL",
    "NETHERITE_HOE",
    "NETHERITE_HELMET",
    "NETHERITE_CHESTPLATE",
    "NETHERITE_LEGGINGS",
    "NETHERITE_BOOTS",
    "NETHERITE_BLOCK",
];

const JUNK_ITEMS: &[&str] = &[
    "DIRT",
    "GRASS_BLOCK",
    "SAND",
    "COBBLESTONE",
    "NETHERRACK",
    "ROTTEN_FLESH",
    "BONE",
    "STRING",
    "FEATHER",
    "LEATHER",
    "GLASS",
    "GLASS_PANE",
    "POISONOUS_POTATO",
    "SPIDER_EYE",
    "COBWEB",
    "DEAD_BUSH",
    "GRAVEL",
];

// ==================== 规则定义 ====================

#[derive(Debug)]
enum Matcher {
    Exact(HashSet<&'static str>),
    Contains(&'static [&'static str]),
    StartsWith(&'static [&'static str]),
}

impl Matcher {
    fn exact(names: &'static [&'static str]) -> Self {
        Matcher::Exact(names.iter().copied().collect())
    }

    #[inline]
    fn matches(&self, name: &str) -> bool {
        match self {
            Matcher::Exact(set) => set.contains(name),
            Matcher::Contains(patterns) => patterns.iter().any(|p| name.contains(p)),
            Matcher::StartsWith(prefixes) => prefixes.iter().any(|p| name.starts_with(p)),
        }
    }
}

/// 规则表中的一行：(谓词, 稀有度)
#[derive(Debug)]
pub struct Rule {
    pub label: &'static str,
    pub tier: Tier,
    matcher: Matcher,
}

impl Rule {
    fn new(label: &'static str, matcher: Matcher, tier: Tier) -> Self {
        Self { label, tier, matcher }
    }

    pub fn matches(&self, name: &str) -> bool {
        self.matcher.matches(name)
    }
}

pub const DEFAULT_TIER: Tier = Tier::Common;

lazy_static! {
    static ref RULES: Vec<Rule> = vec![
        // 1. 精确集合
        Rule::new("legendary-set", Matcher::exact(LEGENDARY_ITEMS), Tier::Legendary),
        Rule::new("epic-set", Matcher::exact(EPIC_ITEMS), Tier::Epic),
        Rule::new("junk-set", Matcher::exact(JUNK_ITEMS), Tier::Junk),

        // 2. 工具/护甲材质
        Rule::new("netherite", Matcher::Contains(&["NETHERITE"]), Tier::Epic),
        Rule::new("diamond", Matcher::Contains(&["DIAMOND"]), Tier::Rare),
        Rule::new("gold", Matcher::Contains(&["GOLDEN", "GOLD"]), Tier::Uncommon),
        Rule::new("iron", Matcher::Contains(&["IRON"]), Tier::Uncommon),
        Rule::new("chainmail", Matcher::Contains(&["CHAINMAIL"]), Tier::Uncommon),
        Rule::new(
            "basic-tools",
            Matcher::StartsWith(&["WOODEN_", "STONE_", "LEATHER_"]),
            Tier::Common,
        ),

        // 3. 矿石
        Rule::new("ancient-debris", Matcher::Contains(&["ANCIENT_DEBRIS"]), Tier::Rare),
        Rule::new("emerald", Matcher::Contains(&["EMERALD"]), Tier::Rare),
        Rule::new(
            "common-ores",
            Matcher::Contains(&["LAPIS_ORE", "REDSTONE_ORE", "COPPER_ORE"]),
            Tier::Common,
        ),

        // 4. 食物
        Rule::new(
            "cooked-food",
            Matcher::Contains(&[
                "COOKED_", "STEAK", "BREAD", "CAKE", "MUSHROOM_STEW",
                "RABBIT_STEW", "SUSPICIOUS_STEW", "PUMPKIN_PIE",
            ]),
            Tier::Uncommon,
        ),
        Rule::new(
            "raw-food",
            Matcher::Contains(&[
                "APPLE", "CARROT", "POTATO", "BEETROOT", "MELON", "PUMPKIN", "WHEAT", "SUGAR",
            ]),
            Tier::Common,
        ),

        // 5. 自然/建筑方块
        Rule::new(
            "natural-blocks",
            Matcher::Contains(&[
                "_WOOL", "_TULIP", "_ORCHID", "_DAISY", "DANDELION", "POPPY",
                "_SAPLING", "_LOG", "_PLANKS", "_LEAVES",
            ]),
            Tier::Common,
        ),

        // 6. 剩余泥土类
        Rule::new("clay", Matcher::Contains(&["CLAY"]), Tier::Junk),
    ];
}

// ==================== 公共接口 ====================

/// 有序规则表 (只读)
pub fn rules() -> &'static [Rule] {
    &RULES
}

/// 首个命中的规则；None 表示走默认回退
pub fn matching_rule(name: &str) -> Option<&'static Rule> {
    RULES.iter().find(|rule| rule.matches(name))
}

/// 全函数分类：同一输入恒得同一输出
pub fn resolve(name: &str) -> Tier {
    matching_rule(name).map_or(DEFAULT_TIER, |rule| rule.tier)
}
