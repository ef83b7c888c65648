//! Pricing Configuration Snapshot
//!
//! `config.yml` 被解析为一份不可变快照，由 Resolver 持有，`reload()` 时整体替换。
//! 任何缺失的段落或键都回退到硬编码默认值，绝不报错；
//! 只有 YAML 本身无法解析时才返回 `WorthError::Config`。

use crate::error::{Result, WorthError};
use crate::models::{Tier, TierBounds};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::{debug, info};

pub const DEFAULT_PRICE_SEED: i64 = 0xDEAD_BEEF;
pub const DEFAULT_CURRENCY_SYMBOL: &str = "$";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct PricingConfig {
    #[serde(deserialize_with = "null_as_default")]
    pub blacklist: HashSet<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub special_items: HashMap<String, i64>,
    #[serde(deserialize_with = "null_as_default")]
    pub tiers: HashMap<String, TierRange>,
    pub price_seed: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub display: DisplayConfig,
}

/// `tiers.<tier>` 段，两个键均可独立缺省
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TierRange {
    pub min: Option<i64>,
    pub max: Option<i64>,
}

/// 仅供外部打标协作方使用，定价核心本身不读取
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct DisplayConfig {
    pub inject_lore: bool,
    pub currency_symbol: String,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            inject_lore: true,
            currency_symbol: DEFAULT_CURRENCY_SYMBOL.to_string(),
        }
    }
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            blacklist: HashSet::new(),
            special_items: HashMap::new(),
            tiers: HashMap::new(),
            price_seed: DEFAULT_PRICE_SEED,
            display: DisplayConfig::default(),
        }
    }
}

/// 空段落 (`special-items:` 后无子项) 在 YAML 中是 null，按默认值处理
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// 只有空白与注释的文档视为空
pub(crate) fn is_blank_yaml(text: &str) -> bool {
    text.lines().map(str::trim).all(|line| line.is_empty() || line.starts_with('#'))
}

impl PricingConfig {
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        if is_blank_yaml(text) {
            return Ok(Self::default());
        }
        let parsed: Option<PricingConfig> = serde_yaml::from_str(text)?;
        Ok(parsed.unwrap_or_default())
    }

    /// 文件不存在时返回默认配置
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            info!(path = %path.display(), "config.yml 不存在，使用默认定价配置");
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path).map_err(|e| WorthError::io(path, e))?;
        let config = Self::from_yaml_str(&text).map_err(|e| match e {
            WorthError::Yaml(source) => WorthError::Config { path: path.to_path_buf(), source },
            other => other,
        })?;
        debug!(
            blacklist = config.blacklist.len(),
            special_items = config.special_items.len(),
            seed = config.price_seed,
            "定价配置已加载"
        );
        Ok(config)
    }

    /// 每个键独立回退到默认值；负数钳位到 0，超出 u32 的值钳位到 u32::MAX
    pub fn bounds_for(&self, tier: Tier) -> TierBounds {
        let defaults = tier.default_bounds();
        let range = self.tiers.get(tier.key()).copied().unwrap_or_default();
        TierBounds {
            min: range.min.unwrap_or(defaults.min),
            max: range.max.unwrap_or(defaults.max),
        }
        .clamped()
    }

    pub fn has_special_override(&self, name: &str) -> bool {
        self.special_items.contains_key(name)
    }

    /// 负值覆盖不生效 (价格必须非负)，超出 u32 的值饱和
    pub fn override_for(&self, name: &str) -> Option<u32> {
        let value = *self.special_items.get(name)?;
        if value < 0 {
            return None;
        }
        Some(value.min(u32::MAX as i64) as u32)
    }

    pub fn is_blacklisted(&self, name: &str) -> bool {
        self.blacklist.contains(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
price-seed: 1234
blacklist:
  - BEDROCK
  - DIAMOND
special-items:
  DIAMOND: 500
  DIRT: -3
tiers:
  common:
    min: 10
    max: 10
  rare:
    max: 999
display:
  inject-lore: false
  currency-symbol: "€"
"#;

    #[test]
    fn parses_all_recognized_options() {
        let cfg = PricingConfig::from_yaml_str(SAMPLE).unwrap();
        assert_eq!(cfg.price_seed, 1234);
        assert!(cfg.is_blacklisted("BEDROCK"));
        assert!(!cfg.is_blacklisted("STONE"));
        assert_eq!(cfg.override_for("DIAMOND"), Some(500));
        assert!(!cfg.display.inject_lore);
        assert_eq!(cfg.display.currency_symbol, "€");
    }

    #[test]
    fn missing_keys_fall_back_per_key() {
        let cfg = PricingConfig::from_yaml_str(SAMPLE).unwrap();
        assert_eq!(cfg.bounds_for(Tier::Common), TierBounds { min: 10, max: 10 });
        // rare 只配置了 max，min 仍为默认 40
        assert_eq!(cfg.bounds_for(Tier::Rare), TierBounds { min: 40, max: 999 });
        assert_eq!(cfg.bounds_for(Tier::Epic), Tier::Epic.default_bounds());
    }

    #[test]
    fn empty_document_and_empty_sections_are_defaults() {
        assert_eq!(PricingConfig::from_yaml_str("").unwrap(), PricingConfig::default());
        assert_eq!(PricingConfig::from_yaml_str("# nothing\n").unwrap(), PricingConfig::default());

        let cfg = PricingConfig::from_yaml_str("special-items:\nblacklist:\n").unwrap();
        assert!(cfg.special_items.is_empty());
        assert!(cfg.blacklist.is_empty());
        assert_eq!(cfg.price_seed, DEFAULT_PRICE_SEED);
    }

    #[test]
    fn negative_override_is_present_but_never_fires() {
        let cfg = PricingConfig::from_yaml_str(SAMPLE).unwrap();
        assert!(cfg.has_special_override("DIRT"));
        assert_eq!(cfg.override_for("DIRT"), None);
    }

    #[test]
    fn negative_bounds_clamp_to_zero() {
        let cfg = PricingConfig::from_yaml_str("tiers:\n  junk:\n    min: -50\n    max: -1\n").unwrap();
        assert_eq!(cfg.bounds_for(Tier::Junk), TierBounds { min: 0, max: 0 });
    }

    #[test]
    fn oversized_bounds_clamp_to_price_range() {
        let cfg = PricingConfig::from_yaml_str("tiers:\n  junk:\n    max: 9223372036854775807\n").unwrap();
        assert_eq!(cfg.bounds_for(Tier::Junk), TierBounds { min: 0, max: u32::MAX as i64 });
    }

    #[test]
    fn malformed_yaml_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yml");
        std::fs::write(&path, "blacklist: [unterminated\n").unwrap();
        assert!(matches!(PricingConfig::load(&path), Err(WorthError::Config { .. })));
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = PricingConfig::load(dir.path().join("config.yml")).unwrap();
        assert_eq!(cfg, PricingConfig::default());
    }
}
