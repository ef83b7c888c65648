//! Item Catalog
//!
//! 宿主环境 (服务端) 提供完整、固定、可枚举的物品标识符列表。
//! 标识符在列表中的位置即其稳定序号 (ordinal)，参与价格种子派生：
//! `itemSeed = globalSeed XOR ordinal`。因此宿主必须按其自身枚举顺序注册。

use crate::error::{Result, WorthError};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

/// 物品在目录中的稳定序号
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ItemId(u32);

impl ItemId {
    #[inline]
    pub fn ordinal(self) -> u32 {
        self.0
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    names: Vec<String>,
    index: HashMap<String, ItemId>,
}

impl Catalog {
    /// 空行忽略；重复名称保留首次出现的序号
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut catalog = Catalog::default();
        for raw in names {
            let name = raw.as_ref().trim();
            if name.is_empty() || catalog.index.contains_key(name) {
                continue;
            }
            let id = ItemId(catalog.names.len() as u32);
            catalog.names.push(name.to_string());
            catalog.index.insert(name.to_string(), id);
        }
        catalog
    }

    /// 每行一个标识符，`#` 开头为注释
    pub fn parse(text: &str) -> Self {
        Catalog::new(
            text.lines()
                .map(str::trim)
                .filter(|line| !line.starts_with('#')),
        )
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| WorthError::io(path, e))?;
        Ok(Catalog::parse(&text))
    }

    pub fn id(&self, name: &str) -> Option<ItemId> {
        self.index.get(name).copied()
    }

    /// 供边界层使用：未知名称转为错误
    pub fn require(&self, name: &str) -> Result<ItemId> {
        self.id(name).ok_or_else(|| WorthError::UnknownItem(name.to_string()))
    }

    pub fn name(&self, id: ItemId) -> &str {
        &self.names[id.index()]
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ItemId, &str)> + '_ {
        self.names
            .iter()
            .enumerate()
            .map(|(i, name)| (ItemId(i as u32), name.as_str()))
    }
}
