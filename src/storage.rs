//! Durable Price Store
//!
//! 内存中的稠密价格表 (按 ItemId 序号索引) + 磁盘上的 `prices.yml` 镜像。
//! 内存是会话内的唯一事实来源 (SSoT)；磁盘写入在显式 `save_to_disk()` 前保持缓冲。
//!
//! 单条记录生命周期：
//! `Unset --set--> Cached --save_to_disk--> Persisted --clear_cache--> Unset`
//!
//! 本结构不加锁，由 `engine` 模块的单写者线程独占。

use crate::catalog::{Catalog, ItemId};
use crate::config::is_blank_yaml;
use chrono::{SecondsFormat, Utc};
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const PRICES_FILE: &str = "prices.yml";

// -----------------------------------------------------------------------------
// 记录状态
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordState {
    Unset,
    Cached,
    Persisted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Unset,
    Cached(u32),
    Persisted(u32),
}

impl Slot {
    #[inline]
    fn price(self) -> Option<u32> {
        match self {
            Slot::Unset => None,
            Slot::Cached(p) | Slot::Persisted(p) => Some(p),
        }
    }
}

// -----------------------------------------------------------------------------
// 存储实现
// -----------------------------------------------------------------------------

#[derive(Debug)]
pub struct PriceStore {
    catalog: Arc<Catalog>,
    path: PathBuf,
    slots: Vec<Slot>,
    cached: usize,
    skipped_on_load: usize,
}

impl PriceStore {
    /// 构造时同步加载磁盘镜像；任何读取/解析失败只记录日志，不向外传播
    pub fn open(path: impl Into<PathBuf>, catalog: Arc<Catalog>) -> Self {
        let mut store = Self {
            slots: vec![Slot::Unset; catalog.len()],
            catalog,
            path: path.into(),
            cached: 0,
            skipped_on_load: 0,
        };
        store.load_from_disk();
        store
    }

    /// 在数据目录下打开默认的 prices.yml
    pub fn open_in(data_dir: impl AsRef<Path>, catalog: Arc<Catalog>) -> Self {
        Self::open(data_dir.as_ref().join(PRICES_FILE), catalog)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn has(&self, id: ItemId) -> bool {
        self.slots[id.index()] != Slot::Unset
    }

    /// 缺失记录返回 0
    pub fn get(&self, id: ItemId) -> u32 {
        self.slots[id.index()].price().unwrap_or(0)
    }

    pub fn set(&mut self, id: ItemId, price: u32) {
        let slot = &mut self.slots[id.index()];
        if *slot == Slot::Unset {
            self.cached += 1;
        }
        *slot = Slot::Cached(price);
    }

    pub fn state(&self, id: ItemId) -> RecordState {
        match self.slots[id.index()] {
            Slot::Unset => RecordState::Unset,
            Slot::Cached(_) => RecordState::Cached,
            Slot::Persisted(_) => RecordState::Persisted,
        }
    }

    pub fn len(&self) -> usize {
        self.cached
    }

    pub fn is_empty(&self) -> bool {
        self.cached == 0
    }

    /// 上次加载时跳过的条目数 (未知键或非法值)
    pub fn skipped_on_load(&self) -> usize {
        self.skipped_on_load
    }

    pub fn entries(&self) -> impl Iterator<Item = (ItemId, u32)> + '_ {
        self.catalog
            .iter()
            .filter_map(move |(id, _)| self.slots[id.index()].price().map(|p| (id, p)))
    }

    /// 将完整内存表刷写到磁盘。失败仅告警，内存状态不受影响。
    pub fn save_to_disk(&mut self) -> bool {
        match self.write_snapshot() {
            Ok(()) => {
                for slot in self.slots.iter_mut() {
                    if let Slot::Cached(p) = *slot {
                        *slot = Slot::Persisted(p);
                    }
                }
                debug!(path = %self.path.display(), entries = self.cached, "价格快照已刷写");
                true
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Could not save prices.yml");
                false
            }
        }
    }

    /// 清空内存表并删除磁盘镜像
    pub fn clear_cache(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = Slot::Unset);
        self.cached = 0;
        if self.path.exists() {
            if let Err(e) = fs::remove_file(&self.path) {
                warn!(path = %self.path.display(), error = %e, "无法删除价格快照文件");
            }
        }
    }

    // -------------------------------------------------------------------------
    // 内部实现
    // -------------------------------------------------------------------------

    fn write_snapshot(&self) -> std::io::Result<()> {
        let table: BTreeMap<&str, u32> = self
            .entries()
            .map(|(id, price)| (self.catalog.name(id), price))
            .collect();

        let body = if table.is_empty() {
            String::new()
        } else {
            serde_yaml::to_string(&table)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?
        };
        let header = format!(
            "# Worth item prices - generated, edit config.yml special-items instead\n# saved {}\n",
            Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
        );

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        // 先写临时文件再原子替换，避免半截文件
        let tmp = self.path.with_extension("yml.tmp");
        fs::write(&tmp, header + &body)?;
        fs::rename(&tmp, &self.path)
    }

    fn load_from_disk(&mut self) {
        if !self.path.exists() {
            return;
        }
        let text = match fs::read_to_string(&self.path) {
            Ok(t) => t,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "无法读取 prices.yml，以空缓存启动");
                return;
            }
        };
        if is_blank_yaml(&text) {
            return;
        }
        let document: Value = match serde_yaml::from_str(&text) {
            Ok(v) => v,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "prices.yml 解析失败，以空缓存启动");
                return;
            }
        };
        let mapping = match document {
            Value::Mapping(m) => m,
            Value::Null => return,
            _ => {
                warn!(path = %self.path.display(), "prices.yml 顶层不是映射，以空缓存启动");
                return;
            }
        };

        let mut skipped = 0usize;
        for (key, value) in mapping {
            let id = key.as_str().and_then(|k| self.catalog.id(k));
            let price = value.as_u64().and_then(|p| u32::try_from(p).ok());
            match (id, price) {
                (Some(id), Some(price)) => {
                    if self.slots[id.index()] == Slot::Unset {
                        self.cached += 1;
                    }
                    self.slots[id.index()] = Slot::Persisted(price);
                }
                _ => skipped += 1,
            }
        }
        self.skipped_on_load = skipped;

        info!(loaded = self.cached, "Loaded {} cached prices from prices.yml", self.cached);
        if skipped > 0 {
            warn!(skipped, "prices.yml 中有 {} 条未知或非法条目被跳过", skipped);
        }
    }
}
