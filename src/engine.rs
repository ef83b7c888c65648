//! Single-Writer Pricing Engine
//!
//! 价格缓存不支持并发修改，因此由一个专用线程独占 `PriceResolver` (及其 Store)。
//! 任何调用方 (事件钩子、命令、异步任务) 都通过 `EngineHandle` 把请求投递到通道，
//! 再在各自的一次性应答通道上等待结果。请求按到达顺序串行执行。

use crate::catalog::{Catalog, ItemId};
use crate::config::{DisplayConfig, PricingConfig};
use crate::display;
use crate::error::{Result, WorthError};
use crate::models::{PriceQuote, Tier};
use crate::pricing::{appraisal, PriceResolver};
use crate::storage::PriceStore;
use crossbeam_channel::{bounded, Receiver, Sender};
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, warn};

pub const CONFIG_FILE: &str = "config.yml";
const QUEUE_CAPACITY: usize = 1024;

// -----------------------------------------------------------------------------
// 请求协议
// -----------------------------------------------------------------------------

enum Command {
    Price { item: String, reply: Sender<Result<u32>> },
    Tier { item: String, reply: Sender<Result<Tier>> },
    Quote { item: String, reply: Sender<Result<PriceQuote>> },
    HasOverride { item: String, reply: Sender<Result<bool>> },
    Blacklisted { item: String, reply: Sender<Result<bool>> },
    TotalValue { item: String, amount: u32, reply: Sender<Result<u64>> },
    WorthLine { item: String, reply: Sender<Result<String>> },
    Display { reply: Sender<DisplayConfig> },
    Reload { reply: Sender<Result<usize>> },
    RefreshConfig { reply: Sender<Result<()>> },
    Precompute { reply: Sender<usize> },
    Save { reply: Sender<bool> },
    Shutdown { reply: Sender<bool> },
}

// -----------------------------------------------------------------------------
// 调用方句柄
// -----------------------------------------------------------------------------

pub struct EngineHandle {
    sender: Sender<Command>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl EngineHandle {
    /// 加载 config.yml 与 prices.yml 并启动引擎线程
    pub fn start(data_dir: impl AsRef<Path>, catalog: Catalog) -> Result<Self> {
        let data_dir = data_dir.as_ref();
        if catalog.is_empty() {
            return Err(WorthError::InvalidArgument("item catalog is empty".into()));
        }
        let config_path = data_dir.join(CONFIG_FILE);
        let config = PricingConfig::load(&config_path)?;

        let catalog = Arc::new(catalog);
        let store = PriceStore::open_in(data_dir, catalog.clone());
        let resolver = PriceResolver::new(catalog.clone(), store, config);

        let (tx, rx) = bounded(QUEUE_CAPACITY);
        let worker = Worker { resolver, config_path };
        let thread = thread::Builder::new()
            .name("worth-pricing-engine".into())
            .spawn(move || worker.run(rx))
            .map_err(|e| WorthError::io(data_dir, e))?;

        info!(items = catalog.len(), data_dir = %data_dir.display(), "Worth 定价引擎已启动");
        Ok(Self {
            sender: tx,
            thread: Mutex::new(Some(thread)),
        })
    }

    fn request<T>(&self, build: impl FnOnce(Sender<T>) -> Command) -> Result<T> {
        let (reply, response) = bounded(1);
        self.sender
            .send(build(reply))
            .map_err(|_| WorthError::EngineStopped)?;
        response.recv().map_err(|_| WorthError::EngineStopped)
    }

    pub fn price(&self, item: &str) -> Result<u32> {
        let item = item.to_string();
        self.request(|reply| Command::Price { item, reply })?
    }

    pub fn tier(&self, item: &str) -> Result<Tier> {
        let item = item.to_string();
        self.request(|reply| Command::Tier { item, reply })?
    }

    pub fn quote(&self, item: &str) -> Result<PriceQuote> {
        let item = item.to_string();
        self.request(|reply| Command::Quote { item, reply })?
    }

    pub fn has_special_override(&self, item: &str) -> Result<bool> {
        let item = item.to_string();
        self.request(|reply| Command::HasOverride { item, reply })?
    }

    pub fn is_blacklisted(&self, item: &str) -> Result<bool> {
        let item = item.to_string();
        self.request(|reply| Command::Blacklisted { item, reply })?
    }

    pub fn total_value(&self, item: &str, amount: u32) -> Result<u64> {
        let item = item.to_string();
        self.request(|reply| Command::TotalValue { item, amount, reply })?
    }

    /// `Worth: $1,234`，使用配置中的货币符号
    pub fn worth_line(&self, item: &str) -> Result<String> {
        let item = item.to_string();
        self.request(|reply| Command::WorthLine { item, reply })?
    }

    pub fn display_settings(&self) -> Result<DisplayConfig> {
        self.request(|reply| Command::Display { reply })
    }

    /// 重新读取 config.yml、清空缓存并重新预计算；配置无法解析时保持旧状态
    pub fn reload(&self) -> Result<usize> {
        self.request(|reply| Command::Reload { reply })?
    }

    /// 重新读取 config.yml，但保留已缓存价格
    pub fn refresh_config(&self) -> Result<()> {
        self.request(|reply| Command::RefreshConfig { reply })?
    }

    pub fn precompute(&self) -> Result<usize> {
        self.request(|reply| Command::Precompute { reply })
    }

    pub fn save(&self) -> Result<bool> {
        self.request(|reply| Command::Save { reply })
    }

    /// 引擎线程是否仍在运行
    pub fn is_running(&self) -> bool {
        self.thread
            .lock()
            .map(|thread| thread.as_ref().is_some_and(|t| !t.is_finished()))
            .unwrap_or(false)
    }

    /// 刷写并停止引擎线程；之后的请求返回 `EngineStopped`
    pub fn shutdown(&self) -> Result<bool> {
        let saved = self.request(|reply| Command::Shutdown { reply })?;
        let thread = self
            .thread
            .lock()
            .map_err(|_| WorthError::EngineStopped)?
            .take();
        if let Some(thread) = thread {
            if thread.join().is_err() {
                warn!("定价引擎线程异常退出");
            }
        }
        Ok(saved)
    }
}

// -----------------------------------------------------------------------------
// 引擎线程
// -----------------------------------------------------------------------------

struct Worker {
    resolver: PriceResolver,
    config_path: PathBuf,
}

impl Worker {
    fn run(mut self, rx: Receiver<Command>) {
        for command in rx.iter() {
            // 单个请求 panic 不终止引擎；该请求的应答通道随之关闭
            match panic::catch_unwind(AssertUnwindSafe(|| self.handle(command))) {
                Ok(true) => {}
                Ok(false) => return,
                Err(_) => error!("定价请求处理中发生 panic，引擎继续运行"),
            }
        }
        // 所有句柄均已释放：做最后一次刷写
        self.resolver.save_to_disk();
    }

    /// 返回 false 表示退出循环
    fn handle(&mut self, command: Command) -> bool {
        // 应答方可能已放弃等待，发送失败可忽略
        match command {
            Command::Price { item, reply } => {
                let _ = reply.send(self.with_item(&item, |r, id| r.get_price(id)));
            }
            Command::Tier { item, reply } => {
                let _ = reply.send(self.with_item(&item, |r, id| r.tier_of(id)));
            }
            Command::Quote { item, reply } => {
                let _ = reply.send(self.with_item(&item, |r, id| r.quote(id)));
            }
            Command::HasOverride { item, reply } => {
                let _ = reply.send(self.with_item(&item, |r, id| r.has_special_override(id)));
            }
            Command::Blacklisted { item, reply } => {
                let _ = reply.send(self.with_item(&item, |r, id| r.is_blacklisted(id)));
            }
            Command::TotalValue { item, amount, reply } => {
                let result = self.with_item(&item, |r, id| {
                    appraisal::stack_value(r.get_price(id), amount)
                });
                let _ = reply.send(result);
            }
            Command::WorthLine { item, reply } => {
                let result = self.with_item(&item, |r, id| {
                    let price = r.get_price(id) as u64;
                    display::worth_line(price, &r.config().display.currency_symbol)
                });
                let _ = reply.send(result);
            }
            Command::Display { reply } => {
                let _ = reply.send(self.resolver.config().display.clone());
            }
            Command::Reload { reply } => {
                let _ = reply.send(self.reload());
            }
            Command::RefreshConfig { reply } => {
                let result = PricingConfig::load(&self.config_path)
                    .map(|config| self.resolver.apply_config(config));
                let _ = reply.send(result);
            }
            Command::Precompute { reply } => {
                let _ = reply.send(self.resolver.precompute_all());
            }
            Command::Save { reply } => {
                let _ = reply.send(self.resolver.save_to_disk());
            }
            Command::Shutdown { reply } => {
                let saved = self.resolver.save_to_disk();
                info!(saved, "Worth 定价引擎已停止");
                let _ = reply.send(saved);
                return false;
            }
        }
        true
    }

    fn with_item<T>(
        &mut self,
        item: &str,
        op: impl FnOnce(&mut PriceResolver, ItemId) -> T,
    ) -> Result<T> {
        let id = self.resolver.catalog().require(item)?;
        debug!(item, "处理定价请求");
        Ok(op(&mut self.resolver, id))
    }

    fn reload(&mut self) -> Result<usize> {
        let config = PricingConfig::load(&self.config_path)?;
        self.resolver.reload(config);
        let count = self.resolver.precompute_all();
        info!(count, "Worth Items full reload complete");
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn catalog() -> Catalog {
        Catalog::new(["STONE", "DIAMOND", "NETHER_STAR", "BEDROCK"])
    }

    #[test]
    fn serves_queries_through_the_engine_thread() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE),
            "special-items:\n  DIAMOND: 1500\nblacklist: [BEDROCK]\n",
        )
        .unwrap();
        let engine = EngineHandle::start(dir.path(), catalog()).unwrap();

        assert_eq!(engine.price("DIAMOND").unwrap(), 1500);
        assert!(engine.has_special_override("DIAMOND").unwrap());
        assert_eq!(engine.price("BEDROCK").unwrap(), 0);
        assert!(engine.is_blacklisted("BEDROCK").unwrap());
        assert_eq!(engine.tier("NETHER_STAR").unwrap(), Tier::Legendary);
        assert_eq!(engine.total_value("DIAMOND", 3).unwrap(), 4500);
        assert_eq!(engine.worth_line("DIAMOND").unwrap(), "Worth: $1,500");

        let stone = engine.price("STONE").unwrap();
        assert_eq!(engine.price("STONE").unwrap(), stone);
        assert!(matches!(engine.price("AIR"), Err(WorthError::UnknownItem(_))));

        assert!(engine.is_running());
        assert!(engine.shutdown().unwrap());
        assert!(!engine.is_running());
        assert!(matches!(engine.price("STONE"), Err(WorthError::EngineStopped)));
    }

    #[test]
    fn extreme_tier_bounds_keep_the_engine_alive() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE),
            "tiers:\n  junk:\n    max: 9223372036854775807\n",
        )
        .unwrap();
        let engine = EngineHandle::start(dir.path(), Catalog::new(["DIRT", "NETHER_STAR"])).unwrap();

        let dirt = engine.price("DIRT").unwrap();
        assert!(dirt <= i32::MAX as u32);
        assert!(engine.price("NETHER_STAR").is_ok());
        assert!(engine.precompute().unwrap() <= 2);
        assert!(engine.is_running());
        engine.shutdown().unwrap();
    }

    #[test]
    fn prices_survive_a_restart() {
        let dir = TempDir::new().unwrap();
        let engine = EngineHandle::start(dir.path(), catalog()).unwrap();
        assert_eq!(engine.precompute().unwrap(), 4);
        let before = engine.quote("NETHER_STAR").unwrap();
        engine.shutdown().unwrap();

        // 换一个种子：若价格重新生成就会变化，读取缓存则保持不变
        fs::write(dir.path().join(CONFIG_FILE), "price-seed: 99\n").unwrap();
        let engine = EngineHandle::start(dir.path(), catalog()).unwrap();
        assert_eq!(engine.quote("NETHER_STAR").unwrap(), before);
        engine.shutdown().unwrap();
    }

    #[test]
    fn reload_applies_new_bounds_and_refresh_keeps_cache() {
        let dir = TempDir::new().unwrap();
        let engine = EngineHandle::start(dir.path(), catalog()).unwrap();
        let stone = engine.price("STONE").unwrap();

        fs::write(
            dir.path().join(CONFIG_FILE),
            "tiers:\n  common:\n    min: 10\n    max: 10\ndisplay:\n  currency-symbol: \"£\"\n",
        )
        .unwrap();
        engine.refresh_config().unwrap();
        assert_eq!(engine.price("STONE").unwrap(), stone);
        assert_eq!(engine.display_settings().unwrap().currency_symbol, "£");

        engine.reload().unwrap();
        assert_eq!(engine.price("STONE").unwrap(), 10);
        engine.shutdown().unwrap();
    }

    #[test]
    fn broken_config_on_reload_keeps_previous_state() {
        let dir = TempDir::new().unwrap();
        let engine = EngineHandle::start(dir.path(), catalog()).unwrap();
        let stone = engine.price("STONE").unwrap();

        fs::write(dir.path().join(CONFIG_FILE), "tiers: [oops\n").unwrap();
        assert!(matches!(engine.reload(), Err(WorthError::Config { .. })));
        assert_eq!(engine.price("STONE").unwrap(), stone);
        engine.shutdown().unwrap();
    }

    #[test]
    fn rejects_an_empty_catalog() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            EngineHandle::start(dir.path(), Catalog::default()),
            Err(WorthError::InvalidArgument(_))
        ));
    }
}
