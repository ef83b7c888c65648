use libc::{c_char, c_int, c_longlong, size_t};
use std::ffi::CStr;
use std::panic::{self, AssertUnwindSafe};
use std::ptr;
use std::sync::{PoisonError, RwLock};
use tracing::{error, warn, Level};
use tracing_subscriber::EnvFilter;

// -----------------------------------------------------------------------------
// 模块声明
// -----------------------------------------------------------------------------
pub mod catalog;
pub mod config;
pub mod display;
pub mod engine;
pub mod error;
pub mod models;
pub mod pricing;
pub mod storage;

pub use catalog::{Catalog, ItemId};
pub use config::PricingConfig;
pub use engine::EngineHandle;
pub use error::{Result, WorthError};
pub use models::{PriceQuote, Tier, TierBounds};
pub use pricing::PriceResolver;
pub use storage::PriceStore;

// -----------------------------------------------------------------------------
// 0. 错误通讯协议 (The Protocol)
// -----------------------------------------------------------------------------

#[repr(i32)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum WorthStatus {
    Ok = 0,
    NullPointer = 1,
    InvalidValue = 2,
    UnknownItem = 3,
    NotInitialized = 4,
    BufferTooSmall = 5,
    IoError = 10,
    Panic = 101,
    Fatal = 255,
}

impl From<&WorthError> for WorthStatus {
    fn from(e: &WorthError) -> Self {
        match e {
            WorthError::UnknownItem(_) => WorthStatus::UnknownItem,
            WorthError::EngineStopped => WorthStatus::NotInitialized,
            WorthError::InvalidArgument(_) | WorthError::Config { .. } | WorthError::Yaml(_) => {
                WorthStatus::InvalidValue
            }
            WorthError::Io { .. } => WorthStatus::IoError,
        }
    }
}

// -----------------------------------------------------------------------------
// 全局状态
// -----------------------------------------------------------------------------
/// `worth_shutdown` 取出句柄，`worth_init` 可再次放入新引擎
static ENGINE: RwLock<Option<EngineHandle>> = RwLock::new(None);

// -----------------------------------------------------------------------------
// FFI 安全屏障 (The Firewall)
// -----------------------------------------------------------------------------

macro_rules! ffi_guard {
    ($body:expr) => {{
        let result = panic::catch_unwind(AssertUnwindSafe($body));
        match result {
            Ok(status) => status as c_int,
            Err(e) => {
                let msg = if let Some(s) = e.downcast_ref::<&str>() {
                    *s
                } else if let Some(s) = e.downcast_ref::<String>() {
                    s.as_str()
                } else {
                    "Unknown panic"
                };
                error!("[Worth-Native] PANIC INTERCEPTED: {}", msg);
                WorthStatus::Panic as c_int
            }
        }
    }};
}

/// 将引擎结果映射为状态码，成功时交给 `write` 写出参数
macro_rules! engine_call {
    ($call:expr, |$value:ident| $write:expr) => {{
        match $call {
            Ok($value) => {
                $write;
                WorthStatus::Ok
            }
            Err(e) => {
                warn!(error = %e, "定价请求失败");
                WorthStatus::from(&e)
            }
        }
    }};
}

unsafe fn read_c_str<'a>(p: *const c_char) -> std::result::Result<&'a str, WorthStatus> {
    if p.is_null() {
        return Err(WorthStatus::NullPointer);
    }
    CStr::from_ptr(p).to_str().map_err(|_| WorthStatus::InvalidValue)
}

/// 在读锁内访问当前引擎
fn with_engine(f: impl FnOnce(&EngineHandle) -> WorthStatus) -> WorthStatus {
    let slot = ENGINE.read().unwrap_or_else(PoisonError::into_inner);
    match slot.as_ref() {
        Some(engine) => f(engine),
        None => WorthStatus::NotInitialized,
    }
}

unsafe fn with_item(
    item_ptr: *const c_char,
    f: impl FnOnce(&EngineHandle, &str) -> WorthStatus,
) -> WorthStatus {
    with_engine(|engine| match read_c_str(item_ptr) {
        Ok(item) => f(engine, item),
        Err(status) => status,
    })
}

/// 安装 tracing 订阅器；重复安装被忽略。`RUST_LOG` 优先于传入级别。
pub fn init_logging(level: Level) {
    let filter = EnvFilter::from_default_env().add_directive(level.into());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}

// -----------------------------------------------------------------------------
// 1. 系统基础
// -----------------------------------------------------------------------------

#[no_mangle]
pub extern "C" fn worth_abi_version() -> c_int {
    0x0003_0000
}

#[no_mangle]
pub extern "C" fn worth_version() -> *const c_char {
    static VERSION: &[u8] = b"Worth Items Native Core v0.3.0\0";
    VERSION.as_ptr() as *const c_char
}

/// 0=ERROR 1=WARN 2=INFO 3=DEBUG 4=TRACE
#[no_mangle]
pub extern "C" fn worth_init_logging(level: c_int) -> c_int {
    ffi_guard!(|| {
        let level = match level {
            0 => Level::ERROR,
            1 => Level::WARN,
            2 => Level::INFO,
            3 => Level::DEBUG,
            4 => Level::TRACE,
            _ => return WorthStatus::InvalidValue,
        };
        init_logging(level);
        WorthStatus::Ok
    })
}

// -----------------------------------------------------------------------------
// 2. 引擎生命周期
// -----------------------------------------------------------------------------

/// 启动定价引擎并预计算全部价格；引擎已在运行时直接返回 Ok
///
/// `catalog_ptr` 为按宿主枚举顺序排列、换行分隔的物品标识符文本。
#[no_mangle]
pub unsafe extern "C" fn worth_init(
    data_dir_ptr: *const c_char,
    catalog_ptr: *const c_char,
) -> c_int {
    ffi_guard!(|| {
        // 写锁贯穿整个启动过程，并发初始化只会启动一个引擎
        let mut slot = ENGINE.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(current) = slot.as_ref() {
            if current.is_running() {
                return WorthStatus::Ok;
            }
            warn!("检测到已停止的定价引擎，重新启动");
        }
        let data_dir = match read_c_str(data_dir_ptr) {
            Ok(s) => s,
            Err(status) => return status,
        };
        let catalog = match read_c_str(catalog_ptr) {
            Ok(text) => Catalog::parse(text),
            Err(status) => return status,
        };

        let handle = match EngineHandle::start(data_dir, catalog) {
            Ok(h) => h,
            Err(e) => {
                error!(error = %e, "定价引擎启动失败");
                return WorthStatus::from(&e);
            }
        };
        if let Err(e) = handle.precompute() {
            error!(error = %e, "启动预计算失败");
            let _ = handle.shutdown();
            return WorthStatus::Fatal;
        }
        *slot = Some(handle);
        WorthStatus::Ok
    })
}

/// 刷写并停止引擎；之后可再次调用 `worth_init`
#[no_mangle]
pub extern "C" fn worth_shutdown() -> c_int {
    ffi_guard!(|| {
        let handle = ENGINE
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match handle {
            Some(engine) => engine_call!(engine.shutdown(), |_saved| ()),
            None => WorthStatus::NotInitialized,
        }
    })
}

#[no_mangle]
pub extern "C" fn worth_reload(out_count: *mut c_longlong) -> c_int {
    ffi_guard!(|| with_engine(|engine| {
        engine_call!(engine.reload(), |count| if !out_count.is_null() {
            unsafe { *out_count = count as c_longlong }
        })
    }))
}

#[no_mangle]
pub extern "C" fn worth_refresh_config() -> c_int {
    ffi_guard!(|| with_engine(|engine| engine_call!(engine.refresh_config(), |_unit| ())))
}

#[no_mangle]
pub extern "C" fn worth_precompute(out_count: *mut c_longlong) -> c_int {
    ffi_guard!(|| with_engine(|engine| {
        engine_call!(engine.precompute(), |count| if !out_count.is_null() {
            unsafe { *out_count = count as c_longlong }
        })
    }))
}

/// 刷写失败时返回 IoError (内存缓存保持不变)
#[no_mangle]
pub extern "C" fn worth_save() -> c_int {
    ffi_guard!(|| with_engine(|engine| match engine.save() {
        Ok(true) => WorthStatus::Ok,
        Ok(false) => WorthStatus::IoError,
        Err(e) => WorthStatus::from(&e),
    }))
}

// -----------------------------------------------------------------------------
// 3. 价格查询
// -----------------------------------------------------------------------------

#[no_mangle]
pub unsafe extern "C" fn worth_get_price(
    item_ptr: *const c_char,
    out_price: *mut c_longlong,
) -> c_int {
    ffi_guard!(|| {
        if out_price.is_null() {
            return WorthStatus::NullPointer;
        }
        with_item(item_ptr, |engine, item| {
            engine_call!(engine.price(item), |price| *out_price = price as c_longlong)
        })
    })
}

#[no_mangle]
pub unsafe extern "C" fn worth_get_tier(item_ptr: *const c_char, out_tier: *mut c_int) -> c_int {
    ffi_guard!(|| {
        if out_tier.is_null() {
            return WorthStatus::NullPointer;
        }
        with_item(item_ptr, |engine, item| {
            engine_call!(engine.tier(item), |tier| *out_tier = tier as c_int)
        })
    })
}

#[no_mangle]
pub unsafe extern "C" fn worth_get_quote(
    item_ptr: *const c_char,
    out_quote: *mut PriceQuote,
) -> c_int {
    ffi_guard!(|| {
        if out_quote.is_null() {
            return WorthStatus::NullPointer;
        }
        with_item(item_ptr, |engine, item| {
            engine_call!(engine.quote(item), |quote| ptr::write(out_quote, quote))
        })
    })
}

#[no_mangle]
pub unsafe extern "C" fn worth_has_special_override(
    item_ptr: *const c_char,
    out_flag: *mut c_int,
) -> c_int {
    ffi_guard!(|| {
        if out_flag.is_null() {
            return WorthStatus::NullPointer;
        }
        with_item(item_ptr, |engine, item| {
            engine_call!(engine.has_special_override(item), |flag| *out_flag = flag as c_int)
        })
    })
}

#[no_mangle]
pub unsafe extern "C" fn worth_is_blacklisted(
    item_ptr: *const c_char,
    out_flag: *mut c_int,
) -> c_int {
    ffi_guard!(|| {
        if out_flag.is_null() {
            return WorthStatus::NullPointer;
        }
        with_item(item_ptr, |engine, item| {
            engine_call!(engine.is_blacklisted(item), |flag| *out_flag = flag as c_int)
        })
    })
}

/// 整组物品估值 (单价 × 数量)
#[no_mangle]
pub unsafe extern "C" fn worth_total_value(
    item_ptr: *const c_char,
    amount: c_int,
    out_total: *mut c_longlong,
) -> c_int {
    ffi_guard!(|| {
        if out_total.is_null() {
            return WorthStatus::NullPointer;
        }
        if amount < 0 {
            return WorthStatus::InvalidValue;
        }
        with_item(item_ptr, |engine, item| {
            engine_call!(engine.total_value(item, amount as u32), |total| {
                *out_total = total.min(c_longlong::MAX as u64) as c_longlong
            })
        })
    })
}

/// 将 `Worth: $1,234` 写入调用方缓冲区 (含结尾 NUL)
///
/// 缓冲区不足时返回 BufferTooSmall，`out_len` 给出所需字节数 (含 NUL)。
#[no_mangle]
pub unsafe extern "C" fn worth_format_worth_line(
    item_ptr: *const c_char,
    buf: *mut c_char,
    buf_len: size_t,
    out_len: *mut size_t,
) -> c_int {
    ffi_guard!(|| {
        if out_len.is_null() {
            return WorthStatus::NullPointer;
        }
        with_item(item_ptr, |engine, item| {
            let line = match engine.worth_line(item) {
                Ok(line) => line,
                Err(e) => return WorthStatus::from(&e),
            };

            let needed = line.len() + 1;
            *out_len = needed;
            if buf.is_null() || buf_len < needed {
                return WorthStatus::BufferTooSmall;
            }
            ptr::copy_nonoverlapping(line.as_ptr() as *const c_char, buf, line.len());
            *buf.add(line.len()) = 0;
            WorthStatus::Ok
        })
    })
}
