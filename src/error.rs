//! Error types for the Worth native core
//!
//! 只有边界操作 (配置加载、名称解析、引擎通讯) 返回错误；
//! 价格查询本身是全函数，永不失败。

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WorthError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error in {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Unknown item identifier: {0}")]
    UnknownItem(String),

    #[error("Pricing engine is not running")]
    EngineStopped,

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl WorthError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        WorthError::Io { path: path.into(), source }
    }
}

pub type Result<T> = std::result::Result<T, WorthError>;
