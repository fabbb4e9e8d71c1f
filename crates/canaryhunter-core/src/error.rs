//! 错误类型
use std::path::PathBuf;

use thiserror::Error;

/// 选择失败：扫描完成但没有任何字通过全部过滤与熵阈值
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SelectionError {
    #[error("no stack canary found in leaked data")]
    NoCandidateFound,
}

/// 字节缓冲区不满足“正整数个 8 字节字”的布局要求（配置错误）
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum LayoutError {
    #[error("leak buffer is empty")]
    Empty,
    #[error("leak buffer length {len} is not a multiple of 8 bytes")]
    Misaligned { len: usize },
}

/// 泄露数据获取失败（由外部数据源产生，原样向上传递）
#[derive(Debug, Error)]
pub enum AcquisitionError {
    #[error("failed to read leak source {source_name}: {source}")]
    Io {
        source_name: String,
        #[source]
        source: std::io::Error,
    },
    #[error("leak source returned {got} bytes, expected {expected}")]
    ShortRead { expected: usize, got: usize },
    #[error(transparent)]
    Layout(#[from] LayoutError),
}

/// 获取 + 选择组合调用的两类失败
#[derive(Debug, Error)]
pub enum LeakError {
    #[error("acquisition failed: {0}")]
    Acquisition(#[from] AcquisitionError),
    #[error(transparent)]
    Selection(#[from] SelectionError),
}

/// 启发式配置文件加载失败
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("failed to read profile {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse profile {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid profile {path}: {reason}")]
    Invalid { path: PathBuf, reason: String },
}
