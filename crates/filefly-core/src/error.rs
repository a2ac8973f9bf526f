//! 错误类型
//!
//! 核心操作的错误分类。清单和打包对单个条目的失败采取跳过策略，
//! 范围下载和删除把错误原样抛给调用方，由服务层映射到 HTTP 状态码。

use thiserror::Error;

/// 核心操作错误
#[derive(Debug, Error)]
pub enum StoreError {
    /// 文件或目录在操作时不存在
    #[error("文件不存在: {0}")]
    NotFound(String),
    /// Range 请求格式错误或超出文件范围
    #[error("无效的范围请求: {0}")]
    InvalidRange(String),
    /// 目标不是普通文件
    #[error("不能操作目录: {0}")]
    IsDirectory(String),
    /// 底层 I/O 失败
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;
