//! FileFly 核心库
//!
//! 局域网文件共享的核心实现：共享目录的文件清单、上传命名、
//! 范围下载与 ZIP 流式打包。HTTP 路由、密码门禁等由上层服务
//! 组装，核心组件只接受显式参数，不读任何全局状态。
//!
//! # 模块
//!
//! - **store**: 文件清单、扩展名分类、唯一命名、删除/清理
//! - **transfer**: HTTP 范围下载与 ZIP 流式打包
//! - **config**: 服务配置的存储和读取
//!
//! # 使用示例
//!
//! ```ignore
//! use filefly_core::{store, transfer};
//!
//! // 列出共享目录（目录不存在时返回空列表）
//! let records = store::list(&dir).await;
//!
//! // 上传时原子分配不冲突的文件名
//! let (file, final_name) = store::create_unique(&dir, "photo.jpg").await?;
//!
//! // 范围下载
//! let (status, headers, body) = transfer::serve_file(&path, Some("bytes=0-1023")).await?;
//!
//! // 打包下载，直接写入响应管道
//! let skipped = transfer::stream_zip(&dir, &names, sink).await?;
//! ```

pub mod config;
pub mod error;
pub mod store;
pub mod transfer;

pub use config::ServerConfig;
pub use error::{Result, StoreError};

// Store re-exports
pub use store::{FileCategory, FileRecord};

// Transfer re-exports
pub use transfer::{ByteRange, serve_file, stream_zip};
