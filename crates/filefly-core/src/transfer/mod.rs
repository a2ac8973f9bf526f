//! 传输层
//!
//! 下载端点背后的两个组件：HTTP 范围下载和 ZIP 流式打包。
//! 两者的响应体都是惰性产出的字节流，挂起点只在文件 I/O 和
//! 网络写出，全程不把文件内容整体载入内存。

pub mod archive;
pub mod range;

pub use archive::stream_zip;
pub use range::{ByteRange, parse_range, serve_file};
