//! HTTP 范围下载
//!
//! 只支持单段 `bytes=<start>-[<end>]` 形式，满足浏览器媒体拖动
//! 和下载工具断点续传的最小需求，不支持 multipart 多段。

use std::io::{ErrorKind, SeekFrom};
use std::path::Path;

use axum::body::Body;
use axum::http::StatusCode;
use axum::http::header::{
    ACCEPT_RANGES, CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE, HeaderMap,
    HeaderValue,
};
use log::debug;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;

use crate::error::{Result, StoreError};

/// RFC 5987 `filename*` 编码中保留的字符
const FILENAME_ESCAPE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// 闭区间字节范围
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    /// 区间字节数
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// 闭区间至少包含一个字节
    pub fn is_empty(&self) -> bool {
        false
    }
}

/// 解析单段 Range 头
///
/// `end` 省略时默认为文件末字节，越界的 `end` 按 HTTP 语义收敛；
/// 格式错误、`start > end` 或 `start` 越界都返回 InvalidRange。
pub fn parse_range(header: &str, file_size: u64) -> Result<ByteRange> {
    let invalid = || StoreError::InvalidRange(format!("无法解析的 Range: {}", header));

    let spec = header.trim().strip_prefix("bytes=").ok_or_else(invalid)?;
    if spec.contains(',') {
        return Err(StoreError::InvalidRange("不支持多段范围".to_string()));
    }
    let (start, end) = spec.split_once('-').ok_or_else(invalid)?;
    let start: u64 = start.trim().parse().map_err(|_| invalid())?;
    let end: u64 = match end.trim() {
        "" => file_size.saturating_sub(1),
        text => text.parse().map_err(|_| invalid())?,
    };
    let end = end.min(file_size.saturating_sub(1));

    if start > end || start >= file_size {
        return Err(StoreError::InvalidRange(format!(
            "范围越界: {}-{} / {}",
            start, end, file_size
        )));
    }
    Ok(ByteRange { start, end })
}

/// 按可选 Range 头下载文件
///
/// 无 Range 返回 200 全量，合法 Range 返回 206 部分内容。
/// 响应体是惰性读取流，下载途中文件被删除表现为流中的
/// I/O 错误，不会使服务崩溃。
pub async fn serve_file(
    path: &Path,
    range_header: Option<&str>,
) -> Result<(StatusCode, HeaderMap, Body)> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let meta = match tokio::fs::metadata(path).await {
        Ok(meta) => meta,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(StoreError::NotFound(name));
        }
        Err(e) => return Err(e.into()),
    };
    if !meta.is_file() {
        return Err(StoreError::IsDirectory(name));
    }
    let file_size = meta.len();

    let mut headers = HeaderMap::new();
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_static("application/octet-stream"),
    );
    headers.insert(ACCEPT_RANGES, HeaderValue::from_static("bytes"));
    headers.insert(
        CONTENT_DISPOSITION,
        header_value(format!(
            "attachment; filename*=UTF-8''{}",
            utf8_percent_encode(&name, FILENAME_ESCAPE)
        ))?,
    );

    let mut file = File::open(path).await?;

    if let Some(header) = range_header {
        let range = parse_range(header, file_size)?;
        debug!(
            "Range download: {} bytes {}-{}/{}",
            name, range.start, range.end, file_size
        );
        file.seek(SeekFrom::Start(range.start)).await?;
        let stream = ReaderStream::new(file.take(range.len()));
        headers.insert(
            CONTENT_RANGE,
            header_value(format!(
                "bytes {}-{}/{}",
                range.start, range.end, file_size
            ))?,
        );
        headers.insert(CONTENT_LENGTH, header_value(range.len().to_string())?);
        return Ok((
            StatusCode::PARTIAL_CONTENT,
            headers,
            Body::from_stream(stream),
        ));
    }

    headers.insert(CONTENT_LENGTH, header_value(file_size.to_string())?);
    let stream = ReaderStream::new(file);
    Ok((StatusCode::OK, headers, Body::from_stream(stream)))
}

fn header_value(text: String) -> Result<HeaderValue> {
    HeaderValue::from_str(&text)
        .map_err(|_| StoreError::Io(std::io::Error::other("invalid header value")))
}
