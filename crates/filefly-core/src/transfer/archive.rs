//! ZIP 流式打包
//!
//! 边压缩边写出到调用方提供的 sink，归档不在内存中完整驻留，
//! 也不经过磁盘暂存。缺失的文件跳过并计数，不中断整体任务。

use std::path::Path;

use async_zip::tokio::write::ZipFileWriter;
use async_zip::{Compression, ZipEntryBuilder};
use log::{debug, warn};
use tokio::fs::File;
use tokio::io::AsyncWrite;
use tokio_util::compat::FuturesAsyncWriteCompatExt;

use crate::error::{Result, StoreError};
use crate::store::resolve_entry;

/// 把指定文件打包成 ZIP 写入 sink，返回被跳过的名字数量
///
/// 名字按给定顺序处理，重复名产生重复条目；归档内路径是裸
/// 文件名，不带目录前缀。打包瞬间不存在或不是普通文件的名字
/// 被跳过。sink 被对端关闭（客户端中途断开）时以 I/O 错误
/// 返回，调用方按取消处理即可，不会有后续写出。
pub async fn stream_zip<W>(dir: &Path, names: &[String], sink: W) -> Result<usize>
where
    W: AsyncWrite + Unpin,
{
    let mut writer = ZipFileWriter::with_tokio(sink);
    let mut skipped = 0usize;

    for name in names {
        let Ok(path) = resolve_entry(dir, name) else {
            skipped += 1;
            continue;
        };
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => {
                debug!("Skipping non-regular entry: {}", name);
                skipped += 1;
                continue;
            }
            Err(_) => {
                debug!("Skipping missing entry: {}", name);
                skipped += 1;
                continue;
            }
        }
        let mut file = match File::open(&path).await {
            Ok(file) => file,
            Err(e) => {
                warn!("Failed to open {} for archiving: {}", name, e);
                skipped += 1;
                continue;
            }
        };

        let entry = ZipEntryBuilder::new(name.clone().into(), Compression::Deflate);
        let entry_writer = writer.write_entry_stream(entry).await.map_err(zip_err)?;
        let mut entry_sink = entry_writer.compat_write();
        tokio::io::copy(&mut file, &mut entry_sink).await?;
        entry_sink.into_inner().close().await.map_err(zip_err)?;
    }

    // 中央目录收尾
    writer.close().await.map_err(zip_err)?;
    Ok(skipped)
}

fn zip_err(e: async_zip::error::ZipError) -> StoreError {
    StoreError::Io(std::io::Error::other(e.to_string()))
}
