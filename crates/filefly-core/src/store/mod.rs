//! 共享目录管理
//!
//! 文件清单、扩展名分类、唯一命名以及删除/清理操作。
//! 共享目录里的普通文件是唯一的持久状态，所有记录都即时从
//! 文件系统构建，不做缓存。

pub mod classify;
pub mod inventory;
pub mod naming;

pub use classify::{FileCategory, classify, icon};
pub use inventory::{FileRecord, format_size, format_time, list};
pub use naming::{MAX_ALLOC_ATTEMPTS, allocate, create_unique};

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use log::{info, warn};
use tokio::fs;

use crate::error::{Result, StoreError};

/// 取出客户端提供名字的最后一个路径分量
///
/// 上传的期望名可能带目录前缀（整夹上传），只保留文件名本体；
/// 空名和相对分量视为非法。
pub fn sanitize_name(raw: &str) -> Option<&str> {
    let name = raw.rsplit(['/', '\\']).next().unwrap_or(raw).trim();
    match name {
        "" | "." | ".." => None,
        _ => Some(name),
    }
}

/// 把客户端提供的名字解析为共享目录内的路径
///
/// 只接受单一路径分量。带分隔符或 `..` 的名字在扁平的共享
/// 目录里不可能存在，统一按 NotFound 处理。
pub fn resolve_entry(dir: &Path, name: &str) -> Result<PathBuf> {
    if name.is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains('\\')
    {
        return Err(StoreError::NotFound(name.to_string()));
    }
    Ok(dir.join(name))
}

/// 创建共享目录（已存在时无操作）
pub async fn ensure_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).await?;
    Ok(())
}

/// 删除单个文件
///
/// 幂等语义：文件不存在时始终返回 NotFound，不产生副作用。
pub async fn delete_file(dir: &Path, name: &str) -> Result<()> {
    let path = resolve_entry(dir, name)?;
    let meta = match fs::metadata(&path).await {
        Ok(meta) => meta,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(StoreError::NotFound(name.to_string()));
        }
        Err(e) => return Err(e.into()),
    };
    if !meta.is_file() {
        return Err(StoreError::IsDirectory(name.to_string()));
    }
    // stat 和删除之间文件可能已被并发删除，结果仍按 NotFound 报告
    match fs::remove_file(&path).await {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(StoreError::NotFound(name.to_string()));
        }
        Err(e) => return Err(e.into()),
    }
    info!("Deleted file: {}", name);
    Ok(())
}

/// 清空共享目录，返回删除数量
///
/// 尽力而为：只删普通文件，单个文件失败不中断整体操作；
/// 目录不存在按已空处理。
pub async fn clear_dir(dir: &Path) -> Result<usize> {
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e.into()),
    };

    let mut count = 0;
    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => {
                warn!("Failed to enumerate share dir: {}", e);
                break;
            }
        };
        let path = entry.path();
        match fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => match fs::remove_file(&path).await {
                Ok(()) => count += 1,
                Err(e) => warn!("Failed to delete {:?}: {}", path, e),
            },
            Ok(_) => {}
            Err(e) => warn!("Failed to stat {:?}: {}", path, e),
        }
    }
    Ok(count)
}

/// 清理修改时间早于 `max_age` 的文件，返回删除数量
///
/// 尽力而为，和 [`clear_dir`] 同样的跳过策略。
pub async fn cleanup_older_than(dir: &Path, max_age: Duration) -> Result<usize> {
    let now = SystemTime::now();
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e.into()),
    };

    let mut count = 0;
    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => {
                warn!("Failed to enumerate share dir: {}", e);
                break;
            }
        };
        let path = entry.path();
        let meta = match fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => meta,
            _ => continue,
        };
        let expired = meta
            .modified()
            .ok()
            .and_then(|modified| now.duration_since(modified).ok())
            .map(|age| age > max_age)
            .unwrap_or(false);
        if expired {
            match fs::remove_file(&path).await {
                Ok(()) => {
                    info!("Auto cleanup: {:?}", path.file_name().unwrap_or_default());
                    count += 1;
                }
                Err(e) => warn!("Failed to clean up {:?}: {}", path, e),
            }
        }
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("a.txt"), Some("a.txt"));
        assert_eq!(sanitize_name("photos/a.jpg"), Some("a.jpg"));
        assert_eq!(sanitize_name("c:\\tmp\\a.jpg"), Some("a.jpg"));
        assert_eq!(sanitize_name(""), None);
        assert_eq!(sanitize_name("dir/"), None);
        assert_eq!(sanitize_name(".."), None);
        assert_eq!(sanitize_name("a/../b"), Some("b"));
    }

    #[test]
    fn test_resolve_entry_rejects_traversal() {
        let dir = Path::new("/srv/share");
        assert!(resolve_entry(dir, "a.txt").is_ok());
        assert!(matches!(
            resolve_entry(dir, "../etc/passwd"),
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            resolve_entry(dir, "sub/a.txt"),
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(resolve_entry(dir, ".."), Err(StoreError::NotFound(_))));
        assert!(matches!(resolve_entry(dir, ""), Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_file_idempotent_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path();

        // 两次删除同一个不存在的文件，结果一致且无副作用
        for _ in 0..2 {
            let err = delete_file(dir, "ghost.txt").await.unwrap_err();
            assert!(matches!(err, StoreError::NotFound(_)));
        }

        std::fs::write(dir.join("real.txt"), b"data").unwrap();
        delete_file(dir, "real.txt").await.unwrap();
        assert!(!dir.join("real.txt").exists());
        let err = delete_file(dir, "real.txt").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));

        // 被其他进程抢先删除的文件同样报 NotFound 而不是 I/O 错误
        std::fs::write(dir.join("raced.txt"), b"data").unwrap();
        std::fs::remove_file(dir.join("raced.txt")).unwrap();
        let err = delete_file(dir, "raced.txt").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_rejects_directory() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir(tmp.path().join("sub")).unwrap();

        let err = delete_file(tmp.path(), "sub").await.unwrap_err();
        assert!(matches!(err, StoreError::IsDirectory(_)));
        assert!(tmp.path().join("sub").exists());
    }

    #[tokio::test]
    async fn test_clear_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path();

        // 空目录清空返回 0
        assert_eq!(clear_dir(dir).await.unwrap(), 0);

        std::fs::write(dir.join("a.txt"), b"a").unwrap();
        std::fs::write(dir.join("b.txt"), b"b").unwrap();
        std::fs::create_dir(dir.join("sub")).unwrap();

        assert_eq!(clear_dir(dir).await.unwrap(), 2);
        // 子目录保留
        assert!(dir.join("sub").exists());
        assert_eq!(clear_dir(dir).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_clear_missing_dir_is_zero() {
        let count = clear_dir(Path::new("/does/not/exist")).await.unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_cleanup_older_than() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path();
        std::fs::write(dir.join("fresh.txt"), b"x").unwrap();

        // 刚写入的文件不会被一天的阈值清掉
        let count = cleanup_older_than(dir, Duration::from_secs(24 * 60 * 60))
            .await
            .unwrap();
        assert_eq!(count, 0);
        assert!(dir.join("fresh.txt").exists());

        // 阈值为零时所有文件都过期
        tokio::time::sleep(Duration::from_millis(20)).await;
        let count = cleanup_older_than(dir, Duration::ZERO).await.unwrap();
        assert_eq!(count, 1);
        assert!(!dir.join("fresh.txt").exists());
    }
}
