//! 上传文件名分配
//!
//! 重名时在扩展名前追加 ` (n)` 计数器，和桌面文件管理器的习惯
//! 一致。[`allocate`] 只做咨询性检查，真正写入用 [`create_unique`]
//! 的原子独占创建兜底并发冲突：两个上传同时抢同一个期望名时，
//! 后到的一方顺延到下一个候选名，不会互相覆盖。

use std::io;
use std::path::Path;

use log::debug;
use tokio::fs::{File, OpenOptions};

use crate::error::{Result, StoreError};

/// 候选名尝试上限
///
/// 目录被预先塞满同名文件属于病态场景，超出上限按 I/O 失败
/// 处理，避免无限循环。
pub const MAX_ALLOC_ATTEMPTS: u32 = 10_000;

/// 生成第 n 个候选名：`base (n).ext`
///
/// 按最后一个扩展名分隔符拆分；无扩展名（含 `.gitignore` 这类
/// 隐藏文件）时计数器直接缀在末尾。
fn candidate(name: &str, n: u32) -> String {
    let path = Path::new(name);
    match (
        path.file_stem().and_then(|s| s.to_str()),
        path.extension().and_then(|s| s.to_str()),
    ) {
        (Some(stem), Some(ext)) => format!("{} ({}).{}", stem, n, ext),
        _ => format!("{} ({})", name, n),
    }
}

/// 咨询性名字分配：返回目录中当前不存在的文件名
///
/// 调用后到实际写入之间存在竞态窗口，写入方必须用
/// [`create_unique`] 重新校验。
pub fn allocate(dir: &Path, desired: &str) -> Result<String> {
    if !dir.join(desired).exists() {
        return Ok(desired.to_string());
    }
    for n in 1..=MAX_ALLOC_ATTEMPTS {
        let name = candidate(desired, n);
        if !dir.join(&name).exists() {
            return Ok(name);
        }
    }
    Err(exhausted(desired))
}

/// 原子分配并创建上传目标文件，返回句柄和最终名字
///
/// 用平台的独占创建原语（`create_new`）代替先检查后写入，
/// 撞名时顺延到下一个候选名重试，重试次数同样有上限。
pub async fn create_unique(dir: &Path, desired: &str) -> Result<(File, String)> {
    let mut attempt: u32 = 0;
    loop {
        let name = if attempt == 0 {
            desired.to_string()
        } else {
            candidate(desired, attempt)
        };
        let path = dir.join(&name);
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => {
                if attempt > 0 {
                    debug!("Name collision resolved: {} -> {}", desired, name);
                }
                return Ok((file, name));
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                attempt += 1;
                if attempt > MAX_ALLOC_ATTEMPTS {
                    return Err(exhausted(desired));
                }
            }
            Err(e) => return Err(e.into()),
        }
    }
}

fn exhausted(desired: &str) -> StoreError {
    StoreError::Io(io::Error::new(
        io::ErrorKind::AlreadyExists,
        format!("name allocation exhausted for {}", desired),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_free_name_unchanged() {
        let tmp = tempfile::tempdir().unwrap();
        assert_eq!(allocate(tmp.path(), "a.txt").unwrap(), "a.txt");
    }

    #[test]
    fn test_allocate_counter_sequence() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path();

        std::fs::write(dir.join("a.txt"), b"1").unwrap();
        assert_eq!(allocate(dir, "a.txt").unwrap(), "a (1).txt");

        std::fs::write(dir.join("a (1).txt"), b"2").unwrap();
        assert_eq!(allocate(dir, "a.txt").unwrap(), "a (2).txt");
    }

    #[test]
    fn test_allocate_no_extension() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path();

        std::fs::write(dir.join("noext"), b"1").unwrap();
        assert_eq!(allocate(dir, "noext").unwrap(), "noext (1)");

        std::fs::write(dir.join(".gitignore"), b"1").unwrap();
        assert_eq!(allocate(dir, ".gitignore").unwrap(), ".gitignore (1)");
    }

    #[test]
    fn test_allocate_double_extension_splits_last() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path();

        std::fs::write(dir.join("backup.tar.gz"), b"1").unwrap();
        assert_eq!(allocate(dir, "backup.tar.gz").unwrap(), "backup.tar (1).gz");
    }

    #[tokio::test]
    async fn test_create_unique_sequence() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path();

        let (_f1, n1) = create_unique(dir, "a.txt").await.unwrap();
        let (_f2, n2) = create_unique(dir, "a.txt").await.unwrap();
        let (_f3, n3) = create_unique(dir, "a.txt").await.unwrap();

        assert_eq!(n1, "a.txt");
        assert_eq!(n2, "a (1).txt");
        assert_eq!(n3, "a (2).txt");
        assert!(dir.join("a (2).txt").exists());
    }

    #[tokio::test]
    async fn test_create_unique_concurrent_no_overwrite() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().to_path_buf();

        // 同一个期望名并发创建，最终名必须互不相同
        let mut handles = Vec::new();
        for _ in 0..8 {
            let dir = dir.clone();
            handles.push(tokio::spawn(async move {
                let (_file, name) = create_unique(&dir, "race.bin").await.unwrap();
                name
            }));
        }

        let mut names = Vec::new();
        for handle in handles {
            names.push(handle.await.unwrap());
        }
        names.sort();
        names.dedup();
        assert_eq!(names.len(), 8, "colliding uploads must get distinct names");
    }
}
