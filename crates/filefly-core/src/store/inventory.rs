//! 文件清单
//!
//! 每次请求都直接从文件系统构建记录，目录本身是唯一事实来源：
//! 文件被删除后记录自然消失，不存在失效缓存问题。

use std::path::Path;
use std::time::SystemTime;

use chrono::{DateTime, Local, SecondsFormat, Utc};
use log::warn;
use serde::Serialize;
use tokio::fs;

use super::classify::{FileCategory, classify, icon};

/// 单个文件的清单记录
///
/// 序列化字段名与前端约定的 JSON 形状一致。
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    pub name: String,
    pub size: u64,
    pub size_formatted: String,
    /// 修改时间，用于排序，不随记录序列化
    #[serde(skip)]
    pub modified: SystemTime,
    /// RFC 3339 / ISO 时间戳
    pub upload_time: String,
    /// 本地时间 `YYYY-MM-DD HH:MM:SS`
    pub upload_time_formatted: String,
    pub icon: &'static str,
    #[serde(rename = "type")]
    pub category: FileCategory,
}

/// 列出共享目录（只读）
///
/// 目录不存在返回空列表而不是错误；子目录和扫描途中消失的
/// 条目直接跳过，不中断整个清单。结果按修改时间倒序，最近的
/// 在前，时间相同时保持枚举顺序（稳定排序）。
pub async fn list(dir: &Path) -> Vec<FileRecord> {
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(_) => return Vec::new(),
    };

    let mut records = Vec::new();
    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => {
                warn!("Failed to enumerate share dir: {}", e);
                break;
            }
        };
        let name = entry.file_name().to_string_lossy().into_owned();
        let meta = match entry.metadata().await {
            Ok(meta) => meta,
            Err(e) => {
                warn!("Failed to stat {}: {}", name, e);
                continue;
            }
        };
        if !meta.is_file() {
            continue;
        }
        let modified = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        records.push(FileRecord {
            size: meta.len(),
            size_formatted: format_size(meta.len()),
            modified,
            upload_time: DateTime::<Utc>::from(modified)
                .to_rfc3339_opts(SecondsFormat::Millis, true),
            upload_time_formatted: format_time(modified),
            icon: icon(&name),
            category: classify(&name),
            name,
        });
    }

    records.sort_by(|a, b| b.modified.cmp(&a.modified));
    records
}

/// 人类可读的文件大小，1024 进制，保留两位小数
pub fn format_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 B".to_string();
    }
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let exp = ((bytes as f64).ln() / 1024_f64.ln()).floor() as usize;
    let exp = exp.min(UNITS.len() - 1);
    let value = bytes as f64 / 1024_f64.powi(exp as i32);
    format!("{:.2} {}", value, UNITS[exp])
}

/// 本地时间 `YYYY-MM-DD HH:MM:SS`
pub fn format_time(t: SystemTime) -> String {
    DateTime::<Local>::from(t).format("%Y-%m-%d %H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(500), "500.00 B");
        assert_eq!(format_size(1536), "1.50 KB");
        assert_eq!(format_size(1024 * 1024), "1.00 MB");
        assert_eq!(format_size(1_073_741_824), "1.00 GB");
        assert_eq!(format_size(1024_u64.pow(4)), "1.00 TB");
        // 超出 TB 仍用最大单位表示
        assert_eq!(format_size(1024_u64.pow(5)), "1024.00 TB");
    }

    #[test]
    fn test_format_time_shape() {
        let text = format_time(SystemTime::now());
        // YYYY-MM-DD HH:MM:SS
        assert_eq!(text.len(), 19);
        assert_eq!(&text[4..5], "-");
        assert_eq!(&text[10..11], " ");
        assert_eq!(&text[13..14], ":");
    }

    #[tokio::test]
    async fn test_list_missing_dir_is_empty() {
        let records = list(Path::new("/does/not/exist")).await;
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_list_newest_first_and_skips_dirs() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path();

        // 依次写入，保证修改时间可区分
        for name in ["old.txt", "mid.txt", "new.txt"] {
            std::fs::write(dir.join(name), b"data").unwrap();
            std::thread::sleep(Duration::from_millis(20));
        }
        std::fs::create_dir(dir.join("subdir")).unwrap();

        let records = list(dir).await;
        let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["new.txt", "mid.txt", "old.txt"]);
    }

    #[tokio::test]
    async fn test_record_fields_and_json_shape() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("photo.jpg"), vec![0u8; 1536]).unwrap();

        let records = list(tmp.path()).await;
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.name, "photo.jpg");
        assert_eq!(record.size, 1536);
        assert_eq!(record.size_formatted, "1.50 KB");
        assert_eq!(record.icon, "fa-file-image");
        assert_eq!(record.category, FileCategory::Image);

        // 前端依赖的字段名
        let value = serde_json::to_value(record).unwrap();
        assert!(value.get("sizeFormatted").is_some());
        assert!(value.get("uploadTime").is_some());
        assert!(value.get("uploadTimeFormatted").is_some());
        assert_eq!(value.get("type").unwrap(), "image");
        assert!(value.get("modified").is_none());
    }
}
