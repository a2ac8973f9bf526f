//! 扩展名分类
//!
//! 按文件扩展名映射到语义分类和前端展示图标。纯函数、全函数：
//! 任何输入都有确定输出，未知或缺失的扩展名归为 Other。
//! 多重扩展名只看最后一段（`archive.tar.gz` 按 `gz` 归档处理）。

use serde::{Deserialize, Serialize};
use std::path::Path;

/// 文件分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileCategory {
    Image,
    Video,
    Audio,
    Archive,
    Document,
    Code,
    Other,
}

impl FileCategory {
    /// 获取分类名称（与序列化形式一致）
    pub fn name(&self) -> &'static str {
        match self {
            FileCategory::Image => "image",
            FileCategory::Video => "video",
            FileCategory::Audio => "audio",
            FileCategory::Archive => "archive",
            FileCategory::Document => "document",
            FileCategory::Code => "code",
            FileCategory::Other => "other",
        }
    }
}

/// 取出小写的最后一个扩展名
fn extension(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

/// 按扩展名分类
pub fn classify(name: &str) -> FileCategory {
    let Some(ext) = extension(name) else {
        return FileCategory::Other;
    };
    match ext.as_str() {
        "jpg" | "jpeg" | "png" | "gif" | "bmp" | "svg" | "webp" | "ico" => FileCategory::Image,
        "mp4" | "avi" | "mkv" | "mov" | "wmv" | "flv" | "webm" | "m4v" => FileCategory::Video,
        "mp3" | "wav" | "flac" | "aac" | "ogg" | "wma" | "m4a" => FileCategory::Audio,
        "zip" | "rar" | "7z" | "tar" | "gz" | "bz2" => FileCategory::Archive,
        "doc" | "docx" | "xls" | "xlsx" | "ppt" | "pptx" | "pdf" | "txt" | "md" => {
            FileCategory::Document
        }
        "js" | "ts" | "html" | "css" | "json" | "py" | "java" | "cpp" | "c" | "php" | "rb"
        | "go" | "rs" | "swift" | "kt" | "vue" | "jsx" | "tsx" => FileCategory::Code,
        _ => FileCategory::Other,
    }
}

/// 按扩展名取展示图标（Font Awesome 类名）
///
/// 图标比分类更细：文档类按具体格式区分 pdf/word/excel 等。
pub fn icon(name: &str) -> &'static str {
    let Some(ext) = extension(name) else {
        return "fa-file";
    };
    match ext.as_str() {
        "jpg" | "jpeg" | "png" | "gif" | "bmp" | "svg" | "webp" | "ico" => "fa-file-image",
        "pdf" => "fa-file-pdf",
        "doc" | "docx" => "fa-file-word",
        "xls" | "xlsx" => "fa-file-excel",
        "ppt" | "pptx" => "fa-file-powerpoint",
        "txt" | "md" => "fa-file-alt",
        "json" | "js" | "ts" | "html" | "css" | "py" | "java" | "cpp" | "c" | "h" | "php"
        | "rb" | "go" | "rs" | "swift" | "kt" | "vue" | "jsx" | "tsx" => "fa-file-code",
        "zip" | "rar" | "7z" | "tar" | "gz" | "bz2" => "fa-file-archive",
        "mp3" | "wav" | "flac" | "aac" | "ogg" | "wma" | "m4a" => "fa-file-audio",
        "mp4" | "avi" | "mkv" | "mov" | "wmv" | "flv" | "webm" | "m4v" => "fa-file-video",
        _ => "fa-file",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_is_case_insensitive() {
        assert_eq!(classify("photo.JPG"), FileCategory::Image);
        assert_eq!(classify("CLIP.Mp4"), FileCategory::Video);
    }

    #[test]
    fn test_classify_last_extension_wins() {
        // 多重扩展名只看最后一段
        assert_eq!(classify("archive.tar.gz"), FileCategory::Archive);
        assert_eq!(classify("notes.backup.txt"), FileCategory::Document);
    }

    #[test]
    fn test_classify_unknown_and_missing() {
        assert_eq!(classify("noext"), FileCategory::Other);
        assert_eq!(classify("installer.exe"), FileCategory::Other);
        assert_eq!(classify(""), FileCategory::Other);
    }

    #[test]
    fn test_classify_groups() {
        assert_eq!(classify("song.flac"), FileCategory::Audio);
        assert_eq!(classify("report.pdf"), FileCategory::Document);
        assert_eq!(classify("main.rs"), FileCategory::Code);
        assert_eq!(classify("bundle.7z"), FileCategory::Archive);
    }

    #[test]
    fn test_icon_mapping() {
        assert_eq!(icon("photo.png"), "fa-file-image");
        assert_eq!(icon("report.pdf"), "fa-file-pdf");
        assert_eq!(icon("sheet.xlsx"), "fa-file-excel");
        assert_eq!(icon("readme.md"), "fa-file-alt");
        assert_eq!(icon("main.rs"), "fa-file-code");
        assert_eq!(icon("音乐.mp3"), "fa-file-audio");
        assert_eq!(icon("noext"), "fa-file");
        assert_eq!(icon("installer.exe"), "fa-file");
    }

    #[test]
    fn test_category_serializes_lowercase() {
        let json = serde_json::to_string(&FileCategory::Image).unwrap();
        assert_eq!(json, "\"image\"");
        assert_eq!(FileCategory::Archive.name(), "archive");
    }
}
