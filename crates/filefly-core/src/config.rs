//! 服务配置和持久化
//!
//! 端口、密码、功能开关等设置的存储和读取。核心组件不读配置，
//! 服务层加载后把需要的值以显式参数传进来。

use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// 服务设置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// 监听端口
    pub port: u16,
    /// 访问密码，空串表示不启用门禁
    pub password: String,
    /// 允许上传
    pub allow_upload: bool,
    /// 允许下载
    pub allow_download: bool,
    /// 允许删除
    pub allow_delete: bool,
    /// 定期清理过期文件
    pub auto_cleanup: bool,
    /// 清理阈值（天）
    pub cleanup_days: u32,
    /// 共享目录
    pub share_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            password: String::new(),
            allow_upload: true,
            allow_download: true,
            allow_delete: true,
            auto_cleanup: false,
            cleanup_days: 7,
            share_dir: PathBuf::from("uploads"),
        }
    }
}

impl ServerConfig {
    /// 获取配置文件路径
    fn config_path() -> PathBuf {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("filefly");
        config_dir.join("config.toml")
    }

    /// 加载设置（文件不存在或损坏时使用默认值）
    pub fn load() -> Self {
        let path = Self::config_path();
        if path.exists() {
            match fs::read_to_string(&path) {
                Ok(content) => match toml::from_str(&content) {
                    Ok(config) => {
                        debug!("Loaded config from {:?}", path);
                        return config;
                    }
                    Err(e) => {
                        log::warn!("Failed to parse config: {}, using defaults", e);
                    }
                },
                Err(e) => {
                    log::warn!("Failed to read config file: {}, using defaults", e);
                }
            }
        }
        Self::default()
    }

    /// 保存设置
    pub fn save(&self) -> anyhow::Result<()> {
        let path = Self::config_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(&path, content)?;
        debug!("Saved config to {:?}", path);
        Ok(())
    }

    /// 是否启用了密码门禁
    pub fn has_password(&self) -> bool {
        !self.password.is_empty()
    }
}
