//! FileFly 服务端
//!
//! 局域网文件共享服务，负责：
//! - HTTP API：文件列表、上传、范围/打包下载、删除
//! - 可选的共享密码门禁
//! - 过期文件自动清理

mod api;
mod auth;
mod net;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use filefly_core::{ServerConfig, store};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "filefly-server", version, about = "飞传 FileFly - 局域网文件共享服务")]
struct Cli {
    /// 监听端口（默认取配置文件）
    #[arg(short, long)]
    port: Option<u16>,
    /// 共享目录
    #[arg(short, long)]
    dir: Option<PathBuf>,
    /// 访问密码（空则不启用门禁）
    #[arg(long)]
    password: Option<String>,
    /// 禁用上传
    #[arg(long)]
    no_upload: bool,
    /// 禁用下载
    #[arg(long)]
    no_download: bool,
    /// 禁用删除
    #[arg(long)]
    no_delete: bool,
    /// 详细日志
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 桥接 log crate（filefly-core 使用）到 tracing
    let _ = tracing_log::LogTracer::init();

    let default_filter = if cli.verbose {
        "debug"
    } else {
        "info,filefly_core=debug"
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .try_init();

    let mut config = ServerConfig::load();
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(dir) = cli.dir {
        config.share_dir = dir;
    }
    if let Some(password) = cli.password {
        config.password = password;
    }
    if cli.no_upload {
        config.allow_upload = false;
    }
    if cli.no_download {
        config.allow_download = false;
    }
    if cli.no_delete {
        config.allow_delete = false;
    }

    store::ensure_dir(&config.share_dir).await?;

    let port = config.port;
    let state = api::AppState::new(config);

    tokio::spawn(cleanup_task(state.clone()));

    let app = api::router(state);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;

    tracing::info!("飞传 FileFly 已启动");
    tracing::info!("  本地: http://localhost:{}", port);
    for ip in net::local_ips() {
        tracing::info!("  局域网: http://{}:{}", ip, port);
    }

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("服务器已关闭");
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("正在关闭服务器...");
}

/// 每天清理一次过期文件（开关和阈值跟随当前配置）
async fn cleanup_task(state: api::AppState) {
    let mut timer = tokio::time::interval(Duration::from_secs(24 * 60 * 60));
    // interval 的首个 tick 立即触发，丢弃它让首次清理发生在一天后
    timer.tick().await;
    loop {
        timer.tick().await;
        let (enabled, days, dir) = {
            let config = state.config.read().await;
            (
                config.auto_cleanup,
                config.cleanup_days,
                config.share_dir.clone(),
            )
        };
        if !enabled {
            continue;
        }
        let max_age = Duration::from_secs(u64::from(days) * 24 * 60 * 60);
        match store::cleanup_older_than(&dir, max_age).await {
            Ok(0) => {}
            Ok(count) => tracing::info!("自动清理 {} 个过期文件", count),
            Err(e) => tracing::warn!("自动清理失败: {}", e),
        }
    }
}
