//! HTTP API 路由与处理器
//!
//! JSON 封装、状态码映射、功能开关检查和访问日志都在这一层
//! 完成，核心组件只接受显式参数，不碰配置和请求上下文。

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{ConnectInfo, DefaultBodyLimit, Multipart, Path as UrlPath, State};
use axum::http::header::{self, HeaderMap, HeaderValue};
use axum::http::StatusCode;
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use filefly_core::{FileRecord, ServerConfig, StoreError, store, transfer};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, RwLock};
use tokio_util::io::ReaderStream;

use crate::auth;
use crate::net;

/// 上传大小上限：10 GiB
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024 * 1024;
/// 访问日志保留条数
const ACCESS_LOG_CAP: usize = 100;
/// 打包下载的管道缓冲
const ZIP_PIPE_BUF: usize = 64 * 1024;

/// 共享的服务状态
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<RwLock<ServerConfig>>,
    pub access_log: Arc<Mutex<VecDeque<AccessEntry>>>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config: Arc::new(RwLock::new(config)),
            access_log: Arc::new(Mutex::new(VecDeque::new())),
        }
    }
}

/// 访问日志条目
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessEntry {
    pub ip: String,
    pub time: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub user_agent: String,
}

async fn log_access(state: &AppState, addr: &SocketAddr, headers: &HeaderMap, kind: &'static str) {
    let entry = AccessEntry {
        ip: addr.ip().to_string(),
        time: chrono::Utc::now().to_rfc3339(),
        kind,
        user_agent: headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown")
            .to_string(),
    };
    let mut log = state.access_log.lock().await;
    log.push_front(entry);
    log.truncate(ACCESS_LOG_CAP);
}

/// API 错误，统一映射为 `{"error": …}` JSON
#[derive(Debug)]
pub enum ApiError {
    Unauthorized,
    Forbidden(&'static str),
    BadRequest(String),
    NotFound(String),
    RangeNotSatisfiable(String),
    Internal(String),
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(_) => ApiError::NotFound(e.to_string()),
            StoreError::InvalidRange(_) => ApiError::RangeNotSatisfiable(e.to_string()),
            StoreError::IsDirectory(_) => ApiError::BadRequest(e.to_string()),
            StoreError::Io(_) => ApiError::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "未授权访问".to_string()),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.to_string()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::RangeNotSatisfiable(msg) => (StatusCode::RANGE_NOT_SATISFIABLE, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/config", get(get_config).post(update_config))
        .route("/api/verify", post(verify))
        .route("/api/info", get(info))
        .route("/api/files", get(list_files))
        .route("/api/upload", post(upload))
        .route("/api/upload-folder", post(upload_folder))
        .route("/api/download/:filename", get(download))
        .route("/api/download-zip", post(download_zip))
        .route("/api/file/:filename", delete(delete_file))
        .route("/api/clear", post(clear_files))
        .route("/api/logs", get(logs))
        .route("/api/change-port", post(change_port))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_token,
        ))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ConfigView {
    password: String,
    has_password: bool,
    allow_upload: bool,
    allow_download: bool,
    allow_delete: bool,
    auto_cleanup: bool,
    cleanup_days: u32,
}

async fn get_config(State(state): State<AppState>) -> Json<ConfigView> {
    let config = state.config.read().await;
    Json(ConfigView {
        // 密码本身不回传，只表明是否设置
        password: if config.has_password() { "******" } else { "" }.to_string(),
        has_password: config.has_password(),
        allow_upload: config.allow_upload,
        allow_download: config.allow_download,
        allow_delete: config.allow_delete,
        auto_cleanup: config.auto_cleanup,
        cleanup_days: config.cleanup_days,
    })
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigUpdate {
    password: Option<String>,
    allow_upload: Option<bool>,
    allow_download: Option<bool>,
    allow_delete: Option<bool>,
    auto_cleanup: Option<bool>,
    cleanup_days: Option<u32>,
}

async fn update_config(
    State(state): State<AppState>,
    Json(update): Json<ConfigUpdate>,
) -> Json<serde_json::Value> {
    let mut config = state.config.write().await;
    if let Some(password) = update.password {
        config.password = password;
    }
    if let Some(v) = update.allow_upload {
        config.allow_upload = v;
    }
    if let Some(v) = update.allow_download {
        config.allow_download = v;
    }
    if let Some(v) = update.allow_delete {
        config.allow_delete = v;
    }
    if let Some(v) = update.auto_cleanup {
        config.auto_cleanup = v;
    }
    if let Some(v) = update.cleanup_days {
        config.cleanup_days = v;
    }
    if let Err(e) = config.save() {
        tracing::warn!("配置保存失败: {}", e);
    }
    Json(json!({ "success": true, "message": "配置已保存" }))
}

#[derive(Deserialize)]
struct VerifyRequest {
    password: String,
}

async fn verify(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(req): Json<VerifyRequest>,
) -> Response {
    let (ok, token) = {
        let config = state.config.read().await;
        (
            auth::check_password(&config.password, &req.password),
            config.password.clone(),
        )
    };
    if ok {
        log_access(&state, &addr, &headers, "login_success").await;
        Json(json!({ "success": true, "token": token })).into_response()
    } else {
        log_access(&state, &addr, &headers, "login_failed").await;
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "success": false, "message": "密码错误" })),
        )
            .into_response()
    }
}

async fn info(State(state): State<AppState>) -> Json<serde_json::Value> {
    let port = state.config.read().await.port;
    let ips = net::local_ips();
    let addresses: Vec<String> = ips
        .iter()
        .map(|ip| format!("http://{}:{}", ip, port))
        .collect();
    Json(json!({ "ips": ips, "port": port, "addresses": addresses }))
}

async fn list_files(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Json<Vec<FileRecord>> {
    log_access(&state, &addr, &headers, "list_files").await;
    let dir = state.config.read().await.share_dir.clone();
    Json(store::list(&dir).await)
}

#[derive(Serialize)]
struct UploadedFile {
    name: String,
    size: u64,
}

/// 接收 multipart 中的所有文件字段，写入共享目录
async fn receive_files(
    dir: &std::path::Path,
    multipart: &mut Multipart,
) -> Result<Vec<UploadedFile>, ApiError> {
    let mut uploaded = Vec::new();
    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?
    {
        let Some(raw_name) = field.file_name().map(|s| s.to_string()) else {
            continue;
        };
        let Some(desired) = store::sanitize_name(&raw_name).map(|s| s.to_string()) else {
            continue;
        };

        let (mut file, final_name) = store::create_unique(dir, &desired).await?;
        let mut size: u64 = 0;
        loop {
            let chunk = match field.chunk().await {
                Ok(Some(chunk)) => chunk,
                Ok(None) => break,
                Err(e) => {
                    // 传输中断，不留半截文件
                    drop(file);
                    let _ = tokio::fs::remove_file(dir.join(&final_name)).await;
                    return Err(ApiError::BadRequest(e.to_string()));
                }
            };
            if let Err(e) = file.write_all(&chunk).await {
                drop(file);
                let _ = tokio::fs::remove_file(dir.join(&final_name)).await;
                return Err(ApiError::Internal(e.to_string()));
            }
            size += chunk.len() as u64;
        }
        file.flush()
            .await
            .map_err(|e| ApiError::Internal(e.to_string()))?;
        tracing::info!("上传完成: {} ({} bytes)", final_name, size);
        uploaded.push(UploadedFile {
            name: final_name,
            size,
        });
    }
    Ok(uploaded)
}

async fn upload(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<serde_json::Value>, ApiError> {
    let (allowed, dir) = {
        let config = state.config.read().await;
        (config.allow_upload, config.share_dir.clone())
    };
    if !allowed {
        return Err(ApiError::Forbidden("上传功能已禁用"));
    }
    log_access(&state, &addr, &headers, "upload").await;

    let uploaded = receive_files(&dir, &mut multipart).await?;
    if uploaded.is_empty() {
        return Err(ApiError::BadRequest("没有文件上传".to_string()));
    }
    Ok(Json(json!({
        "success": true,
        "message": format!("成功上传 {} 个文件", uploaded.len()),
        "files": uploaded,
    })))
}

/// 整夹上传：接收逻辑与单文件上传一致，响应只回传数量
async fn upload_folder(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<serde_json::Value>, ApiError> {
    let (allowed, dir) = {
        let config = state.config.read().await;
        (config.allow_upload, config.share_dir.clone())
    };
    if !allowed {
        return Err(ApiError::Forbidden("上传功能已禁用"));
    }
    log_access(&state, &addr, &headers, "upload_folder").await;

    let uploaded = receive_files(&dir, &mut multipart).await?;
    if uploaded.is_empty() {
        return Err(ApiError::BadRequest("没有文件上传".to_string()));
    }
    Ok(Json(json!({
        "success": true,
        "message": format!("成功上传 {} 个文件", uploaded.len()),
        "count": uploaded.len(),
    })))
}

async fn download(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    UrlPath(filename): UrlPath<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let (allowed, dir) = {
        let config = state.config.read().await;
        (config.allow_download, config.share_dir.clone())
    };
    if !allowed {
        return Err(ApiError::Forbidden("下载功能已禁用"));
    }
    log_access(&state, &addr, &headers, "download").await;

    let path = store::resolve_entry(&dir, &filename)?;
    let range = headers.get(header::RANGE).and_then(|v| v.to_str().ok());
    let (status, response_headers, body) = transfer::serve_file(&path, range).await?;
    Ok((status, response_headers, body).into_response())
}

#[derive(Deserialize)]
struct ZipRequest {
    files: Vec<String>,
}

async fn download_zip(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(req): Json<ZipRequest>,
) -> Result<Response, ApiError> {
    let (allowed, dir) = {
        let config = state.config.read().await;
        (config.allow_download, config.share_dir.clone())
    };
    if !allowed {
        return Err(ApiError::Forbidden("下载功能已禁用"));
    }
    if req.files.is_empty() {
        return Err(ApiError::BadRequest("没有选择文件".to_string()));
    }
    log_access(&state, &addr, &headers, "download_zip").await;

    let archive_name = format!("FileFly_{}.zip", chrono::Local::now().format("%Y%m%d_%H%M%S"));

    // 归档直接写进管道，响应体从另一端惰性读出
    let (writer, reader) = tokio::io::duplex(ZIP_PIPE_BUF);
    let names = req.files;
    tokio::spawn(async move {
        match transfer::stream_zip(&dir, &names, writer).await {
            Ok(0) => {}
            Ok(skipped) => tracing::info!("打包完成，跳过 {} 个缺失文件", skipped),
            // 客户端中途断开表现为管道写入失败，按取消处理
            Err(e) => tracing::debug!("打包中止: {}", e),
        }
    });

    let mut response_headers = HeaderMap::new();
    response_headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/zip"),
    );
    response_headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&format!("attachment; filename=\"{}\"", archive_name))
            .map_err(|e| ApiError::Internal(e.to_string()))?,
    );
    let body = Body::from_stream(ReaderStream::new(reader));
    Ok((StatusCode::OK, response_headers, body).into_response())
}

async fn delete_file(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    UrlPath(filename): UrlPath<String>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    let (allowed, dir) = {
        let config = state.config.read().await;
        (config.allow_delete, config.share_dir.clone())
    };
    if !allowed {
        return Err(ApiError::Forbidden("删除功能已禁用"));
    }

    store::delete_file(&dir, &filename).await?;
    log_access(&state, &addr, &headers, "delete").await;
    Ok(Json(json!({ "success": true, "message": "文件已删除" })))
}

async fn clear_files(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    let (allowed, dir) = {
        let config = state.config.read().await;
        (config.allow_delete, config.share_dir.clone())
    };
    if !allowed {
        return Err(ApiError::Forbidden("删除功能已禁用"));
    }
    log_access(&state, &addr, &headers, "clear_all").await;

    let count = store::clear_dir(&dir).await?;
    Ok(Json(json!({
        "success": true,
        "message": format!("已清空 {} 个文件", count),
        "count": count,
    })))
}

async fn logs(State(state): State<AppState>) -> Json<Vec<AccessEntry>> {
    let log = state.access_log.lock().await;
    Json(log.iter().take(50).cloned().collect())
}

#[derive(Deserialize)]
struct ChangePortRequest {
    port: u32,
}

async fn change_port(
    State(state): State<AppState>,
    Json(req): Json<ChangePortRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if req.port < 1 || req.port > 65535 {
        return Err(ApiError::BadRequest("无效的端口号".to_string()));
    }
    let mut config = state.config.write().await;
    config.port = req.port as u16;
    if let Err(e) = config.save() {
        tracing::warn!("配置保存失败: {}", e);
    }
    Ok(Json(json!({
        "success": true,
        "message": "端口已修改，请重启服务生效",
        "port": req.port,
    })))
}
