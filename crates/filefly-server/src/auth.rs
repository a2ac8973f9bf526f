//! 共享密码门禁
//!
//! 密码即令牌：设置密码后除 `/api/verify` 外的所有 API 都要求
//! `Authorization: Bearer <密码>`，浏览器直链下载可改用
//! `?token=` 查询参数。未设置密码时全部放行。

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use percent_encoding::percent_decode_str;

use crate::api::{ApiError, AppState};

/// 校验共享密码（未设置密码时放行一切）
pub fn check_password(password: &str, input: &str) -> bool {
    password.is_empty() || password == input
}

/// API 认证中间件
pub async fn require_token(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if request.uri().path() == "/api/verify" {
        return Ok(next.run(request).await);
    }

    let password = state.config.read().await.password.clone();
    if password.is_empty() {
        return Ok(next.run(request).await);
    }

    let bearer = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|v| v.to_string());
    let token = bearer.or_else(|| query_token(request.uri().query()));

    match token {
        Some(token) if token == password => Ok(next.run(request).await),
        _ => Err(ApiError::Unauthorized),
    }
}

/// 从查询串里取 token 参数（浏览器下载链接用）
fn query_token(query: Option<&str>) -> Option<String> {
    for pair in query?.split('&') {
        if let Some(value) = pair.strip_prefix("token=") {
            return percent_decode_str(value)
                .decode_utf8()
                .ok()
                .map(|s| s.into_owned());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_password() {
        // 未设置密码时任何输入都通过
        assert!(check_password("", ""));
        assert!(check_password("", "anything"));

        assert!(check_password("secret", "secret"));
        assert!(!check_password("secret", "wrong"));
        assert!(!check_password("secret", ""));
    }

    #[test]
    fn test_query_token() {
        assert_eq!(query_token(None), None);
        assert_eq!(query_token(Some("foo=1")), None);
        assert_eq!(
            query_token(Some("token=secret")),
            Some("secret".to_string())
        );
        assert_eq!(
            query_token(Some("foo=1&token=secret&bar=2")),
            Some("secret".to_string())
        );
        // encodeURIComponent 过的令牌要解码
        assert_eq!(
            query_token(Some("token=p%40ss%20word")),
            Some("p@ss word".to_string())
        );
    }
}
