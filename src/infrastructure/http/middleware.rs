//! HTTP Middleware
//!
//! 请求耗时与 HTTP 状态码错误日志

use std::time::Instant;

use axum::{extract::Request, middleware::Next, response::Response};

/// 生成请求可能很慢，超过该阈值的请求记 info
const SLOW_REQUEST_MS: u128 = 5_000;

/// HTTP 状态码错误日志中间件
///
/// 4xx/5xx 记录日志；业务错误（errno != 0）在 ApiError::into_response() 中记录
pub async fn error_logging_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let started = Instant::now();

    let response = next.run(request).await;
    let status = response.status();
    let elapsed_ms = started.elapsed().as_millis();

    if status.is_server_error() {
        tracing::error!(
            method = %method,
            uri = %uri,
            status = %status.as_u16(),
            elapsed_ms = elapsed_ms as u64,
            "HTTP server error"
        );
    } else if status.is_client_error() {
        tracing::warn!(
            method = %method,
            uri = %uri,
            status = %status.as_u16(),
            elapsed_ms = elapsed_ms as u64,
            "HTTP client error"
        );
    } else if elapsed_ms >= SLOW_REQUEST_MS {
        tracing::info!(
            method = %method,
            uri = %uri,
            elapsed_ms = elapsed_ms as u64,
            "Slow request"
        );
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request as HttpRequest, StatusCode},
        routing::post,
        Router,
    };
    use tower::util::ServiceExt;

    async fn unprocessable() -> StatusCode {
        StatusCode::UNPROCESSABLE_ENTITY
    }

    async fn failing() -> StatusCode {
        StatusCode::BAD_GATEWAY
    }

    fn router() -> Router {
        Router::new()
            .route("/generate", post(unprocessable))
            .route("/evaluate", post(failing))
            .layer(axum::middleware::from_fn(error_logging_middleware))
    }

    #[tokio::test]
    async fn test_status_passes_through() {
        for (uri, expected) in [
            ("/generate", StatusCode::UNPROCESSABLE_ENTITY),
            ("/evaluate", StatusCode::BAD_GATEWAY),
        ] {
            let request = HttpRequest::builder()
                .method("POST")
                .uri(uri)
                .body(Body::empty())
                .unwrap();
            let response = router().oneshot(request).await.unwrap();
            assert_eq!(response.status(), expected);
        }
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let request = HttpRequest::builder()
            .uri("/missing")
            .body(Body::empty())
            .unwrap();
        let response = router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
