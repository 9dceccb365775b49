//! Ping Handler
//!
//! 健康检查，同时探测生成服务

use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Serialize;

use crate::infrastructure::http::state::AppState;

/// Ping 响应
#[derive(Serialize)]
pub struct PingResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub generator: &'static str,
}

/// Ping endpoint - 健康检查
pub async fn ping(State(state): State<Arc<AppState>>) -> Json<PingResponse> {
    let generator = if state.generator.health_check().await {
        "ok"
    } else {
        "unreachable"
    };
    Json(PingResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        generator,
    })
}
