//! Generation HTTP Handlers

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::application::{AssembleContext, GenerateNext, GenerateNextResponse};
use crate::infrastructure::http::dto::{
    ApiResponse, AssembleContextRequest, AssembledContextResponse, GenerateNextRequest,
};
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::state::AppState;

/// 在给定层级生成下一个产物
///
/// 客户端断开时请求 future 被丢弃，生成随之中止，不会留下部分产物
pub async fn generate_next(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GenerateNextRequest>,
) -> Result<Json<ApiResponse<GenerateNextResponse>>, ApiError> {
    let command = GenerateNext {
        story_id: req.story_id,
        level: req.level,
        parent_id: req.parent_id,
        options: req.options.into(),
        cancel: None,
    };
    let response = state.generate_next_handler.handle(command).await?;
    Ok(Json(ApiResponse::success(response)))
}

/// 预览某一层级的生成上下文
pub async fn assemble_context(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AssembleContextRequest>,
) -> Result<Json<ApiResponse<AssembledContextResponse>>, ApiError> {
    let ctx = state
        .assemble_context_handler
        .handle(AssembleContext {
            story_id: req.story_id,
            level: req.level,
            parent_id: req.parent_id,
        })
        .await?;
    Ok(Json(ApiResponse::success(AssembledContextResponse::from(&ctx))))
}
