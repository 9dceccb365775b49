//! Image Prompt HTTP Handlers

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::application::{
    CharacterImagePrompt, CharacterPromptResponse, ScenePrompts, ScenePromptsResponse,
    VisualCacheStats,
};
use crate::infrastructure::http::dto::{ApiResponse, CharacterPromptRequest, Empty, SceneIdRequest};
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::state::AppState;

/// 单个角色的图片提示词
pub async fn character_prompt(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CharacterPromptRequest>,
) -> Result<Json<ApiResponse<CharacterPromptResponse>>, ApiError> {
    let response = state
        .character_prompt_handler
        .handle(CharacterImagePrompt {
            character_id: req.character_id,
            modifier: req.modifier,
        })
        .await?;
    Ok(Json(ApiResponse::success(response)))
}

/// 场景中每个角色一条提示词
pub async fn scene_prompts(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SceneIdRequest>,
) -> Result<Json<ApiResponse<ScenePromptsResponse>>, ApiError> {
    let response = state
        .scene_prompts_handler
        .handle(ScenePrompts {
            scene_id: req.scene_id,
        })
        .await?;
    Ok(Json(ApiResponse::success(response)))
}

/// 角色外观缓存统计
pub async fn cache_stats(State(state): State<Arc<AppState>>) -> Json<ApiResponse<VisualCacheStats>> {
    Json(ApiResponse::success(state.visual_cache.stats()))
}

/// 清空角色外观缓存
pub async fn cache_clear(State(state): State<Arc<AppState>>) -> Json<ApiResponse<Empty>> {
    state.visual_cache.clear();
    Json(ApiResponse::ok())
}
