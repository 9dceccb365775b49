//! Scene HTTP Handlers

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::application::{GetScene, SceneRecord, WriteSceneContent, WriteSceneContentResponse};
use crate::infrastructure::http::dto::{ApiResponse, SceneIdRequest, WriteSceneRequest};
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::state::AppState;

/// 生成场景正文
pub async fn write_scene(
    State(state): State<Arc<AppState>>,
    Json(req): Json<WriteSceneRequest>,
) -> Result<Json<ApiResponse<WriteSceneContentResponse>>, ApiError> {
    let response = state
        .write_scene_handler
        .handle(WriteSceneContent {
            scene_id: req.scene_id,
            options: req.options.into(),
            cancel: None,
        })
        .await?;
    Ok(Json(ApiResponse::success(response)))
}

/// 获取场景
pub async fn get_scene(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SceneIdRequest>,
) -> Result<Json<ApiResponse<SceneRecord>>, ApiError> {
    let scene = state
        .get_scene_handler
        .handle(GetScene {
            scene_id: req.scene_id,
        })
        .await?;
    Ok(Json(ApiResponse::success(scene)))
}
