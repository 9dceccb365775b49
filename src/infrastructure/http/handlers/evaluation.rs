//! Evaluation HTTP Handlers

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::application::{EvaluateArtifact, ListEvaluations};
use crate::domain::evaluation::EvaluationReport;
use crate::infrastructure::http::dto::{ApiResponse, ArtifactIdRequest, EvaluateRequest};
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::state::AppState;

/// 评估场景或章节
pub async fn evaluate(
    State(state): State<Arc<AppState>>,
    Json(req): Json<EvaluateRequest>,
) -> Result<Json<ApiResponse<EvaluationReport>>, ApiError> {
    let report = state
        .evaluate_handler
        .handle(EvaluateArtifact {
            artifact_id: req.artifact_id,
            mode: req.mode,
        })
        .await?;
    Ok(Json(ApiResponse::success(report)))
}

/// 某个产物的历史评估（最新的在前）
pub async fn list_evaluations(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ArtifactIdRequest>,
) -> Result<Json<ApiResponse<Vec<EvaluationReport>>>, ApiError> {
    let reports = state
        .list_evaluations_handler
        .handle(ListEvaluations {
            artifact_id: req.artifact_id,
        })
        .await?;
    Ok(Json(ApiResponse::success(reports)))
}
