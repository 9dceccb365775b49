//! Story HTTP Handlers

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::application::{
    AdvanceStoryStatus, ChapterRecord, DeleteStory, GenerateStory, GetStoryTree, ListStories,
    PublishChapter, StoryRecord, StoryTree,
};
use crate::infrastructure::http::dto::{
    ApiResponse, ChapterIdRequest, Empty, GenerateStoryRequest, StoryIdRequest,
    StoryStatusRequest,
};
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::state::AppState;

/// 由用户提示生成故事
pub async fn generate_story(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GenerateStoryRequest>,
) -> Result<Json<ApiResponse<StoryRecord>>, ApiError> {
    let command = GenerateStory {
        prompt: req.prompt,
        tone: req.tone,
        part_count: req.part_count,
        cancel: None,
    };
    let story = state.generate_story_handler.handle(command).await?;
    Ok(Json(ApiResponse::success(story)))
}

/// 获取故事完整结构
pub async fn get_story(
    State(state): State<Arc<AppState>>,
    Json(req): Json<StoryIdRequest>,
) -> Result<Json<ApiResponse<StoryTree>>, ApiError> {
    let tree = state
        .story_tree_handler
        .handle(GetStoryTree {
            story_id: req.story_id,
        })
        .await?;
    Ok(Json(ApiResponse::success(StoryTree::clone(&tree))))
}

/// 列出所有故事
pub async fn list_stories(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<StoryRecord>>>, ApiError> {
    let stories = state.list_stories_handler.handle(ListStories).await?;
    Ok(Json(ApiResponse::success(stories)))
}

/// 推进故事状态
pub async fn advance_status(
    State(state): State<Arc<AppState>>,
    Json(req): Json<StoryStatusRequest>,
) -> Result<Json<ApiResponse<StoryRecord>>, ApiError> {
    let story = state
        .advance_status_handler
        .handle(AdvanceStoryStatus {
            story_id: req.story_id,
            status: req.status,
        })
        .await?;
    Ok(Json(ApiResponse::success(story)))
}

/// 删除故事（必须没有子产物）
pub async fn delete_story(
    State(state): State<Arc<AppState>>,
    Json(req): Json<StoryIdRequest>,
) -> Result<Json<ApiResponse<Empty>>, ApiError> {
    state
        .delete_story_handler
        .handle(DeleteStory {
            story_id: req.story_id,
        })
        .await?;
    Ok(Json(ApiResponse::ok()))
}

/// 发布章节
pub async fn publish_chapter(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChapterIdRequest>,
) -> Result<Json<ApiResponse<ChapterRecord>>, ApiError> {
    let chapter = state
        .publish_chapter_handler
        .handle(PublishChapter {
            chapter_id: req.chapter_id,
        })
        .await?;
    Ok(Json(ApiResponse::success(chapter)))
}
