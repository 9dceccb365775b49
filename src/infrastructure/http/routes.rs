//! HTTP Routes
//!
//! API Endpoints:
//! - /api/ping                      GET   健康检查
//! - /api/story/generate            POST  由提示生成故事
//! - /api/story/get                 POST  获取故事完整结构（经由视图缓存）
//! - /api/story/list                GET   列出所有故事
//! - /api/story/status              POST  推进故事状态
//! - /api/story/delete              POST  删除故事
//! - /api/generate/next             POST  生成下一个产物
//! - /api/context/assemble          POST  预览生成上下文
//! - /api/scene/write               POST  生成场景正文
//! - /api/scene/get                 POST  获取场景
//! - /api/chapter/publish           POST  发布章节
//! - /api/evaluate                  POST  评估场景或章节
//! - /api/evaluation/list           POST  历史评估
//! - /api/image/character_prompt    POST  角色图片提示词
//! - /api/image/scene_prompts       POST  场景图片提示词
//! - /api/image/cache_stats         GET   角色外观缓存统计
//! - /api/image/cache_clear         POST  清空角色外观缓存

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use super::handlers;
use super::state::AppState;

/// 创建所有路由
pub fn create_routes() -> Router<Arc<AppState>> {
    Router::new().nest("/api", api_routes())
}

/// API 路由
fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/ping", get(handlers::ping))
        .nest("/story", story_routes())
        .route("/generate/next", post(handlers::generate_next))
        .route("/context/assemble", post(handlers::assemble_context))
        .route("/scene/write", post(handlers::write_scene))
        .route("/scene/get", post(handlers::get_scene))
        .route("/chapter/publish", post(handlers::publish_chapter))
        .route("/evaluate", post(handlers::evaluate))
        .route("/evaluation/list", post(handlers::list_evaluations))
        .nest("/image", image_routes())
}

/// Story 路由
fn story_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/generate", post(handlers::generate_story))
        .route("/get", post(handlers::get_story))
        .route("/list", get(handlers::list_stories))
        .route("/status", post(handlers::advance_status))
        .route("/delete", post(handlers::delete_story))
}

/// Image 路由
fn image_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/character_prompt", post(handlers::character_prompt))
        .route("/scene_prompts", post(handlers::scene_prompts))
        .route("/cache_stats", get(handlers::cache_stats))
        .route("/cache_clear", post(handlers::cache_clear))
}
