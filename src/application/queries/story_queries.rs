//! Story Queries

use uuid::Uuid;

/// 获取故事完整树查询
#[derive(Debug, Clone)]
pub struct GetStoryTree {
    pub story_id: Uuid,
}

/// 列出所有故事查询
#[derive(Debug, Clone)]
pub struct ListStories;

/// 获取场景查询
#[derive(Debug, Clone)]
pub struct GetScene {
    pub scene_id: Uuid,
}

/// 列出产物的评估报告查询
#[derive(Debug, Clone)]
pub struct ListEvaluations {
    pub artifact_id: Uuid,
}
