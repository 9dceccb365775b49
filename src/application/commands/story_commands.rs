//! Story Lifecycle Commands

use uuid::Uuid;

use crate::domain::evaluation::EvaluationMode;
use crate::domain::story::StoryStatus;

/// 推进故事状态命令（只能前进）
#[derive(Debug, Clone)]
pub struct AdvanceStoryStatus {
    pub story_id: Uuid,
    pub status: StoryStatus,
}

/// 发布章节命令
#[derive(Debug, Clone)]
pub struct PublishChapter {
    pub chapter_id: Uuid,
}

/// 删除故事命令（存在子产物时拒绝）
#[derive(Debug, Clone)]
pub struct DeleteStory {
    pub story_id: Uuid,
}

/// 评估产物命令（场景或章节）
#[derive(Debug, Clone)]
pub struct EvaluateArtifact {
    pub artifact_id: Uuid,
    pub mode: EvaluationMode,
}
