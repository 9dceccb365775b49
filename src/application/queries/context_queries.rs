//! Context Queries

use uuid::Uuid;

use crate::domain::story::GenerationLevel;

/// 组装生成上下文查询
#[derive(Debug, Clone)]
pub struct AssembleContext {
    pub story_id: Uuid,
    pub level: GenerationLevel,
    /// Chapter: 可选的分部；SceneSummary: 必填的章节
    pub parent_id: Option<Uuid>,
}
