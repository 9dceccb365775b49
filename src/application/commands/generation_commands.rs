//! Generation Commands

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::domain::story::{GenerationLevel, Tone};

/// 单次生成的可选参数
#[derive(Debug, Clone, Copy, Default)]
pub struct GenerateOptions {
    pub timeout: Option<Duration>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

/// 生成下一个产物命令（每次最多一个）
#[derive(Debug, Clone)]
pub struct GenerateNext {
    pub story_id: Uuid,
    pub level: GenerationLevel,
    /// Chapter: 可选的分部；SceneSummary: 必填的章节
    pub parent_id: Option<Uuid>,
    pub options: GenerateOptions,
    pub cancel: Option<CancellationToken>,
}

/// 从用户提示创建故事命令
#[derive(Debug, Clone)]
pub struct GenerateStory {
    pub prompt: String,
    /// 覆盖模型选择的基调
    pub tone: Option<Tone>,
    pub part_count: usize,
    pub cancel: Option<CancellationToken>,
}

/// 生成场景正文命令
#[derive(Debug, Clone)]
pub struct WriteSceneContent {
    pub scene_id: Uuid,
    pub options: GenerateOptions,
    pub cancel: Option<CancellationToken>,
}
