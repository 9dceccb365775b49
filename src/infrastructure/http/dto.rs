//! Data Transfer Objects

use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::application::commands::GenerateOptions;
use crate::application::generation::prompts::render_context;
use crate::application::GenerationContext;
use crate::domain::evaluation::EvaluationMode;
use crate::domain::story::{GenerationLevel, StoryStatus, Tone};

// ============================================================================
// 统一响应结构
// ============================================================================

/// 统一 API 响应格式
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub errno: i32,
    pub error: String,
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    /// 成功响应
    pub fn success(data: T) -> Self {
        Self {
            errno: 0,
            error: String::new(),
            data: Some(data),
        }
    }
}

/// 空数据响应
#[derive(Debug, Serialize)]
pub struct Empty {}

impl ApiResponse<Empty> {
    /// 成功但无数据
    pub fn ok() -> Self {
        Self::success(Empty {})
    }
}

// ============================================================================
// Generation DTOs
// ============================================================================

/// 单次生成参数
#[derive(Debug, Default, Deserialize)]
pub struct GenerateOptionsDto {
    pub timeout_secs: Option<u64>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

impl From<GenerateOptionsDto> for GenerateOptions {
    fn from(dto: GenerateOptionsDto) -> Self {
        Self {
            timeout: dto.timeout_secs.map(Duration::from_secs),
            max_tokens: dto.max_tokens,
            temperature: dto.temperature,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct GenerateStoryRequest {
    pub prompt: String,
    #[serde(default)]
    pub tone: Option<Tone>,
    #[serde(default = "default_part_count")]
    pub part_count: usize,
}

fn default_part_count() -> usize {
    3
}

#[derive(Debug, Deserialize)]
pub struct GenerateNextRequest {
    pub story_id: Uuid,
    pub level: GenerationLevel,
    #[serde(default)]
    pub parent_id: Option<Uuid>,
    #[serde(default)]
    pub options: GenerateOptionsDto,
}

#[derive(Debug, Deserialize)]
pub struct AssembleContextRequest {
    pub story_id: Uuid,
    pub level: GenerationLevel,
    #[serde(default)]
    pub parent_id: Option<Uuid>,
}

/// 组装结果摘要 + 渲染后的上下文
#[derive(Debug, Serialize)]
pub struct AssembledContextResponse {
    pub level: GenerationLevel,
    pub next_ordinal: u32,
    pub parts: usize,
    pub prior_chapters: usize,
    pub prior_scenes: usize,
    pub characters: usize,
    pub settings: usize,
    pub rendered: String,
}

impl From<&GenerationContext> for AssembledContextResponse {
    fn from(ctx: &GenerationContext) -> Self {
        Self {
            level: ctx.level,
            next_ordinal: ctx.next_ordinal(),
            parts: ctx.parts.len(),
            prior_chapters: ctx.prior_chapters.len(),
            prior_scenes: ctx.prior_scenes.len(),
            characters: ctx.characters.len(),
            settings: ctx.settings.len(),
            rendered: render_context(ctx),
        }
    }
}

// ============================================================================
// Story DTOs
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct StoryIdRequest {
    pub story_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct StoryStatusRequest {
    pub story_id: Uuid,
    pub status: StoryStatus,
}

#[derive(Debug, Deserialize)]
pub struct ChapterIdRequest {
    pub chapter_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct SceneIdRequest {
    pub scene_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct WriteSceneRequest {
    pub scene_id: Uuid,
    #[serde(default)]
    pub options: GenerateOptionsDto,
}

// ============================================================================
// Evaluation DTOs
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct EvaluateRequest {
    pub artifact_id: Uuid,
    #[serde(default)]
    pub mode: EvaluationMode,
}

#[derive(Debug, Deserialize)]
pub struct ArtifactIdRequest {
    pub artifact_id: Uuid,
}

// ============================================================================
// Image Prompt DTOs
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CharacterPromptRequest {
    pub character_id: Uuid,
    #[serde(default)]
    pub modifier: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_next_request_defaults() {
        let req: GenerateNextRequest = serde_json::from_value(serde_json::json!({
            "story_id": Uuid::nil(),
            "level": "scene_summary",
        }))
        .unwrap();
        assert_eq!(req.level, GenerationLevel::SceneSummary);
        assert!(req.parent_id.is_none());

        let options = GenerateOptions::from(GenerateOptionsDto {
            timeout_secs: Some(5),
            ..Default::default()
        });
        assert_eq!(options.timeout, Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_evaluate_request_default_mode() {
        let req: EvaluateRequest =
            serde_json::from_value(serde_json::json!({ "artifact_id": Uuid::nil() })).unwrap();
        assert_eq!(req.mode, EvaluationMode::Standard);
    }
}
