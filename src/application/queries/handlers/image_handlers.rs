//! Image Prompt Query Handlers
//!
//! 只产出图片提示词，不生成图片。

use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::application::error::ApplicationError;
use crate::application::ports::{CastRepositoryPort, CharacterVisualCachePort, StoryRepositoryPort};
use crate::application::queries::{CharacterImagePrompt, ScenePrompts};

/// 单个角色的图片提示词
#[derive(Debug, Clone, Serialize)]
pub struct CharacterPromptResponse {
    pub character_id: Uuid,
    pub name: String,
    pub prompt: String,
}

/// CharacterImagePrompt Handler
pub struct CharacterImagePromptHandler {
    cast_repo: Arc<dyn CastRepositoryPort>,
    visual_cache: Arc<dyn CharacterVisualCachePort>,
}

impl CharacterImagePromptHandler {
    pub fn new(
        cast_repo: Arc<dyn CastRepositoryPort>,
        visual_cache: Arc<dyn CharacterVisualCachePort>,
    ) -> Self {
        Self {
            cast_repo,
            visual_cache,
        }
    }

    pub async fn handle(
        &self,
        query: CharacterImagePrompt,
    ) -> Result<CharacterPromptResponse, ApplicationError> {
        let character = self
            .cast_repo
            .find_character(query.character_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("Character", query.character_id))?;

        Ok(CharacterPromptResponse {
            character_id: character.id,
            prompt: self
                .visual_cache
                .prompt_for(&character, query.modifier.as_deref()),
            name: character.name,
        })
    }
}

/// 场景提示词响应
#[derive(Debug, Clone, Serialize)]
pub struct ScenePromptsResponse {
    pub scene_id: Uuid,
    pub prompts: Vec<CharacterPromptResponse>,
}

/// ScenePrompts Handler
///
/// 每个出场角色一条提示词，动作取场景第一个节拍，背景取场景地点
pub struct ScenePromptsHandler {
    story_repo: Arc<dyn StoryRepositoryPort>,
    cast_repo: Arc<dyn CastRepositoryPort>,
    visual_cache: Arc<dyn CharacterVisualCachePort>,
}

impl ScenePromptsHandler {
    pub fn new(
        story_repo: Arc<dyn StoryRepositoryPort>,
        cast_repo: Arc<dyn CastRepositoryPort>,
        visual_cache: Arc<dyn CharacterVisualCachePort>,
    ) -> Self {
        Self {
            story_repo,
            cast_repo,
            visual_cache,
        }
    }

    pub async fn handle(&self, query: ScenePrompts) -> Result<ScenePromptsResponse, ApplicationError> {
        let scene = self
            .story_repo
            .find_scene(query.scene_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("Scene", query.scene_id))?;

        let backdrop = match scene.setting_id {
            Some(setting_id) => self
                .cast_repo
                .find_setting(setting_id)
                .await?
                .map(|s| s.name)
                .unwrap_or_else(|| scene.place.clone()),
            None => scene.place.clone(),
        };
        let action = scene.beats.first().map(|b| b.description.trim().to_string());
        let modifier = match (action, backdrop.trim()) {
            (Some(action), "") => action,
            (Some(action), place) => format!("{}, in {}", action, place),
            (None, "") => String::new(),
            (None, place) => format!("in {}", place),
        };

        let mut prompts = Vec::with_capacity(scene.character_ids.len());
        for character_id in &scene.character_ids {
            let Some(character) = self.cast_repo.find_character(*character_id).await? else {
                tracing::warn!(
                    scene_id = %scene.id,
                    character_id = %character_id,
                    "Scene references unknown character"
                );
                continue;
            };
            prompts.push(CharacterPromptResponse {
                character_id: character.id,
                prompt: self.visual_cache.prompt_for(&character, Some(&modifier)),
                name: character.name,
            });
        }

        Ok(ScenePromptsResponse {
            scene_id: scene.id,
            prompts,
        })
    }
}
