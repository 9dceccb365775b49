//! Scene Prose Command Handlers
//!
//! 生成场景正文，写回场景并重建章节正文。

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;

use crate::application::commands::WriteSceneContent;
use crate::application::error::{ApplicationError, ArtifactScope};
use crate::application::generation::drafts::SceneContentDraft;
use crate::application::generation::prompts::{render_scene_prose_prompt, SceneProseInput};
use crate::application::generation::{
    spawn_invalidation, InvalidationPolicy, InvocationOverrides, ScopeKey, ScopeLocks,
    StructuredInvoker,
};
use crate::application::ports::{
    CacheInvalidatorPort, CastRepositoryPort, InvalidationKey, RepositoryError, SceneRecord,
    StoryRepositoryPort,
};
use crate::domain::story::GenerationLevel;

/// 章节正文 = 各场景正文按序号以空行连接
pub fn assemble_chapter_content(scenes: &[SceneRecord]) -> String {
    scenes
        .iter()
        .map(|s| s.content.trim())
        .filter(|c| !c.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// WriteSceneContent 响应
#[derive(Debug, Clone, Serialize)]
pub struct WriteSceneContentResponse {
    pub scene: SceneRecord,
    pub chapter_word_count: usize,
    pub elapsed_ms: u64,
    pub model: String,
    pub tokens_used: u32,
}

/// WriteSceneContent Handler
pub struct WriteSceneContentHandler {
    story_repo: Arc<dyn StoryRepositoryPort>,
    cast_repo: Arc<dyn CastRepositoryPort>,
    invoker: Arc<StructuredInvoker>,
    invalidator: Arc<dyn CacheInvalidatorPort>,
    locks: Arc<ScopeLocks>,
    invalidation: InvalidationPolicy,
}

impl WriteSceneContentHandler {
    pub fn new(
        story_repo: Arc<dyn StoryRepositoryPort>,
        cast_repo: Arc<dyn CastRepositoryPort>,
        invoker: Arc<StructuredInvoker>,
        invalidator: Arc<dyn CacheInvalidatorPort>,
        locks: Arc<ScopeLocks>,
        invalidation: InvalidationPolicy,
    ) -> Self {
        Self {
            story_repo,
            cast_repo,
            invoker,
            invalidator,
            locks,
            invalidation,
        }
    }

    pub async fn handle(
        &self,
        command: WriteSceneContent,
    ) -> Result<WriteSceneContentResponse, ApplicationError> {
        let started = Instant::now();

        let scene = self
            .story_repo
            .find_scene(command.scene_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("Scene", command.scene_id))?;
        let scope = ArtifactScope::labeled("scene_content", scene.story_id, Some(scene.chapter_id));
        let persistence = move |e: RepositoryError| ApplicationError::persistence(scope, e);

        let chapter = self
            .story_repo
            .find_chapter(scene.chapter_id)
            .await
            .map_err(persistence)?
            .ok_or_else(|| ApplicationError::not_found("Chapter", scene.chapter_id))?;
        let story = self
            .story_repo
            .find_story(scene.story_id)
            .await
            .map_err(persistence)?
            .ok_or_else(|| ApplicationError::not_found("Story", scene.story_id))?;

        let characters: Vec<_> = self
            .cast_repo
            .list_characters(story.id)
            .await
            .map_err(persistence)?
            .into_iter()
            .filter(|c| scene.character_ids.contains(&c.id))
            .collect();
        let setting = match scene.setting_id {
            Some(id) => self.cast_repo.find_setting(id).await.map_err(persistence)?,
            None => None,
        };
        let siblings = self
            .story_repo
            .list_scenes(chapter.id)
            .await
            .map_err(persistence)?;
        let previous = siblings
            .iter()
            .find(|s| s.ordinal_index + 1 == scene.ordinal_index)
            .map(|s| s.content.as_str());

        let words = self.invoker.settings().scene_words;
        let prompt = render_scene_prose_prompt(&SceneProseInput {
            story: &story,
            chapter: &chapter,
            scene: &scene,
            characters: &characters,
            setting: setting.as_ref(),
            previous_content: previous,
            target_words: (words.min, words.max),
        });

        tracing::info!(
            scene_id = %scene.id,
            chapter_id = %chapter.id,
            ordinal_index = scene.ordinal_index,
            "Writing scene prose"
        );

        let invocation = self
            .invoker
            .invoke::<SceneContentDraft>(
                scope,
                prompt,
                InvocationOverrides::from(command.options),
                command.cancel.as_ref(),
            )
            .await?;

        // 写入阶段与同一章节的场景生成串行
        let _guard = self
            .locks
            .acquire(ScopeKey {
                story_id: story.id,
                scope_id: chapter.id,
                level: GenerationLevel::SceneSummary,
            })
            .await;

        let updated = self
            .story_repo
            .update_scene_content(scene.id, &invocation.draft.content)
            .await
            .map_err(persistence)?;
        let scenes = self
            .story_repo
            .list_scenes(chapter.id)
            .await
            .map_err(persistence)?;
        let chapter = self
            .story_repo
            .update_chapter_content(chapter.id, &assemble_chapter_content(&scenes))
            .await
            .map_err(persistence)?;

        if let Err(e) = self.story_repo.touch_story(story.id).await {
            tracing::warn!(story_id = %story.id, error = %e, "Failed to touch story");
        }
        spawn_invalidation(
            self.invalidator.clone(),
            vec![
                InvalidationKey::story(story.id),
                InvalidationKey::artifact(updated.id),
                InvalidationKey::artifact(chapter.id),
            ],
            self.invalidation,
        );

        let elapsed_ms = started.elapsed().as_millis() as u64;
        tracing::info!(
            scene_id = %updated.id,
            word_count = updated.word_count,
            chapter_word_count = chapter.word_count,
            elapsed_ms = elapsed_ms,
            "Scene prose written"
        );

        Ok(WriteSceneContentResponse {
            scene: updated,
            chapter_word_count: chapter.word_count,
            elapsed_ms,
            model: invocation.model,
            tokens_used: invocation.tokens_used,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::commands::GenerateOptions;
    use crate::application::testing::TestEnv;
    use serde_json::json;
    use uuid::Uuid;

    fn write(scene_id: Uuid) -> WriteSceneContent {
        WriteSceneContent {
            scene_id,
            options: GenerateOptions::default(),
            cancel: None,
        }
    }

    #[tokio::test]
    async fn test_prose_is_formatted_and_rolled_into_chapter() {
        let env = TestEnv::new().await;
        let (character, setting) = env.seed_cast().await;
        let chapter = env.seed_chapter(None, 1).await;
        let first = env.seed_scene(chapter.id, 1, vec![character.id], Some(setting.id)).await;
        let second = env.seed_scene(chapter.id, 2, vec![character.id], Some(setting.id)).await;

        env.generator.respond_with("scene_content", |_| {
            json!({ "content": "The tide turned. \"**Run**.\"" })
        });
        let resp = env.write_scene.handle(write(first.id)).await.unwrap();
        assert_eq!(resp.scene.content, "The tide turned.\n\n\"Run.\"");
        assert_eq!(resp.scene.word_count, 4);

        env.generator
            .respond_with("scene_content", |_| json!({ "content": "Nobody followed." }));
        env.write_scene.handle(write(second.id)).await.unwrap();

        let chapter = env.story_repo.find_chapter(chapter.id).await.unwrap().unwrap();
        assert_eq!(
            chapter.content,
            "The tide turned.\n\n\"Run.\"\n\nNobody followed."
        );
        assert_eq!(chapter.word_count, 6);

        // 第二个场景的提示词带着上一场景正文
        let prompts = env.generator.prompts_for("scene_content");
        assert!(prompts[1].contains("The tide turned."));
    }

    #[tokio::test]
    async fn test_unknown_scene() {
        let env = TestEnv::new().await;
        let err = env.write_scene.handle(write(Uuid::new_v4())).await.unwrap_err();
        assert!(matches!(err, ApplicationError::NotFound { resource_type: "Scene", .. }));
    }

    #[tokio::test]
    async fn test_empty_prose_is_rejected() {
        let env = TestEnv::new().await;
        let (character, _) = env.seed_cast().await;
        let chapter = env.seed_chapter(None, 1).await;
        let scene = env.seed_scene(chapter.id, 1, vec![character.id], None).await;

        env.generator
            .respond_with("scene_content", |_| json!({ "content": "   " }));
        let err = env.write_scene.handle(write(scene.id)).await.unwrap_err();
        assert!(matches!(err, ApplicationError::GenerationSchema { .. }));

        let unchanged = env.story_repo.find_scene(scene.id).await.unwrap().unwrap();
        assert!(unchanged.content.is_empty());
    }
}
