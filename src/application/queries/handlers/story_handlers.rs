//! Story Query Handlers

use std::sync::Arc;

use futures_util::future::try_join_all;

use crate::application::error::ApplicationError;
use crate::application::ports::{
    CastRepositoryPort, ChapterTree, EvaluationRepositoryPort, SceneRecord, StoryRecord,
    StoryRepositoryPort, StoryTree, StoryViewCachePort,
};
use crate::application::queries::{GetScene, GetStoryTree, ListEvaluations, ListStories};
use crate::domain::evaluation::EvaluationReport;

// ============================================================================
// GetStoryTree
// ============================================================================

/// GetStoryTree Handler（经由故事视图缓存读取）
pub struct GetStoryTreeHandler {
    story_repo: Arc<dyn StoryRepositoryPort>,
    cast_repo: Arc<dyn CastRepositoryPort>,
    view_cache: Arc<dyn StoryViewCachePort>,
}

impl GetStoryTreeHandler {
    pub fn new(
        story_repo: Arc<dyn StoryRepositoryPort>,
        cast_repo: Arc<dyn CastRepositoryPort>,
        view_cache: Arc<dyn StoryViewCachePort>,
    ) -> Self {
        Self {
            story_repo,
            cast_repo,
            view_cache,
        }
    }

    pub async fn handle(&self, query: GetStoryTree) -> Result<Arc<StoryTree>, ApplicationError> {
        if let Some(tree) = self.view_cache.get(query.story_id) {
            tracing::debug!(story_id = %query.story_id, "Story tree cache hit");
            return Ok(tree);
        }

        // 必须在加载前读取
        let epoch = self.view_cache.epoch();
        let story = self
            .story_repo
            .find_story(query.story_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("Story", query.story_id))?;

        let parts = self.story_repo.list_parts(story.id).await?;
        let chapters = self.story_repo.list_chapters(story.id).await?;
        let chapters = try_join_all(chapters.into_iter().map(|chapter| async move {
            let scenes = self.story_repo.list_scenes(chapter.id).await?;
            Ok::<_, ApplicationError>(ChapterTree { chapter, scenes })
        }))
        .await?;
        let characters = self.cast_repo.list_characters(story.id).await?;
        let settings = self.cast_repo.list_settings(story.id).await?;

        let tree = Arc::new(StoryTree {
            story,
            parts,
            chapters,
            characters,
            settings,
        });
        if !self.view_cache.put(query.story_id, tree.clone(), epoch) {
            tracing::debug!(story_id = %query.story_id, "Story changed while loading, tree not cached");
        }
        Ok(tree)
    }
}

// ============================================================================
// ListStories / GetScene
// ============================================================================

/// ListStories Handler
pub struct ListStoriesHandler {
    story_repo: Arc<dyn StoryRepositoryPort>,
}

impl ListStoriesHandler {
    pub fn new(story_repo: Arc<dyn StoryRepositoryPort>) -> Self {
        Self { story_repo }
    }

    pub async fn handle(&self, _query: ListStories) -> Result<Vec<StoryRecord>, ApplicationError> {
        Ok(self.story_repo.list_stories().await?)
    }
}

/// GetScene Handler
pub struct GetSceneHandler {
    story_repo: Arc<dyn StoryRepositoryPort>,
}

impl GetSceneHandler {
    pub fn new(story_repo: Arc<dyn StoryRepositoryPort>) -> Self {
        Self { story_repo }
    }

    pub async fn handle(&self, query: GetScene) -> Result<SceneRecord, ApplicationError> {
        self.story_repo
            .find_scene(query.scene_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("Scene", query.scene_id))
    }
}

// ============================================================================
// ListEvaluations
// ============================================================================

/// ListEvaluations Handler（最新的在前）
pub struct ListEvaluationsHandler {
    evaluation_repo: Arc<dyn EvaluationRepositoryPort>,
}

impl ListEvaluationsHandler {
    pub fn new(evaluation_repo: Arc<dyn EvaluationRepositoryPort>) -> Self {
        Self { evaluation_repo }
    }

    pub async fn handle(
        &self,
        query: ListEvaluations,
    ) -> Result<Vec<EvaluationReport>, ApplicationError> {
        Ok(self.evaluation_repo.list_by_artifact(query.artifact_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::commands::{GenerateNext, GenerateOptions};
    use crate::application::ports::{CharacterRecord, RepositoryError, SettingRecord};
    use crate::application::testing::TestEnv;
    use crate::domain::story::GenerationLevel;
    use async_trait::async_trait;
    use std::time::Duration;
    use uuid::Uuid;

    /// list_characters 前先等待的角色仓库
    struct SlowCastRepository {
        inner: Arc<dyn CastRepositoryPort>,
        delay: Duration,
    }

    #[async_trait]
    impl CastRepositoryPort for SlowCastRepository {
        async fn insert_character(&self, character: &CharacterRecord) -> Result<(), RepositoryError> {
            self.inner.insert_character(character).await
        }

        async fn find_character(&self, id: Uuid) -> Result<Option<CharacterRecord>, RepositoryError> {
            self.inner.find_character(id).await
        }

        async fn list_characters(
            &self,
            story_id: Uuid,
        ) -> Result<Vec<CharacterRecord>, RepositoryError> {
            tokio::time::sleep(self.delay).await;
            self.inner.list_characters(story_id).await
        }

        async fn insert_setting(&self, setting: &SettingRecord) -> Result<(), RepositoryError> {
            self.inner.insert_setting(setting).await
        }

        async fn find_setting(&self, id: Uuid) -> Result<Option<SettingRecord>, RepositoryError> {
            self.inner.find_setting(id).await
        }

        async fn list_settings(&self, story_id: Uuid) -> Result<Vec<SettingRecord>, RepositoryError> {
            self.inner.list_settings(story_id).await
        }
    }

    #[tokio::test]
    async fn test_story_tree_is_cached_until_invalidated() {
        let env = TestEnv::new().await;
        env.seed_chapter(None, 1).await;

        let tree = env
            .story_tree
            .handle(GetStoryTree { story_id: env.story_id })
            .await
            .unwrap();
        assert_eq!(tree.chapters.len(), 1);
        assert_eq!(env.view_cache.len(), 1);

        // 缓存命中：新章节不可见
        env.seed_chapter(None, 2).await;
        let cached = env
            .story_tree
            .handle(GetStoryTree { story_id: env.story_id })
            .await
            .unwrap();
        assert_eq!(cached.chapters.len(), 1);

        env.invalidate_story().await;
        let fresh = env
            .story_tree
            .handle(GetStoryTree { story_id: env.story_id })
            .await
            .unwrap();
        assert_eq!(fresh.chapters.len(), 2);
    }

    #[tokio::test]
    async fn test_get_missing_scene() {
        let env = TestEnv::new().await;
        let err = GetSceneHandler::new(env.story_repo.clone())
            .handle(GetScene {
                scene_id: uuid::Uuid::new_v4(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ApplicationError::NotFound { resource_type: "Scene", .. }));
    }

    #[tokio::test]
    async fn test_tree_loaded_during_generation_is_not_cached() {
        let env = TestEnv::new().await;
        let handler = GetStoryTreeHandler::new(
            env.story_repo.clone(),
            Arc::new(SlowCastRepository {
                inner: env.cast_repo.clone(),
                delay: Duration::from_millis(150),
            }),
            env.view_cache.clone(),
        );

        let (during, generated) = tokio::join!(
            handler.handle(GetStoryTree { story_id: env.story_id }),
            async {
                tokio::time::sleep(Duration::from_millis(20)).await;
                env.generate_next
                    .handle(GenerateNext {
                        story_id: env.story_id,
                        level: GenerationLevel::Chapter,
                        parent_id: None,
                        options: GenerateOptions::default(),
                        cancel: None,
                    })
                    .await
            }
        );
        assert_eq!(during.unwrap().chapters.len(), 0);
        generated.unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        let after = handler
            .handle(GetStoryTree { story_id: env.story_id })
            .await
            .unwrap();
        assert_eq!(after.chapters.len(), 1);
    }
}
