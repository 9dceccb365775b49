//! Story Lifecycle Command Handlers

use std::sync::Arc;

use chrono::Utc;

use crate::application::commands::{AdvanceStoryStatus, DeleteStory, PublishChapter};
use crate::application::error::ApplicationError;
use crate::application::generation::{spawn_invalidation, InvalidationPolicy};
use crate::application::ports::{
    CacheInvalidatorPort, ChapterRecord, InvalidationKey, StoryRecord, StoryRepositoryPort,
};

// ============================================================================
// AdvanceStoryStatus
// ============================================================================

/// AdvanceStoryStatus Handler（状态只能前进）
pub struct AdvanceStoryStatusHandler {
    story_repo: Arc<dyn StoryRepositoryPort>,
    invalidator: Arc<dyn CacheInvalidatorPort>,
    invalidation: InvalidationPolicy,
}

impl AdvanceStoryStatusHandler {
    pub fn new(
        story_repo: Arc<dyn StoryRepositoryPort>,
        invalidator: Arc<dyn CacheInvalidatorPort>,
        invalidation: InvalidationPolicy,
    ) -> Self {
        Self {
            story_repo,
            invalidator,
            invalidation,
        }
    }

    pub async fn handle(&self, command: AdvanceStoryStatus) -> Result<StoryRecord, ApplicationError> {
        let mut story = self
            .story_repo
            .find_story(command.story_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("Story", command.story_id))?;

        let from = story.status;
        story.status = from.advance_to(command.status)?;
        self.story_repo
            .update_story_status(story.id, story.status)
            .await?;

        spawn_invalidation(
            self.invalidator.clone(),
            vec![InvalidationKey::story(story.id)],
            self.invalidation,
        );

        tracing::info!(
            story_id = %story.id,
            from = from.as_str(),
            to = story.status.as_str(),
            "Story status advanced"
        );
        Ok(story)
    }
}

// ============================================================================
// PublishChapter
// ============================================================================

/// PublishChapter Handler（只能发布一次，正文不能为空）
pub struct PublishChapterHandler {
    story_repo: Arc<dyn StoryRepositoryPort>,
    invalidator: Arc<dyn CacheInvalidatorPort>,
    invalidation: InvalidationPolicy,
}

impl PublishChapterHandler {
    pub fn new(
        story_repo: Arc<dyn StoryRepositoryPort>,
        invalidator: Arc<dyn CacheInvalidatorPort>,
        invalidation: InvalidationPolicy,
    ) -> Self {
        Self {
            story_repo,
            invalidator,
            invalidation,
        }
    }

    pub async fn handle(&self, command: PublishChapter) -> Result<ChapterRecord, ApplicationError> {
        let mut chapter = self
            .story_repo
            .find_chapter(command.chapter_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("Chapter", command.chapter_id))?;

        if chapter.published_at.is_some() {
            return Err(ApplicationError::invalid_state(format!(
                "chapter {} is already published",
                chapter.id
            )));
        }
        if chapter.content.trim().is_empty() {
            return Err(ApplicationError::invalid_state(format!(
                "chapter {} has no content",
                chapter.id
            )));
        }

        let now = Utc::now();
        self.story_repo.publish_chapter(chapter.id, now).await?;
        chapter.published_at = Some(now);

        spawn_invalidation(
            self.invalidator.clone(),
            vec![
                InvalidationKey::story(chapter.story_id),
                InvalidationKey::artifact(chapter.id),
            ],
            self.invalidation,
        );

        tracing::info!(chapter_id = %chapter.id, story_id = %chapter.story_id, "Chapter published");
        Ok(chapter)
    }
}

// ============================================================================
// DeleteStory
// ============================================================================

/// DeleteStory Handler（存在子产物时拒绝）
pub struct DeleteStoryHandler {
    story_repo: Arc<dyn StoryRepositoryPort>,
    invalidator: Arc<dyn CacheInvalidatorPort>,
    invalidation: InvalidationPolicy,
}

impl DeleteStoryHandler {
    pub fn new(
        story_repo: Arc<dyn StoryRepositoryPort>,
        invalidator: Arc<dyn CacheInvalidatorPort>,
        invalidation: InvalidationPolicy,
    ) -> Self {
        Self {
            story_repo,
            invalidator,
            invalidation,
        }
    }

    pub async fn handle(&self, command: DeleteStory) -> Result<(), ApplicationError> {
        if self.story_repo.find_story(command.story_id).await?.is_none() {
            return Err(ApplicationError::not_found("Story", command.story_id));
        }

        let children = self.story_repo.count_children(command.story_id).await?;
        if children.total() > 0 {
            return Err(ApplicationError::invalid_state(format!(
                "story {} still has {} child artifacts",
                command.story_id,
                children.total()
            )));
        }

        self.story_repo.delete_story(command.story_id).await?;
        spawn_invalidation(
            self.invalidator.clone(),
            vec![InvalidationKey::story(command.story_id)],
            self.invalidation,
        );

        tracing::info!(story_id = %command.story_id, "Story deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::testing::TestEnv;
    use crate::domain::story::StoryStatus;

    #[tokio::test]
    async fn test_status_only_moves_forward() {
        let env = TestEnv::new().await;
        let handler = AdvanceStoryStatusHandler::new(
            env.story_repo.clone(),
            env.view_cache_invalidator(),
            InvalidationPolicy::default(),
        );

        let story = handler
            .handle(AdvanceStoryStatus {
                story_id: env.story_id,
                status: StoryStatus::Complete,
            })
            .await
            .unwrap();
        assert_eq!(story.status, StoryStatus::Complete);

        let err = handler
            .handle(AdvanceStoryStatus {
                story_id: env.story_id,
                status: StoryStatus::Writing,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ApplicationError::InvalidState(_)));

        let stored = env.story_repo.find_story(env.story_id).await.unwrap().unwrap();
        assert_eq!(stored.status, StoryStatus::Complete);
    }

    #[tokio::test]
    async fn test_publish_requires_content_and_happens_once() {
        let env = TestEnv::new().await;
        let chapter = env.seed_chapter(None, 1).await;
        let handler = PublishChapterHandler::new(
            env.story_repo.clone(),
            env.view_cache_invalidator(),
            InvalidationPolicy::default(),
        );

        let err = handler
            .handle(PublishChapter { chapter_id: chapter.id })
            .await
            .unwrap_err();
        assert!(matches!(err, ApplicationError::InvalidState(_)));

        env.story_repo
            .update_chapter_content(chapter.id, "It was over.")
            .await
            .unwrap();
        let published = handler
            .handle(PublishChapter { chapter_id: chapter.id })
            .await
            .unwrap();
        assert!(published.published_at.is_some());

        let again = handler
            .handle(PublishChapter { chapter_id: chapter.id })
            .await
            .unwrap_err();
        assert!(matches!(again, ApplicationError::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_delete_refused_with_children() {
        let env = TestEnv::new().await;
        let handler = DeleteStoryHandler::new(
            env.story_repo.clone(),
            env.view_cache_invalidator(),
            InvalidationPolicy::default(),
        );
        env.seed_chapter(None, 1).await;

        let err = handler
            .handle(DeleteStory { story_id: env.story_id })
            .await
            .unwrap_err();
        assert!(matches!(err, ApplicationError::InvalidState(_)));
        assert!(env.story_repo.find_story(env.story_id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_empty_story() {
        let env = TestEnv::new().await;
        let handler = DeleteStoryHandler::new(
            env.story_repo.clone(),
            env.view_cache_invalidator(),
            InvalidationPolicy::default(),
        );
        handler
            .handle(DeleteStory { story_id: env.story_id })
            .await
            .unwrap();
        assert!(env.story_repo.find_story(env.story_id).await.unwrap().is_none());

        let err = handler
            .handle(DeleteStory { story_id: env.story_id })
            .await
            .unwrap_err();
        assert!(matches!(err, ApplicationError::NotFound { .. }));
    }
}
