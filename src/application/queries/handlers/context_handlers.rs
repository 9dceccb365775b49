//! Context Query Handlers - 上下文组装器
//!
//! 纯读操作。每个层级所需的上游材料缺一不可，
//! 所有缺失项在一次 ContextIncomplete 错误中一并报告。

use std::sync::Arc;

use futures_util::future::try_join3;
use uuid::Uuid;

use crate::application::error::{ApplicationError, ArtifactScope};
use crate::application::generation::GenerationContext;
use crate::application::ports::{
    CastRepositoryPort, ChapterRecord, PartRecord, RepositoryError, SceneRecord,
    StoryRepositoryPort,
};
use crate::application::queries::AssembleContext;
use crate::domain::story::GenerationLevel;

/// 检查已有序号是否从 1 开始连续，缺口记入 missing
fn check_gapless(label: &str, ordinals: impl IntoIterator<Item = u32>, missing: &mut Vec<String>) {
    let mut ordinals: Vec<u32> = ordinals.into_iter().collect();
    ordinals.sort_unstable();
    let Some(&max) = ordinals.last() else {
        return;
    };
    for expected in 1..=max {
        if ordinals.binary_search(&expected).is_err() {
            missing.push(format!("{} #{}", label, expected));
        }
    }
}

/// AssembleContext Handler
pub struct AssembleContextHandler {
    story_repo: Arc<dyn StoryRepositoryPort>,
    cast_repo: Arc<dyn CastRepositoryPort>,
}

impl AssembleContextHandler {
    pub fn new(
        story_repo: Arc<dyn StoryRepositoryPort>,
        cast_repo: Arc<dyn CastRepositoryPort>,
    ) -> Self {
        Self {
            story_repo,
            cast_repo,
        }
    }

    pub async fn handle(&self, query: AssembleContext) -> Result<GenerationContext, ApplicationError> {
        let AssembleContext {
            story_id,
            level,
            parent_id,
        } = query;
        let scope = ArtifactScope::new(level, story_id, parent_id);

        if parent_id.is_some() && !level.accepts_parent() {
            return Err(ApplicationError::validation(format!(
                "level '{}' does not take a parent",
                level
            )));
        }

        let persistence = move |e: RepositoryError| ApplicationError::persistence(scope, e);

        let Some(story) = self.story_repo.find_story(story_id).await.map_err(persistence)? else {
            return Err(self.incomplete(scope, vec![format!("story {}", story_id)]));
        };

        let (parts, characters, settings) = try_join3(
            self.story_repo.list_parts(story_id),
            self.cast_repo.list_characters(story_id),
            self.cast_repo.list_settings(story_id),
        )
        .await
        .map_err(persistence)?;

        let mut missing = Vec::new();
        let mut part = None;
        let mut chapter = None;
        let mut prior_chapters = Vec::new();
        let mut prior_scenes = Vec::new();

        match level {
            GenerationLevel::Part => {
                check_gapless("part", parts.iter().map(|p| p.ordinal_index), &mut missing);
            }
            GenerationLevel::Chapter => {
                if let Some(part_id) = parent_id {
                    part = self
                        .owned_part(story_id, part_id, &mut missing)
                        .await
                        .map_err(persistence)?;
                }
                prior_chapters = self
                    .story_repo
                    .list_chapters_in_scope(parent_id.unwrap_or(story_id))
                    .await
                    .map_err(persistence)?;
                check_gapless(
                    "chapter",
                    prior_chapters.iter().map(|c| c.ordinal_index),
                    &mut missing,
                );
            }
            GenerationLevel::SceneSummary => {
                match parent_id {
                    None => missing.push("chapter (parent_id required)".to_string()),
                    Some(chapter_id) => {
                        let owned = self
                            .owned_chapter(story_id, chapter_id, &mut missing)
                            .await
                            .map_err(persistence)?;
                        if let Some(found) = owned {
                            if let Some(part_id) = found.part_id {
                                part = self
                                    .owned_part(story_id, part_id, &mut missing)
                                    .await
                                    .map_err(persistence)?;
                            }
                            // 场景同样需要所属章节之前的全部章节
                            prior_chapters = self
                                .story_repo
                                .list_chapters_in_scope(found.part_id.unwrap_or(story_id))
                                .await
                                .map_err(persistence)?
                                .into_iter()
                                .filter(|c| c.ordinal_index < found.ordinal_index)
                                .collect();
                            check_gapless(
                                "chapter",
                                prior_chapters
                                    .iter()
                                    .map(|c| c.ordinal_index)
                                    .chain(std::iter::once(found.ordinal_index)),
                                &mut missing,
                            );
                            prior_scenes = self
                                .story_repo
                                .list_scenes(found.id)
                                .await
                                .map_err(persistence)?;
                            check_gapless(
                                "scene",
                                prior_scenes.iter().map(|s: &SceneRecord| s.ordinal_index),
                                &mut missing,
                            );
                            chapter = Some(found);
                        }
                    }
                }
                if characters.is_empty() {
                    missing.push("at least one character".to_string());
                }
                if settings.is_empty() {
                    missing.push("at least one setting".to_string());
                }
            }
            GenerationLevel::Character => {
                check_gapless(
                    "character",
                    characters.iter().map(|c| c.ordinal_index),
                    &mut missing,
                );
            }
            GenerationLevel::Setting => {
                check_gapless("setting", settings.iter().map(|s| s.ordinal_index), &mut missing);
            }
        }

        if !missing.is_empty() {
            return Err(self.incomplete(scope, missing));
        }

        Ok(GenerationContext {
            level,
            story,
            part,
            chapter,
            parts,
            prior_chapters,
            prior_scenes,
            characters,
            settings,
        })
    }

    fn incomplete(&self, scope: ArtifactScope, missing: Vec<String>) -> ApplicationError {
        tracing::warn!(
            artifact_level = scope.level,
            story_id = %scope.story_id,
            parent_id = ?scope.parent_id,
            missing = ?missing,
            "Generation context incomplete"
        );
        ApplicationError::ContextIncomplete { scope, missing }
    }

    async fn owned_part(
        &self,
        story_id: Uuid,
        part_id: Uuid,
        missing: &mut Vec<String>,
    ) -> Result<Option<PartRecord>, RepositoryError> {
        match self.story_repo.find_part(part_id).await? {
            Some(part) if part.story_id == story_id => Ok(Some(part)),
            _ => {
                missing.push(format!("part {}", part_id));
                Ok(None)
            }
        }
    }

    async fn owned_chapter(
        &self,
        story_id: Uuid,
        chapter_id: Uuid,
        missing: &mut Vec<String>,
    ) -> Result<Option<ChapterRecord>, RepositoryError> {
        match self.story_repo.find_chapter(chapter_id).await? {
            Some(chapter) if chapter.story_id == story_id => Ok(Some(chapter)),
            _ => {
                missing.push(format!("chapter {}", chapter_id));
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::testing::TestEnv;

    fn query(env: &TestEnv, level: GenerationLevel, parent_id: Option<Uuid>) -> AssembleContext {
        AssembleContext {
            story_id: env.story_id,
            level,
            parent_id,
        }
    }

    #[test]
    fn test_check_gapless() {
        let mut missing = Vec::new();
        check_gapless("chapter", [1, 2, 3], &mut missing);
        assert!(missing.is_empty());
        check_gapless("chapter", [1, 3], &mut missing);
        assert_eq!(missing, vec!["chapter #2".to_string()]);
    }

    #[tokio::test]
    async fn test_unknown_story_is_incomplete() {
        let env = TestEnv::new().await;
        let err = env
            .assemble
            .handle(AssembleContext {
                story_id: Uuid::new_v4(),
                level: GenerationLevel::Part,
                parent_id: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ApplicationError::ContextIncomplete { .. }));
    }

    #[tokio::test]
    async fn test_scene_summary_reports_every_missing_item() {
        let env = TestEnv::new().await;
        let chapter = env.seed_chapter(None, 1).await;

        let err = env
            .assemble
            .handle(query(&env, GenerationLevel::SceneSummary, Some(chapter.id)))
            .await
            .unwrap_err();
        match err {
            ApplicationError::ContextIncomplete { missing, scope } => {
                assert_eq!(scope.level, "scene_summary");
                assert_eq!(missing.len(), 2);
                assert!(missing.iter().any(|m| m.contains("character")));
                assert!(missing.iter().any(|m| m.contains("setting")));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_scene_summary_requires_parent() {
        let env = TestEnv::new().await;
        env.seed_cast().await;
        let err = env
            .assemble
            .handle(query(&env, GenerationLevel::SceneSummary, None))
            .await
            .unwrap_err();
        match err {
            ApplicationError::ContextIncomplete { missing, .. } => {
                assert_eq!(missing, vec!["chapter (parent_id required)".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_foreign_part_is_missing() {
        let env = TestEnv::new().await;
        let err = env
            .assemble
            .handle(query(&env, GenerationLevel::Chapter, Some(Uuid::new_v4())))
            .await
            .unwrap_err();
        assert!(matches!(err, ApplicationError::ContextIncomplete { .. }));
    }

    #[tokio::test]
    async fn test_part_level_rejects_parent() {
        let env = TestEnv::new().await;
        let err = env
            .assemble
            .handle(query(&env, GenerationLevel::Part, Some(Uuid::new_v4())))
            .await
            .unwrap_err();
        assert!(matches!(err, ApplicationError::ValidationError(_)));
    }

    #[tokio::test]
    async fn test_chapter_context_contains_prior_chapters() {
        let env = TestEnv::new().await;
        env.seed_chapter(None, 1).await;
        env.seed_chapter(None, 2).await;

        let ctx = env
            .assemble
            .handle(query(&env, GenerationLevel::Chapter, None))
            .await
            .unwrap();
        assert_eq!(ctx.prior_chapters.len(), 2);
        assert_eq!(ctx.next_ordinal(), 3);
        assert_eq!(ctx.prior_chapters[0].ordinal_index, 1);
    }

    #[tokio::test]
    async fn test_scene_context_is_complete_with_cast() {
        let env = TestEnv::new().await;
        env.seed_cast().await;
        let chapter = env.seed_chapter(None, 1).await;

        let ctx = env
            .assemble
            .handle(query(&env, GenerationLevel::SceneSummary, Some(chapter.id)))
            .await
            .unwrap();
        assert_eq!(ctx.chapter.as_ref().map(|c| c.id), Some(chapter.id));
        assert_eq!(ctx.next_ordinal(), 1);
        assert_eq!(ctx.characters.len(), 1);
    }

    #[tokio::test]
    async fn test_scene_context_includes_prior_chapters_in_scope() {
        let env = TestEnv::new().await;
        env.seed_cast().await;
        let first = env.seed_chapter(None, 1).await;
        let second = env.seed_chapter(None, 2).await;
        env.seed_chapter(None, 3).await;

        let ctx = env
            .assemble
            .handle(query(&env, GenerationLevel::SceneSummary, Some(second.id)))
            .await
            .unwrap();
        assert_eq!(ctx.prior_chapters.len(), 1);
        assert_eq!(ctx.prior_chapters[0].id, first.id);

        let prompt = crate::application::generation::prompts::render_context(&ctx);
        assert!(prompt.contains("## Previous chapters"));
        assert!(prompt.contains(&first.title));
    }
}
