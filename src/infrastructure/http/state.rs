//! Application State
//!
//! 包含所有 Command/Query Handlers 的应用状态

use std::sync::Arc;

use crate::application::generation::{
    GenerationSettings, InvalidationPolicy, ScopeLocks, StructuredInvoker,
};
use crate::application::{
    // Command handlers
    AdvanceStoryStatusHandler, DeleteStoryHandler, EvaluateArtifactHandler, GenerateNextHandler,
    GenerateStoryHandler, PublishChapterHandler, WriteSceneContentHandler,
    // Query handlers
    AssembleContextHandler, CharacterImagePromptHandler, GetSceneHandler, GetStoryTreeHandler,
    ListEvaluationsHandler, ListStoriesHandler, ScenePromptsHandler,
    // Ports
    CacheInvalidatorPort, CastRepositoryPort, CharacterVisualCachePort, EvaluationRepositoryPort,
    StoryRepositoryPort, StoryViewCachePort, TextGeneratorPort,
};
use crate::domain::evaluation::ScoringPolicy;

/// 应用状态的端口集合
pub struct StatePorts {
    pub story_repo: Arc<dyn StoryRepositoryPort>,
    pub cast_repo: Arc<dyn CastRepositoryPort>,
    pub evaluation_repo: Arc<dyn EvaluationRepositoryPort>,
    pub generator: Arc<dyn TextGeneratorPort>,
    pub view_cache: Arc<dyn StoryViewCachePort>,
    pub invalidator: Arc<dyn CacheInvalidatorPort>,
    pub visual_cache: Arc<dyn CharacterVisualCachePort>,
}

/// 应用状态
pub struct AppState {
    // ========== Ports ==========
    pub story_repo: Arc<dyn StoryRepositoryPort>,
    pub generator: Arc<dyn TextGeneratorPort>,
    pub visual_cache: Arc<dyn CharacterVisualCachePort>,

    // ========== Command Handlers ==========
    pub generate_story_handler: GenerateStoryHandler,
    pub generate_next_handler: GenerateNextHandler,
    pub write_scene_handler: WriteSceneContentHandler,
    pub advance_status_handler: AdvanceStoryStatusHandler,
    pub publish_chapter_handler: PublishChapterHandler,
    pub delete_story_handler: DeleteStoryHandler,
    pub evaluate_handler: EvaluateArtifactHandler,

    // ========== Query Handlers ==========
    pub assemble_context_handler: Arc<AssembleContextHandler>,
    pub story_tree_handler: GetStoryTreeHandler,
    pub list_stories_handler: ListStoriesHandler,
    pub get_scene_handler: GetSceneHandler,
    pub list_evaluations_handler: ListEvaluationsHandler,
    pub character_prompt_handler: CharacterImagePromptHandler,
    pub scene_prompts_handler: ScenePromptsHandler,
}

impl AppState {
    /// 创建应用状态
    pub fn new(
        ports: StatePorts,
        settings: GenerationSettings,
        scoring: ScoringPolicy,
        invalidation: InvalidationPolicy,
    ) -> Self {
        let StatePorts {
            story_repo,
            cast_repo,
            evaluation_repo,
            generator,
            view_cache,
            invalidator,
            visual_cache,
        } = ports;

        let invoker = Arc::new(StructuredInvoker::new(generator.clone(), settings));
        let locks = Arc::new(ScopeLocks::new());
        let assemble_context_handler = Arc::new(AssembleContextHandler::new(
            story_repo.clone(),
            cast_repo.clone(),
        ));

        Self {
            // Command handlers
            generate_story_handler: GenerateStoryHandler::new(story_repo.clone(), invoker.clone()),
            generate_next_handler: GenerateNextHandler::new(
                assemble_context_handler.clone(),
                story_repo.clone(),
                cast_repo.clone(),
                invoker.clone(),
                invalidator.clone(),
                locks.clone(),
                invalidation,
            ),
            write_scene_handler: WriteSceneContentHandler::new(
                story_repo.clone(),
                cast_repo.clone(),
                invoker.clone(),
                invalidator.clone(),
                locks,
                invalidation,
            ),
            advance_status_handler: AdvanceStoryStatusHandler::new(
                story_repo.clone(),
                invalidator.clone(),
                invalidation,
            ),
            publish_chapter_handler: PublishChapterHandler::new(
                story_repo.clone(),
                invalidator.clone(),
                invalidation,
            ),
            delete_story_handler: DeleteStoryHandler::new(
                story_repo.clone(),
                invalidator,
                invalidation,
            ),
            evaluate_handler: EvaluateArtifactHandler::new(
                story_repo.clone(),
                cast_repo.clone(),
                evaluation_repo.clone(),
                invoker,
                scoring,
            ),

            // Query handlers
            assemble_context_handler,
            story_tree_handler: GetStoryTreeHandler::new(
                story_repo.clone(),
                cast_repo.clone(),
                view_cache,
            ),
            list_stories_handler: ListStoriesHandler::new(story_repo.clone()),
            get_scene_handler: GetSceneHandler::new(story_repo.clone()),
            list_evaluations_handler: ListEvaluationsHandler::new(evaluation_repo),
            character_prompt_handler: CharacterImagePromptHandler::new(
                cast_repo.clone(),
                visual_cache.clone(),
            ),
            scene_prompts_handler: ScenePromptsHandler::new(
                story_repo.clone(),
                cast_repo,
                visual_cache.clone(),
            ),

            // Ports
            story_repo,
            generator,
            visual_cache,
        }
    }
}
