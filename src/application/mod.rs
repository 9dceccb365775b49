//! 应用层 - 用例编排
//!
//! 包含：
//! - ports: 六边形架构端口定义（TextGenerator、Repository、Cache 等）
//! - generation: 上下文、提示词、结构化调用、排序锁、缓存失效
//! - commands: CQRS 命令及处理器
//! - queries: CQRS 查询及处理器
//! - error: 应用层错误定义

pub mod commands;
pub mod error;
pub mod generation;
pub mod ports;
pub mod queries;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports
pub use commands::{
    AdvanceStoryStatus, DeleteStory, EvaluateArtifact, GenerateNext, GenerateOptions,
    GenerateStory, PublishChapter, WriteSceneContent,
    handlers::{
        AdvanceStoryStatusHandler, DeleteStoryHandler, EvaluateArtifactHandler,
        GenerateNextHandler, GenerateNextResponse, GenerateStoryHandler, GeneratedArtifact,
        PublishChapterHandler, WriteSceneContentHandler, WriteSceneContentResponse,
    },
};

pub use error::{ApplicationError, ArtifactScope};

pub use generation::{
    GenerationContext, GenerationSettings, InvalidationPolicy, ScopeLocks, StructuredInvoker,
};

pub use ports::{
    // Caches
    CacheError,
    CacheInvalidatorPort,
    CharacterVisualCachePort,
    InvalidationKey,
    StoryTree,
    StoryViewCachePort,
    VisualCacheStats,
    // Repositories
    CastRepositoryPort,
    ChapterRecord,
    CharacterRecord,
    EvaluationRepositoryPort,
    PartRecord,
    RepositoryError,
    SceneRecord,
    SettingRecord,
    StoryRecord,
    StoryRepositoryPort,
    // Text generator
    GenerationError,
    GenerationRequest,
    GenerationResponse,
    TextGeneratorPort,
};

pub use queries::{
    AssembleContext, CharacterImagePrompt, GetScene, GetStoryTree, ListEvaluations, ListStories,
    ScenePrompts,
    handlers::{
        AssembleContextHandler, CharacterImagePromptHandler, CharacterPromptResponse,
        GetSceneHandler, GetStoryTreeHandler, ListEvaluationsHandler, ListStoriesHandler,
        ScenePromptsHandler, ScenePromptsResponse,
    },
};
