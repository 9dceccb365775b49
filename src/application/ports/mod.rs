//! Application Ports - 出站端口定义
//!
//! 定义应用层与基础设施层的抽象接口

mod caches;
mod repositories;
mod text_generator;

pub use caches::{
    CacheError, CacheInvalidatorPort, ChapterTree, CharacterVisualCachePort, InvalidationKey,
    InvalidationKind, StoryTree, StoryViewCachePort, VisualCacheStats,
};
pub use repositories::{
    ActStructure, BeatRecord, CastRepositoryPort, ChapterRecord, CharacterRecord, ChildCounts,
    EvaluationRepositoryPort, PartRecord, PhysicalAttributes, RepositoryError, SceneRecord,
    SensoryPalette, SettingRecord, StoryRecord, StoryRepositoryPort,
};
pub use text_generator::{
    GenerationError, GenerationRequest, GenerationResponse, InvocationMode, TextGeneratorPort,
};
