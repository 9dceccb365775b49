//! 生成支撑
//!
//! - context: 生成上下文
//! - drafts: 结构化草稿与 JSON Schema
//! - structured: 输出解析与严格校验
//! - prompts: 提示词渲染
//! - invoker: 超时/取消/解析的结构化调用
//! - invalidation: 后台缓存失效
//! - locks: 排序范围串行锁

pub mod context;
pub mod drafts;
pub mod invalidation;
pub mod invoker;
pub mod locks;
pub mod prompts;
pub mod structured;

pub use context::GenerationContext;
pub use drafts::{
    CharacterDraft, ChapterDraft, CriticDraft, Draft, PartDraft, SceneContentDraft,
    SceneSummaryDraft, SchemaError, SettingDraft, StoryDraft,
};
pub use invalidation::{spawn_invalidation, InvalidationPolicy};
pub use invoker::{GenerationSettings, Invocation, InvocationOverrides, StructuredInvoker};
pub use locks::{ScopeGuard, ScopeKey, ScopeLocks};
pub use structured::parse_draft;
