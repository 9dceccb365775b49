//! Cache Ports - 缓存与失效
//!
//! - CacheInvalidatorPort: 产物写入后的缓存失效通知
//! - StoryViewCachePort: 故事树读模型缓存
//! - CharacterVisualCachePort: 角色外观描述缓存（图片提示词一致性）

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use super::repositories::{
    ChapterRecord, CharacterRecord, PartRecord, SceneRecord, SettingRecord, StoryRecord,
};

/// 缓存错误
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache unavailable: {0}")]
    Unavailable(String),
}

/// 失效目标类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidationKind {
    Story,
    Artifact,
}

/// 失效键
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct InvalidationKey {
    pub kind: InvalidationKind,
    pub id: Uuid,
}

impl InvalidationKey {
    pub fn story(id: Uuid) -> Self {
        Self {
            kind: InvalidationKind::Story,
            id,
        }
    }

    pub fn artifact(id: Uuid) -> Self {
        Self {
            kind: InvalidationKind::Artifact,
            id,
        }
    }
}

/// Cache Invalidator Port
#[async_trait]
pub trait CacheInvalidatorPort: Send + Sync {
    async fn invalidate(&self, key: InvalidationKey) -> Result<(), CacheError>;
}

// ============================================================================
// Story View Cache
// ============================================================================

/// 章节及其场景
#[derive(Debug, Clone, Serialize)]
pub struct ChapterTree {
    pub chapter: ChapterRecord,
    pub scenes: Vec<SceneRecord>,
}

/// 故事完整读模型
#[derive(Debug, Clone, Serialize)]
pub struct StoryTree {
    pub story: StoryRecord,
    pub parts: Vec<PartRecord>,
    pub chapters: Vec<ChapterTree>,
    pub characters: Vec<CharacterRecord>,
    pub settings: Vec<SettingRecord>,
}

/// Story View Cache Port
///
/// 读取方在加载前取得 epoch，写回时带上它；
/// 加载期间发生过失效则不写入
pub trait StoryViewCachePort: Send + Sync {
    fn get(&self, story_id: Uuid) -> Option<Arc<StoryTree>>;

    /// 当前失效代数
    fn epoch(&self) -> u64;

    /// epoch 未变时写入并返回 true
    fn put(&self, story_id: Uuid, tree: Arc<StoryTree>, epoch: u64) -> bool;

    fn len(&self) -> usize;
}

// ============================================================================
// Character Visual Cache
// ============================================================================

/// 缓存统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct VisualCacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

/// Character Visual Cache Port
///
/// 每个角色只构建一次规范外观描述，后续请求在其后追加姿态/动作
pub trait CharacterVisualCachePort: Send + Sync {
    /// 角色的规范外观描述（首次调用时构建）
    fn fragment_for(&self, character: &CharacterRecord) -> Arc<str>;

    /// 规范描述 + 可选的姿态/动作修饰
    fn prompt_for(&self, character: &CharacterRecord, modifier: Option<&str>) -> String {
        let fragment = self.fragment_for(character);
        match modifier.map(str::trim).filter(|m| !m.is_empty()) {
            Some(modifier) => format!("{}, {}", fragment, modifier),
            None => fragment.to_string(),
        }
    }

    fn clear(&self);

    fn len(&self) -> usize;

    fn stats(&self) -> VisualCacheStats;
}
