//! Repository Ports - 出站端口
//!
//! 定义数据持久化的抽象接口
//! 具体实现在 infrastructure 层（SQLite）

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::evaluation::EvaluationReport;
use crate::domain::story::{CyclePhase, ShotType, StoryStatus, StoryStructure, Tone};

/// Repository 错误
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Duplicate entity: {0}")]
    Duplicate(String),

    /// (scope, ordinal_index) 唯一约束冲突
    #[error("Ordinal conflict: {0}")]
    OrdinalConflict(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

// ============================================================================
// Story
// ============================================================================

/// 故事实体（用于持久化）
#[derive(Debug, Clone, Serialize)]
pub struct StoryRecord {
    pub id: Uuid,
    pub title: String,
    pub premise: String,
    pub genre: String,
    pub tone: Tone,
    pub status: StoryStatus,
    pub structure: StoryStructure,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 分部
#[derive(Debug, Clone, Serialize)]
pub struct PartRecord {
    pub id: Uuid,
    pub story_id: Uuid,
    pub ordinal_index: u32,
    pub title: String,
    pub goal: String,
    pub conflict: String,
    pub outcome: String,
    pub summary: String,
    pub created_at: DateTime<Utc>,
}

/// 三幕结构
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActStructure {
    pub setup: String,
    pub confrontation: String,
    pub resolution: String,
}

impl ActStructure {
    /// 已填写的幕数
    pub fn fields_present(&self) -> u8 {
        [&self.setup, &self.confrontation, &self.resolution]
            .iter()
            .filter(|s| !s.trim().is_empty())
            .count() as u8
    }
}

/// 章节
#[derive(Debug, Clone, Serialize)]
pub struct ChapterRecord {
    pub id: Uuid,
    pub story_id: Uuid,
    /// 所属分部；为空时排序范围是整个故事
    pub part_id: Option<Uuid>,
    pub ordinal_index: u32,
    pub title: String,
    pub summary: String,
    pub pov_character: String,
    pub act: ActStructure,
    pub content: String,
    /// 由持久化层根据 content 重新计算
    pub word_count: usize,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ChapterRecord {
    /// 序号的排序范围
    pub fn scope_id(&self) -> Uuid {
        self.part_id.unwrap_or(self.story_id)
    }
}

/// 场景节拍
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeatRecord {
    pub description: String,
    pub shot: Option<ShotType>,
}

/// 场景
#[derive(Debug, Clone, Serialize)]
pub struct SceneRecord {
    pub id: Uuid,
    pub story_id: Uuid,
    pub chapter_id: Uuid,
    pub ordinal_index: u32,
    pub title: String,
    pub summary: String,
    pub cycle_phase: CyclePhase,
    pub time: String,
    pub place: String,
    pub pov: String,
    pub setting_id: Option<Uuid>,
    pub character_ids: Vec<Uuid>,
    pub goal: String,
    pub obstacle: String,
    pub outcome: String,
    pub beats: Vec<BeatRecord>,
    pub content: String,
    pub word_count: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SceneRecord {
    /// 已填写的 goal/obstacle/outcome 数
    pub fn structure_fields_present(&self) -> u8 {
        [&self.goal, &self.obstacle, &self.outcome]
            .iter()
            .filter(|s| !s.trim().is_empty())
            .count() as u8
    }
}

/// 一个故事下的子产物数量
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ChildCounts {
    pub parts: usize,
    pub chapters: usize,
    pub scenes: usize,
    pub characters: usize,
    pub settings: usize,
}

impl ChildCounts {
    pub fn total(&self) -> usize {
        self.parts + self.chapters + self.scenes + self.characters + self.settings
    }
}

/// Story Repository Port
///
/// 故事、分部、章节、场景；所有列表按 ordinal_index 升序
#[async_trait]
pub trait StoryRepositoryPort: Send + Sync {
    async fn insert_story(&self, story: &StoryRecord) -> Result<(), RepositoryError>;

    async fn find_story(&self, id: Uuid) -> Result<Option<StoryRecord>, RepositoryError>;

    async fn list_stories(&self) -> Result<Vec<StoryRecord>, RepositoryError>;

    async fn update_story_status(
        &self,
        id: Uuid,
        status: StoryStatus,
    ) -> Result<(), RepositoryError>;

    /// 更新 updated_at
    async fn touch_story(&self, id: Uuid) -> Result<(), RepositoryError>;

    async fn delete_story(&self, id: Uuid) -> Result<(), RepositoryError>;

    async fn count_children(&self, story_id: Uuid) -> Result<ChildCounts, RepositoryError>;

    /// 插入分部；序号冲突时返回 OrdinalConflict
    async fn insert_part(&self, part: &PartRecord) -> Result<(), RepositoryError>;

    async fn find_part(&self, id: Uuid) -> Result<Option<PartRecord>, RepositoryError>;

    async fn list_parts(&self, story_id: Uuid) -> Result<Vec<PartRecord>, RepositoryError>;

    /// 插入章节；word_count 由 content 重新计算
    async fn insert_chapter(&self, chapter: &ChapterRecord) -> Result<(), RepositoryError>;

    async fn find_chapter(&self, id: Uuid) -> Result<Option<ChapterRecord>, RepositoryError>;

    /// 排序范围内的章节（scope 为 part_id 或 story_id）
    async fn list_chapters_in_scope(
        &self,
        scope_id: Uuid,
    ) -> Result<Vec<ChapterRecord>, RepositoryError>;

    /// 故事下的全部章节
    async fn list_chapters(&self, story_id: Uuid) -> Result<Vec<ChapterRecord>, RepositoryError>;

    /// 更新章节正文，返回重新计算字数后的记录
    async fn update_chapter_content(
        &self,
        id: Uuid,
        content: &str,
    ) -> Result<ChapterRecord, RepositoryError>;

    async fn publish_chapter(
        &self,
        id: Uuid,
        published_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError>;

    async fn insert_scene(&self, scene: &SceneRecord) -> Result<(), RepositoryError>;

    async fn find_scene(&self, id: Uuid) -> Result<Option<SceneRecord>, RepositoryError>;

    async fn list_scenes(&self, chapter_id: Uuid) -> Result<Vec<SceneRecord>, RepositoryError>;

    /// 更新场景正文，返回重新计算字数后的记录
    async fn update_scene_content(
        &self,
        id: Uuid,
        content: &str,
    ) -> Result<SceneRecord, RepositoryError>;
}

// ============================================================================
// Cast (Characters & Settings)
// ============================================================================

/// 外貌特征
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicalAttributes {
    pub age: String,
    pub build: String,
    pub hair: String,
    pub eyes: String,
    pub skin: String,
    pub attire: String,
    pub distinguishing_features: Vec<String>,
}

/// 角色
#[derive(Debug, Clone, Serialize)]
pub struct CharacterRecord {
    pub id: Uuid,
    pub story_id: Uuid,
    pub ordinal_index: u32,
    pub name: String,
    pub role: String,
    pub summary: String,
    pub physical: PhysicalAttributes,
    pub voice: String,
    pub created_at: DateTime<Utc>,
}

/// 感官调色板
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensoryPalette {
    pub sight: String,
    pub sound: String,
    pub smell: String,
    pub touch: String,
    pub taste: String,
}

/// 场景地点
#[derive(Debug, Clone, Serialize)]
pub struct SettingRecord {
    pub id: Uuid,
    pub story_id: Uuid,
    pub ordinal_index: u32,
    pub name: String,
    pub description: String,
    pub sensory: SensoryPalette,
    pub created_at: DateTime<Utc>,
}

/// Cast Repository Port
#[async_trait]
pub trait CastRepositoryPort: Send + Sync {
    async fn insert_character(&self, character: &CharacterRecord) -> Result<(), RepositoryError>;

    async fn find_character(&self, id: Uuid) -> Result<Option<CharacterRecord>, RepositoryError>;

    async fn list_characters(&self, story_id: Uuid)
        -> Result<Vec<CharacterRecord>, RepositoryError>;

    async fn insert_setting(&self, setting: &SettingRecord) -> Result<(), RepositoryError>;

    async fn find_setting(&self, id: Uuid) -> Result<Option<SettingRecord>, RepositoryError>;

    async fn list_settings(&self, story_id: Uuid) -> Result<Vec<SettingRecord>, RepositoryError>;
}

// ============================================================================
// Evaluation Reports
// ============================================================================

/// Evaluation Repository Port
///
/// 报告只追加，不更新
#[async_trait]
pub trait EvaluationRepositoryPort: Send + Sync {
    async fn insert(&self, report: &EvaluationReport) -> Result<(), RepositoryError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<EvaluationReport>, RepositoryError>;

    /// 某个产物的全部报告，最新的在前
    async fn list_by_artifact(
        &self,
        artifact_id: Uuid,
    ) -> Result<Vec<EvaluationReport>, RepositoryError>;
}
