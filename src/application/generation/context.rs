//! 生成上下文（上下文组装器的输出）

use serde::Serialize;

use crate::application::ports::{
    ChapterRecord, CharacterRecord, PartRecord, SceneRecord, SettingRecord, StoryRecord,
};
use crate::domain::story::GenerationLevel;

/// 某一层级生成所需的全部上游材料
#[derive(Debug, Clone, Serialize)]
pub struct GenerationContext {
    pub level: GenerationLevel,
    pub story: StoryRecord,
    /// 所属分部（章节层级给定 part 时，或场景所属章节有分部时）
    pub part: Option<PartRecord>,
    /// 所属章节（场景层级）
    pub chapter: Option<ChapterRecord>,
    /// 故事的全部分部（按序）
    pub parts: Vec<PartRecord>,
    /// 同一排序范围内已有的章节（章节层级）
    pub prior_chapters: Vec<ChapterRecord>,
    /// 同一章节内已有的场景（场景层级）
    pub prior_scenes: Vec<SceneRecord>,
    pub characters: Vec<CharacterRecord>,
    pub settings: Vec<SettingRecord>,
}

impl GenerationContext {
    /// 当前排序范围内已有的兄弟数量
    pub fn sibling_count(&self) -> usize {
        match self.level {
            GenerationLevel::Part => self.parts.len(),
            GenerationLevel::Chapter => self.prior_chapters.len(),
            GenerationLevel::SceneSummary => self.prior_scenes.len(),
            GenerationLevel::Character => self.characters.len(),
            GenerationLevel::Setting => self.settings.len(),
        }
    }

    /// 下一个序号 = 已有数量 + 1
    pub fn next_ordinal(&self) -> u32 {
        self.sibling_count() as u32 + 1
    }
}
