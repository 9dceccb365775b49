//! Story Context - Value Objects

use serde::{Deserialize, Serialize};

use super::StoryError;
use crate::domain::text_metrics::CategoricalTag;

/// 故事基调（固定 4 值）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    Hopeful,
    Dark,
    Bittersweet,
    Satirical,
}

impl Tone {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tone::Hopeful => "hopeful",
            Tone::Dark => "dark",
            Tone::Bittersweet => "bittersweet",
            Tone::Satirical => "satirical",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "hopeful" => Some(Tone::Hopeful),
            "dark" => Some(Tone::Dark),
            "bittersweet" => Some(Tone::Bittersweet),
            "satirical" => Some(Tone::Satirical),
            _ => None,
        }
    }
}

/// 故事生命周期状态
///
/// 只能单调前进：writing → complete → published
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoryStatus {
    Writing,
    Complete,
    Published,
}

impl StoryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoryStatus::Writing => "writing",
            StoryStatus::Complete => "complete",
            StoryStatus::Published => "published",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "writing" => Some(StoryStatus::Writing),
            "complete" => Some(StoryStatus::Complete),
            "published" => Some(StoryStatus::Published),
            _ => None,
        }
    }

    /// 校验状态迁移（不允许回退或原地踏步）
    pub fn advance_to(self, next: StoryStatus) -> Result<StoryStatus, StoryError> {
        if next <= self {
            return Err(StoryError::StatusRegression {
                from: self.as_str(),
                to: next.as_str(),
            });
        }
        Ok(next)
    }
}

impl Default for StoryStatus {
    fn default() -> Self {
        StoryStatus::Writing
    }
}

/// 场景循环阶段（固定 5 值）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CyclePhase {
    Setup,
    Confrontation,
    Virtue,
    Consequence,
    Transition,
}

impl CyclePhase {
    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|p| p.as_str() == s)
    }
}

impl CategoricalTag for CyclePhase {
    const ALL: &'static [Self] = &[
        CyclePhase::Setup,
        CyclePhase::Confrontation,
        CyclePhase::Virtue,
        CyclePhase::Consequence,
        CyclePhase::Transition,
    ];

    fn as_str(&self) -> &'static str {
        match self {
            CyclePhase::Setup => "setup",
            CyclePhase::Confrontation => "confrontation",
            CyclePhase::Virtue => "virtue",
            CyclePhase::Consequence => "consequence",
            CyclePhase::Transition => "transition",
        }
    }
}

/// 镜头类型（用于场景节拍的分镜标签）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShotType {
    Establishing,
    Wide,
    Medium,
    CloseUp,
    ExtremeCloseUp,
    OverTheShoulder,
}

impl CategoricalTag for ShotType {
    const ALL: &'static [Self] = &[
        ShotType::Establishing,
        ShotType::Wide,
        ShotType::Medium,
        ShotType::CloseUp,
        ShotType::ExtremeCloseUp,
        ShotType::OverTheShoulder,
    ];

    fn as_str(&self) -> &'static str {
        match self {
            ShotType::Establishing => "establishing",
            ShotType::Wide => "wide",
            ShotType::Medium => "medium",
            ShotType::CloseUp => "close_up",
            ShotType::ExtremeCloseUp => "extreme_close_up",
            ShotType::OverTheShoulder => "over_the_shoulder",
        }
    }
}

/// 生成层级
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationLevel {
    Part,
    Chapter,
    SceneSummary,
    Character,
    Setting,
}

impl GenerationLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationLevel::Part => "part",
            GenerationLevel::Chapter => "chapter",
            GenerationLevel::SceneSummary => "scene_summary",
            GenerationLevel::Character => "character",
            GenerationLevel::Setting => "setting",
        }
    }

    /// 该层级是否必须提供父级 ID
    pub fn requires_parent(&self) -> bool {
        matches!(self, GenerationLevel::SceneSummary)
    }

    /// 该层级是否允许提供父级 ID
    pub fn accepts_parent(&self) -> bool {
        matches!(self, GenerationLevel::Chapter | GenerationLevel::SceneSummary)
    }
}

impl std::fmt::Display for GenerationLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 分部规划（结构描述中的一项）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartPlan {
    pub name: String,
    /// 该分部占全书字数的比例（0.0 - 1.0）
    pub word_share: f64,
}

/// 故事结构描述：分部名称 + 字数分布
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoryStructure {
    pub parts: Vec<PartPlan>,
}

/// 字数比例之和允许的误差
const SHARE_TOLERANCE: f64 = 0.01;

impl StoryStructure {
    pub fn new(parts: Vec<PartPlan>) -> Result<Self, StoryError> {
        let structure = Self { parts };
        structure.validate()?;
        Ok(structure)
    }

    pub fn validate(&self) -> Result<(), StoryError> {
        if self.parts.is_empty() {
            return Ok(());
        }
        if let Some(plan) = self
            .parts
            .iter()
            .find(|p| p.name.trim().is_empty() || !(0.0..=1.0).contains(&p.word_share))
        {
            return Err(StoryError::InvalidStructure(format!(
                "invalid part plan '{}' with share {}",
                plan.name, plan.word_share
            )));
        }
        let total: f64 = self.parts.iter().map(|p| p.word_share).sum();
        if (total - 1.0).abs() > SHARE_TOLERANCE {
            return Err(StoryError::InvalidStructure(format!(
                "part word shares must sum to 1.0, got {:.3}",
                total
            )));
        }
        Ok(())
    }

    /// 指定序号（1 起）分部的计划
    pub fn plan_for(&self, ordinal_index: usize) -> Option<&PartPlan> {
        ordinal_index
            .checked_sub(1)
            .and_then(|i| self.parts.get(i))
    }
}
