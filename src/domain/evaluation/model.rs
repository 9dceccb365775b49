//! Evaluation Context - 模型定义

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::formatter::FormattingReport;
use crate::domain::text_metrics::{
    DialogueCompliance, LengthCompliance, SensoryCoverage, TagHistogram, VoiceDistribution,
};

/// 评分下限
pub const MIN_SCORE: f64 = 1.0;
/// 评分上限
pub const MAX_SCORE: f64 = 5.0;

/// 把任意分数收敛到 [1.0, 5.0]；NaN 视为下限
pub fn clamp_score(score: f64) -> f64 {
    if score.is_nan() {
        return MIN_SCORE;
    }
    score.clamp(MIN_SCORE, MAX_SCORE)
}

/// 评分维度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Plot,
    Character,
    Pacing,
    Prose,
    WorldBuilding,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Plot,
        Category::Character,
        Category::Pacing,
        Category::Prose,
        Category::WorldBuilding,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Plot => "plot",
            Category::Character => "character",
            Category::Pacing => "pacing",
            Category::Prose => "prose",
            Category::WorldBuilding => "world_building",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.as_str() == s)
    }
}

/// 每个维度一个数值（权重、阈值、评审分数共用）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CategoryTable {
    pub plot: f64,
    pub character: f64,
    pub pacing: f64,
    pub prose: f64,
    pub world_building: f64,
}

impl CategoryTable {
    pub fn uniform(value: f64) -> Self {
        Self {
            plot: value,
            character: value,
            pacing: value,
            prose: value,
            world_building: value,
        }
    }

    pub fn get(&self, category: Category) -> f64 {
        match category {
            Category::Plot => self.plot,
            Category::Character => self.character,
            Category::Pacing => self.pacing,
            Category::Prose => self.prose,
            Category::WorldBuilding => self.world_building,
        }
    }

    pub fn values(&self) -> impl Iterator<Item = (Category, f64)> + '_ {
        Category::ALL.iter().map(move |c| (*c, self.get(*c)))
    }
}

/// 被评估的产物类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactType {
    Scene,
    Chapter,
}

impl ArtifactType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactType::Scene => "scene",
            ArtifactType::Chapter => "chapter",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "scene" => Some(ArtifactType::Scene),
            "chapter" => Some(ArtifactType::Chapter),
            _ => None,
        }
    }
}

/// 自动指标种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    Length,
    VoiceDistribution,
    DialogueCompliance,
    SensoryCoverage,
    Formatting,
    TagHistograms,
}

/// 评估模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationMode {
    Quick,
    Standard,
    Deep,
}

impl EvaluationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvaluationMode::Quick => "quick",
            EvaluationMode::Standard => "standard",
            EvaluationMode::Deep => "deep",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "quick" => Some(EvaluationMode::Quick),
            "standard" => Some(EvaluationMode::Standard),
            "deep" => Some(EvaluationMode::Deep),
            _ => None,
        }
    }

    /// 模式包含的指标（显式表）
    pub fn metrics(&self) -> &'static [MetricKind] {
        use MetricKind::*;
        match self {
            EvaluationMode::Quick => &[Length, VoiceDistribution, DialogueCompliance, SensoryCoverage],
            EvaluationMode::Standard => &[
                Length,
                VoiceDistribution,
                DialogueCompliance,
                SensoryCoverage,
                Formatting,
            ],
            EvaluationMode::Deep => &[
                Length,
                VoiceDistribution,
                DialogueCompliance,
                SensoryCoverage,
                Formatting,
                TagHistograms,
            ],
        }
    }

    pub fn includes(&self, kind: MetricKind) -> bool {
        self.metrics().contains(&kind)
    }

    /// 是否调用评审
    pub fn ai_judging(&self) -> bool {
        !matches!(self, EvaluationMode::Quick)
    }

    /// 评审时是否附带完整上游上下文
    pub fn full_context(&self) -> bool {
        matches!(self, EvaluationMode::Deep)
    }
}

impl Default for EvaluationMode {
    fn default() -> Self {
        EvaluationMode::Standard
    }
}

/// 自动指标集合（未包含的指标为 None）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AutomatedMetrics {
    pub length: Option<LengthCompliance>,
    pub voice: Option<VoiceDistribution>,
    pub dialogue: Option<DialogueCompliance>,
    pub sensory: Option<SensoryCoverage>,
    pub formatting: Option<FormattingReport>,
    pub cycle_phases: Option<TagHistogram>,
    pub shot_types: Option<TagHistogram>,
    /// 已填写的结构字段数（场景: goal/obstacle/outcome；章节: 三幕）
    pub structure_fields_present: u8,
}

/// 评审给出的单维度意见
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryNote {
    pub category: Category,
    pub note: String,
}

/// 评审结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Judgment {
    pub scores: CategoryTable,
    pub notes: Vec<CategoryNote>,
}

impl Judgment {
    pub fn note_for(&self, category: Category) -> Option<&str> {
        self.notes
            .iter()
            .find(|n| n.category == category)
            .map(|n| n.note.as_str())
    }
}

/// 评审状态
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JudgingStatus {
    /// 模式不需要评审
    Skipped,
    Completed,
    /// 评审失败，分数仅来自启发式
    Failed { reason: String },
}

impl JudgingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JudgingStatus::Skipped => "skipped",
            JudgingStatus::Completed => "completed",
            JudgingStatus::Failed { .. } => "failed",
        }
    }
}

/// 单维度得分
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryScore {
    pub category: Category,
    /// 最终分数（1.0 - 5.0）
    pub score: f64,
    pub heuristic: f64,
    pub judged: Option<f64>,
}

/// 改进建议
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub category: Category,
    pub score: f64,
    pub threshold: f64,
    pub message: String,
}

/// 评分汇总
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scorecard {
    pub category_scores: Vec<CategoryScore>,
    pub overall_score: f64,
    pub pass_threshold: f64,
    pub passed: bool,
    pub recommendations: Vec<Recommendation>,
}

/// 评估报告（只追加，不修改）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub id: Uuid,
    pub artifact_id: Uuid,
    pub artifact_type: ArtifactType,
    /// 被评估内容的 md5
    pub content_hash: String,
    pub created_at: DateTime<Utc>,
    pub mode: EvaluationMode,
    pub category_scores: Vec<CategoryScore>,
    pub metrics: AutomatedMetrics,
    pub overall_score: f64,
    pub pass_threshold: f64,
    pub passed: bool,
    pub judging: JudgingStatus,
    pub recommendations: Vec<Recommendation>,
}

impl EvaluationReport {
    pub fn new(
        artifact_id: Uuid,
        artifact_type: ArtifactType,
        content: &str,
        mode: EvaluationMode,
        metrics: AutomatedMetrics,
        scorecard: Scorecard,
        judging: JudgingStatus,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            artifact_id,
            artifact_type,
            content_hash: content_hash(content),
            created_at: Utc::now(),
            mode,
            category_scores: scorecard.category_scores,
            metrics,
            overall_score: scorecard.overall_score,
            pass_threshold: scorecard.pass_threshold,
            passed: scorecard.passed,
            judging,
            recommendations: scorecard.recommendations,
        }
    }

    pub fn score_for(&self, category: Category) -> Option<f64> {
        self.category_scores
            .iter()
            .find(|s| s.category == category)
            .map(|s| s.score)
    }
}

/// 内容哈希（md5 十六进制）
pub fn content_hash(content: &str) -> String {
    format!("{:x}", md5::compute(content.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_inclusion_table() {
        assert!(!EvaluationMode::Quick.includes(MetricKind::Formatting));
        assert!(!EvaluationMode::Quick.ai_judging());
        assert!(EvaluationMode::Standard.includes(MetricKind::Formatting));
        assert!(!EvaluationMode::Standard.includes(MetricKind::TagHistograms));
        assert!(EvaluationMode::Standard.ai_judging());
        assert!(EvaluationMode::Deep.includes(MetricKind::TagHistograms));
        assert!(EvaluationMode::Deep.full_context());

        // 每个模式都包含基础指标
        for mode in [EvaluationMode::Quick, EvaluationMode::Standard, EvaluationMode::Deep] {
            assert!(mode.includes(MetricKind::Length));
            assert!(mode.includes(MetricKind::SensoryCoverage));
        }
    }

    #[test]
    fn test_clamp_score() {
        assert_eq!(clamp_score(0.2), 1.0);
        assert_eq!(clamp_score(7.0), 5.0);
        assert_eq!(clamp_score(3.3), 3.3);
        assert_eq!(clamp_score(f64::NAN), 1.0);
    }

    #[test]
    fn test_content_hash_is_stable() {
        assert_eq!(content_hash("abc"), "900150983cd24fb0d6963f7d28e17f72");
        assert_eq!(content_hash("abc"), content_hash("abc"));
    }

    #[test]
    fn test_judging_status_serialization() {
        let json = serde_json::to_value(JudgingStatus::Failed {
            reason: "timeout".into(),
        })
        .unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["reason"], "timeout");
    }
}
