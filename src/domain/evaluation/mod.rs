//! Evaluation Context - 评估限界上下文
//!
//! 职责:
//! - 评估模式与指标包含表
//! - 自动指标计算
//! - 启发式评分、加权总分、通过判定与改进建议

mod metrics;
mod model;
mod scoring;

pub use metrics::{compute_metrics, MetricInput};
pub use model::{
    clamp_score, content_hash, ArtifactType, AutomatedMetrics, Category, CategoryNote,
    CategoryScore, CategoryTable, EvaluationMode, EvaluationReport, Judgment, JudgingStatus,
    MetricKind, Recommendation, Scorecard, MAX_SCORE, MIN_SCORE,
};
pub use scoring::{blend, heuristic_score, score_artifact, weighted_overall, ScoringPolicy};
