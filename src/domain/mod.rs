//! Domain Layer - 领域层
//!
//! 包含两个限界上下文:
//! - Story Context: 故事基调、状态、层级与结构
//! - Evaluation Context: 评估模式、指标与评分
//!
//! 以及两个共享的纯文本工具:
//! - text_metrics: 文本指标提取
//! - formatter: 格式规范化与校验

pub mod evaluation;
pub mod formatter;
pub mod story;
pub mod text_metrics;

pub use formatter::{format_text, validate_dialogue_spacing, FormattingReport, ViolationKind};
