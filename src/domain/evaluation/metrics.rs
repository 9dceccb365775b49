//! Evaluation Context - 自动指标计算

use super::model::{AutomatedMetrics, EvaluationMode, MetricKind};
use crate::domain::formatter::validate_dialogue_spacing;
use crate::domain::story::{CyclePhase, ShotType};
use crate::domain::text_metrics::{
    dialogue_compliance, length_compliance, sensory_coverage, tag_histogram, voice_distribution,
    WordRange, MAX_DIALOGUE_CHARS,
};

/// 指标计算输入
#[derive(Debug, Clone)]
pub struct MetricInput<'a> {
    pub content: &'a str,
    pub target: WordRange,
    /// 有序子单元的循环阶段（章节为各场景，场景为自身）
    pub cycle_phases: Vec<Option<CyclePhase>>,
    /// 有序节拍的镜头类型
    pub shot_types: Vec<Option<ShotType>>,
    pub structure_fields_present: u8,
}

/// 按模式的包含表计算自动指标
///
/// 纯函数，相同输入得到逐位相同的结果
pub fn compute_metrics(input: &MetricInput<'_>, mode: EvaluationMode) -> AutomatedMetrics {
    let mut metrics = AutomatedMetrics {
        structure_fields_present: input.structure_fields_present.min(3),
        ..AutomatedMetrics::default()
    };

    for kind in mode.metrics() {
        match kind {
            MetricKind::Length => {
                metrics.length = Some(length_compliance(input.content, input.target));
            }
            MetricKind::VoiceDistribution => {
                metrics.voice = Some(voice_distribution(input.content));
            }
            MetricKind::DialogueCompliance => {
                metrics.dialogue = Some(dialogue_compliance(input.content, MAX_DIALOGUE_CHARS));
            }
            MetricKind::SensoryCoverage => {
                metrics.sensory = Some(sensory_coverage(input.content));
            }
            MetricKind::Formatting => {
                metrics.formatting = Some(validate_dialogue_spacing(input.content));
            }
            MetricKind::TagHistograms => {
                metrics.cycle_phases = Some(tag_histogram(input.cycle_phases.iter().copied()));
                metrics.shot_types = Some(tag_histogram(input.shot_types.iter().copied()));
            }
        }
    }

    metrics
}
