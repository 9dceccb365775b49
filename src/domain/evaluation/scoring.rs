//! Evaluation Context - 评分
//!
//! 启发式分数来自自动指标，评审分数来自评审调用，
//! 二者按 judged_weight 混合后再按产物类型的权重表求加权平均。

use serde::{Deserialize, Serialize};

use super::model::{
    clamp_score, ArtifactType, AutomatedMetrics, Category, CategoryScore, CategoryTable,
    Judgment, Recommendation, Scorecard,
};

/// 指标缺失时的中性分
const NEUTRAL_SCORE: f64 = 3.0;

/// 段落平均字数的合理区间
const PARAGRAPH_WORDS_MIN: f64 = 20.0;
const PARAGRAPH_WORDS_MAX: f64 = 120.0;

/// 对白占比的合理区间（百分比）
const DIALOGUE_PCT_MIN: f64 = 15.0;
const DIALOGUE_PCT_MAX: f64 = 60.0;

/// 评分策略（由配置构造）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringPolicy {
    pub scene_weights: CategoryTable,
    pub chapter_weights: CategoryTable,
    /// 各维度的建议阈值
    pub thresholds: CategoryTable,
    pub pass_threshold: f64,
    /// 评审分数在混合中的比重（0.0 - 1.0）
    pub judged_weight: f64,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            scene_weights: CategoryTable {
                plot: 0.2,
                character: 0.25,
                pacing: 0.2,
                prose: 0.25,
                world_building: 0.1,
            },
            chapter_weights: CategoryTable {
                plot: 0.3,
                character: 0.2,
                pacing: 0.2,
                prose: 0.15,
                world_building: 0.15,
            },
            thresholds: CategoryTable::uniform(3.0),
            pass_threshold: 3.0,
            judged_weight: 0.7,
        }
    }
}

impl ScoringPolicy {
    pub fn weights_for(&self, artifact_type: ArtifactType) -> &CategoryTable {
        match artifact_type {
            ArtifactType::Scene => &self.scene_weights,
            ArtifactType::Chapter => &self.chapter_weights,
        }
    }
}

// ============================================================================
// Heuristics
// ============================================================================

fn pacing_heuristic(metrics: &AutomatedMetrics) -> f64 {
    let Some(length) = metrics.length.as_ref() else {
        return NEUTRAL_SCORE;
    };
    let words = length.word_count as f64;
    let min = length.target.min as f64;
    let max = length.target.max as f64;

    let mut score = if length.within_target {
        4.0
    } else if words < min {
        1.0 + 3.0 * words / min.max(1.0)
    } else {
        (4.0 - 3.0 * (words - max) / max.max(1.0)).max(1.0)
    };

    if length.paragraph_count > 0 {
        let avg = length.avg_words_per_paragraph;
        if (PARAGRAPH_WORDS_MIN..=PARAGRAPH_WORDS_MAX).contains(&avg) {
            score += 0.5;
        } else {
            score -= 0.5;
        }
    }
    clamp_score(score)
}

fn character_heuristic(metrics: &AutomatedMetrics) -> f64 {
    let Some(voice) = metrics.voice.as_ref() else {
        return NEUTRAL_SCORE;
    };
    let mut score = if voice.dialogue_pct == 0.0 {
        2.0
    } else if (DIALOGUE_PCT_MIN..=DIALOGUE_PCT_MAX).contains(&voice.dialogue_pct) {
        4.0
    } else {
        3.0
    };
    if voice.monologue_pct > 0.0 {
        score += 0.5;
    }
    clamp_score(score)
}

fn prose_heuristic(metrics: &AutomatedMetrics) -> f64 {
    if metrics.dialogue.is_none() && metrics.formatting.is_none() {
        return NEUTRAL_SCORE;
    }
    let mut score = NEUTRAL_SCORE;
    if let Some(dialogue) = metrics.dialogue.as_ref() {
        score += (dialogue.ratio - 0.5) * 2.0;
    }
    if let Some(formatting) = metrics.formatting.as_ref() {
        let n = formatting.violations.len();
        if n == 0 {
            score += 1.0;
        } else {
            score -= (0.25 * n as f64).min(1.0);
        }
    }
    clamp_score(score)
}

fn world_building_heuristic(metrics: &AutomatedMetrics) -> f64 {
    match metrics.sensory.as_ref() {
        Some(sensory) => clamp_score(1.0 + 0.8 * sensory.senses_covered as f64),
        None => NEUTRAL_SCORE,
    }
}

fn plot_heuristic(metrics: &AutomatedMetrics) -> f64 {
    let mut score = 2.0 + 0.5 * metrics.structure_fields_present.min(3) as f64;
    if metrics
        .dialogue
        .as_ref()
        .map(|d| d.units >= 3)
        .unwrap_or(false)
    {
        score += 0.5;
    }
    clamp_score(score)
}

/// 单维度启发式分数（始终位于 [1.0, 5.0]）
pub fn heuristic_score(category: Category, metrics: &AutomatedMetrics) -> f64 {
    match category {
        Category::Plot => plot_heuristic(metrics),
        Category::Character => character_heuristic(metrics),
        Category::Pacing => pacing_heuristic(metrics),
        Category::Prose => prose_heuristic(metrics),
        Category::WorldBuilding => world_building_heuristic(metrics),
    }
}

/// 混合评审分与启发式分
pub fn blend(heuristic: f64, judged: Option<f64>, judged_weight: f64) -> f64 {
    match judged {
        Some(judged) => {
            let w = judged_weight.clamp(0.0, 1.0);
            clamp_score(w * clamp_score(judged) + (1.0 - w) * heuristic)
        }
        None => clamp_score(heuristic),
    }
}

/// 加权平均（权重和为 0 时取中性分）
pub fn weighted_overall(scores: &[CategoryScore], weights: &CategoryTable) -> f64 {
    let (sum, total_weight) = scores.iter().fold((0.0, 0.0), |(sum, tw), s| {
        let w = weights.get(s.category).max(0.0);
        (sum + s.score * w, tw + w)
    });
    if total_weight <= 0.0 {
        return NEUTRAL_SCORE;
    }
    clamp_score(sum / total_weight)
}

fn recommendation_message(category: Category) -> &'static str {
    match category {
        Category::Plot => "Clarify the goal, obstacle and outcome so the scene turns on a decision.",
        Category::Character => "Give characters more distinct dialogue and interior reaction.",
        Category::Pacing => "Bring the length into the target range and vary paragraph length.",
        Category::Prose => "Shorten long dialogue lines and fix dialogue spacing.",
        Category::WorldBuilding => "Ground the setting with more sensory detail.",
    }
}

/// 计算完整评分
pub fn score_artifact(
    metrics: &AutomatedMetrics,
    judgment: Option<&Judgment>,
    artifact_type: ArtifactType,
    policy: &ScoringPolicy,
) -> Scorecard {
    let category_scores: Vec<CategoryScore> = Category::ALL
        .iter()
        .map(|category| {
            let heuristic = heuristic_score(*category, metrics);
            let judged = judgment.map(|j| clamp_score(j.scores.get(*category)));
            CategoryScore {
                category: *category,
                score: blend(heuristic, judged, policy.judged_weight),
                heuristic,
                judged,
            }
        })
        .collect();

    let overall_score = weighted_overall(&category_scores, policy.weights_for(artifact_type));

    let recommendations = category_scores
        .iter()
        .filter(|s| s.score < policy.thresholds.get(s.category))
        .map(|s| {
            let base = recommendation_message(s.category);
            let message = match judgment.and_then(|j| j.note_for(s.category)) {
                Some(note) if !note.trim().is_empty() => format!("{} {}", base, note.trim()),
                _ => base.to_string(),
            };
            Recommendation {
                category: s.category,
                score: s.score,
                threshold: policy.thresholds.get(s.category),
                message,
            }
        })
        .collect();

    Scorecard {
        passed: overall_score >= policy.pass_threshold,
        overall_score,
        pass_threshold: policy.pass_threshold,
        category_scores,
        recommendations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::evaluation::metrics::{compute_metrics, MetricInput};
    use crate::domain::evaluation::model::{CategoryNote, EvaluationMode};
    use crate::domain::text_metrics::WordRange;
    use proptest::prelude::*;

    fn metrics_for(text: &str, mode: EvaluationMode) -> AutomatedMetrics {
        compute_metrics(
            &MetricInput {
                content: text,
                target: WordRange::new(10, 40),
                cycle_phases: vec![],
                shot_types: vec![],
                structure_fields_present: 3,
            },
            mode,
        )
    }

    #[test]
    fn test_missing_metrics_are_neutral() {
        let metrics = AutomatedMetrics::default();
        assert_eq!(heuristic_score(Category::Pacing, &metrics), NEUTRAL_SCORE);
        assert_eq!(heuristic_score(Category::Character, &metrics), NEUTRAL_SCORE);
        assert_eq!(heuristic_score(Category::Prose, &metrics), NEUTRAL_SCORE);
        assert_eq!(heuristic_score(Category::WorldBuilding, &metrics), NEUTRAL_SCORE);
        assert_eq!(heuristic_score(Category::Plot, &metrics), 2.0);
    }

    #[test]
    fn test_blend_weights_judged_score() {
        assert!((blend(2.0, Some(5.0), 0.7) - 4.1).abs() < 1e-9);
        assert_eq!(blend(2.0, None, 0.7), 2.0);
        assert_eq!(blend(2.0, Some(9.0), 1.0), 5.0);
    }

    #[test]
    fn test_weighted_overall_and_pass() {
        let metrics = metrics_for("She saw the light glow.", EvaluationMode::Quick);
        let judgment = Judgment {
            scores: CategoryTable::uniform(4.0),
            notes: vec![],
        };
        let card = score_artifact(&metrics, Some(&judgment), ArtifactType::Scene, &ScoringPolicy::default());
        assert_eq!(card.category_scores.len(), 5);
        assert!(card.overall_score >= 1.0 && card.overall_score <= 5.0);
        assert_eq!(card.passed, card.overall_score >= card.pass_threshold);
    }

    #[test]
    fn test_recommendations_below_category_threshold() {
        let metrics = AutomatedMetrics::default();
        let judgment = Judgment {
            scores: CategoryTable {
                plot: 5.0,
                character: 5.0,
                pacing: 5.0,
                prose: 5.0,
                world_building: 1.0,
            },
            notes: vec![CategoryNote {
                category: Category::WorldBuilding,
                note: "The harbor never smells of anything.".into(),
            }],
        };
        let card = score_artifact(&metrics, Some(&judgment), ArtifactType::Chapter, &ScoringPolicy::default());

        // 总分通过，但 world_building 仍然给出建议
        assert!(card.passed);
        assert_eq!(card.recommendations.len(), 1);
        let rec = &card.recommendations[0];
        assert_eq!(rec.category, Category::WorldBuilding);
        assert!(rec.message.contains("harbor"));
    }

    #[test]
    fn test_zero_weights_fall_back_to_neutral() {
        let mut policy = ScoringPolicy::default();
        policy.scene_weights = CategoryTable::uniform(0.0);
        let card = score_artifact(&AutomatedMetrics::default(), None, ArtifactType::Scene, &policy);
        assert_eq!(card.overall_score, NEUTRAL_SCORE);
    }

    #[test]
    fn test_pacing_penalizes_short_text() {
        let short = metrics_for("Too short.", EvaluationMode::Quick);
        let long_enough = metrics_for(
            "The lantern swung in the wind while the ferry crept toward the dark pier and nobody on deck said a word.",
            EvaluationMode::Quick,
        );
        assert!(heuristic_score(Category::Pacing, &short) < heuristic_score(Category::Pacing, &long_enough));
    }

    proptest! {
        #[test]
        fn prop_scores_are_bounded(
            text in "[a-zA-Z \"\n.,!?*_]{0,300}",
            judged in proptest::option::of(-10.0f64..20.0),
            judged_weight in 0.0f64..=1.0,
        ) {
            let metrics = metrics_for(&text, EvaluationMode::Deep);
            let judgment = judged.map(|v| Judgment { scores: CategoryTable::uniform(v), notes: vec![] });
            let policy = ScoringPolicy { judged_weight, ..ScoringPolicy::default() };
            for artifact_type in [ArtifactType::Scene, ArtifactType::Chapter] {
                let card = score_artifact(&metrics, judgment.as_ref(), artifact_type, &policy);
                prop_assert!(card.overall_score >= 1.0 && card.overall_score <= 5.0);
                prop_assert_eq!(card.passed, card.overall_score >= card.pass_threshold);
                for s in &card.category_scores {
                    prop_assert!(s.score >= 1.0 && s.score <= 5.0);
                    prop_assert!(s.heuristic >= 1.0 && s.heuristic <= 5.0);
                }
            }
        }
    }
}
