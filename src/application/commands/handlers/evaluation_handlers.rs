//! Evaluation Command Handlers - 评估引擎
//!
//! 自动指标总是按模式计算；评审调用失败不会丢弃报告，
//! 只把评审状态记为 failed，分数退回纯启发式。

use std::sync::Arc;

use uuid::Uuid;

use crate::application::commands::EvaluateArtifact;
use crate::application::error::{ApplicationError, ArtifactScope};
use crate::application::generation::drafts::CriticDraft;
use crate::application::generation::prompts::{render_critic_prompt, render_review_context};
use crate::application::generation::StructuredInvoker;
use crate::application::ports::{
    CastRepositoryPort, ChapterRecord, EvaluationRepositoryPort, StoryRepositoryPort,
};
use crate::domain::evaluation::{
    compute_metrics, score_artifact, ArtifactType, EvaluationReport, JudgingStatus, Judgment,
    MetricInput, ScoringPolicy,
};
use crate::domain::story::{CyclePhase, ShotType};
use crate::domain::text_metrics::WordRange;

/// 被评估产物的解析结果
struct ResolvedArtifact {
    story_id: Uuid,
    artifact_type: ArtifactType,
    content: String,
    target: WordRange,
    /// 深度评估时作为上游上下文的章节
    chapter: Option<ChapterRecord>,
    input_phases: Vec<Option<CyclePhase>>,
    input_shots: Vec<Option<ShotType>>,
    structure_fields_present: u8,
}

/// EvaluateArtifact Handler
pub struct EvaluateArtifactHandler {
    story_repo: Arc<dyn StoryRepositoryPort>,
    cast_repo: Arc<dyn CastRepositoryPort>,
    evaluation_repo: Arc<dyn EvaluationRepositoryPort>,
    invoker: Arc<StructuredInvoker>,
    policy: ScoringPolicy,
}

impl EvaluateArtifactHandler {
    pub fn new(
        story_repo: Arc<dyn StoryRepositoryPort>,
        cast_repo: Arc<dyn CastRepositoryPort>,
        evaluation_repo: Arc<dyn EvaluationRepositoryPort>,
        invoker: Arc<StructuredInvoker>,
        policy: ScoringPolicy,
    ) -> Self {
        Self {
            story_repo,
            cast_repo,
            evaluation_repo,
            invoker,
            policy,
        }
    }

    pub async fn handle(&self, command: EvaluateArtifact) -> Result<EvaluationReport, ApplicationError> {
        let EvaluateArtifact { artifact_id, mode } = command;
        let artifact = self.resolve(artifact_id).await?;

        let metrics = compute_metrics(
            &MetricInput {
                content: &artifact.content,
                target: artifact.target,
                cycle_phases: artifact.input_phases.clone(),
                shot_types: artifact.input_shots.clone(),
                structure_fields_present: artifact.structure_fields_present,
            },
            mode,
        );

        let (judgment, judging) = if mode.ai_judging() {
            match self.judge(artifact_id, &artifact, mode.full_context()).await {
                Ok(judgment) => (Some(judgment), JudgingStatus::Completed),
                Err(e) => {
                    tracing::warn!(
                        artifact_id = %artifact_id,
                        artifact_type = artifact.artifact_type.as_str(),
                        error = %e,
                        "Critic judging failed, falling back to heuristics"
                    );
                    (None, JudgingStatus::Failed { reason: e.to_string() })
                }
            }
        } else {
            (None, JudgingStatus::Skipped)
        };

        let scorecard = score_artifact(
            &metrics,
            judgment.as_ref(),
            artifact.artifact_type,
            &self.policy,
        );
        let report = EvaluationReport::new(
            artifact_id,
            artifact.artifact_type,
            &artifact.content,
            mode,
            metrics,
            scorecard,
            judging,
        );
        self.evaluation_repo.insert(&report).await?;

        tracing::info!(
            report_id = %report.id,
            artifact_id = %artifact_id,
            artifact_type = report.artifact_type.as_str(),
            mode = mode.as_str(),
            overall_score = report.overall_score,
            passed = report.passed,
            judging = report.judging.as_str(),
            "Artifact evaluated"
        );

        Ok(report)
    }

    /// 先按场景、再按章节解析产物
    async fn resolve(&self, artifact_id: Uuid) -> Result<ResolvedArtifact, ApplicationError> {
        let settings = self.invoker.settings();

        if let Some(scene) = self.story_repo.find_scene(artifact_id).await? {
            let chapter = self.story_repo.find_chapter(scene.chapter_id).await?;
            return Ok(ResolvedArtifact {
                story_id: scene.story_id,
                artifact_type: ArtifactType::Scene,
                target: settings.scene_words,
                chapter,
                input_phases: vec![Some(scene.cycle_phase)],
                input_shots: scene.beats.iter().map(|b| b.shot).collect(),
                structure_fields_present: scene.structure_fields_present(),
                content: scene.content,
            });
        }

        if let Some(chapter) = self.story_repo.find_chapter(artifact_id).await? {
            let scenes = self.story_repo.list_scenes(chapter.id).await?;
            return Ok(ResolvedArtifact {
                story_id: chapter.story_id,
                artifact_type: ArtifactType::Chapter,
                target: settings.chapter_words,
                input_phases: scenes.iter().map(|s| Some(s.cycle_phase)).collect(),
                input_shots: scenes
                    .iter()
                    .flat_map(|s| s.beats.iter().map(|b| b.shot))
                    .collect(),
                structure_fields_present: chapter.act.fields_present(),
                content: chapter.content.clone(),
                chapter: Some(chapter),
            });
        }

        Err(ApplicationError::not_found("Artifact", artifact_id))
    }

    async fn judge(
        &self,
        artifact_id: Uuid,
        artifact: &ResolvedArtifact,
        full_context: bool,
    ) -> Result<Judgment, ApplicationError> {
        let scope = ArtifactScope::labeled("critic", artifact.story_id, Some(artifact_id));

        let context = if full_context {
            let story = self
                .story_repo
                .find_story(artifact.story_id)
                .await?
                .ok_or_else(|| ApplicationError::not_found("Story", artifact.story_id))?;
            let characters = self.cast_repo.list_characters(story.id).await?;
            let settings = self.cast_repo.list_settings(story.id).await?;
            Some(render_review_context(
                &story,
                artifact.chapter.as_ref(),
                &characters,
                &settings,
            ))
        } else {
            None
        };

        let prompt = render_critic_prompt(
            artifact.artifact_type.as_str(),
            &artifact.content,
            context.as_deref(),
        );
        let invocation = self.invoker.invoke_critic::<CriticDraft>(scope, prompt).await?;
        Ok(invocation.draft.into_judgment())
    }
}
