//! Generation Command Handlers - 生成编排器
//!
//! GenerateNext 的一次调用：
//! 1. 获取 (故事, 排序范围, 层级) 串行锁
//! 2. 组装上下文，缺失即失败
//! 3. 序号 = 已有兄弟数 + 1（唯一来源）
//! 4. 带超时/取消地调用生成能力，严格校验输出
//! 5. 规范化自由文本
//! 6. 持久化；唯一约束冲突时重新计算序号重试一次
//! 7. 更新故事时间戳，后台失效缓存

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::application::commands::{GenerateNext, GenerateOptions, GenerateStory};
use crate::application::error::{ApplicationError, ArtifactScope};
use crate::application::generation::drafts::{
    CharacterDraft, ChapterDraft, PartDraft, SceneSummaryDraft, SchemaError, SettingDraft,
    StoryDraft,
};
use crate::application::generation::prompts::{render_generation_prompt, render_story_prompt};
use crate::application::generation::{
    spawn_invalidation, GenerationContext, InvalidationPolicy, InvocationOverrides, ScopeKey,
    ScopeLocks, StructuredInvoker,
};
use crate::application::ports::{
    ActStructure, BeatRecord, CacheInvalidatorPort, CastRepositoryPort, ChapterRecord,
    CharacterRecord, InvalidationKey, PartRecord, RepositoryError, SceneRecord, SettingRecord,
    StoryRecord, StoryRepositoryPort,
};
use crate::application::queries::handlers::AssembleContextHandler;
use crate::application::queries::AssembleContext;
use crate::domain::story::{GenerationLevel, StoryStatus};

impl From<GenerateOptions> for InvocationOverrides {
    fn from(options: GenerateOptions) -> Self {
        Self {
            timeout: options.timeout,
            max_tokens: options.max_tokens,
            temperature: options.temperature,
        }
    }
}

// ============================================================================
// Generated Artifact
// ============================================================================

/// 一次生成产出的产物
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "level", content = "artifact", rename_all = "snake_case")]
pub enum GeneratedArtifact {
    Part(PartRecord),
    Chapter(ChapterRecord),
    SceneSummary(SceneRecord),
    Character(CharacterRecord),
    Setting(SettingRecord),
}

impl GeneratedArtifact {
    pub fn id(&self) -> Uuid {
        match self {
            GeneratedArtifact::Part(p) => p.id,
            GeneratedArtifact::Chapter(c) => c.id,
            GeneratedArtifact::SceneSummary(s) => s.id,
            GeneratedArtifact::Character(c) => c.id,
            GeneratedArtifact::Setting(s) => s.id,
        }
    }

    pub fn ordinal_index(&self) -> u32 {
        match self {
            GeneratedArtifact::Part(p) => p.ordinal_index,
            GeneratedArtifact::Chapter(c) => c.ordinal_index,
            GeneratedArtifact::SceneSummary(s) => s.ordinal_index,
            GeneratedArtifact::Character(c) => c.ordinal_index,
            GeneratedArtifact::Setting(s) => s.ordinal_index,
        }
    }

    fn set_ordinal_index(&mut self, ordinal: u32) {
        match self {
            GeneratedArtifact::Part(p) => p.ordinal_index = ordinal,
            GeneratedArtifact::Chapter(c) => c.ordinal_index = ordinal,
            GeneratedArtifact::SceneSummary(s) => s.ordinal_index = ordinal,
            GeneratedArtifact::Character(c) => c.ordinal_index = ordinal,
            GeneratedArtifact::Setting(s) => s.ordinal_index = ordinal,
        }
    }
}

/// GenerateNext 响应
#[derive(Debug, Clone, Serialize)]
pub struct GenerateNextResponse {
    pub artifact: GeneratedArtifact,
    pub ordinal_index: u32,
    /// 创建后的兄弟数量
    pub sibling_count: usize,
    pub elapsed_ms: u64,
    pub model: String,
    pub tokens_used: u32,
}

// ============================================================================
// Scene cast resolution
// ============================================================================

/// 把场景草稿中的角色/地点名称解析为 ID（不区分大小写）
fn resolve_scene_cast(
    draft: &SceneSummaryDraft,
    ctx: &GenerationContext,
) -> Result<(Vec<Uuid>, Option<Uuid>), SchemaError> {
    let mut character_ids = Vec::new();
    for name in draft.characters.iter().map(|n| n.trim()).filter(|n| !n.is_empty()) {
        let character = ctx
            .characters
            .iter()
            .find(|c| c.name.trim().eq_ignore_ascii_case(name))
            .ok_or_else(|| SchemaError::InvalidValue {
                field: "characters",
                message: format!("unknown character '{}'", name),
            })?;
        if !character_ids.contains(&character.id) {
            character_ids.push(character.id);
        }
    }

    let setting_id = match draft.setting.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        None => None,
        Some(name) => Some(
            ctx.settings
                .iter()
                .find(|s| s.name.trim().eq_ignore_ascii_case(name))
                .map(|s| s.id)
                .ok_or_else(|| SchemaError::InvalidValue {
                    field: "setting",
                    message: format!("unknown setting '{}'", name),
                })?,
        ),
    };

    Ok((character_ids, setting_id))
}

// ============================================================================
// GenerateNext
// ============================================================================

/// GenerateNext Handler - 生成编排器
pub struct GenerateNextHandler {
    assembler: Arc<AssembleContextHandler>,
    story_repo: Arc<dyn StoryRepositoryPort>,
    cast_repo: Arc<dyn CastRepositoryPort>,
    invoker: Arc<StructuredInvoker>,
    invalidator: Arc<dyn CacheInvalidatorPort>,
    locks: Arc<ScopeLocks>,
    invalidation: InvalidationPolicy,
}

impl GenerateNextHandler {
    pub fn new(
        assembler: Arc<AssembleContextHandler>,
        story_repo: Arc<dyn StoryRepositoryPort>,
        cast_repo: Arc<dyn CastRepositoryPort>,
        invoker: Arc<StructuredInvoker>,
        invalidator: Arc<dyn CacheInvalidatorPort>,
        locks: Arc<ScopeLocks>,
        invalidation: InvalidationPolicy,
    ) -> Self {
        Self {
            assembler,
            story_repo,
            cast_repo,
            invoker,
            invalidator,
            locks,
            invalidation,
        }
    }

    pub async fn handle(&self, command: GenerateNext) -> Result<GenerateNextResponse, ApplicationError> {
        let started = Instant::now();
        let GenerateNext {
            story_id,
            level,
            parent_id,
            options,
            cancel,
        } = command;
        let scope = ArtifactScope::new(level, story_id, parent_id);
        let scope_id = parent_id.unwrap_or(story_id);

        let _guard = self
            .locks
            .acquire(ScopeKey {
                story_id,
                scope_id,
                level,
            })
            .await;

        let ctx = self
            .assembler
            .handle(AssembleContext {
                story_id,
                level,
                parent_id,
            })
            .await?;
        let ordinal = ctx.next_ordinal();

        tracing::info!(
            artifact_level = level.as_str(),
            story_id = %story_id,
            parent_id = ?parent_id,
            ordinal_index = ordinal,
            "Generating artifact"
        );

        let prompt = render_generation_prompt(&ctx, ordinal);
        let overrides = InvocationOverrides::from(options);
        let cancel = cancel.as_ref();
        let now = Utc::now();

        let (mut artifact, model, tokens_used) = match level {
            GenerationLevel::Part => {
                let inv = self.invoker.invoke::<PartDraft>(scope, prompt, overrides, cancel).await?;
                let d = inv.draft;
                let record = PartRecord {
                    id: Uuid::new_v4(),
                    story_id,
                    ordinal_index: ordinal,
                    title: d.title.trim().to_string(),
                    goal: d.goal,
                    conflict: d.conflict,
                    outcome: d.outcome,
                    summary: d.summary,
                    created_at: now,
                };
                (GeneratedArtifact::Part(record), inv.model, inv.tokens_used)
            }
            GenerationLevel::Chapter => {
                let inv = self
                    .invoker
                    .invoke::<ChapterDraft>(scope, prompt, overrides, cancel)
                    .await?;
                let d = inv.draft;
                let record = ChapterRecord {
                    id: Uuid::new_v4(),
                    story_id,
                    part_id: parent_id,
                    ordinal_index: ordinal,
                    title: d.title.trim().to_string(),
                    summary: d.summary,
                    pov_character: d.pov_character.trim().to_string(),
                    act: ActStructure {
                        setup: d.act.setup,
                        confrontation: d.act.confrontation,
                        resolution: d.act.resolution,
                    },
                    content: String::new(),
                    word_count: 0,
                    published_at: None,
                    created_at: now,
                    updated_at: now,
                };
                (GeneratedArtifact::Chapter(record), inv.model, inv.tokens_used)
            }
            GenerationLevel::SceneSummary => {
                let inv = self
                    .invoker
                    .invoke::<SceneSummaryDraft>(scope, prompt, overrides, cancel)
                    .await?;
                let d = inv.draft;
                let (character_ids, setting_id) = resolve_scene_cast(&d, &ctx)
                    .map_err(|e| ApplicationError::schema(scope, e.to_string()))?;
                let cycle_phase = d
                    .cycle_phase()
                    .ok_or_else(|| ApplicationError::schema(scope, "invalid cycle phase"))?;
                let beats = d
                    .beats
                    .iter()
                    .map(|b| {
                        Ok(BeatRecord {
                            description: b.description.clone(),
                            shot: b.shot_type()?,
                        })
                    })
                    .collect::<Result<Vec<_>, SchemaError>>()
                    .map_err(|e| ApplicationError::schema(scope, e.to_string()))?;
                let record = SceneRecord {
                    id: Uuid::new_v4(),
                    story_id,
                    chapter_id: scope_id,
                    ordinal_index: ordinal,
                    title: d.title.trim().to_string(),
                    summary: d.summary,
                    cycle_phase,
                    time: d.time,
                    place: d.place,
                    pov: d.pov.trim().to_string(),
                    setting_id,
                    character_ids,
                    goal: d.goal,
                    obstacle: d.obstacle,
                    outcome: d.outcome,
                    beats,
                    content: String::new(),
                    word_count: 0,
                    created_at: now,
                    updated_at: now,
                };
                (GeneratedArtifact::SceneSummary(record), inv.model, inv.tokens_used)
            }
            GenerationLevel::Character => {
                let inv = self
                    .invoker
                    .invoke::<CharacterDraft>(scope, prompt, overrides, cancel)
                    .await?;
                let d = inv.draft;
                let record = CharacterRecord {
                    id: Uuid::new_v4(),
                    story_id,
                    ordinal_index: ordinal,
                    name: d.name.trim().to_string(),
                    role: d.role.trim().to_string(),
                    summary: d.summary,
                    physical: d.physical,
                    voice: d.voice,
                    created_at: now,
                };
                (GeneratedArtifact::Character(record), inv.model, inv.tokens_used)
            }
            GenerationLevel::Setting => {
                let inv = self
                    .invoker
                    .invoke::<SettingDraft>(scope, prompt, overrides, cancel)
                    .await?;
                let d = inv.draft;
                let record = SettingRecord {
                    id: Uuid::new_v4(),
                    story_id,
                    ordinal_index: ordinal,
                    name: d.name.trim().to_string(),
                    description: d.description,
                    sensory: d.sensory,
                    created_at: now,
                };
                (GeneratedArtifact::Setting(record), inv.model, inv.tokens_used)
            }
        };

        self.persist_with_retry(scope, scope_id, &mut artifact).await?;

        if let Err(e) = self.story_repo.touch_story(story_id).await {
            tracing::warn!(story_id = %story_id, error = %e, "Failed to touch story");
        }
        spawn_invalidation(
            self.invalidator.clone(),
            vec![
                InvalidationKey::story(story_id),
                InvalidationKey::artifact(artifact.id()),
            ],
            self.invalidation,
        );

        let sibling_count = self
            .count_siblings(level, story_id, scope_id)
            .await
            .map_err(|e| ApplicationError::persistence(scope, e))?;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        tracing::info!(
            artifact_level = level.as_str(),
            story_id = %story_id,
            artifact_id = %artifact.id(),
            ordinal_index = artifact.ordinal_index(),
            elapsed_ms = elapsed_ms,
            model = %model,
            tokens_used = tokens_used,
            "Artifact generated"
        );

        Ok(GenerateNextResponse {
            ordinal_index: artifact.ordinal_index(),
            artifact,
            sibling_count,
            elapsed_ms,
            model,
            tokens_used,
        })
    }

    /// 持久化；序号冲突时重新计算并重试一次
    async fn persist_with_retry(
        &self,
        scope: ArtifactScope,
        scope_id: Uuid,
        artifact: &mut GeneratedArtifact,
    ) -> Result<(), ApplicationError> {
        match self.insert(artifact).await {
            Ok(()) => return Ok(()),
            Err(RepositoryError::OrdinalConflict(detail)) => {
                tracing::warn!(
                    artifact_level = scope.level,
                    story_id = %scope.story_id,
                    ordinal_index = artifact.ordinal_index(),
                    detail = %detail,
                    "Ordinal conflict, recomputing index"
                );
            }
            Err(e) => return Err(ApplicationError::persistence(scope, e)),
        }

        let level = level_of(artifact);
        let ordinal = self
            .count_siblings(level, scope.story_id, scope_id)
            .await
            .map_err(|e| ApplicationError::persistence(scope, e))? as u32
            + 1;
        artifact.set_ordinal_index(ordinal);

        match self.insert(artifact).await {
            Ok(()) => Ok(()),
            Err(RepositoryError::OrdinalConflict(_)) => Err(ApplicationError::OrdinalConflict {
                scope,
                ordinal_index: ordinal,
            }),
            Err(e) => Err(ApplicationError::persistence(scope, e)),
        }
    }

    async fn insert(&self, artifact: &GeneratedArtifact) -> Result<(), RepositoryError> {
        match artifact {
            GeneratedArtifact::Part(p) => self.story_repo.insert_part(p).await,
            GeneratedArtifact::Chapter(c) => self.story_repo.insert_chapter(c).await,
            GeneratedArtifact::SceneSummary(s) => self.story_repo.insert_scene(s).await,
            GeneratedArtifact::Character(c) => self.cast_repo.insert_character(c).await,
            GeneratedArtifact::Setting(s) => self.cast_repo.insert_setting(s).await,
        }
    }

    async fn count_siblings(
        &self,
        level: GenerationLevel,
        story_id: Uuid,
        scope_id: Uuid,
    ) -> Result<usize, RepositoryError> {
        Ok(match level {
            GenerationLevel::Part => self.story_repo.list_parts(story_id).await?.len(),
            GenerationLevel::Chapter => self.story_repo.list_chapters_in_scope(scope_id).await?.len(),
            GenerationLevel::SceneSummary => self.story_repo.list_scenes(scope_id).await?.len(),
            GenerationLevel::Character => self.cast_repo.list_characters(story_id).await?.len(),
            GenerationLevel::Setting => self.cast_repo.list_settings(story_id).await?.len(),
        })
    }
}

fn level_of(artifact: &GeneratedArtifact) -> GenerationLevel {
    match artifact {
        GeneratedArtifact::Part(_) => GenerationLevel::Part,
        GeneratedArtifact::Chapter(_) => GenerationLevel::Chapter,
        GeneratedArtifact::SceneSummary(_) => GenerationLevel::SceneSummary,
        GeneratedArtifact::Character(_) => GenerationLevel::Character,
        GeneratedArtifact::Setting(_) => GenerationLevel::Setting,
    }
}

// ============================================================================
// GenerateStory
// ============================================================================

/// GenerateStory Handler - 创建故事根节点
pub struct GenerateStoryHandler {
    story_repo: Arc<dyn StoryRepositoryPort>,
    invoker: Arc<StructuredInvoker>,
}

impl GenerateStoryHandler {
    pub fn new(story_repo: Arc<dyn StoryRepositoryPort>, invoker: Arc<StructuredInvoker>) -> Self {
        Self {
            story_repo,
            invoker,
        }
    }

    pub async fn handle(&self, command: GenerateStory) -> Result<StoryRecord, ApplicationError> {
        if command.prompt.trim().is_empty() {
            return Err(ApplicationError::validation("prompt must not be empty"));
        }
        if command.part_count == 0 {
            return Err(ApplicationError::validation("part_count must be at least 1"));
        }

        let story_id = Uuid::new_v4();
        let scope = ArtifactScope::labeled("story", story_id, None);
        let prompt = render_story_prompt(&command.prompt, command.tone, command.part_count);

        let inv = self
            .invoker
            .invoke::<StoryDraft>(
                scope,
                prompt,
                InvocationOverrides::default(),
                command.cancel.as_ref(),
            )
            .await?;
        let draft = inv.draft;

        let tone = match command.tone.or_else(|| draft.tone()) {
            Some(tone) => tone,
            None => return Err(ApplicationError::schema(scope, "missing tone")),
        };
        let structure = draft.structure();
        structure.validate()?;

        let now = Utc::now();
        let story = StoryRecord {
            id: story_id,
            title: draft.title.trim().to_string(),
            premise: draft.premise,
            genre: draft.genre.trim().to_string(),
            tone,
            status: StoryStatus::Writing,
            structure,
            created_at: now,
            updated_at: now,
        };
        self.story_repo
            .insert_story(&story)
            .await
            .map_err(|e| ApplicationError::persistence(scope, e))?;

        tracing::info!(
            story_id = %story.id,
            title = %story.title,
            tone = story.tone.as_str(),
            parts = story.structure.parts.len(),
            model = %inv.model,
            "Story created"
        );

        Ok(story)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::testing::TestEnv;
    use crate::domain::story::Tone;
    use serde_json::json;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    fn next(env: &TestEnv, level: GenerationLevel, parent_id: Option<Uuid>) -> GenerateNext {
        GenerateNext {
            story_id: env.story_id,
            level,
            parent_id,
            options: GenerateOptions::default(),
            cancel: None,
        }
    }

    #[tokio::test]
    async fn test_three_sequential_chapters() {
        let env = TestEnv::new().await;

        for expected in 1..=3u32 {
            let resp = env
                .generate_next
                .handle(next(&env, GenerationLevel::Chapter, None))
                .await
                .unwrap();
            assert_eq!(resp.ordinal_index, expected);
            assert_eq!(resp.sibling_count, expected as usize);
        }

        let chapters = env.story_repo.list_chapters(env.story_id).await.unwrap();
        let ordinals: Vec<u32> = chapters.iter().map(|c| c.ordinal_index).collect();
        assert_eq!(ordinals, vec![1, 2, 3]);

        // 第三章的提示词包含前两章
        let prompts = env.generator.prompts_for("chapter");
        assert_eq!(prompts.len(), 3);
        assert!(prompts[2].contains(&chapters[0].title));
        assert!(prompts[2].contains(&chapters[1].title));
        assert!(prompts[1].contains(&chapters[0].title));
    }

    #[tokio::test]
    async fn test_concurrent_chapters_get_distinct_indices() {
        let env = TestEnv::new().await;
        env.generator.set_delay(Duration::from_millis(20));

        let (a, b) = tokio::join!(
            env.generate_next.handle(next(&env, GenerationLevel::Chapter, None)),
            env.generate_next.handle(next(&env, GenerationLevel::Chapter, None)),
        );
        let mut indices = vec![a.unwrap().ordinal_index, b.unwrap().ordinal_index];
        indices.sort_unstable();
        assert_eq!(indices, vec![1, 2]);

        // 第二个调用看得到第一章
        let chapters = env.story_repo.list_chapters(env.story_id).await.unwrap();
        let prompts = env.generator.prompts_for("chapter");
        assert!(prompts[1].contains(&chapters[0].title));
    }

    #[tokio::test]
    async fn test_model_supplied_index_is_ignored() {
        let env = TestEnv::new().await;
        env.generator.respond_with("part", |_| {
            json!({
                "ordinal_index": 9,
                "title": "The Long Night", "goal": "g", "conflict": "c",
                "outcome": "o", "summary": "s"
            })
        });
        let resp = env
            .generate_next
            .handle(next(&env, GenerationLevel::Part, None))
            .await
            .unwrap();
        assert_eq!(resp.ordinal_index, 1);
    }

    #[tokio::test]
    async fn test_scene_summary_requires_cast() {
        let env = TestEnv::new().await;
        let chapter = env.seed_chapter(None, 1).await;
        let err = env
            .generate_next
            .handle(next(&env, GenerationLevel::SceneSummary, Some(chapter.id)))
            .await
            .unwrap_err();
        assert!(matches!(err, ApplicationError::ContextIncomplete { .. }));
        assert!(env.generator.prompts_for("scene_summary").is_empty());
    }

    #[tokio::test]
    async fn test_scene_summary_resolves_characters() {
        let env = TestEnv::new().await;
        let (character, setting) = env.seed_cast().await;
        let chapter = env.seed_chapter(None, 1).await;

        let resp = env
            .generate_next
            .handle(next(&env, GenerationLevel::SceneSummary, Some(chapter.id)))
            .await
            .unwrap();
        match resp.artifact {
            GeneratedArtifact::SceneSummary(scene) => {
                assert_eq!(scene.character_ids, vec![character.id]);
                assert_eq!(scene.setting_id, Some(setting.id));
                assert_eq!(scene.chapter_id, chapter.id);
                assert_eq!(scene.ordinal_index, 1);
            }
            other => panic!("unexpected artifact: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unknown_character_is_schema_error() {
        let env = TestEnv::new().await;
        env.seed_cast().await;
        let chapter = env.seed_chapter(None, 1).await;
        env.generator.respond_with("scene_summary", |_| {
            json!({
                "title": "Ghosts", "summary": "s", "cycle_phase": "setup",
                "time": "t", "place": "p", "pov": "Nobody",
                "characters": ["Somebody Else"], "goal": "g", "obstacle": "o",
                "outcome": "x", "beats": []
            })
        });

        let err = env
            .generate_next
            .handle(next(&env, GenerationLevel::SceneSummary, Some(chapter.id)))
            .await
            .unwrap_err();
        assert!(matches!(err, ApplicationError::GenerationSchema { .. }));
        assert!(err.is_retryable());
        assert!(env.story_repo.list_scenes(chapter.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_output_persists_nothing() {
        let env = TestEnv::new().await;
        env.generator.respond_with("chapter", |_| json!({ "title": "Only a title" }));
        let err = env
            .generate_next
            .handle(next(&env, GenerationLevel::Chapter, None))
            .await
            .unwrap_err();
        assert!(matches!(err, ApplicationError::GenerationSchema { .. }));
        assert!(env.story_repo.list_chapters(env.story_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_timeout_is_reported() {
        let env = TestEnv::new().await;
        env.generator.set_delay(Duration::from_millis(200));
        let mut command = next(&env, GenerationLevel::Character, None);
        command.options.timeout = Some(Duration::from_millis(10));

        let err = env.generate_next.handle(command).await.unwrap_err();
        assert!(matches!(err, ApplicationError::GenerationTimeout { .. }));
        assert!(env.cast_repo.list_characters(env.story_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cancellation() {
        let env = TestEnv::new().await;
        env.generator.set_delay(Duration::from_millis(200));
        let token = CancellationToken::new();
        let mut command = next(&env, GenerationLevel::Setting, None);
        command.cancel = Some(token.clone());

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            token.cancel();
        });
        let err = env.generate_next.handle(command).await.unwrap_err();
        canceller.await.unwrap();
        assert!(matches!(err, ApplicationError::Cancelled { .. }));
    }

    #[tokio::test]
    async fn test_ordinal_conflict_is_retried_once() {
        let env = TestEnv::new().await;
        // 生成期间另一个写入者占用了序号 1
        let repo = env.story_repo.clone();
        let story_id = env.story_id;
        env.generator.set_delay(Duration::from_millis(20));
        let intruder = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            let now = Utc::now();
            repo.insert_chapter(&ChapterRecord {
                id: Uuid::new_v4(),
                story_id,
                part_id: None,
                ordinal_index: 1,
                title: "Intruder".into(),
                summary: String::new(),
                pov_character: String::new(),
                act: ActStructure::default(),
                content: String::new(),
                word_count: 0,
                published_at: None,
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();
        });

        let resp = env
            .generate_next
            .handle(next(&env, GenerationLevel::Chapter, None))
            .await
            .unwrap();
        intruder.await.unwrap();
        assert_eq!(resp.ordinal_index, 2);
        assert_eq!(resp.sibling_count, 2);
    }

    #[tokio::test]
    async fn test_persistence_failure_carries_scope() {
        let env = TestEnv::new().await;
        sqlx::query(
            "CREATE TRIGGER reject_chapters BEFORE INSERT ON chapters \
             BEGIN SELECT RAISE(ABORT, 'disk I/O error'); END",
        )
        .execute(&env.pool)
        .await
        .unwrap();

        let err = env
            .generate_next
            .handle(next(&env, GenerationLevel::Chapter, None))
            .await
            .unwrap_err();
        match &err {
            ApplicationError::Persistence {
                scope: Some(scope),
                message,
            } => {
                assert_eq!(scope.level, "chapter");
                assert_eq!(scope.story_id, env.story_id);
                assert!(message.contains("disk I/O error"));
            }
            other => panic!("unexpected error: {other}"),
        }
        let rendered = err.to_string();
        assert!(rendered.contains("level=chapter"));
        assert!(rendered.contains(&env.story_id.to_string()));
        assert!(env.story_repo.list_chapters(env.story_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_generate_story_with_tone_override() {
        let env = TestEnv::new().await;
        let story = env
            .generate_story
            .handle(GenerateStory {
                prompt: "A lighthouse keeper finds a map".into(),
                tone: Some(Tone::Satirical),
                part_count: 3,
                cancel: None,
            })
            .await
            .unwrap();
        assert_eq!(story.tone, Tone::Satirical);
        assert_eq!(story.status, StoryStatus::Writing);
        assert!(story.structure.validate().is_ok());
        assert!(env.story_repo.find_story(story.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_generate_story_rejects_bad_structure() {
        let env = TestEnv::new().await;
        env.generator.respond_with("story", |_| {
            json!({
                "title": "T", "premise": "P", "genre": "G", "tone": "dark",
                "parts": [{ "name": "I", "word_share": 0.9 }, { "name": "II", "word_share": 0.9 }]
            })
        });
        let err = env
            .generate_story
            .handle(GenerateStory {
                prompt: "x".into(),
                tone: None,
                part_count: 2,
                cancel: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ApplicationError::GenerationSchema { .. }));
    }

    #[tokio::test]
    async fn test_chapters_within_part_scope() {
        let env = TestEnv::new().await;
        let part = env
            .generate_next
            .handle(next(&env, GenerationLevel::Part, None))
            .await
            .unwrap();
        let part_id = part.artifact.id();

        // 故事范围与分部范围分别编号
        let in_story = env
            .generate_next
            .handle(next(&env, GenerationLevel::Chapter, None))
            .await
            .unwrap();
        let in_part = env
            .generate_next
            .handle(next(&env, GenerationLevel::Chapter, Some(part_id)))
            .await
            .unwrap();
        assert_eq!(in_story.ordinal_index, 1);
        assert_eq!(in_part.ordinal_index, 1);
    }
}
