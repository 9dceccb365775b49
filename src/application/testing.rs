//! 测试环境：内存 SQLite + 假生成服务 + 内存缓存，装配好全部处理器

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use uuid::Uuid;

use crate::application::commands::handlers::{
    EvaluateArtifactHandler, GenerateNextHandler, GenerateStoryHandler, WriteSceneContentHandler,
};
use crate::application::generation::{
    GenerationSettings, InvalidationPolicy, ScopeLocks, StructuredInvoker,
};
use crate::application::ports::{
    ActStructure, BeatRecord, CacheInvalidatorPort, CastRepositoryPort, ChapterRecord,
    CharacterRecord, EvaluationRepositoryPort, InvalidationKey, PhysicalAttributes, SceneRecord,
    SensoryPalette, SettingRecord, StoryRecord, StoryRepositoryPort,
};
use crate::application::queries::handlers::{AssembleContextHandler, GetStoryTreeHandler};
use crate::domain::evaluation::ScoringPolicy;
use crate::domain::story::{CyclePhase, PartPlan, ShotType, StoryStatus, StoryStructure, Tone};
use crate::infrastructure::adapters::{FakeTextGenerator, FAKE_CHARACTER_NAME, FAKE_SETTING_NAME};
use crate::infrastructure::memory::{InMemoryCharacterVisualCache, InMemoryStoryViewCache};
use crate::infrastructure::persistence::sqlite::{
    create_pool, run_migrations, DatabaseConfig, DbPool, SqliteCastRepository,
    SqliteEvaluationRepository, SqliteStoryRepository,
};

pub struct TestEnv {
    pub story_id: Uuid,
    pub pool: DbPool,
    pub generator: Arc<FakeTextGenerator>,
    pub story_repo: Arc<dyn StoryRepositoryPort>,
    pub cast_repo: Arc<dyn CastRepositoryPort>,
    pub evaluation_repo: Arc<dyn EvaluationRepositoryPort>,
    pub view_cache: Arc<InMemoryStoryViewCache>,
    pub visual_cache: Arc<InMemoryCharacterVisualCache>,
    pub assemble: Arc<AssembleContextHandler>,
    pub story_tree: GetStoryTreeHandler,
    pub generate_next: GenerateNextHandler,
    pub generate_story: GenerateStoryHandler,
    pub write_scene: WriteSceneContentHandler,
    pub evaluate: EvaluateArtifactHandler,
}

impl TestEnv {
    pub async fn new() -> Self {
        let pool = create_pool(&DatabaseConfig::in_memory()).await.unwrap();
        run_migrations(&pool).await.unwrap();

        let story_repo: Arc<dyn StoryRepositoryPort> =
            Arc::new(SqliteStoryRepository::new(pool.clone()));
        let cast_repo: Arc<dyn CastRepositoryPort> =
            Arc::new(SqliteCastRepository::new(pool.clone()));
        let evaluation_repo: Arc<dyn EvaluationRepositoryPort> =
            Arc::new(SqliteEvaluationRepository::new(pool.clone()));

        let generator = Arc::new(FakeTextGenerator::new());
        let invoker = Arc::new(StructuredInvoker::new(
            generator.clone(),
            GenerationSettings::default(),
        ));
        let view_cache = Arc::new(InMemoryStoryViewCache::new());
        let visual_cache = Arc::new(InMemoryCharacterVisualCache::new());
        let invalidator: Arc<dyn CacheInvalidatorPort> = view_cache.clone();
        let locks = Arc::new(ScopeLocks::new());
        let invalidation = InvalidationPolicy {
            retries: 1,
            backoff: Duration::from_millis(1),
        };

        let now = Utc::now();
        let story = StoryRecord {
            id: Uuid::new_v4(),
            title: "The Ledger of Tides".into(),
            premise: "A harbor clerk finds a ledger that records debts before they are made.".into(),
            genre: "mystery".into(),
            tone: Tone::Bittersweet,
            status: StoryStatus::Writing,
            structure: StoryStructure {
                parts: vec![
                    PartPlan { name: "Discovery".into(), word_share: 0.4 },
                    PartPlan { name: "Reckoning".into(), word_share: 0.6 },
                ],
            },
            created_at: now,
            updated_at: now,
        };
        story_repo.insert_story(&story).await.unwrap();

        let assemble = Arc::new(AssembleContextHandler::new(
            story_repo.clone(),
            cast_repo.clone(),
        ));

        Self {
            story_id: story.id,
            pool,
            story_tree: GetStoryTreeHandler::new(
                story_repo.clone(),
                cast_repo.clone(),
                view_cache.clone(),
            ),
            generate_next: GenerateNextHandler::new(
                assemble.clone(),
                story_repo.clone(),
                cast_repo.clone(),
                invoker.clone(),
                invalidator.clone(),
                locks.clone(),
                invalidation,
            ),
            generate_story: GenerateStoryHandler::new(story_repo.clone(), invoker.clone()),
            write_scene: WriteSceneContentHandler::new(
                story_repo.clone(),
                cast_repo.clone(),
                invoker.clone(),
                invalidator,
                locks,
                invalidation,
            ),
            evaluate: EvaluateArtifactHandler::new(
                story_repo.clone(),
                cast_repo.clone(),
                evaluation_repo.clone(),
                invoker,
                ScoringPolicy::default(),
            ),
            assemble,
            generator,
            story_repo,
            cast_repo,
            evaluation_repo,
            view_cache,
            visual_cache,
        }
    }

    pub fn view_cache_invalidator(&self) -> Arc<dyn CacheInvalidatorPort> {
        self.view_cache.clone()
    }

    pub async fn invalidate_story(&self) {
        self.view_cache
            .invalidate(InvalidationKey::story(self.story_id))
            .await
            .unwrap();
    }

    /// 直接写入章节（不经过生成，也不触发失效）
    pub async fn seed_chapter(&self, part_id: Option<Uuid>, ordinal: u32) -> ChapterRecord {
        let now = Utc::now();
        let chapter = ChapterRecord {
            id: Uuid::new_v4(),
            story_id: self.story_id,
            part_id,
            ordinal_index: ordinal,
            title: format!("Low Water {}", ordinal),
            summary: "Mara follows the ledger to the tide flats.".into(),
            pov_character: FAKE_CHARACTER_NAME.into(),
            act: ActStructure {
                setup: "A debt appears in the ledger.".into(),
                confrontation: "The debtor denies it.".into(),
                resolution: "The tide comes in anyway.".into(),
            },
            content: String::new(),
            word_count: 0,
            published_at: None,
            created_at: now,
            updated_at: now,
        };
        self.story_repo.insert_chapter(&chapter).await.unwrap();
        chapter
    }

    pub async fn seed_cast(&self) -> (CharacterRecord, SettingRecord) {
        let now = Utc::now();
        let character = CharacterRecord {
            id: Uuid::new_v4(),
            story_id: self.story_id,
            ordinal_index: 1,
            name: FAKE_CHARACTER_NAME.into(),
            role: "protagonist".into(),
            summary: "A harbor clerk who keeps too many secrets.".into(),
            physical: PhysicalAttributes {
                age: "thirties".into(),
                build: "wiry".into(),
                hair: "cropped black hair".into(),
                eyes: "grey eyes".into(),
                skin: "weathered".into(),
                attire: "oilskin coat".into(),
                distinguishing_features: vec!["ink-stained fingers".into()],
            },
            voice: "Clipped and dry.".into(),
            created_at: now,
        };
        let setting = SettingRecord {
            id: Uuid::new_v4(),
            story_id: self.story_id,
            ordinal_index: 1,
            name: FAKE_SETTING_NAME.into(),
            description: "A covered market on the quay.".into(),
            sensory: SensoryPalette {
                sight: "lantern light on wet stone".into(),
                sound: "gulls and haggling".into(),
                smell: "brine".into(),
                touch: "cold iron railings".into(),
                taste: "salt".into(),
            },
            created_at: now,
        };
        self.cast_repo.insert_character(&character).await.unwrap();
        self.cast_repo.insert_setting(&setting).await.unwrap();
        (character, setting)
    }

    pub async fn seed_scene(
        &self,
        chapter_id: Uuid,
        ordinal: u32,
        character_ids: Vec<Uuid>,
        setting_id: Option<Uuid>,
    ) -> SceneRecord {
        let now = Utc::now();
        let scene = SceneRecord {
            id: Uuid::new_v4(),
            story_id: self.story_id,
            chapter_id,
            ordinal_index: ordinal,
            title: format!("Scene {}", ordinal),
            summary: "Mara confronts the fishmonger.".into(),
            cycle_phase: CyclePhase::Confrontation,
            time: "dusk".into(),
            place: "the quay".into(),
            pov: FAKE_CHARACTER_NAME.into(),
            setting_id,
            character_ids,
            goal: "Learn who wrote the entry.".into(),
            obstacle: "The fishmonger lies.".into(),
            outcome: "She leaves with a name.".into(),
            beats: vec![BeatRecord {
                description: "leaning over a crate of eels".into(),
                shot: Some(ShotType::Medium),
            }],
            content: String::new(),
            word_count: 0,
            created_at: now,
            updated_at: now,
        };
        self.story_repo.insert_scene(&scene).await.unwrap();
        scene
    }
}
