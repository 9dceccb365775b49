//! SQLite Story Repository - 故事、分部、章节、场景

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use super::database::{db_error, from_json, insert_error, parse_time, parse_uuid, to_json};
use super::DbPool;
use crate::application::ports::{
    ChapterRecord, ChildCounts, PartRecord, RepositoryError, SceneRecord, StoryRecord,
    StoryRepositoryPort,
};
use crate::domain::story::{CyclePhase, StoryStatus, Tone};
use crate::domain::text_metrics::{count_words, CategoricalTag};

/// SQLite Story Repository
pub struct SqliteStoryRepository {
    pool: DbPool,
}

impl SqliteStoryRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

// ============================================================================
// Rows
// ============================================================================

#[derive(FromRow)]
struct StoryRow {
    id: String,
    title: String,
    premise: String,
    genre: String,
    tone: String,
    status: String,
    structure: String,
    created_at: String,
    updated_at: String,
}

impl TryFrom<StoryRow> for StoryRecord {
    type Error = RepositoryError;

    fn try_from(row: StoryRow) -> Result<Self, Self::Error> {
        Ok(StoryRecord {
            id: parse_uuid(&row.id)?,
            title: row.title,
            premise: row.premise,
            genre: row.genre,
            tone: Tone::from_str(&row.tone).ok_or_else(|| {
                RepositoryError::SerializationError(format!("unknown tone '{}'", row.tone))
            })?,
            status: StoryStatus::from_str(&row.status).ok_or_else(|| {
                RepositoryError::SerializationError(format!("unknown status '{}'", row.status))
            })?,
            structure: from_json(&row.structure)?,
            created_at: parse_time(&row.created_at)?,
            updated_at: parse_time(&row.updated_at)?,
        })
    }
}

#[derive(FromRow)]
struct PartRow {
    id: String,
    story_id: String,
    ordinal_index: i64,
    title: String,
    goal: String,
    conflict: String,
    outcome: String,
    summary: String,
    created_at: String,
}

impl TryFrom<PartRow> for PartRecord {
    type Error = RepositoryError;

    fn try_from(row: PartRow) -> Result<Self, Self::Error> {
        Ok(PartRecord {
            id: parse_uuid(&row.id)?,
            story_id: parse_uuid(&row.story_id)?,
            ordinal_index: row.ordinal_index as u32,
            title: row.title,
            goal: row.goal,
            conflict: row.conflict,
            outcome: row.outcome,
            summary: row.summary,
            created_at: parse_time(&row.created_at)?,
        })
    }
}

#[derive(FromRow)]
struct ChapterRow {
    id: String,
    story_id: String,
    part_id: Option<String>,
    ordinal_index: i64,
    title: String,
    summary: String,
    pov_character: String,
    act: String,
    content: String,
    word_count: i64,
    published_at: Option<String>,
    created_at: String,
    updated_at: String,
}

impl TryFrom<ChapterRow> for ChapterRecord {
    type Error = RepositoryError;

    fn try_from(row: ChapterRow) -> Result<Self, Self::Error> {
        Ok(ChapterRecord {
            id: parse_uuid(&row.id)?,
            story_id: parse_uuid(&row.story_id)?,
            part_id: row.part_id.as_deref().map(parse_uuid).transpose()?,
            ordinal_index: row.ordinal_index as u32,
            title: row.title,
            summary: row.summary,
            pov_character: row.pov_character,
            act: from_json(&row.act)?,
            content: row.content,
            word_count: row.word_count as usize,
            published_at: row.published_at.as_deref().map(parse_time).transpose()?,
            created_at: parse_time(&row.created_at)?,
            updated_at: parse_time(&row.updated_at)?,
        })
    }
}

#[derive(FromRow)]
struct SceneRow {
    id: String,
    story_id: String,
    chapter_id: String,
    ordinal_index: i64,
    title: String,
    summary: String,
    cycle_phase: String,
    time: String,
    place: String,
    pov: String,
    setting_id: Option<String>,
    character_ids: String,
    goal: String,
    obstacle: String,
    outcome: String,
    beats: String,
    content: String,
    word_count: i64,
    created_at: String,
    updated_at: String,
}

impl TryFrom<SceneRow> for SceneRecord {
    type Error = RepositoryError;

    fn try_from(row: SceneRow) -> Result<Self, Self::Error> {
        Ok(SceneRecord {
            id: parse_uuid(&row.id)?,
            story_id: parse_uuid(&row.story_id)?,
            chapter_id: parse_uuid(&row.chapter_id)?,
            ordinal_index: row.ordinal_index as u32,
            title: row.title,
            summary: row.summary,
            cycle_phase: CyclePhase::from_str(&row.cycle_phase).ok_or_else(|| {
                RepositoryError::SerializationError(format!(
                    "unknown cycle phase '{}'",
                    row.cycle_phase
                ))
            })?,
            time: row.time,
            place: row.place,
            pov: row.pov,
            setting_id: row.setting_id.as_deref().map(parse_uuid).transpose()?,
            character_ids: from_json(&row.character_ids)?,
            goal: row.goal,
            obstacle: row.obstacle,
            outcome: row.outcome,
            beats: from_json(&row.beats)?,
            content: row.content,
            word_count: row.word_count as usize,
            created_at: parse_time(&row.created_at)?,
            updated_at: parse_time(&row.updated_at)?,
        })
    }
}

const STORY_COLUMNS: &str =
    "id, title, premise, genre, tone, status, structure, created_at, updated_at";
const PART_COLUMNS: &str =
    "id, story_id, ordinal_index, title, goal, conflict, outcome, summary, created_at";
const CHAPTER_COLUMNS: &str = "c.id, c.story_id, c.part_id, c.ordinal_index, c.title, c.summary, \
     c.pov_character, c.act, c.content, c.word_count, c.published_at, c.created_at, c.updated_at";
const SCENE_COLUMNS: &str = "id, story_id, chapter_id, ordinal_index, title, summary, cycle_phase, \
     time, place, pov, setting_id, character_ids, goal, obstacle, outcome, beats, content, \
     word_count, created_at, updated_at";

fn not_found(kind: &str, id: Uuid) -> RepositoryError {
    RepositoryError::NotFound(format!("{} {}", kind, id))
}

// ============================================================================
// StoryRepositoryPort
// ============================================================================

#[async_trait]
impl StoryRepositoryPort for SqliteStoryRepository {
    async fn insert_story(&self, story: &StoryRecord) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO stories (id, title, premise, genre, tone, status, structure, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(story.id.to_string())
        .bind(&story.title)
        .bind(&story.premise)
        .bind(&story.genre)
        .bind(story.tone.as_str())
        .bind(story.status.as_str())
        .bind(to_json(&story.structure)?)
        .bind(story.created_at.to_rfc3339())
        .bind(story.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(insert_error)?;

        Ok(())
    }

    async fn find_story(&self, id: Uuid) -> Result<Option<StoryRecord>, RepositoryError> {
        let row: Option<StoryRow> =
            sqlx::query_as(&format!("SELECT {} FROM stories WHERE id = ?", STORY_COLUMNS))
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await
                .map_err(db_error)?;

        row.map(StoryRecord::try_from).transpose()
    }

    async fn list_stories(&self) -> Result<Vec<StoryRecord>, RepositoryError> {
        let rows: Vec<StoryRow> = sqlx::query_as(&format!(
            "SELECT {} FROM stories ORDER BY updated_at DESC",
            STORY_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows.into_iter().map(StoryRecord::try_from).collect()
    }

    async fn update_story_status(
        &self,
        id: Uuid,
        status: StoryStatus,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE stories SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(Utc::now().to_rfc3339())
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(not_found("story", id));
        }
        Ok(())
    }

    async fn touch_story(&self, id: Uuid) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE stories SET updated_at = ? WHERE id = ?")
            .bind(Utc::now().to_rfc3339())
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(())
    }

    async fn delete_story(&self, id: Uuid) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM stories WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(not_found("story", id));
        }
        Ok(())
    }

    async fn count_children(&self, story_id: Uuid) -> Result<ChildCounts, RepositoryError> {
        let (parts, chapters, scenes, characters, settings): (i64, i64, i64, i64, i64) =
            sqlx::query_as(
                r#"
                SELECT
                    (SELECT COUNT(*) FROM parts WHERE story_id = ?),
                    (SELECT COUNT(*) FROM chapters WHERE story_id = ?),
                    (SELECT COUNT(*) FROM scenes WHERE story_id = ?),
                    (SELECT COUNT(*) FROM characters WHERE story_id = ?),
                    (SELECT COUNT(*) FROM settings WHERE story_id = ?)
                "#,
            )
            .bind(story_id.to_string())
            .bind(story_id.to_string())
            .bind(story_id.to_string())
            .bind(story_id.to_string())
            .bind(story_id.to_string())
            .fetch_one(&self.pool)
            .await
            .map_err(db_error)?;

        Ok(ChildCounts {
            parts: parts as usize,
            chapters: chapters as usize,
            scenes: scenes as usize,
            characters: characters as usize,
            settings: settings as usize,
        })
    }

    // ========================================================================
    // Parts
    // ========================================================================

    async fn insert_part(&self, part: &PartRecord) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO parts (id, story_id, ordinal_index, title, goal, conflict, outcome, summary, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(part.id.to_string())
        .bind(part.story_id.to_string())
        .bind(part.ordinal_index as i64)
        .bind(&part.title)
        .bind(&part.goal)
        .bind(&part.conflict)
        .bind(&part.outcome)
        .bind(&part.summary)
        .bind(part.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(insert_error)?;

        Ok(())
    }

    async fn find_part(&self, id: Uuid) -> Result<Option<PartRecord>, RepositoryError> {
        let row: Option<PartRow> =
            sqlx::query_as(&format!("SELECT {} FROM parts WHERE id = ?", PART_COLUMNS))
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await
                .map_err(db_error)?;

        row.map(PartRecord::try_from).transpose()
    }

    async fn list_parts(&self, story_id: Uuid) -> Result<Vec<PartRecord>, RepositoryError> {
        let rows: Vec<PartRow> = sqlx::query_as(&format!(
            "SELECT {} FROM parts WHERE story_id = ? ORDER BY ordinal_index ASC",
            PART_COLUMNS
        ))
        .bind(story_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows.into_iter().map(PartRecord::try_from).collect()
    }

    // ========================================================================
    // Chapters
    // ========================================================================

    async fn insert_chapter(&self, chapter: &ChapterRecord) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO chapters (id, story_id, part_id, scope_id, ordinal_index, title, summary,
                pov_character, act, content, word_count, published_at, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(chapter.id.to_string())
        .bind(chapter.story_id.to_string())
        .bind(chapter.part_id.map(|id| id.to_string()))
        .bind(chapter.scope_id().to_string())
        .bind(chapter.ordinal_index as i64)
        .bind(&chapter.title)
        .bind(&chapter.summary)
        .bind(&chapter.pov_character)
        .bind(to_json(&chapter.act)?)
        .bind(&chapter.content)
        .bind(count_words(&chapter.content) as i64)
        .bind(chapter.published_at.map(|t| t.to_rfc3339()))
        .bind(chapter.created_at.to_rfc3339())
        .bind(chapter.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(insert_error)?;

        Ok(())
    }

    async fn find_chapter(&self, id: Uuid) -> Result<Option<ChapterRecord>, RepositoryError> {
        let row: Option<ChapterRow> = sqlx::query_as(&format!(
            "SELECT {} FROM chapters c WHERE c.id = ?",
            CHAPTER_COLUMNS
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        row.map(ChapterRecord::try_from).transpose()
    }

    async fn list_chapters_in_scope(
        &self,
        scope_id: Uuid,
    ) -> Result<Vec<ChapterRecord>, RepositoryError> {
        let rows: Vec<ChapterRow> = sqlx::query_as(&format!(
            "SELECT {} FROM chapters c WHERE c.scope_id = ? ORDER BY c.ordinal_index ASC",
            CHAPTER_COLUMNS
        ))
        .bind(scope_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows.into_iter().map(ChapterRecord::try_from).collect()
    }

    async fn list_chapters(&self, story_id: Uuid) -> Result<Vec<ChapterRecord>, RepositoryError> {
        // 故事范围的章节在前，其余按分部序号
        let rows: Vec<ChapterRow> = sqlx::query_as(&format!(
            "SELECT {} FROM chapters c LEFT JOIN parts p ON c.part_id = p.id \
             WHERE c.story_id = ? ORDER BY COALESCE(p.ordinal_index, 0) ASC, c.ordinal_index ASC",
            CHAPTER_COLUMNS
        ))
        .bind(story_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows.into_iter().map(ChapterRecord::try_from).collect()
    }

    async fn update_chapter_content(
        &self,
        id: Uuid,
        content: &str,
    ) -> Result<ChapterRecord, RepositoryError> {
        let result = sqlx::query(
            "UPDATE chapters SET content = ?, word_count = ?, updated_at = ? WHERE id = ?",
        )
        .bind(content)
        .bind(count_words(content) as i64)
        .bind(Utc::now().to_rfc3339())
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(not_found("chapter", id));
        }
        self.find_chapter(id)
            .await?
            .ok_or_else(|| not_found("chapter", id))
    }

    async fn publish_chapter(
        &self,
        id: Uuid,
        published_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE chapters SET published_at = ?, updated_at = ? WHERE id = ? AND published_at IS NULL",
        )
        .bind(published_at.to_rfc3339())
        .bind(published_at.to_rfc3339())
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(not_found("unpublished chapter", id));
        }
        Ok(())
    }

    // ========================================================================
    // Scenes
    // ========================================================================

    async fn insert_scene(&self, scene: &SceneRecord) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO scenes (id, story_id, chapter_id, ordinal_index, title, summary, cycle_phase,
                time, place, pov, setting_id, character_ids, goal, obstacle, outcome, beats,
                content, word_count, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(scene.id.to_string())
        .bind(scene.story_id.to_string())
        .bind(scene.chapter_id.to_string())
        .bind(scene.ordinal_index as i64)
        .bind(&scene.title)
        .bind(&scene.summary)
        .bind(scene.cycle_phase.as_str())
        .bind(&scene.time)
        .bind(&scene.place)
        .bind(&scene.pov)
        .bind(scene.setting_id.map(|id| id.to_string()))
        .bind(to_json(&scene.character_ids)?)
        .bind(&scene.goal)
        .bind(&scene.obstacle)
        .bind(&scene.outcome)
        .bind(to_json(&scene.beats)?)
        .bind(&scene.content)
        .bind(count_words(&scene.content) as i64)
        .bind(scene.created_at.to_rfc3339())
        .bind(scene.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(insert_error)?;

        Ok(())
    }

    async fn find_scene(&self, id: Uuid) -> Result<Option<SceneRecord>, RepositoryError> {
        let row: Option<SceneRow> =
            sqlx::query_as(&format!("SELECT {} FROM scenes WHERE id = ?", SCENE_COLUMNS))
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await
                .map_err(db_error)?;

        row.map(SceneRecord::try_from).transpose()
    }

    async fn list_scenes(&self, chapter_id: Uuid) -> Result<Vec<SceneRecord>, RepositoryError> {
        let rows: Vec<SceneRow> = sqlx::query_as(&format!(
            "SELECT {} FROM scenes WHERE chapter_id = ? ORDER BY ordinal_index ASC",
            SCENE_COLUMNS
        ))
        .bind(chapter_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows.into_iter().map(SceneRecord::try_from).collect()
    }

    async fn update_scene_content(
        &self,
        id: Uuid,
        content: &str,
    ) -> Result<SceneRecord, RepositoryError> {
        let result = sqlx::query(
            "UPDATE scenes SET content = ?, word_count = ?, updated_at = ? WHERE id = ?",
        )
        .bind(content)
        .bind(count_words(content) as i64)
        .bind(Utc::now().to_rfc3339())
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(not_found("scene", id));
        }
        self.find_scene(id).await?.ok_or_else(|| not_found("scene", id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{ActStructure, BeatRecord};
    use crate::domain::story::{PartPlan, ShotType, StoryStructure};
    use crate::infrastructure::persistence::sqlite::{create_pool, run_migrations, DatabaseConfig};

    async fn repo() -> SqliteStoryRepository {
        let pool = create_pool(&DatabaseConfig::in_memory()).await.unwrap();
        run_migrations(&pool).await.unwrap();
        SqliteStoryRepository::new(pool)
    }

    fn story() -> StoryRecord {
        let now = Utc::now();
        StoryRecord {
            id: Uuid::new_v4(),
            title: "Ledger".into(),
            premise: "A ledger of future debts.".into(),
            genre: "mystery".into(),
            tone: Tone::Dark,
            status: StoryStatus::Writing,
            structure: StoryStructure {
                parts: vec![PartPlan { name: "All".into(), word_share: 1.0 }],
            },
            created_at: now,
            updated_at: now,
        }
    }

    fn chapter(story_id: Uuid, part_id: Option<Uuid>, ordinal: u32) -> ChapterRecord {
        let now = Utc::now();
        ChapterRecord {
            id: Uuid::new_v4(),
            story_id,
            part_id,
            ordinal_index: ordinal,
            title: format!("Chapter {}", ordinal),
            summary: "s".into(),
            pov_character: "Mara".into(),
            act: ActStructure {
                setup: "a".into(),
                confrontation: "b".into(),
                resolution: String::new(),
            },
            content: String::new(),
            word_count: 99,
            published_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn scene(story_id: Uuid, chapter_id: Uuid, ordinal: u32) -> SceneRecord {
        let now = Utc::now();
        SceneRecord {
            id: Uuid::new_v4(),
            story_id,
            chapter_id,
            ordinal_index: ordinal,
            title: "Pier".into(),
            summary: "s".into(),
            cycle_phase: CyclePhase::Virtue,
            time: "dawn".into(),
            place: "pier".into(),
            pov: "Mara".into(),
            setting_id: None,
            character_ids: vec![Uuid::new_v4()],
            goal: "g".into(),
            obstacle: "o".into(),
            outcome: "x".into(),
            beats: vec![BeatRecord {
                description: "Fog".into(),
                shot: Some(ShotType::Wide),
            }],
            content: "Three words here".into(),
            word_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_story_round_trip_and_status() {
        let repo = repo().await;
        let s = story();
        repo.insert_story(&s).await.unwrap();

        let found = repo.find_story(s.id).await.unwrap().unwrap();
        assert_eq!(found.tone, Tone::Dark);
        assert_eq!(found.structure, s.structure);

        repo.update_story_status(s.id, StoryStatus::Complete).await.unwrap();
        let found = repo.find_story(s.id).await.unwrap().unwrap();
        assert_eq!(found.status, StoryStatus::Complete);

        assert!(matches!(
            repo.update_story_status(Uuid::new_v4(), StoryStatus::Complete).await,
            Err(RepositoryError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_chapter_ordinal_is_unique_per_scope() {
        let repo = repo().await;
        let s = story();
        repo.insert_story(&s).await.unwrap();

        let first = chapter(s.id, None, 1);
        repo.insert_chapter(&first).await.unwrap();
        assert_eq!(
            repo.find_chapter(first.id).await.unwrap().unwrap().word_count,
            0
        );

        let clash = chapter(s.id, None, 1);
        assert!(matches!(
            repo.insert_chapter(&clash).await,
            Err(RepositoryError::OrdinalConflict(_))
        ));

        // 不同范围可以复用序号
        let in_part = chapter(s.id, Some(Uuid::new_v4()), 1);
        repo.insert_chapter(&in_part).await.unwrap();

        // 主键冲突不是序号冲突
        let mut dup = chapter(s.id, None, 2);
        dup.id = first.id;
        assert!(matches!(
            repo.insert_chapter(&dup).await,
            Err(RepositoryError::Duplicate(_))
        ));

        assert_eq!(repo.list_chapters_in_scope(s.id).await.unwrap().len(), 1);
        assert_eq!(repo.list_chapters(s.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_scene_content_recomputes_word_count() {
        let repo = repo().await;
        let s = story();
        repo.insert_story(&s).await.unwrap();
        let c = chapter(s.id, None, 1);
        repo.insert_chapter(&c).await.unwrap();
        let sc = scene(s.id, c.id, 1);
        repo.insert_scene(&sc).await.unwrap();

        let stored = repo.find_scene(sc.id).await.unwrap().unwrap();
        assert_eq!(stored.word_count, 3);
        assert_eq!(stored.beats, sc.beats);
        assert_eq!(stored.character_ids, sc.character_ids);
        assert_eq!(stored.cycle_phase, CyclePhase::Virtue);

        let updated = repo
            .update_scene_content(sc.id, "Now there are five words.")
            .await
            .unwrap();
        assert_eq!(updated.word_count, 5);
    }

    #[tokio::test]
    async fn test_publish_once_and_count_children() {
        let repo = repo().await;
        let s = story();
        repo.insert_story(&s).await.unwrap();
        let c = chapter(s.id, None, 1);
        repo.insert_chapter(&c).await.unwrap();
        repo.insert_scene(&scene(s.id, c.id, 1)).await.unwrap();

        repo.publish_chapter(c.id, Utc::now()).await.unwrap();
        assert!(repo.publish_chapter(c.id, Utc::now()).await.is_err());
        assert!(repo
            .find_chapter(c.id)
            .await
            .unwrap()
            .unwrap()
            .published_at
            .is_some());

        let counts = repo.count_children(s.id).await.unwrap();
        assert_eq!(counts.chapters, 1);
        assert_eq!(counts.scenes, 1);
        assert_eq!(counts.total(), 2);
    }
}
