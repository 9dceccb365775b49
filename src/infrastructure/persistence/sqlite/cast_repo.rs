//! SQLite Cast Repository - 角色与地点

use async_trait::async_trait;
use sqlx::FromRow;
use uuid::Uuid;

use super::database::{db_error, from_json, insert_error, parse_time, parse_uuid, to_json};
use super::DbPool;
use crate::application::ports::{
    CastRepositoryPort, CharacterRecord, RepositoryError, SettingRecord,
};

/// SQLite Cast Repository
pub struct SqliteCastRepository {
    pool: DbPool,
}

impl SqliteCastRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct CharacterRow {
    id: String,
    story_id: String,
    ordinal_index: i64,
    name: String,
    role: String,
    summary: String,
    physical: String,
    voice: String,
    created_at: String,
}

impl TryFrom<CharacterRow> for CharacterRecord {
    type Error = RepositoryError;

    fn try_from(row: CharacterRow) -> Result<Self, Self::Error> {
        Ok(CharacterRecord {
            id: parse_uuid(&row.id)?,
            story_id: parse_uuid(&row.story_id)?,
            ordinal_index: row.ordinal_index as u32,
            name: row.name,
            role: row.role,
            summary: row.summary,
            physical: from_json(&row.physical)?,
            voice: row.voice,
            created_at: parse_time(&row.created_at)?,
        })
    }
}

#[derive(FromRow)]
struct SettingRow {
    id: String,
    story_id: String,
    ordinal_index: i64,
    name: String,
    description: String,
    sensory: String,
    created_at: String,
}

impl TryFrom<SettingRow> for SettingRecord {
    type Error = RepositoryError;

    fn try_from(row: SettingRow) -> Result<Self, Self::Error> {
        Ok(SettingRecord {
            id: parse_uuid(&row.id)?,
            story_id: parse_uuid(&row.story_id)?,
            ordinal_index: row.ordinal_index as u32,
            name: row.name,
            description: row.description,
            sensory: from_json(&row.sensory)?,
            created_at: parse_time(&row.created_at)?,
        })
    }
}

#[async_trait]
impl CastRepositoryPort for SqliteCastRepository {
    async fn insert_character(&self, character: &CharacterRecord) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO characters (id, story_id, ordinal_index, name, role, summary, physical, voice, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(character.id.to_string())
        .bind(character.story_id.to_string())
        .bind(character.ordinal_index as i64)
        .bind(&character.name)
        .bind(&character.role)
        .bind(&character.summary)
        .bind(to_json(&character.physical)?)
        .bind(&character.voice)
        .bind(character.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(insert_error)?;

        Ok(())
    }

    async fn find_character(&self, id: Uuid) -> Result<Option<CharacterRecord>, RepositoryError> {
        let row: Option<CharacterRow> = sqlx::query_as(
            "SELECT id, story_id, ordinal_index, name, role, summary, physical, voice, created_at FROM characters WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        row.map(CharacterRecord::try_from).transpose()
    }

    async fn list_characters(
        &self,
        story_id: Uuid,
    ) -> Result<Vec<CharacterRecord>, RepositoryError> {
        let rows: Vec<CharacterRow> = sqlx::query_as(
            "SELECT id, story_id, ordinal_index, name, role, summary, physical, voice, created_at FROM characters WHERE story_id = ? ORDER BY ordinal_index ASC",
        )
        .bind(story_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows.into_iter().map(CharacterRecord::try_from).collect()
    }

    async fn insert_setting(&self, setting: &SettingRecord) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO settings (id, story_id, ordinal_index, name, description, sensory, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(setting.id.to_string())
        .bind(setting.story_id.to_string())
        .bind(setting.ordinal_index as i64)
        .bind(&setting.name)
        .bind(&setting.description)
        .bind(to_json(&setting.sensory)?)
        .bind(setting.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(insert_error)?;

        Ok(())
    }

    async fn find_setting(&self, id: Uuid) -> Result<Option<SettingRecord>, RepositoryError> {
        let row: Option<SettingRow> = sqlx::query_as(
            "SELECT id, story_id, ordinal_index, name, description, sensory, created_at FROM settings WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        row.map(SettingRecord::try_from).transpose()
    }

    async fn list_settings(&self, story_id: Uuid) -> Result<Vec<SettingRecord>, RepositoryError> {
        let rows: Vec<SettingRow> = sqlx::query_as(
            "SELECT id, story_id, ordinal_index, name, description, sensory, created_at FROM settings WHERE story_id = ? ORDER BY ordinal_index ASC",
        )
        .bind(story_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows.into_iter().map(SettingRecord::try_from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{PhysicalAttributes, SensoryPalette};
    use crate::infrastructure::persistence::sqlite::{create_pool, run_migrations, DatabaseConfig};
    use chrono::Utc;

    async fn repo() -> SqliteCastRepository {
        let pool = create_pool(&DatabaseConfig::in_memory()).await.unwrap();
        run_migrations(&pool).await.unwrap();
        SqliteCastRepository::new(pool)
    }

    fn character(story_id: Uuid, ordinal: u32, name: &str) -> CharacterRecord {
        CharacterRecord {
            id: Uuid::new_v4(),
            story_id,
            ordinal_index: ordinal,
            name: name.into(),
            role: "lead".into(),
            summary: "s".into(),
            physical: PhysicalAttributes {
                hair: "red hair".into(),
                distinguishing_features: vec!["scar".into()],
                ..Default::default()
            },
            voice: "soft".into(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_characters_ordered_and_unique() {
        let repo = repo().await;
        let story_id = Uuid::new_v4();
        repo.insert_character(&character(story_id, 2, "B")).await.unwrap();
        repo.insert_character(&character(story_id, 1, "A")).await.unwrap();

        let listed = repo.list_characters(story_id).await.unwrap();
        let names: Vec<&str> = listed.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);
        assert_eq!(listed[0].physical.distinguishing_features, vec!["scar".to_string()]);

        assert!(matches!(
            repo.insert_character(&character(story_id, 1, "C")).await,
            Err(RepositoryError::OrdinalConflict(_))
        ));
    }

    #[tokio::test]
    async fn test_setting_round_trip() {
        let repo = repo().await;
        let setting = SettingRecord {
            id: Uuid::new_v4(),
            story_id: Uuid::new_v4(),
            ordinal_index: 1,
            name: "Market".into(),
            description: "d".into(),
            sensory: SensoryPalette {
                smell: "tar".into(),
                ..Default::default()
            },
            created_at: Utc::now(),
        };
        repo.insert_setting(&setting).await.unwrap();
        let found = repo.find_setting(setting.id).await.unwrap().unwrap();
        assert_eq!(found.sensory, setting.sensory);
        assert!(repo.find_setting(Uuid::new_v4()).await.unwrap().is_none());
    }
}
