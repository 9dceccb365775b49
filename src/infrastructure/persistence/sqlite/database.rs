//! SQLite Database - 数据库连接和迁移

use sqlx::{sqlite::SqlitePoolOptions, Pool, Sqlite};
use std::path::Path;

use crate::application::ports::RepositoryError;

/// 数据库配置
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// 数据库文件路径
    pub database_url: String,
    /// 最大连接数
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite:./data/fictures.db?mode=rwc".to_string(),
            max_connections: 5,
        }
    }
}

impl DatabaseConfig {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            database_url: format!("sqlite:{}?mode=rwc", path.as_ref().display()),
            max_connections: 5,
        }
    }

    pub fn in_memory() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            max_connections: 1,
        }
    }
}

/// 数据库连接池
pub type DbPool = Pool<Sqlite>;

/// 创建数据库连接池
pub async fn create_pool(config: &DatabaseConfig) -> Result<DbPool, sqlx::Error> {
    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await?;

    // 启用 WAL 模式，允许并发读写
    sqlx::query("PRAGMA journal_mode=WAL")
        .execute(&pool)
        .await?;

    // 遇到锁时等待而不是立即失败
    sqlx::query("PRAGMA busy_timeout=5000")
        .execute(&pool)
        .await?;

    sqlx::query("PRAGMA synchronous=NORMAL")
        .execute(&pool)
        .await?;

    tracing::info!(
        url = %config.database_url,
        max_connections = config.max_connections,
        "SQLite pool created with WAL mode and busy_timeout=5000ms"
    );

    Ok(pool)
}

/// 数据库错误转换
pub(crate) fn db_error(e: sqlx::Error) -> RepositoryError {
    RepositoryError::DatabaseError(e.to_string())
}

/// 插入错误转换：序号唯一约束冲突单独区分
pub(crate) fn insert_error(e: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            let message = db.message().to_string();
            return if message.contains("ordinal_index") {
                RepositoryError::OrdinalConflict(message)
            } else {
                RepositoryError::Duplicate(message)
            };
        }
    }
    db_error(e)
}

/// JSON 列序列化
pub(crate) fn to_json<T: serde::Serialize>(value: &T) -> Result<String, RepositoryError> {
    serde_json::to_string(value).map_err(|e| RepositoryError::SerializationError(e.to_string()))
}

/// JSON 列反序列化
pub(crate) fn from_json<T: serde::de::DeserializeOwned>(raw: &str) -> Result<T, RepositoryError> {
    serde_json::from_str(raw).map_err(|e| RepositoryError::SerializationError(e.to_string()))
}

pub(crate) fn parse_uuid(raw: &str) -> Result<uuid::Uuid, RepositoryError> {
    uuid::Uuid::parse_str(raw).map_err(|e| RepositoryError::SerializationError(e.to_string()))
}

pub(crate) fn parse_time(raw: &str) -> Result<chrono::DateTime<chrono::Utc>, RepositoryError> {
    chrono::DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&chrono::Utc))
        .map_err(|e| RepositoryError::SerializationError(e.to_string()))
}

/// 运行数据库迁移
///
/// 每个排序范围内 (scope, ordinal_index) 唯一
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS stories (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            premise TEXT NOT NULL,
            genre TEXT NOT NULL,
            tone TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'writing',
            structure TEXT NOT NULL DEFAULT '{"parts":[]}',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS parts (
            id TEXT PRIMARY KEY,
            story_id TEXT NOT NULL,
            ordinal_index INTEGER NOT NULL,
            title TEXT NOT NULL,
            goal TEXT NOT NULL,
            conflict TEXT NOT NULL,
            outcome TEXT NOT NULL,
            summary TEXT NOT NULL,
            created_at TEXT NOT NULL,
            FOREIGN KEY (story_id) REFERENCES stories(id),
            UNIQUE (story_id, ordinal_index)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // scope_id = part_id 或 story_id
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS chapters (
            id TEXT PRIMARY KEY,
            story_id TEXT NOT NULL,
            part_id TEXT,
            scope_id TEXT NOT NULL,
            ordinal_index INTEGER NOT NULL,
            title TEXT NOT NULL,
            summary TEXT NOT NULL,
            pov_character TEXT NOT NULL,
            act TEXT NOT NULL,
            content TEXT NOT NULL DEFAULT '',
            word_count INTEGER NOT NULL DEFAULT 0,
            published_at TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY (story_id) REFERENCES stories(id),
            UNIQUE (scope_id, ordinal_index)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS scenes (
            id TEXT PRIMARY KEY,
            story_id TEXT NOT NULL,
            chapter_id TEXT NOT NULL,
            ordinal_index INTEGER NOT NULL,
            title TEXT NOT NULL,
            summary TEXT NOT NULL,
            cycle_phase TEXT NOT NULL,
            time TEXT NOT NULL,
            place TEXT NOT NULL,
            pov TEXT NOT NULL,
            setting_id TEXT,
            character_ids TEXT NOT NULL,
            goal TEXT NOT NULL,
            obstacle TEXT NOT NULL,
            outcome TEXT NOT NULL,
            beats TEXT NOT NULL,
            content TEXT NOT NULL DEFAULT '',
            word_count INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY (chapter_id) REFERENCES chapters(id),
            UNIQUE (chapter_id, ordinal_index)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS characters (
            id TEXT PRIMARY KEY,
            story_id TEXT NOT NULL,
            ordinal_index INTEGER NOT NULL,
            name TEXT NOT NULL,
            role TEXT NOT NULL,
            summary TEXT NOT NULL,
            physical TEXT NOT NULL,
            voice TEXT NOT NULL,
            created_at TEXT NOT NULL,
            FOREIGN KEY (story_id) REFERENCES stories(id),
            UNIQUE (story_id, ordinal_index)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            id TEXT PRIMARY KEY,
            story_id TEXT NOT NULL,
            ordinal_index INTEGER NOT NULL,
            name TEXT NOT NULL,
            description TEXT NOT NULL,
            sensory TEXT NOT NULL,
            created_at TEXT NOT NULL,
            FOREIGN KEY (story_id) REFERENCES stories(id),
            UNIQUE (story_id, ordinal_index)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // 报告只追加；完整内容存为 JSON
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS evaluation_reports (
            id TEXT PRIMARY KEY,
            artifact_id TEXT NOT NULL,
            artifact_type TEXT NOT NULL,
            mode TEXT NOT NULL,
            overall_score REAL NOT NULL,
            passed INTEGER NOT NULL,
            report TEXT NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    for index in [
        "CREATE INDEX IF NOT EXISTS idx_chapters_story_id ON chapters(story_id)",
        "CREATE INDEX IF NOT EXISTS idx_scenes_story_id ON scenes(story_id)",
        "CREATE INDEX IF NOT EXISTS idx_evaluation_reports_artifact_id ON evaluation_reports(artifact_id, created_at)",
    ] {
        sqlx::query(index).execute(pool).await?;
    }

    tracing::info!("Database migrations completed");
    Ok(())
}
