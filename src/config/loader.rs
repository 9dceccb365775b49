//! Configuration Loader
//!
//! 实现多源配置加载与合并逻辑
//!
//! 优先级（从高到低）：
//! 1. 环境变量
//! 2. 配置文件（config.toml）
//! 3. 默认值

use config::{Config, ConfigError as ConfigCrateError, Environment, File};
use std::path::Path;
use thiserror::Error;

use super::types::AppConfig;
use crate::domain::evaluation::{CategoryTable, MAX_SCORE, MIN_SCORE};
use crate::domain::text_metrics::WordRange;

/// 配置加载错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigCrateError> for ConfigError {
    fn from(err: ConfigCrateError) -> Self {
        ConfigError::LoadError(err.to_string())
    }
}

/// 配置文件搜索路径
const CONFIG_FILE_NAMES: &[&str] = &["config", "config.local"];

/// 加载应用配置
///
/// 按优先级从高到低合并配置：
/// 1. 环境变量（前缀 `FICTURES_`，层级分隔符 `__`）
/// 2. 配置文件（config.toml 或 config.local.toml）
/// 3. 默认值
///
/// # 环境变量示例
/// - `FICTURES_SERVER__PORT=8080`
/// - `FICTURES_GENERATION__URL=http://llm-gateway:8000`
/// - `FICTURES_GENERATION__FAKE=true`
/// - `FICTURES_DATABASE__PATH=/data/fictures.db`
/// - `FICTURES_EVALUATION__PASS_THRESHOLD=3.5`
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from_path(None)
}

/// 从指定路径加载配置
///
/// # 参数
/// - `config_path` - 可选的配置文件路径，如果为 None 则使用默认搜索路径
pub fn load_config_from_path(config_path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder();

    // 1. 标量默认值（最低优先级）；评分表等嵌套结构由 serde 默认值补齐
    builder = builder
        .set_default("server.host", "0.0.0.0")?
        .set_default("server.port", 5070)?
        .set_default("generation.url", "http://localhost:8000")?
        .set_default("generation.fake", false)?
        .set_default("generation.timeout_secs", 120)?
        .set_default("generation.max_retries", 2)?
        .set_default("generation.retry_backoff_ms", 500)?
        .set_default("database.path", "data/fictures.db")?
        .set_default("database.max_connections", 5)?
        .set_default("cache.invalidation_retries", 3)?
        .set_default("cache.invalidation_backoff_ms", 200)?
        .set_default("log.level", "info")?
        .set_default("log.json", false)?;

    // 2. 添加配置文件（如果存在）
    if let Some(path) = config_path {
        builder = builder.add_source(File::from(path).required(true));
    } else {
        for name in CONFIG_FILE_NAMES {
            builder = builder.add_source(File::with_name(name).required(false));
        }
    }

    // 3. 环境变量（最高优先级），例如 FICTURES_GENERATION__URL
    builder = builder.add_source(
        Environment::with_prefix("FICTURES")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;

    let app_config: AppConfig = config.try_deserialize().map_err(|e| {
        ConfigError::ParseError(format!("Failed to deserialize config: {}", e))
    })?;

    validate_config(&app_config)?;

    Ok(app_config)
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError(message.into())
}

fn validate_weights(name: &str, table: &CategoryTable) -> Result<(), ConfigError> {
    match table.values().find(|(_, w)| !(*w > 0.0)) {
        Some((category, weight)) => Err(invalid(format!(
            "{} weight for {} must be positive, got {}",
            name,
            category.as_str(),
            weight
        ))),
        None => Ok(()),
    }
}

fn validate_range(name: &str, range: &WordRange) -> Result<(), ConfigError> {
    if range.min >= range.max {
        return Err(invalid(format!(
            "{} word range must have min < max, got {}..{}",
            name, range.min, range.max
        )));
    }
    Ok(())
}

/// 验证配置有效性
fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(invalid("Server port cannot be 0"));
    }

    if !config.generation.fake && config.generation.url.is_empty() {
        return Err(invalid("Generation URL cannot be empty"));
    }
    if config.generation.timeout_secs == 0 {
        return Err(invalid("Generation timeout cannot be 0"));
    }
    validate_range("scene", &config.generation.scene_words)?;
    validate_range("chapter", &config.generation.chapter_words)?;

    if config.database.path.is_empty() {
        return Err(invalid("Database path cannot be empty"));
    }

    let evaluation = &config.evaluation;
    validate_weights("scene", &evaluation.scene_weights)?;
    validate_weights("chapter", &evaluation.chapter_weights)?;
    if let Some((category, value)) = evaluation
        .thresholds
        .values()
        .find(|(_, t)| !(MIN_SCORE..=MAX_SCORE).contains(t))
    {
        return Err(invalid(format!(
            "threshold for {} must be within [{}, {}], got {}",
            category.as_str(),
            MIN_SCORE,
            MAX_SCORE,
            value
        )));
    }
    if !(MIN_SCORE..=MAX_SCORE).contains(&evaluation.pass_threshold) {
        return Err(invalid(format!(
            "pass threshold must be within [{}, {}]",
            MIN_SCORE, MAX_SCORE
        )));
    }
    if !(0.0..=1.0).contains(&evaluation.judged_weight) {
        return Err(invalid("judged weight must be within [0, 1]"));
    }

    Ok(())
}

/// 打印配置信息（用于启动时日志）
pub fn print_config(config: &AppConfig) {
    tracing::info!("=== Application Configuration ===");
    tracing::info!("Server: {}", config.server.addr());
    if config.generation.fake {
        tracing::info!("Generation: built-in fake generator");
    } else {
        tracing::info!("Generation URL: {}", config.generation.url);
    }
    tracing::info!("Generation Timeout: {}s", config.generation.timeout_secs);
    tracing::info!("Generation Retries: {}", config.generation.max_retries);
    tracing::info!(
        "Scene Words: {}..{}",
        config.generation.scene_words.min,
        config.generation.scene_words.max
    );
    tracing::info!("Database: {}", config.database.path);
    tracing::info!("Database Max Connections: {}", config.database.max_connections);
    tracing::info!("Pass Threshold: {}", config.evaluation.pass_threshold);
    tracing::info!("Judged Weight: {}", config.evaluation.judged_weight);
    tracing::info!("Invalidation Retries: {}", config.cache.invalidation_retries);
    tracing::info!("Log Level: {}", config.log.level);
    tracing::info!("=================================");
}
