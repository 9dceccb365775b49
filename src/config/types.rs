//! Configuration Types
//!
//! 定义所有配置结构体

use serde::Deserialize;
use std::time::Duration;

use crate::application::generation::{GenerationSettings, InvalidationPolicy};
use crate::domain::evaluation::{CategoryTable, ScoringPolicy};
use crate::domain::text_metrics::WordRange;
use crate::infrastructure::adapters::HttpTextGeneratorConfig;

/// 应用主配置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// 服务器配置
    #[serde(default)]
    pub server: ServerConfig,

    /// 生成服务配置
    #[serde(default)]
    pub generation: GenerationConfig,

    /// 数据库配置
    #[serde(default)]
    pub database: DatabaseConfig,

    /// 评估配置
    #[serde(default)]
    pub evaluation: EvaluationConfig,

    /// 缓存配置
    #[serde(default)]
    pub cache: CacheConfig,

    /// 日志配置
    #[serde(default)]
    pub log: LogConfig,
}

/// 服务器配置
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// 监听地址
    #[serde(default = "default_host")]
    pub host: String,

    /// 监听端口
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5070
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerConfig {
    /// 获取服务器地址
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// 生成服务配置
#[derive(Debug, Clone, Deserialize)]
pub struct GenerationConfig {
    /// 生成服务基础 URL
    #[serde(default = "default_generation_url")]
    pub url: String,

    #[serde(default)]
    pub api_key: Option<String>,

    /// 使用内置的确定性生成器（本地演示用，不访问网络）
    #[serde(default)]
    pub fake: bool,

    /// 单次调用超时（秒）
    #[serde(default = "default_generation_timeout")]
    pub timeout_secs: u64,

    /// 网络错误重试次数
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_top_p")]
    pub top_p: f32,

    /// 评审调用使用更低的温度
    #[serde(default = "default_critic_temperature")]
    pub critic_temperature: f32,

    /// 场景正文目标字数
    #[serde(default = "default_scene_words")]
    pub scene_words: WordRange,

    /// 章节正文目标字数
    #[serde(default = "default_chapter_words")]
    pub chapter_words: WordRange,
}

fn default_generation_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_generation_timeout() -> u64 {
    120
}

fn default_max_retries() -> u32 {
    2
}

fn default_retry_backoff_ms() -> u64 {
    500
}

fn default_max_tokens() -> u32 {
    2048
}

fn default_temperature() -> f32 {
    0.7
}

fn default_top_p() -> f32 {
    0.9
}

fn default_critic_temperature() -> f32 {
    0.2
}

fn default_scene_words() -> WordRange {
    WordRange::new(300, 1200)
}

fn default_chapter_words() -> WordRange {
    WordRange::new(1500, 6000)
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            url: default_generation_url(),
            api_key: None,
            fake: false,
            timeout_secs: default_generation_timeout(),
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            critic_temperature: default_critic_temperature(),
            scene_words: default_scene_words(),
            chapter_words: default_chapter_words(),
        }
    }
}

impl GenerationConfig {
    /// 结构化调用参数
    pub fn settings(&self) -> GenerationSettings {
        GenerationSettings {
            timeout: Duration::from_secs(self.timeout_secs),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            top_p: self.top_p,
            critic_temperature: self.critic_temperature,
            scene_words: self.scene_words,
            chapter_words: self.chapter_words,
        }
    }

    /// HTTP 客户端配置
    pub fn client_config(&self) -> HttpTextGeneratorConfig {
        let config = HttpTextGeneratorConfig::new(self.url.clone())
            .with_timeout(self.timeout_secs)
            .with_retries(self.max_retries, self.retry_backoff_ms);
        match self.api_key.as_deref().filter(|k| !k.is_empty()) {
            Some(key) => config.with_api_key(key),
            None => config,
        }
    }
}

/// 数据库配置
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// 数据库文件路径
    #[serde(default = "default_db_path")]
    pub path: String,

    /// 最大连接数
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_db_path() -> String {
    "data/fictures.db".to_string()
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            max_connections: default_max_connections(),
        }
    }
}

impl DatabaseConfig {
    /// 获取数据库 URL
    pub fn database_url(&self) -> String {
        format!("sqlite:{}?mode=rwc", self.path)
    }
}

/// 评估配置
#[derive(Debug, Clone, Deserialize)]
pub struct EvaluationConfig {
    /// 场景评分权重
    #[serde(default = "default_scene_weights")]
    pub scene_weights: CategoryTable,

    /// 章节评分权重
    #[serde(default = "default_chapter_weights")]
    pub chapter_weights: CategoryTable,

    /// 各维度低于该分数时给出建议
    #[serde(default = "default_thresholds")]
    pub thresholds: CategoryTable,

    #[serde(default = "default_pass_threshold")]
    pub pass_threshold: f64,

    /// 评审分数在混合中的比重
    #[serde(default = "default_judged_weight")]
    pub judged_weight: f64,
}

fn default_scene_weights() -> CategoryTable {
    ScoringPolicy::default().scene_weights
}

fn default_chapter_weights() -> CategoryTable {
    ScoringPolicy::default().chapter_weights
}

fn default_thresholds() -> CategoryTable {
    ScoringPolicy::default().thresholds
}

fn default_pass_threshold() -> f64 {
    ScoringPolicy::default().pass_threshold
}

fn default_judged_weight() -> f64 {
    ScoringPolicy::default().judged_weight
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        let policy = ScoringPolicy::default();
        Self {
            scene_weights: policy.scene_weights,
            chapter_weights: policy.chapter_weights,
            thresholds: policy.thresholds,
            pass_threshold: policy.pass_threshold,
            judged_weight: policy.judged_weight,
        }
    }
}

impl EvaluationConfig {
    pub fn policy(&self) -> ScoringPolicy {
        ScoringPolicy {
            scene_weights: self.scene_weights,
            chapter_weights: self.chapter_weights,
            thresholds: self.thresholds,
            pass_threshold: self.pass_threshold,
            judged_weight: self.judged_weight,
        }
    }
}

/// 缓存配置
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// 缓存失效的重试次数
    #[serde(default = "default_invalidation_retries")]
    pub invalidation_retries: u32,

    /// 首次重试前的等待（毫秒），之后指数增长
    #[serde(default = "default_invalidation_backoff_ms")]
    pub invalidation_backoff_ms: u64,
}

fn default_invalidation_retries() -> u32 {
    3
}

fn default_invalidation_backoff_ms() -> u64 {
    200
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            invalidation_retries: default_invalidation_retries(),
            invalidation_backoff_ms: default_invalidation_backoff_ms(),
        }
    }
}

impl CacheConfig {
    pub fn policy(&self) -> InvalidationPolicy {
        InvalidationPolicy {
            retries: self.invalidation_retries,
            backoff: Duration::from_millis(self.invalidation_backoff_ms),
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: String,

    /// 是否启用 JSON 格式
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}
