//! Text Generator Port - 结构化文本生成能力抽象
//!
//! 定义对外部生成服务的抽象接口，具体实现在 infrastructure/adapters 层

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// 生成服务错误
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Service error: {0}")]
    ServiceError(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl GenerationError {
    /// 网络错误和超时可以重试
    pub fn is_transient(&self) -> bool {
        matches!(self, GenerationError::NetworkError(_) | GenerationError::Timeout)
    }
}

/// 调用模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationMode {
    /// 生成新内容
    Create,
    /// 评审已有内容
    Critic,
}

impl InvocationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvocationMode::Create => "create",
            InvocationMode::Critic => "critic",
        }
    }
}

/// 结构化生成请求
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub prompt: String,
    /// 输出 JSON Schema 的名称（用于日志和 fake 实现分派）
    pub schema_name: &'static str,
    pub schema: Value,
    pub mode: InvocationMode,
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub stop_sequences: Vec<String>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>, schema_name: &'static str, schema: Value) -> Self {
        Self {
            prompt: prompt.into(),
            schema_name,
            schema,
            mode: InvocationMode::Create,
            max_tokens: 2048,
            temperature: 0.7,
            top_p: 0.9,
            stop_sequences: Vec::new(),
        }
    }

    pub fn critic(mut self) -> Self {
        self.mode = InvocationMode::Critic;
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn top_p(mut self, top_p: f32) -> Self {
        self.top_p = top_p;
        self
    }
}

/// 结构化生成响应
#[derive(Debug, Clone)]
pub struct GenerationResponse {
    /// 原始输出文本（应为 JSON）
    pub output: String,
    /// 服务端已解析的 JSON（如果有）
    pub parsed_output: Option<Value>,
    pub model: String,
    pub tokens_used: u32,
    pub finish_reason: String,
}

/// Text Generator Port
#[async_trait]
pub trait TextGeneratorPort: Send + Sync {
    /// 执行一次结构化生成
    async fn generate(&self, request: GenerationRequest)
        -> Result<GenerationResponse, GenerationError>;

    /// 检查生成服务是否可用
    async fn health_check(&self) -> bool {
        true
    }
}
