//! HTTP Text Generator - 调用外部结构化生成服务
//!
//! 实现 TextGeneratorPort trait
//!
//! 外部生成 API:
//! POST {base_url}/api/v1/text/structured
//! Request: {"prompt": "...", "guided_decoding": {"type": "json", "schema": {...}}, ...}
//! Response: {"output": "...", "parsed_output": {...}, "model": "...", "tokens_used": 0,
//!            "is_valid": true, "finish_reason": "stop"}

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use crate::application::ports::{
    GenerationError, GenerationRequest, GenerationResponse, TextGeneratorPort,
};

const MAX_TOKENS_LIMIT: u32 = 8192;

#[derive(Debug, Serialize)]
struct GuidedDecoding<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    schema: &'a Value,
}

/// 生成请求体 (JSON)
#[derive(Debug, Serialize)]
struct StructuredHttpRequest<'a> {
    prompt: &'a str,
    guided_decoding: GuidedDecoding<'a>,
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
    stop_sequences: &'a [String],
}

impl<'a> StructuredHttpRequest<'a> {
    /// 参数限制在服务接受的范围内
    fn from_request(request: &'a GenerationRequest) -> Self {
        Self {
            prompt: &request.prompt,
            guided_decoding: GuidedDecoding {
                kind: "json",
                schema: &request.schema,
            },
            max_tokens: request.max_tokens.clamp(1, MAX_TOKENS_LIMIT),
            temperature: request.temperature.clamp(0.0, 2.0),
            top_p: request.top_p.clamp(0.0, 1.0),
            stop_sequences: &request.stop_sequences,
        }
    }
}

/// 生成响应体 (JSON)
#[derive(Debug, Deserialize)]
struct StructuredHttpResponse {
    #[serde(default)]
    output: String,
    #[serde(default)]
    parsed_output: Option<Value>,
    #[serde(default)]
    model: String,
    #[serde(default)]
    tokens_used: u32,
    #[serde(default = "default_is_valid")]
    is_valid: bool,
    #[serde(default)]
    finish_reason: String,
}

fn default_is_valid() -> bool {
    true
}

/// HTTP 生成客户端配置
#[derive(Debug, Clone)]
pub struct HttpTextGeneratorConfig {
    /// 生成服务基础 URL
    pub base_url: String,
    pub api_key: Option<String>,
    /// 单次请求超时时间（秒）
    pub timeout_secs: u64,
    /// 网络错误/超时的重试次数
    pub max_retries: u32,
    /// 首次重试前的等待（毫秒），之后指数增长
    pub retry_backoff_ms: u64,
}

impl Default for HttpTextGeneratorConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            api_key: None,
            timeout_secs: 120,
            max_retries: 2,
            retry_backoff_ms: 500,
        }
    }
}

impl HttpTextGeneratorConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_retries(mut self, max_retries: u32, backoff_ms: u64) -> Self {
        self.max_retries = max_retries;
        self.retry_backoff_ms = backoff_ms;
        self
    }
}

/// HTTP 生成客户端
pub struct HttpTextGenerator {
    client: Client,
    config: HttpTextGeneratorConfig,
}

impl HttpTextGenerator {
    pub fn new(config: HttpTextGeneratorConfig) -> Result<Self, GenerationError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GenerationError::NetworkError(e.to_string()))?;

        Ok(Self { client, config })
    }

    fn structured_url(&self) -> String {
        format!(
            "{}/api/v1/text/structured",
            self.config.base_url.trim_end_matches('/')
        )
    }

    fn health_url(&self) -> String {
        format!("{}/health", self.config.base_url.trim_end_matches('/'))
    }

    fn backoff(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.config.retry_backoff_ms) * 2u32.saturating_pow(attempt)
    }

    async fn send_once(
        &self,
        body: &StructuredHttpRequest<'_>,
    ) -> Result<GenerationResponse, GenerationError> {
        let mut builder = self.client.post(self.structured_url()).json(body);
        if let Some(key) = &self.config.api_key {
            builder = builder.header("x-api-key", key);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                GenerationError::Timeout
            } else if e.is_connect() {
                GenerationError::NetworkError(format!("Cannot connect to generation service: {}", e))
            } else {
                GenerationError::NetworkError(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(GenerationError::ServiceError(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        let body: StructuredHttpResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::InvalidResponse(e.to_string()))?;

        body.into_response()
    }
}

impl StructuredHttpResponse {
    /// 服务标记为无效时，只有仍带 JSON 对象的 parsed_output 才交给下游严格校验
    fn into_response(self) -> Result<GenerationResponse, GenerationError> {
        if !self.is_valid {
            if !self.parsed_output.as_ref().is_some_and(Value::is_object) {
                return Err(GenerationError::InvalidResponse(format!(
                    "service flagged output as invalid (finish_reason={})",
                    self.finish_reason
                )));
            }
            tracing::debug!(
                model = %self.model,
                finish_reason = %self.finish_reason,
                "Output flagged invalid but parsed_output present, deferring to schema check"
            );
        }

        Ok(GenerationResponse {
            output: self.output,
            parsed_output: self.parsed_output,
            model: self.model,
            tokens_used: self.tokens_used,
            finish_reason: self.finish_reason,
        })
    }
}

#[async_trait]
impl TextGeneratorPort for HttpTextGenerator {
    async fn generate(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationResponse, GenerationError> {
        let body = StructuredHttpRequest::from_request(&request);

        tracing::debug!(
            url = %self.structured_url(),
            schema = request.schema_name,
            mode = request.mode.as_str(),
            prompt_len = request.prompt.len(),
            max_tokens = body.max_tokens,
            "Sending structured generation request"
        );

        let mut attempt = 0u32;
        loop {
            match self.send_once(&body).await {
                Ok(response) => {
                    tracing::info!(
                        schema = request.schema_name,
                        model = %response.model,
                        tokens_used = response.tokens_used,
                        finish_reason = %response.finish_reason,
                        attempts = attempt + 1,
                        "Structured generation completed"
                    );
                    return Ok(response);
                }
                Err(e) if e.is_transient() && attempt < self.config.max_retries => {
                    let delay = self.backoff(attempt);
                    attempt += 1;
                    tracing::warn!(
                        schema = request.schema_name,
                        attempt = attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Generation request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn health_check(&self) -> bool {
        match self
            .client
            .get(self.health_url())
            .timeout(Duration::from_secs(5))
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_config_default() {
        let config = HttpTextGeneratorConfig::default();
        assert_eq!(config.base_url, "http://localhost:8000");
        assert_eq!(config.timeout_secs, 120);
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_config_builder() {
        let config = HttpTextGeneratorConfig::new("http://example.com:9000/")
            .with_timeout(60)
            .with_api_key("secret")
            .with_retries(5, 10);
        assert_eq!(config.timeout_secs, 60);
        assert_eq!(config.api_key.as_deref(), Some("secret"));
        assert_eq!(config.max_retries, 5);

        let client = HttpTextGenerator::new(config).unwrap();
        assert_eq!(
            client.structured_url(),
            "http://example.com:9000/api/v1/text/structured"
        );
        assert_eq!(client.backoff(0), Duration::from_millis(10));
        assert_eq!(client.backoff(2), Duration::from_millis(40));
    }

    #[test]
    fn test_request_body_is_clamped() {
        let request = GenerationRequest::new("p", "part", json!({ "type": "object" }))
            .max_tokens(100_000)
            .temperature(3.5)
            .top_p(-1.0);
        let body = serde_json::to_value(StructuredHttpRequest::from_request(&request)).unwrap();
        assert_eq!(body["max_tokens"], 8192);
        assert_eq!(body["temperature"], 2.0);
        assert_eq!(body["top_p"], 0.0);
        assert_eq!(body["guided_decoding"]["type"], "json");
        assert_eq!(body["guided_decoding"]["schema"]["type"], "object");
    }

    #[test]
    fn test_response_defaults() {
        let body: StructuredHttpResponse =
            serde_json::from_value(json!({ "output": "{}" })).unwrap();
        assert!(body.is_valid);
        assert!(body.parsed_output.is_none());
        assert_eq!(body.tokens_used, 0);
    }

    #[test]
    fn test_invalid_output_is_rejected() {
        let body: StructuredHttpResponse = serde_json::from_value(json!({
            "output": "{\"title\": ",
            "is_valid": false,
            "finish_reason": "length"
        }))
        .unwrap();
        let err = body.into_response().unwrap_err();
        assert!(matches!(err, GenerationError::InvalidResponse(_)));
        assert!(!err.is_transient());

        let body: StructuredHttpResponse = serde_json::from_value(json!({
            "output": "{}",
            "parsed_output": { "content": "Rain." },
            "is_valid": false
        }))
        .unwrap();
        let response = body.into_response().unwrap();
        assert_eq!(response.parsed_output.unwrap()["content"], "Rain.");
    }

    #[tokio::test]
    async fn test_unreachable_service_fails_after_retries() {
        let config = HttpTextGeneratorConfig::new("http://127.0.0.1:1")
            .with_timeout(1)
            .with_retries(1, 1);
        let client = HttpTextGenerator::new(config).unwrap();
        let err = client
            .generate(GenerationRequest::new("p", "part", json!({})))
            .await
            .unwrap_err();
        assert!(err.is_transient());
        assert!(!client.health_check().await);
    }
}
