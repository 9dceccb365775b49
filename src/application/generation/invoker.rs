//! 结构化调用：超时、取消、解析与校验

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use super::drafts::Draft;
use super::structured::parse_draft;
use crate::application::error::{ApplicationError, ArtifactScope};
use crate::application::ports::{GenerationRequest, TextGeneratorPort};
use crate::domain::text_metrics::WordRange;

/// 生成参数（来自配置）
#[derive(Debug, Clone)]
pub struct GenerationSettings {
    pub timeout: Duration,
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub critic_temperature: f32,
    pub scene_words: WordRange,
    pub chapter_words: WordRange,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(120),
            max_tokens: 2048,
            temperature: 0.7,
            top_p: 0.9,
            critic_temperature: 0.2,
            scene_words: WordRange::new(300, 1200),
            chapter_words: WordRange::new(1500, 6000),
        }
    }
}

/// 单次调用的覆盖参数
#[derive(Debug, Clone, Copy, Default)]
pub struct InvocationOverrides {
    pub timeout: Option<Duration>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

/// 调用结果
#[derive(Debug, Clone)]
pub struct Invocation<T> {
    pub draft: T,
    pub model: String,
    pub tokens_used: u32,
    pub elapsed: Duration,
}

/// 结构化调用器
pub struct StructuredInvoker {
    generator: Arc<dyn TextGeneratorPort>,
    settings: GenerationSettings,
}

impl StructuredInvoker {
    pub fn new(generator: Arc<dyn TextGeneratorPort>, settings: GenerationSettings) -> Self {
        Self {
            generator,
            settings,
        }
    }

    pub fn settings(&self) -> &GenerationSettings {
        &self.settings
    }

    /// 生成调用
    pub async fn invoke<T: Draft>(
        &self,
        scope: ArtifactScope,
        prompt: String,
        overrides: InvocationOverrides,
        cancel: Option<&CancellationToken>,
    ) -> Result<Invocation<T>, ApplicationError> {
        let request = GenerationRequest::new(prompt, T::SCHEMA_NAME, T::schema())
            .max_tokens(overrides.max_tokens.unwrap_or(self.settings.max_tokens))
            .temperature(overrides.temperature.unwrap_or(self.settings.temperature))
            .top_p(self.settings.top_p);
        self.run(scope, request, overrides.timeout, cancel).await
    }

    /// 评审调用（同一能力，评审 schema + 较低温度）
    pub async fn invoke_critic<T: Draft>(
        &self,
        scope: ArtifactScope,
        prompt: String,
    ) -> Result<Invocation<T>, ApplicationError> {
        let request = GenerationRequest::new(prompt, T::SCHEMA_NAME, T::schema())
            .critic()
            .max_tokens(self.settings.max_tokens)
            .temperature(self.settings.critic_temperature)
            .top_p(self.settings.top_p);
        self.run(scope, request, None, None).await
    }

    async fn run<T: Draft>(
        &self,
        scope: ArtifactScope,
        request: GenerationRequest,
        timeout: Option<Duration>,
        cancel: Option<&CancellationToken>,
    ) -> Result<Invocation<T>, ApplicationError> {
        let timeout = timeout.unwrap_or(self.settings.timeout);
        let schema_name = request.schema_name;
        let mode = request.mode;
        let started = Instant::now();

        let call = tokio::time::timeout(timeout, self.generator.generate(request));
        let outcome = match cancel {
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => {
                    tracing::info!(artifact_level = scope.level, story_id = %scope.story_id, "Generation cancelled");
                    return Err(ApplicationError::Cancelled { scope });
                }
                outcome = call => outcome,
            },
            None => call.await,
        };

        let response = match outcome {
            Err(_) => {
                tracing::warn!(
                    artifact_level = scope.level,
                    story_id = %scope.story_id,
                    timeout_secs = timeout.as_secs(),
                    "Generation timed out"
                );
                return Err(ApplicationError::GenerationTimeout {
                    scope,
                    timeout_secs: timeout.as_secs(),
                });
            }
            Ok(Err(e)) => {
                tracing::warn!(
                    artifact_level = scope.level,
                    story_id = %scope.story_id,
                    error = %e,
                    "Generation failed"
                );
                return Err(ApplicationError::from_generation(scope, e, timeout.as_secs()));
            }
            Ok(Ok(response)) => response,
        };

        let draft = parse_draft::<T>(&response).map_err(|e| {
            tracing::warn!(
                artifact_level = scope.level,
                story_id = %scope.story_id,
                schema = schema_name,
                error = %e,
                "Generated output rejected"
            );
            ApplicationError::schema(scope, e.to_string())
        })?;

        let elapsed = started.elapsed();
        tracing::debug!(
            schema = schema_name,
            mode = mode.as_str(),
            model = %response.model,
            tokens_used = response.tokens_used,
            elapsed_ms = elapsed.as_millis() as u64,
            "Structured generation completed"
        );

        Ok(Invocation {
            draft,
            model: response.model,
            tokens_used: response.tokens_used,
            elapsed,
        })
    }
}
