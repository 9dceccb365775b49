//! Fake Text Generator - 用于测试和离线开发的生成器
//!
//! 不调用外部服务。每种 schema 有一份合法的默认输出，
//! 可以按 schema 替换为自定义响应、注入失败或延迟。

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::application::ports::{
    GenerationError, GenerationRequest, GenerationResponse, TextGeneratorPort,
};

/// 默认输出中使用的角色名
pub const FAKE_CHARACTER_NAME: &str = "Mara Quell";
/// 默认输出中使用的地点名
pub const FAKE_SETTING_NAME: &str = "The Salt Market";

type Responder = Arc<dyn Fn(&GenerationRequest) -> Value + Send + Sync>;

/// Fake Text Generator
#[derive(Default)]
pub struct FakeTextGenerator {
    responders: DashMap<&'static str, Responder>,
    failures: DashMap<&'static str, String>,
    /// schema → 已收到的提示词（按调用顺序）
    prompts: DashMap<&'static str, Vec<String>>,
    delay_ms: AtomicU64,
}

impl FakeTextGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// 用自定义响应替换某个 schema 的默认输出
    pub fn respond_with<F>(&self, schema_name: &'static str, responder: F)
    where
        F: Fn(&GenerationRequest) -> Value + Send + Sync + 'static,
    {
        self.failures.remove(schema_name);
        self.responders.insert(schema_name, Arc::new(responder));
    }

    /// 让某个 schema 的调用返回服务错误
    pub fn fail_with(&self, schema_name: &'static str, message: impl Into<String>) {
        self.failures.insert(schema_name, message.into());
    }

    /// 每次调用前的模拟延迟
    pub fn set_delay(&self, delay: Duration) {
        self.delay_ms.store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn prompts_for(&self, schema_name: &str) -> Vec<String> {
        self.prompts
            .get(schema_name)
            .map(|p| p.clone())
            .unwrap_or_default()
    }

    fn record(&self, request: &GenerationRequest) -> usize {
        let mut prompts = self.prompts.entry(request.schema_name).or_default();
        prompts.push(request.prompt.clone());
        prompts.len()
    }
}

fn numbered(first: &str, prefix: &str, n: usize) -> String {
    if n == 1 {
        first.to_string()
    } else {
        format!("{} {}", prefix, n)
    }
}

/// 各 schema 的默认输出；n 为该 schema 的调用序号（1 起）
fn default_output(schema_name: &str, n: usize) -> Value {
    match schema_name {
        "story" => json!({
            "title": "The Salt Market Ledger",
            "premise": "A harbor clerk finds a ledger that records debts before they are made.",
            "genre": "literary mystery",
            "tone": "bittersweet",
            "parts": [
                { "name": "Arrival", "word_share": 0.25 },
                { "name": "Reckoning", "word_share": 0.5 },
                { "name": "Departure", "word_share": 0.25 }
            ]
        }),
        "part" => json!({
            "title": format!("Part Draft {}", n),
            "goal": "Find who wrote the ledger.",
            "conflict": "The harbor guild wants it burned.",
            "outcome": "The ledger changes hands.",
            "summary": "Mara follows the ink to the guild hall."
        }),
        "chapter" => json!({
            "title": format!("Tidewater {}", n),
            "summary": "Mara reads an entry dated tomorrow.",
            "pov_character": FAKE_CHARACTER_NAME,
            "act": {
                "setup": "The ledger arrives.",
                "confrontation": "The guild demands it back.",
                "resolution": "Mara hides it under the pier."
            }
        }),
        "scene_summary" => json!({
            "title": format!("Pier Scene {}", n),
            "summary": "Mara meets the courier at dawn.",
            "cycle_phase": "setup",
            "time": "dawn",
            "place": "the north pier",
            "pov": FAKE_CHARACTER_NAME,
            "setting": FAKE_SETTING_NAME,
            "characters": [FAKE_CHARACTER_NAME],
            "goal": "Receive the ledger.",
            "obstacle": "The courier is late.",
            "outcome": "The ledger is wet but whole.",
            "beats": [
                { "description": "Fog rolls over the pier.", "shot": "establishing" },
                { "description": "Mara checks the bell tower clock.", "shot": "close_up" }
            ]
        }),
        "character" => json!({
            "name": numbered(FAKE_CHARACTER_NAME, "Courier", n),
            "role": "protagonist",
            "summary": "A harbor clerk who trusts numbers more than people.",
            "physical": {
                "age": "thirties",
                "build": "wiry",
                "hair": "cropped black hair",
                "eyes": "grey eyes",
                "skin": "weathered",
                "attire": "oilskin coat",
                "distinguishing_features": ["ink-stained fingers"]
            },
            "voice": "clipped and dry"
        }),
        "setting" => json!({
            "name": numbered(FAKE_SETTING_NAME, "Warehouse", n),
            "description": "A covered market that smells of brine and tar.",
            "sensory": {
                "sight": "lanterns on wet stone",
                "sound": "gulls and haggling",
                "smell": "brine and tar",
                "touch": "slick planks",
                "taste": "salt on the air"
            }
        }),
        "scene_content" => json!({
            "content": "Fog rolled over the pier and the bell rang twice.\n\n\"You're late,\" Mara said.\n\nThe courier handed her the ledger. It smelled of salt."
        }),
        "critic" => json!({
            "scores": { "plot": 3.5, "character": 4, "pacing": 3, "prose": 4, "world_building": 3.5 },
            "feedback": { "pacing": "The middle drags." }
        }),
        _ => json!({}),
    }
}

#[async_trait]
impl TextGeneratorPort for FakeTextGenerator {
    async fn generate(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationResponse, GenerationError> {
        let n = self.record(&request);

        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        if let Some(message) = self.failures.get(request.schema_name) {
            return Err(GenerationError::ServiceError(message.clone()));
        }

        // 先克隆出 responder，避免调用期间持有分片锁
        let responder = self.responders.get(request.schema_name).map(|r| r.clone());
        let value = match responder {
            Some(responder) => responder(&request),
            None => default_output(request.schema_name, n),
        };
        let output = value.to_string();

        tracing::debug!(
            schema = request.schema_name,
            call = n,
            "FakeTextGenerator: returning canned output"
        );

        Ok(GenerationResponse {
            tokens_used: output.split_whitespace().count() as u32,
            output,
            parsed_output: Some(value),
            model: "fake-generator".to_string(),
            finish_reason: "stop".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_default_outputs_are_numbered() {
        let fake = FakeTextGenerator::new();
        let first = fake
            .generate(GenerationRequest::new("one", "chapter", json!({})))
            .await
            .unwrap();
        let second = fake
            .generate(GenerationRequest::new("two", "chapter", json!({})))
            .await
            .unwrap();
        assert_eq!(first.parsed_output.unwrap()["title"], "Tidewater 1");
        assert_eq!(second.parsed_output.unwrap()["title"], "Tidewater 2");
        assert_eq!(fake.prompts_for("chapter"), vec!["one", "two"]);
        assert!(fake.prompts_for("part").is_empty());
    }

    #[tokio::test]
    async fn test_custom_responder_and_failure() {
        let fake = FakeTextGenerator::new();
        fake.respond_with("part", |req| json!({ "echo": req.prompt }));
        let resp = fake
            .generate(GenerationRequest::new("hello", "part", json!({})))
            .await
            .unwrap();
        assert_eq!(resp.parsed_output.unwrap()["echo"], "hello");

        fake.fail_with("part", "overloaded");
        let err = fake
            .generate(GenerationRequest::new("again", "part", json!({})))
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::ServiceError(_)));
    }
}
