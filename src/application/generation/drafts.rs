//! 结构化生成草稿
//!
//! 每种草稿对应一个 JSON Schema。草稿没有序号字段，
//! 模型输出中的多余字段被忽略，序号只由编排器计算。

use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;

use crate::application::ports::{PhysicalAttributes, SensoryPalette};
use crate::domain::evaluation::{Category, CategoryNote, CategoryTable, Judgment};
use crate::domain::format_text;
use crate::domain::story::{CyclePhase, PartPlan, ShotType, StoryStructure, Tone};
use crate::domain::text_metrics::CategoricalTag;

/// 草稿结构错误
#[derive(Debug, Error, PartialEq)]
pub enum SchemaError {
    #[error("malformed output: {0}")]
    Malformed(String),

    #[error("field '{0}' must not be empty")]
    EmptyField(&'static str),

    #[error("invalid value for '{field}': {message}")]
    InvalidValue {
        field: &'static str,
        message: String,
    },
}

fn require(field: &'static str, value: &str) -> Result<(), SchemaError> {
    if value.trim().is_empty() {
        return Err(SchemaError::EmptyField(field));
    }
    Ok(())
}

/// 可由生成服务产出的草稿
pub trait Draft: for<'de> Deserialize<'de> + Sized {
    const SCHEMA_NAME: &'static str;

    fn schema() -> Value;

    /// 严格校验（反序列化之后）
    fn validate(&self) -> Result<(), SchemaError>;

    /// 对自由文本字段做格式规范化
    fn normalize(&mut self) {}
}

/// 依次规范化多个自由文本字段
fn format_fields<const N: usize>(fields: [&mut String; N]) {
    for field in fields {
        *field = format_text(field);
    }
}

fn string_props(fields: &[&str]) -> serde_json::Map<String, Value> {
    fields
        .iter()
        .map(|f| (f.to_string(), json!({ "type": "string" })))
        .collect()
}

// ============================================================================
// Story
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct PartPlanDraft {
    pub name: String,
    pub word_share: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoryDraft {
    pub title: String,
    pub premise: String,
    pub genre: String,
    pub tone: String,
    #[serde(default)]
    pub parts: Vec<PartPlanDraft>,
}

impl StoryDraft {
    pub fn tone(&self) -> Option<Tone> {
        Tone::from_str(self.tone.trim())
    }

    pub fn structure(&self) -> StoryStructure {
        StoryStructure {
            parts: self
                .parts
                .iter()
                .map(|p| PartPlan {
                    name: p.name.trim().to_string(),
                    word_share: p.word_share,
                })
                .collect(),
        }
    }
}

impl Draft for StoryDraft {
    const SCHEMA_NAME: &'static str = "story";

    fn schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "title": { "type": "string" },
                "premise": { "type": "string" },
                "genre": { "type": "string" },
                "tone": { "type": "string", "enum": ["hopeful", "dark", "bittersweet", "satirical"] },
                "parts": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "name": { "type": "string" },
                            "word_share": { "type": "number" }
                        },
                        "required": ["name", "word_share"]
                    }
                }
            },
            "required": ["title", "premise", "genre", "tone", "parts"]
        })
    }

    fn validate(&self) -> Result<(), SchemaError> {
        require("title", &self.title)?;
        require("premise", &self.premise)?;
        require("genre", &self.genre)?;
        if self.tone().is_none() {
            return Err(SchemaError::InvalidValue {
                field: "tone",
                message: format!("unknown tone '{}'", self.tone),
            });
        }
        self.structure()
            .validate()
            .map_err(|e| SchemaError::InvalidValue {
                field: "parts",
                message: e.to_string(),
            })
    }

    fn normalize(&mut self) {
        self.premise = format_text(&self.premise);
    }
}

// ============================================================================
// Part
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct PartDraft {
    pub title: String,
    pub goal: String,
    pub conflict: String,
    pub outcome: String,
    pub summary: String,
}

impl Draft for PartDraft {
    const SCHEMA_NAME: &'static str = "part";

    fn schema() -> Value {
        let fields = ["title", "goal", "conflict", "outcome", "summary"];
        json!({
            "type": "object",
            "properties": string_props(&fields),
            "required": fields,
        })
    }

    fn validate(&self) -> Result<(), SchemaError> {
        require("title", &self.title)?;
        require("goal", &self.goal)?;
        require("conflict", &self.conflict)?;
        require("outcome", &self.outcome)?;
        require("summary", &self.summary)
    }

    fn normalize(&mut self) {
        format_fields([
            &mut self.goal,
            &mut self.conflict,
            &mut self.outcome,
            &mut self.summary,
        ]);
    }
}

// ============================================================================
// Chapter
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct ActDraft {
    pub setup: String,
    pub confrontation: String,
    pub resolution: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChapterDraft {
    pub title: String,
    pub summary: String,
    pub pov_character: String,
    pub act: ActDraft,
}

impl Draft for ChapterDraft {
    const SCHEMA_NAME: &'static str = "chapter";

    fn schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "title": { "type": "string" },
                "summary": { "type": "string" },
                "pov_character": { "type": "string" },
                "act": {
                    "type": "object",
                    "properties": string_props(&["setup", "confrontation", "resolution"]),
                    "required": ["setup", "confrontation", "resolution"]
                }
            },
            "required": ["title", "summary", "pov_character", "act"]
        })
    }

    fn validate(&self) -> Result<(), SchemaError> {
        require("title", &self.title)?;
        require("summary", &self.summary)?;
        require("pov_character", &self.pov_character)?;
        require("act.setup", &self.act.setup)?;
        require("act.confrontation", &self.act.confrontation)?;
        require("act.resolution", &self.act.resolution)
    }

    fn normalize(&mut self) {
        format_fields([
            &mut self.summary,
            &mut self.act.setup,
            &mut self.act.confrontation,
            &mut self.act.resolution,
        ]);
    }
}

// ============================================================================
// Scene Summary
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct BeatDraft {
    pub description: String,
    #[serde(default)]
    pub shot: Option<String>,
}

impl BeatDraft {
    pub fn shot_type(&self) -> Result<Option<ShotType>, SchemaError> {
        match self.shot.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            None => Ok(None),
            Some(s) => ShotType::ALL
                .iter()
                .copied()
                .find(|t| t.as_str() == s)
                .map(Some)
                .ok_or_else(|| SchemaError::InvalidValue {
                    field: "beats.shot",
                    message: format!("unknown shot type '{}'", s),
                }),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SceneSummaryDraft {
    pub title: String,
    pub summary: String,
    pub cycle_phase: String,
    pub time: String,
    pub place: String,
    pub pov: String,
    /// 场景地点名称（需匹配已有地点）
    #[serde(default)]
    pub setting: Option<String>,
    /// 出场角色名称（需匹配已有角色）
    pub characters: Vec<String>,
    pub goal: String,
    pub obstacle: String,
    pub outcome: String,
    #[serde(default)]
    pub beats: Vec<BeatDraft>,
}

impl SceneSummaryDraft {
    pub fn cycle_phase(&self) -> Option<CyclePhase> {
        CyclePhase::from_str(self.cycle_phase.trim())
    }
}

impl Draft for SceneSummaryDraft {
    const SCHEMA_NAME: &'static str = "scene_summary";

    fn schema() -> Value {
        let phases: Vec<&str> = CyclePhase::ALL.iter().map(|p| p.as_str()).collect();
        let shots: Vec<&str> = ShotType::ALL.iter().map(|s| s.as_str()).collect();
        json!({
            "type": "object",
            "properties": {
                "title": { "type": "string" },
                "summary": { "type": "string" },
                "cycle_phase": { "type": "string", "enum": phases },
                "time": { "type": "string" },
                "place": { "type": "string" },
                "pov": { "type": "string" },
                "setting": { "type": "string" },
                "characters": { "type": "array", "items": { "type": "string" }, "minItems": 1 },
                "goal": { "type": "string" },
                "obstacle": { "type": "string" },
                "outcome": { "type": "string" },
                "beats": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "description": { "type": "string" },
                            "shot": { "type": "string", "enum": shots }
                        },
                        "required": ["description"]
                    }
                }
            },
            "required": [
                "title", "summary", "cycle_phase", "time", "place", "pov",
                "characters", "goal", "obstacle", "outcome", "beats"
            ]
        })
    }

    fn validate(&self) -> Result<(), SchemaError> {
        require("title", &self.title)?;
        require("summary", &self.summary)?;
        require("pov", &self.pov)?;
        if self.cycle_phase().is_none() {
            return Err(SchemaError::InvalidValue {
                field: "cycle_phase",
                message: format!("unknown cycle phase '{}'", self.cycle_phase),
            });
        }
        if self.characters.iter().all(|c| c.trim().is_empty()) {
            return Err(SchemaError::EmptyField("characters"));
        }
        for beat in &self.beats {
            require("beats.description", &beat.description)?;
            beat.shot_type()?;
        }
        Ok(())
    }

    fn normalize(&mut self) {
        format_fields([
            &mut self.summary,
            &mut self.goal,
            &mut self.obstacle,
            &mut self.outcome,
        ]);
        for beat in &mut self.beats {
            beat.description = format_text(&beat.description);
        }
    }
}

// ============================================================================
// Character / Setting
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct CharacterDraft {
    pub name: String,
    pub role: String,
    pub summary: String,
    #[serde(default)]
    pub physical: PhysicalAttributes,
    #[serde(default)]
    pub voice: String,
}

impl Draft for CharacterDraft {
    const SCHEMA_NAME: &'static str = "character";

    fn schema() -> Value {
        let mut physical = string_props(&["age", "build", "hair", "eyes", "skin", "attire"]);
        physical.insert(
            "distinguishing_features".to_string(),
            json!({ "type": "array", "items": { "type": "string" } }),
        );
        json!({
            "type": "object",
            "properties": {
                "name": { "type": "string" },
                "role": { "type": "string" },
                "summary": { "type": "string" },
                "physical": { "type": "object", "properties": physical },
                "voice": { "type": "string" }
            },
            "required": ["name", "role", "summary", "physical", "voice"]
        })
    }

    fn validate(&self) -> Result<(), SchemaError> {
        require("name", &self.name)?;
        require("role", &self.role)?;
        require("summary", &self.summary)
    }

    fn normalize(&mut self) {
        format_fields([&mut self.summary, &mut self.voice]);
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SettingDraft {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub sensory: SensoryPalette,
}

impl Draft for SettingDraft {
    const SCHEMA_NAME: &'static str = "setting";

    fn schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "name": { "type": "string" },
                "description": { "type": "string" },
                "sensory": {
                    "type": "object",
                    "properties": string_props(&["sight", "sound", "smell", "touch", "taste"])
                }
            },
            "required": ["name", "description", "sensory"]
        })
    }

    fn validate(&self) -> Result<(), SchemaError> {
        require("name", &self.name)?;
        require("description", &self.description)
    }

    fn normalize(&mut self) {
        let s = &mut self.sensory;
        format_fields([
            &mut self.description,
            &mut s.sight,
            &mut s.sound,
            &mut s.smell,
            &mut s.touch,
            &mut s.taste,
        ]);
    }
}

// ============================================================================
// Scene Content
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct SceneContentDraft {
    pub content: String,
}

impl Draft for SceneContentDraft {
    const SCHEMA_NAME: &'static str = "scene_content";

    fn schema() -> Value {
        json!({
            "type": "object",
            "properties": { "content": { "type": "string" } },
            "required": ["content"]
        })
    }

    fn validate(&self) -> Result<(), SchemaError> {
        require("content", &self.content)
    }

    fn normalize(&mut self) {
        self.content = format_text(&self.content);
    }
}

// ============================================================================
// Critic
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct CriticScores {
    pub plot: f64,
    pub character: f64,
    pub pacing: f64,
    pub prose: f64,
    pub world_building: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CriticDraft {
    pub scores: CriticScores,
    /// 维度名 → 意见
    #[serde(default)]
    pub feedback: std::collections::BTreeMap<String, String>,
}

impl CriticDraft {
    pub fn into_judgment(self) -> Judgment {
        let notes = self
            .feedback
            .into_iter()
            .filter_map(|(k, note)| {
                Category::from_str(k.trim()).map(|category| CategoryNote { category, note })
            })
            .collect();
        Judgment {
            scores: CategoryTable {
                plot: self.scores.plot,
                character: self.scores.character,
                pacing: self.scores.pacing,
                prose: self.scores.prose,
                world_building: self.scores.world_building,
            },
            notes,
        }
    }
}

impl Draft for CriticDraft {
    const SCHEMA_NAME: &'static str = "critic";

    fn schema() -> Value {
        let score = json!({ "type": "number", "minimum": 1, "maximum": 5 });
        let categories: Vec<&str> = Category::ALL.iter().map(|c| c.as_str()).collect();
        let scores: serde_json::Map<String, Value> = categories
            .iter()
            .map(|c| (c.to_string(), score.clone()))
            .collect();
        json!({
            "type": "object",
            "properties": {
                "scores": { "type": "object", "properties": scores, "required": categories },
                "feedback": { "type": "object", "additionalProperties": { "type": "string" } }
            },
            "required": ["scores"]
        })
    }

    fn validate(&self) -> Result<(), SchemaError> {
        let s = &self.scores;
        for (field, value) in [
            ("scores.plot", s.plot),
            ("scores.character", s.character),
            ("scores.pacing", s.pacing),
            ("scores.prose", s.prose),
            ("scores.world_building", s.world_building),
        ] {
            if !(1.0..=5.0).contains(&value) {
                return Err(SchemaError::InvalidValue {
                    field,
                    message: format!("score {} outside 1..=5", value),
                });
            }
        }
        Ok(())
    }
}
