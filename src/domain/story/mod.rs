//! Story Context - 故事限界上下文
//!
//! 职责:
//! - 故事基调、生命周期状态
//! - 场景循环阶段、镜头标签
//! - 生成层级与结构描述

mod errors;
mod value_objects;

pub use errors::StoryError;
pub use value_objects::{
    CyclePhase, GenerationLevel, PartPlan, ShotType, StoryStatus, StoryStructure, Tone,
};
