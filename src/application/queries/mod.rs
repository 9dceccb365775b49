//! 应用层 - 查询（读操作）
//!
//! CQRS 查询侧：处理所有读操作

mod context_queries;
mod image_queries;
mod story_queries;

pub mod handlers;

pub use context_queries::*;
pub use image_queries::*;
pub use story_queries::*;
