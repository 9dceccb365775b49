//! Query Handlers 实现
//!
//! 所有 QueryHandler 的具体实现

mod context_handlers;
mod image_handlers;
mod story_handlers;

pub use context_handlers::*;
pub use image_handlers::*;
pub use story_handlers::*;
