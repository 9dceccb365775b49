//! Command Handlers 实现
//!
//! 所有 CommandHandler 的具体实现

mod evaluation_handlers;
mod generation_handlers;
mod scene_handlers;
mod story_handlers;

pub use evaluation_handlers::*;
pub use generation_handlers::*;
pub use scene_handlers::*;
pub use story_handlers::*;
