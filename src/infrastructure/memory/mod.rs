//! Memory Layer - In-Memory Caches
//!
//! 故事视图缓存（兼缓存失效目标）与角色外观缓存

mod character_visual_cache;
mod story_view_cache;

pub use character_visual_cache::{build_fragment, InMemoryCharacterVisualCache};
pub use story_view_cache::InMemoryStoryViewCache;
