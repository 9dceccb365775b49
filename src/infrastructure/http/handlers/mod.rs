//! HTTP Handlers

mod evaluation;
mod generation;
mod image;
mod ping;
mod scene;
mod story;

pub use evaluation::*;
pub use generation::*;
pub use image::*;
pub use ping::*;
pub use scene::*;
pub use story::*;
