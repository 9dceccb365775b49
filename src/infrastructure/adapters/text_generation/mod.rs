//! Text Generation Adapter - 结构化生成服务客户端

mod fake_text_generator;
mod http_text_generator;

pub use fake_text_generator::{FakeTextGenerator, FAKE_CHARACTER_NAME, FAKE_SETTING_NAME};
pub use http_text_generator::*;
