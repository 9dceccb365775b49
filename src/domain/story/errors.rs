//! Story Context - Errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoryError {
    #[error("故事状态不能从 {from} 变为 {to}")]
    StatusRegression {
        from: &'static str,
        to: &'static str,
    },

    #[error("无效的故事结构: {0}")]
    InvalidStructure(String),
}
