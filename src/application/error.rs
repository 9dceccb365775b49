//! 应用层错误定义
//!
//! 统一的命令/查询错误类型

use std::fmt;

use thiserror::Error;
use uuid::Uuid;

use crate::application::ports::{GenerationError, RepositoryError};
use crate::domain::story::{GenerationLevel, StoryError};

/// 出错产物的作用域（层级 / 故事 / 父级）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArtifactScope {
    pub level: &'static str,
    pub story_id: Uuid,
    pub parent_id: Option<Uuid>,
}

impl ArtifactScope {
    pub fn new(level: GenerationLevel, story_id: Uuid, parent_id: Option<Uuid>) -> Self {
        Self {
            level: level.as_str(),
            story_id,
            parent_id,
        }
    }

    /// 非生成层级的作用域（如场景正文、评审）
    pub fn labeled(level: &'static str, story_id: Uuid, parent_id: Option<Uuid>) -> Self {
        Self {
            level,
            story_id,
            parent_id,
        }
    }
}

impl fmt::Display for ArtifactScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "level={} story={}", self.level, self.story_id)?;
        if let Some(parent) = self.parent_id {
            write!(f, " parent={}", parent)?;
        }
        Ok(())
    }
}

fn scope_suffix(scope: &Option<ArtifactScope>) -> String {
    match scope {
        Some(scope) => format!(" ({})", scope),
        None => String::new(),
    }
}

/// 应用层错误
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// 上游产物缺失，无法组装上下文
    #[error("Context incomplete ({scope}): missing {}", .missing.join(", "))]
    ContextIncomplete {
        scope: ArtifactScope,
        missing: Vec<String>,
    },

    /// 生成结果不符合结构要求
    #[error("Generation schema error ({scope}): {message}")]
    GenerationSchema {
        scope: ArtifactScope,
        message: String,
    },

    /// 生成超时
    #[error("Generation timed out after {timeout_secs}s ({scope})")]
    GenerationTimeout {
        scope: ArtifactScope,
        timeout_secs: u64,
    },

    /// 生成服务或网络失败
    #[error("Generation failed ({scope}): {message}")]
    GenerationFailed {
        scope: ArtifactScope,
        message: String,
    },

    /// 重试后序号仍然冲突
    #[error("Ordinal conflict at index {ordinal_index} ({scope})")]
    OrdinalConflict {
        scope: ArtifactScope,
        ordinal_index: u32,
    },

    /// 调用方取消
    #[error("Generation cancelled ({scope})")]
    Cancelled { scope: ArtifactScope },

    /// 资源未找到
    #[error("{resource_type} not found: {id}")]
    NotFound {
        resource_type: &'static str,
        id: Uuid,
    },

    /// 验证错误
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// 状态无效
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// 持久化错误（生成路径上带作用域）
    #[error("Persistence error{}: {message}", scope_suffix(.scope))]
    Persistence {
        scope: Option<ArtifactScope>,
        message: String,
    },

    /// 内部错误
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl ApplicationError {
    /// 创建 NotFound 错误
    pub fn not_found(resource_type: &'static str, id: Uuid) -> Self {
        Self::NotFound { resource_type, id }
    }

    /// 创建验证错误
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError(message.into())
    }

    /// 创建状态无效错误
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState(message.into())
    }

    /// 创建内部错误
    pub fn internal(message: impl Into<String>) -> Self {
        Self::InternalError(message.into())
    }

    /// 创建结构错误
    pub fn schema(scope: ArtifactScope, message: impl Into<String>) -> Self {
        Self::GenerationSchema {
            scope,
            message: message.into(),
        }
    }

    /// 把持久化错误包装上作用域
    pub fn persistence(scope: ArtifactScope, err: RepositoryError) -> Self {
        Self::Persistence {
            scope: Some(scope),
            message: err.to_string(),
        }
    }

    /// 把生成服务错误包装上作用域
    pub fn from_generation(scope: ArtifactScope, err: GenerationError, timeout_secs: u64) -> Self {
        match err {
            GenerationError::Timeout => Self::GenerationTimeout {
                scope,
                timeout_secs,
            },
            GenerationError::InvalidResponse(message) => Self::GenerationSchema { scope, message },
            GenerationError::NetworkError(message) | GenerationError::ServiceError(message) => {
                Self::GenerationFailed { scope, message }
            }
        }
    }

    /// 调用方是否可以重试
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::GenerationSchema { .. }
                | Self::GenerationTimeout { .. }
                | Self::GenerationFailed { .. }
                | Self::OrdinalConflict { .. }
        )
    }

    /// 错误类别名（用于日志）
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ContextIncomplete { .. } => "context_incomplete",
            Self::GenerationSchema { .. } => "generation_schema",
            Self::GenerationTimeout { .. } => "generation_timeout",
            Self::GenerationFailed { .. } => "generation_failed",
            Self::OrdinalConflict { .. } => "ordinal_conflict",
            Self::Cancelled { .. } => "cancelled",
            Self::NotFound { .. } => "not_found",
            Self::ValidationError(_) => "validation",
            Self::InvalidState(_) => "invalid_state",
            Self::Persistence { .. } => "persistence",
            Self::InternalError(_) => "internal",
        }
    }
}

impl From<RepositoryError> for ApplicationError {
    fn from(err: RepositoryError) -> Self {
        Self::Persistence {
            scope: None,
            message: err.to_string(),
        }
    }
}

impl From<StoryError> for ApplicationError {
    fn from(err: StoryError) -> Self {
        match err {
            StoryError::StatusRegression { .. } => Self::InvalidState(err.to_string()),
            StoryError::InvalidStructure(_) => Self::ValidationError(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        let scope = ArtifactScope::new(GenerationLevel::Chapter, Uuid::nil(), None);
        assert!(ApplicationError::from_generation(scope, GenerationError::Timeout, 30).is_retryable());
        assert!(ApplicationError::schema(scope, "bad").is_retryable());
        assert!(!ApplicationError::ContextIncomplete {
            scope,
            missing: vec!["story".into()]
        }
        .is_retryable());
        assert!(!ApplicationError::from(RepositoryError::DatabaseError("disk".into())).is_retryable());
        assert!(!ApplicationError::Cancelled { scope }.is_retryable());
    }

    #[test]
    fn test_scope_in_message() {
        let parent = Uuid::new_v4();
        let scope = ArtifactScope::new(GenerationLevel::SceneSummary, Uuid::nil(), Some(parent));
        let err = ApplicationError::ContextIncomplete {
            scope,
            missing: vec!["character".into(), "setting".into()],
        };
        let message = err.to_string();
        assert!(message.contains("scene_summary"));
        assert!(message.contains(&parent.to_string()));
        assert!(message.contains("character, setting"));
    }

    #[test]
    fn test_persistence_error_carries_scope() {
        let parent = Uuid::new_v4();
        let scope = ArtifactScope::new(GenerationLevel::Chapter, Uuid::nil(), Some(parent));
        let err = ApplicationError::persistence(
            scope,
            RepositoryError::DatabaseError("disk I/O error".into()),
        );
        let message = err.to_string();
        assert!(message.contains("level=chapter"));
        assert!(message.contains(&Uuid::nil().to_string()));
        assert!(message.contains(&parent.to_string()));
        assert!(message.contains("disk I/O error"));

        let bare = ApplicationError::from(RepositoryError::DatabaseError("locked".into()));
        assert_eq!(bare.to_string(), "Persistence error: Database error: locked");
    }

    #[test]
    fn test_timeout_is_distinct_from_failure() {
        let scope = ArtifactScope::new(GenerationLevel::Part, Uuid::nil(), None);
        assert!(matches!(
            ApplicationError::from_generation(scope, GenerationError::Timeout, 5),
            ApplicationError::GenerationTimeout { timeout_secs: 5, .. }
        ));
        assert!(matches!(
            ApplicationError::from_generation(scope, GenerationError::NetworkError("x".into()), 5),
            ApplicationError::GenerationFailed { .. }
        ));
    }
}
