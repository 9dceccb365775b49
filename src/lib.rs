//! Fictures - 分层故事生成与评估管线
//!
//! 架构设计: DDD + CQRS + Hexagonal Architecture
//!
//! 领域层 (domain/):
//! - Story Context: 故事层级、状态、结构与场景元素
//! - Evaluation Context: 自动指标、评分表与评估报告
//! - Text Metrics / Formatter: 纯文本度量与正文规范化
//!
//! 应用层 (application/):
//! - Ports: 端口定义（TextGenerator, Repositories, Caches）
//! - Generation: 上下文组装、提示词、结构化调用、排序锁
//! - Commands: CQRS 命令处理器
//! - Queries: CQRS 查询处理器
//!
//! 基础设施层 (infrastructure/):
//! - HTTP: RESTful API
//! - Memory: 故事视图缓存、角色外观缓存
//! - Persistence: SQLite 存储
//! - Adapters: 文本生成服务客户端

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::{load_config, AppConfig};
