//! SQLite Persistence - SQLite 数据库持久化实现

mod cast_repo;
mod database;
mod evaluation_repo;
mod story_repo;

pub use cast_repo::*;
pub use database::{create_pool, run_migrations, DatabaseConfig, DbPool};
pub use evaluation_repo::*;
pub use story_repo::*;
