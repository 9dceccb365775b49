//! Fictures - 分层故事生成与评估服务
//!
//! - Domain: story/, evaluation/, text_metrics, formatter
//! - Application: commands, queries, ports, generation
//! - Infrastructure: http, memory, persistence, adapters

use std::sync::Arc;

use fictures::application::TextGeneratorPort;
use fictures::config::{load_config, print_config, LogConfig};
use fictures::infrastructure::adapters::{FakeTextGenerator, HttpTextGenerator};
use fictures::infrastructure::http::{AppState, HttpServer, ServerConfig, StatePorts};
use fictures::infrastructure::memory::{InMemoryCharacterVisualCache, InMemoryStoryViewCache};
use fictures::infrastructure::persistence::sqlite::{
    create_pool, run_migrations, DatabaseConfig, SqliteCastRepository, SqliteEvaluationRepository,
    SqliteStoryRepository,
};
use tracing_subscriber::EnvFilter;

fn init_tracing(log: &LogConfig) {
    let log_filter = format!("{},fictures={},tower_http=debug", log.level, log.level);
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_filter));

    if log.json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 加载配置（优先级：环境变量 > 配置文件 > 默认值）
    let config = load_config().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

    init_tracing(&config.log);
    tracing::info!("Fictures - story generation service");
    print_config(&config);

    // 确保数据目录存在
    if let Some(parent) = std::path::Path::new(&config.database.path).parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    // 初始化数据库
    let db_config = DatabaseConfig {
        database_url: config.database.database_url(),
        max_connections: config.database.max_connections,
    };
    let pool = create_pool(&db_config).await?;
    run_migrations(&pool).await?;

    // 创建生成服务客户端
    let generator: Arc<dyn TextGeneratorPort> = if config.generation.fake {
        tracing::warn!("Using the built-in fake generator; output is canned");
        Arc::new(FakeTextGenerator::new())
    } else {
        let client = HttpTextGenerator::new(config.generation.client_config())?;
        if !client.health_check().await {
            tracing::warn!(url = %config.generation.url, "Generation service is not reachable yet");
        }
        Arc::new(client)
    };

    // 缓存：故事视图缓存同时接收写入后的失效通知
    let view_cache = Arc::new(InMemoryStoryViewCache::new());
    let ports = StatePorts {
        story_repo: Arc::new(SqliteStoryRepository::new(pool.clone())),
        cast_repo: Arc::new(SqliteCastRepository::new(pool.clone())),
        evaluation_repo: Arc::new(SqliteEvaluationRepository::new(pool)),
        generator,
        view_cache: view_cache.clone(),
        invalidator: view_cache,
        visual_cache: Arc::new(InMemoryCharacterVisualCache::new()),
    };

    let state = AppState::new(
        ports,
        config.generation.settings(),
        config.evaluation.policy(),
        config.cache.policy(),
    );
    let server = HttpServer::new(
        ServerConfig::new(&config.server.host, config.server.port),
        state,
    );

    // 启动服务器（带优雅关闭）
    server
        .run_with_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for ctrl-c");
                return;
            }
            tracing::info!("Received shutdown signal");
        })
        .await?;

    tracing::info!("Server shutdown complete");

    Ok(())
}
