use std::error::Error;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{error, info};

use market_hub::{
    app::{self, AppState},
    core::config::{load_config, Config, StoreBackend},
    infrastructure::{
        logger::Logger,
        store::{seed::seed_demo_catalog, MemoryStore, SharedStore},
    },
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let (config, source) = load_config()?;
    Logger::init(&config.logging.level);
    source.log();

    info!("启动 market hub 服务...");

    let store = build_store(&config).await.map_err(|e| {
        error!("记录存储初始化失败: {}", e);
        e
    })?;

    let app = app::router(AppState::new(store), config.http.timeout());

    let listener = TcpListener::bind(config.http.bind_target()).await?;
    let addr = listener.local_addr()?;

    info!("🚀 服务运行在 http://{}", addr);
    info!("📖 可用端点:");
    info!("   GET  /products                - 产品列表 (?search=&category=&sort=votes|recent|funding)");
    info!("   POST /products/:id/vote       - 投票 / 撤销 / 改票");
    info!("   POST /products/:id/pledges    - 认捐");
    info!("   GET  /products/:id/funding    - 筹款进度");
    info!("   GET  /products/:id/ratings    - 评分分布");
    info!("💡 登录用户通过 x-actor-id 请求头识别");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("服务已停止");
    Ok(())
}

async fn build_store(config: &Config) -> Result<SharedStore, Box<dyn Error>> {
    let store: SharedStore = match config.store.backend {
        StoreBackend::Memory => {
            info!("使用内存记录存储");
            Arc::new(MemoryStore::new())
        }
        StoreBackend::Postgres => postgres_store(config).await?,
    };

    if config.store.seed_demo_data && store.list_products().await?.is_empty() {
        seed_demo_catalog(store.as_ref()).await?;
    }

    Ok(store)
}

#[cfg(feature = "database")]
async fn postgres_store(config: &Config) -> Result<SharedStore, Box<dyn Error>> {
    use market_hub::infrastructure::{database::DatabaseManager, store::PgRecordStore};

    let url = config
        .database
        .url
        .as_deref()
        .ok_or("postgres 存储需要配置 database.url")?;
    let manager = DatabaseManager::new(url, &config.database).await?;
    manager.migrate().await?;

    Ok(Arc::new(PgRecordStore::new(manager.get_pool().clone())))
}

#[cfg(not(feature = "database"))]
async fn postgres_store(_config: &Config) -> Result<SharedStore, Box<dyn Error>> {
    Err("未启用 database 特性，无法使用 postgres 存储".into())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("无法监听 Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
        info!("收到 Ctrl+C，正在关闭");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("收到终止信号，正在关闭");
            }
            Err(e) => {
                error!("无法监听终止信号: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
