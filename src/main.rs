use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use jukebox_backend::{
    AppState, cache::TtlCache, config::Config, router::build_router, spotify::SpotifyClient,
};
use sqlx::Executor;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // 初始化日志
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 加载配置
    let config = Config::from_env().expect("Failed to load configuration");

    // 设置数据库连接池
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                conn.execute("SET application_name = 'jukebox_backend';")
                    .await?;
                Ok(())
            })
        })
        .connect(&config.database_url)
        .await
        .expect("Failed to connect to Postgres");

    // 两个独立缓存：搜索结果60秒，专辑详情5分钟
    let search_cache = Arc::new(TtlCache::new(
        "search",
        config.search_cache_ttl_secs,
        config.cache_max_entries,
    ));
    let album_cache = Arc::new(TtlCache::new(
        "album",
        config.album_cache_ttl_secs,
        config.cache_max_entries,
    ));

    let spotify = SpotifyClient::new(&config);

    let state = AppState {
        pool,
        config: config.clone(),
        spotify,
        search_cache,
        album_cache,
    };

    let app = build_router(state);

    // 启动服务器
    let addr = SocketAddr::new(
        config.server_host.parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid server_host, falling back to dual-stack default");
            IpAddr::V6(std::net::Ipv6Addr::UNSPECIFIED)
        }),
        config.server_port,
    );
    tracing::info!("Server listening on {}", addr);
    axum::serve(
        tokio::net::TcpListener::bind(&addr)
            .await
            .expect("Failed to bind"),
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Failed to start server");
}
