use std::sync::Arc;

use config::Config;
use sqlx::PgPool;

use cache::TtlCache;
use spotify::SpotifyClient;

pub mod cache;
pub mod config;
pub mod middleware;
pub mod router;
pub mod spotify;
pub mod utils;

pub mod routes;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub spotify: SpotifyClient,
    pub search_cache: Arc<TtlCache>,
    pub album_cache: Arc<TtlCache>,
}
