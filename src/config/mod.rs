use std::env;
use std::time::Duration;

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    pub database_url: String,
    pub session_secret: String,
    pub session_expiration_secs: u64,
    pub spotify_client_id: String,
    pub spotify_client_secret: String,
    pub spotify_redirect_uri: String,
    pub frontend_url: String,
    pub allowed_origins: Vec<String>,
    pub api_base_uri: String,
    pub upload_dir: String,
    pub rate_limit_window_secs: u64,
    pub rate_limit_requests: u32,
    pub search_cache_ttl_secs: u64,
    pub album_cache_ttl_secs: u64,
    pub cache_max_entries: usize,
    pub server_host: String,
    pub server_port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self, env::VarError> {
        dotenv::dotenv().ok();

        // 会话有效期按天配置，默认7天
        let session_expiration_days = env::var("SESSION_EXPIRATION")
            .unwrap_or_default()
            .trim_end_matches('d')
            .parse::<u64>()
            .unwrap_or(7);

        let allowed_origins = env::var("ALLOWED_ORIGINS")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Config {
            database_url: env::var("DATABASE_URL")?,
            session_secret: env::var("SESSION_SECRET")?,
            session_expiration_secs: session_expiration_days * 86400,
            spotify_client_id: env::var("SPOTIFY_CLIENT_ID")?,
            spotify_client_secret: env::var("SPOTIFY_CLIENT_SECRET")?,
            spotify_redirect_uri: env::var("SPOTIFY_REDIRECT_URI")?,
            frontend_url: env::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:5173".into()),
            allowed_origins,
            api_base_uri: env::var("API_BASE_URI").unwrap_or_else(|_| "/api".into()),
            upload_dir: env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads".into()),
            rate_limit_window_secs: env::var("RATE_LIMIT_WINDOW")
                .unwrap_or_default()
                .parse()
                .unwrap_or(60),
            rate_limit_requests: env::var("RATE_LIMIT_REQUESTS")
                .unwrap_or_default()
                .parse()
                .unwrap_or(60),
            search_cache_ttl_secs: env::var("SEARCH_CACHE_TTL")
                .unwrap_or_default()
                .parse()
                .unwrap_or(60),
            album_cache_ttl_secs: env::var("ALBUM_CACHE_TTL")
                .unwrap_or_default()
                .parse()
                .unwrap_or(300),
            cache_max_entries: env::var("CACHE_MAX_ENTRIES")
                .unwrap_or_default()
                .parse()
                .unwrap_or(500),
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "::".into()),
            server_port: env::var("SERVER_PORT")
                .unwrap_or_default()
                .parse()
                .unwrap_or(3000),
        })
    }

    pub fn session_expiration(&self) -> Duration {
        Duration::from_secs(self.session_expiration_secs)
    }

    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window_secs)
    }
}
