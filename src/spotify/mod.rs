use std::sync::{Arc, Mutex};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sqlx::PgPool;

use crate::config::Config;
use crate::utils::{Claims, error_codes, error_to_api_response};

mod auth;
pub mod model;

pub use auth::CachedAppToken;
use model::{AlbumDetail, AlbumSummary, AlbumsResponse, RawAlbumDetail, SearchResponse, SpotifyProfile};

pub const SPOTIFY_AUTHORIZE_URL: &str = "https://accounts.spotify.com/authorize";
pub const SPOTIFY_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
pub const SPOTIFY_API_BASE: &str = "https://api.spotify.com/v1";

#[derive(Debug)]
pub enum SpotifyError {
    /// 用户没有已存储的refresh token，无法换取用户级访问令牌
    MissingRefreshToken,
    /// 上游返回非2xx
    Upstream(u16),
    Http(reqwest::Error),
    Db(sqlx::Error),
}

impl From<reqwest::Error> for SpotifyError {
    fn from(e: reqwest::Error) -> Self {
        SpotifyError::Http(e)
    }
}

impl From<sqlx::Error> for SpotifyError {
    fn from(e: sqlx::Error) -> Self {
        SpotifyError::Db(e)
    }
}

impl IntoResponse for SpotifyError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            SpotifyError::Db(e) => {
                tracing::error!("Database error during Spotify call: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    error_codes::INTERNAL_ERROR,
                    "内部服务器错误",
                )
            }
            // 解析器已把这种情况降级为应用令牌，走到这里属于内部错误
            SpotifyError::MissingRefreshToken => (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_codes::INTERNAL_ERROR,
                "内部服务器错误",
            ),
            SpotifyError::Upstream(upstream_status) => {
                tracing::error!(status = *upstream_status, "Spotify returned an error status");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    error_codes::UPSTREAM_ERROR,
                    "上游服务暂不可用",
                )
            }
            SpotifyError::Http(e) => {
                tracing::error!("Spotify request failed: {:?}", e);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    error_codes::UPSTREAM_ERROR,
                    "上游服务暂不可用",
                )
            }
        };

        (status, error_to_api_response(code, message.to_string())).into_response()
    }
}

/// 单次请求解析出的访问上下文：携带的令牌 + 缓存命名空间
pub struct AccessContext {
    pub token: String,
    pub namespace: String,
}

#[derive(Clone)]
pub struct SpotifyClient {
    http: reqwest::Client,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    app_token: Arc<Mutex<Option<CachedAppToken>>>,
}

impl SpotifyClient {
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            client_id: config.spotify_client_id.clone(),
            client_secret: config.spotify_client_secret.clone(),
            redirect_uri: config.spotify_redirect_uri.clone(),
            app_token: Arc::new(Mutex::new(None)),
        }
    }

    /// 解析访问上下文：有会话时优先用户令牌，没有refresh token则
    /// 静默退回应用令牌；其他上游失败照常冒泡。
    pub async fn resolve_access_context(
        &self,
        pool: &PgPool,
        claims: Option<&Claims>,
    ) -> Result<AccessContext, SpotifyError> {
        if let Some(claims) = claims {
            match self.user_token(pool, &claims.sub).await {
                Ok(token) => {
                    return Ok(AccessContext {
                        token,
                        namespace: format!("user:{}", claims.sub),
                    });
                }
                Err(SpotifyError::MissingRefreshToken) => {
                    tracing::debug!(
                        user_id = %claims.sub,
                        "No stored refresh token, falling back to app token"
                    );
                }
                Err(e) => return Err(e),
            }
        }

        let token = self.app_token().await?;
        Ok(AccessContext {
            token,
            namespace: "app".to_string(),
        })
    }

    pub async fn search_albums(
        &self,
        token: &str,
        query: &str,
        limit: u32,
    ) -> Result<Vec<AlbumSummary>, SpotifyError> {
        let url = format!("{}/search", SPOTIFY_API_BASE);
        let limit = limit.to_string();
        let res = self
            .http
            .get(&url)
            .bearer_auth(token)
            .query(&[("q", query), ("type", "album"), ("limit", limit.as_str())])
            .send()
            .await?;

        if !res.status().is_success() {
            return Err(SpotifyError::Upstream(res.status().as_u16()));
        }

        let body: SearchResponse = res.json().await?;
        Ok(body.albums.items.into_iter().map(AlbumSummary::from).collect())
    }

    /// 按ID取专辑详情，上游404返回None
    pub async fn album(&self, token: &str, album_id: &str) -> Result<Option<AlbumDetail>, SpotifyError> {
        let url = format!("{}/albums/{}", SPOTIFY_API_BASE, album_id);
        let res = self.http.get(&url).bearer_auth(token).send().await?;

        if res.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !res.status().is_success() {
            return Err(SpotifyError::Upstream(res.status().as_u16()));
        }

        let body: RawAlbumDetail = res.json().await?;
        Ok(Some(AlbumDetail::from(body)))
    }

    pub async fn albums(&self, token: &str, album_ids: &[String]) -> Result<Vec<AlbumSummary>, SpotifyError> {
        let url = format!("{}/albums", SPOTIFY_API_BASE);
        let res = self
            .http
            .get(&url)
            .bearer_auth(token)
            .query(&[("ids", album_ids.join(","))])
            .send()
            .await?;

        if !res.status().is_success() {
            return Err(SpotifyError::Upstream(res.status().as_u16()));
        }

        let body: AlbumsResponse = res.json().await?;
        Ok(body
            .albums
            .into_iter()
            .flatten()
            .map(AlbumSummary::from)
            .collect())
    }

    /// 用用户访问令牌拉取Spotify个人资料（登录回调时用）
    pub async fn profile(&self, token: &str) -> Result<SpotifyProfile, SpotifyError> {
        let url = format!("{}/me", SPOTIFY_API_BASE);
        let res = self.http.get(&url).bearer_auth(token).send().await?;

        if !res.status().is_success() {
            return Err(SpotifyError::Upstream(res.status().as_u16()));
        }

        Ok(res.json().await?)
    }
}
