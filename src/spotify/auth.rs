// 令牌中介：refresh token换取用户令牌、client credentials应用令牌。
// 应用令牌进程内缓存，提前60秒刷新，避免拿到临期令牌后请求途中失效。

use chrono::Utc;
use sqlx::PgPool;

use super::model::TokenResponse;
use super::{SPOTIFY_AUTHORIZE_URL, SPOTIFY_TOKEN_URL, SpotifyClient, SpotifyError};

const APP_TOKEN_REFRESH_MARGIN_SECS: i64 = 60;

const OAUTH_SCOPES: &str = "user-read-private user-read-email";

#[derive(Debug, Clone)]
pub struct CachedAppToken {
    pub access_token: String,
    pub expires_at: i64,
}

impl CachedAppToken {
    /// 距过期不足60秒即视为不可用
    pub fn is_fresh(&self, now: i64) -> bool {
        now < self.expires_at - APP_TOKEN_REFRESH_MARGIN_SECS
    }
}

impl SpotifyClient {
    /// 构造Spotify授权页跳转地址
    pub fn authorize_url(&self, state: &str) -> String {
        let url = reqwest::Url::parse_with_params(
            SPOTIFY_AUTHORIZE_URL,
            &[
                ("client_id", self.client_id.as_str()),
                ("response_type", "code"),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("state", state),
                ("scope", OAUTH_SCOPES),
            ],
        )
        .expect("authorize URL is statically valid");
        url.to_string()
    }

    /// 授权码换取令牌（登录回调）
    pub async fn exchange_code(&self, code: &str) -> Result<TokenResponse, SpotifyError> {
        self.request_token(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", &self.redirect_uri),
        ])
        .await
    }

    /// 用存储的refresh token换取用户访问令牌。
    /// 提供方可能轮换refresh token，轮换时回写数据库覆盖旧值。
    pub async fn user_token(&self, pool: &PgPool, user_id: &str) -> Result<String, SpotifyError> {
        let refresh_token =
            sqlx::query_scalar::<_, Option<String>>("SELECT refresh_token FROM users WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(pool)
                .await?
                .flatten()
                .ok_or(SpotifyError::MissingRefreshToken)?;

        let token = self
            .request_token(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", &refresh_token),
            ])
            .await?;

        if let Some(new_refresh_token) = &token.refresh_token {
            sqlx::query("UPDATE users SET refresh_token = $1 WHERE user_id = $2")
                .bind(new_refresh_token)
                .bind(user_id)
                .execute(pool)
                .await?;
            tracing::debug!(user_id, "Stored rotated refresh token");
        }

        Ok(token.access_token)
    }

    /// 应用级令牌（client credentials），匿名请求和无refresh token的降级路径共用
    pub async fn app_token(&self) -> Result<String, SpotifyError> {
        let now = Utc::now().timestamp();
        {
            let cached = self.app_token.lock().expect("app token lock poisoned");
            if let Some(token) = cached.as_ref() {
                if token.is_fresh(now) {
                    return Ok(token.access_token.clone());
                }
            }
        }

        let token = self
            .request_token(&[("grant_type", "client_credentials")])
            .await?;
        tracing::info!(expires_in = token.expires_in, "Fetched new app token");

        let access_token = token.access_token.clone();
        let mut cached = self.app_token.lock().expect("app token lock poisoned");
        *cached = Some(CachedAppToken {
            access_token: token.access_token,
            expires_at: now + token.expires_in,
        });

        Ok(access_token)
    }

    async fn request_token(&self, params: &[(&str, &str)]) -> Result<TokenResponse, SpotifyError> {
        let res = self
            .http
            .post(SPOTIFY_TOKEN_URL)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(params)
            .send()
            .await?;

        if !res.status().is_success() {
            return Err(SpotifyError::Upstream(res.status().as_u16()));
        }

        Ok(res.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_token_fresh_within_margin() {
        let token = CachedAppToken {
            access_token: "tok".into(),
            expires_at: 1000,
        };

        assert!(token.is_fresh(939));
        // 距过期只剩60秒时必须重新获取
        assert!(!token.is_fresh(940));
        assert!(!token.is_fresh(1000));
    }

    #[test]
    fn refresh_token_rotation_is_optional_in_token_response() {
        // 提供方可以不轮换refresh token，此时不应触发回写
        let rotated: TokenResponse = serde_json::from_str(
            r#"{"access_token":"a1","expires_in":3600,"refresh_token":"r2"}"#,
        )
        .unwrap();
        assert_eq!(rotated.refresh_token.as_deref(), Some("r2"));

        let unrotated: TokenResponse =
            serde_json::from_str(r#"{"access_token":"a1","expires_in":3600}"#).unwrap();
        assert!(unrotated.refresh_token.is_none());
    }

    #[test]
    fn authorize_url_carries_oauth_params() {
        let client = SpotifyClient {
            http: reqwest::Client::new(),
            client_id: "my-client".into(),
            client_secret: "secret".into(),
            redirect_uri: "http://localhost:3000/api/auth/callback".into(),
            app_token: std::sync::Arc::new(std::sync::Mutex::new(None)),
        };

        let url = client.authorize_url("state123");
        assert!(url.starts_with(SPOTIFY_AUTHORIZE_URL));
        assert!(url.contains("client_id=my-client"));
        assert!(url.contains("state=state123"));
        assert!(url.contains("response_type=code"));
        // redirect_uri必须经过URL编码
        assert!(url.contains("redirect_uri=http%3A%2F%2Flocalhost%3A3000%2Fapi%2Fauth%2Fcallback"));
    }
}
