use axum::Json;
use axum_extra::extract::cookie::{Cookie, SameSite};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::config::Config;

pub const SESSION_COOKIE: &str = "jukebox_session";
pub const OAUTH_STATE_COOKIE: &str = "jukebox_oauth_state";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // Spotify用户ID
    pub exp: i64,    // 过期时间
    pub iat: i64,    // 签发时间
}

pub fn generate_session_token(
    user_id: &str,
    config: &Config,
) -> Result<(String, i64), jsonwebtoken::errors::Error> {
    let expiration = Utc::now()
        .checked_add_signed(Duration::seconds(
            config.session_expiration().as_secs() as i64
        ))
        .expect("valid timestamp")
        .timestamp();

    let claims = Claims {
        sub: user_id.to_string(),
        exp: expiration,
        iat: Utc::now().timestamp(),
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.session_secret.as_bytes()),
    )?;

    Ok((token, expiration))
}

pub fn verify_session_token(
    token: &str,
    config: &Config,
) -> Result<Claims, jsonwebtoken::errors::Error> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.session_secret.as_bytes()),
        &Validation::default(),
    )?;

    Ok(token_data.claims)
}

/// 会话Cookie：HttpOnly，7天有效期，随会话令牌一起下发
pub fn session_cookie(token: String, config: &Config) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(time_duration(config.session_expiration().as_secs() as i64))
        .build()
}

pub fn clear_session_cookie() -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(time_duration(0))
        .build()
}

/// OAuth state Cookie，仅在跳转到授权页到回调之间存活
pub fn oauth_state_cookie(state: String) -> Cookie<'static> {
    Cookie::build((OAUTH_STATE_COOKIE, state))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(time_duration(600))
        .build()
}

pub fn clear_oauth_state_cookie() -> Cookie<'static> {
    Cookie::build((OAUTH_STATE_COOKIE, ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(time_duration(0))
        .build()
}

fn time_duration(secs: i64) -> time::Duration {
    time::Duration::seconds(secs)
}

/// Spotify的资源ID是22位base62字符串
pub fn is_valid_album_id(id: &str) -> bool {
    id.len() == 22 && id.chars().all(|c| c.is_ascii_alphanumeric())
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

pub fn error_to_api_response(code: &str, message: String) -> Json<ErrorBody> {
    Json(ErrorBody {
        error: code.to_string(),
        message,
    })
}

pub mod error_codes {
    pub const UNAUTHORIZED: &str = "unauthorized";
    pub const NOT_FOUND: &str = "not_found";
    pub const RATE_LIMITED: &str = "rate_limited";
    pub const INTERNAL_ERROR: &str = "internal_error";
    pub const UPSTREAM_ERROR: &str = "upstream_error";
    pub const STATE_MISMATCH: &str = "state_mismatch";
    pub const OAUTH_FAILED: &str = "oauth_failed";
    pub const QUERY_REQUIRED: &str = "query_required";
    pub const IDS_REQUIRED: &str = "ids_required";
    pub const TOO_MANY_IDS: &str = "too_many_ids";
    pub const ALBUM_ID_INVALID: &str = "album_id_invalid";
    pub const RATING_INVALID: &str = "rating_invalid";
    pub const BODY_TOO_LONG: &str = "body_too_long";
    pub const DISPLAY_NAME_INVALID: &str = "display_name_invalid";
    pub const BIO_TOO_LONG: &str = "bio_too_long";
    pub const AVATAR_REQUIRED: &str = "avatar_required";
    pub const AVATAR_TOO_LARGE: &str = "avatar_too_large";
    pub const AVATAR_TYPE_INVALID: &str = "avatar_type_invalid";
    pub const TITLE_INVALID: &str = "title_invalid";
    pub const DESCRIPTION_TOO_LONG: &str = "description_too_long";
    pub const ORDER_MISMATCH: &str = "order_mismatch";
    pub const ORDER_DUPLICATE: &str = "order_duplicate";
    pub const ITEM_EXISTS: &str = "item_exists";
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        Config {
            database_url: "postgres://localhost/jukebox_test".into(),
            session_secret: "test-secret".into(),
            session_expiration_secs: 7 * 86400,
            spotify_client_id: "client-id".into(),
            spotify_client_secret: "client-secret".into(),
            spotify_redirect_uri: "http://localhost:3000/api/auth/callback".into(),
            frontend_url: "http://localhost:5173".into(),
            allowed_origins: vec![],
            api_base_uri: "/api".into(),
            upload_dir: "uploads".into(),
            rate_limit_window_secs: 60,
            rate_limit_requests: 60,
            search_cache_ttl_secs: 60,
            album_cache_ttl_secs: 300,
            cache_max_entries: 500,
            server_host: "::".into(),
            server_port: 3000,
        }
    }

    #[test]
    fn session_token_round_trip() {
        let config = test_config();
        let (token, expiration) = generate_session_token("spotify_user_1", &config).unwrap();

        let claims = verify_session_token(&token, &config).unwrap();
        assert_eq!(claims.sub, "spotify_user_1");
        assert_eq!(claims.exp, expiration);
        assert!(claims.exp > Utc::now().timestamp());
    }

    #[test]
    fn session_token_rejects_wrong_secret() {
        let config = test_config();
        let (token, _) = generate_session_token("spotify_user_1", &config).unwrap();

        let mut other = test_config();
        other.session_secret = "other-secret".into();
        assert!(verify_session_token(&token, &other).is_err());
    }

    #[test]
    fn album_id_validation() {
        assert!(is_valid_album_id("4aawyAB9vmqN3uQ7FjRGTy"));
        assert!(!is_valid_album_id("too-short"));
        assert!(!is_valid_album_id("4aawyAB9vmqN3uQ7FjRGT!"));
        assert!(!is_valid_album_id(""));
    }
}
