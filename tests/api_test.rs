// 路由层离线测试：连接池用connect_lazy，所有用例都在触达数据库
// 或Spotify之前返回。

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use sqlx::postgres::PgPoolOptions;
use tower::ServiceExt;

use jukebox_backend::{
    AppState,
    cache::TtlCache,
    config::Config,
    router::build_router,
    spotify::SpotifyClient,
    utils::{SESSION_COOKIE, generate_session_token},
};

fn test_config() -> Config {
    Config {
        database_url: "postgres://localhost:1/jukebox_test".into(),
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

fn test_app(config: Config) -> Router {
    let pool = PgPoolOptions::new()
        .connect_lazy(&config.database_url)
        .expect("lazy pool");

    let state = AppState {
        pool,
        spotify: SpotifyClient::new(&config),
        search_cache: Arc::new(TtlCache::new(
            "search",
            config.search_cache_ttl_secs,
            config.cache_max_entries,
        )),
        album_cache: Arc::new(TtlCache::new(
            "album",
            config.album_cache_ttl_secs,
            config.cache_max_entries,
        )),
        config,
    };

    build_router(state)
}

fn session_cookie_header(config: &Config, user_id: &str) -> String {
    let (token, _) = generate_session_token(user_id, config).expect("session token");
    format!("{}={}", SESSION_COOKIE, token)
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("json body")
}

#[tokio::test]
async fn review_create_requires_session() {
    let app = test_app(test_config());

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/albums/4aawyAB9vmqN3uQ7FjRGTy/reviews")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"rating":7}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"], "unauthorized");
}

#[tokio::test]
async fn review_rating_out_of_range_is_rejected() {
    let config = test_config();
    let cookie = session_cookie_header(&config, "spotify_user_1");
    let app = test_app(config);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/albums/4aawyAB9vmqN3uQ7FjRGTy/reviews")
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::COOKIE, cookie)
                .body(Body::from(r#"{"rating":11}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "rating_invalid");
}

#[tokio::test]
async fn review_body_over_limit_is_rejected() {
    let config = test_config();
    let cookie = session_cookie_header(&config, "spotify_user_1");
    let app = test_app(config);

    let payload = serde_json::json!({ "rating": 7, "body": "x".repeat(2001) });
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/albums/4aawyAB9vmqN3uQ7FjRGTy/reviews")
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::COOKIE, cookie)
                .body(Body::from(payload.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "body_too_long");
}

#[tokio::test]
async fn search_requires_a_query() {
    let app = test_app(test_config());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/albums/search?q=%20%20")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "query_required");
}

#[tokio::test]
async fn album_id_format_is_validated() {
    let app = test_app(test_config());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/albums/not-a-valid-id")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "album_id_invalid");
}

#[tokio::test]
async fn list_create_requires_a_title() {
    let config = test_config();
    let cookie = session_cookie_header(&config, "spotify_user_1");
    let app = test_app(config);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/lists")
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::COOKIE, cookie)
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "title_invalid");
}

#[tokio::test]
async fn rate_limit_headers_are_always_present() {
    let app = test_app(test_config());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/albums/search?q=")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let headers = response.headers();
    assert_eq!(headers["x-ratelimit-limit"], "60");
    assert_eq!(headers["x-ratelimit-remaining"], "59");
    assert!(headers.contains_key("x-ratelimit-reset"));
}

#[tokio::test]
async fn rate_limit_rejects_over_budget() {
    let mut config = test_config();
    config.rate_limit_requests = 2;
    let app = test_app(config);

    // 没有连接信息和代理头时所有请求共享"unknown"这个键
    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/albums/search?q=")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/albums/search?q=")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let headers = response.headers();
    assert_eq!(headers["x-ratelimit-limit"], "2");
    assert_eq!(headers["x-ratelimit-remaining"], "0");
    let body = body_json(response).await;
    assert_eq!(body["error"], "rate_limited");
}
