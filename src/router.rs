use std::sync::Arc;

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post, put},
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    services::ServeDir,
};

use crate::{
    AppState,
    middleware::{RateLimiter, auth_middleware, log_errors, optional_auth_middleware, rate_limit},
    routes,
};

pub fn build_router(state: AppState) -> Router {
    let rate_limiter = Arc::new(RateLimiter::new(
        state.config.rate_limit_requests,
        state.config.rate_limit_window(),
    ));

    // 公开路由：无需会话，但会话有效时附带用户身份
    let public_routes = Router::new()
        .route("/auth/login", get(routes::auth::login))
        .route("/auth/callback", get(routes::auth::callback))
        .route("/auth/session", get(routes::auth::session))
        .route("/auth/logout", post(routes::auth::logout))
        .route("/albums/search", get(routes::album::search))
        .route("/albums", get(routes::album::get_albums))
        .route("/albums/{album_id}", get(routes::album::get_album))
        .route("/albums/{album_id}/reviews", get(routes::review::list_for_album))
        .route("/lists/{list_id}", get(routes::list::get_list))
        .route("/users/{user_id}", get(routes::user::get_profile))
        .layer(from_fn_with_state(state.clone(), optional_auth_middleware));

    // 受保护路由：要求有效会话
    let protected_routes = Router::new()
        .route("/albums/{album_id}/reviews", post(routes::review::create))
        .route("/users/me", put(routes::user::update_profile))
        .route("/users/me/avatar", post(routes::user::upload_avatar))
        .route("/lists", post(routes::list::create))
        .route("/lists/{list_id}", put(routes::list::update))
        .route("/lists/{list_id}/reorder", post(routes::list::reorder))
        .route("/lists/{list_id}/items", post(routes::list::add_item))
        .layer(from_fn_with_state(state.clone(), auth_middleware));

    let router = Router::new()
        .nest(
            &state.config.api_base_uri.clone(),
            Router::new().merge(public_routes).merge(protected_routes),
        )
        .nest_service("/uploads", ServeDir::new(&state.config.upload_dir));

    // 日志中间件和限流中间件
    let router = router
        .layer(from_fn(log_errors))
        .layer(from_fn_with_state(rate_limiter, rate_limit));

    // 允许的前端来源来自配置；未配置时放开（开发模式）
    let cors = if state.config.allowed_origins.is_empty() {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .allowed_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .allow_headers([header::CONTENT_TYPE])
            .allow_credentials(true)
    };

    router.layer(cors).with_state(state)
}
