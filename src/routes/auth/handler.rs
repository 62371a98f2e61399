use axum::{
    extract::{Extension, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;

use crate::{
    AppState,
    routes::user::model::User,
    utils::{
        Claims, clear_oauth_state_cookie, clear_session_cookie, error_codes,
        error_to_api_response, generate_session_token, oauth_state_cookie, session_cookie,
    },
};

use super::model::CallbackQuery;

/// 跳转到Spotify授权页，state随机值写入短期Cookie供回调校验
#[axum::debug_handler]
pub async fn login(State(state): State<AppState>, jar: CookieJar) -> Response {
    let oauth_state = uuid::Uuid::new_v4().simple().to_string();
    let authorize_url = state.spotify.authorize_url(&oauth_state);

    let jar = jar.add(oauth_state_cookie(oauth_state));
    (jar, Redirect::to(&authorize_url)).into_response()
}

#[axum::debug_handler]
pub async fn callback(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<CallbackQuery>,
) -> Response {
    // 用户拒绝授权或提供方报错
    if query.error.is_some() {
        return (
            StatusCode::BAD_REQUEST,
            error_to_api_response(error_codes::OAUTH_FAILED, "授权失败".to_string()),
        )
            .into_response();
    }

    let code = match query.code.as_deref() {
        Some(code) if !code.is_empty() => code,
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                error_to_api_response(error_codes::OAUTH_FAILED, "缺少授权码".to_string()),
            )
                .into_response();
        }
    };

    // state必须与跳转前下发的Cookie一致
    let expected_state = jar
        .get(crate::utils::OAUTH_STATE_COOKIE)
        .map(|c| c.value().to_string());
    if expected_state.is_none() || expected_state.as_deref() != query.state.as_deref() {
        return (
            StatusCode::BAD_REQUEST,
            error_to_api_response(error_codes::STATE_MISMATCH, "state校验失败".to_string()),
        )
            .into_response();
    }

    let token = match state.spotify.exchange_code(code).await {
        Ok(token) => token,
        Err(e) => return e.into_response(),
    };

    let profile = match state.spotify.profile(&token.access_token).await {
        Ok(profile) => profile,
        Err(e) => return e.into_response(),
    };

    let avatar_url = profile.images.first().map(|i| i.url.clone());
    let display_name = profile.display_name.unwrap_or_else(|| profile.id.clone());

    let user = match User::upsert_from_oauth(
        &state.pool,
        &profile.id,
        &display_name,
        avatar_url.as_deref(),
        token.refresh_token.as_deref(),
    )
    .await
    {
        Ok(user) => user,
        Err(e) => {
            tracing::error!("Failed to upsert user on OAuth callback: {:?}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_to_api_response(error_codes::INTERNAL_ERROR, "内部服务器错误".to_string()),
            )
                .into_response();
        }
    };

    let session_token = match generate_session_token(&user.user_id, &state.config) {
        Ok((token, _)) => token,
        Err(_) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_to_api_response(error_codes::INTERNAL_ERROR, "生成会话失败".to_string()),
            )
                .into_response();
        }
    };

    tracing::info!(user_id = %user.user_id, "User logged in via Spotify OAuth");

    let jar = jar
        .add(session_cookie(session_token, &state.config))
        .add(clear_oauth_state_cookie());
    (jar, Redirect::to(&state.config.frontend_url)).into_response()
}

/// 会话自省：返回当前登录用户，没有有效会话则401
#[axum::debug_handler]
pub async fn session(
    State(state): State<AppState>,
    Extension(claims): Extension<Option<Claims>>,
) -> Response {
    let Some(claims) = claims else {
        return (
            StatusCode::UNAUTHORIZED,
            error_to_api_response(error_codes::UNAUTHORIZED, "未登录".to_string()),
        )
            .into_response();
    };

    match User::find_by_id(&state.pool, &claims.sub).await {
        Ok(Some(user)) => (StatusCode::OK, axum::Json(user)).into_response(),
        Ok(None) => (
            StatusCode::UNAUTHORIZED,
            error_to_api_response(error_codes::UNAUTHORIZED, "会话对应的用户不存在".to_string()),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Failed to load session user: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_to_api_response(error_codes::INTERNAL_ERROR, "内部服务器错误".to_string()),
            )
                .into_response()
        }
    }
}

#[axum::debug_handler]
pub async fn logout(jar: CookieJar) -> Response {
    let jar = jar.add(clear_session_cookie());
    (jar, axum::Json(serde_json::json!({ "ok": true }))).into_response()
}
