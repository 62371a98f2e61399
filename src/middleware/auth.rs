use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;

use crate::{
    AppState,
    utils::{Claims, SESSION_COOKIE, error_codes, error_to_api_response, verify_session_token},
};

fn session_claims(state: &AppState, jar: &CookieJar) -> Option<Claims> {
    let cookie = jar.get(SESSION_COOKIE)?;
    verify_session_token(cookie.value(), &state.config).ok()
}

/// 受保护路由：没有有效会话直接401
pub async fn auth_middleware(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    match session_claims(&state, &jar) {
        Some(claims) => {
            req.extensions_mut().insert(claims);
            next.run(req).await
        }
        None => (
            StatusCode::UNAUTHORIZED,
            error_to_api_response(error_codes::UNAUTHORIZED, "未登录或会话已过期".to_string()),
        )
            .into_response(),
    }
}

/// 公开路由：会话有效时附带用户身份（用于访问上下文解析），无会话也放行
pub async fn optional_auth_middleware(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let claims = session_claims(&state, &jar);
    req.extensions_mut().insert(claims);
    next.run(req).await
}
