use axum::{
    Json,
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::{
    AppState,
    cache::keys,
    utils::{Claims, error_codes, error_to_api_response, is_valid_album_id},
};

use super::model::{IdsQuery, SearchQuery};

const MAX_BATCH_IDS: usize = 20;

/// 专辑搜索。结果按访问上下文+查询串缓存60秒。
#[axum::debug_handler]
pub async fn search(
    State(state): State<AppState>,
    Extension(claims): Extension<Option<Claims>>,
    Query(query): Query<SearchQuery>,
) -> Response {
    let q = query.q.as_deref().unwrap_or("").trim().to_string();
    if q.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            error_to_api_response(error_codes::QUERY_REQUIRED, "缺少搜索关键词".to_string()),
        )
            .into_response();
    }
    let limit = query.limit.unwrap_or(20).clamp(1, 50);

    let ctx = match state
        .spotify
        .resolve_access_context(&state.pool, claims.as_ref())
        .await
    {
        Ok(ctx) => ctx,
        Err(e) => return e.into_response(),
    };

    let key = keys::search_key(&ctx.namespace, &q, limit);
    if let Some(cached) = state.search_cache.get(&key) {
        return (StatusCode::OK, Json(cached)).into_response();
    }

    match state.spotify.search_albums(&ctx.token, &q, limit).await {
        Ok(albums) => {
            let payload = json!({ "albums": albums });
            state.search_cache.insert(&key, payload.clone());
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(e) => e.into_response(),
    }
}

/// 批量取专辑，?ids=a,b,c，最多20个
#[axum::debug_handler]
pub async fn get_albums(
    State(state): State<AppState>,
    Extension(claims): Extension<Option<Claims>>,
    Query(query): Query<IdsQuery>,
) -> Response {
    let ids: Vec<String> = query
        .ids
        .as_deref()
        .unwrap_or("")
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    if ids.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            error_to_api_response(error_codes::IDS_REQUIRED, "缺少专辑ID列表".to_string()),
        )
            .into_response();
    }
    if ids.len() > MAX_BATCH_IDS {
        return (
            StatusCode::BAD_REQUEST,
            error_to_api_response(error_codes::TOO_MANY_IDS, "一次最多查询20张专辑".to_string()),
        )
            .into_response();
    }
    if ids.iter().any(|id| !is_valid_album_id(id)) {
        return (
            StatusCode::BAD_REQUEST,
            error_to_api_response(error_codes::ALBUM_ID_INVALID, "专辑ID格式无效".to_string()),
        )
            .into_response();
    }

    let ctx = match state
        .spotify
        .resolve_access_context(&state.pool, claims.as_ref())
        .await
    {
        Ok(ctx) => ctx,
        Err(e) => return e.into_response(),
    };

    let key = keys::albums_key(&ctx.namespace, &ids);
    if let Some(cached) = state.album_cache.get(&key) {
        return (StatusCode::OK, Json(cached)).into_response();
    }

    match state.spotify.albums(&ctx.token, &ids).await {
        Ok(albums) => {
            let payload = json!({ "albums": albums });
            state.album_cache.insert(&key, payload.clone());
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(e) => e.into_response(),
    }
}

/// 专辑详情。元数据变化慢，缓存5分钟。
#[axum::debug_handler]
pub async fn get_album(
    State(state): State<AppState>,
    Extension(claims): Extension<Option<Claims>>,
    Path(album_id): Path<String>,
) -> Response {
    if !is_valid_album_id(&album_id) {
        return (
            StatusCode::BAD_REQUEST,
            error_to_api_response(error_codes::ALBUM_ID_INVALID, "专辑ID格式无效".to_string()),
        )
            .into_response();
    }

    let ctx = match state
        .spotify
        .resolve_access_context(&state.pool, claims.as_ref())
        .await
    {
        Ok(ctx) => ctx,
        Err(e) => return e.into_response(),
    };

    let key = keys::album_key(&ctx.namespace, &album_id);
    if let Some(cached) = state.album_cache.get(&key) {
        return (StatusCode::OK, Json(cached)).into_response();
    }

    match state.spotify.album(&ctx.token, &album_id).await {
        Ok(Some(album)) => match serde_json::to_value(&album) {
            Ok(payload) => {
                state.album_cache.insert(&key, payload.clone());
                (StatusCode::OK, Json(payload)).into_response()
            }
            Err(e) => {
                tracing::error!("Failed to serialize album payload: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    error_to_api_response(error_codes::INTERNAL_ERROR, "内部服务器错误".to_string()),
                )
                    .into_response()
            }
        },
        Ok(None) => (
            StatusCode::NOT_FOUND,
            error_to_api_response(error_codes::NOT_FOUND, "专辑不存在".to_string()),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}
