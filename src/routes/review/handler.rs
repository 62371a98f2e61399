use axum::{
    Json,
    extract::{Extension, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::{
    AppState,
    utils::{Claims, error_codes, error_to_api_response, is_valid_album_id},
};

use super::model::{CreateReviewRequest, ReviewWithAuthor};

const MAX_REVIEW_BODY_CHARS: usize = 2000;

#[axum::debug_handler]
pub async fn list_for_album(
    State(state): State<AppState>,
    Path(album_id): Path<String>,
) -> Response {
    if !is_valid_album_id(&album_id) {
        return (
            StatusCode::BAD_REQUEST,
            error_to_api_response(error_codes::ALBUM_ID_INVALID, "专辑ID格式无效".to_string()),
        )
            .into_response();
    }

    match ReviewWithAuthor::list_for_album(&state.pool, &album_id).await {
        Ok(reviews) => (StatusCode::OK, Json(json!({ "reviews": reviews }))).into_response(),
        Err(e) => {
            tracing::error!("Failed to list reviews: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_to_api_response(error_codes::INTERNAL_ERROR, "内部服务器错误".to_string()),
            )
                .into_response()
        }
    }
}

#[axum::debug_handler]
pub async fn create(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(album_id): Path<String>,
    Json(req): Json<CreateReviewRequest>,
) -> Response {
    // 校验先于数据库访问
    if !is_valid_album_id(&album_id) {
        return (
            StatusCode::BAD_REQUEST,
            error_to_api_response(error_codes::ALBUM_ID_INVALID, "专辑ID格式无效".to_string()),
        )
            .into_response();
    }

    let rating = match req.rating {
        Some(rating) if (1..=10).contains(&rating) => rating as i16,
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                error_to_api_response(error_codes::RATING_INVALID, "评分必须在1到10之间".to_string()),
            )
                .into_response();
        }
    };

    if let Some(body) = &req.body {
        if body.chars().count() > MAX_REVIEW_BODY_CHARS {
            return (
                StatusCode::BAD_REQUEST,
                error_to_api_response(error_codes::BODY_TOO_LONG, "评论最多2000个字符".to_string()),
            )
                .into_response();
        }
    }

    match ReviewWithAuthor::upsert(&state.pool, &claims.sub, &album_id, rating, req.body.as_deref())
        .await
    {
        Ok(review) => (StatusCode::CREATED, Json(review)).into_response(),
        Err(e) => {
            tracing::error!("Failed to create review: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_to_api_response(error_codes::INTERNAL_ERROR, "内部服务器错误".to_string()),
            )
                .into_response()
        }
    }
}
