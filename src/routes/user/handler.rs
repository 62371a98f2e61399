use axum::{
    Json,
    extract::{Extension, Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::{
    AppState,
    utils::{Claims, error_codes, error_to_api_response},
};

use super::model::{UpdateProfileRequest, User};

const MAX_AVATAR_BYTES: usize = 2 * 1024 * 1024;

#[axum::debug_handler]
pub async fn get_profile(State(state): State<AppState>, Path(user_id): Path<String>) -> Response {
    match User::find_by_id(&state.pool, &user_id).await {
        Ok(Some(user)) => (StatusCode::OK, Json(user)).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            error_to_api_response(error_codes::NOT_FOUND, "用户不存在".to_string()),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Failed to load user profile: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_to_api_response(error_codes::INTERNAL_ERROR, "内部服务器错误".to_string()),
            )
                .into_response()
        }
    }
}

#[axum::debug_handler]
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateProfileRequest>,
) -> Response {
    // 校验先于数据库访问
    if let Some(display_name) = &req.display_name {
        let trimmed = display_name.trim();
        if trimmed.is_empty() || trimmed.chars().count() > 50 {
            return (
                StatusCode::BAD_REQUEST,
                error_to_api_response(
                    error_codes::DISPLAY_NAME_INVALID,
                    "昵称长度必须在1到50个字符之间".to_string(),
                ),
            )
                .into_response();
        }
    }

    if let Some(bio) = &req.bio {
        if bio.chars().count() > 500 {
            return (
                StatusCode::BAD_REQUEST,
                error_to_api_response(error_codes::BIO_TOO_LONG, "简介最多500个字符".to_string()),
            )
                .into_response();
        }
    }

    match User::update_profile(
        &state.pool,
        &claims.sub,
        req.display_name.as_deref().map(str::trim),
        req.bio.as_deref(),
    )
    .await
    {
        Ok(user) => (StatusCode::OK, Json(user)).into_response(),
        Err(e) => {
            tracing::error!("Failed to update profile: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_to_api_response(error_codes::INTERNAL_ERROR, "内部服务器错误".to_string()),
            )
                .into_response()
        }
    }
}

/// 头像上传：multipart里取avatar字段，按内容类型决定扩展名，
/// 文件名用随机UUID避免覆盖
#[axum::debug_handler]
pub async fn upload_avatar(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    mut multipart: Multipart,
) -> Response {
    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() != Some("avatar") {
            continue;
        }

        let extension = match field.content_type() {
            Some("image/png") => "png",
            Some("image/jpeg") => "jpg",
            Some("image/webp") => "webp",
            _ => {
                return (
                    StatusCode::BAD_REQUEST,
                    error_to_api_response(
                        error_codes::AVATAR_TYPE_INVALID,
                        "头像仅支持png、jpeg、webp".to_string(),
                    ),
                )
                    .into_response();
            }
        };

        let bytes = match field.bytes().await {
            Ok(bytes) => bytes,
            Err(_) => {
                return (
                    StatusCode::BAD_REQUEST,
                    error_to_api_response(
                        error_codes::AVATAR_TOO_LARGE,
                        "头像文件读取失败".to_string(),
                    ),
                )
                    .into_response();
            }
        };
        if bytes.len() > MAX_AVATAR_BYTES {
            return (
                StatusCode::BAD_REQUEST,
                error_to_api_response(error_codes::AVATAR_TOO_LARGE, "头像最大2MB".to_string()),
            )
                .into_response();
        }

        let filename = format!("{}.{}", uuid::Uuid::new_v4(), extension);
        let dir = std::path::Path::new(&state.config.upload_dir);
        if let Err(e) = tokio::fs::create_dir_all(dir).await {
            tracing::error!("Failed to create upload dir: {:?}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_to_api_response(error_codes::INTERNAL_ERROR, "内部服务器错误".to_string()),
            )
                .into_response();
        }
        if let Err(e) = tokio::fs::write(dir.join(&filename), &bytes).await {
            tracing::error!("Failed to write avatar file: {:?}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_to_api_response(error_codes::INTERNAL_ERROR, "内部服务器错误".to_string()),
            )
                .into_response();
        }

        let avatar_url = format!("/uploads/{}", filename);
        return match User::update_avatar(&state.pool, &claims.sub, &avatar_url).await {
            Ok(user) => {
                tracing::info!(user_id = %claims.sub, avatar_url = %avatar_url, "Avatar updated");
                (StatusCode::OK, Json(user)).into_response()
            }
            Err(e) => {
                tracing::error!("Failed to store avatar url: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    error_to_api_response(error_codes::INTERNAL_ERROR, "内部服务器错误".to_string()),
                )
                    .into_response()
            }
        };
    }

    (
        StatusCode::BAD_REQUEST,
        error_to_api_response(error_codes::AVATAR_REQUIRED, "缺少avatar字段".to_string()),
    )
        .into_response()
}
