use std::collections::HashSet;

use axum::{
    Json,
    extract::{Extension, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use uuid::Uuid;

use crate::{
    AppState,
    utils::{Claims, error_codes, error_to_api_response, is_valid_album_id},
};

use super::model::{
    AddItemRequest, CreateListRequest, List, ListWithItems, ReorderRequest, UpdateListRequest,
};

const MAX_TITLE_CHARS: usize = 100;
const MAX_DESCRIPTION_CHARS: usize = 500;

fn validate_title(title: &str) -> bool {
    let trimmed = title.trim();
    !trimmed.is_empty() && trimmed.chars().count() <= MAX_TITLE_CHARS
}

/// 重排提交必须是现有条目的完整排列：先查重复，再查集合是否一致
fn validate_reorder(existing: &[String], submitted: &[String]) -> Result<(), &'static str> {
    let submitted_set: HashSet<&str> = submitted.iter().map(String::as_str).collect();
    if submitted_set.len() != submitted.len() {
        return Err(error_codes::ORDER_DUPLICATE);
    }

    let existing_set: HashSet<&str> = existing.iter().map(String::as_str).collect();
    if submitted_set != existing_set {
        return Err(error_codes::ORDER_MISMATCH);
    }

    Ok(())
}

fn internal_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        error_to_api_response(error_codes::INTERNAL_ERROR, "内部服务器错误".to_string()),
    )
        .into_response()
}

fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        error_to_api_response(error_codes::NOT_FOUND, "列表不存在".to_string()),
    )
        .into_response()
}

/// 取列表并校验归属。找不到和不属于当前用户都按404处理，
/// 不向调用方泄露列表是否存在。
async fn load_owned_list(
    state: &AppState,
    list_id: Uuid,
    claims: &Claims,
) -> Result<List, Response> {
    match List::find_by_id(&state.pool, list_id).await {
        Ok(Some(list)) if list.user_id == claims.sub => Ok(list),
        Ok(_) => Err(not_found()),
        Err(e) => {
            tracing::error!("Failed to load list: {:?}", e);
            Err(internal_error())
        }
    }
}

#[axum::debug_handler]
pub async fn create(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateListRequest>,
) -> Response {
    let title = match req.title.as_deref().map(str::trim) {
        Some(title) if validate_title(title) => title.to_string(),
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                error_to_api_response(
                    error_codes::TITLE_INVALID,
                    "标题长度必须在1到100个字符之间".to_string(),
                ),
            )
                .into_response();
        }
    };

    if let Some(description) = &req.description {
        if description.chars().count() > MAX_DESCRIPTION_CHARS {
            return (
                StatusCode::BAD_REQUEST,
                error_to_api_response(
                    error_codes::DESCRIPTION_TOO_LONG,
                    "描述最多500个字符".to_string(),
                ),
            )
                .into_response();
        }
    }

    match List::create(
        &state.pool,
        &claims.sub,
        &title,
        req.description.as_deref(),
        req.is_ranked,
    )
    .await
    {
        Ok(list) => (StatusCode::CREATED, Json(list)).into_response(),
        Err(e) => {
            tracing::error!("Failed to create list: {:?}", e);
            internal_error()
        }
    }
}

#[axum::debug_handler]
pub async fn get_list(State(state): State<AppState>, Path(list_id): Path<String>) -> Response {
    let Ok(list_id) = Uuid::parse_str(&list_id) else {
        return not_found();
    };

    let list = match List::find_by_id(&state.pool, list_id).await {
        Ok(Some(list)) => list,
        Ok(None) => return not_found(),
        Err(e) => {
            tracing::error!("Failed to load list: {:?}", e);
            return internal_error();
        }
    };

    match List::items(&state.pool, list_id).await {
        Ok(items) => (StatusCode::OK, Json(ListWithItems { list, items })).into_response(),
        Err(e) => {
            tracing::error!("Failed to load list items: {:?}", e);
            internal_error()
        }
    }
}

#[axum::debug_handler]
pub async fn update(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(list_id): Path<String>,
    Json(req): Json<UpdateListRequest>,
) -> Response {
    let Ok(list_id) = Uuid::parse_str(&list_id) else {
        return not_found();
    };

    if let Some(title) = &req.title {
        if !validate_title(title) {
            return (
                StatusCode::BAD_REQUEST,
                error_to_api_response(
                    error_codes::TITLE_INVALID,
                    "标题长度必须在1到100个字符之间".to_string(),
                ),
            )
                .into_response();
        }
    }
    if let Some(description) = &req.description {
        if description.chars().count() > MAX_DESCRIPTION_CHARS {
            return (
                StatusCode::BAD_REQUEST,
                error_to_api_response(
                    error_codes::DESCRIPTION_TOO_LONG,
                    "描述最多500个字符".to_string(),
                ),
            )
                .into_response();
        }
    }

    if let Err(response) = load_owned_list(&state, list_id, &claims).await {
        return response;
    }

    match List::update(
        &state.pool,
        list_id,
        req.title.as_deref().map(str::trim),
        req.description.as_deref(),
        req.is_ranked,
    )
    .await
    {
        Ok(list) => (StatusCode::OK, Json(list)).into_response(),
        Err(e) => {
            tracing::error!("Failed to update list: {:?}", e);
            internal_error()
        }
    }
}

#[axum::debug_handler]
pub async fn reorder(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(list_id): Path<String>,
    Json(req): Json<ReorderRequest>,
) -> Response {
    let Ok(list_id) = Uuid::parse_str(&list_id) else {
        return not_found();
    };
    let Some(order) = req.order else {
        return (
            StatusCode::BAD_REQUEST,
            error_to_api_response(error_codes::ORDER_MISMATCH, "缺少order字段".to_string()),
        )
            .into_response();
    };

    if let Err(response) = load_owned_list(&state, list_id, &claims).await {
        return response;
    }

    let existing = match List::item_album_ids(&state.pool, list_id).await {
        Ok(ids) => ids,
        Err(e) => {
            tracing::error!("Failed to load list items: {:?}", e);
            return internal_error();
        }
    };

    if let Err(code) = validate_reorder(&existing, &order) {
        return (
            StatusCode::BAD_REQUEST,
            error_to_api_response(code, "提交的顺序与列表条目不一致".to_string()),
        )
            .into_response();
    }

    if let Err(e) = List::reorder(&state.pool, list_id, &order).await {
        tracing::error!("Failed to reorder list: {:?}", e);
        return internal_error();
    }

    match List::items(&state.pool, list_id).await {
        Ok(items) => (StatusCode::OK, Json(json!({ "items": items }))).into_response(),
        Err(e) => {
            tracing::error!("Failed to load list items: {:?}", e);
            internal_error()
        }
    }
}

#[axum::debug_handler]
pub async fn add_item(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(list_id): Path<String>,
    Json(req): Json<AddItemRequest>,
) -> Response {
    let Ok(list_id) = Uuid::parse_str(&list_id) else {
        return not_found();
    };

    let album_id = match req.album_id.as_deref() {
        Some(album_id) if is_valid_album_id(album_id) => album_id,
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                error_to_api_response(error_codes::ALBUM_ID_INVALID, "专辑ID格式无效".to_string()),
            )
                .into_response();
        }
    };

    if let Err(response) = load_owned_list(&state, list_id, &claims).await {
        return response;
    }

    match List::add_item(&state.pool, list_id, album_id).await {
        Ok(item) => (StatusCode::CREATED, Json(item)).into_response(),
        Err(e) => {
            // 同一张专辑在一个列表里只能出现一次
            if e.as_database_error()
                .map(|db| db.is_unique_violation())
                .unwrap_or(false)
            {
                return (
                    StatusCode::BAD_REQUEST,
                    error_to_api_response(error_codes::ITEM_EXISTS, "专辑已在列表中".to_string()),
                )
                    .into_response();
            }
            tracing::error!("Failed to add list item: {:?}", e);
            internal_error()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn reorder_accepts_a_full_permutation() {
        let existing = ids(&["a", "b", "c"]);
        assert!(validate_reorder(&existing, &ids(&["c", "a", "b"])).is_ok());
    }

    #[test]
    fn reorder_rejects_missing_ids() {
        let existing = ids(&["a", "b", "c"]);
        assert_eq!(
            validate_reorder(&existing, &ids(&["a", "b"])),
            Err(error_codes::ORDER_MISMATCH)
        );
    }

    #[test]
    fn reorder_rejects_unknown_ids() {
        let existing = ids(&["a", "b"]);
        assert_eq!(
            validate_reorder(&existing, &ids(&["a", "x"])),
            Err(error_codes::ORDER_MISMATCH)
        );
    }

    #[test]
    fn reorder_rejects_duplicates() {
        let existing = ids(&["a", "b"]);
        // 重复在集合比较之前被发现
        assert_eq!(
            validate_reorder(&existing, &ids(&["a", "a"])),
            Err(error_codes::ORDER_DUPLICATE)
        );
    }

    #[test]
    fn reorder_rejects_empty_submission_against_nonempty_list() {
        let existing = ids(&["a"]);
        assert_eq!(
            validate_reorder(&existing, &ids(&[])),
            Err(error_codes::ORDER_MISMATCH)
        );
    }

    #[test]
    fn title_validation_trims_whitespace() {
        assert!(validate_title("我的年度专辑"));
        assert!(!validate_title("   "));
        assert!(!validate_title(&"x".repeat(101)));
    }
}
