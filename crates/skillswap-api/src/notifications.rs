use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use serde_json::json;
use uuid::Uuid;

use skillswap_types::api::Claims;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use crate::view;

const NOTIFICATION_PAGE: u32 = 100;

pub async fn list(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let rows = state
        .db
        .list_notifications(&claims.sub.to_string(), NOTIFICATION_PAGE)?;
    let notifications: Vec<_> = rows.into_iter().map(view::notification).collect();
    Ok(Json(notifications))
}

pub async fn mark_read(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(notification_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let flipped = state
        .db
        .mark_notification_read(&notification_id.to_string(), &claims.sub.to_string())?;
    if !flipped {
        return Err(ApiError::NotFound);
    }
    Ok(Json(json!({ "read": true })))
}

pub async fn mark_all_read(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let updated = state
        .db
        .mark_all_notifications_read(&claims.sub.to_string())?;
    Ok(Json(json!({ "updated": updated })))
}
