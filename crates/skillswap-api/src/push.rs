use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};

use skillswap_types::api::{Claims, PushTokenRequest};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub async fn register_token(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<PushTokenRequest>,
) -> ApiResult<impl IntoResponse> {
    if req.token.trim().is_empty() {
        return Err(ApiError::BadRequest("token is required".into()));
    }

    state
        .db
        .upsert_push_token(&claims.sub.to_string(), &req.token, &req.platform)?;
    Ok(StatusCode::CREATED)
}

pub async fn unregister_token(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<PushTokenRequest>,
) -> ApiResult<impl IntoResponse> {
    state
        .db
        .delete_push_token(&claims.sub.to_string(), &req.token)?;
    Ok(StatusCode::NO_CONTENT)
}
