use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use uuid::Uuid;

use skillswap_types::api::{Claims, CreateReportRequest};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub async fn create_report(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateReportRequest>,
) -> ApiResult<impl IntoResponse> {
    if req.reported_user_id == claims.sub {
        return Err(ApiError::BadRequest("cannot report yourself".into()));
    }
    if req.reason.trim().is_empty() || req.reason.len() > 1000 {
        return Err(ApiError::BadRequest("reason must be 1-1000 characters".into()));
    }

    state
        .db
        .get_user_by_id(&req.reported_user_id.to_string())?
        .ok_or(ApiError::NotFound)?;

    let skill_id = req.skill_id.map(|s| s.to_string());
    let conversation_id = req.conversation_id.map(|c| c.to_string());

    let inserted = state.db.insert_report(
        &Uuid::new_v4().to_string(),
        &claims.sub.to_string(),
        &req.reported_user_id.to_string(),
        skill_id.as_deref(),
        conversation_id.as_deref(),
        req.reason.trim(),
    )?;

    if !inserted {
        return Err(ApiError::Conflict("you already reported this".into()));
    }

    Ok(StatusCode::CREATED)
}
