use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use uuid::Uuid;

use skillswap_types::api::Claims;

use crate::error::{ApiError, ApiResult};
use crate::middleware::require_admin;
use crate::state::AppState;
use crate::view;

#[derive(Debug, Deserialize)]
pub struct ReportListQuery {
    pub status: Option<String>,
}

pub async fn list_reports(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<ReportListQuery>,
) -> ApiResult<impl IntoResponse> {
    require_admin(&claims)?;

    if let Some(status) = &query.status {
        if status != "open" && status != "resolved" {
            return Err(ApiError::BadRequest("status must be open or resolved".into()));
        }
    }

    let rows = state.db.list_reports(query.status.as_deref())?;
    let reports: Vec<_> = rows.into_iter().map(view::report).collect();
    Ok(Json(reports))
}

pub async fn resolve_report(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(report_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    require_admin(&claims)?;

    if !state.db.set_report_status(&report_id.to_string(), "resolved")? {
        return Err(ApiError::NotFound);
    }
    Ok(StatusCode::OK)
}

/// Admin takedown of a skill posting, typically off the back of a report.
pub async fn remove_skill(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(skill_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    require_admin(&claims)?;

    state
        .db
        .get_skill(&skill_id.to_string())?
        .ok_or(ApiError::NotFound)?;
    state.db.delete_skill(&skill_id.to_string())?;
    Ok(StatusCode::NO_CONTENT)
}
