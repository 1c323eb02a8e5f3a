use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use tracing::warn;
use uuid::Uuid;

use skillswap_types::api::{Claims, UpdateProfileRequest};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use crate::view;

pub async fn me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let user_id = claims.sub.to_string();
    let user = state
        .db
        .get_user_by_id(&user_id)?
        .ok_or(ApiError::NotFound)?;
    let stats = state.db.user_stats(&user_id)?;

    Ok(Json(view::account(&user, &stats)))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let user_id = user_id.to_string();
    let user = state
        .db
        .get_user_by_id(&user_id)?
        .ok_or(ApiError::NotFound)?;
    let stats = state.db.user_stats(&user_id)?;

    Ok(Json(view::user_profile(&user, &stats)))
}

pub async fn update_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateProfileRequest>,
) -> ApiResult<impl IntoResponse> {
    if let Some(bio) = &req.bio {
        if bio.len() > 1000 {
            return Err(ApiError::BadRequest("bio too long (max 1000)".into()));
        }
    }

    // Geocoding is best-effort: a provider failure leaves the profile
    // without coordinates, never fails the update.
    let mut coords = None;
    if let (Some(location), Some(geocoder)) = (&req.location, &state.providers.geocoder) {
        match geocoder.lookup(location).await {
            Ok(hit) => coords = hit,
            Err(e) => warn!("geocoding '{}' failed: {}", location, e),
        }
    }

    let user_id = claims.sub.to_string();
    state.db.update_profile(
        &user_id,
        req.bio.as_deref(),
        req.location.as_deref(),
        coords.map(|c| c.0),
        coords.map(|c| c.1),
        req.avatar_url.as_deref(),
    )?;

    let user = state
        .db
        .get_user_by_id(&user_id)?
        .ok_or(ApiError::NotFound)?;
    let stats = state.db.user_stats(&user_id)?;

    Ok(Json(view::account(&user, &stats)))
}
