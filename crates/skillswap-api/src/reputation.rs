use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use skillswap_types::api::{Claims, RateRequest, ReputationResponse};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Parties of a completed swap rate each other, once per proposal.
pub async fn rate(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<RateRequest>,
) -> ApiResult<impl IntoResponse> {
    if !(1..=5).contains(&req.stars) {
        return Err(ApiError::BadRequest("stars must be 1-5".into()));
    }

    let proposal = state
        .db
        .get_proposal(&req.proposal_id.to_string())?
        .ok_or(ApiError::NotFound)?;

    if proposal.status != "completed" {
        return Err(ApiError::BadRequest("swap is not completed yet".into()));
    }

    let caller = claims.sub.to_string();
    let rated = if proposal.proposer_id == caller {
        proposal.receiver_id.clone()
    } else if proposal.receiver_id == caller {
        proposal.proposer_id.clone()
    } else {
        return Err(ApiError::Forbidden("not your proposal".into()));
    };

    if state.db.has_rated(&proposal.id, &caller)? {
        return Err(ApiError::Conflict("you already rated this swap".into()));
    }

    state.db.insert_rating(
        &Uuid::new_v4().to_string(),
        &proposal.id,
        &caller,
        &rated,
        req.stars,
        req.comment.as_deref(),
    )?;

    Ok(StatusCode::CREATED)
}

pub async fn get_reputation(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let id = user_id.to_string();
    state.db.get_user_by_id(&id)?.ok_or(ApiError::NotFound)?;
    let stats = state.db.user_stats(&id)?;

    Ok(Json(ReputationResponse {
        user_id,
        rating: stats.rating,
        rating_count: stats.rating_count,
    }))
}
