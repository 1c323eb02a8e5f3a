use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use skillswap_types::api::{Claims, CreateProposalRequest};
use skillswap_types::models::{ProposalStatus, SkillKind};

use crate::error::{ApiError, ApiResult};
use crate::notify;
use crate::state::AppState;
use crate::view;

pub async fn create(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateProposalRequest>,
) -> ApiResult<impl IntoResponse> {
    if req.receiver_id == claims.sub {
        return Err(ApiError::BadRequest("cannot propose a swap with yourself".into()));
    }
    if req.credits < 0 {
        return Err(ApiError::BadRequest("credits cannot be negative".into()));
    }

    let proposer_id = claims.sub.to_string();
    let receiver_id = req.receiver_id.to_string();

    let offered = state
        .db
        .get_skill(&req.offered_skill_id.to_string())?
        .ok_or(ApiError::NotFound)?;
    if offered.owner_id != proposer_id {
        return Err(ApiError::Forbidden("offered skill is not yours".into()));
    }
    if offered.kind != SkillKind::Offer.as_str() {
        return Err(ApiError::BadRequest("offered skill must be an offer posting".into()));
    }

    let requested = state
        .db
        .get_skill(&req.requested_skill_id.to_string())?
        .ok_or(ApiError::NotFound)?;
    if requested.owner_id != receiver_id {
        return Err(ApiError::BadRequest(
            "requested skill does not belong to the receiver".into(),
        ));
    }

    // The sweetener is only promised here; it moves on completion. Still
    // refuse proposals the proposer can't cover right now.
    if req.credits > 0 && state.db.get_credits(&proposer_id)? < req.credits {
        return Err(ApiError::BadRequest("not enough credits".into()));
    }

    let proposal_id = Uuid::new_v4();
    state.db.insert_proposal(
        &proposal_id.to_string(),
        &proposer_id,
        &receiver_id,
        &offered.id,
        &requested.id,
        req.credits,
        req.note.as_deref(),
    )?;

    notify::notify_user(
        &state,
        req.receiver_id,
        "proposal",
        &format!(
            "{} proposed swapping \"{}\" for your \"{}\"",
            claims.username, offered.title, requested.title
        ),
    )
    .await;

    let row = state
        .db
        .get_proposal(&proposal_id.to_string())?
        .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("proposal vanished after insert")))?;

    Ok((StatusCode::CREATED, Json(view::proposal(row))))
}

pub async fn accept(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(proposal_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    respond(state, claims, proposal_id, ProposalStatus::Accepted).await
}

pub async fn reject(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(proposal_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    respond(state, claims, proposal_id, ProposalStatus::Rejected).await
}

async fn respond(
    state: AppState,
    claims: Claims,
    proposal_id: Uuid,
    status: ProposalStatus,
) -> ApiResult<impl IntoResponse> {
    let row = state
        .db
        .get_proposal(&proposal_id.to_string())?
        .ok_or(ApiError::NotFound)?;

    if row.receiver_id != claims.sub.to_string() {
        return Err(ApiError::Forbidden("not your proposal".into()));
    }
    if row.status != "pending" {
        return Err(ApiError::Conflict("proposal already resolved".into()));
    }

    state
        .db
        .set_proposal_status(&proposal_id.to_string(), status.as_str())?;

    if status == ProposalStatus::Accepted {
        notify::notify_user(
            &state,
            view::uid(&row.proposer_id),
            "proposal_accepted",
            &format!("{} accepted your swap proposal", claims.username),
        )
        .await;
    }

    let row = state
        .db
        .get_proposal(&proposal_id.to_string())?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(view::proposal(row)))
}

/// Either party of an accepted proposal can mark the swap done. Completion
/// moves the credit sweetener through the ledger and unlocks rating; the
/// swaps-completed counters are derived, so there is nothing else to bump.
pub async fn complete(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(proposal_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let row = state
        .db
        .get_proposal(&proposal_id.to_string())?
        .ok_or(ApiError::NotFound)?;

    let caller = claims.sub.to_string();
    if row.proposer_id != caller && row.receiver_id != caller {
        return Err(ApiError::Forbidden("not your proposal".into()));
    }
    if row.status != "accepted" {
        return Err(ApiError::Conflict("only an accepted proposal can be completed".into()));
    }

    if row.credits > 0 {
        let moved = state.db.transfer_credits(
            (
                &Uuid::new_v4().to_string(),
                &Uuid::new_v4().to_string(),
            ),
            &row.proposer_id,
            &row.receiver_id,
            row.credits,
            "swap_completed",
            Some(&row.id),
        )?;
        if !moved {
            return Err(ApiError::BadRequest(
                "proposer no longer has enough credits".into(),
            ));
        }
    }

    state
        .db
        .set_proposal_status(&proposal_id.to_string(), ProposalStatus::Completed.as_str())?;

    let other = if row.proposer_id == caller {
        view::uid(&row.receiver_id)
    } else {
        view::uid(&row.proposer_id)
    };
    notify::notify_user(
        &state,
        other,
        "swap_completed",
        &format!("{} marked your swap as completed", claims.username),
    )
    .await;

    let row = state
        .db
        .get_proposal(&proposal_id.to_string())?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(view::proposal(row)))
}

pub async fn list(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let rows = state.db.list_proposals_for(&claims.sub.to_string())?;
    let proposals: Vec<_> = rows.into_iter().map(view::proposal).collect();
    Ok(Json(proposals))
}
