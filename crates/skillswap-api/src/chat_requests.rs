use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use skillswap_types::api::{Claims, SendChatRequest};
use skillswap_types::models::ChatRequestStatus;

use crate::error::{ApiError, ApiResult};
use crate::notify;
use crate::state::AppState;
use crate::view;

pub async fn send(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SendChatRequest>,
) -> ApiResult<impl IntoResponse> {
    if req.receiver_id == claims.sub {
        return Err(ApiError::BadRequest("cannot send a chat request to yourself".into()));
    }

    let receiver_id = req.receiver_id.to_string();
    let sender_id = claims.sub.to_string();

    state
        .db
        .get_user_by_id(&receiver_id)?
        .ok_or(ApiError::NotFound)?;

    // One live request per pair, regardless of direction.
    if state.db.live_request_between(&sender_id, &receiver_id)?.is_some() {
        return Err(ApiError::Conflict(
            "a chat request between you already exists".into(),
        ));
    }

    let request_id = Uuid::new_v4();
    state
        .db
        .create_chat_request(&request_id.to_string(), &sender_id, &receiver_id)?;

    notify::notify_user(
        &state,
        req.receiver_id,
        "chat_request",
        &format!("{} wants to chat with you", claims.username),
    )
    .await;

    let row = state
        .db
        .get_chat_request(&request_id.to_string())?
        .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("chat request vanished after insert")))?;

    Ok((StatusCode::CREATED, Json(view::chat_request(row))))
}

pub async fn accept(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(request_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    respond(state, claims, request_id, ChatRequestStatus::Accepted).await
}

pub async fn reject(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(request_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    respond(state, claims, request_id, ChatRequestStatus::Rejected).await
}

/// Only the receiver of a pending request may resolve it.
async fn respond(
    state: AppState,
    claims: Claims,
    request_id: Uuid,
    status: ChatRequestStatus,
) -> ApiResult<impl IntoResponse> {
    let row = state
        .db
        .get_chat_request(&request_id.to_string())?
        .ok_or(ApiError::NotFound)?;

    if row.receiver_id != claims.sub.to_string() {
        return Err(ApiError::Forbidden("not your chat request".into()));
    }
    if row.status != "pending" {
        return Err(ApiError::Conflict("chat request already resolved".into()));
    }

    state
        .db
        .set_chat_request_status(&request_id.to_string(), status.as_str())?;

    if status == ChatRequestStatus::Accepted {
        notify::notify_user(
            &state,
            view::uid(&row.sender_id),
            "chat_request_accepted",
            &format!("{} accepted your chat request", claims.username),
        )
        .await;
    }

    let row = state
        .db
        .get_chat_request(&request_id.to_string())?
        .ok_or(ApiError::NotFound)?;

    Ok(Json(view::chat_request(row)))
}

pub async fn list(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let rows = state.db.list_chat_requests_for(&claims.sub.to_string())?;
    let requests: Vec<_> = rows.into_iter().map(view::chat_request).collect();
    Ok(Json(requests))
}
