use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use tracing::error;
use uuid::Uuid;

use skillswap_types::api::{Claims, MessagePage, SendMessageRequest};
use skillswap_types::events::GatewayEvent;

use crate::error::{ApiError, ApiResult};
use crate::notify;
use crate::profanity;
use crate::state::AppState;
use crate::view;

const DEFAULT_PAGE: u32 = 50;
const MAX_PAGE: u32 = 200;
const MAX_BODY_LEN: usize = 2000;

/// Send a message. The chat-request gate applies: without an existing
/// conversation or an accepted request between the pair, nothing is
/// persisted and the caller gets a 403. Delivery to the receiver is
/// fire-and-forget: live session first, push fallback when offline.
pub async fn send_message(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SendMessageRequest>,
) -> ApiResult<impl IntoResponse> {
    let body = req.body.trim().to_string();
    if body.is_empty() || body.len() > MAX_BODY_LEN {
        return Err(ApiError::BadRequest(format!(
            "message must be 1-{MAX_BODY_LEN} characters"
        )));
    }
    if profanity::contains_profanity(&body) {
        return Err(ApiError::BadRequest("message contains blocked language".into()));
    }
    if req.receiver_id == claims.sub {
        return Err(ApiError::BadRequest("cannot message yourself".into()));
    }

    let sender_id = claims.sub.to_string();
    let receiver_id = req.receiver_id.to_string();

    // Run blocking DB work off the async runtime
    let db_state = state.clone();
    let message_row = tokio::task::spawn_blocking(move || -> ApiResult<_> {
        db_state
            .db
            .get_user_by_id(&receiver_id)?
            .ok_or(ApiError::NotFound)?;

        let conversation = resolve_conversation(&db_state.db, &sender_id, &receiver_id)?;

        let message_id = Uuid::new_v4();
        let row = db_state.db.insert_message(
            &message_id.to_string(),
            &conversation.id,
            &sender_id,
            &receiver_id,
            &body,
        )?;
        Ok(row)
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        ApiError::Internal(anyhow::anyhow!(e))
    })??;

    let message = view::message(message_row);

    let delivered = state
        .dispatcher
        .send_to_user(
            req.receiver_id,
            GatewayEvent::NewMessage {
                message: message.clone(),
            },
        )
        .await;

    if !delivered {
        notify::push_to_user(
            &state,
            req.receiver_id,
            &claims.username,
            &truncate(&message.body, 120),
        )
        .await;
    }

    Ok((StatusCode::CREATED, Json(message)))
}

pub async fn list_conversations(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let user_id = claims.sub.to_string();
    let db_state = state.clone();

    let rows = tokio::task::spawn_blocking(move || db_state.db.list_conversations(&user_id))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(anyhow::anyhow!(e))
        })??;

    let summaries: Vec<_> = rows.into_iter().map(view::conversation_summary).collect();
    Ok(Json(summaries))
}

pub async fn get_messages(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(conversation_id): Path<Uuid>,
    Query(page): Query<MessagePage>,
) -> ApiResult<impl IntoResponse> {
    let conversation = require_participant(&state, conversation_id, claims.sub)?;

    let limit = page.limit.unwrap_or(DEFAULT_PAGE).min(MAX_PAGE);
    let before = page.before;
    let db_state = state.clone();

    let mut rows = tokio::task::spawn_blocking(move || {
        db_state
            .db
            .get_messages(&conversation.id, limit, before.as_deref())
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        ApiError::Internal(anyhow::anyhow!(e))
    })??;

    // The query walks newest-first; the page reads oldest-first.
    rows.reverse();
    let messages: Vec<_> = rows.into_iter().map(view::message).collect();
    Ok(Json(messages))
}

pub async fn mark_read(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(conversation_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let conversation = require_participant(&state, conversation_id, claims.sub)?;
    let updated = state.db.mark_read(&conversation.id, &claims.sub.to_string())?;
    Ok(Json(json!({ "updated": updated })))
}

/// Sender-only delete; the peer's session learns via `messageDeleted`.
pub async fn delete_message(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(message_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let row = state
        .db
        .get_message(&message_id.to_string())?
        .ok_or(ApiError::NotFound)?;

    if row.sender_id != claims.sub.to_string() {
        return Err(ApiError::Forbidden("only the sender can delete a message".into()));
    }

    state.db.delete_message(&row.id)?;

    state
        .dispatcher
        .send_to_user(
            view::uid(&row.receiver_id),
            GatewayEvent::MessageDeleted {
                conversation_id: view::uid(&row.conversation_id),
                message_id,
            },
        )
        .await;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_conversation(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(conversation_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let conversation = require_participant(&state, conversation_id, claims.sub)?;

    let peer = if conversation.user_a == claims.sub.to_string() {
        view::uid(&conversation.user_b)
    } else {
        view::uid(&conversation.user_a)
    };

    state.db.delete_conversation(&conversation.id)?;

    state
        .dispatcher
        .send_to_user(peer, GatewayEvent::ConversationDeleted { conversation_id })
        .await;

    Ok(StatusCode::NO_CONTENT)
}

/// The chat-request gate: an existing conversation passes, otherwise an
/// accepted request between the pair is required before one is lazily
/// created (race-safe on the unique participant pair).
pub(crate) fn resolve_conversation(
    db: &skillswap_db::Database,
    sender_id: &str,
    receiver_id: &str,
) -> Result<skillswap_db::models::ConversationRow, ApiError> {
    if let Some(conversation) = db.conversation_between(sender_id, receiver_id)? {
        return Ok(conversation);
    }

    if !db.accepted_request_between(sender_id, receiver_id)? {
        return Err(ApiError::Forbidden(
            "no accepted chat request with this user".into(),
        ));
    }

    let conversation =
        db.get_or_create_conversation(&Uuid::new_v4().to_string(), sender_id, receiver_id)?;
    Ok(conversation)
}

fn require_participant(
    state: &AppState,
    conversation_id: Uuid,
    user: Uuid,
) -> Result<skillswap_db::models::ConversationRow, ApiError> {
    let conversation = state
        .db
        .get_conversation(&conversation_id.to_string())?
        .ok_or(ApiError::NotFound)?;

    let user = user.to_string();
    if conversation.user_a != user && conversation.user_b != user {
        return Err(ApiError::Forbidden("not your conversation".into()));
    }
    Ok(conversation)
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        let mut end = max;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}…", &s[..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skillswap_db::Database;

    fn seed_user(db: &Database, name: &str) -> String {
        let id = Uuid::new_v4().to_string();
        db.create_user(&id, name, &format!("{name}@example.com"), "hash")
            .unwrap();
        id
    }

    fn accept_request(db: &Database, sender: &str, receiver: &str) {
        let id = Uuid::new_v4().to_string();
        db.create_chat_request(&id, sender, receiver).unwrap();
        db.set_chat_request_status(&id, "accepted").unwrap();
    }

    #[test]
    fn gate_refuses_without_accepted_request() {
        let db = Database::open_in_memory().unwrap();
        let alice = seed_user(&db, "alice");
        let bob = seed_user(&db, "bob");

        let err = resolve_conversation(&db, &alice, &bob).unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
        // Nothing was created for the pair.
        assert!(db.conversation_between(&alice, &bob).unwrap().is_none());
    }

    #[test]
    fn gate_refuses_pending_and_rejected_requests() {
        let db = Database::open_in_memory().unwrap();
        let alice = seed_user(&db, "alice");
        let bob = seed_user(&db, "bob");

        let request_id = Uuid::new_v4().to_string();
        db.create_chat_request(&request_id, &alice, &bob).unwrap();
        assert!(resolve_conversation(&db, &alice, &bob).is_err());

        db.set_chat_request_status(&request_id, "rejected").unwrap();
        assert!(resolve_conversation(&db, &alice, &bob).is_err());
    }

    #[test]
    fn accepted_request_opens_the_gate_both_ways() {
        let db = Database::open_in_memory().unwrap();
        let alice = seed_user(&db, "alice");
        let bob = seed_user(&db, "bob");
        accept_request(&db, &alice, &bob);

        // The acceptor's side can also message first.
        let conversation = resolve_conversation(&db, &bob, &alice).unwrap();
        // Repeated sends from either side land in the same conversation.
        let again = resolve_conversation(&db, &alice, &bob).unwrap();
        assert_eq!(conversation.id, again.id);
    }

    #[test]
    fn conversation_outlives_its_request() {
        let db = Database::open_in_memory().unwrap();
        let alice = seed_user(&db, "alice");
        let bob = seed_user(&db, "bob");

        let request_id = Uuid::new_v4().to_string();
        db.create_chat_request(&request_id, &alice, &bob).unwrap();
        db.set_chat_request_status(&request_id, "accepted").unwrap();

        let conversation = resolve_conversation(&db, &alice, &bob).unwrap();

        // Re-rejecting the request later does not close an existing
        // conversation; the gate only guards creation.
        db.set_chat_request_status(&request_id, "rejected").unwrap();
        let still = resolve_conversation(&db, &alice, &bob).unwrap();
        assert_eq!(conversation.id, still.id);
    }
}
