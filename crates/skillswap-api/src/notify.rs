use tracing::warn;
use uuid::Uuid;

use skillswap_types::events::GatewayEvent;
use skillswap_types::models::Notification;

use crate::state::AppStateInner;

/// Persist a notification and fan it out: `new_notification` to the user's
/// live session when connected, push tokens otherwise. Entirely
/// best-effort: failures are logged and never bubble into the operation
/// that triggered the notification.
pub async fn notify_user(state: &AppStateInner, user_id: Uuid, kind: &str, body: &str) {
    let notification_id = Uuid::new_v4();
    if let Err(e) =
        state
            .db
            .insert_notification(&notification_id.to_string(), &user_id.to_string(), kind, body)
    {
        warn!("failed to persist notification for {}: {}", user_id, e);
        return;
    }

    let notification = Notification {
        id: notification_id,
        user_id,
        kind: kind.to_string(),
        body: body.to_string(),
        read: false,
        created_at: chrono::Utc::now(),
    };

    let delivered = state
        .dispatcher
        .send_to_user(user_id, GatewayEvent::NewNotification { notification })
        .await;

    if !delivered {
        push_to_user(state, user_id, "SkillSwap", body).await;
    }
}

/// Fire push notifications at every registered device token. Best-effort.
pub async fn push_to_user(state: &AppStateInner, user_id: Uuid, title: &str, body: &str) {
    let Some(push) = &state.providers.push else {
        return;
    };

    let tokens = match state.db.push_tokens_for(&user_id.to_string()) {
        Ok(tokens) => tokens,
        Err(e) => {
            warn!("failed to load push tokens for {}: {}", user_id, e);
            return;
        }
    };

    for token in tokens {
        if let Err(e) = push.notify(&token.token, title, body).await {
            warn!("push notification to {} failed: {}", user_id, e);
        }
    }
}
