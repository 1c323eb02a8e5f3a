use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router,
    extract::{State, WebSocketUpgrade},
    middleware,
    response::IntoResponse,
    routing::{delete, get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use skillswap_api::state::{AppState, AppStateInner};
use skillswap_api::{
    admin, auth, chat_requests, messages, notifications, proposals, push, reports, reputation,
    rewards, skills, users,
};
use skillswap_gateway::connection;
use skillswap_gateway::dispatcher::Dispatcher;
use skillswap_providers::{GenAiClient, Geocoder, Mailer, Providers, PushClient, VideoSearch};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "skillswap=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let jwt_secret =
        std::env::var("SKILLSWAP_JWT_SECRET").unwrap_or_else(|_| "dev-secret-change-me".into());
    let db_path = std::env::var("SKILLSWAP_DB_PATH").unwrap_or_else(|_| "skillswap.db".into());
    let host = std::env::var("SKILLSWAP_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("SKILLSWAP_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;

    // Init database
    let db = skillswap_db::Database::open(&PathBuf::from(&db_path))?;

    // Promote the configured admin account, if it exists yet.
    if let Ok(admin) = std::env::var("SKILLSWAP_ADMIN_USERNAME") {
        if db.set_role_by_username(&admin, "admin")? {
            info!("admin role granted to {}", admin);
        }
    }

    // Providers
    let providers = build_providers()?;

    // Shared state
    let dispatcher = Dispatcher::new();
    let app_state: AppState = Arc::new(AppStateInner {
        db,
        dispatcher: dispatcher.clone(),
        providers,
        jwt_secret: jwt_secret.clone(),
    });

    // Routes
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/verify-email", post(auth::verify_email))
        .route("/auth/login", post(auth::login))
        .route("/auth/forgot-password", post(auth::forgot_password))
        .route("/auth/reset-password", post(auth::reset_password))
        .with_state(app_state.clone());

    let protected_routes = Router::new()
        .route("/auth/change-email", post(auth::change_email))
        .route("/auth/confirm-email-change", post(auth::confirm_email_change))
        .route("/users/me", get(users::me).put(users::update_profile))
        .route("/users/{user_id}", get(users::get_user))
        .route("/skills", post(skills::create_skill).get(skills::list_skills))
        .route("/skills/suggest-description", post(skills::suggest_description))
        .route(
            "/skills/{skill_id}",
            get(skills::get_skill)
                .put(skills::update_skill)
                .delete(skills::delete_skill),
        )
        .route("/skills/{skill_id}/matches", get(skills::matching_skills))
        .route("/skills/{skill_id}/tutorials", get(skills::skill_tutorials))
        .route("/chat-requests", post(chat_requests::send).get(chat_requests::list))
        .route("/chat-requests/{request_id}/accept", post(chat_requests::accept))
        .route("/chat-requests/{request_id}/reject", post(chat_requests::reject))
        .route("/messages", post(messages::send_message))
        .route("/messages/{message_id}", delete(messages::delete_message))
        .route("/conversations", get(messages::list_conversations))
        .route("/conversations/{conversation_id}", delete(messages::delete_conversation))
        .route("/conversations/{conversation_id}/messages", get(messages::get_messages))
        .route("/conversations/{conversation_id}/read", post(messages::mark_read))
        .route("/proposals", post(proposals::create).get(proposals::list))
        .route("/proposals/{proposal_id}/accept", post(proposals::accept))
        .route("/proposals/{proposal_id}/reject", post(proposals::reject))
        .route("/proposals/{proposal_id}/complete", post(proposals::complete))
        .route("/reputation/rate", post(reputation::rate))
        .route("/reputation/{user_id}", get(reputation::get_reputation))
        .route("/rewards/credits", get(rewards::credits))
        .route("/reports", post(reports::create_report))
        .route("/notifications", get(notifications::list))
        .route("/notifications/read-all", post(notifications::mark_all_read))
        .route("/notifications/{notification_id}/read", post(notifications::mark_read))
        .route("/push/token", post(push::register_token).delete(push::unregister_token))
        .route("/admin/reports", get(admin::list_reports))
        .route("/admin/reports/{report_id}/resolve", post(admin::resolve_report))
        .route("/admin/skills/{skill_id}", delete(admin::remove_skill))
        .route_layer(middleware::from_fn_with_state(
            app_state.clone(),
            skillswap_api::middleware::require_auth,
        ))
        .with_state(app_state.clone());

    let ws_route = Router::new()
        .route("/gateway", get(ws_upgrade))
        .with_state(app_state);

    let app = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(ws_route)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("SkillSwap server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn ws_upgrade(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    let dispatcher = state.dispatcher.clone();
    let jwt_secret = state.jwt_secret.clone();
    ws.on_upgrade(move |socket| connection::handle_connection(socket, dispatcher, jwt_secret))
}

/// Wire up the external collaborators from the environment. Everything is
/// optional except email, which falls back to dev-mode logging, so a bare
/// `cargo run` comes up with the gate open and push/geo/video disabled.
fn build_providers() -> anyhow::Result<Providers> {
    let genai = match std::env::var("SKILLSWAP_GENAI_KEYS") {
        Ok(keys) => {
            let keys: Vec<String> = keys
                .split(',')
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty())
                .collect();
            if keys.is_empty() {
                None
            } else {
                let mut client = GenAiClient::new(keys)?;
                if let Ok(model) = std::env::var("SKILLSWAP_GENAI_MODEL") {
                    client = client.with_model(model);
                }
                Some(client)
            }
        }
        Err(_) => None,
    };

    let mailer = Mailer::new(
        std::env::var("SKILLSWAP_MAIL_API_URL")
            .unwrap_or_else(|_| "https://api.mail.invalid".into()),
        std::env::var("SKILLSWAP_MAIL_API_KEY").ok(),
        std::env::var("SKILLSWAP_MAIL_FROM").unwrap_or_else(|_| "noreply@skillswap.app".into()),
    );

    let push = match (
        std::env::var("SKILLSWAP_PUSH_API_URL"),
        std::env::var("SKILLSWAP_PUSH_SERVER_KEY"),
    ) {
        (Ok(url), Ok(key)) => Some(PushClient::new(url, key)),
        _ => None,
    };

    let geocoder = std::env::var("SKILLSWAP_GEOCODE_URL").ok().map(Geocoder::new);

    let videos = match (
        std::env::var("SKILLSWAP_VIDEO_API_URL"),
        std::env::var("SKILLSWAP_VIDEO_API_KEY"),
    ) {
        (Ok(url), Ok(key)) => Some(VideoSearch::new(url, key)),
        _ => None,
    };

    Ok(Providers {
        genai,
        mailer,
        push,
        geocoder,
        videos,
    })
}
