use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{CreditEntry, SkillKind};

// -- JWT Claims --

/// JWT claims shared between skillswap-api (REST middleware) and
/// skillswap-gateway (WebSocket Identify). Canonical definition lives here
/// to eliminate duplication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub role: String,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user_id: Uuid,
    /// Verification is pending until the emailed code is confirmed.
    pub verification_required: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VerifyEmailRequest {
    pub email: String,
    pub code: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user_id: Uuid,
    pub username: String,
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResetPasswordRequest {
    pub email: String,
    pub code: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChangeEmailRequest {
    pub new_email: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfirmEmailChangeRequest {
    pub code: String,
}

// -- Users --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateProfileRequest {
    pub bio: Option<String>,
    pub location: Option<String>,
    pub avatar_url: Option<String>,
}

// -- Skills --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateSkillRequest {
    pub title: String,
    pub description: String,
    pub category: String,
    pub kind: SkillKind,
    pub location: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateSkillRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub location: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SkillFilter {
    pub keyword: Option<String>,
    pub category: Option<String>,
    pub kind: Option<SkillKind>,
    pub owner: Option<Uuid>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub radius_km: Option<f64>,
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct MatchedSkill {
    #[serde(flatten)]
    pub skill: crate::models::Skill,
    pub score: i64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SuggestDescriptionRequest {
    pub title: String,
    pub category: String,
}

#[derive(Debug, Serialize)]
pub struct SuggestDescriptionResponse {
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TutorialVideo {
    pub title: String,
    pub url: String,
    pub channel: Option<String>,
}

// -- Chat requests --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendChatRequest {
    pub receiver_id: Uuid,
}

// -- Messaging --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendMessageRequest {
    pub receiver_id: Uuid,
    pub body: String,
}

#[derive(Debug, Deserialize)]
pub struct MessagePage {
    pub limit: Option<u32>,
    /// Cursor: pass the `created_at` of the oldest message from the
    /// previous page to fetch older messages.
    pub before: Option<String>,
}

// -- Proposals --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateProposalRequest {
    pub receiver_id: Uuid,
    pub offered_skill_id: Uuid,
    pub requested_skill_id: Uuid,
    #[serde(default)]
    pub credits: i64,
    pub note: Option<String>,
}

// -- Reputation / rewards --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RateRequest {
    pub proposal_id: Uuid,
    pub stars: u8,
    pub comment: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ReputationResponse {
    pub user_id: Uuid,
    pub rating: Option<f64>,
    pub rating_count: u32,
}

#[derive(Debug, Serialize)]
pub struct CreditsResponse {
    pub balance: i64,
    pub ledger: Vec<CreditEntry>,
}

// -- Reports --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateReportRequest {
    pub reported_user_id: Uuid,
    pub skill_id: Option<Uuid>,
    pub conversation_id: Option<Uuid>,
    pub reason: String,
}

// -- Push --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PushTokenRequest {
    pub token: String,
    pub platform: String,
}
