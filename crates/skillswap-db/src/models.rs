/// Database row types — these map directly to SQLite rows.
/// Distinct from skillswap-types API models to keep the DB layer independent.

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub avatar_url: Option<String>,
    pub credits: i64,
    pub role: String,
    pub verified: bool,
    pub otp_code: Option<String>,
    pub otp_purpose: Option<String>,
    pub otp_expires_at: Option<String>,
    pub pending_email: Option<String>,
    pub created_at: String,
}

/// Derived per-user counters, computed on read and never stored.
pub struct UserStats {
    pub skills_offered: u32,
    pub skills_wanted: u32,
    pub swaps_completed: u32,
    pub rating: Option<f64>,
    pub rating_count: u32,
}

pub struct SkillRow {
    pub id: String,
    pub owner_id: String,
    pub owner_username: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub kind: String,
    /// JSON array of derived tags.
    pub tags: String,
    pub location: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub created_at: String,
    pub updated_at: String,
}

pub struct ChatRequestRow {
    pub id: String,
    pub sender_id: String,
    pub sender_username: String,
    pub receiver_id: String,
    pub receiver_username: String,
    pub status: String,
    pub created_at: String,
    pub responded_at: Option<String>,
}

#[derive(Debug)]
pub struct ConversationRow {
    pub id: String,
    pub user_a: String,
    pub user_b: String,
    pub last_message_id: Option<String>,
    pub created_at: String,
}

pub struct MessageRow {
    pub id: String,
    pub conversation_id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub body: String,
    pub read: bool,
    pub created_at: String,
}

/// One row of the conversation listing aggregation: peer + last message +
/// unread count, assembled in a single query.
pub struct ConversationListRow {
    pub id: String,
    pub peer_id: String,
    pub peer_username: String,
    pub peer_avatar_url: Option<String>,
    pub last_message: Option<MessageRow>,
    pub unread_count: u32,
    pub created_at: String,
}

pub struct ProposalRow {
    pub id: String,
    pub proposer_id: String,
    pub receiver_id: String,
    pub offered_skill_id: String,
    pub offered_skill_title: String,
    pub requested_skill_id: String,
    pub requested_skill_title: String,
    pub credits: i64,
    pub note: Option<String>,
    pub status: String,
    pub created_at: String,
    pub responded_at: Option<String>,
}

pub struct ReportRow {
    pub id: String,
    pub reporter_id: String,
    pub reported_user_id: String,
    pub skill_id: Option<String>,
    pub conversation_id: Option<String>,
    pub reason: String,
    pub status: String,
    pub created_at: String,
}

pub struct NotificationRow {
    pub id: String,
    pub user_id: String,
    pub kind: String,
    pub body: String,
    pub read: bool,
    pub created_at: String,
}

pub struct CreditEntryRow {
    pub id: String,
    pub user_id: String,
    pub delta: i64,
    pub reason: String,
    pub proposal_id: Option<String>,
    pub created_at: String,
}

pub struct PushTokenRow {
    pub token: String,
    pub platform: String,
}
