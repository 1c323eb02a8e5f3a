//! Row -> API model conversions. SQLite hands back TEXT ids and
//! `datetime('now')` timestamps; the parsing (with corrupt-row warnings)
//! lives here so the handlers stay readable.

use chrono::{DateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use skillswap_db::models::{
    ChatRequestRow, ConversationListRow, CreditEntryRow, MessageRow, NotificationRow, ProposalRow,
    ReportRow, SkillRow, UserRow,
};
use skillswap_db::models::UserStats;
use skillswap_types::models::{
    Account, ChatRequest, ChatRequestStatus, ConversationSummary, CreditEntry, Message,
    Notification, Proposal, ProposalStatus, Report, ReportStatus, Role, Skill, SkillKind,
    UserProfile,
};

pub fn uid(s: &str) -> Uuid {
    s.parse().unwrap_or_else(|e| {
        warn!("Corrupt id '{}': {}", s, e);
        Uuid::default()
    })
}

pub fn ts(s: &str) -> DateTime<Utc> {
    s.parse::<DateTime<Utc>>()
        .or_else(|_| {
            // SQLite stores timestamps as "YYYY-MM-DD HH:MM:SS" without
            // timezone. Parse as naive UTC and convert.
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt timestamp '{}': {}", s, e);
            DateTime::default()
        })
}

fn opt_ts(s: &Option<String>) -> Option<DateTime<Utc>> {
    s.as_deref().map(ts)
}

pub fn user_profile(row: &UserRow, stats: &UserStats) -> UserProfile {
    UserProfile {
        id: uid(&row.id),
        username: row.username.clone(),
        bio: row.bio.clone(),
        location: row.location.clone(),
        avatar_url: row.avatar_url.clone(),
        skills_offered: stats.skills_offered,
        skills_wanted: stats.skills_wanted,
        swaps_completed: stats.swaps_completed,
        rating: stats.rating,
        rating_count: stats.rating_count,
        created_at: ts(&row.created_at),
    }
}

pub fn account(row: &UserRow, stats: &UserStats) -> Account {
    Account {
        profile: user_profile(row, stats),
        email: row.email.clone(),
        credits: row.credits,
        role: Role::parse(&row.role),
        verified: row.verified,
    }
}

pub fn skill(row: SkillRow) -> Skill {
    let tags: Vec<String> = serde_json::from_str(&row.tags).unwrap_or_else(|e| {
        warn!("Corrupt tags on skill '{}': {}", row.id, e);
        Vec::new()
    });
    Skill {
        id: uid(&row.id),
        owner_id: uid(&row.owner_id),
        owner_username: row.owner_username,
        title: row.title,
        description: row.description,
        category: row.category,
        kind: SkillKind::parse(&row.kind).unwrap_or(SkillKind::Offer),
        tags,
        location: row.location,
        lat: row.lat,
        lon: row.lon,
        created_at: ts(&row.created_at),
        updated_at: ts(&row.updated_at),
    }
}

pub fn chat_request(row: ChatRequestRow) -> ChatRequest {
    ChatRequest {
        id: uid(&row.id),
        sender_id: uid(&row.sender_id),
        sender_username: row.sender_username,
        receiver_id: uid(&row.receiver_id),
        receiver_username: row.receiver_username,
        status: ChatRequestStatus::parse(&row.status).unwrap_or(ChatRequestStatus::Pending),
        created_at: ts(&row.created_at),
        responded_at: opt_ts(&row.responded_at),
    }
}

pub fn message(row: MessageRow) -> Message {
    Message {
        id: uid(&row.id),
        conversation_id: uid(&row.conversation_id),
        sender_id: uid(&row.sender_id),
        receiver_id: uid(&row.receiver_id),
        body: row.body,
        read: row.read,
        created_at: ts(&row.created_at),
    }
}

pub fn conversation_summary(row: ConversationListRow) -> ConversationSummary {
    ConversationSummary {
        id: uid(&row.id),
        peer_id: uid(&row.peer_id),
        peer_username: row.peer_username,
        peer_avatar_url: row.peer_avatar_url,
        last_message: row.last_message.map(message),
        unread_count: row.unread_count,
        created_at: ts(&row.created_at),
    }
}

pub fn proposal(row: ProposalRow) -> Proposal {
    Proposal {
        id: uid(&row.id),
        proposer_id: uid(&row.proposer_id),
        receiver_id: uid(&row.receiver_id),
        offered_skill_id: uid(&row.offered_skill_id),
        offered_skill_title: row.offered_skill_title,
        requested_skill_id: uid(&row.requested_skill_id),
        requested_skill_title: row.requested_skill_title,
        credits: row.credits,
        note: row.note,
        status: ProposalStatus::parse(&row.status).unwrap_or(ProposalStatus::Pending),
        created_at: ts(&row.created_at),
        responded_at: opt_ts(&row.responded_at),
    }
}

pub fn report(row: ReportRow) -> Report {
    Report {
        id: uid(&row.id),
        reporter_id: uid(&row.reporter_id),
        reported_user_id: uid(&row.reported_user_id),
        skill_id: row.skill_id.as_deref().map(uid),
        conversation_id: row.conversation_id.as_deref().map(uid),
        reason: row.reason,
        status: ReportStatus::parse(&row.status),
        created_at: ts(&row.created_at),
    }
}

pub fn notification(row: NotificationRow) -> Notification {
    Notification {
        id: uid(&row.id),
        user_id: uid(&row.user_id),
        kind: row.kind,
        body: row.body,
        read: row.read,
        created_at: ts(&row.created_at),
    }
}

pub fn credit_entry(row: CreditEntryRow) -> CreditEntry {
    CreditEntry {
        id: uid(&row.id),
        delta: row.delta,
        reason: row.reason,
        proposal_id: row.proposal_id.as_deref().map(uid),
        created_at: ts(&row.created_at),
    }
}
