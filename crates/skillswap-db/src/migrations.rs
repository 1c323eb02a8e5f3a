use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id              TEXT PRIMARY KEY,
            username        TEXT NOT NULL UNIQUE,
            email           TEXT NOT NULL UNIQUE,
            password        TEXT NOT NULL,
            bio             TEXT,
            location        TEXT,
            lat             REAL,
            lon             REAL,
            avatar_url      TEXT,
            credits         INTEGER NOT NULL DEFAULT 0,
            role            TEXT NOT NULL DEFAULT 'user',
            verified        INTEGER NOT NULL DEFAULT 0,
            otp_code        TEXT,
            otp_purpose     TEXT,
            otp_expires_at  TEXT,
            pending_email   TEXT,
            created_at      TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS skills (
            id          TEXT PRIMARY KEY,
            owner_id    TEXT NOT NULL REFERENCES users(id),
            title       TEXT NOT NULL,
            description TEXT NOT NULL,
            category    TEXT NOT NULL,
            kind        TEXT NOT NULL CHECK (kind IN ('offer', 'request')),
            tags        TEXT NOT NULL DEFAULT '[]',
            location    TEXT,
            lat         REAL,
            lon         REAL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_skills_owner ON skills(owner_id);
        CREATE INDEX IF NOT EXISTS idx_skills_kind_category ON skills(kind, category);

        CREATE TABLE IF NOT EXISTS chat_requests (
            id           TEXT PRIMARY KEY,
            sender_id    TEXT NOT NULL REFERENCES users(id),
            receiver_id  TEXT NOT NULL REFERENCES users(id),
            status       TEXT NOT NULL DEFAULT 'pending'
                         CHECK (status IN ('pending', 'accepted', 'rejected')),
            created_at   TEXT NOT NULL DEFAULT (datetime('now')),
            responded_at TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_chat_requests_receiver
            ON chat_requests(receiver_id, status);
        CREATE INDEX IF NOT EXISTS idx_chat_requests_sender
            ON chat_requests(sender_id, status);

        -- user_a/user_b are the pair in normalized (ascending) order; the
        -- UNIQUE constraint makes concurrent first-contact sends converge
        -- on a single row.
        CREATE TABLE IF NOT EXISTS conversations (
            id              TEXT PRIMARY KEY,
            user_a          TEXT NOT NULL REFERENCES users(id),
            user_b          TEXT NOT NULL REFERENCES users(id),
            last_message_id TEXT REFERENCES messages(id),
            created_at      TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(user_a, user_b)
        );

        CREATE TABLE IF NOT EXISTS messages (
            id              TEXT PRIMARY KEY,
            conversation_id TEXT NOT NULL REFERENCES conversations(id),
            sender_id       TEXT NOT NULL REFERENCES users(id),
            receiver_id     TEXT NOT NULL REFERENCES users(id),
            body            TEXT NOT NULL,
            read            INTEGER NOT NULL DEFAULT 0,
            created_at      TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_messages_conversation
            ON messages(conversation_id, created_at);

        -- Skill references are soft: a skill can be deleted while
        -- proposals that mention it live on.
        CREATE TABLE IF NOT EXISTS proposals (
            id                 TEXT PRIMARY KEY,
            proposer_id        TEXT NOT NULL REFERENCES users(id),
            receiver_id        TEXT NOT NULL REFERENCES users(id),
            offered_skill_id   TEXT NOT NULL,
            requested_skill_id TEXT NOT NULL,
            credits            INTEGER NOT NULL DEFAULT 0,
            note               TEXT,
            status             TEXT NOT NULL DEFAULT 'pending'
                               CHECK (status IN ('pending', 'accepted', 'rejected', 'completed')),
            created_at         TEXT NOT NULL DEFAULT (datetime('now')),
            responded_at       TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_proposals_receiver ON proposals(receiver_id, status);
        CREATE INDEX IF NOT EXISTS idx_proposals_proposer ON proposals(proposer_id, status);

        CREATE TABLE IF NOT EXISTS ratings (
            id          TEXT PRIMARY KEY,
            proposal_id TEXT NOT NULL REFERENCES proposals(id),
            rater_id    TEXT NOT NULL REFERENCES users(id),
            rated_id    TEXT NOT NULL REFERENCES users(id),
            stars       INTEGER NOT NULL CHECK (stars BETWEEN 1 AND 5),
            comment     TEXT,
            created_at  TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(proposal_id, rater_id)
        );

        CREATE INDEX IF NOT EXISTS idx_ratings_rated ON ratings(rated_id);

        CREATE TABLE IF NOT EXISTS credit_ledger (
            id          TEXT PRIMARY KEY,
            user_id     TEXT NOT NULL REFERENCES users(id),
            delta       INTEGER NOT NULL,
            reason      TEXT NOT NULL,
            proposal_id TEXT REFERENCES proposals(id),
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_ledger_user ON credit_ledger(user_id, created_at);

        CREATE TABLE IF NOT EXISTS reports (
            id               TEXT PRIMARY KEY,
            reporter_id      TEXT NOT NULL REFERENCES users(id),
            reported_user_id TEXT NOT NULL REFERENCES users(id),
            skill_id         TEXT,
            conversation_id  TEXT,
            reason           TEXT NOT NULL,
            status           TEXT NOT NULL DEFAULT 'open'
                             CHECK (status IN ('open', 'resolved')),
            created_at       TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_reports_status ON reports(status, created_at);

        CREATE TABLE IF NOT EXISTS notifications (
            id          TEXT PRIMARY KEY,
            user_id     TEXT NOT NULL REFERENCES users(id),
            kind        TEXT NOT NULL,
            body        TEXT NOT NULL,
            read        INTEGER NOT NULL DEFAULT 0,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_notifications_user
            ON notifications(user_id, read, created_at);

        CREATE TABLE IF NOT EXISTS push_tokens (
            user_id     TEXT NOT NULL REFERENCES users(id),
            token       TEXT NOT NULL,
            platform    TEXT NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(user_id, token)
        );
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
