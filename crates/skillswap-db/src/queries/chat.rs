use crate::Database;
use crate::models::{ChatRequestRow, ConversationListRow, ConversationRow, MessageRow};
use crate::queries::OptionalExt;
use anyhow::{Result, anyhow};
use rusqlite::params;

const REQUEST_COLUMNS: &str = "r.id, r.sender_id, su.username, r.receiver_id, ru.username, \
     r.status, r.created_at, r.responded_at";

const REQUEST_JOINS: &str = "FROM chat_requests r \
     JOIN users su ON su.id = r.sender_id \
     JOIN users ru ON ru.id = r.receiver_id";

fn map_request(row: &rusqlite::Row<'_>) -> rusqlite::Result<ChatRequestRow> {
    Ok(ChatRequestRow {
        id: row.get(0)?,
        sender_id: row.get(1)?,
        sender_username: row.get(2)?,
        receiver_id: row.get(3)?,
        receiver_username: row.get(4)?,
        status: row.get(5)?,
        created_at: row.get(6)?,
        responded_at: row.get(7)?,
    })
}

fn map_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        sender_id: row.get(2)?,
        receiver_id: row.get(3)?,
        body: row.get(4)?,
        read: row.get::<_, i64>(5)? != 0,
        created_at: row.get(6)?,
    })
}

fn map_conversation(row: &rusqlite::Row<'_>) -> rusqlite::Result<ConversationRow> {
    Ok(ConversationRow {
        id: row.get(0)?,
        user_a: row.get(1)?,
        user_b: row.get(2)?,
        last_message_id: row.get(3)?,
        created_at: row.get(4)?,
    })
}

/// The conversation pair is stored in ascending order so the UNIQUE
/// constraint holds regardless of who sent first.
fn normalize_pair<'a>(x: &'a str, y: &'a str) -> (&'a str, &'a str) {
    if x <= y { (x, y) } else { (y, x) }
}

impl Database {
    // -- Chat requests --

    pub fn create_chat_request(&self, id: &str, sender_id: &str, receiver_id: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO chat_requests (id, sender_id, receiver_id) VALUES (?1, ?2, ?3)",
                params![id, sender_id, receiver_id],
            )?;
            Ok(())
        })
    }

    pub fn get_chat_request(&self, id: &str) -> Result<Option<ChatRequestRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {REQUEST_COLUMNS} {REQUEST_JOINS} WHERE r.id = ?1");
            let mut stmt = conn.prepare(&sql)?;
            let row = stmt.query_row([id], map_request).optional()?;
            Ok(row)
        })
    }

    /// A pending or accepted request linking the two users, in either
    /// direction. Used to refuse duplicate sends.
    pub fn live_request_between(&self, a: &str, b: &str) -> Result<Option<ChatRequestRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {REQUEST_COLUMNS} {REQUEST_JOINS}
                 WHERE r.status IN ('pending', 'accepted')
                   AND ((r.sender_id = ?1 AND r.receiver_id = ?2)
                     OR (r.sender_id = ?2 AND r.receiver_id = ?1))
                 LIMIT 1"
            );
            let mut stmt = conn.prepare(&sql)?;
            let row = stmt.query_row(params![a, b], map_request).optional()?;
            Ok(row)
        })
    }

    pub fn accepted_request_between(&self, a: &str, b: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let count: u32 = conn.query_row(
                "SELECT COUNT(*) FROM chat_requests
                 WHERE status = 'accepted'
                   AND ((sender_id = ?1 AND receiver_id = ?2)
                     OR (sender_id = ?2 AND receiver_id = ?1))",
                params![a, b],
                |row| row.get(0),
            )?;
            Ok(count > 0)
        })
    }

    pub fn set_chat_request_status(&self, id: &str, status: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE chat_requests SET status = ?2, responded_at = datetime('now') WHERE id = ?1",
                params![id, status],
            )?;
            Ok(())
        })
    }

    pub fn list_chat_requests_for(&self, user_id: &str) -> Result<Vec<ChatRequestRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {REQUEST_COLUMNS} {REQUEST_JOINS}
                 WHERE r.sender_id = ?1 OR r.receiver_id = ?1
                 ORDER BY r.created_at DESC, r.rowid DESC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([user_id], map_request)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Conversations --

    pub fn conversation_between(&self, x: &str, y: &str) -> Result<Option<ConversationRow>> {
        let (a, b) = normalize_pair(x, y);
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_a, user_b, last_message_id, created_at
                 FROM conversations WHERE user_a = ?1 AND user_b = ?2",
            )?;
            let row = stmt.query_row(params![a, b], map_conversation).optional()?;
            Ok(row)
        })
    }

    /// Race-safe lazy creation: INSERT OR IGNORE against the unique pair,
    /// then re-select. Two concurrent first sends land on the same row.
    pub fn get_or_create_conversation(&self, id: &str, x: &str, y: &str) -> Result<ConversationRow> {
        let (a, b) = normalize_pair(x, y);
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO conversations (id, user_a, user_b) VALUES (?1, ?2, ?3)",
                params![id, a, b],
            )?;
            let mut stmt = conn.prepare(
                "SELECT id, user_a, user_b, last_message_id, created_at
                 FROM conversations WHERE user_a = ?1 AND user_b = ?2",
            )?;
            let row = stmt.query_row(params![a, b], map_conversation)?;
            Ok(row)
        })
    }

    pub fn get_conversation(&self, id: &str) -> Result<Option<ConversationRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_a, user_b, last_message_id, created_at
                 FROM conversations WHERE id = ?1",
            )?;
            let row = stmt.query_row([id], map_conversation).optional()?;
            Ok(row)
        })
    }

    /// The conversation listing aggregation: peer summary + last message +
    /// unread count in one query, most recent activity first.
    pub fn list_conversations(&self, user_id: &str) -> Result<Vec<ConversationListRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT c.id,
                        CASE WHEN c.user_a = ?1 THEN c.user_b ELSE c.user_a END,
                        u.username, u.avatar_url,
                        m.id, m.conversation_id, m.sender_id, m.receiver_id,
                        m.body, m.read, m.created_at,
                        (SELECT COUNT(*) FROM messages
                         WHERE conversation_id = c.id AND receiver_id = ?1 AND read = 0),
                        c.created_at
                 FROM conversations c
                 JOIN users u
                   ON u.id = CASE WHEN c.user_a = ?1 THEN c.user_b ELSE c.user_a END
                 LEFT JOIN messages m ON m.id = c.last_message_id
                 WHERE c.user_a = ?1 OR c.user_b = ?1
                 ORDER BY COALESCE(m.created_at, c.created_at) DESC, c.rowid DESC",
            )?;

            let rows = stmt
                .query_map([user_id], |row| {
                    let last_message = match row.get::<_, Option<String>>(4)? {
                        Some(mid) => Some(MessageRow {
                            id: mid,
                            conversation_id: row.get(5)?,
                            sender_id: row.get(6)?,
                            receiver_id: row.get(7)?,
                            body: row.get(8)?,
                            read: row.get::<_, i64>(9)? != 0,
                            created_at: row.get(10)?,
                        }),
                        None => None,
                    };
                    Ok(ConversationListRow {
                        id: row.get(0)?,
                        peer_id: row.get(1)?,
                        peer_username: row.get(2)?,
                        peer_avatar_url: row.get(3)?,
                        last_message,
                        unread_count: row.get(11)?,
                        created_at: row.get(12)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Delete a conversation and everything in it.
    pub fn delete_conversation(&self, id: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            // last_message_id references a message row; clear it first so
            // the message delete doesn't trip the foreign key.
            tx.execute(
                "UPDATE conversations SET last_message_id = NULL WHERE id = ?1",
                [id],
            )?;
            tx.execute("DELETE FROM messages WHERE conversation_id = ?1", [id])?;
            tx.execute("DELETE FROM conversations WHERE id = ?1", [id])?;
            tx.commit()?;
            Ok(())
        })
    }

    // -- Messages --

    /// Persist a message and move the conversation's last-message pointer
    /// in the same transaction.
    pub fn insert_message(
        &self,
        id: &str,
        conversation_id: &str,
        sender_id: &str,
        receiver_id: &str,
        body: &str,
    ) -> Result<MessageRow> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO messages (id, conversation_id, sender_id, receiver_id, body)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![id, conversation_id, sender_id, receiver_id, body],
            )?;
            tx.execute(
                "UPDATE conversations SET last_message_id = ?1 WHERE id = ?2",
                params![id, conversation_id],
            )?;
            let row = tx.query_row(
                "SELECT id, conversation_id, sender_id, receiver_id, body, read, created_at
                 FROM messages WHERE id = ?1",
                [id],
                map_message,
            )?;
            tx.commit()?;
            Ok(row)
        })
    }

    pub fn get_message(&self, id: &str) -> Result<Option<MessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, conversation_id, sender_id, receiver_id, body, read, created_at
                 FROM messages WHERE id = ?1",
            )?;
            let row = stmt.query_row([id], map_message).optional()?;
            Ok(row)
        })
    }

    /// Newest-first page; pass the oldest `created_at` from the previous
    /// page as `before` to walk back.
    pub fn get_messages(
        &self,
        conversation_id: &str,
        limit: u32,
        before: Option<&str>,
    ) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let rows = match before {
                Some(before) => {
                    let mut stmt = conn.prepare(
                        "SELECT id, conversation_id, sender_id, receiver_id, body, read, created_at
                         FROM messages
                         WHERE conversation_id = ?1 AND created_at < ?2
                         ORDER BY created_at DESC, rowid DESC
                         LIMIT ?3",
                    )?;
                    stmt.query_map(params![conversation_id, before, limit], map_message)?
                        .collect::<std::result::Result<Vec<_>, _>>()?
                }
                None => {
                    let mut stmt = conn.prepare(
                        "SELECT id, conversation_id, sender_id, receiver_id, body, read, created_at
                         FROM messages
                         WHERE conversation_id = ?1
                         ORDER BY created_at DESC, rowid DESC
                         LIMIT ?2",
                    )?;
                    stmt.query_map(params![conversation_id, limit], map_message)?
                        .collect::<std::result::Result<Vec<_>, _>>()?
                }
            };
            Ok(rows)
        })
    }

    /// Mark everything addressed to `reader` in the conversation as read.
    /// Returns how many rows flipped.
    pub fn mark_read(&self, conversation_id: &str, reader_id: &str) -> Result<u32> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE messages SET read = 1
                 WHERE conversation_id = ?1 AND receiver_id = ?2 AND read = 0",
                params![conversation_id, reader_id],
            )?;
            Ok(changed as u32)
        })
    }

    /// Delete one message and recompute the conversation's last-message
    /// pointer in the same transaction.
    pub fn delete_message(&self, id: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let conversation_id: String = tx
                .query_row(
                    "SELECT conversation_id FROM messages WHERE id = ?1",
                    [id],
                    |row| row.get(0),
                )
                .map_err(|_| anyhow!("message not found: {}", id))?;

            tx.execute(
                "UPDATE conversations SET last_message_id = NULL WHERE last_message_id = ?1",
                [id],
            )?;
            tx.execute("DELETE FROM messages WHERE id = ?1", [id])?;
            tx.execute(
                "UPDATE conversations SET last_message_id =
                     (SELECT id FROM messages WHERE conversation_id = ?1
                      ORDER BY created_at DESC, rowid DESC LIMIT 1)
                 WHERE id = ?1",
                [&conversation_id],
            )?;
            tx.commit()?;
            Ok(())
        })
    }

    pub fn count_messages(&self, conversation_id: &str) -> Result<u32> {
        self.with_conn(|conn| {
            let count = conn.query_row(
                "SELECT COUNT(*) FROM messages WHERE conversation_id = ?1",
                [conversation_id],
                |row| row.get(0),
            )?;
            Ok(count)
        })
    }
}
