use crate::Database;
use crate::models::{NotificationRow, PushTokenRow};
use anyhow::Result;
use rusqlite::params;

fn map_notification(row: &rusqlite::Row<'_>) -> rusqlite::Result<NotificationRow> {
    Ok(NotificationRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        kind: row.get(2)?,
        body: row.get(3)?,
        read: row.get::<_, i64>(4)? != 0,
        created_at: row.get(5)?,
    })
}

impl Database {
    pub fn insert_notification(
        &self,
        id: &str,
        user_id: &str,
        kind: &str,
        body: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO notifications (id, user_id, kind, body) VALUES (?1, ?2, ?3, ?4)",
                params![id, user_id, kind, body],
            )?;
            Ok(())
        })
    }

    pub fn list_notifications(&self, user_id: &str, limit: u32) -> Result<Vec<NotificationRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, kind, body, read, created_at
                 FROM notifications
                 WHERE user_id = ?1
                 ORDER BY created_at DESC, rowid DESC
                 LIMIT ?2",
            )?;
            let rows = stmt
                .query_map(params![user_id, limit], map_notification)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Scoped to the owner so one user can't flip another's notification.
    pub fn mark_notification_read(&self, id: &str, user_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE notifications SET read = 1 WHERE id = ?1 AND user_id = ?2",
                params![id, user_id],
            )?;
            Ok(changed == 1)
        })
    }

    pub fn mark_all_notifications_read(&self, user_id: &str) -> Result<u32> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE notifications SET read = 1 WHERE user_id = ?1 AND read = 0",
                [user_id],
            )?;
            Ok(changed as u32)
        })
    }

    // -- Push tokens --

    pub fn upsert_push_token(&self, user_id: &str, token: &str, platform: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO push_tokens (user_id, token, platform) VALUES (?1, ?2, ?3)
                 ON CONFLICT(user_id, token) DO UPDATE SET platform = excluded.platform",
                params![user_id, token, platform],
            )?;
            Ok(())
        })
    }

    pub fn delete_push_token(&self, user_id: &str, token: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "DELETE FROM push_tokens WHERE user_id = ?1 AND token = ?2",
                params![user_id, token],
            )?;
            Ok(())
        })
    }

    pub fn push_tokens_for(&self, user_id: &str) -> Result<Vec<PushTokenRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT token, platform FROM push_tokens WHERE user_id = ?1",
            )?;
            let rows = stmt
                .query_map([user_id], |row| {
                    Ok(PushTokenRow {
                        token: row.get(0)?,
                        platform: row.get(1)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}
