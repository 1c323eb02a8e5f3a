use crate::Database;
use crate::models::ReportRow;
use anyhow::Result;
use rusqlite::params;

fn map_report(row: &rusqlite::Row<'_>) -> rusqlite::Result<ReportRow> {
    Ok(ReportRow {
        id: row.get(0)?,
        reporter_id: row.get(1)?,
        reported_user_id: row.get(2)?,
        skill_id: row.get(3)?,
        conversation_id: row.get(4)?,
        reason: row.get(5)?,
        status: row.get(6)?,
        created_at: row.get(7)?,
    })
}

impl Database {
    /// Insert a report unless the same reporter already filed one against
    /// the same target and anchor. Returns false on the duplicate.
    /// (SQLite UNIQUE treats NULLs as distinct, so the dedup is an explicit
    /// check; the connection lock makes check-then-insert race-free.)
    pub fn insert_report(
        &self,
        id: &str,
        reporter_id: &str,
        reported_user_id: &str,
        skill_id: Option<&str>,
        conversation_id: Option<&str>,
        reason: &str,
    ) -> Result<bool> {
        self.with_conn(|conn| {
            let existing: u32 = conn.query_row(
                "SELECT COUNT(*) FROM reports
                 WHERE reporter_id = ?1
                   AND reported_user_id = ?2
                   AND (skill_id IS ?3)
                   AND (conversation_id IS ?4)",
                params![reporter_id, reported_user_id, skill_id, conversation_id],
                |row| row.get(0),
            )?;
            if existing > 0 {
                return Ok(false);
            }

            conn.execute(
                "INSERT INTO reports
                     (id, reporter_id, reported_user_id, skill_id, conversation_id, reason)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![id, reporter_id, reported_user_id, skill_id, conversation_id, reason],
            )?;
            Ok(true)
        })
    }

    pub fn list_reports(&self, status: Option<&str>) -> Result<Vec<ReportRow>> {
        self.with_conn(|conn| {
            let rows = match status {
                Some(status) => {
                    let mut stmt = conn.prepare(
                        "SELECT id, reporter_id, reported_user_id, skill_id, conversation_id,
                                reason, status, created_at
                         FROM reports WHERE status = ?1
                         ORDER BY created_at DESC, rowid DESC",
                    )?;
                    stmt.query_map([status], map_report)?
                        .collect::<std::result::Result<Vec<_>, _>>()?
                }
                None => {
                    let mut stmt = conn.prepare(
                        "SELECT id, reporter_id, reported_user_id, skill_id, conversation_id,
                                reason, status, created_at
                         FROM reports
                         ORDER BY created_at DESC, rowid DESC",
                    )?;
                    stmt.query_map([], map_report)?
                        .collect::<std::result::Result<Vec<_>, _>>()?
                }
            };
            Ok(rows)
        })
    }

    /// Returns false when the report doesn't exist.
    pub fn set_report_status(&self, id: &str, status: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE reports SET status = ?2 WHERE id = ?1",
                params![id, status],
            )?;
            Ok(changed == 1)
        })
    }
}
