use crate::Database;
use crate::models::{CreditEntryRow, UserRow, UserStats};
use crate::queries::OptionalExt;
use anyhow::Result;
use rusqlite::{Connection, params};

const USER_COLUMNS: &str = "id, username, email, password, bio, location, lat, lon, avatar_url, \
     credits, role, verified, otp_code, otp_purpose, otp_expires_at, pending_email, created_at";

fn map_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password: row.get(3)?,
        bio: row.get(4)?,
        location: row.get(5)?,
        lat: row.get(6)?,
        lon: row.get(7)?,
        avatar_url: row.get(8)?,
        credits: row.get(9)?,
        role: row.get(10)?,
        verified: row.get::<_, i64>(11)? != 0,
        otp_code: row.get(12)?,
        otp_purpose: row.get(13)?,
        otp_expires_at: row.get(14)?,
        pending_email: row.get(15)?,
        created_at: row.get(16)?,
    })
}

fn query_user_by(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = ?1");
    let mut stmt = conn.prepare(&sql)?;
    let row = stmt.query_row([value], map_user).optional()?;
    Ok(row)
}

impl Database {
    pub fn create_user(
        &self,
        id: &str,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, username, email, password) VALUES (?1, ?2, ?3, ?4)",
                (id, username, email, password_hash),
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by(conn, "id", id))
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by(conn, "username", username))
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by(conn, "email", email))
    }

    pub fn update_profile(
        &self,
        id: &str,
        bio: Option<&str>,
        location: Option<&str>,
        lat: Option<f64>,
        lon: Option<f64>,
        avatar_url: Option<&str>,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE users SET
                     bio        = COALESCE(?2, bio),
                     location   = COALESCE(?3, location),
                     lat        = COALESCE(?4, lat),
                     lon        = COALESCE(?5, lon),
                     avatar_url = COALESCE(?6, avatar_url)
                 WHERE id = ?1",
                params![id, bio, location, lat, lon, avatar_url],
            )?;
            Ok(())
        })
    }

    pub fn set_password(&self, id: &str, password_hash: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE users SET password = ?2 WHERE id = ?1",
                params![id, password_hash],
            )?;
            Ok(())
        })
    }

    /// Returns false when no such username exists.
    pub fn set_role_by_username(&self, username: &str, role: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE users SET role = ?2 WHERE username = ?1",
                params![username, role],
            )?;
            Ok(changed == 1)
        })
    }

    pub fn mark_verified(&self, id: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("UPDATE users SET verified = 1 WHERE id = ?1", [id])?;
            Ok(())
        })
    }

    /// Store the single in-flight OTP for a user. `ttl_minutes` may be
    /// negative, which yields an already-expired code (used by tests).
    pub fn set_otp(&self, id: &str, code: &str, purpose: &str, ttl_minutes: i64) -> Result<()> {
        let modifier = format!("{ttl_minutes:+} minutes");
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE users SET
                     otp_code       = ?2,
                     otp_purpose    = ?3,
                     otp_expires_at = datetime('now', ?4)
                 WHERE id = ?1",
                params![id, code, purpose, modifier],
            )?;
            Ok(())
        })
    }

    /// Atomically consume an OTP: the guarded UPDATE clears the code only
    /// when it matches, has the right purpose and has not expired. Returns
    /// whether the code was accepted; a second call with the same code
    /// always returns false.
    pub fn consume_otp(&self, id: &str, code: &str, purpose: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE users SET
                     otp_code = NULL, otp_purpose = NULL, otp_expires_at = NULL
                 WHERE id = ?1
                   AND otp_code = ?2
                   AND otp_purpose = ?3
                   AND otp_expires_at > datetime('now')",
                params![id, code, purpose],
            )?;
            Ok(changed == 1)
        })
    }

    pub fn set_pending_email(&self, id: &str, pending_email: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE users SET pending_email = ?2 WHERE id = ?1",
                params![id, pending_email],
            )?;
            Ok(())
        })
    }

    /// Promote pending_email to email. Returns false when no change was
    /// pending or the address got taken in the meantime.
    pub fn apply_pending_email(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE users SET email = pending_email, pending_email = NULL
                 WHERE id = ?1
                   AND pending_email IS NOT NULL
                   AND pending_email NOT IN (SELECT email FROM users WHERE id != ?1)",
                [id],
            )?;
            Ok(changed == 1)
        })
    }

    /// Per-user counters, derived from the skills / proposals / ratings
    /// tables on every read. Nothing here is stored on the user row.
    pub fn user_stats(&self, id: &str) -> Result<UserStats> {
        self.with_conn(|conn| {
            let (offered, wanted): (u32, u32) = conn.query_row(
                "SELECT
                     COUNT(CASE WHEN kind = 'offer' THEN 1 END),
                     COUNT(CASE WHEN kind = 'request' THEN 1 END)
                 FROM skills WHERE owner_id = ?1",
                [id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;

            let swaps: u32 = conn.query_row(
                "SELECT COUNT(*) FROM proposals
                 WHERE status = 'completed' AND (proposer_id = ?1 OR receiver_id = ?1)",
                [id],
                |row| row.get(0),
            )?;

            let (rating, rating_count): (Option<f64>, u32) = conn.query_row(
                "SELECT AVG(stars), COUNT(*) FROM ratings WHERE rated_id = ?1",
                [id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;

            Ok(UserStats {
                skills_offered: offered,
                skills_wanted: wanted,
                swaps_completed: swaps,
                rating,
                rating_count,
            })
        })
    }

    // -- Credits --

    /// Move a user's balance and journal the movement in the same
    /// transaction. Returns false (and changes nothing) when the delta
    /// would take the balance below zero.
    pub fn adjust_credits(
        &self,
        entry_id: &str,
        user_id: &str,
        delta: i64,
        reason: &str,
        proposal_id: Option<&str>,
    ) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            if !apply_credit(&tx, entry_id, user_id, delta, reason, proposal_id)? {
                return Ok(false);
            }
            tx.commit()?;
            Ok(true)
        })
    }

    /// Transfer `amount` credits between two users, journaling both sides.
    /// Returns false (nothing applied) when the payer's balance is short.
    pub fn transfer_credits(
        &self,
        entry_ids: (&str, &str),
        from: &str,
        to: &str,
        amount: i64,
        reason: &str,
        proposal_id: Option<&str>,
    ) -> Result<bool> {
        if amount == 0 {
            return Ok(true);
        }
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            if !apply_credit(&tx, entry_ids.0, from, -amount, reason, proposal_id)? {
                return Ok(false);
            }
            if !apply_credit(&tx, entry_ids.1, to, amount, reason, proposal_id)? {
                return Ok(false);
            }
            tx.commit()?;
            Ok(true)
        })
    }

    pub fn get_credits(&self, user_id: &str) -> Result<i64> {
        self.with_conn(|conn| {
            let balance = conn.query_row(
                "SELECT credits FROM users WHERE id = ?1",
                [user_id],
                |row| row.get(0),
            )?;
            Ok(balance)
        })
    }

    pub fn credit_ledger(&self, user_id: &str, limit: u32) -> Result<Vec<CreditEntryRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, delta, reason, proposal_id, created_at
                 FROM credit_ledger
                 WHERE user_id = ?1
                 ORDER BY created_at DESC, rowid DESC
                 LIMIT ?2",
            )?;
            let rows = stmt
                .query_map(params![user_id, limit], |row| {
                    Ok(CreditEntryRow {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        delta: row.get(2)?,
                        reason: row.get(3)?,
                        proposal_id: row.get(4)?,
                        created_at: row.get(5)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn apply_credit(
    tx: &rusqlite::Transaction<'_>,
    entry_id: &str,
    user_id: &str,
    delta: i64,
    reason: &str,
    proposal_id: Option<&str>,
) -> Result<bool> {
    let balance: i64 = tx.query_row(
        "SELECT credits FROM users WHERE id = ?1",
        [user_id],
        |row| row.get(0),
    )?;
    if balance + delta < 0 {
        return Ok(false);
    }
    tx.execute(
        "UPDATE users SET credits = credits + ?2 WHERE id = ?1",
        params![user_id, delta],
    )?;
    tx.execute(
        "INSERT INTO credit_ledger (id, user_id, delta, reason, proposal_id)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![entry_id, user_id, delta, reason, proposal_id],
    )?;
    Ok(true)
}
