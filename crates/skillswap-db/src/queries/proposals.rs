use crate::Database;
use crate::models::ProposalRow;
use crate::queries::OptionalExt;
use anyhow::Result;
use rusqlite::params;

// LEFT JOINs: the skill rows are soft references and may be gone.
const PROPOSAL_COLUMNS: &str = "p.id, p.proposer_id, p.receiver_id, \
     p.offered_skill_id, COALESCE(os.title, '[deleted skill]'), \
     p.requested_skill_id, COALESCE(rs.title, '[deleted skill]'), \
     p.credits, p.note, p.status, p.created_at, p.responded_at";

const PROPOSAL_JOINS: &str = "FROM proposals p \
     LEFT JOIN skills os ON os.id = p.offered_skill_id \
     LEFT JOIN skills rs ON rs.id = p.requested_skill_id";

fn map_proposal(row: &rusqlite::Row<'_>) -> rusqlite::Result<ProposalRow> {
    Ok(ProposalRow {
        id: row.get(0)?,
        proposer_id: row.get(1)?,
        receiver_id: row.get(2)?,
        offered_skill_id: row.get(3)?,
        offered_skill_title: row.get(4)?,
        requested_skill_id: row.get(5)?,
        requested_skill_title: row.get(6)?,
        credits: row.get(7)?,
        note: row.get(8)?,
        status: row.get(9)?,
        created_at: row.get(10)?,
        responded_at: row.get(11)?,
    })
}

impl Database {
    #[allow(clippy::too_many_arguments)]
    pub fn insert_proposal(
        &self,
        id: &str,
        proposer_id: &str,
        receiver_id: &str,
        offered_skill_id: &str,
        requested_skill_id: &str,
        credits: i64,
        note: Option<&str>,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO proposals
                     (id, proposer_id, receiver_id, offered_skill_id, requested_skill_id, credits, note)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![id, proposer_id, receiver_id, offered_skill_id, requested_skill_id, credits, note],
            )?;
            Ok(())
        })
    }

    pub fn get_proposal(&self, id: &str) -> Result<Option<ProposalRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {PROPOSAL_COLUMNS} {PROPOSAL_JOINS} WHERE p.id = ?1");
            let mut stmt = conn.prepare(&sql)?;
            let row = stmt.query_row([id], map_proposal).optional()?;
            Ok(row)
        })
    }

    pub fn set_proposal_status(&self, id: &str, status: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE proposals SET status = ?2, responded_at = datetime('now') WHERE id = ?1",
                params![id, status],
            )?;
            Ok(())
        })
    }

    pub fn list_proposals_for(&self, user_id: &str) -> Result<Vec<ProposalRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {PROPOSAL_COLUMNS} {PROPOSAL_JOINS}
                 WHERE p.proposer_id = ?1 OR p.receiver_id = ?1
                 ORDER BY p.created_at DESC, p.rowid DESC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([user_id], map_proposal)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Ratings --

    /// One rating per (proposal, rater); the UNIQUE constraint backs this,
    /// but the read-check keeps the error a clean conflict instead of a
    /// constraint failure.
    pub fn has_rated(&self, proposal_id: &str, rater_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let count: u32 = conn.query_row(
                "SELECT COUNT(*) FROM ratings WHERE proposal_id = ?1 AND rater_id = ?2",
                params![proposal_id, rater_id],
                |row| row.get(0),
            )?;
            Ok(count > 0)
        })
    }

    pub fn insert_rating(
        &self,
        id: &str,
        proposal_id: &str,
        rater_id: &str,
        rated_id: &str,
        stars: u8,
        comment: Option<&str>,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO ratings (id, proposal_id, rater_id, rated_id, stars, comment)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![id, proposal_id, rater_id, rated_id, stars, comment],
            )?;
            Ok(())
        })
    }
}
