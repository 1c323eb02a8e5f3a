use crate::Database;
use crate::models::SkillRow;
use crate::queries::OptionalExt;
use anyhow::Result;
use rusqlite::params;

const SKILL_COLUMNS: &str = "s.id, s.owner_id, u.username, s.title, s.description, s.category, \
     s.kind, s.tags, s.location, s.lat, s.lon, s.created_at, s.updated_at";

fn map_skill(row: &rusqlite::Row<'_>) -> rusqlite::Result<SkillRow> {
    Ok(SkillRow {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        owner_username: row.get(2)?,
        title: row.get(3)?,
        description: row.get(4)?,
        category: row.get(5)?,
        kind: row.get(6)?,
        tags: row.get(7)?,
        location: row.get(8)?,
        lat: row.get(9)?,
        lon: row.get(10)?,
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
    })
}

/// Optional filters for the skill listing. Geo filtering happens above the
/// DB layer, on the rows this returns.
#[derive(Default)]
pub struct SkillQuery<'a> {
    pub keyword: Option<&'a str>,
    pub category: Option<&'a str>,
    pub kind: Option<&'a str>,
    pub owner_id: Option<&'a str>,
    pub limit: u32,
}

impl Database {
    #[allow(clippy::too_many_arguments)]
    pub fn insert_skill(
        &self,
        id: &str,
        owner_id: &str,
        title: &str,
        description: &str,
        category: &str,
        kind: &str,
        tags_json: &str,
        location: Option<&str>,
        lat: Option<f64>,
        lon: Option<f64>,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO skills (id, owner_id, title, description, category, kind, tags, location, lat, lon)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![id, owner_id, title, description, category, kind, tags_json, location, lat, lon],
            )?;
            Ok(())
        })
    }

    #[allow(clippy::too_many_arguments)]
    pub fn update_skill(
        &self,
        id: &str,
        title: &str,
        description: &str,
        category: &str,
        tags_json: &str,
        location: Option<&str>,
        lat: Option<f64>,
        lon: Option<f64>,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE skills SET
                     title = ?2, description = ?3, category = ?4, tags = ?5,
                     location = ?6, lat = ?7, lon = ?8,
                     updated_at = datetime('now')
                 WHERE id = ?1",
                params![id, title, description, category, tags_json, location, lat, lon],
            )?;
            Ok(())
        })
    }

    pub fn delete_skill(&self, id: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM skills WHERE id = ?1", [id])?;
            Ok(())
        })
    }

    pub fn get_skill(&self, id: &str) -> Result<Option<SkillRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {SKILL_COLUMNS} FROM skills s JOIN users u ON u.id = s.owner_id WHERE s.id = ?1"
            );
            let mut stmt = conn.prepare(&sql)?;
            let row = stmt.query_row([id], map_skill).optional()?;
            Ok(row)
        })
    }

    pub fn list_skills(&self, q: &SkillQuery<'_>) -> Result<Vec<SkillRow>> {
        self.with_conn(|conn| {
            let mut sql = format!(
                "SELECT {SKILL_COLUMNS} FROM skills s JOIN users u ON u.id = s.owner_id WHERE 1=1"
            );
            let mut owned: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

            if let Some(keyword) = q.keyword {
                sql.push_str(&format!(
                    " AND (s.title LIKE ?{0} OR s.description LIKE ?{0})",
                    owned.len() + 1
                ));
                owned.push(Box::new(format!("%{keyword}%")));
            }
            if let Some(category) = q.category {
                sql.push_str(&format!(" AND s.category = ?{}", owned.len() + 1));
                owned.push(Box::new(category.to_string()));
            }
            if let Some(kind) = q.kind {
                sql.push_str(&format!(" AND s.kind = ?{}", owned.len() + 1));
                owned.push(Box::new(kind.to_string()));
            }
            if let Some(owner_id) = q.owner_id {
                sql.push_str(&format!(" AND s.owner_id = ?{}", owned.len() + 1));
                owned.push(Box::new(owner_id.to_string()));
            }

            sql.push_str(&format!(
                " ORDER BY s.created_at DESC, s.rowid DESC LIMIT ?{}",
                owned.len() + 1
            ));
            owned.push(Box::new(q.limit));

            let mut stmt = conn.prepare(&sql)?;
            let param_refs: Vec<&dyn rusqlite::types::ToSql> =
                owned.iter().map(|p| p.as_ref()).collect();
            let rows = stmt
                .query_map(param_refs.as_slice(), map_skill)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Candidate pool for the matcher: every offer owned by someone else,
    /// in insertion order so the scoring sort stays stable.
    pub fn match_candidates(&self, requester_id: &str) -> Result<Vec<SkillRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {SKILL_COLUMNS} FROM skills s JOIN users u ON u.id = s.owner_id
                 WHERE s.kind = 'offer' AND s.owner_id != ?1
                 ORDER BY s.rowid ASC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([requester_id], map_skill)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}
