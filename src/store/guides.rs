//! Offline copies of guides, one snapshot per guide id.

use rusqlite::{params, OptionalExtension};
use tracing::debug;

use super::Database;
use crate::api::types::{CachedGuide, Guide};
use crate::error::Result;

/// Guide snapshots downloaded for offline reading.
#[derive(Clone)]
pub struct GuideCache {
  db: Database,
}

impl GuideCache {
  pub(crate) fn new(db: Database) -> Self {
    Self { db }
  }

  /// Store `guide`, replacing any earlier snapshot with the same id.
  pub async fn save(&self, guide: &Guide) -> Result<()> {
    let data = serde_json::to_string(guide)?;
    let guide_id = guide.id.clone();
    let cached_at = self.db.now_millis();

    self
      .db
      .call(move |conn| {
        conn.execute(
          "INSERT OR REPLACE INTO cached_guides (guide_id, data, cached_at) VALUES (?, ?, ?)",
          params![guide_id, data, cached_at],
        )?;
        debug!(guide_id = %guide_id, cached_at, "cached guide");
        Ok(())
      })
      .await
  }

  /// The cached snapshot for `guide_id`, without its cache metadata.
  pub async fn get(&self, guide_id: &str) -> Result<Option<Guide>> {
    let guide_id = guide_id.to_string();
    let data: Option<String> = self
      .db
      .call(move |conn| {
        let data = conn
          .query_row(
            "SELECT data FROM cached_guides WHERE guide_id = ?",
            params![guide_id],
            |row| row.get(0),
          )
          .optional()?;
        Ok(data)
      })
      .await?;

    match data {
      Some(data) => Ok(Some(serde_json::from_str(&data)?)),
      None => Ok(None),
    }
  }

  /// Every cached guide, most recently cached first.
  pub async fn get_all(&self) -> Result<Vec<CachedGuide>> {
    let rows: Vec<(String, i64)> = self
      .db
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT data, cached_at FROM cached_guides ORDER BY cached_at DESC, rowid DESC",
        )?;
        let rows = stmt
          .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    rows
      .into_iter()
      .map(|(data, cached_at)| -> Result<CachedGuide> {
        Ok(CachedGuide {
          guide: serde_json::from_str(&data)?,
          cached_at,
        })
      })
      .collect()
  }

  /// Ids of all cached guides, most recently cached first.
  pub async fn get_all_ids(&self) -> Result<Vec<String>> {
    self
      .db
      .call(|conn| {
        let mut stmt = conn
          .prepare("SELECT guide_id FROM cached_guides ORDER BY cached_at DESC, rowid DESC")?;
        let ids = stmt
          .query_map([], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(ids)
      })
      .await
  }

  /// Delete one snapshot. Missing ids are ignored.
  pub async fn remove(&self, guide_id: &str) -> Result<()> {
    let guide_id = guide_id.to_string();
    self
      .db
      .call(move |conn| {
        let removed = conn.execute(
          "DELETE FROM cached_guides WHERE guide_id = ?",
          params![guide_id],
        )?;
        debug!(guide_id = %guide_id, removed, "removed cached guide");
        Ok(())
      })
      .await
  }

  pub async fn remove_all(&self) -> Result<()> {
    self
      .db
      .call(|conn| {
        let removed = conn.execute("DELETE FROM cached_guides", [])?;
        debug!(removed, "cleared cached guides");
        Ok(())
      })
      .await
  }

  pub async fn has(&self, guide_id: &str) -> Result<bool> {
    let guide_id = guide_id.to_string();
    self
      .db
      .call(move |conn| {
        let exists = conn.query_row(
          "SELECT EXISTS(SELECT 1 FROM cached_guides WHERE guide_id = ?)",
          params![guide_id],
          |row| row.get(0),
        )?;
        Ok(exists)
      })
      .await
  }

  pub async fn count(&self) -> Result<usize> {
    self
      .db
      .call(|conn| {
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM cached_guides", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or_default())
      })
      .await
  }
}
