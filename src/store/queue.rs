//! Durable FIFO log of mutations recorded while offline.

use rusqlite::params;
use serde_json::Value;
use tracing::{debug, warn};

use super::Database;
use crate::error::{Error, Result};
use crate::sync::Mutation;

/// One queued mutation, as stored.
///
/// `change_type` and `action` are kept as raw strings so rows that this
/// build cannot interpret are still listed and removable.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingChange {
  /// Store-assigned id, only used to remove the entry
  pub id: i64,
  pub change_type: String,
  pub action: String,
  /// `Value::Null` when the stored text is not valid JSON
  pub payload: Value,
  /// Stored payload text that failed to parse
  pub unparsed: Option<String>,
  /// Epoch milliseconds at enqueue time
  pub created_at: i64,
}

impl PendingChange {
  /// Decode into a typed mutation.
  pub fn mutation(&self) -> Result<Mutation> {
    if let Some(raw) = &self.unparsed {
      return match serde_json::from_str::<Value>(raw) {
        Ok(payload) => Mutation::decode(&self.change_type, &self.action, &payload),
        Err(source) => Err(Error::InvalidPayload {
          change_type: self.change_type.clone(),
          action: self.action.clone(),
          source,
        }),
      };
    }
    Mutation::decode(&self.change_type, &self.action, &self.payload)
  }
}

/// Queue of pending changes, replayed oldest first.
#[derive(Clone)]
pub struct ChangeQueue {
  db: Database,
}

impl ChangeQueue {
  pub(crate) fn new(db: Database) -> Self {
    Self { db }
  }

  /// Append a change stamped with the current time. Returns its id.
  pub async fn enqueue(&self, change_type: &str, action: &str, payload: &Value) -> Result<i64> {
    let payload = serde_json::to_string(payload)?;
    self.enqueue_text(change_type, action, payload).await
  }

  /// Append a change whose payload is already serialized.
  pub(crate) async fn enqueue_text(
    &self,
    change_type: &str,
    action: &str,
    payload: String,
  ) -> Result<i64> {
    let change_type = change_type.to_string();
    let action = action.to_string();
    let created_at = self.db.now_millis();

    self
      .db
      .call(move |conn| {
        conn.execute(
          "INSERT INTO pending_changes (change_type, action, payload, created_at)
           VALUES (?, ?, ?, ?)",
          params![change_type, action, payload, created_at],
        )?;
        let id = conn.last_insert_rowid();
        debug!(id, change_type = %change_type, action = %action, "queued change");
        Ok(id)
      })
      .await
  }

  /// Append a typed mutation.
  pub async fn enqueue_mutation(&self, mutation: &Mutation) -> Result<i64> {
    let payload = mutation.payload()?;
    self
      .enqueue(mutation.change_type().as_str(), mutation.action().as_str(), &payload)
      .await
  }

  /// All entries, oldest first, without removing them.
  ///
  /// Entries with equal timestamps keep insertion order.
  pub async fn drain(&self) -> Result<Vec<PendingChange>> {
    let rows: Vec<(i64, String, String, String, i64)> = self
      .db
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT id, change_type, action, payload, created_at FROM pending_changes
           ORDER BY created_at ASC, id ASC",
        )?;
        let rows = stmt
          .query_map([], |row| {
            Ok((
              row.get(0)?,
              row.get(1)?,
              row.get(2)?,
              row.get(3)?,
              row.get(4)?,
            ))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    let changes = rows
      .into_iter()
      .map(|(id, change_type, action, text, created_at)| {
        let (payload, unparsed) = match serde_json::from_str::<Value>(&text) {
          Ok(payload) => (payload, None),
          Err(e) => {
            warn!(id, change_type = %change_type, error = %e, "stored payload is not valid JSON");
            (Value::Null, Some(text))
          }
        };
        PendingChange {
          id,
          change_type,
          action,
          payload,
          unparsed,
          created_at,
        }
      })
      .collect();
    Ok(changes)
  }

  /// Delete one entry. Missing ids are ignored.
  pub async fn remove_one(&self, id: i64) -> Result<()> {
    self
      .db
      .call(move |conn| {
        let removed = conn.execute("DELETE FROM pending_changes WHERE id = ?", params![id])?;
        debug!(id, removed, "removed queued change");
        Ok(())
      })
      .await
  }

  pub async fn clear(&self) -> Result<()> {
    self
      .db
      .call(|conn| {
        let removed = conn.execute("DELETE FROM pending_changes", [])?;
        debug!(removed, "cleared change queue");
        Ok(())
      })
      .await
  }

  pub async fn count(&self) -> Result<usize> {
    self
      .db
      .call(|conn| {
        let count: i64 =
          conn.query_row("SELECT COUNT(*) FROM pending_changes", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or_default())
      })
      .await
  }
}
