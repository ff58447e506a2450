//! Typed mutations and their stored (type, action, payload) form.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::api::types::{NewBookmark, NewNote, NotePatch};
use crate::error::{Error, Result};

/// Remote resource family a change targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeType {
  Position,
  Bookmark,
  Note,
}

impl ChangeType {
  pub fn as_str(&self) -> &'static str {
    match self {
      ChangeType::Position => "position",
      ChangeType::Bookmark => "bookmark",
      ChangeType::Note => "note",
    }
  }
}

impl fmt::Display for ChangeType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeAction {
  Create,
  Update,
  Delete,
}

impl ChangeAction {
  pub fn as_str(&self) -> &'static str {
    match self {
      ChangeAction::Create => "create",
      ChangeAction::Update => "update",
      ChangeAction::Delete => "delete",
    }
  }
}

impl fmt::Display for ChangeAction {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionUpdate {
  pub guide_id: String,
  pub position: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkCreate {
  pub guide_id: String,
  #[serde(flatten)]
  pub bookmark: NewBookmark,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkDelete {
  pub guide_id: String,
  pub bookmark_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteCreate {
  pub guide_id: String,
  #[serde(flatten)]
  pub note: NewNote,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteUpdate {
  pub guide_id: String,
  pub note_id: String,
  #[serde(flatten)]
  pub patch: NotePatch,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteDelete {
  pub guide_id: String,
  pub note_id: String,
}

/// A mutation that can be replayed against the remote API.
///
/// One variant per supported (type, action) pair.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
  UpdatePosition(PositionUpdate),
  CreateBookmark(BookmarkCreate),
  DeleteBookmark(BookmarkDelete),
  CreateNote(NoteCreate),
  UpdateNote(NoteUpdate),
  DeleteNote(NoteDelete),
}

impl Mutation {
  pub fn change_type(&self) -> ChangeType {
    match self {
      Mutation::UpdatePosition(_) => ChangeType::Position,
      Mutation::CreateBookmark(_) | Mutation::DeleteBookmark(_) => ChangeType::Bookmark,
      Mutation::CreateNote(_) | Mutation::UpdateNote(_) | Mutation::DeleteNote(_) => {
        ChangeType::Note
      }
    }
  }

  pub fn action(&self) -> ChangeAction {
    match self {
      Mutation::CreateBookmark(_) | Mutation::CreateNote(_) => ChangeAction::Create,
      Mutation::UpdatePosition(_) | Mutation::UpdateNote(_) => ChangeAction::Update,
      Mutation::DeleteBookmark(_) | Mutation::DeleteNote(_) => ChangeAction::Delete,
    }
  }

  pub fn guide_id(&self) -> &str {
    match self {
      Mutation::UpdatePosition(p) => &p.guide_id,
      Mutation::CreateBookmark(p) => &p.guide_id,
      Mutation::DeleteBookmark(p) => &p.guide_id,
      Mutation::CreateNote(p) => &p.guide_id,
      Mutation::UpdateNote(p) => &p.guide_id,
      Mutation::DeleteNote(p) => &p.guide_id,
    }
  }

  /// The stored payload for this mutation.
  pub fn payload(&self) -> Result<Value> {
    let value = match self {
      Mutation::UpdatePosition(p) => serde_json::to_value(p)?,
      Mutation::CreateBookmark(p) => serde_json::to_value(p)?,
      Mutation::DeleteBookmark(p) => serde_json::to_value(p)?,
      Mutation::CreateNote(p) => serde_json::to_value(p)?,
      Mutation::UpdateNote(p) => serde_json::to_value(p)?,
      Mutation::DeleteNote(p) => serde_json::to_value(p)?,
    };
    Ok(value)
  }

  /// Rebuild a mutation from its stored parts.
  ///
  /// Fails with [`Error::UnknownSyncType`] for pairs without a remote
  /// operation, and [`Error::InvalidPayload`] when required fields are missing.
  pub fn decode(change_type: &str, action: &str, payload: &Value) -> Result<Self> {
    let mutation = match (change_type, action) {
      ("position", "update") => Mutation::UpdatePosition(parse(change_type, action, payload)?),
      ("bookmark", "create") => Mutation::CreateBookmark(parse(change_type, action, payload)?),
      ("bookmark", "delete") => Mutation::DeleteBookmark(parse(change_type, action, payload)?),
      ("note", "create") => Mutation::CreateNote(parse(change_type, action, payload)?),
      ("note", "update") => Mutation::UpdateNote(parse(change_type, action, payload)?),
      ("note", "delete") => Mutation::DeleteNote(parse(change_type, action, payload)?),
      _ => {
        return Err(Error::UnknownSyncType {
          change_type: change_type.to_string(),
          action: action.to_string(),
        })
      }
    };
    Ok(mutation)
  }
}

fn parse<T: DeserializeOwned>(change_type: &str, action: &str, payload: &Value) -> Result<T> {
  T::deserialize(payload).map_err(|source| Error::InvalidPayload {
    change_type: change_type.to_string(),
    action: action.to_string(),
    source,
  })
}
