//! Guide, bookmark and note types shared by the remote API and the cache.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Prefix marking ids synthesized locally for optimistic results.
pub const PLACEHOLDER_PREFIX: &str = "local-";

/// Whether `id` is a locally synthesized placeholder rather than a server id.
pub fn is_placeholder_id(id: &str) -> bool {
  id.starts_with(PLACEHOLDER_PREFIX)
}

/// Full guide snapshot as served by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Guide {
  pub id: String,
  pub title: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub author: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub platform: Option<String>,
  #[serde(default)]
  pub content: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub updated_at: Option<String>,
  // Fields this crate does not interpret, kept so snapshots round-trip
  #[serde(flatten)]
  pub extra: BTreeMap<String, serde_json::Value>,
}

/// A guide snapshot held in the offline cache.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedGuide {
  pub guide: Guide,
  /// Epoch milliseconds when the snapshot was saved
  pub cached_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bookmark {
  pub id: String,
  pub guide_id: String,
  pub position: u64,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub page_reference: Option<String>,
  #[serde(default)]
  pub is_last_read: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
  pub id: String,
  pub guide_id: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub position: Option<u64>,
  pub content: String,
}

/// Request body for creating a bookmark.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBookmark {
  pub position: u64,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub page_reference: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub is_last_read: Option<bool>,
}

/// Request body for creating a note.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewNote {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub position: Option<u64>,
  pub content: String,
}

/// Partial update of a note; absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotePatch {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub position: Option<u64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub content: Option<String>,
}
