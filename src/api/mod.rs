//! Remote guide API: the collaborator every queued change is replayed against.

mod client;
pub mod types;

use async_trait::async_trait;

use crate::error::RemoteError;

pub use client::HttpGuideApi;
pub use types::{
  is_placeholder_id, Bookmark, CachedGuide, Guide, NewBookmark, NewNote, Note, NotePatch,
};

/// Operations the sync layer needs from the remote API.
///
/// Request and response shapes beyond these types belong to the implementor.
#[async_trait]
pub trait GuideApi: Send + Sync {
  async fn update_guide_position(&self, guide_id: &str, position: u64)
    -> Result<(), RemoteError>;

  async fn create_bookmark(
    &self,
    guide_id: &str,
    bookmark: &NewBookmark,
  ) -> Result<Bookmark, RemoteError>;

  async fn delete_bookmark(&self, guide_id: &str, bookmark_id: &str) -> Result<(), RemoteError>;

  async fn create_note(&self, guide_id: &str, note: &NewNote) -> Result<Note, RemoteError>;

  async fn update_note(
    &self,
    guide_id: &str,
    note_id: &str,
    patch: &NotePatch,
  ) -> Result<Note, RemoteError>;

  async fn delete_note(&self, guide_id: &str, note_id: &str) -> Result<(), RemoteError>;

  async fn get_guide(&self, guide_id: &str) -> Result<Guide, RemoteError>;
}
