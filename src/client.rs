//! Offline-aware guide client.
//!
//! Wraps the remote [`GuideApi`] with the guide cache and the change queue:
//! writes go straight to the API when online and are queued otherwise,
//! reads fall back to downloaded snapshots.

use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::api::types::{
  Bookmark, CachedGuide, Guide, NewBookmark, NewNote, Note, NotePatch, PLACEHOLDER_PREFIX,
};
use crate::api::GuideApi;
use crate::connectivity::Connectivity;
use crate::error::{Error, RemoteError, Result};
use crate::store::{Database, GuideCache, PendingChange};
use crate::sync::{
  BookmarkCreate, BookmarkDelete, Mutation, NoteCreate, NoteDelete, NoteUpdate, PositionUpdate,
  SyncOrchestrator, SyncReport,
};

/// Result of a write, including where it was applied.
#[derive(Debug, Clone, PartialEq)]
pub struct Written<T> {
  pub data: T,
  pub source: WriteSource,
}

/// Indicates how a write was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteSource {
  /// Applied by the remote API
  Remote,
  /// Recorded in the change queue; `data` is an optimistic local result
  Queued { change_id: i64 },
}

impl<T> Written<T> {
  pub fn is_queued(&self) -> bool {
    matches!(self.source, WriteSource::Queued { .. })
  }
}

/// Result of a read, including where the data came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Loaded<T> {
  pub data: T,
  pub source: ReadSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadSource {
  /// Fresh data from the API
  Network,
  /// Offline, served from the cache
  Cache,
  /// Online but the request failed; served from the cache
  CacheFallback,
}

/// Outcome of a note edit.
///
/// The full note is only known once the server has applied the patch, so a
/// queued edit carries the patch itself. Fields the patch leaves out are
/// unchanged, not cleared.
#[derive(Debug, Clone, PartialEq)]
pub enum NoteEdit {
  Applied(Note),
  Pending {
    id: String,
    guide_id: String,
    patch: NotePatch,
  },
}

impl NoteEdit {
  pub fn id(&self) -> &str {
    match self {
      NoteEdit::Applied(note) => &note.id,
      NoteEdit::Pending { id, .. } => id,
    }
  }
}

/// Generate a placeholder id for an optimistic create.
pub fn placeholder_id() -> String {
  format!("{}{}", PLACEHOLDER_PREFIX, Uuid::new_v4())
}

pub struct OfflineClient<A: GuideApi, C: Connectivity> {
  api: Arc<A>,
  connectivity: Arc<C>,
  guides: GuideCache,
  sync: SyncOrchestrator<A>,
}

impl<A: GuideApi, C: Connectivity> OfflineClient<A, C> {
  /// Build a client over an opened and initialized database.
  pub fn new(db: &Database, api: Arc<A>, connectivity: Arc<C>) -> Self {
    let sync = SyncOrchestrator::new(db.queue(), Arc::clone(&api));
    Self {
      api,
      connectivity,
      guides: db.guides(),
      sync,
    }
  }

  pub fn is_online(&self) -> bool {
    self.connectivity.is_online()
  }

  pub fn guides(&self) -> &GuideCache {
    &self.guides
  }

  pub fn orchestrator(&self) -> &SyncOrchestrator<A> {
    &self.sync
  }

  // ==========================================================================
  // Write path
  // ==========================================================================

  /// Apply `mutation` remotely when online, or queue it and return the
  /// optimistic result.
  ///
  /// Online failures propagate unchanged; they are never queued.
  pub async fn mutate<T, F, Fut>(
    &self,
    mutation: Mutation,
    remote: F,
    optimistic: impl FnOnce() -> T,
  ) -> Result<Written<T>>
  where
    F: FnOnce(Arc<A>) -> Fut,
    Fut: Future<Output = Result<T, RemoteError>>,
  {
    if self.connectivity.is_online() {
      let data = remote(Arc::clone(&self.api)).await?;
      return Ok(Written {
        data,
        source: WriteSource::Remote,
      });
    }

    let change_id = self.sync.queue_change(&mutation).await?;
    debug!(
      change_id,
      change_type = %mutation.change_type(),
      action = %mutation.action(),
      "offline, change queued"
    );
    Ok(Written {
      data: optimistic(),
      source: WriteSource::Queued { change_id },
    })
  }

  pub async fn update_position(&self, guide_id: &str, position: u64) -> Result<Written<()>> {
    let mutation = Mutation::UpdatePosition(PositionUpdate {
      guide_id: guide_id.to_string(),
      position,
    });
    self
      .mutate(
        mutation,
        |api| async move { api.update_guide_position(guide_id, position).await },
        || (),
      )
      .await
  }

  pub async fn create_bookmark(
    &self,
    guide_id: &str,
    bookmark: NewBookmark,
  ) -> Result<Written<Bookmark>> {
    let mutation = Mutation::CreateBookmark(BookmarkCreate {
      guide_id: guide_id.to_string(),
      bookmark: bookmark.clone(),
    });
    let optimistic = || Bookmark {
      id: placeholder_id(),
      guide_id: guide_id.to_string(),
      position: bookmark.position,
      name: bookmark.name.clone(),
      page_reference: bookmark.page_reference.clone(),
      is_last_read: bookmark.is_last_read.unwrap_or(false),
    };
    self
      .mutate(
        mutation,
        |api| {
          let bookmark = bookmark.clone();
          async move { api.create_bookmark(guide_id, &bookmark).await }
        },
        optimistic,
      )
      .await
  }

  pub async fn delete_bookmark(&self, guide_id: &str, bookmark_id: &str) -> Result<Written<()>> {
    let mutation = Mutation::DeleteBookmark(BookmarkDelete {
      guide_id: guide_id.to_string(),
      bookmark_id: bookmark_id.to_string(),
    });
    self
      .mutate(
        mutation,
        |api| async move { api.delete_bookmark(guide_id, bookmark_id).await },
        || (),
      )
      .await
  }

  pub async fn create_note(&self, guide_id: &str, note: NewNote) -> Result<Written<Note>> {
    let mutation = Mutation::CreateNote(NoteCreate {
      guide_id: guide_id.to_string(),
      note: note.clone(),
    });
    let optimistic = || Note {
      id: placeholder_id(),
      guide_id: guide_id.to_string(),
      position: note.position,
      content: note.content.clone(),
    };
    self
      .mutate(
        mutation,
        |api| {
          let note = note.clone();
          async move { api.create_note(guide_id, &note).await }
        },
        optimistic,
      )
      .await
  }

  /// Update a note. Offline, the result echoes the patch.
  pub async fn update_note(
    &self,
    guide_id: &str,
    note_id: &str,
    patch: NotePatch,
  ) -> Result<Written<NoteEdit>> {
    let mutation = Mutation::UpdateNote(NoteUpdate {
      guide_id: guide_id.to_string(),
      note_id: note_id.to_string(),
      patch: patch.clone(),
    });
    let optimistic = || NoteEdit::Pending {
      id: note_id.to_string(),
      guide_id: guide_id.to_string(),
      patch: patch.clone(),
    };
    self
      .mutate(
        mutation,
        |api| {
          let patch = patch.clone();
          async move {
            api
              .update_note(guide_id, note_id, &patch)
              .await
              .map(NoteEdit::Applied)
          }
        },
        optimistic,
      )
      .await
  }

  pub async fn delete_note(&self, guide_id: &str, note_id: &str) -> Result<Written<()>> {
    let mutation = Mutation::DeleteNote(NoteDelete {
      guide_id: guide_id.to_string(),
      note_id: note_id.to_string(),
    });
    self
      .mutate(
        mutation,
        |api| async move { api.delete_note(guide_id, note_id).await },
        || (),
      )
      .await
  }

  // ==========================================================================
  // Sync
  // ==========================================================================

  /// Replay queued changes. Callers should refetch lists afterwards, since
  /// placeholder ids are not mapped to server ids.
  pub async fn sync_all(&self) -> Result<SyncReport> {
    self.sync.sync_all().await
  }

  pub async fn pending_count(&self) -> Result<usize> {
    self.sync.pending_count().await
  }

  pub async fn pending_changes(&self) -> Result<Vec<PendingChange>> {
    self.sync.pending_changes().await
  }

  pub async fn clear_queue(&self) -> Result<()> {
    self.sync.clear_queue().await
  }

  // ==========================================================================
  // Downloads
  // ==========================================================================

  /// Fetch a guide and keep it for offline reading.
  pub async fn download_guide(&self, guide_id: &str) -> Result<Guide> {
    let guide = self.api.get_guide(guide_id).await?;
    self.guides.save(&guide).await?;
    info!(guide_id = %guide.id, "guide downloaded");
    Ok(guide)
  }

  /// Keep an already fetched guide for offline reading.
  pub async fn save_guide(&self, guide: &Guide) -> Result<()> {
    self.guides.save(guide).await
  }

  pub async fn is_guide_downloaded(&self, guide_id: &str) -> Result<bool> {
    self.guides.has(guide_id).await
  }

  pub async fn remove_guide(&self, guide_id: &str) -> Result<()> {
    self.guides.remove(guide_id).await
  }

  pub async fn remove_all_downloads(&self) -> Result<()> {
    self.guides.remove_all().await
  }

  /// Downloaded guides, most recently downloaded first.
  pub async fn downloaded_guides(&self) -> Result<Vec<CachedGuide>> {
    self.guides.get_all().await
  }

  pub async fn downloaded_count(&self) -> Result<usize> {
    self.guides.count().await
  }

  // ==========================================================================
  // Read path
  // ==========================================================================

  /// Load a guide, preferring the network.
  ///
  /// 1. Offline: serve the downloaded copy
  /// 2. Online: fetch, refreshing the downloaded copy if there is one
  /// 3. On network failure, serve the downloaded copy
  ///
  /// Without a downloaded copy the remote error propagates.
  pub async fn load_guide(&self, guide_id: &str) -> Result<Loaded<Guide>> {
    if !self.connectivity.is_online() {
      return match self.guides.get(guide_id).await? {
        Some(guide) => Ok(Loaded {
          data: guide,
          source: ReadSource::Cache,
        }),
        None => Err(Error::NotAvailableOffline(guide_id.to_string())),
      };
    }

    match self.api.get_guide(guide_id).await {
      Ok(guide) => {
        if self.guides.has(guide_id).await? {
          self.guides.save(&guide).await?;
        }
        Ok(Loaded {
          data: guide,
          source: ReadSource::Network,
        })
      }
      Err(e) => match self.guides.get(guide_id).await? {
        Some(guide) => {
          warn!(guide_id, error = %e, "fetch failed, serving downloaded copy");
          Ok(Loaded {
            data: guide,
            source: ReadSource::CacheFallback,
          })
        }
        None => Err(e.into()),
      },
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::is_placeholder_id;
  use crate::connectivity::NetworkStatus;
  use crate::testing::{guide, Call, Failure, MockApi};

  struct Fixture {
    client: OfflineClient<MockApi, NetworkStatus>,
    api: Arc<MockApi>,
    network: Arc<NetworkStatus>,
  }

  async fn fixture(online: bool) -> Fixture {
    let db = Database::open_in_memory().unwrap();
    db.initialize().await.unwrap();
    let api = Arc::new(MockApi::new());
    let network = Arc::new(NetworkStatus::new(online));
    Fixture {
      client: OfflineClient::new(&db, api.clone(), network.clone()),
      api,
      network,
    }
  }

  fn chapter_one() -> NewBookmark {
    NewBookmark {
      position: 100,
      name: Some("Ch.1".to_string()),
      ..Default::default()
    }
  }

  #[tokio::test]
  async fn test_offline_bookmark_then_sync() {
    let f = fixture(false).await;

    let written = f.client.create_bookmark("g1", chapter_one()).await.unwrap();
    assert!(written.is_queued());
    assert!(is_placeholder_id(&written.data.id));
    assert_eq!(written.data.position, 100);
    assert_eq!(written.data.name.as_deref(), Some("Ch.1"));
    assert_eq!(f.client.pending_count().await.unwrap(), 1);
    assert!(f.api.calls().is_empty());

    f.network.set_online(true);
    let report = f.client.sync_all().await.unwrap();

    assert_eq!(report.success_count, 1);
    assert_eq!(f.client.pending_count().await.unwrap(), 0);
    assert_eq!(
      f.api.calls(),
      vec![Call::CreateBookmark {
        guide_id: "g1".to_string(),
        bookmark: chapter_one(),
      }]
    );
  }

  #[tokio::test]
  async fn test_online_write_goes_to_api() {
    let f = fixture(true).await;

    let written = f.client.create_bookmark("g1", chapter_one()).await.unwrap();

    assert_eq!(written.source, WriteSource::Remote);
    assert!(!is_placeholder_id(&written.data.id));
    assert_eq!(f.client.pending_count().await.unwrap(), 0);
    assert_eq!(f.api.calls().len(), 1);
  }

  #[tokio::test]
  async fn test_online_failure_propagates_without_queueing() {
    let f = fixture(true).await;
    f.api.fail_guide("g1", Failure::Api(502, "bad gateway"));

    let err = f.client.update_position("g1", 10).await.unwrap_err();

    assert!(matches!(err, Error::Remote(RemoteError::Api { status: 502, .. })));
    assert_eq!(f.client.pending_count().await.unwrap(), 0);
  }

  #[tokio::test]
  async fn test_every_offline_write_is_queued() {
    let f = fixture(false).await;

    f.client.update_position("g1", 10).await.unwrap();
    f.client.delete_bookmark("g1", "b1").await.unwrap();
    let note = f
      .client
      .create_note(
        "g1",
        NewNote {
          position: Some(4),
          content: "secret door".to_string(),
        },
      )
      .await
      .unwrap();
    let edited = f
      .client
      .update_note(
        "g1",
        "n1",
        NotePatch {
          position: None,
          content: Some("edited".to_string()),
        },
      )
      .await
      .unwrap();
    f.client.delete_note("g1", "n1").await.unwrap();

    assert!(is_placeholder_id(&note.data.id));
    assert_eq!(note.data.content, "secret door");
    assert_eq!(edited.data.id(), "n1");
    assert!(matches!(
      edited.data,
      NoteEdit::Pending { ref patch, .. } if patch.content.as_deref() == Some("edited")
    ));

    let pending = f.client.pending_changes().await.unwrap();
    let kinds: Vec<(String, String)> = pending
      .iter()
      .map(|c| (c.change_type.clone(), c.action.clone()))
      .collect();
    assert_eq!(
      kinds,
      vec![
        ("position".to_string(), "update".to_string()),
        ("bookmark".to_string(), "delete".to_string()),
        ("note".to_string(), "create".to_string()),
        ("note".to_string(), "update".to_string()),
        ("note".to_string(), "delete".to_string()),
      ]
    );
    assert!(f.api.calls().is_empty());
  }

  #[tokio::test]
  async fn test_queued_result_carries_change_id() {
    let f = fixture(false).await;
    let written = f.client.update_position("g1", 1).await.unwrap();
    let pending = f.client.pending_changes().await.unwrap();
    assert_eq!(
      written.source,
      WriteSource::Queued {
        change_id: pending[0].id
      }
    );
  }

  #[tokio::test]
  async fn test_offline_reposition_keeps_content_unknown() {
    let f = fixture(false).await;
    let patch = NotePatch {
      position: Some(9),
      content: None,
    };

    let written = f.client.update_note("g1", "n1", patch.clone()).await.unwrap();

    assert!(written.is_queued());
    assert_eq!(
      written.data,
      NoteEdit::Pending {
        id: "n1".to_string(),
        guide_id: "g1".to_string(),
        patch,
      }
    );
  }

  #[tokio::test]
  async fn test_online_note_edit_returns_server_note() {
    let f = fixture(true).await;
    let patch = NotePatch {
      position: Some(9),
      content: Some("moved".to_string()),
    };

    let written = f.client.update_note("g1", "n1", patch).await.unwrap();

    assert_eq!(written.source, WriteSource::Remote);
    match written.data {
      NoteEdit::Applied(note) => {
        assert_eq!(note.id, "n1");
        assert_eq!(note.position, Some(9));
        assert_eq!(note.content, "moved");
      }
      other => panic!("expected applied edit, got {other:?}"),
    }
  }

  #[tokio::test]
  async fn test_placeholder_ids_are_unique() {
    let f = fixture(false).await;
    let a = f.client.create_bookmark("g1", chapter_one()).await.unwrap();
    let b = f.client.create_bookmark("g1", chapter_one()).await.unwrap();
    assert_ne!(a.data.id, b.data.id);
  }

  #[tokio::test]
  async fn test_download_and_remove() {
    let f = fixture(true).await;
    f.api.put_guide(guide("g2"));

    f.client.download_guide("g2").await.unwrap();
    assert!(f.client.is_guide_downloaded("g2").await.unwrap());

    f.client.remove_guide("g2").await.unwrap();
    assert!(!f.client.is_guide_downloaded("g2").await.unwrap());
    assert_eq!(f.client.downloaded_count().await.unwrap(), 0);
  }

  #[tokio::test]
  async fn test_save_guide_and_clear_downloads() {
    let f = fixture(false).await;
    f.client.save_guide(&guide("g1")).await.unwrap();
    f.client.save_guide(&guide("g2")).await.unwrap();
    assert_eq!(f.client.downloaded_count().await.unwrap(), 2);
    assert_eq!(f.client.downloaded_guides().await.unwrap().len(), 2);

    f.client.remove_all_downloads().await.unwrap();
    assert_eq!(f.client.downloaded_count().await.unwrap(), 0);
  }

  #[tokio::test]
  async fn test_load_guide_offline_uses_cache() {
    let f = fixture(false).await;
    f.client.save_guide(&guide("g1")).await.unwrap();

    let loaded = f.client.load_guide("g1").await.unwrap();

    assert_eq!(loaded.source, ReadSource::Cache);
    assert_eq!(loaded.data, guide("g1"));
    assert!(f.api.calls().is_empty());
  }

  #[tokio::test]
  async fn test_load_guide_offline_without_copy_fails() {
    let f = fixture(false).await;
    let err = f.client.load_guide("g1").await.unwrap_err();
    assert!(matches!(err, Error::NotAvailableOffline(ref id) if id == "g1"));
  }

  #[tokio::test]
  async fn test_load_guide_online_refreshes_download() {
    let f = fixture(true).await;
    f.client.save_guide(&guide("g1")).await.unwrap();
    let mut updated = guide("g1");
    updated.title = "Updated".to_string();
    f.api.put_guide(updated.clone());

    let loaded = f.client.load_guide("g1").await.unwrap();

    assert_eq!(loaded.source, ReadSource::Network);
    assert_eq!(f.client.guides().get("g1").await.unwrap(), Some(updated));
  }

  #[tokio::test]
  async fn test_load_guide_online_does_not_download() {
    let f = fixture(true).await;
    f.api.put_guide(guide("g1"));

    f.client.load_guide("g1").await.unwrap();

    assert!(!f.client.is_guide_downloaded("g1").await.unwrap());
  }

  #[tokio::test]
  async fn test_load_guide_falls_back_on_failure() {
    let f = fixture(true).await;
    f.client.save_guide(&guide("g1")).await.unwrap();
    f.api.fail_guide("g1", Failure::Api(500, "down"));

    let loaded = f.client.load_guide("g1").await.unwrap();
    assert_eq!(loaded.source, ReadSource::CacheFallback);

    let err = f.client.load_guide("g9").await.unwrap_err();
    assert!(matches!(err, Error::Remote(RemoteError::Api { status: 404, .. })));
  }
}
