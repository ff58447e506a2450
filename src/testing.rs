//! Test doubles shared by the module tests.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::api::types::{Bookmark, Guide, NewBookmark, NewNote, Note, NotePatch};
use crate::api::GuideApi;
use crate::clock::Clock;
use crate::error::RemoteError;

pub fn guide(id: &str) -> Guide {
  Guide {
    id: id.to_string(),
    title: format!("Guide {}", id),
    author: Some("CJayC".to_string()),
    platform: Some("SNES".to_string()),
    content: "1. Walkthrough\n2. Secrets\n".to_string(),
    updated_at: None,
    extra: BTreeMap::new(),
  }
}

/// Clock that only moves when told to.
pub struct ManualClock {
  now: AtomicI64,
}

impl ManualClock {
  pub fn new(start: i64) -> Self {
    Self {
      now: AtomicI64::new(start),
    }
  }

  pub fn advance(&self, millis: i64) {
    self.now.fetch_add(millis, Ordering::SeqCst);
  }

  pub fn set(&self, millis: i64) {
    self.now.store(millis, Ordering::SeqCst);
  }
}

impl Clock for ManualClock {
  fn now_millis(&self) -> i64 {
    self.now.load(Ordering::SeqCst)
  }
}

/// A recorded call against [`MockApi`].
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
  UpdatePosition {
    guide_id: String,
    position: u64,
  },
  CreateBookmark {
    guide_id: String,
    bookmark: NewBookmark,
  },
  DeleteBookmark {
    guide_id: String,
    bookmark_id: String,
  },
  CreateNote {
    guide_id: String,
    note: NewNote,
  },
  UpdateNote {
    guide_id: String,
    note_id: String,
    patch: NotePatch,
  },
  DeleteNote {
    guide_id: String,
    note_id: String,
  },
  GetGuide {
    guide_id: String,
  },
}

/// Failure injected for every call touching a guide.
#[derive(Debug, Clone)]
pub enum Failure {
  Api(u16, &'static str),
  Rejected(Value),
}

impl Failure {
  fn to_error(&self) -> RemoteError {
    match self {
      Failure::Api(status, message) => RemoteError::Api {
        status: *status,
        message: message.to_string(),
      },
      Failure::Rejected(value) => RemoteError::Rejected(value.clone()),
    }
  }
}

/// In-memory [`GuideApi`] that records every call.
#[derive(Default)]
pub struct MockApi {
  calls: Mutex<Vec<Call>>,
  failures: Mutex<HashMap<String, Failure>>,
  guides: Mutex<HashMap<String, Guide>>,
  delay: Mutex<Option<Duration>>,
  next_id: AtomicUsize,
}

impl MockApi {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn calls(&self) -> Vec<Call> {
    self.calls.lock().unwrap().clone()
  }

  pub fn fail_guide(&self, guide_id: &str, failure: Failure) {
    self
      .failures
      .lock()
      .unwrap()
      .insert(guide_id.to_string(), failure);
  }

  pub fn clear_failures(&self) {
    self.failures.lock().unwrap().clear();
  }

  pub fn put_guide(&self, guide: Guide) {
    self.guides.lock().unwrap().insert(guide.id.clone(), guide);
  }

  /// Make every call take `delay` before answering.
  pub fn set_delay(&self, delay: Duration) {
    *self.delay.lock().unwrap() = Some(delay);
  }

  async fn record(&self, guide_id: &str, call: Call) -> Result<(), RemoteError> {
    let delay = *self.delay.lock().unwrap();
    if let Some(delay) = delay {
      tokio::time::sleep(delay).await;
    }
    self.calls.lock().unwrap().push(call);
    match self.failures.lock().unwrap().get(guide_id) {
      Some(failure) => Err(failure.to_error()),
      None => Ok(()),
    }
  }

  fn next_id(&self, prefix: &str) -> String {
    format!("{}-{}", prefix, self.next_id.fetch_add(1, Ordering::SeqCst) + 1)
  }
}

#[async_trait]
impl GuideApi for MockApi {
  async fn update_guide_position(
    &self,
    guide_id: &str,
    position: u64,
  ) -> Result<(), RemoteError> {
    self
      .record(
        guide_id,
        Call::UpdatePosition {
          guide_id: guide_id.to_string(),
          position,
        },
      )
      .await
  }

  async fn create_bookmark(
    &self,
    guide_id: &str,
    bookmark: &NewBookmark,
  ) -> Result<Bookmark, RemoteError> {
    self
      .record(
        guide_id,
        Call::CreateBookmark {
          guide_id: guide_id.to_string(),
          bookmark: bookmark.clone(),
        },
      )
      .await?;
    Ok(Bookmark {
      id: self.next_id("bm"),
      guide_id: guide_id.to_string(),
      position: bookmark.position,
      name: bookmark.name.clone(),
      page_reference: bookmark.page_reference.clone(),
      is_last_read: bookmark.is_last_read.unwrap_or(false),
    })
  }

  async fn delete_bookmark(&self, guide_id: &str, bookmark_id: &str) -> Result<(), RemoteError> {
    self
      .record(
        guide_id,
        Call::DeleteBookmark {
          guide_id: guide_id.to_string(),
          bookmark_id: bookmark_id.to_string(),
        },
      )
      .await
  }

  async fn create_note(&self, guide_id: &str, note: &NewNote) -> Result<Note, RemoteError> {
    self
      .record(
        guide_id,
        Call::CreateNote {
          guide_id: guide_id.to_string(),
          note: note.clone(),
        },
      )
      .await?;
    Ok(Note {
      id: self.next_id("note"),
      guide_id: guide_id.to_string(),
      position: note.position,
      content: note.content.clone(),
    })
  }

  async fn update_note(
    &self,
    guide_id: &str,
    note_id: &str,
    patch: &NotePatch,
  ) -> Result<Note, RemoteError> {
    self
      .record(
        guide_id,
        Call::UpdateNote {
          guide_id: guide_id.to_string(),
          note_id: note_id.to_string(),
          patch: patch.clone(),
        },
      )
      .await?;
    Ok(Note {
      id: note_id.to_string(),
      guide_id: guide_id.to_string(),
      position: patch.position,
      content: patch.content.clone().unwrap_or_default(),
    })
  }

  async fn delete_note(&self, guide_id: &str, note_id: &str) -> Result<(), RemoteError> {
    self
      .record(
        guide_id,
        Call::DeleteNote {
          guide_id: guide_id.to_string(),
          note_id: note_id.to_string(),
        },
      )
      .await
  }

  async fn get_guide(&self, guide_id: &str) -> Result<Guide, RemoteError> {
    self
      .record(
        guide_id,
        Call::GetGuide {
          guide_id: guide_id.to_string(),
        },
      )
      .await?;
    self
      .guides
      .lock()
      .unwrap()
      .get(guide_id)
      .cloned()
      .ok_or_else(|| RemoteError::Api {
        status: 404,
        message: format!("guide {} not found", guide_id),
      })
  }
}
