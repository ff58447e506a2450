//! Maps one queued change onto exactly one remote API call.

use std::sync::Arc;
use tracing::debug;

use super::change::Mutation;
use crate::api::GuideApi;
use crate::error::Result;
use crate::store::PendingChange;

pub struct Dispatcher<A: GuideApi> {
  api: Arc<A>,
}

impl<A: GuideApi> Dispatcher<A> {
  pub fn new(api: Arc<A>) -> Self {
    Self { api }
  }

  /// Replay `change` against the remote API. No retries.
  pub async fn dispatch(&self, change: &PendingChange) -> Result<()> {
    let mutation = change.mutation()?;
    debug!(
      id = change.id,
      change_type = %change.change_type,
      action = %change.action,
      guide_id = %mutation.guide_id(),
      "dispatching change"
    );
    self.apply(&mutation).await
  }

  /// Perform the remote call for a typed mutation.
  pub async fn apply(&self, mutation: &Mutation) -> Result<()> {
    match mutation {
      Mutation::UpdatePosition(p) => {
        self
          .api
          .update_guide_position(&p.guide_id, p.position)
          .await?;
      }
      Mutation::CreateBookmark(p) => {
        self.api.create_bookmark(&p.guide_id, &p.bookmark).await?;
      }
      Mutation::DeleteBookmark(p) => {
        self
          .api
          .delete_bookmark(&p.guide_id, &p.bookmark_id)
          .await?;
      }
      Mutation::CreateNote(p) => {
        self.api.create_note(&p.guide_id, &p.note).await?;
      }
      Mutation::UpdateNote(p) => {
        self
          .api
          .update_note(&p.guide_id, &p.note_id, &p.patch)
          .await?;
      }
      Mutation::DeleteNote(p) => {
        self.api.delete_note(&p.guide_id, &p.note_id).await?;
      }
    }
    Ok(())
  }
}

impl<A: GuideApi> Clone for Dispatcher<A> {
  fn clone(&self) -> Self {
    Self {
      api: Arc::clone(&self.api),
    }
  }
}
