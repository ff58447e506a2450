//! Drains the change queue through the dispatcher.

use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

use super::change::Mutation;
use super::dispatcher::Dispatcher;
use crate::api::GuideApi;
use crate::error::Result;
use crate::store::{ChangeQueue, PendingChange};

/// Outcome of one sync pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
  pub success_count: usize,
  pub failed_count: usize,
  /// One message per failed change, in queue order
  pub errors: Vec<String>,
}

impl SyncReport {
  pub fn is_clean(&self) -> bool {
    self.failed_count == 0
  }
}

/// Single entry point for queueing and replaying offline changes.
pub struct SyncOrchestrator<A: GuideApi> {
  queue: ChangeQueue,
  dispatcher: Dispatcher<A>,
  // Held across drain-dispatch-remove so passes never overlap
  in_flight: Arc<Mutex<()>>,
}

impl<A: GuideApi> SyncOrchestrator<A> {
  pub fn new(queue: ChangeQueue, api: Arc<A>) -> Self {
    Self {
      queue,
      dispatcher: Dispatcher::new(api),
      in_flight: Arc::new(Mutex::new(())),
    }
  }

  /// Replay every queued change, oldest first.
  ///
  /// Succeeded changes are removed; failed ones stay queued for the next
  /// pass and their messages are collected. A failure never stops the pass.
  /// Storage errors abort it.
  pub async fn sync_all(&self) -> Result<SyncReport> {
    let _guard = self.in_flight.lock().await;

    let pending = self.queue.drain().await?;
    if pending.is_empty() {
      return Ok(SyncReport::default());
    }
    info!(pending = pending.len(), "starting sync pass");

    let mut report = SyncReport::default();
    for change in &pending {
      match self.dispatcher.dispatch(change).await {
        Ok(()) => {
          self.queue.remove_one(change.id).await?;
          report.success_count += 1;
        }
        Err(e) => {
          let message = e.failure_message();
          warn!(
            id = change.id,
            change_type = %change.change_type,
            action = %change.action,
            error = %e,
            "change failed, keeping it queued"
          );
          report.failed_count += 1;
          report.errors.push(message);
        }
      }
    }

    info!(
      succeeded = report.success_count,
      failed = report.failed_count,
      "sync pass finished"
    );
    Ok(report)
  }

  pub async fn queue_change(&self, mutation: &Mutation) -> Result<i64> {
    self.queue.enqueue_mutation(mutation).await
  }

  pub async fn pending_count(&self) -> Result<usize> {
    self.queue.count().await
  }

  pub async fn pending_changes(&self) -> Result<Vec<PendingChange>> {
    self.queue.drain().await
  }

  pub async fn clear_queue(&self) -> Result<()> {
    self.queue.clear().await
  }
}

impl<A: GuideApi> Clone for SyncOrchestrator<A> {
  fn clone(&self) -> Self {
    Self {
      queue: self.queue.clone(),
      dispatcher: self.dispatcher.clone(),
      in_flight: Arc::clone(&self.in_flight),
    }
  }
}
