//! Connectivity signal read by the write path.

use tokio::sync::watch;

/// Read-only view of whether the device can reach the API.
pub trait Connectivity: Send + Sync {
  fn is_online(&self) -> bool;
}

/// Connectivity flag updated by the host application.
pub struct NetworkStatus {
  tx: watch::Sender<bool>,
}

impl NetworkStatus {
  pub fn new(online: bool) -> Self {
    let (tx, _rx) = watch::channel(online);
    Self { tx }
  }

  pub fn set_online(&self, online: bool) {
    // send_if_modified keeps subscribers quiet when nothing changed
    self.tx.send_if_modified(|current| {
      if *current == online {
        false
      } else {
        *current = online;
        true
      }
    });
  }

  /// Watch for connectivity changes.
  pub fn subscribe(&self) -> watch::Receiver<bool> {
    self.tx.subscribe()
  }
}

impl Default for NetworkStatus {
  fn default() -> Self {
    Self::new(true)
  }
}

impl Connectivity for NetworkStatus {
  fn is_online(&self) -> bool {
    *self.tx.borrow()
  }
}
