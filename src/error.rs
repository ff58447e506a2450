//! Error taxonomy for the offline cache, change queue and sync layer.

use thiserror::Error;

/// Message recorded for failures that carry no readable description.
pub const UNKNOWN_ERROR: &str = "Unknown error";

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
  /// The on-device store could not be opened or written.
  #[error("storage unavailable: {0}")]
  Storage(String),

  #[error("storage unavailable: {0}")]
  Sqlite(#[from] rusqlite::Error),

  #[error("invalid configuration: {0}")]
  Config(String),

  /// The log directory or subscriber could not be set up.
  #[error("failed to set up logging: {0}")]
  Logging(String),

  /// The store was used after `close()`.
  #[error("store has been closed")]
  Closed,

  #[error("failed to encode or decode stored data: {0}")]
  Serialization(#[from] serde_json::Error),

  /// A queued change names a (type, action) pair the dispatcher cannot map.
  #[error("Unknown sync type: {change_type} (action: {action})")]
  UnknownSyncType { change_type: String, action: String },

  /// A known (type, action) pair whose payload is malformed or lacks required fields.
  #[error("invalid payload for {change_type}/{action}: {source}")]
  InvalidPayload {
    change_type: String,
    action: String,
    #[source]
    source: serde_json::Error,
  },

  /// Offline read of a guide that was never downloaded.
  #[error("guide {0} is not available offline")]
  NotAvailableOffline(String),

  #[error(transparent)]
  Remote(#[from] RemoteError),
}

impl Error {
  /// Readable message for a failed sync item.
  ///
  /// Rejections that carry no error description collapse to [`UNKNOWN_ERROR`].
  pub fn failure_message(&self) -> String {
    match self {
      Error::Remote(remote) => remote
        .message()
        .unwrap_or_else(|| UNKNOWN_ERROR.to_string()),
      other => other.to_string(),
    }
  }
}

/// Failure reported by the remote guide API.
#[derive(Debug, Error)]
pub enum RemoteError {
  #[error("request failed: {0}")]
  Transport(#[from] reqwest::Error),

  #[error("{message} (HTTP {status})")]
  Api { status: u16, message: String },

  #[error("unexpected response: {0}")]
  Decode(String),

  /// The request was rejected with a value that is not an error description.
  #[error("request rejected with {0}")]
  Rejected(serde_json::Value),
}

impl RemoteError {
  /// The readable message, or `None` when the rejection carried none.
  pub fn message(&self) -> Option<String> {
    match self {
      RemoteError::Rejected(_) => None,
      other => Some(other.to_string()),
    }
  }

  pub fn status(&self) -> Option<u16> {
    match self {
      RemoteError::Api { status, .. } => Some(*status),
      RemoteError::Transport(e) => e.status().map(|s| s.as_u16()),
      _ => None,
    }
  }
}
