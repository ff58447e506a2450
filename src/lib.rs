//! Offline-first cache and change queue for a guide reader.
//!
//! - [`store`]: SQLite-backed guide cache and pending-change queue
//! - [`sync`]: dispatcher and orchestrator replaying queued changes
//! - [`client`]: connectivity-aware writes, downloads and cache-fallback reads

pub mod api;
pub mod client;
pub mod clock;
pub mod config;
pub mod connectivity;
pub mod error;
pub mod logging;
pub mod store;
pub mod sync;

#[cfg(test)]
mod testing;

pub use api::{GuideApi, HttpGuideApi};
pub use client::{Loaded, NoteEdit, OfflineClient, ReadSource, WriteSource, Written};
pub use config::Config;
pub use connectivity::{Connectivity, NetworkStatus};
pub use error::{Error, RemoteError, Result};
pub use store::Database;
pub use sync::{SyncOrchestrator, SyncReport};
