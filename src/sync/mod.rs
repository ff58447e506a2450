//! Offline change replay.
//!
//! - [`Mutation`]: typed (type, action, payload) changes
//! - [`Dispatcher`]: one change to one remote call
//! - [`SyncOrchestrator`]: FIFO replay of the queue with per-item failure isolation

mod change;
mod dispatcher;
mod orchestrator;

pub use change::{
  BookmarkCreate, BookmarkDelete, ChangeAction, ChangeType, Mutation, NoteCreate, NoteDelete,
  NoteUpdate, PositionUpdate,
};
pub use dispatcher::Dispatcher;
pub use orchestrator::{SyncOrchestrator, SyncReport};
