//! Test utilities for tablekit.
//!
//! [`MemoryStore`] is a [`Store`](tablekit_core::Store) that never touches a
//! database: it records every begin, statement, commit and rollback, and
//! answers statements from a script or a handler closure.

mod store;

pub use store::{Event, MemoryDbError, MemoryOptions, MemoryStore, MemoryTx, Response};
