//! tessera-file - Filesystem-backed document store.
//!
//! Documents live as one JSON file each under
//! `<root>/collections/<collection>/<id>.json`. Sorted queries that also
//! filter need a composite index declared in `<root>/indexes.json`, the same
//! way a hosted store would reject them until the index is built.

mod backend;
mod index;
mod store;

pub use backend::{DEFAULT_MAX_BATCH_SIZE, FileBackend};
pub use index::CompositeIndex;
pub use store::FileStore;
