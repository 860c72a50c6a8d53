mod gix_store;
mod memory;
mod solver;
mod store;
mod types;

pub use gix_store::GixStore;
pub use memory::MemoryStore;
pub use solver::{scan_repository, SizeSolver};
pub use store::ObjectStore;
pub use types::{CommitData, EntryKind, ObjectHeader, Reference, TagData, TreeData, TreeEntry};
