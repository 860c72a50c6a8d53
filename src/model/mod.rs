mod count;
mod history;
mod kind;
mod size;

pub use count::Count32;
pub use history::HistorySize;
pub use kind::ObjectKind;
pub use size::{BlobSize, CommitSize, ObjectSize, TagSize, TreeSize};
