//! Object-store trait
//!
//! Decouples the size solver from how objects are actually read. The
//! solver only sees headers, parsed trees/commits/tags, and reference
//! listings, so it can run against a real repository or an in-memory
//! fixture.

use anyhow::Result;
use gix::ObjectId;

use super::types::{CommitData, ObjectHeader, Reference, TagData, TreeData};

/// Read access to a content-addressed object graph.
///
/// Iterators are lazy where the backing store allows it; every item is a
/// `Result` so store failures surface at the point of use and abort the
/// scan.
pub trait ObjectStore {
    /// All objects reachable from the store's references, children
    /// generally before the objects that refer to them. Used by preload
    /// to prime blob sizes and commit byte lengths; correctness does not
    /// depend on the order.
    fn iter_objects(&self) -> Result<Box<dyn Iterator<Item = Result<ObjectHeader>> + '_>>;

    /// All reachable commits, oldest first, parents before children
    /// wherever the store can guarantee it. The solver falls back to its
    /// work list for any commit seen before its ancestors.
    fn iter_commits_reverse_topo(
        &self,
    ) -> Result<Box<dyn Iterator<Item = Result<(ObjectId, CommitData)>> + '_>>;

    /// All references, with each target's kind and byte size resolved.
    fn iter_references(&self) -> Result<Box<dyn Iterator<Item = Result<Reference>> + '_>>;

    /// Resolve any identifier the store understands (an oid, a ref name,
    /// a revision expression) to an object header.
    fn read_header(&self, spec: &str) -> Result<ObjectHeader>;

    fn read_tree(&self, oid: ObjectId) -> Result<TreeData>;

    fn read_commit(&self, oid: ObjectId) -> Result<CommitData>;

    fn read_tag(&self, oid: ObjectId) -> Result<TagData>;
}

/// A shared store can back several solvers at once.
impl<S: ObjectStore + ?Sized> ObjectStore for &S {
    fn iter_objects(&self) -> Result<Box<dyn Iterator<Item = Result<ObjectHeader>> + '_>> {
        (**self).iter_objects()
    }

    fn iter_commits_reverse_topo(
        &self,
    ) -> Result<Box<dyn Iterator<Item = Result<(ObjectId, CommitData)>> + '_>> {
        (**self).iter_commits_reverse_topo()
    }

    fn iter_references(&self) -> Result<Box<dyn Iterator<Item = Result<Reference>> + '_>> {
        (**self).iter_references()
    }

    fn read_header(&self, spec: &str) -> Result<ObjectHeader> {
        (**self).read_header(spec)
    }

    fn read_tree(&self, oid: ObjectId) -> Result<TreeData> {
        (**self).read_tree(oid)
    }

    fn read_commit(&self, oid: ObjectId) -> Result<CommitData> {
        (**self).read_commit(oid)
    }

    fn read_tag(&self, oid: ObjectId) -> Result<TagData> {
        (**self).read_tag(oid)
    }
}
