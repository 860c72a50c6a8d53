//! Recursive size solver
//!
//! Walks the object graph and computes per-object aggregates plus the
//! whole-history rollup. Each object is solved at most once; recursion
//! is replaced by an explicit LIFO work list so arbitrarily long
//! histories and deep directory trees cannot exhaust the call stack.
//!
//! # Architecture
//!
//! - **task**: the three pending-task shapes, each carrying partial
//!   progress for one unresolved object
//! - **work_list**: the LIFO that drives iteration
//! - **solver**: caches, preload, and the per-object entry points

mod task;
mod work_list;

use anyhow::{bail, Result};
use gix::ObjectId;
use rustc_hash::FxHashMap;

use crate::model::{
    BlobSize, CommitSize, Count32, HistorySize, ObjectKind, ObjectSize, TagSize, TreeSize,
};
use crate::repository::store::ObjectStore;
use crate::repository::types::{ObjectHeader, Reference};

use task::{PendingCommit, PendingTag, PendingTree, Task};
use work_list::WorkList;

/// Cache-backed size solver over an object store.
///
/// All state lives here; two solvers over the same store are fully
/// independent. Presence of an oid in a cache means its size is fully
/// resolved, never a placeholder.
pub struct SizeSolver<S: ObjectStore> {
    pub(crate) store: S,

    pub(crate) blob_sizes: FxHashMap<ObjectId, BlobSize>,
    pub(crate) tree_sizes: FxHashMap<ObjectId, TreeSize>,
    pub(crate) commit_sizes: FxHashMap<ObjectId, CommitSize>,
    pub(crate) tag_sizes: FxHashMap<ObjectId, TagSize>,

    // Set once preload finishes; lazily-read commits after that point
    // get a diagnostic note, since preload should have covered them.
    pub(crate) preloaded: bool,

    history: HistorySize,
}

impl<S: ObjectStore> SizeSolver<S> {
    /// Construct a solver and prime it: blob sizes and commit ancestry
    /// are computed up front, trees and tags stay lazy.
    pub fn new(store: S) -> Result<Self> {
        let mut solver = Self::unprimed(store);
        solver.preload()?;
        Ok(solver)
    }

    /// Construct a solver without the preload pass. Everything resolves
    /// lazily through the work list; results are identical to a primed
    /// solver's.
    pub fn unprimed(store: S) -> Self {
        SizeSolver {
            store,
            blob_sizes: FxHashMap::default(),
            tree_sizes: FxHashMap::default(),
            commit_sizes: FxHashMap::default(),
            tag_sizes: FxHashMap::default(),
            preloaded: false,
            history: HistorySize::default(),
        }
    }

    /// Prime the caches: one pass over all objects records every blob
    /// (blobs are leaves) and stashes commit byte sizes; one pass over
    /// commits, oldest first, resolves ancestry so that later reference
    /// scans find commits already cached.
    fn preload(&mut self) -> Result<()> {
        let mut commit_object_sizes: FxHashMap<ObjectId, Count32> = FxHashMap::default();
        let mut blobs: Vec<(ObjectId, Count32)> = Vec::new();

        for header in self.store.iter_objects()? {
            let header = header?;
            match header.kind {
                ObjectKind::Blob => blobs.push((header.oid, header.size)),
                ObjectKind::Commit => {
                    commit_object_sizes.insert(header.oid, header.size);
                }
                ObjectKind::Tree | ObjectKind::Tag => {}
            }
        }
        for (oid, size) in blobs {
            self.record_blob(oid, BlobSize { size });
        }

        let commits: Vec<(ObjectId, _)> = self
            .store
            .iter_commits_reverse_topo()?
            .collect::<Result<_>>()?;

        let mut to_do = WorkList::default();
        for (oid, mut commit) in commits {
            if self.commit_sizes.contains_key(&oid) {
                continue;
            }
            match commit_object_sizes.get(&oid) {
                Some(&size) => commit.size = size,
                None => eprintln!("warning: size of commit {} not found in cache", oid),
            }
            // Oldest first, so in the common case the parents are
            // already cached and this resolves without deferral; the
            // work list covers the rest.
            to_do.push(Task::Commit(PendingCommit::preloaded(oid, commit)));
            self.fill(&mut to_do)?;
        }

        self.preloaded = true;
        Ok(())
    }

    /// The rollup accumulated so far.
    pub fn history(&self) -> &HistorySize {
        &self.history
    }

    pub fn into_history(self) -> HistorySize {
        self.history
    }

    /// The size of a blob, from cache or a direct header read.
    pub fn blob_size(&mut self, oid: ObjectId) -> Result<BlobSize> {
        if let Some(&size) = self.blob_sizes.get(&oid) {
            return Ok(size);
        }
        let header = self.store.read_header(&oid.to_string())?;
        if header.kind != ObjectKind::Blob {
            bail!("object {} is a {}, not a blob", oid, header.kind);
        }
        let size = BlobSize { size: header.size };
        self.record_blob(oid, size);
        Ok(size)
    }

    /// The aggregate size of a tree, resolving its closure on demand.
    pub fn tree_size(&mut self, oid: ObjectId) -> Result<TreeSize> {
        if let Some(&size) = self.tree_sizes.get(&oid) {
            return Ok(size);
        }

        let mut to_do = WorkList::default();
        let pending = self.pending_tree(oid)?;
        to_do.push(Task::Tree(pending));
        self.fill(&mut to_do)?;

        match self.tree_sizes.get(&oid) {
            Some(&size) => Ok(size),
            None => panic!("work list drained without recording tree {}", oid),
        }
    }

    /// The aggregate size of a commit, resolving its tree and ancestry
    /// on demand.
    pub fn commit_size(&mut self, oid: ObjectId) -> Result<CommitSize> {
        if let Some(&size) = self.commit_sizes.get(&oid) {
            return Ok(size);
        }

        let mut to_do = WorkList::default();
        to_do.push(Task::Commit(PendingCommit::new(oid)));
        self.fill(&mut to_do)?;

        match self.commit_sizes.get(&oid) {
            Some(&size) => Ok(size),
            None => panic!("work list drained without recording commit {}", oid),
        }
    }

    /// The aggregate size of an annotated tag, resolving its referent
    /// chain on demand.
    pub fn tag_size(&mut self, oid: ObjectId) -> Result<TagSize> {
        if let Some(&size) = self.tag_sizes.get(&oid) {
            return Ok(size);
        }

        let mut to_do = WorkList::default();
        to_do.push(Task::Tag(PendingTag::new(oid)));
        self.fill(&mut to_do)?;

        match self.tag_sizes.get(&oid) {
            Some(&size) => Ok(size),
            None => panic!("work list drained without recording tag {}", oid),
        }
    }

    /// Size of an object whose kind and byte length are already known,
    /// e.g. from a reference listing. Blobs take the fast path; other
    /// kinds delegate to their entry points.
    pub fn typed_object_size(
        &mut self,
        oid: ObjectId,
        kind: ObjectKind,
        object_size: Count32,
    ) -> Result<ObjectSize> {
        match kind {
            ObjectKind::Blob => {
                let size = BlobSize { size: object_size };
                self.record_blob(oid, size);
                Ok(ObjectSize::Blob(size))
            }
            ObjectKind::Tree => Ok(ObjectSize::Tree(self.tree_size(oid)?)),
            ObjectKind::Commit => Ok(ObjectSize::Commit(self.commit_size(oid)?)),
            ObjectKind::Tag => Ok(ObjectSize::Tag(self.tag_size(oid)?)),
        }
    }

    /// Resolve any store-understood identifier and size the object it
    /// names.
    pub fn object_size(&mut self, spec: &str) -> Result<(ObjectHeader, ObjectSize)> {
        let header = self.store.read_header(spec)?;
        let size = self.typed_object_size(header.oid, header.kind, header.size)?;
        Ok((header, size))
    }

    /// Size a reference's target and record the reference in the rollup.
    pub fn reference_size(&mut self, reference: &Reference) -> Result<ObjectSize> {
        let size = self.typed_object_size(reference.oid, reference.kind, reference.size)?;
        self.history.record_reference(reference.kind);
        if let ObjectSize::Tree(tree) = size {
            self.history.record_reference_root(tree);
        }
        Ok(size)
    }

    /// Build the pending task for a tree, parsing the tree object
    /// eagerly so retries never re-read it.
    pub(crate) fn pending_tree(&self, oid: ObjectId) -> Result<PendingTree> {
        let tree = self.store.read_tree(oid)?;
        Ok(PendingTree {
            oid,
            object_size: tree.size,
            entry_count: Count32::default(),
            tree_size: TreeSize {
                expanded_tree_count: Count32::from(1),
                ..Default::default()
            },
            remaining_entries: tree.entries,
        })
    }

    /// Drive the work list to exhaustion without recursion.
    fn fill(&mut self, to_do: &mut WorkList) -> Result<()> {
        to_do.run(self)
    }

    pub(crate) fn record_blob(&mut self, oid: ObjectId, size: BlobSize) {
        if self.blob_sizes.insert(oid, size).is_none() {
            self.history.record_blob(size);
        }
    }

    pub(crate) fn record_tree(
        &mut self,
        oid: ObjectId,
        tree_size: TreeSize,
        size: Count32,
        entry_count: Count32,
    ) {
        if self.tree_sizes.insert(oid, tree_size).is_none() {
            self.history.record_tree(tree_size, size, entry_count);
        }
    }

    pub(crate) fn record_commit(
        &mut self,
        oid: ObjectId,
        commit_size: CommitSize,
        size: Count32,
        parent_count: Count32,
    ) {
        if self.commit_sizes.insert(oid, commit_size).is_none() {
            self.history.record_commit(commit_size, size, parent_count);
        }
    }

    pub(crate) fn record_tag(&mut self, oid: ObjectId, tag_size: TagSize, size: Count32) {
        if self.tag_sizes.insert(oid, tag_size).is_none() {
            self.history.record_tag(tag_size, size);
        }
    }
}

/// Scan every reference that passes `filter` and return the rollup.
pub fn scan_repository<S: ObjectStore>(
    store: S,
    filter: impl Fn(&Reference) -> bool,
) -> Result<HistorySize> {
    let mut solver = SizeSolver::new(store)?;

    let references: Vec<Reference> = solver.store.iter_references()?.collect::<Result<_>>()?;
    for reference in references {
        if !filter(&reference) {
            continue;
        }
        solver.reference_size(&reference)?;
    }

    Ok(solver.into_history())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MemoryStore;

    fn store_with_commit() -> (MemoryStore, ObjectId, ObjectId) {
        let mut store = MemoryStore::new();
        let b1 = store.add_blob(10);
        let b2 = store.add_blob(20);
        let b3 = store.add_blob(30);
        let tree = store.add_tree(&[("a.txt", b1), ("b.txt", b2), ("c.txt", b3)], &[]);
        let commit = store.add_commit(tree, &[]);
        (store, tree, commit)
    }

    #[test]
    fn test_flat_tree_aggregates() {
        let (store, tree, _) = store_with_commit();
        let mut solver = SizeSolver::unprimed(store);

        let size = solver.tree_size(tree).unwrap();
        assert_eq!(size.max_path_depth.value(), 2);
        assert_eq!(size.expanded_tree_count.value(), 1);
        assert_eq!(size.expanded_blob_count.value(), 3);
        assert_eq!(size.expanded_blob_size.value(), 60);
    }

    #[test]
    fn test_single_commit_depth() {
        let (store, _, commit) = store_with_commit();
        let mut solver = SizeSolver::unprimed(store);

        let size = solver.commit_size(commit).unwrap();
        assert_eq!(size.max_ancestor_depth.value(), 1);
    }

    #[test]
    fn test_nested_tree_depth_and_counts() {
        let mut store = MemoryStore::new();
        let blob = store.add_blob(5);
        let leaf = store.add_tree(&[("deep.txt", blob)], &[]);
        let mid = store.add_tree(&[], &[("leaf", leaf)]);
        let root = store.add_tree(&[("top.txt", blob)], &[("mid", mid)]);

        let mut solver = SizeSolver::unprimed(store);
        let size = solver.tree_size(root).unwrap();
        assert_eq!(size.max_path_depth.value(), 4);
        assert_eq!(size.expanded_tree_count.value(), 3);
        assert_eq!(size.expanded_blob_count.value(), 2);
        assert_eq!(size.expanded_blob_size.value(), 10);
    }

    #[test]
    fn test_linear_history_ancestor_depth() {
        let mut store = MemoryStore::new();
        let blob = store.add_blob(1);
        let tree = store.add_tree(&[("f", blob)], &[]);
        let mut tip = store.add_commit(tree, &[]);
        for _ in 0..4 {
            tip = store.add_commit(tree, &[tip]);
        }

        let mut solver = SizeSolver::unprimed(store);
        let size = solver.commit_size(tip).unwrap();
        assert_eq!(size.max_ancestor_depth.value(), 5);
        assert_eq!(solver.history().unique_commit_count.value(), 5);
        assert_eq!(solver.history().unique_tree_count.value(), 1);
        assert_eq!(solver.history().unique_blob_count.value(), 1);
    }

    #[test]
    fn test_diamond_resolves_shared_ancestor_once() {
        let mut store = MemoryStore::new();
        let blob = store.add_blob(1);
        let tree = store.add_tree(&[("f", blob)], &[]);
        let a = store.add_commit(tree, &[]);
        let b = store.add_commit(tree, &[a]);
        let c = store.add_commit(tree, &[a]);
        let d = store.add_commit(tree, &[b, c]);

        let mut solver = SizeSolver::unprimed(store);
        let size = solver.commit_size(d).unwrap();
        assert_eq!(size.max_ancestor_depth.value(), 3);
        assert_eq!(solver.history().unique_commit_count.value(), 4);
        assert_eq!(solver.history().max_parent_count.value(), 2);
        // The shared root was read exactly once despite being reachable
        // through both sides of the diamond.
        assert_eq!(solver.store.commit_reads(a), 1);
    }

    #[test]
    fn test_tag_chain_depths() {
        let mut store = MemoryStore::new();
        let blob = store.add_blob(1);
        let tree = store.add_tree(&[("f", blob)], &[]);
        let commit = store.add_commit(tree, &[]);
        let t3 = store.add_tag(commit, ObjectKind::Commit);
        let t2 = store.add_tag(t3, ObjectKind::Tag);
        let t1 = store.add_tag(t2, ObjectKind::Tag);

        let mut solver = SizeSolver::unprimed(store);
        assert_eq!(solver.tag_size(t1).unwrap().tag_depth.value(), 3);
        assert_eq!(solver.tag_size(t2).unwrap().tag_depth.value(), 2);
        assert_eq!(solver.tag_size(t3).unwrap().tag_depth.value(), 1);
        assert_eq!(solver.history().max_tag_depth.value(), 3);
        assert_eq!(solver.history().unique_tag_count.value(), 3);
    }

    #[test]
    fn test_tag_of_blob_uses_blob_cache() {
        let mut store = MemoryStore::new();
        let blob = store.add_blob(100);
        let tag_a = store.add_tag(blob, ObjectKind::Blob);
        let tag_b = store.add_tag(blob, ObjectKind::Blob);

        let mut solver = SizeSolver::unprimed(store);
        assert_eq!(solver.tag_size(tag_a).unwrap().tag_depth.value(), 1);
        // The blob landed in the cache via one header read.
        assert_eq!(solver.store.header_reads(blob), 1);
        assert_eq!(solver.blob_size(blob).unwrap().size.value(), 100);
        assert_eq!(solver.history().unique_blob_count.value(), 1);

        // A second tag of the same blob is served from the blob cache,
        // not another header read.
        assert_eq!(solver.tag_size(tag_b).unwrap().tag_depth.value(), 1);
        assert_eq!(solver.store.header_reads(blob), 1);
    }

    #[test]
    fn test_idempotent_re_requests() {
        let (store, tree, commit) = store_with_commit();
        let mut solver = SizeSolver::unprimed(store);

        let first = solver.commit_size(commit).unwrap();
        let history = solver.history().clone();

        assert_eq!(solver.commit_size(commit).unwrap(), first);
        assert_eq!(solver.tree_size(tree).unwrap(), solver.tree_size(tree).unwrap());
        // No rollup drift from re-requests.
        assert_eq!(solver.history(), &history);
    }

    #[test]
    fn test_blob_size_kind_mismatch_is_an_error() {
        let (store, tree, _) = store_with_commit();
        let mut solver = SizeSolver::unprimed(store);

        let err = solver.blob_size(tree).unwrap_err();
        assert!(err.to_string().contains("not a blob"));
    }

    #[test]
    fn test_preload_primes_blobs_and_commits() {
        let mut store = MemoryStore::new();
        let blob = store.add_blob(10);
        let tree = store.add_tree(&[("f", blob)], &[]);
        let c1 = store.add_commit(tree, &[]);
        let c2 = store.add_commit(tree, &[c1]);
        store.add_reference("refs/heads/main", c2);

        let mut solver = SizeSolver::new(store).unwrap();
        assert_eq!(solver.history().unique_blob_count.value(), 1);
        assert_eq!(solver.history().unique_commit_count.value(), 2);
        // Preloaded commits never hit read_commit.
        assert_eq!(solver.store.commit_reads(c1), 0);
        assert_eq!(solver.store.commit_reads(c2), 0);
        assert_eq!(solver.commit_size(c2).unwrap().max_ancestor_depth.value(), 2);
    }

    #[test]
    fn test_deep_linear_history_does_not_overflow_stack() {
        let mut store = MemoryStore::new();
        let blob = store.add_blob(1);
        let tree = store.add_tree(&[("f", blob)], &[]);
        let mut tip = store.add_commit(tree, &[]);
        for _ in 0..20_000 {
            tip = store.add_commit(tree, &[tip]);
        }

        // Unprimed on purpose: the whole chain resolves through the work
        // list, which is the point of the iterative design.
        let mut solver = SizeSolver::unprimed(store);
        let size = solver.commit_size(tip).unwrap();
        assert_eq!(size.max_ancestor_depth.value(), 20_001);
    }

    #[test]
    fn test_deeply_nested_trees_do_not_overflow_stack() {
        let mut store = MemoryStore::new();
        let blob = store.add_blob(1);
        let mut inner = store.add_tree(&[("f", blob)], &[]);
        for _ in 0..5_000 {
            inner = store.add_tree(&[], &[("d", inner)]);
        }

        let mut solver = SizeSolver::unprimed(store);
        let size = solver.tree_size(inner).unwrap();
        assert_eq!(size.max_path_depth.value(), 5_002);
        assert_eq!(size.expanded_tree_count.value(), 5_001);
    }

    #[test]
    fn test_wide_tree_compaction_retries_only_pending_entries() {
        // A root with many child trees: the first pass defers on all of
        // them, and each retry must fold in whatever resolved meanwhile
        // rather than starting over.
        let mut store = MemoryStore::new();
        let blob = store.add_blob(2);
        let mut children = Vec::new();
        for i in 0..50 {
            let child = store.add_tree(&[(format!("f{}", i).as_str(), blob)], &[]);
            children.push((format!("d{}", i), child));
        }
        let child_refs: Vec<(&str, ObjectId)> = children
            .iter()
            .map(|(name, oid)| (name.as_str(), *oid))
            .collect();
        let root = store.add_tree(&[], &child_refs);

        let mut solver = SizeSolver::unprimed(store);
        let size = solver.tree_size(root).unwrap();
        assert_eq!(size.expanded_tree_count.value(), 51);
        assert_eq!(size.expanded_blob_count.value(), 50);
        // Each child tree was parsed exactly once.
        for (_, child) in &children {
            assert_eq!(solver.store.tree_reads(*child), 1);
        }
    }
}
