//! Pending tasks
//!
//! A task carries the partial progress of one unresolved object. Its
//! `queue` step either completes the object from cached children or
//! re-enqueues itself behind sub-tasks for the children it is missing;
//! `run` wraps `queue` with the cache re-check that makes shared
//! subgraphs cheap.

use anyhow::Result;
use gix::ObjectId;

use super::work_list::WorkList;
use super::SizeSolver;
use crate::model::{CommitSize, Count32, ObjectKind, TagSize, TreeSize};
use crate::repository::store::ObjectStore;
use crate::repository::types::{CommitData, EntryKind, TagData, TreeEntry};

/// Outcome of a `queue` attempt. `NotYetKnown` means the task pushed
/// itself and its missing children back onto the work list; it never
/// escapes the dispatch loop. Store failures travel on the `Err` path.
pub(crate) enum Queued<T> {
    Done(T),
    NotYetKnown,
}

pub(crate) enum Task {
    Tree(PendingTree),
    Commit(PendingCommit),
    Tag(PendingTag),
}

impl Task {
    pub(crate) fn run<S: ObjectStore>(
        self,
        solver: &mut SizeSolver<S>,
        to_do: &mut WorkList,
    ) -> Result<()> {
        match self {
            Task::Tree(t) => t.run(solver, to_do),
            Task::Commit(c) => c.run(solver, to_do),
            Task::Tag(t) => t.run(solver, to_do),
        }
    }
}

/// A tree whose entries are being folded in. `remaining_entries` shrinks
/// as children resolve, so a retry only rescans what is still pending.
pub(crate) struct PendingTree {
    pub(crate) oid: ObjectId,
    pub(crate) object_size: Count32,
    pub(crate) entry_count: Count32,
    pub(crate) tree_size: TreeSize,
    pub(crate) remaining_entries: Vec<TreeEntry>,
}

impl PendingTree {
    /// Fold in every entry whose size is already known. Entries backed
    /// by unresolved child trees are compacted to the head of
    /// `remaining_entries` and the task defers behind one sub-task per
    /// missing child.
    fn queue<S: ObjectStore>(
        mut self,
        solver: &mut SizeSolver<S>,
        to_do: &mut WorkList,
    ) -> Result<Queued<(TreeSize, Count32, Count32)>> {
        let mut subtasks = WorkList::default();

        let mut dst = 0;
        for src in 0..self.remaining_entries.len() {
            let oid = self.remaining_entries[src].oid;
            match self.remaining_entries[src].kind() {
                EntryKind::Tree => {
                    if let Some(&subsize) = solver.tree_sizes.get(&oid) {
                        self.tree_size.add_descendent(subsize);
                        self.entry_count.increment(Count32::from(1));
                    } else {
                        // Schedule this one to be computed.
                        subtasks.push(Task::Tree(solver.pending_tree(oid)?));
                        if dst < src {
                            self.remaining_entries.swap(dst, src);
                        }
                        dst += 1;
                    }
                }
                EntryKind::Submodule => {
                    self.tree_size.add_submodule();
                    self.entry_count.increment(Count32::from(1));
                }
                EntryKind::Link => {
                    self.tree_size.add_link();
                    self.entry_count.increment(Count32::from(1));
                }
                EntryKind::Blob => {
                    // Cache hit or a cheap synchronous header read.
                    let blob = solver.blob_size(oid)?;
                    self.tree_size.add_blob(blob);
                    self.entry_count.increment(Count32::from(1));
                }
            }
        }

        if dst > 0 {
            self.remaining_entries.truncate(dst);
            to_do.push(Task::Tree(self));
            to_do.push_all(subtasks);
            return Ok(Queued::NotYetKnown);
        }

        // One more component of depth for this tree itself.
        self.tree_size.max_path_depth.increment(Count32::from(1));
        Ok(Queued::Done((
            self.tree_size,
            self.object_size,
            self.entry_count,
        )))
    }

    fn run<S: ObjectStore>(self, solver: &mut SizeSolver<S>, to_do: &mut WorkList) -> Result<()> {
        // The size may have been computed since this task was enqueued,
        // if the tree is shared by several parents.
        if solver.tree_sizes.contains_key(&self.oid) {
            return Ok(());
        }
        let oid = self.oid;
        if let Queued::Done((tree_size, size, entry_count)) = self.queue(solver, to_do)? {
            solver.record_tree(oid, tree_size, size, entry_count);
        }
        Ok(())
    }
}

/// A commit waiting for its root tree, then its parents.
pub(crate) struct PendingCommit {
    pub(crate) oid: ObjectId,
    pub(crate) commit: Option<CommitData>,
}

impl PendingCommit {
    pub(crate) fn new(oid: ObjectId) -> Self {
        PendingCommit { oid, commit: None }
    }

    pub(crate) fn preloaded(oid: ObjectId, commit: CommitData) -> Self {
        PendingCommit {
            oid,
            commit: Some(commit),
        }
    }

    fn queue<S: ObjectStore>(
        mut self,
        solver: &mut SizeSolver<S>,
        to_do: &mut WorkList,
    ) -> Result<Queued<(CommitSize, Count32, Count32)>> {
        let commit = match self.commit.take() {
            Some(commit) => commit,
            None => {
                if solver.preloaded {
                    // Preload should have covered this commit.
                    eprintln!("warning: commit not preloaded: {}", self.oid);
                }
                solver.store.read_commit(self.oid)?
            }
        };

        let mut size = CommitSize::default();
        let mut subtasks = WorkList::default();

        // First gather information about the tree. Until the tree is
        // resolved, do not even look at the parents: that would pile up
        // partially-loaded commits along the whole ancestry.
        match solver.tree_sizes.get(&commit.tree) {
            Some(&tree_size) => size.add_tree(tree_size),
            None => {
                subtasks.push(Task::Tree(solver.pending_tree(commit.tree)?));
                self.commit = Some(commit);
                to_do.push(Task::Commit(self));
                to_do.push_all(subtasks);
                return Ok(Queued::NotYetKnown);
            }
        }

        let mut ok = true;
        for &parent in &commit.parents {
            match solver.commit_sizes.get(&parent) {
                Some(&parent_size) => {
                    if ok {
                        size.add_parent(parent_size);
                    }
                }
                None => {
                    ok = false;
                    // Schedule this one to be computed.
                    subtasks.push(Task::Commit(PendingCommit::new(parent)));
                }
            }
        }

        if !ok {
            self.commit = Some(commit);
            to_do.push(Task::Commit(self));
            to_do.push_all(subtasks);
            return Ok(Queued::NotYetKnown);
        }

        // One more generation of depth for this commit itself.
        size.max_ancestor_depth.increment(Count32::from(1));
        let parent_count = Count32::new(commit.parents.len() as u64);
        Ok(Queued::Done((size, commit.size, parent_count)))
    }

    fn run<S: ObjectStore>(self, solver: &mut SizeSolver<S>, to_do: &mut WorkList) -> Result<()> {
        // The size may have been computed since this task was enqueued,
        // if the commit is reachable along several paths.
        if solver.commit_sizes.contains_key(&self.oid) {
            return Ok(());
        }
        let oid = self.oid;
        if let Queued::Done((commit_size, size, parent_count)) = self.queue(solver, to_do)? {
            solver.record_commit(oid, commit_size, size, parent_count);
        }
        Ok(())
    }
}

/// An annotated tag waiting for its referent.
pub(crate) struct PendingTag {
    pub(crate) oid: ObjectId,
    pub(crate) tag: Option<TagData>,
}

impl PendingTag {
    pub(crate) fn new(oid: ObjectId) -> Self {
        PendingTag { oid, tag: None }
    }

    fn queue<S: ObjectStore>(
        mut self,
        solver: &mut SizeSolver<S>,
        to_do: &mut WorkList,
    ) -> Result<Queued<(TagSize, Count32)>> {
        let tag = match self.tag.take() {
            Some(tag) => tag,
            None => solver.store.read_tag(self.oid)?,
        };

        let mut size = TagSize {
            tag_depth: Count32::from(1),
        };
        let mut ok = true;
        let mut subtasks = WorkList::default();

        match tag.referent_kind {
            ObjectKind::Tag => match solver.tag_sizes.get(&tag.referent) {
                Some(referent_size) => size.tag_depth.increment(referent_size.tag_depth),
                None => {
                    ok = false;
                    subtasks.push(Task::Tag(PendingTag::new(tag.referent)));
                }
            },
            ObjectKind::Commit => {
                if !solver.commit_sizes.contains_key(&tag.referent) {
                    ok = false;
                    subtasks.push(Task::Commit(PendingCommit::new(tag.referent)));
                }
            }
            ObjectKind::Tree => {
                if !solver.tree_sizes.contains_key(&tag.referent) {
                    ok = false;
                    subtasks.push(Task::Tree(solver.pending_tree(tag.referent)?));
                }
            }
            ObjectKind::Blob => {
                // Consults the blob cache, else a cheap header read; no
                // deferral needed either way.
                solver.blob_size(tag.referent)?;
            }
        }

        if !ok {
            self.tag = Some(tag);
            to_do.push(Task::Tag(self));
            to_do.push_all(subtasks);
            return Ok(Queued::NotYetKnown);
        }

        Ok(Queued::Done((size, tag.size)))
    }

    fn run<S: ObjectStore>(self, solver: &mut SizeSolver<S>, to_do: &mut WorkList) -> Result<()> {
        // The size may have been computed since this task was enqueued.
        if solver.tag_sizes.contains_key(&self.oid) {
            return Ok(());
        }
        let oid = self.oid;
        if let Queued::Done((tag_size, size)) = self.queue(solver, to_do)? {
            solver.record_tag(oid, tag_size, size);
        }
        Ok(())
    }
}
