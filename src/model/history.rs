//! Whole-repository rollup
//!
//! `HistorySize` accumulates counts and maxima as objects resolve. The
//! solver calls each `record_*` at most once per unique object, so the
//! unique counts stay honest even when the same object is reachable from
//! many places.

use super::count::Count32;
use super::kind::ObjectKind;
use super::size::{BlobSize, CommitSize, TagSize, TreeSize};

/// Histogram-style rollup over everything one scan touched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistorySize {
    // Unique objects of each kind.
    pub unique_blob_count: Count32,
    pub unique_tree_count: Count32,
    pub unique_commit_count: Count32,
    pub unique_tag_count: Count32,

    // Largest object of each kind, in bytes.
    pub max_blob_size: Count32,
    pub max_tree_size: Count32,
    pub max_commit_size: Count32,
    pub max_tag_size: Count32,

    // Maxima of the per-tree aggregates.
    pub max_path_depth: Count32,
    pub max_tree_entry_count: Count32,
    pub max_expanded_tree_count: Count32,
    pub max_expanded_blob_count: Count32,
    pub max_expanded_blob_size: Count32,
    pub max_expanded_link_count: Count32,
    pub max_expanded_submodule_count: Count32,

    // Maxima of the per-commit and per-tag aggregates.
    pub max_ancestor_depth: Count32,
    pub max_parent_count: Count32,
    pub max_tag_depth: Count32,

    // Expanded sums over trees that are themselves reference targets,
    // not over every tree visited.
    pub reference_tree_count: Count32,
    pub reference_blob_count: Count32,
    pub reference_blob_size: Count32,
    pub reference_link_count: Count32,
    pub reference_submodule_count: Count32,

    // References, total and bucketed by target kind.
    pub reference_count: Count32,
    pub blob_references: Count32,
    pub tree_references: Count32,
    pub commit_references: Count32,
    pub tag_references: Count32,
}

impl HistorySize {
    pub fn record_blob(&mut self, blob: BlobSize) {
        self.unique_blob_count.increment(Count32::from(1));
        self.max_blob_size.adjust_max(blob.size);
    }

    pub fn record_tree(&mut self, tree: TreeSize, size: Count32, entry_count: Count32) {
        self.unique_tree_count.increment(Count32::from(1));
        self.max_tree_size.adjust_max(size);
        self.max_tree_entry_count.adjust_max(entry_count);
        self.max_path_depth.adjust_max(tree.max_path_depth);
        self.max_expanded_tree_count
            .adjust_max(tree.expanded_tree_count);
        self.max_expanded_blob_count
            .adjust_max(tree.expanded_blob_count);
        self.max_expanded_blob_size
            .adjust_max(tree.expanded_blob_size);
        self.max_expanded_link_count
            .adjust_max(tree.expanded_link_count);
        self.max_expanded_submodule_count
            .adjust_max(tree.expanded_submodule_count);
    }

    pub fn record_commit(&mut self, commit: CommitSize, size: Count32, parent_count: Count32) {
        self.unique_commit_count.increment(Count32::from(1));
        self.max_commit_size.adjust_max(size);
        self.max_parent_count.adjust_max(parent_count);
        self.max_ancestor_depth.adjust_max(commit.max_ancestor_depth);
    }

    pub fn record_tag(&mut self, tag: TagSize, size: Count32) {
        self.unique_tag_count.increment(Count32::from(1));
        self.max_tag_size.adjust_max(size);
        self.max_tag_depth.adjust_max(tag.tag_depth);
    }

    pub fn record_reference(&mut self, target_kind: ObjectKind) {
        self.reference_count.increment(Count32::from(1));
        match target_kind {
            ObjectKind::Blob => self.blob_references.increment(Count32::from(1)),
            ObjectKind::Tree => self.tree_references.increment(Count32::from(1)),
            ObjectKind::Commit => self.commit_references.increment(Count32::from(1)),
            ObjectKind::Tag => self.tag_references.increment(Count32::from(1)),
        }
    }

    /// Record the expanded totals of a tree that a reference points at
    /// directly. Trees reached only through commits or tags do not feed
    /// these sums.
    pub fn record_reference_root(&mut self, tree: TreeSize) {
        self.reference_tree_count.increment(tree.expanded_tree_count);
        self.reference_blob_count.increment(tree.expanded_blob_count);
        self.reference_blob_size.increment(tree.expanded_blob_size);
        self.reference_link_count.increment(tree.expanded_link_count);
        self.reference_submodule_count
            .increment(tree.expanded_submodule_count);
    }
}
