//! Per-object size aggregates
//!
//! Each aggregate exposes combinators that fold an already-resolved child
//! size into the parent. The solver only ever calls a combinator once the
//! child is in its cache, so the aggregates themselves never defer.

use super::count::Count32;

/// The size of a blob: its own byte length.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct BlobSize {
    pub size: Count32,
}

/// Aggregate facts about a directory subtree, measured over its whole
/// transitive closure.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct TreeSize {
    /// Longest path, in components, from this tree to any descendant
    /// leaf, counting this tree itself. A leaf tree has depth 1.
    pub max_path_depth: Count32,
    /// Trees in the closure, this one included.
    pub expanded_tree_count: Count32,
    /// Blobs in the closure.
    pub expanded_blob_count: Count32,
    /// Summed byte length of blobs in the closure.
    pub expanded_blob_size: Count32,
    /// Symlink entries in the closure.
    pub expanded_link_count: Count32,
    /// Entries pointing at commits (gitlinks) in the closure.
    pub expanded_submodule_count: Count32,
}

impl TreeSize {
    /// Fold in a resolved child tree.
    pub fn add_descendent(&mut self, child: TreeSize) {
        let mut depth = child.max_path_depth;
        depth.increment(Count32::from(1));
        self.max_path_depth.adjust_max(depth);
        self.expanded_tree_count.increment(child.expanded_tree_count);
        self.expanded_blob_count.increment(child.expanded_blob_count);
        self.expanded_blob_size.increment(child.expanded_blob_size);
        self.expanded_link_count.increment(child.expanded_link_count);
        self.expanded_submodule_count
            .increment(child.expanded_submodule_count);
    }

    /// Fold in a direct blob entry.
    pub fn add_blob(&mut self, blob: BlobSize) {
        self.expanded_blob_count.increment(Count32::from(1));
        self.expanded_blob_size.increment(blob.size);
        // The tree plus the blob make a path of two components.
        self.max_path_depth.adjust_max(Count32::from(2));
    }

    /// Fold in a direct symlink entry.
    pub fn add_link(&mut self) {
        self.expanded_link_count.increment(Count32::from(1));
        self.max_path_depth.adjust_max(Count32::from(2));
    }

    /// Fold in a direct submodule (commit pointer) entry. The referenced
    /// commit is not recursed into.
    pub fn add_submodule(&mut self) {
        self.expanded_submodule_count.increment(Count32::from(1));
        self.max_path_depth.adjust_max(Count32::from(2));
    }
}

/// Aggregate facts about a commit's ancestry.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct CommitSize {
    /// Longest parent chain ending at this commit, counting this commit
    /// itself. A root commit has depth 1.
    pub max_ancestor_depth: Count32,
}

impl CommitSize {
    /// Hook for per-commit tree statistics. No field currently depends
    /// on the root tree, but keeping the call site lets such statistics
    /// be added without reshaping the task protocol.
    pub fn add_tree(&mut self, _tree: TreeSize) {}

    /// Fold in a resolved parent commit.
    pub fn add_parent(&mut self, parent: CommitSize) {
        let mut depth = parent.max_ancestor_depth;
        depth.increment(Count32::from(1));
        self.max_ancestor_depth.adjust_max(depth);
    }
}

/// Aggregate facts about an annotated tag.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct TagSize {
    /// Consecutive annotated-tag indirections ending at this tag. A tag
    /// pointing at a non-tag has depth 1.
    pub tag_depth: Count32,
}

/// The resolved size of an object of any kind.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ObjectSize {
    Blob(BlobSize),
    Tree(TreeSize),
    Commit(CommitSize),
    Tag(TagSize),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree(depth: u32, trees: u32, blobs: u32, blob_size: u32) -> TreeSize {
        TreeSize {
            max_path_depth: Count32::from(depth),
            expanded_tree_count: Count32::from(trees),
            expanded_blob_count: Count32::from(blobs),
            expanded_blob_size: Count32::from(blob_size),
            ..Default::default()
        }
    }

    #[test]
    fn test_add_descendent_sums_and_deepens() {
        let mut parent = tree(0, 1, 0, 0);
        parent.add_descendent(tree(3, 2, 5, 100));
        assert_eq!(parent.max_path_depth.value(), 4);
        assert_eq!(parent.expanded_tree_count.value(), 3);
        assert_eq!(parent.expanded_blob_count.value(), 5);
        assert_eq!(parent.expanded_blob_size.value(), 100);

        // A shallower sibling must not lower the depth.
        parent.add_descendent(tree(1, 1, 1, 10));
        assert_eq!(parent.max_path_depth.value(), 4);
        assert_eq!(parent.expanded_tree_count.value(), 4);
        assert_eq!(parent.expanded_blob_count.value(), 6);
        assert_eq!(parent.expanded_blob_size.value(), 110);
    }

    #[test]
    fn test_add_blob_forces_depth_two() {
        let mut t = tree(0, 1, 0, 0);
        t.add_blob(BlobSize {
            size: Count32::from(42),
        });
        assert_eq!(t.max_path_depth.value(), 2);
        assert_eq!(t.expanded_blob_count.value(), 1);
        assert_eq!(t.expanded_blob_size.value(), 42);
    }

    #[test]
    fn test_add_link_and_submodule() {
        let mut t = tree(0, 1, 0, 0);
        t.add_link();
        t.add_submodule();
        t.add_submodule();
        assert_eq!(t.expanded_link_count.value(), 1);
        assert_eq!(t.expanded_submodule_count.value(), 2);
        assert_eq!(t.max_path_depth.value(), 2);
        assert_eq!(t.expanded_blob_count.value(), 0);
    }

    #[test]
    fn test_blob_size_sum_saturates() {
        let mut t = TreeSize::default();
        t.add_blob(BlobSize {
            size: Count32::from(u32::MAX - 10),
        });
        t.add_blob(BlobSize {
            size: Count32::from(1000),
        });
        assert_eq!(t.expanded_blob_size, Count32::MAX);
        assert_eq!(t.expanded_blob_count.value(), 2);
    }

    #[test]
    fn test_add_parent_takes_longest_chain() {
        let mut c = CommitSize::default();
        c.add_parent(CommitSize {
            max_ancestor_depth: Count32::from(4),
        });
        c.add_parent(CommitSize {
            max_ancestor_depth: Count32::from(2),
        });
        assert_eq!(c.max_ancestor_depth.value(), 5);
    }

    #[test]
    fn test_root_commit_depth() {
        // No parents folded in: depth stays 0 until the task accounts
        // for the commit itself.
        let c = CommitSize::default();
        assert_eq!(c.max_ancestor_depth.value(), 0);
    }
}
