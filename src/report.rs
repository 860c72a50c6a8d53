//! Plain-text rendering of the rollup
//!
//! Presentation stays out of the solver; callers that want different
//! output can format `HistorySize` themselves.

use std::fmt::Write as _;

use crate::model::{Count32, HistorySize};
use crate::util::format_size;

fn row(out: &mut String, label: &str, value: impl std::fmt::Display) {
    let _ = writeln!(out, "  {:<26} {}", label, value);
}

fn size_row(out: &mut String, label: &str, value: Count32) {
    row(out, label, format_size(value));
}

/// Render the rollup as an aligned table.
pub fn render(history: &HistorySize) -> String {
    let mut out = String::new();

    out.push_str("References\n");
    row(&mut out, "total", history.reference_count);
    row(&mut out, "to commits", history.commit_references);
    row(&mut out, "to tags", history.tag_references);
    row(&mut out, "to trees", history.tree_references);
    row(&mut out, "to blobs", history.blob_references);

    out.push_str("\nCommits\n");
    row(&mut out, "unique", history.unique_commit_count);
    size_row(&mut out, "largest object", history.max_commit_size);
    row(&mut out, "most parents", history.max_parent_count);
    row(&mut out, "longest ancestry", history.max_ancestor_depth);

    out.push_str("\nTrees\n");
    row(&mut out, "unique", history.unique_tree_count);
    size_row(&mut out, "largest object", history.max_tree_size);
    row(&mut out, "most entries", history.max_tree_entry_count);
    row(&mut out, "deepest paths", history.max_path_depth);
    row(&mut out, "largest subtree, trees", history.max_expanded_tree_count);
    row(&mut out, "largest subtree, blobs", history.max_expanded_blob_count);
    size_row(
        &mut out,
        "largest subtree, bytes",
        history.max_expanded_blob_size,
    );
    row(&mut out, "largest subtree, links", history.max_expanded_link_count);
    row(
        &mut out,
        "largest subtree, modules",
        history.max_expanded_submodule_count,
    );

    out.push_str("\nBlobs\n");
    row(&mut out, "unique", history.unique_blob_count);
    size_row(&mut out, "largest", history.max_blob_size);

    out.push_str("\nTags\n");
    row(&mut out, "unique", history.unique_tag_count);
    size_row(&mut out, "largest object", history.max_tag_size);
    row(&mut out, "longest chain", history.max_tag_depth);

    if history.tree_references.value() > 0 {
        out.push_str("\nTrees referenced directly\n");
        row(&mut out, "trees", history.reference_tree_count);
        row(&mut out, "blobs", history.reference_blob_count);
        size_row(&mut out, "blob bytes", history.reference_blob_size);
        row(&mut out, "links", history.reference_link_count);
        row(&mut out, "modules", history.reference_submodule_count);
    }

    out
}
