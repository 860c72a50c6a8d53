// Object-graph fixtures for integration tests
//
// Repositories are built straight from odb primitives (blobs, trees,
// commits, tags) rather than through a worktree and index: the code
// under test only ever sees the object graph, so the fixtures construct
// exactly that. Repositories are bare for the same reason.
#![allow(dead_code)]

use git2::{Oid, Repository, Signature};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tempfile::TempDir;

/// Create a temporary bare repository
pub fn create_test_repo() -> (TempDir, PathBuf, Repository) {
    let dir = TempDir::new().unwrap();
    let repo_path = dir.path().to_path_buf();
    let repo = Repository::init_bare(&repo_path).unwrap();
    (dir, repo_path, repo)
}

pub fn signature() -> Signature<'static> {
    Signature::now("Test Author", "author@example.com").unwrap()
}

/// Store a blob and return its oid
pub fn blob(repo: &Repository, content: &[u8]) -> Oid {
    repo.blob(content).unwrap()
}

/// Build a tree out of raw (name, mode, oid) entries
pub fn build_tree(repo: &Repository, entries: &[(&str, i32, Oid)]) -> Oid {
    let mut builder = repo.treebuilder(None).unwrap();
    for &(name, mode, oid) in entries {
        builder.insert(name, oid, mode).unwrap();
    }
    builder.write().unwrap()
}

/// Build nested trees for a set of slash-separated file paths
pub fn tree_of_files(repo: &Repository, files: &[(&str, &[u8])]) -> Oid {
    let split: Vec<(Vec<&str>, &[u8])> = files
        .iter()
        .map(|&(path, content)| (path.split('/').collect(), content))
        .collect();
    tree_of(repo, &split)
}

fn tree_of(repo: &Repository, files: &[(Vec<&str>, &[u8])]) -> Oid {
    let mut builder = repo.treebuilder(None).unwrap();
    let mut subdirs: BTreeMap<&str, Vec<(Vec<&str>, &[u8])>> = BTreeMap::new();

    for (parts, content) in files {
        match parts.as_slice() {
            [name] => {
                let oid = repo.blob(content).unwrap();
                builder.insert(*name, oid, 0o100644).unwrap();
            }
            [dir, rest @ ..] => {
                subdirs
                    .entry(*dir)
                    .or_default()
                    .push((rest.to_vec(), *content));
            }
            [] => unreachable!("empty path"),
        }
    }

    for (dir, children) in subdirs {
        let sub = tree_of(repo, &children);
        builder.insert(dir, sub, 0o040000).unwrap();
    }
    builder.write().unwrap()
}

/// Create a commit of an existing tree with explicit parents, without
/// moving any reference
pub fn commit_tree(repo: &Repository, tree: Oid, parents: &[Oid], message: &str) -> Oid {
    let sig = signature();
    let tree = repo.find_tree(tree).unwrap();
    let parents: Vec<git2::Commit> = parents
        .iter()
        .map(|&oid| repo.find_commit(oid).unwrap())
        .collect();
    let parent_refs: Vec<&git2::Commit> = parents.iter().collect();
    repo.commit(None, &sig, &sig, message, &tree, &parent_refs)
        .unwrap()
}

/// Commit a set of files, building the trees as needed
pub fn commit_files(
    repo: &Repository,
    files: &[(&str, &[u8])],
    parents: &[Oid],
    message: &str,
) -> Oid {
    let tree = tree_of_files(repo, files);
    commit_tree(repo, tree, parents, message)
}

/// Point a branch at a commit
pub fn branch(repo: &Repository, name: &str, target: Oid) {
    repo.reference(&format!("refs/heads/{}", name), target, true, "test branch")
        .unwrap();
}

/// Create an annotated tag of any object; also creates refs/tags/NAME
pub fn annotated_tag(repo: &Repository, name: &str, target: Oid) -> Oid {
    let object = repo.find_object(target, None).unwrap();
    repo.tag(name, &object, &signature(), &format!("tag {}", name), false)
        .unwrap()
}
