//! Gix-backed object store
//!
//! Adapts an on-disk git repository to the `ObjectStore` contract. Only
//! objects reachable from references are surfaced: commits come from a
//! rev-walk over all reference tips, trees and blobs from a seen-set
//! traversal of each commit's root tree, and annotated tags from
//! following reference targets.

use anyhow::{anyhow, Context, Result};
use gix::prelude::FindExt;
use gix::ObjectId;
use indicatif::{ProgressBar, ProgressStyle};
use rustc_hash::FxHashSet;
use std::path::{Path, PathBuf};

use crate::model::{Count32, ObjectKind};

use super::store::ObjectStore;
use super::types::{CommitData, ObjectHeader, Reference, TagData, TreeData, TreeEntry};

/// Read-only view of a git repository.
pub struct GixStore {
    repo: gix::Repository,
    verbose: bool,
}

impl GixStore {
    pub fn open(path: &Path) -> Result<Self> {
        let repo = gix::open(path).context("Failed to open git repository")?;
        Ok(GixStore {
            repo,
            verbose: false,
        })
    }

    /// Open with phase logging and progress bars on stderr.
    pub fn open_verbose(path: &Path) -> Result<Self> {
        let mut store = Self::open(path)?;
        store.verbose = true;
        Ok(store)
    }

    pub fn path(&self) -> PathBuf {
        self.repo.path().to_path_buf()
    }

    fn log(&self, msg: &str) {
        if self.verbose {
            eprintln!("{}", msg);
        }
    }

    fn progress(&self, label: &str, total: u64) -> ProgressBar {
        if !self.verbose {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(total);
        pb.set_style(
            ProgressStyle::default_bar()
                .template(&format!(
                    "{{spinner:.green}} {}: [{{bar:50.cyan/blue}}] {{pos}}/{{len}} ({{per_sec}})",
                    label
                ))
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        pb
    }

    fn header(&self, oid: ObjectId) -> Result<ObjectHeader> {
        let header = self
            .repo
            .find_header(oid)
            .with_context(|| format!("failed to read header of {}", oid))?;
        Ok(ObjectHeader {
            oid,
            kind: object_kind(header.kind()),
            size: Count32::new(header.size()),
        })
    }

    /// All commits reachable from any reference, newest first.
    fn collect_commits(&self) -> Result<Vec<ObjectId>> {
        let mut tips: Vec<ObjectId> = Vec::new();
        for reference in self
            .repo
            .references()
            .context("failed to list references")?
            .all()
            .context("failed to iterate references")?
        {
            let reference =
                reference.map_err(|e| anyhow!("failed to iterate references: {}", e))?;
            let id = match reference.into_fully_peeled_id() {
                Ok(id) => id.detach(),
                // Unborn or broken refs contribute nothing.
                Err(_) => continue,
            };
            if let Ok(header) = self.repo.find_header(id) {
                if header.kind() == gix::object::Kind::Commit {
                    tips.push(id);
                }
            }
        }

        let mut commits = Vec::new();
        if tips.is_empty() {
            return Ok(commits);
        }
        let walk = self.repo.rev_walk(tips);
        for info in walk.all().context("failed to start commit walk")? {
            let info = info.map_err(|e| anyhow!("failed to walk commits: {}", e))?;
            commits.push(info.id);
        }
        Ok(commits)
    }

    /// Record headers for every unique tree and blob under `root`.
    fn walk_tree(
        &self,
        odb: &gix::OdbHandle,
        root: ObjectId,
        seen_trees: &mut FxHashSet<ObjectId>,
        seen_blobs: &mut FxHashSet<ObjectId>,
        out: &mut Vec<ObjectHeader>,
    ) -> Result<()> {
        let mut stack = vec![root];
        let mut buf = Vec::new();
        while let Some(oid) = stack.pop() {
            if !seen_trees.insert(oid) {
                continue;
            }
            out.push(self.header(oid)?);

            let tree = odb
                .find_tree(&oid, &mut buf)
                .with_context(|| format!("failed to read tree {}", oid))?;
            for entry in tree.entries.iter() {
                let entry_oid = entry.oid.to_owned();
                if entry.mode.is_tree() {
                    stack.push(entry_oid);
                } else if entry.mode.is_blob() && seen_blobs.insert(entry_oid) {
                    out.push(self.header(entry_oid)?);
                }
                // Symlinks are blobs too, but their targets are tiny;
                // gitlinks point outside this repository. Neither needs
                // priming.
            }
        }
        Ok(())
    }

    /// Record headers for the annotated-tag chain starting at `oid`.
    fn walk_tags(
        &self,
        odb: &gix::OdbHandle,
        mut oid: ObjectId,
        seen_tags: &mut FxHashSet<ObjectId>,
        out: &mut Vec<ObjectHeader>,
    ) -> Result<()> {
        let mut buf = Vec::new();
        loop {
            if !seen_tags.insert(oid) {
                return Ok(());
            }
            out.push(self.header(oid)?);
            let tag = odb
                .find_tag(&oid, &mut buf)
                .with_context(|| format!("failed to read tag {}", oid))?;
            if tag.target_kind != gix::object::Kind::Tag {
                return Ok(());
            }
            oid = tag.target();
        }
    }
}

impl ObjectStore for GixStore {
    fn iter_objects(&self) -> Result<Box<dyn Iterator<Item = Result<ObjectHeader>> + '_>> {
        self.log("Collecting commits...");
        let commits = self.collect_commits()?;
        self.log(&format!("Found {} commits", commits.len()));

        let odb = self.repo.objects.clone();
        let mut headers: Vec<ObjectHeader> = Vec::new();
        let mut seen_trees = FxHashSet::default();
        let mut seen_blobs = FxHashSet::default();

        let pb = self.progress("Indexing objects", commits.len() as u64);
        let mut buf = Vec::new();
        for &oid in &commits {
            pb.inc(1);
            headers.push(self.header(oid)?);
            let commit = odb
                .find_commit(&oid, &mut buf)
                .with_context(|| format!("failed to read commit {}", oid))?;
            let tree_id = commit.tree();
            self.walk_tree(&odb, tree_id, &mut seen_trees, &mut seen_blobs, &mut headers)?;
        }
        pb.finish_and_clear();

        // Annotated tags hang off references, not the commit walk.
        let mut seen_tags = FxHashSet::default();
        for reference in self.iter_references()? {
            let reference = reference?;
            if reference.kind == ObjectKind::Tag {
                self.walk_tags(&odb, reference.oid, &mut seen_tags, &mut headers)?;
            }
        }

        // Oldest first, children generally before parents.
        headers.reverse();
        Ok(Box::new(headers.into_iter().map(Ok)))
    }

    fn iter_commits_reverse_topo(
        &self,
    ) -> Result<Box<dyn Iterator<Item = Result<(ObjectId, CommitData)>> + '_>> {
        let mut ids = self.collect_commits()?;
        // Oldest first, so ancestors are normally processed before their
        // descendants.
        ids.reverse();

        let odb = self.repo.objects.clone();
        Ok(Box::new(ids.into_iter().map(move |oid| {
            let mut buf = Vec::new();
            let commit = odb
                .find_commit(&oid, &mut buf)
                .with_context(|| format!("failed to read commit {}", oid))?;
            let tree = commit.tree();
            let parents = commit.parents().collect();
            drop(commit);
            let data = CommitData {
                tree,
                parents,
                size: Count32::new(buf.len() as u64),
            };
            Ok((oid, data))
        })))
    }

    fn iter_references(&self) -> Result<Box<dyn Iterator<Item = Result<Reference>> + '_>> {
        let mut references = Vec::new();
        for reference in self
            .repo
            .references()
            .context("failed to list references")?
            .all()
            .context("failed to iterate references")?
        {
            let reference =
                reference.map_err(|e| anyhow!("failed to iterate references: {}", e))?;
            let refname = reference.name().as_bstr().to_string();
            // Direct targets only; symbolic refs alias other refs that
            // are listed in their own right.
            let oid = match reference.target().try_id() {
                Some(id) => id.to_owned(),
                None => continue,
            };
            let header = self.header(oid)?;
            references.push(Reference {
                refname,
                oid,
                kind: header.kind,
                size: header.size,
            });
        }
        Ok(Box::new(references.into_iter().map(Ok)))
    }

    fn read_header(&self, spec: &str) -> Result<ObjectHeader> {
        let id = self
            .repo
            .rev_parse_single(spec)
            .map_err(|e| anyhow!("unresolvable object spec {:?}: {}", spec, e))?
            .detach();
        self.header(id)
    }

    fn read_tree(&self, oid: ObjectId) -> Result<TreeData> {
        let mut buf = Vec::new();
        let tree = self
            .repo
            .objects
            .find_tree(&oid, &mut buf)
            .with_context(|| format!("failed to read tree {}", oid))?;
        let entries: Vec<TreeEntry> = tree
            .entries
            .iter()
            .map(|entry| TreeEntry {
                name: entry.filename.to_owned(),
                mode: canonical_mode(entry.mode),
                oid: entry.oid.to_owned(),
            })
            .collect();
        Ok(TreeData {
            entries,
            size: Count32::new(buf.len() as u64),
        })
    }

    fn read_commit(&self, oid: ObjectId) -> Result<CommitData> {
        let mut buf = Vec::new();
        let commit = self
            .repo
            .objects
            .find_commit(&oid, &mut buf)
            .with_context(|| format!("failed to read commit {}", oid))?;
        let tree = commit.tree();
        let parents = commit.parents().collect();
        drop(commit);
        Ok(CommitData {
            tree,
            parents,
            size: Count32::new(buf.len() as u64),
        })
    }

    fn read_tag(&self, oid: ObjectId) -> Result<TagData> {
        let mut buf = Vec::new();
        let tag = self
            .repo
            .objects
            .find_tag(&oid, &mut buf)
            .with_context(|| format!("failed to read tag {}", oid))?;
        Ok(TagData {
            referent: tag.target(),
            referent_kind: object_kind(tag.target_kind),
            size: Count32::new(buf.len() as u64),
        })
    }
}

fn object_kind(kind: gix::object::Kind) -> ObjectKind {
    match kind {
        gix::object::Kind::Blob => ObjectKind::Blob,
        gix::object::Kind::Tree => ObjectKind::Tree,
        gix::object::Kind::Commit => ObjectKind::Commit,
        gix::object::Kind::Tag => ObjectKind::Tag,
    }
}

/// Collapse gix entry modes onto the canonical git mode values the
/// solver classifies by. Executable bits are irrelevant to sizing.
fn canonical_mode(mode: gix::objs::tree::EntryMode) -> u32 {
    if mode.is_tree() {
        0o040000
    } else if mode.is_commit() {
        0o160000
    } else if mode.is_link() {
        0o120000
    } else {
        0o100644
    }
}
