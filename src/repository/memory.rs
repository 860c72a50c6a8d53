//! In-memory object store
//!
//! A deterministic `ObjectStore` used by tests and benchmarks. Objects
//! are added children-first, so insertion order doubles as topological
//! order for the iterators. Every read is counted per oid, which lets
//! tests assert that shared subgraphs are resolved exactly once.

use std::cell::RefCell;

use anyhow::{anyhow, bail, Result};
use gix::bstr::BString;
use gix::ObjectId;
use rustc_hash::FxHashMap;

use crate::model::{Count32, ObjectKind};

use super::store::ObjectStore;
use super::types::{CommitData, ObjectHeader, Reference, TagData, TreeData, TreeEntry};

enum MemObject {
    Blob { size: Count32 },
    Tree(TreeData),
    Commit(CommitData),
    Tag(TagData),
}

impl MemObject {
    fn kind(&self) -> ObjectKind {
        match self {
            MemObject::Blob { .. } => ObjectKind::Blob,
            MemObject::Tree(_) => ObjectKind::Tree,
            MemObject::Commit(_) => ObjectKind::Commit,
            MemObject::Tag(_) => ObjectKind::Tag,
        }
    }

    fn size(&self) -> Count32 {
        match self {
            MemObject::Blob { size } => *size,
            MemObject::Tree(tree) => tree.size,
            MemObject::Commit(commit) => commit.size,
            MemObject::Tag(tag) => tag.size,
        }
    }
}

#[derive(Default)]
struct ReadCounts {
    headers: FxHashMap<ObjectId, u32>,
    trees: FxHashMap<ObjectId, u32>,
    commits: FxHashMap<ObjectId, u32>,
    tags: FxHashMap<ObjectId, u32>,
}

/// An object graph held entirely in memory.
#[derive(Default)]
pub struct MemoryStore {
    objects: FxHashMap<ObjectId, MemObject>,
    object_order: Vec<ObjectId>,
    commit_order: Vec<ObjectId>,
    references: Vec<Reference>,
    next_oid: u32,
    // Interior mutability so read instrumentation works through the
    // &self store contract; the solver is single-threaded by design.
    reads: RefCell<ReadCounts>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn mint_oid(&mut self) -> ObjectId {
        self.next_oid += 1;
        let hex = format!("{:040x}", self.next_oid);
        ObjectId::from_hex(hex.as_bytes()).expect("forty hex digits")
    }

    fn insert(&mut self, object: MemObject) -> ObjectId {
        let oid = self.mint_oid();
        self.objects.insert(oid, object);
        self.object_order.push(oid);
        oid
    }

    pub fn add_blob(&mut self, size: u64) -> ObjectId {
        self.insert(MemObject::Blob {
            size: Count32::new(size),
        })
    }

    /// Add a tree from raw entries, for symlink and gitlink cases the
    /// convenience form cannot express.
    pub fn add_tree_entries(&mut self, entries: Vec<TreeEntry>) -> ObjectId {
        // Approximate the on-disk encoding: octal mode, space, name,
        // NUL, 20 raw oid bytes.
        let size: usize = entries
            .iter()
            .map(|e| format!("{:o}", e.mode).len() + e.name.len() + 22)
            .sum();
        self.insert(MemObject::Tree(TreeData {
            entries,
            size: Count32::new(size as u64),
        }))
    }

    /// Add a tree of plain files and subtrees.
    pub fn add_tree(
        &mut self,
        files: &[(&str, ObjectId)],
        subtrees: &[(&str, ObjectId)],
    ) -> ObjectId {
        let mut entries = Vec::with_capacity(files.len() + subtrees.len());
        for &(name, oid) in files {
            entries.push(TreeEntry {
                name: BString::from(name),
                mode: 0o100644,
                oid,
            });
        }
        for &(name, oid) in subtrees {
            entries.push(TreeEntry {
                name: BString::from(name),
                mode: 0o040000,
                oid,
            });
        }
        self.add_tree_entries(entries)
    }

    pub fn add_commit(&mut self, tree: ObjectId, parents: &[ObjectId]) -> ObjectId {
        let size = 166 + 48 * parents.len();
        let oid = self.insert(MemObject::Commit(CommitData {
            tree,
            parents: parents.to_vec(),
            size: Count32::new(size as u64),
        }));
        self.commit_order.push(oid);
        oid
    }

    pub fn add_tag(&mut self, referent: ObjectId, referent_kind: ObjectKind) -> ObjectId {
        self.insert(MemObject::Tag(TagData {
            referent,
            referent_kind,
            size: Count32::from(150),
        }))
    }

    /// Add a reference to an existing object; target kind and size are
    /// resolved the way a real store resolves them when listing refs.
    pub fn add_reference(&mut self, refname: &str, target: ObjectId) {
        let object = self
            .objects
            .get(&target)
            .expect("reference target must exist");
        self.references.push(Reference {
            refname: refname.to_string(),
            oid: target,
            kind: object.kind(),
            size: object.size(),
        });
    }

    fn get(&self, oid: ObjectId) -> Result<&MemObject> {
        self.objects
            .get(&oid)
            .ok_or_else(|| anyhow!("object {} not found", oid))
    }

    fn header_of(&self, oid: ObjectId) -> Result<ObjectHeader> {
        let object = self.get(oid)?;
        Ok(ObjectHeader {
            oid,
            kind: object.kind(),
            size: object.size(),
        })
    }

    fn count(map: &mut FxHashMap<ObjectId, u32>, oid: ObjectId) {
        *map.entry(oid).or_insert(0) += 1;
    }

    pub fn header_reads(&self, oid: ObjectId) -> u32 {
        self.reads.borrow().headers.get(&oid).copied().unwrap_or(0)
    }

    pub fn tree_reads(&self, oid: ObjectId) -> u32 {
        self.reads.borrow().trees.get(&oid).copied().unwrap_or(0)
    }

    pub fn commit_reads(&self, oid: ObjectId) -> u32 {
        self.reads.borrow().commits.get(&oid).copied().unwrap_or(0)
    }

    pub fn tag_reads(&self, oid: ObjectId) -> u32 {
        self.reads.borrow().tags.get(&oid).copied().unwrap_or(0)
    }
}

impl ObjectStore for MemoryStore {
    fn iter_objects(&self) -> Result<Box<dyn Iterator<Item = Result<ObjectHeader>> + '_>> {
        Ok(Box::new(
            self.object_order.iter().map(move |&oid| self.header_of(oid)),
        ))
    }

    fn iter_commits_reverse_topo(
        &self,
    ) -> Result<Box<dyn Iterator<Item = Result<(ObjectId, CommitData)>> + '_>> {
        Ok(Box::new(self.commit_order.iter().map(move |&oid| {
            match self.get(oid)? {
                MemObject::Commit(commit) => Ok((oid, commit.clone())),
                other => bail!("object {} is a {}, not a commit", oid, other.kind()),
            }
        })))
    }

    fn iter_references(&self) -> Result<Box<dyn Iterator<Item = Result<Reference>> + '_>> {
        Ok(Box::new(self.references.iter().map(|r| Ok(r.clone()))))
    }

    fn read_header(&self, spec: &str) -> Result<ObjectHeader> {
        let oid = ObjectId::from_hex(spec.as_bytes())
            .map_err(|_| anyhow!("unresolvable object spec: {}", spec))?;
        Self::count(&mut self.reads.borrow_mut().headers, oid);
        self.header_of(oid)
    }

    fn read_tree(&self, oid: ObjectId) -> Result<TreeData> {
        Self::count(&mut self.reads.borrow_mut().trees, oid);
        match self.get(oid)? {
            MemObject::Tree(tree) => Ok(tree.clone()),
            other => bail!("object {} is a {}, not a tree", oid, other.kind()),
        }
    }

    fn read_commit(&self, oid: ObjectId) -> Result<CommitData> {
        Self::count(&mut self.reads.borrow_mut().commits, oid);
        match self.get(oid)? {
            MemObject::Commit(commit) => Ok(commit.clone()),
            other => bail!("object {} is a {}, not a commit", oid, other.kind()),
        }
    }

    fn read_tag(&self, oid: ObjectId) -> Result<TagData> {
        Self::count(&mut self.reads.borrow_mut().tags, oid);
        match self.get(oid)? {
            MemObject::Tag(tag) => Ok(*tag),
            other => bail!("object {} is a {}, not a tag", oid, other.kind()),
        }
    }
}
