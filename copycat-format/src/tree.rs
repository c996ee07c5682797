//! The catalog namespace.

use std::collections::btree_map::{self, BTreeMap};

use crate::context::DEFAULT_MAX_LINK_HOPS;
use crate::path::{CatalogPath, IntoCatalogPathError};
use crate::record::{
    CatalogEntry, DirectoryRecord, EntryKind, HardlinkRecord, ReplacedRecord,
};

#[derive(Debug, thiserror::Error)]
pub enum InsertError {
    #[error("invalid path")]
    Path(#[from] IntoCatalogPathError),

    #[error("'{path}' is a {kind}, not a directory")]
    Conflict { path: CatalogPath, kind: EntryKind },

    #[error("link target '{0}' not found")]
    LinkTargetNotFound(CatalogPath),
}

/// The entries bound to one name: the active one and every entry it
/// superseded, oldest first.
#[derive(Debug, Clone)]
pub struct Slot {
    active: CatalogEntry,
    replaced: Vec<CatalogEntry>,
}

impl Slot {
    fn new(entry: CatalogEntry) -> Slot {
        Slot {
            active: entry,
            replaced: vec![],
        }
    }

    #[inline(always)]
    pub fn active(&self) -> &CatalogEntry {
        &self.active
    }

    /// Superseded entries, each a [`CatalogEntry::Replaced`].
    #[inline(always)]
    pub fn replaced(&self) -> &[CatalogEntry] {
        &self.replaced
    }

    fn replace(&mut self, entry: CatalogEntry) {
        let old = std::mem::replace(&mut self.active, entry);
        self.replaced
            .push(CatalogEntry::Replaced(ReplacedRecord::new(old)));
    }
}

/// An ordered map of names to entries. Directories, containers and archives
/// each own one, so a whole catalog is a tree of these.
#[derive(Debug, Clone, Default)]
pub struct CatalogTree {
    entries: BTreeMap<Vec<u8>, Slot>,
}

impl CatalogTree {
    pub fn new() -> CatalogTree {
        CatalogTree::default()
    }

    /// Number of names bound at this level.
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &[u8]> {
        self.entries.keys().map(|k| k.as_slice())
    }

    pub fn slot(&self, name: &[u8]) -> Option<&Slot> {
        self.entries.get(name)
    }

    /// Bind `entry` at `path`, creating missing parent directories.
    ///
    /// A directory inserted over a directory with no children of its own
    /// only updates the mtime. Any other existing entry is kept as a
    /// replaced entry behind the new one.
    pub fn insert(&mut self, path: &CatalogPath, entry: CatalogEntry) -> Result<(), InsertError> {
        let tree = self.parent_tree_mut(path)?;

        match tree.entries.entry(path.filename().to_vec()) {
            btree_map::Entry::Vacant(vacant) => {
                vacant.insert(Slot::new(entry));
            }
            btree_map::Entry::Occupied(mut occupied) => {
                let slot = occupied.get_mut();
                if let (CatalogEntry::Directory(old), CatalogEntry::Directory(new)) =
                    (&mut slot.active, &entry)
                {
                    if new.tree.is_empty() {
                        old.mtime = new.mtime;
                        return Ok(());
                    }
                }

                tracing::debug!(path = %path, kind = %slot.active.kind(), "replacing entry");
                slot.replace(entry);
            }
        }

        Ok(())
    }

    /// Bind a hardlink at `alias` to the entry at `target`.
    pub fn link(
        &mut self,
        mtime: i64,
        target: &CatalogPath,
        alias: &CatalogPath,
    ) -> Result<(), InsertError> {
        self.link_with_hops(mtime, target, alias, DEFAULT_MAX_LINK_HOPS)
    }

    /// As [`link`](CatalogTree::link), with `target` resolved through at most
    /// `max_hops` hardlinks.
    pub fn link_with_hops(
        &mut self,
        mtime: i64,
        target: &CatalogPath,
        alias: &CatalogPath,
        max_hops: usize,
    ) -> Result<(), InsertError> {
        if self.find_with_hops(target, max_hops).is_none() {
            return Err(InsertError::LinkTargetNotFound(target.clone()));
        }

        self.insert(
            alias,
            CatalogEntry::Hardlink(HardlinkRecord {
                mtime,
                target: target.clone(),
            }),
        )
    }

    /// Look up `path` without following hardlinks.
    pub fn get(&self, path: &CatalogPath) -> Option<&CatalogEntry> {
        self.get_segments(&path.0)
    }

    /// Look up `path`, following hardlinks.
    pub fn find(&self, path: &CatalogPath) -> Option<&CatalogEntry> {
        self.find_with_hops(path, DEFAULT_MAX_LINK_HOPS)
    }

    /// Look up `path`, following at most `max_hops` hardlinks. Longer chains
    /// and cycles resolve to nothing.
    pub fn find_with_hops(&self, path: &CatalogPath, max_hops: usize) -> Option<&CatalogEntry> {
        let resolved = self.resolve(&path.0, &mut 0, max_hops)?;
        self.get_segments(&resolved)
    }

    pub fn find_mut(&mut self, path: &CatalogPath) -> Option<&mut CatalogEntry> {
        self.find_mut_with_hops(path, DEFAULT_MAX_LINK_HOPS)
    }

    pub fn find_mut_with_hops(
        &mut self,
        path: &CatalogPath,
        max_hops: usize,
    ) -> Option<&mut CatalogEntry> {
        let resolved = self.resolve(&path.0, &mut 0, max_hops)?;
        self.get_segments_mut(&resolved)
    }

    /// Every entry, depth first in name order. Superseded entries follow the
    /// active entry of the same name.
    pub fn entries(&self) -> Entries<'_> {
        Entries::new(self, None)
    }

    fn parent_tree_mut(&mut self, path: &CatalogPath) -> Result<&mut CatalogTree, InsertError> {
        let mut tree = self;
        let parents = &path.0[..path.0.len() - 1];

        for (i, segment) in parents.iter().enumerate() {
            let slot = tree
                .entries
                .entry(segment.clone())
                .or_insert_with(|| Slot::new(CatalogEntry::Directory(DirectoryRecord::default())));

            let kind = slot.active.kind();
            tree = slot.active.tree_mut().ok_or_else(|| InsertError::Conflict {
                path: CatalogPath(path.0[..=i].to_vec()),
                kind,
            })?;
        }

        Ok(tree)
    }

    fn get_segments(&self, segments: &[Vec<u8>]) -> Option<&CatalogEntry> {
        let (last, parents) = segments.split_last()?;
        let mut tree = self;
        for segment in parents {
            tree = tree.entries.get(segment)?.active.tree()?;
        }
        tree.entries.get(last).map(|slot| &slot.active)
    }

    fn get_segments_mut(&mut self, segments: &[Vec<u8>]) -> Option<&mut CatalogEntry> {
        let (last, parents) = segments.split_last()?;
        let mut tree = self;
        for segment in parents {
            tree = tree.entries.get_mut(segment)?.active.tree_mut()?;
        }
        tree.entries.get_mut(last).map(|slot| &mut slot.active)
    }

    /// The innermost container or archive along `segments`, with the number of
    /// segments leading to it. The tree itself is the outermost root.
    fn link_root(&self, segments: &[Vec<u8>]) -> (&CatalogTree, usize) {
        let mut root = (self, 0);
        let mut tree = self;
        for (i, segment) in segments.iter().enumerate() {
            let entry = match tree.entries.get(segment) {
                Some(slot) => &slot.active,
                None => break,
            };
            tree = match entry.tree() {
                Some(t) => t,
                None => break,
            };
            if entry.is_link_root() {
                root = (tree, i + 1);
            }
        }
        root
    }

    /// Rewrite `segments` into the path of the entry it names once every
    /// hardlink on the way is followed.
    fn resolve(&self, segments: &[Vec<u8>], hops: &mut usize, max_hops: usize) -> Option<Vec<Vec<u8>>> {
        let mut out: Vec<Vec<u8>> = Vec::with_capacity(segments.len());

        for segment in segments {
            let (root, root_len) = self.link_root(&out);
            let parent = if out.is_empty() {
                self
            } else {
                self.get_segments(&out)?.tree()?
            };

            let mut entry = &parent.entries.get(segment)?.active;
            out.push(segment.clone());

            while let CatalogEntry::Hardlink(link) = entry {
                *hops += 1;
                if *hops > max_hops {
                    tracing::debug!(target = %link.target, "hardlink chain too long");
                    return None;
                }

                let target = root.resolve(&link.target.0, hops, max_hops)?;
                entry = root.get_segments(&target)?;
                out.truncate(root_len);
                out.extend(target);
            }
        }

        Some(out)
    }
}

/// An item yielded by [`CatalogTree::entries`].
#[non_exhaustive]
#[derive(Debug)]
pub struct EntriesItem<'a> {
    pub path: CatalogPath,
    pub entry: &'a CatalogEntry,

    /// Whether the entry was replaced by a later one of the same name.
    pub superseded: bool,
}

pub struct Entries<'a> {
    iter: btree_map::Iter<'a, Vec<u8>, Slot>,
    base_path: Option<CatalogPath>,
    replaced: Option<(CatalogPath, std::slice::Iter<'a, CatalogEntry>)>,
    cur_dir: Option<Box<Entries<'a>>>,
}

impl<'a> Entries<'a> {
    fn new(tree: &'a CatalogTree, base_path: Option<CatalogPath>) -> Entries<'a> {
        Entries {
            iter: tree.entries.iter(),
            base_path,
            replaced: None,
            cur_dir: None,
        }
    }
}

impl<'a> Iterator for Entries<'a> {
    type Item = EntriesItem<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some((path, replaced)) = self.replaced.as_mut() {
            if let Some(entry) = replaced.next() {
                return Some(EntriesItem {
                    path: path.clone(),
                    entry,
                    superseded: true,
                });
            }
            self.replaced = None;
        }

        if let Some(dir) = self.cur_dir.as_mut() {
            if let Some(item) = dir.next() {
                return Some(item);
            }
            self.cur_dir = None;
        }

        let (name, slot) = self.iter.next()?;
        let path = match self.base_path.as_ref() {
            Some(base) => base.child(name),
            None => CatalogPath::from_segment(name),
        };

        if !slot.replaced.is_empty() {
            self.replaced = Some((path.clone(), slot.replaced.iter()));
        }

        if let Some(tree) = slot.active.tree() {
            self.cur_dir = Some(Box::new(Entries::new(tree, Some(path.clone()))));
        }

        Some(EntriesItem {
            path,
            entry: &slot.active,
            superseded: false,
        })
    }
}
