use crate::path::CatalogPath;
use crate::record::CatalogEntry;
use crate::tree::CatalogTree;

/// Default capacity of the read window: 1 MiB.
pub const DEFAULT_WINDOW_CAPACITY: usize = 1024 * 1024;

/// Default number of hardlinks followed before a chain is given up on.
pub const DEFAULT_MAX_LINK_HOPS: usize = 16;

/// Default depth of archives nested inside archives that are scanned.
pub const DEFAULT_MAX_DEPTH: usize = 8;

/// Settings shared by every scan of one cataloging session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogContext {
    /// Bytes of archive held in memory at once. Rounded up to whole blocks.
    pub window_capacity: usize,

    /// Hardlinks followed on lookup before a chain is given up on.
    pub max_link_hops: usize,

    /// How many archives deep to recurse; the outermost archive is depth 0.
    pub max_depth: usize,

    /// Compute checksums of file contents.
    pub checksums: bool,

    /// Scan archives found inside archives.
    pub recurse: bool,

    /// Count lines of text-like files.
    pub line_counts: bool,
}

impl Default for CatalogContext {
    fn default() -> Self {
        CatalogContext {
            window_capacity: DEFAULT_WINDOW_CAPACITY,
            max_link_hops: DEFAULT_MAX_LINK_HOPS,
            max_depth: DEFAULT_MAX_DEPTH,
            checksums: true,
            recurse: true,
            line_counts: true,
        }
    }
}

impl CatalogContext {
    pub fn new() -> CatalogContext {
        CatalogContext::default()
    }

    pub fn window_capacity(mut self, window_capacity: usize) -> Self {
        self.window_capacity = window_capacity;
        self
    }

    pub fn max_link_hops(mut self, max_link_hops: usize) -> Self {
        self.max_link_hops = max_link_hops;
        self
    }

    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn checksums(mut self, checksums: bool) -> Self {
        self.checksums = checksums;
        self
    }

    pub fn recurse(mut self, recurse: bool) -> Self {
        self.recurse = recurse;
        self
    }

    pub fn line_counts(mut self, line_counts: bool) -> Self {
        self.line_counts = line_counts;
        self
    }

    /// Look up `path` in `tree`, following at most `max_link_hops` hardlinks.
    #[inline(always)]
    pub fn find<'t>(&self, tree: &'t CatalogTree, path: &CatalogPath) -> Option<&'t CatalogEntry> {
        tree.find_with_hops(path, self.max_link_hops)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{FileInfo, FileRecord};

    #[test]
    fn lookups_honour_the_hop_limit() {
        let p = |s: &str| CatalogPath::new(s).unwrap();
        let mut tree = CatalogTree::new();
        tree.insert(
            &p("l0"),
            CatalogEntry::File(FileRecord {
                mtime: 0,
                info: FileInfo::default(),
            }),
        )
        .unwrap();
        tree.link(0, &p("l0"), &p("l1")).unwrap();
        tree.link(0, &p("l1"), &p("l2")).unwrap();

        assert!(CatalogContext::new().find(&tree, &p("l2")).is_some());
        assert!(CatalogContext::new().max_link_hops(1).find(&tree, &p("l2")).is_none());
        assert!(CatalogContext::new().max_link_hops(1).find(&tree, &p("l1")).is_some());
    }
}
