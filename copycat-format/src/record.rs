use std::fmt;
use std::path::PathBuf;

use crate::{path::CatalogPath, sparse::ChunkList, tree::CatalogTree};

/// The variant tag of a [`CatalogEntry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    File,
    ArchiveMemberFile,
    ChunkedFile,
    Container,
    Archive,
    Symlink,
    Hardlink,
    Directory,
    CachedFile,
    Replaced,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::File => "file",
            EntryKind::ArchiveMemberFile => "member",
            EntryKind::ChunkedFile => "chunked",
            EntryKind::Container => "container",
            EntryKind::Archive => "archive",
            EntryKind::Symlink => "symlink",
            EntryKind::Hardlink => "hardlink",
            EntryKind::Directory => "directory",
            EntryKind::CachedFile => "cached",
            EntryKind::Replaced => "replaced",
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One node of a catalog.
#[derive(Debug, Clone)]
pub enum CatalogEntry {
    File(FileRecord),
    ArchiveMemberFile(MemberFileRecord),
    ChunkedFile(ChunkedFileRecord),
    Container(ContainerRecord),
    Archive(ArchiveRecord),
    Symlink(SymlinkRecord),
    Hardlink(HardlinkRecord),
    Directory(DirectoryRecord),
    CachedFile(CachedFileRecord),
    Replaced(ReplacedRecord),
}

impl CatalogEntry {
    pub fn kind(&self) -> EntryKind {
        match self {
            CatalogEntry::File(_) => EntryKind::File,
            CatalogEntry::ArchiveMemberFile(_) => EntryKind::ArchiveMemberFile,
            CatalogEntry::ChunkedFile(_) => EntryKind::ChunkedFile,
            CatalogEntry::Container(_) => EntryKind::Container,
            CatalogEntry::Archive(_) => EntryKind::Archive,
            CatalogEntry::Symlink(_) => EntryKind::Symlink,
            CatalogEntry::Hardlink(_) => EntryKind::Hardlink,
            CatalogEntry::Directory(_) => EntryKind::Directory,
            CatalogEntry::CachedFile(_) => EntryKind::CachedFile,
            CatalogEntry::Replaced(_) => EntryKind::Replaced,
        }
    }

    /// Modification time in seconds since the Unix epoch.
    pub fn mtime(&self) -> i64 {
        match self {
            CatalogEntry::File(file) => file.mtime,
            CatalogEntry::ArchiveMemberFile(file) => file.mtime,
            CatalogEntry::ChunkedFile(file) => file.mtime,
            CatalogEntry::Container(container) => container.mtime,
            CatalogEntry::Archive(archive) => archive.mtime,
            CatalogEntry::Symlink(link) => link.mtime,
            CatalogEntry::Hardlink(link) => link.mtime,
            CatalogEntry::Directory(dir) => dir.mtime,
            CatalogEntry::CachedFile(file) => file.mtime,
            CatalogEntry::Replaced(replaced) => replaced.entry.mtime(),
        }
    }

    /// The size and checksum details of file-like entries.
    pub fn info(&self) -> Option<&FileInfo> {
        match self {
            CatalogEntry::File(file) => Some(&file.info),
            CatalogEntry::ArchiveMemberFile(file) => Some(&file.info),
            CatalogEntry::ChunkedFile(file) => Some(&file.info),
            CatalogEntry::Archive(archive) => Some(&archive.info),
            CatalogEntry::CachedFile(file) => Some(&file.info),
            CatalogEntry::Replaced(replaced) => replaced.entry.info(),
            CatalogEntry::Container(_)
            | CatalogEntry::Symlink(_)
            | CatalogEntry::Hardlink(_)
            | CatalogEntry::Directory(_) => None,
        }
    }

    pub fn info_mut(&mut self) -> Option<&mut FileInfo> {
        match self {
            CatalogEntry::File(file) => Some(&mut file.info),
            CatalogEntry::ArchiveMemberFile(file) => Some(&mut file.info),
            CatalogEntry::ChunkedFile(file) => Some(&mut file.info),
            CatalogEntry::Archive(archive) => Some(&mut archive.info),
            CatalogEntry::CachedFile(file) => Some(&mut file.info),
            CatalogEntry::Replaced(replaced) => replaced.entry.info_mut(),
            CatalogEntry::Container(_)
            | CatalogEntry::Symlink(_)
            | CatalogEntry::Hardlink(_)
            | CatalogEntry::Directory(_) => None,
        }
    }

    /// Observed size of file-like entries.
    #[inline(always)]
    pub fn size(&self) -> Option<u64> {
        self.info().map(|info| info.size)
    }

    /// The subtree owned by a directory, container or archive.
    pub fn tree(&self) -> Option<&CatalogTree> {
        match self {
            CatalogEntry::Directory(dir) => Some(&dir.tree),
            CatalogEntry::Container(container) => Some(&container.tree),
            CatalogEntry::Archive(archive) => Some(&archive.tree),
            _ => None,
        }
    }

    pub fn tree_mut(&mut self) -> Option<&mut CatalogTree> {
        match self {
            CatalogEntry::Directory(dir) => Some(&mut dir.tree),
            CatalogEntry::Container(container) => Some(&mut container.tree),
            CatalogEntry::Archive(archive) => Some(&mut archive.tree),
            _ => None,
        }
    }

    /// Whether hardlinks below this entry resolve against its own tree.
    #[inline(always)]
    pub fn is_link_root(&self) -> bool {
        matches!(self, CatalogEntry::Container(_) | CatalogEntry::Archive(_))
    }

    #[inline(always)]
    pub fn as_file(&self) -> Option<&FileRecord> {
        match self {
            CatalogEntry::File(file) => Some(file),
            _ => None,
        }
    }

    #[inline(always)]
    pub fn as_member_file(&self) -> Option<&MemberFileRecord> {
        match self {
            CatalogEntry::ArchiveMemberFile(file) => Some(file),
            _ => None,
        }
    }

    #[inline(always)]
    pub fn as_chunked_file(&self) -> Option<&ChunkedFileRecord> {
        match self {
            CatalogEntry::ChunkedFile(file) => Some(file),
            _ => None,
        }
    }

    #[inline(always)]
    pub fn as_archive(&self) -> Option<&ArchiveRecord> {
        match self {
            CatalogEntry::Archive(archive) => Some(archive),
            _ => None,
        }
    }

    #[inline(always)]
    pub fn as_directory(&self) -> Option<&DirectoryRecord> {
        match self {
            CatalogEntry::Directory(dir) => Some(dir),
            _ => None,
        }
    }

    #[inline(always)]
    pub fn as_symlink(&self) -> Option<&SymlinkRecord> {
        match self {
            CatalogEntry::Symlink(link) => Some(link),
            _ => None,
        }
    }

    #[inline(always)]
    pub fn as_hardlink(&self) -> Option<&HardlinkRecord> {
        match self {
            CatalogEntry::Hardlink(link) => Some(link),
            _ => None,
        }
    }

    #[inline(always)]
    pub fn as_replaced(&self) -> Option<&ReplacedRecord> {
        match self {
            CatalogEntry::Replaced(replaced) => Some(replaced),
            _ => None,
        }
    }
}

/// What is known about the content of a file-like entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileInfo {
    /// Size declared by the container, if it declares one.
    pub expected_size: Option<u64>,

    /// Number of bytes actually read.
    pub size: u64,

    /// Line count, for text-like content.
    pub lines: Option<u64>,

    pub checksum: Option<Vec<u8>>,

    /// A short human-readable description of the content type.
    pub type_name: Option<String>,

    /// Set when the entry could not be processed completely.
    pub error: bool,

    /// Messages attached during processing, reported with the entry.
    pub diagnostics: Vec<String>,
}

impl FileInfo {
    /// Whether the observed size disagrees with the declared one.
    #[inline(always)]
    pub fn is_short(&self) -> bool {
        matches!(self.expected_size, Some(expected) if expected != self.size)
    }

    /// Flag the entry as failed and keep `message` for the report.
    pub fn fail<S: Into<String>>(&mut self, message: S) {
        self.error = true;
        self.diagnostics.push(message.into());
    }
}

/// A free-standing file.
#[derive(Debug, Clone)]
pub struct FileRecord {
    pub mtime: i64,
    pub info: FileInfo,
}

/// A file stored contiguously inside its archive.
#[derive(Debug, Clone)]
pub struct MemberFileRecord {
    pub mtime: i64,
    pub info: FileInfo,

    /// Offset of the data within the archive.
    pub offset: u64,
}

/// A file assembled from discontiguous spans of its archive.
#[derive(Debug, Clone)]
pub struct ChunkedFileRecord {
    pub mtime: i64,
    pub info: FileInfo,
    pub chunks: ChunkList,
}

/// A grouping of entries that has no bytes of its own, such as a directory
/// tree given as input.
#[derive(Debug, Clone, Default)]
pub struct ContainerRecord {
    pub mtime: i64,
    pub tree: CatalogTree,
}

/// A file that is itself an archive, with the catalog of its contents.
#[derive(Debug, Clone, Default)]
pub struct ArchiveRecord {
    pub mtime: i64,
    pub info: FileInfo,
    pub tree: CatalogTree,
}

#[derive(Debug, Clone)]
pub struct SymlinkRecord {
    pub mtime: i64,

    /// The link text, exactly as stored.
    pub target: Vec<u8>,
}

/// A second name for an entry elsewhere in the same archive.
#[derive(Debug, Clone)]
pub struct HardlinkRecord {
    pub mtime: i64,

    /// Path of the linked entry, relative to the root of the enclosing
    /// archive or container.
    pub target: CatalogPath,
}

#[derive(Debug, Clone, Default)]
pub struct DirectoryRecord {
    pub mtime: i64,
    pub tree: CatalogTree,
}

impl DirectoryRecord {
    pub fn new(mtime: i64) -> DirectoryRecord {
        DirectoryRecord {
            mtime,
            tree: CatalogTree::new(),
        }
    }
}

/// A file whose content has been copied to local storage.
#[derive(Debug, Clone)]
pub struct CachedFileRecord {
    pub mtime: i64,
    pub info: FileInfo,
    pub location: PathBuf,
}

/// An entry superseded by a later entry of the same name.
#[derive(Debug, Clone)]
pub struct ReplacedRecord {
    /// The variant the entry had when it was active.
    pub kind: EntryKind,
    pub entry: Box<CatalogEntry>,
}

impl ReplacedRecord {
    pub fn new(entry: CatalogEntry) -> ReplacedRecord {
        ReplacedRecord {
            kind: entry.kind(),
            entry: Box::new(entry),
        }
    }
}
