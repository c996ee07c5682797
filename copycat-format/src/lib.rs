//! Cataloging of tar archives in all their historical dialects.
//!
//! An [`ArchiveCataloger`] walks one archive through a fixed-size
//! [`WindowBuffer`], turns its headers into entries with the [`EntryParser`],
//! and records the result in a [`CatalogTree`]. What is recorded for each
//! regular file is up to a [`FileProcessor`].

pub mod chunked;
mod context;
pub mod entry;
pub mod field;
pub mod header;
pub mod path;
mod record;
pub mod scan;
pub mod sparse;
mod tree;
pub mod window;

pub use chunked::{ArchiveRange, EntryData, VirtualChunkFile};
pub use context::{
    CatalogContext, DEFAULT_MAX_DEPTH, DEFAULT_MAX_LINK_HOPS, DEFAULT_WINDOW_CAPACITY,
};
pub use entry::{EntryParser, FormatError, ParseError};
pub use header::{HeaderKind, TypeFlag};
pub use path::CatalogPath;
pub use record::{
    ArchiveRecord, CachedFileRecord, CatalogEntry, ChunkedFileRecord, ContainerRecord,
    DirectoryRecord, EntryKind, FileInfo, FileRecord, HardlinkRecord, MemberFileRecord,
    ReplacedRecord, SymlinkRecord,
};
pub use scan::{
    ArchiveCataloger, DiscoveredFile, FileProcessor, MeasuringProcessor, ProcessError,
    ScanError, ScanOutcome,
};
pub use sparse::{Chunk, ChunkList, SparseReconstructor};
pub use tree::{CatalogTree, Entries, EntriesItem, InsertError, Slot};
pub use window::{ByteSource, WindowBuffer};
