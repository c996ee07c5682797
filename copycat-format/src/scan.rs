//! Cataloging one archive.

use std::io;

use crate::chunked::{ArchiveRange, EntryData, VirtualChunkFile};
use crate::context::CatalogContext;
use crate::entry::{Entry, EntryClass, EntryParser, FormatError, ParseError, Step};
use crate::header::TypeFlag;
use crate::path::CatalogPath;
use crate::record::{
    CatalogEntry, ChunkedFileRecord, DirectoryRecord, FileInfo, MemberFileRecord, SymlinkRecord,
};
use crate::tree::{CatalogTree, InsertError};
use crate::window::{ByteSource, WindowBuffer};

#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error(transparent)]
    Insert(#[from] InsertError),

    /// Reading the source failed for a reason other than the archive being
    /// cut short.
    #[error("Failed to read '{}'", .1)]
    Read(#[source] io::Error, CatalogPath),
}

#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("Failed to read the archive")]
    Io(#[from] io::Error),

    #[error("Invalid archive")]
    Format(#[from] FormatError),

    #[error("Processing a file failed")]
    Process(#[source] ProcessError),
}

/// A regular or sparse file found in an archive, handed to a
/// [`FileProcessor`].
#[derive(Debug)]
pub struct DiscoveredFile<'a> {
    pub path: CatalogPath,
    pub mtime: i64,

    /// The link type of the header the file came from.
    pub hint: TypeFlag,

    /// Logical size declared by the header.
    pub expected_size: Option<u64>,

    pub data: EntryData<'a>,

    /// How many archives deep the file is; files of the outermost archive
    /// are at depth 0.
    pub depth: usize,

    /// Anomalies found in the file's header.
    pub diagnostics: Vec<String>,
}

impl DiscoveredFile<'_> {
    /// Fill in what the header already told us: the declared size, unless
    /// `info` has one, and the parse diagnostics ahead of the processor's own.
    pub fn annotate(&self, mut info: FileInfo) -> FileInfo {
        info.expected_size = info.expected_size.or(self.expected_size);
        let mut diagnostics = self.diagnostics.clone();
        diagnostics.append(&mut info.diagnostics);
        info.diagnostics = diagnostics;
        info
    }

    /// The entry describing this file: a member file for contiguous data, a
    /// chunked file for sparse data. `info` is annotated first.
    pub fn entry(&self, info: FileInfo) -> CatalogEntry {
        let info = self.annotate(info);
        match &self.data {
            EntryData::Contiguous(range) => CatalogEntry::ArchiveMemberFile(MemberFileRecord {
                mtime: self.mtime,
                info,
                offset: range.source_offset(),
            }),
            EntryData::Chunked(file) => CatalogEntry::ChunkedFile(ChunkedFileRecord {
                mtime: self.mtime,
                info,
                chunks: file.chunks().clone(),
            }),
        }
    }
}

/// Decides what to record for each file an archive contains.
///
/// Implementations read the data as they see fit, then insert the finished
/// entry at `file.path` themselves.
pub trait FileProcessor {
    fn process(&mut self, tree: &mut CatalogTree, file: DiscoveredFile<'_>)
        -> Result<(), ProcessError>;
}

/// Records the observed size of each file and nothing else.
#[derive(Debug, Default)]
pub struct MeasuringProcessor;

impl FileProcessor for MeasuringProcessor {
    fn process(
        &mut self,
        tree: &mut CatalogTree,
        mut file: DiscoveredFile<'_>,
    ) -> Result<(), ProcessError> {
        let mut info = FileInfo::default();
        match io::copy(&mut file.data, &mut io::sink()) {
            Ok(n) => info.size = n,
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                tracing::warn!(path = %file.path, error = %e, "file data is cut short");
                info.fail(format!("read failed: {}", e));
            }
            Err(e) => return Err(ProcessError::Read(e, file.path)),
        }

        let entry = file.entry(info);
        tree.insert(&file.path, entry)?;
        Ok(())
    }
}

/// Summary of one scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanOutcome {
    /// Entries inserted into the tree, files included.
    pub entries: usize,

    /// The archive ended without its end-of-archive blocks.
    pub truncated: bool,

    /// Entries of types that are not cataloged.
    pub skipped: usize,

    /// Entries that could not be inserted, and why.
    pub diagnostics: Vec<String>,
}

/// Walks one archive, entry by entry, and builds its catalog.
#[derive(Debug)]
pub struct ArchiveCataloger<'c, S> {
    ctx: &'c CatalogContext,
    window: WindowBuffer<S>,
    parser: EntryParser,
    depth: usize,
}

impl<'c, S: ByteSource> ArchiveCataloger<'c, S> {
    pub fn new(ctx: &'c CatalogContext, source: S) -> ArchiveCataloger<'c, S> {
        ArchiveCataloger {
            ctx,
            window: WindowBuffer::new(source, ctx.window_capacity),
            parser: EntryParser::new(),
            depth: 0,
        }
    }

    /// Set how many archives deep this archive is.
    pub fn with_depth(mut self, depth: usize) -> Self {
        self.depth = depth;
        self
    }

    #[inline(always)]
    pub fn context(&self) -> &CatalogContext {
        self.ctx
    }

    /// Scan the whole archive into `tree`, which should be the archive's own
    /// (initially empty) tree.
    ///
    /// A missing end-of-archive marker is not an error: everything read so
    /// far stays in the tree and the outcome is flagged as truncated.
    pub fn catalog<P: FileProcessor + ?Sized>(
        mut self,
        tree: &mut CatalogTree,
        processor: &mut P,
    ) -> Result<ScanOutcome, ScanError> {
        let mut outcome = ScanOutcome::default();

        loop {
            match self.parser.parse(&self.window) {
                Ok((step, next)) => {
                    match step {
                        Step::Entry(entry) => self.dispatch(tree, processor, entry, &mut outcome)?,
                        Step::Skipped { .. } => outcome.skipped += 1,
                        Step::Metadata | Step::ZeroBlock | Step::Terminated => {}
                    }
                    self.window.advance_to(next);
                }
                Err(ParseError::NeedMoreBytes { .. }) => {
                    if self.window.fill()? > 0 {
                        continue;
                    }

                    if !self.parser.is_terminated() {
                        tracing::warn!(
                            offset = self.window.position_new(),
                            "archive ends without an end-of-archive marker"
                        );
                        outcome.truncated = true;
                    }
                    break;
                }
                Err(ParseError::Format(e)) => return Err(e.into()),
            }
        }

        tracing::debug!(
            entries = outcome.entries,
            skipped = outcome.skipped,
            truncated = outcome.truncated,
            "archive cataloged"
        );

        Ok(outcome)
    }

    fn dispatch<P: FileProcessor + ?Sized>(
        &self,
        tree: &mut CatalogTree,
        processor: &mut P,
        entry: Entry,
        outcome: &mut ScanOutcome,
    ) -> Result<(), ScanError> {
        let path = match CatalogPath::new(&entry.path) {
            Ok(path) => path,
            Err(e) => {
                let name = String::from_utf8_lossy(&entry.path);
                tracing::warn!(path = %name, error = %e, "skipping entry");
                outcome.diagnostics.push(format!("{}: {}", name, e));
                return Ok(());
            }
        };

        let result = match entry.class {
            EntryClass::Directory => tree
                .insert(&path, CatalogEntry::Directory(DirectoryRecord::new(entry.mtime)))
                .map_err(ProcessError::from),
            EntryClass::Symlink => tree
                .insert(
                    &path,
                    CatalogEntry::Symlink(SymlinkRecord {
                        mtime: entry.mtime,
                        target: entry.link_name,
                    }),
                )
                .map_err(ProcessError::from),
            EntryClass::Hardlink => CatalogPath::new(&entry.link_name)
                .map_err(InsertError::from)
                .and_then(|target| {
                    tree.link_with_hops(entry.mtime, &target, &path, self.ctx.max_link_hops)
                })
                .map_err(ProcessError::from),
            EntryClass::File => {
                let source: &dyn ByteSource = self.window.source();
                let expected_size = entry.logical_size();
                let data = match entry.sparse {
                    Some(chunks) => EntryData::Chunked(VirtualChunkFile::new(source, chunks)),
                    None => EntryData::Contiguous(ArchiveRange::new(
                        source,
                        entry.data_offset,
                        entry.size,
                    )),
                };

                processor.process(
                    tree,
                    DiscoveredFile {
                        path: path.clone(),
                        mtime: entry.mtime,
                        hint: entry.type_flag,
                        expected_size: Some(expected_size),
                        data,
                        depth: self.depth,
                        diagnostics: entry.diagnostics.clone(),
                    },
                )
            }
        };

        match result {
            Ok(()) => {
                outcome.entries += 1;
                if entry.class != EntryClass::File {
                    outcome.diagnostics.extend(
                        entry
                            .diagnostics
                            .into_iter()
                            .map(|d| format!("{}: {}", path, d)),
                    );
                }
                Ok(())
            }
            Err(ProcessError::Insert(e)) => {
                tracing::warn!(path = %path, error = %e, "skipping entry");
                outcome.diagnostics.push(format!("{}: {}", path, e));
                Ok(())
            }
            Err(e) => Err(ScanError::Process(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_source_is_truncated() {
        let ctx = CatalogContext::default();
        let mut tree = CatalogTree::new();
        let outcome = ArchiveCataloger::new(&ctx, Vec::new())
            .catalog(&mut tree, &mut MeasuringProcessor)
            .unwrap();
        assert!(outcome.truncated);
        assert!(tree.is_empty());
    }

    #[test]
    fn garbage_is_a_format_error() {
        let ctx = CatalogContext::default();
        let mut tree = CatalogTree::new();
        let result = ArchiveCataloger::new(&ctx, vec![0x01u8; 1024])
            .catalog(&mut tree, &mut MeasuringProcessor);
        assert!(matches!(
            result,
            Err(ScanError::Format(FormatError::UnrecognizedHeader { offset: 0, .. }))
        ));
    }
}
