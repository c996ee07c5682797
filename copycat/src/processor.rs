//! What the command line records for each file: size, CRC-32, line count,
//! a type guessed from the name, and the catalog of nested tar archives.

use std::io::{self, Read};

use copycat_format::{
    ArchiveCataloger, ArchiveRecord, ByteSource, CatalogContext, CatalogEntry, CatalogTree,
    DiscoveredFile, FileInfo, FileProcessor, ProcessError, ScanError, ScanOutcome,
};

const BUF_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeHint {
    pub name: &'static str,
    pub text: bool,
}

const HINTS: &[(&str, TypeHint)] = &[
    ("tar", TypeHint { name: "tar archive", text: false }),
    ("gz", TypeHint { name: "gzip compressed", text: false }),
    ("tgz", TypeHint { name: "gzip compressed", text: false }),
    ("bz2", TypeHint { name: "bzip2 compressed", text: false }),
    ("xz", TypeHint { name: "xz compressed", text: false }),
    ("zip", TypeHint { name: "zip archive", text: false }),
    ("sra", TypeHint { name: "sra container", text: false }),
    ("txt", TypeHint { name: "text", text: true }),
    ("md", TypeHint { name: "text", text: true }),
    ("log", TypeHint { name: "text", text: true }),
    ("csv", TypeHint { name: "delimited text", text: true }),
    ("tsv", TypeHint { name: "delimited text", text: true }),
    ("json", TypeHint { name: "json", text: true }),
    ("xml", TypeHint { name: "xml", text: true }),
    ("html", TypeHint { name: "html", text: true }),
    ("fa", TypeHint { name: "fasta", text: true }),
    ("fasta", TypeHint { name: "fasta", text: true }),
    ("fq", TypeHint { name: "fastq", text: true }),
    ("fastq", TypeHint { name: "fastq", text: true }),
    ("sh", TypeHint { name: "shell script", text: true }),
    ("py", TypeHint { name: "python script", text: true }),
    ("png", TypeHint { name: "png image", text: false }),
    ("jpg", TypeHint { name: "jpeg image", text: false }),
    ("pdf", TypeHint { name: "pdf document", text: false }),
];

fn extension(name: &[u8]) -> Option<String> {
    let file_name = match name.iter().rposition(|b| *b == b'/') {
        Some(at) => &name[at + 1..],
        None => name,
    };
    let dot = file_name.iter().rposition(|b| *b == b'.')?;
    if dot == 0 {
        return None;
    }
    Some(String::from_utf8_lossy(&file_name[dot + 1..]).to_ascii_lowercase())
}

/// Guess the content type of a file from its name.
pub fn type_hint(name: &[u8]) -> Option<TypeHint> {
    let ext = extension(name)?;
    HINTS
        .iter()
        .find(|(known, _)| *known == ext)
        .map(|(_, hint)| *hint)
}

#[inline(always)]
pub fn is_archive(name: &[u8]) -> bool {
    extension(name).as_deref() == Some("tar")
}

/// Read `reader` to the end, recording what `ctx` asks for. Running out of
/// data early marks the result as failed; other read errors are returned.
pub fn measure<R: Read>(ctx: &CatalogContext, name: &[u8], mut reader: R) -> io::Result<FileInfo> {
    let hint = type_hint(name);
    let mut info = FileInfo {
        type_name: hint.map(|hint| hint.name.to_string()),
        ..Default::default()
    };

    let mut hasher = if ctx.checksums {
        Some(crc32fast::Hasher::new())
    } else {
        None
    };
    let mut lines = match hint {
        Some(hint) if hint.text && ctx.line_counts => Some(0u64),
        _ => None,
    };

    let mut buf = vec![0u8; BUF_SIZE];
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                info.fail(format!("read failed: {}", e));
                break;
            }
            Err(e) => return Err(e),
        };

        let chunk = &buf[..n];
        info.size += n as u64;
        if let Some(hasher) = hasher.as_mut() {
            hasher.update(chunk);
        }
        if let Some(lines) = lines.as_mut() {
            *lines += chunk.iter().filter(|b| **b == b'\n').count() as u64;
        }
    }

    info.checksum = hasher.map(|hasher| hasher.finalize().to_be_bytes().to_vec());
    info.lines = lines;
    Ok(info)
}

fn error_chain(error: &dyn std::error::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(e) = source {
        message.push_str(": ");
        message.push_str(&e.to_string());
        source = e.source();
    }
    message
}

/// Record how scanning an archive went on the archive's own entry.
pub fn record_scan(info: &mut FileInfo, result: Result<ScanOutcome, ScanError>) {
    match result {
        Ok(outcome) => {
            info.diagnostics.extend(outcome.diagnostics);
            if outcome.truncated {
                info.fail("archive is truncated");
            }
        }
        Err(e) => {
            let message = error_chain(&e);
            tracing::warn!(error = %message, "archive cataloged only in part");
            info.fail(message);
        }
    }
}

/// Measures every file and catalogs `.tar` members as archives, down to
/// the context's maximum depth.
#[derive(Debug)]
pub struct ChecksumProcessor<'c> {
    ctx: &'c CatalogContext,
}

impl<'c> ChecksumProcessor<'c> {
    pub fn new(ctx: &'c CatalogContext) -> ChecksumProcessor<'c> {
        ChecksumProcessor { ctx }
    }

    fn wants_recursion(&self, file: &DiscoveredFile<'_>) -> bool {
        self.ctx.recurse && file.depth < self.ctx.max_depth && is_archive(file.path.filename())
    }
}

impl FileProcessor for ChecksumProcessor<'_> {
    fn process(
        &mut self,
        tree: &mut CatalogTree,
        mut file: DiscoveredFile<'_>,
    ) -> Result<(), ProcessError> {
        let info = measure(self.ctx, file.path.filename(), &mut file.data)
            .map_err(|e| ProcessError::Read(e, file.path.clone()))?;

        let entry = if self.wants_recursion(&file) {
            tracing::debug!(path = %file.path, depth = file.depth + 1, "cataloging nested archive");

            let ctx = self.ctx;
            let mut info = file.annotate(info);
            let mut nested = CatalogTree::new();
            let source: &dyn ByteSource = &file.data;
            let result = ArchiveCataloger::new(ctx, source)
                .with_depth(file.depth + 1)
                .catalog(&mut nested, self);
            record_scan(&mut info, result);

            CatalogEntry::Archive(ArchiveRecord {
                mtime: file.mtime,
                info,
                tree: nested,
            })
        } else {
            file.entry(info)
        };

        tree.insert(&file.path, entry)?;
        Ok(())
    }
}
