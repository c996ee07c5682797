//! The per-entry tar state machine.
//!
//! [`EntryParser::parse`] looks at the window starting from its resume point
//! and consumes exactly one entry: one header block plus whatever belongs to
//! it (sparse continuation blocks, long-name or PAX payloads). It never reads
//! from the source itself. When the entry is not fully inside the window it
//! returns [`ParseError::NeedMoreBytes`] without changing any state, and the
//! caller fills the window and calls it again.

use crate::field;
use crate::header::{layout, Block, HeaderKind, ParsedHeader, SparseLayout, TypeFlag, BLOCK_SIZE};
use crate::sparse::{ChunkList, SparseError, SparseReconstructor};
use crate::window::{ByteSource, WindowBuffer, WindowError};

const BLOCK: u64 = BLOCK_SIZE as u64;

/// Round a payload size up to whole blocks.
#[inline(always)]
pub fn padded(size: u64) -> u64 {
    size.saturating_add(BLOCK - 1) / BLOCK * BLOCK
}

#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("unrecognized header at offset {offset} ({kind})")]
    UnrecognizedHeader { offset: u64, kind: HeaderKind },

    #[error("non-zero block at offset {offset} after an end-of-archive block")]
    BrokenTerminator { offset: u64 },

    #[error("data after the end of the archive at offset {offset}")]
    TrailingData { offset: u64 },

    #[error("entry at offset {offset} does not fit the read window")]
    TooLarge {
        offset: u64,
        #[source]
        source: WindowError,
    },

    #[error("invalid sparse map in entry at offset {offset}")]
    Sparse {
        offset: u64,
        #[source]
        source: SparseError,
    },

    #[error("negative size {size} in entry at offset {offset}")]
    NegativeSize { offset: u64, size: i64 },

    #[error("size {size} of entry at offset {offset} is out of range")]
    SizeOutOfRange { offset: u64, size: u64 },

    #[error("entry at offset {offset} runs past the largest representable offset")]
    OffsetOverflow { offset: u64 },
}

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// The entry continues past the end of the window.
    #[error("need {len} bytes at offset {offset}")]
    NeedMoreBytes { offset: u64, len: u64 },

    #[error(transparent)]
    Format(#[from] FormatError),
}

/// On success, the value and the offset the next header starts at.
pub type ParseResult<T> = Result<(T, u64), ParseError>;

/// What a dispatched entry is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryClass {
    File,
    Directory,
    Symlink,
    Hardlink,
}

/// One complete archive entry.
#[derive(Debug, Clone)]
pub struct Entry {
    /// Offset of the entry's (first) header block.
    pub header_offset: u64,
    pub kind: HeaderKind,
    pub type_flag: TypeFlag,
    pub class: EntryClass,

    /// Member name after long-name and PAX overrides, as raw bytes.
    pub path: Vec<u8>,
    pub link_name: Vec<u8>,

    pub mode: u32,
    pub uid: u64,
    pub gid: u64,
    pub mtime: i64,

    /// Payload bytes stored in the archive after the header blocks.
    pub size: u64,

    /// Offset of the payload.
    pub data_offset: u64,

    /// The chunk map of a sparse file.
    pub sparse: Option<ChunkList>,

    /// Anomalies found while parsing, for the entry's report.
    pub diagnostics: Vec<String>,
}

impl Entry {
    /// Logical size of the file this entry describes.
    pub fn logical_size(&self) -> u64 {
        match self.sparse.as_ref() {
            Some(chunks) => chunks.virtual_size(),
            None => self.size,
        }
    }
}

/// The outcome of parsing one entry.
#[derive(Debug, Clone)]
pub enum Step {
    Entry(Entry),

    /// A long name, long link or PAX header, held for the next entry.
    Metadata,

    /// An entry of a type that is not cataloged.
    Skipped { offset: u64, type_flag: TypeFlag },

    /// A zero block, either the first of the end-of-archive pair or padding
    /// after it.
    ZeroBlock,

    /// The second of two zero blocks.
    Terminated,
}

/// Values from a PAX extended header that override the next header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaxOverrides {
    pub path: Option<Vec<u8>>,
    pub link_path: Option<Vec<u8>>,
    pub size: Option<u64>,
    pub mtime: Option<i64>,
}

impl PaxOverrides {
    /// Parse the `<len> <key>=<value>\n` records of an extended header.
    /// Parsing stops at the first malformed record.
    pub fn parse(data: &[u8]) -> PaxOverrides {
        let mut out = PaxOverrides::default();
        let mut rest = data;

        while !rest.is_empty() && rest[0] != 0 {
            let (key, value, len) = match pax_record(rest) {
                Some(v) => v,
                None => {
                    tracing::warn!("malformed PAX record, ignoring the rest of the header");
                    break;
                }
            };

            match key {
                b"path" => out.path = Some(value.to_vec()),
                b"linkpath" => out.link_path = Some(value.to_vec()),
                b"size" => out.size = parse_decimal(value),
                b"mtime" => {
                    // Sub-second precision is dropped.
                    let whole = value.split(|b| *b == b'.').next().unwrap_or_default();
                    out.mtime = parse_signed_decimal(whole);
                }
                other => {
                    tracing::trace!(key = %String::from_utf8_lossy(other), "ignoring PAX key");
                }
            }

            rest = &rest[len..];
        }

        out
    }
}

fn pax_record(data: &[u8]) -> Option<(&[u8], &[u8], usize)> {
    let space = data.iter().position(|b| *b == b' ')?;
    let len = parse_decimal(&data[..space])? as usize;
    if len <= space + 1 || len > data.len() || data[len - 1] != b'\n' {
        return None;
    }

    let record = &data[space + 1..len - 1];
    let eq = record.iter().position(|b| *b == b'=')?;
    Some((&record[..eq], &record[eq + 1..], len))
}

fn parse_decimal(digits: &[u8]) -> Option<u64> {
    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return None;
    }
    digits
        .iter()
        .try_fold(0u64, |acc, d| acc.checked_mul(10)?.checked_add((d - b'0') as u64))
}

fn parse_signed_decimal(digits: &[u8]) -> Option<i64> {
    match digits.split_first() {
        Some((b'-', rest)) => parse_decimal(rest).map(|v| -(v as i64)),
        _ => parse_decimal(digits).map(|v| v as i64),
    }
}

/// Names and overrides waiting for the header they apply to.
#[derive(Debug, Clone, Default)]
struct Pending {
    long_name: Option<Vec<u8>>,
    long_link: Option<Vec<u8>>,
    pax: Option<PaxOverrides>,
}

/// Tracks what has been seen between entries.
#[derive(Debug, Default)]
pub struct EntryParser {
    pending: Pending,
    zero_blocks: u8,
    terminated: bool,
}

fn window_bytes<S: ByteSource>(
    window: &WindowBuffer<S>,
    entry_offset: u64,
    offset: u64,
    len: u64,
) -> Result<&[u8], ParseError> {
    window.bytes(offset, len).map_err(|e| match e {
        WindowError::NeedMoreBytes { offset, len } => ParseError::NeedMoreBytes { offset, len },
        source => ParseError::Format(FormatError::TooLarge {
            offset: entry_offset,
            source,
        }),
    })
}

fn read_block<S: ByteSource>(
    window: &WindowBuffer<S>,
    entry_offset: u64,
    offset: u64,
) -> Result<Block, ParseError> {
    let bytes = window_bytes(window, entry_offset, offset, BLOCK)?;
    let mut block = [0u8; BLOCK_SIZE];
    block.copy_from_slice(bytes);
    Ok(block)
}

/// The offset `size` bytes of payload, padded to whole blocks, end at.
fn skip_payload(entry_offset: u64, from: u64, size: u64) -> Result<u64, ParseError> {
    from.checked_add(padded(size))
        .ok_or_else(|| FormatError::OffsetOverflow { offset: entry_offset }.into())
}

/// Whether a GNU or STAR `isextended` flag is set.
#[inline(always)]
fn flag_set(byte: u8) -> bool {
    byte != 0 && byte != b'0'
}

impl EntryParser {
    pub fn new() -> EntryParser {
        EntryParser::default()
    }

    /// Whether both end-of-archive blocks have been seen.
    #[inline(always)]
    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Parse the entry at the window's resume point.
    pub fn parse<S: ByteSource>(&mut self, window: &WindowBuffer<S>) -> ParseResult<Step> {
        let offset = window.position_new();
        let block = read_block(window, offset, offset)?;
        let kind = HeaderKind::classify(&block);
        let next_block = offset
            .checked_add(BLOCK)
            .ok_or(FormatError::OffsetOverflow { offset })?;

        tracing::trace!(offset, %kind, "header block");

        if self.terminated {
            if kind == HeaderKind::ZeroBlock {
                return Ok((Step::ZeroBlock, next_block));
            }
            return Err(FormatError::TrailingData { offset }.into());
        }

        if kind == HeaderKind::ZeroBlock {
            if self.zero_blocks > 0 {
                self.terminated = true;
                return Ok((Step::Terminated, next_block));
            }
            self.zero_blocks = 1;
            return Ok((Step::ZeroBlock, next_block));
        }

        if self.zero_blocks > 0 {
            return Err(FormatError::BrokenTerminator { offset }.into());
        }

        if !kind.is_tar() {
            return Err(FormatError::UnrecognizedHeader { offset, kind }.into());
        }

        let header = ParsedHeader::parse(&block, kind);
        let mut diagnostics = vec![];
        if !header.checksum_ok {
            tracing::warn!(offset, "header checksum mismatch");
            diagnostics.push(format!("header checksum mismatch at offset {}", offset));
        }

        if header.size < 0 {
            return Err(FormatError::NegativeSize {
                offset,
                size: header.size,
            }
            .into());
        }
        let stored = header.size as u64;

        match header.type_flag {
            TypeFlag::GnuLongName | TypeFlag::GnuLongLink => {
                let content = window_bytes(window, offset, next_block, stored)?;
                let text = crate::header::c_str(content).to_vec();
                if header.type_flag == TypeFlag::GnuLongName {
                    self.pending.long_name = Some(text);
                } else {
                    self.pending.long_link = Some(text);
                }
                return Ok((Step::Metadata, skip_payload(offset, next_block, stored)?));
            }
            TypeFlag::PaxExtended => {
                let content = window_bytes(window, offset, next_block, stored)?;
                self.pending.pax = Some(PaxOverrides::parse(content));
                return Ok((Step::Metadata, skip_payload(offset, next_block, stored)?));
            }
            TypeFlag::PaxGlobal => {
                tracing::debug!(offset, "ignoring PAX global header");
                return Ok((Step::Metadata, skip_payload(offset, next_block, stored)?));
            }
            _ => {}
        }

        let pax = self.pending.pax.as_ref();
        let size = pax.and_then(|pax| pax.size).unwrap_or(stored);
        if size > i64::MAX as u64 {
            return Err(FormatError::SizeOutOfRange { offset, size }.into());
        }
        let name = pax
            .and_then(|pax| pax.path.as_deref())
            .or(self.pending.long_name.as_deref())
            .unwrap_or(&header.name);

        let class = match header.type_flag {
            TypeFlag::Regular | TypeFlag::Contiguous if name.ends_with(b"/") => {
                EntryClass::Directory
            }
            TypeFlag::Regular | TypeFlag::Contiguous | TypeFlag::GnuSparse => EntryClass::File,
            TypeFlag::Directory => EntryClass::Directory,
            TypeFlag::Symlink => EntryClass::Symlink,
            TypeFlag::HardLink => EntryClass::Hardlink,
            type_flag => {
                tracing::debug!(offset, ?type_flag, "skipping entry");
                self.pending = Pending::default();
                let next = skip_payload(offset, next_block, size)?;
                return Ok((Step::Skipped { offset, type_flag }, next));
            }
        };

        let (sparse, header_blocks) = if header.type_flag == TypeFlag::GnuSparse {
            let sparse_layout = match kind.sparse_layout() {
                Some(layout) => layout,
                None => {
                    tracing::debug!(offset, %kind, "sparse entry without a sparse layout, reading GNU fields");
                    SparseLayout::GNU
                }
            };
            let (chunks, blocks) = read_sparse_map(window, offset, &block, &sparse_layout, size)?;
            (Some(chunks), blocks)
        } else {
            (None, 1)
        };

        let data_offset = header_blocks
            .checked_mul(BLOCK)
            .and_then(|len| offset.checked_add(len))
            .ok_or(FormatError::OffsetOverflow { offset })?;
        let next = skip_payload(offset, data_offset, size)?;
        let pending = std::mem::take(&mut self.pending);
        let pax = pending.pax.unwrap_or_default();

        let path = pax.path.or(pending.long_name).unwrap_or(header.name);
        let link_name = pax
            .link_path
            .or(pending.long_link)
            .unwrap_or(header.link_name);
        let mtime = pax.mtime.unwrap_or(header.mtime);

        tracing::debug!(
            offset,
            path = %String::from_utf8_lossy(&path),
            size,
            ?class,
            "entry"
        );

        let entry = Entry {
            header_offset: offset,
            kind,
            type_flag: header.type_flag,
            class,
            path,
            link_name,
            mode: header.mode,
            uid: header.uid,
            gid: header.gid,
            mtime,
            size,
            data_offset,
            sparse,
            diagnostics,
        };

        Ok((Step::Entry(entry), next))
    }
}

/// Collect the sparse map of a `'S'` entry from its header and continuation
/// blocks. Returns the chunk list and the number of header blocks used.
fn read_sparse_map<S: ByteSource>(
    window: &WindowBuffer<S>,
    offset: u64,
    block: &Block,
    sparse_layout: &SparseLayout,
    stored_size: u64,
) -> Result<(ChunkList, u64), ParseError> {
    let sparse_error = |source| FormatError::Sparse { offset, source };

    let real_size = field::decode_or_zero(&block[sparse_layout.real_size.clone()], "realsize");
    let mut sparse = SparseReconstructor::new(real_size).map_err(sparse_error)?;

    let mut ended = push_spans(
        &mut sparse,
        &block[sparse_layout.spans..],
        layout::HEADER_SPARSE_COUNT,
    )
    .map_err(sparse_error)?;
    let mut extended = flag_set(block[sparse_layout.is_extended]);
    let mut blocks: u64 = 1;

    // Continuation blocks are stepped over even after a terminating span so
    // the payload offset stays right.
    while extended {
        let at = blocks
            .checked_mul(BLOCK)
            .and_then(|len| offset.checked_add(len))
            .ok_or(FormatError::OffsetOverflow { offset })?;
        let ext = read_block(window, offset, at)?;
        tracing::trace!(offset = at, kind = %HeaderKind::SparseContinuation, "header block");

        if !ended {
            ended = push_spans(&mut sparse, &ext, layout::EXT_SPARSE_COUNT).map_err(sparse_error)?;
        }
        extended = flag_set(ext[layout::EXT_IS_EXTENDED]);
        blocks += 1;
    }

    let payload_start = blocks
        .checked_mul(BLOCK)
        .and_then(|len| offset.checked_add(len))
        .ok_or(FormatError::OffsetOverflow { offset })?;
    let chunks = sparse
        .finish(payload_start, stored_size)
        .map_err(sparse_error)?;
    Ok((chunks, blocks))
}

/// Push up to `count` spans. Returns whether a terminating span was found.
fn push_spans(
    sparse: &mut SparseReconstructor,
    spans: &[u8],
    count: usize,
) -> Result<bool, SparseError> {
    for i in 0..count {
        let start = i * layout::SPARSE_SPAN_LEN;
        let offset_field = &spans[start..start + layout::SPARSE_FIELD_LEN];
        let size_field =
            &spans[start + layout::SPARSE_FIELD_LEN..start + layout::SPARSE_SPAN_LEN];

        if offset_field[0] == 0 {
            return Ok(true);
        }

        let size = field::decode_or_zero(size_field, "sparse size");
        if size == 0 {
            return Ok(true);
        }

        sparse.push(field::decode_or_zero(offset_field, "sparse offset"), size)?;
    }

    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::{compute_checksum, GNU_MAGIC, POSIX_MAGIC, POSIX_VERSION};

    fn header(name: &[u8], type_flag: u8, size: u64) -> Block {
        let mut block = [0u8; BLOCK_SIZE];
        block[..name.len()].copy_from_slice(name);
        block[layout::MODE].copy_from_slice(b"0000644\0");
        block[layout::SIZE].copy_from_slice(format!("{:011o}\0", size).as_bytes());
        block[layout::MTIME].copy_from_slice(b"14000000000\0");
        block[layout::TYPE_FLAG] = type_flag;
        block[layout::MAGIC].copy_from_slice(POSIX_MAGIC);
        block[layout::VERSION].copy_from_slice(POSIX_VERSION);
        block
    }

    fn seal(mut block: Block) -> Block {
        let sum = compute_checksum(&block);
        block[layout::CHECKSUM].copy_from_slice(format!("{:06o}\0 ", sum).as_bytes());
        block
    }

    fn payload(archive: &mut Vec<u8>, data: &[u8]) {
        archive.extend_from_slice(data);
        let pad = padded(data.len() as u64) as usize - data.len();
        archive.extend(std::iter::repeat(0u8).take(pad));
    }

    fn run(archive: Vec<u8>, capacity: usize) -> Result<Vec<Step>, ParseError> {
        let mut window = WindowBuffer::new(archive, capacity);
        let mut parser = EntryParser::new();
        let mut steps = vec![];
        window.fill().unwrap();

        loop {
            match parser.parse(&window) {
                Ok((step, next)) => {
                    let done = matches!(step, Step::Terminated);
                    steps.push(step);
                    if done {
                        return Ok(steps);
                    }
                    window.advance_to(next);
                }
                Err(ParseError::NeedMoreBytes { .. }) => {
                    if window.fill().unwrap() == 0 {
                        return Ok(steps);
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn entries(steps: &[Step]) -> Vec<&Entry> {
        steps
            .iter()
            .filter_map(|s| match s {
                Step::Entry(e) => Some(e),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn plain_entries() {
        let mut archive = vec![];
        archive.extend_from_slice(&seal(header(b"d/", b'5', 0)));
        archive.extend_from_slice(&seal(header(b"d/f.txt", b'0', 10)));
        payload(&mut archive, b"0123456789");
        archive.extend_from_slice(&[0u8; 1024]);

        let steps = run(archive, 4096).unwrap();
        let entries = entries(&steps);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].class, EntryClass::Directory);
        assert_eq!(entries[1].path, b"d/f.txt".to_vec());
        assert_eq!(entries[1].size, 10);
        assert_eq!(entries[1].data_offset, 1024);
        assert!(entries[1].diagnostics.is_empty());
        assert!(matches!(steps.last(), Some(Step::Terminated)));
    }

    #[test]
    fn long_names() {
        let long = vec![b'n'; 300];
        let mut archive = vec![];
        archive.extend_from_slice(&seal(header(b"././@LongLink", b'L', 301)));
        let mut text = long.clone();
        text.push(0);
        payload(&mut archive, &text);
        archive.extend_from_slice(&seal(header(b"truncated", b'0', 0)));
        archive.extend_from_slice(&[0u8; 1024]);

        let steps = run(archive, 1024).unwrap();
        let entries = entries(&steps);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].path, long);
    }

    #[test]
    fn long_name_larger_than_window() {
        let mut archive = vec![];
        archive.extend_from_slice(&seal(header(b"././@LongLink", b'L', 2000)));
        payload(&mut archive, &vec![b'n'; 2000]);
        archive.extend_from_slice(&[0u8; 1024]);

        assert!(matches!(
            run(archive, 1024),
            Err(ParseError::Format(FormatError::TooLarge { offset: 0, .. }))
        ));
    }

    #[test]
    fn pax_overrides() {
        let records = b"30 path=pax/path/the-name.txt\n20 mtime=1234.56789\n";
        assert_eq!(records.len(), 50);

        let mut archive = vec![];
        archive.extend_from_slice(&seal(header(b"PaxHeader", b'x', records.len() as u64)));
        payload(&mut archive, records);
        archive.extend_from_slice(&seal(header(b"short", b'0', 0)));
        archive.extend_from_slice(&[0u8; 1024]);

        let steps = run(archive, 4096).unwrap();
        let entries = entries(&steps);
        assert_eq!(entries[0].path, b"pax/path/the-name.txt".to_vec());
        assert_eq!(entries[0].mtime, 1234);
    }

    #[test]
    fn malformed_pax_is_ignored() {
        let pax = PaxOverrides::parse(b"9 path=a\nbogus");
        assert_eq!(pax.path, Some(b"a".to_vec()));
        assert_eq!(PaxOverrides::parse(b"99 path=a\n"), PaxOverrides::default());
    }

    #[test]
    fn gnu_sparse_with_continuation() {
        let mut block = header(b"sparse.bin", b'S', 1024);
        block[layout::MAGIC.start..layout::GNU_MAGIC.end].copy_from_slice(GNU_MAGIC);
        // Four spans in the header, 100 bytes each, one block apart.
        for i in 0..4 {
            let at = layout::GNU_SPARSE + i * layout::SPARSE_SPAN_LEN;
            block[at..at + 12].copy_from_slice(format!("{:011o}\0", i * 1000).as_bytes());
            block[at + 12..at + 24].copy_from_slice(b"00000000144\0");
        }
        block[layout::GNU_IS_EXTENDED] = 1;
        block[layout::GNU_REAL_SIZE].copy_from_slice(format!("{:011o}\0", 10_000).as_bytes());

        let mut ext = [0u8; BLOCK_SIZE];
        ext[0..12].copy_from_slice(format!("{:011o}\0", 5000).as_bytes());
        ext[12..24].copy_from_slice(b"00000000144\0");

        let mut archive = vec![];
        archive.extend_from_slice(&seal(block));
        archive.extend_from_slice(&ext);
        payload(&mut archive, &[7u8; 1024]);
        archive.extend_from_slice(&[0u8; 1024]);

        let steps = run(archive, 1024).unwrap();
        let entries = entries(&steps);
        let entry = entries[0];
        assert_eq!(entry.kind, HeaderKind::Gnu89);
        assert_eq!(entry.data_offset, 1024);
        assert_eq!(entry.size, 1024);

        let chunks = entry.sparse.as_ref().unwrap();
        assert_eq!(chunks.virtual_size(), 10_000);
        assert_eq!(chunks.chunks().len(), 5);
        assert_eq!(chunks.chunks()[4].logical_offset, 5000);
        assert_eq!(chunks.chunks()[4].source_offset, 1024 + 400);
        assert!(matches!(steps.last(), Some(Step::Terminated)));
    }

    #[test]
    fn zero_block_rules() {
        let mut archive = vec![0u8; 512];
        archive.extend_from_slice(&seal(header(b"f", b'0', 0)));
        assert!(matches!(
            run(archive, 4096),
            Err(ParseError::Format(FormatError::BrokenTerminator { offset: 512 }))
        ));

        let mut archive = vec![0u8; 1536];
        archive.extend_from_slice(&seal(header(b"f", b'0', 0)));
        let mut window = WindowBuffer::new(archive, 4096);
        window.fill().unwrap();
        let mut parser = EntryParser::new();
        for _ in 0..3 {
            let (_, next) = parser.parse(&window).unwrap();
            window.advance_to(next);
        }
        assert!(parser.is_terminated());
        assert!(matches!(
            parser.parse(&window),
            Err(ParseError::Format(FormatError::TrailingData { offset: 1536 }))
        ));
    }

    #[test]
    fn need_more_bytes_keeps_state() {
        let mut archive = vec![];
        archive.extend_from_slice(&seal(header(b"././@LongLink", b'L', 600)));
        payload(&mut archive, &vec![b'x'; 600]);

        let mut window = WindowBuffer::new(archive.clone(), 2048);
        window.fill().unwrap();
        let mut partial = WindowBuffer::new(&archive[..1000], 2048);
        partial.fill().unwrap();

        let mut parser = EntryParser::new();
        assert!(matches!(
            parser.parse(&partial),
            Err(ParseError::NeedMoreBytes { .. })
        ));
        assert!(parser.pending.long_name.is_none());

        let (step, next) = parser.parse(&window).unwrap();
        assert!(matches!(step, Step::Metadata));
        assert_eq!(next, 1536);
        assert_eq!(parser.pending.long_name.as_ref().map(|n| n.len()), Some(600));
    }

    #[test]
    fn skipped_types() {
        let mut archive = vec![];
        archive.extend_from_slice(&seal(header(b"fifo", b'6', 0)));
        archive.extend_from_slice(&seal(header(b"label", b'V', 0)));
        archive.extend_from_slice(&seal(header(b"f", b'0', 0)));
        archive.extend_from_slice(&[0u8; 1024]);

        let steps = run(archive, 4096).unwrap();
        assert!(matches!(
            steps[0],
            Step::Skipped {
                type_flag: TypeFlag::Fifo,
                ..
            }
        ));
        assert!(matches!(
            steps[1],
            Step::Skipped {
                type_flag: TypeFlag::GnuVolumeLabel,
                ..
            }
        ));
        assert_eq!(entries(&steps).len(), 1);
    }

    #[test]
    fn bad_checksum_is_reported() {
        let mut block = seal(header(b"f", b'0', 0));
        block[0] = b'g';
        let mut archive = block.to_vec();
        archive.extend_from_slice(&[0u8; 1024]);

        let steps = run(archive, 4096).unwrap();
        assert_eq!(entries(&steps)[0].diagnostics.len(), 1);
    }
}
