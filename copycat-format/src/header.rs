//! Tar header dialects.
//!
//! Every tar dialect shares the first 156 bytes of the 512-byte header block
//! (name, mode, uid, gid, size, mtime, checksum) plus the link type and link
//! name up to byte 257. Beyond that the layouts diverge. Blocks are never
//! reinterpreted as structs: fields are read through the offset constants in
//! [`layout`] and collected into an owned [`ParsedHeader`] once the dialect is
//! known.

use std::fmt;
use std::ops::Range;

use crate::field;

/// Size of a single tar block.
pub const BLOCK_SIZE: usize = 512;

/// A single tar block.
pub type Block = [u8; BLOCK_SIZE];

/// Byte offsets of the header fields, per dialect.
pub mod layout {
    use std::ops::Range;

    pub const NAME: Range<usize> = 0..100;
    pub const MODE: Range<usize> = 100..108;
    pub const UID: Range<usize> = 108..116;
    pub const GID: Range<usize> = 116..124;
    pub const SIZE: Range<usize> = 124..136;
    pub const MTIME: Range<usize> = 136..148;
    pub const CHECKSUM: Range<usize> = 148..156;
    pub const TYPE_FLAG: usize = 156;
    pub const LINK_NAME: Range<usize> = 157..257;

    // POSIX.1-1988 (ustar)
    pub const MAGIC: Range<usize> = 257..263;
    pub const VERSION: Range<usize> = 263..265;
    pub const UNAME: Range<usize> = 265..297;
    pub const GNAME: Range<usize> = 297..329;
    pub const DEV_MAJOR: Range<usize> = 329..337;
    pub const DEV_MINOR: Range<usize> = 337..345;
    pub const POSIX_PREFIX: Range<usize> = 345..500;

    // GNU tar before POSIX compliance: magic and version share one field.
    pub const GNU_MAGIC: Range<usize> = 257..265;
    pub const GNU_SPARSE: usize = 386;
    pub const GNU_IS_EXTENDED: usize = 482;
    pub const GNU_REAL_SIZE: Range<usize> = 483..495;

    // SunOS multi-volume extension.
    pub const SUN_EXTNO: Range<usize> = 345..349;
    pub const SUN_EXTOTAL: Range<usize> = 349..353;
    pub const SUN_EFSIZE: Range<usize> = 353..365;

    // Jörg Schilling's star.
    pub const STAR_PREFIX: Range<usize> = 345..476;
    /// Sparse star headers reuse most of the prefix for the span table.
    pub const STAR_SPARSE_PREFIX: Range<usize> = 345..346;
    pub const STAR_IS_EXTENDED: usize = 355;
    pub const STAR_SPARSE: usize = 356;
    pub const STAR_REAL_SIZE: Range<usize> = 452..464;
    pub const STAR_XMAGIC: Range<usize> = 508..512;

    // Sparse continuation block: 21 spans followed by the extension flag.
    pub const EXT_SPARSE_COUNT: usize = 21;
    pub const EXT_IS_EXTENDED: usize = 504;

    /// Each sparse span is an offset field followed by a size field.
    pub const SPARSE_FIELD_LEN: usize = 12;
    pub const SPARSE_SPAN_LEN: usize = 2 * SPARSE_FIELD_LEN;
    pub const HEADER_SPARSE_COUNT: usize = 4;
}

pub const POSIX_MAGIC: &[u8; 6] = b"ustar\0";
pub const POSIX_VERSION: &[u8; 2] = b"00";
pub const GNU_MAGIC: &[u8; 8] = b"ustar  \0";
pub const STAR_XMAGIC: &[u8; 4] = b"tar\0";
pub const CPIO_MAGICS: [&[u8; 6]; 3] = [b"070707", b"070701", b"070702"];

/// The header dialect of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeaderKind {
    ZeroBlock,
    V7,
    Posix,
    Sun,
    Star85,
    Star94,
    Gnu89,
    SparseContinuation,
    Cpio,
    Undefined,
}

impl HeaderKind {
    /// Classify one block by its magic and version fields.
    ///
    /// [`HeaderKind::SparseContinuation`] is never returned here; only the
    /// entry parser knows when a block continues a sparse map.
    pub fn classify(block: &Block) -> HeaderKind {
        if CPIO_MAGICS.iter().any(|m| block.starts_with(&m[..])) {
            return HeaderKind::Cpio;
        }

        if &block[layout::MAGIC] == POSIX_MAGIC {
            let posix_version = &block[layout::VERSION] == POSIX_VERSION;

            if &block[layout::STAR_XMAGIC] == STAR_XMAGIC {
                return if posix_version {
                    HeaderKind::Star94
                } else {
                    HeaderKind::Star85
                };
            }

            if has_sun_extension(block) {
                return HeaderKind::Sun;
            }

            return HeaderKind::Posix;
        }

        if &block[layout::GNU_MAGIC] == GNU_MAGIC {
            return HeaderKind::Gnu89;
        }

        if block.iter().all(|b| *b == 0) {
            return HeaderKind::ZeroBlock;
        }

        let printable = block[0].is_ascii_graphic() || block[0] == b' ';
        let v7_type = matches!(block[layout::TYPE_FLAG], b'\0' | b'0' | b'1' | b'2');
        if printable && v7_type {
            return HeaderKind::V7;
        }

        HeaderKind::Undefined
    }

    /// Whether the block is any kind of tar header.
    pub fn is_tar(self) -> bool {
        !matches!(
            self,
            HeaderKind::ZeroBlock
                | HeaderKind::SparseContinuation
                | HeaderKind::Cpio
                | HeaderKind::Undefined
        )
    }

    /// The sparse layout a dialect uses for `'S'` entries, if it has one.
    pub(crate) fn sparse_layout(self) -> Option<SparseLayout> {
        match self {
            HeaderKind::Gnu89 => Some(SparseLayout::GNU),
            HeaderKind::Star85 | HeaderKind::Star94 => Some(SparseLayout::STAR),
            _ => None,
        }
    }
}

impl fmt::Display for HeaderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use HeaderKind::*;

        let s = match self {
            ZeroBlock => "zero block",
            V7 => "V7",
            Posix => "POSIX",
            Sun => "SunOS",
            Star85 => "star (1985)",
            Star94 => "star (1994)",
            Gnu89 => "GNU (1989)",
            SparseContinuation => "sparse continuation",
            Cpio => "cpio",
            Undefined => "undefined",
        };

        write!(f, "{}", s)
    }
}

fn has_sun_extension(block: &Block) -> bool {
    [layout::SUN_EXTNO, layout::SUN_EXTOTAL, layout::SUN_EFSIZE]
        .iter()
        .all(|r| matches!(field::decode(&block[r.clone()]), Ok(v) if v > 0))
}

/// Where a dialect keeps its in-header sparse spans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SparseLayout {
    pub(crate) spans: usize,
    pub(crate) is_extended: usize,
    pub(crate) real_size: Range<usize>,
}

impl SparseLayout {
    pub(crate) const GNU: SparseLayout = SparseLayout {
        spans: layout::GNU_SPARSE,
        is_extended: layout::GNU_IS_EXTENDED,
        real_size: layout::GNU_REAL_SIZE,
    };

    pub(crate) const STAR: SparseLayout = SparseLayout {
        spans: layout::STAR_SPARSE,
        is_extended: layout::STAR_IS_EXTENDED,
        real_size: layout::STAR_REAL_SIZE,
    };
}

/// The link type byte of a header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeFlag {
    Regular,
    HardLink,
    Symlink,
    CharDevice,
    BlockDevice,
    Directory,
    Fifo,
    Contiguous,
    GnuLongName,
    GnuLongLink,
    GnuSparse,
    GnuDumpDir,
    GnuMultiVolume,
    GnuVolumeLabel,
    PaxExtended,
    PaxGlobal,
    SolarisAcl,
    SolarisExtended,
    Other(u8),
}

impl From<u8> for TypeFlag {
    fn from(value: u8) -> Self {
        match value {
            b'\0' | b'0' => TypeFlag::Regular,
            b'1' => TypeFlag::HardLink,
            b'2' => TypeFlag::Symlink,
            b'3' => TypeFlag::CharDevice,
            b'4' => TypeFlag::BlockDevice,
            b'5' => TypeFlag::Directory,
            b'6' => TypeFlag::Fifo,
            b'7' => TypeFlag::Contiguous,
            b'L' => TypeFlag::GnuLongName,
            b'K' => TypeFlag::GnuLongLink,
            b'S' => TypeFlag::GnuSparse,
            b'D' => TypeFlag::GnuDumpDir,
            b'M' => TypeFlag::GnuMultiVolume,
            b'V' => TypeFlag::GnuVolumeLabel,
            b'x' => TypeFlag::PaxExtended,
            b'g' => TypeFlag::PaxGlobal,
            b'A' => TypeFlag::SolarisAcl,
            b'X' => TypeFlag::SolarisExtended,
            v => TypeFlag::Other(v),
        }
    }
}

/// Canonical, owned view of one tar header after classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedHeader {
    pub kind: HeaderKind,
    pub type_flag: TypeFlag,
    /// Entry name, already joined with the dialect's prefix field.
    pub name: Vec<u8>,
    pub link_name: Vec<u8>,
    pub mode: u32,
    pub uid: u64,
    pub gid: u64,
    /// Stored size: the number of payload bytes following the header.
    pub size: i64,
    pub mtime: i64,
    /// Whether the stored checksum matches the block.
    pub checksum_ok: bool,
}

impl ParsedHeader {
    /// Build the canonical header of a block already classified as `kind`.
    pub fn parse(block: &Block, kind: HeaderKind) -> ParsedHeader {
        let type_byte = block[layout::TYPE_FLAG];
        let prefix_range = match kind {
            HeaderKind::Posix => Some(layout::POSIX_PREFIX),
            HeaderKind::Star85 | HeaderKind::Star94 if type_byte == b'S' => {
                Some(layout::STAR_SPARSE_PREFIX)
            }
            HeaderKind::Star85 | HeaderKind::Star94 => Some(layout::STAR_PREFIX),
            _ => None,
        };
        let name = match prefix_range {
            Some(range) => join_prefix(c_str(&block[range]), c_str(&block[layout::NAME])),
            None => c_str(&block[layout::NAME]).to_vec(),
        };

        ParsedHeader {
            kind,
            type_flag: TypeFlag::from(type_byte),
            name,
            link_name: c_str(&block[layout::LINK_NAME]).to_vec(),
            mode: field::decode_or_zero(&block[layout::MODE], "mode") as u32,
            uid: field::decode_or_zero(&block[layout::UID], "uid") as u64,
            gid: field::decode_or_zero(&block[layout::GID], "gid") as u64,
            size: field::decode_or_zero(&block[layout::SIZE], "size"),
            mtime: field::decode_or_zero(&block[layout::MTIME], "mtime"),
            checksum_ok: verify_checksum(block),
        }
    }
}

/// The bytes of a NUL-terminated field, without the terminator.
pub fn c_str(field: &[u8]) -> &[u8] {
    match field.iter().position(|b| *b == 0) {
        Some(end) => &field[..end],
        None => field,
    }
}

fn join_prefix(prefix: &[u8], name: &[u8]) -> Vec<u8> {
    if prefix.is_empty() {
        return name.to_vec();
    }

    let mut out = Vec::with_capacity(prefix.len() + 1 + name.len());
    out.extend_from_slice(prefix);
    out.push(b'/');
    out.extend_from_slice(name);
    out
}

/// Verify the header checksum.
///
/// The checksum is the sum of all header bytes with the checksum field itself
/// counted as spaces. Some historic implementations summed signed bytes, so
/// either sum is accepted.
pub fn verify_checksum(block: &Block) -> bool {
    let stored = match field::decode(&block[layout::CHECKSUM]) {
        Ok(v) => v,
        Err(_) => return false,
    };

    let mut unsigned: i64 = 0;
    let mut signed: i64 = 0;
    for (i, byte) in block.iter().enumerate() {
        let byte = if layout::CHECKSUM.contains(&i) {
            b' '
        } else {
            *byte
        };
        unsigned += byte as i64;
        signed += byte as i8 as i64;
    }

    stored == unsigned || stored == signed
}

/// Compute the (unsigned) header checksum of a block.
pub fn compute_checksum(block: &Block) -> u32 {
    block
        .iter()
        .enumerate()
        .map(|(i, b)| {
            if layout::CHECKSUM.contains(&i) {
                b' ' as u32
            } else {
                *b as u32
            }
        })
        .sum()
}
