//! An in-memory tar writer for building test archives.

#![allow(dead_code)]

use std::ops::Range;

use copycat_format::header::{
    compute_checksum, layout, Block, BLOCK_SIZE, GNU_MAGIC, POSIX_MAGIC, POSIX_VERSION,
    STAR_XMAGIC,
};

pub const MTIME: i64 = 1_600_000_000;

fn octal(field: &mut [u8], value: u64) {
    let width = field.len() - 1;
    let text = format!("{:0width$o}\0", value, width = width);
    field.copy_from_slice(text.as_bytes());
}

/// One `<len> <key>=<value>\n` record. The length prefix counts its own digits.
fn pax_record(key: &str, value: &str) -> String {
    let body = format!("{}={}\n", key, value);
    let mut len = body.len() + 2;
    loop {
        let next = len.to_string().len() + 1 + body.len();
        if next == len {
            break;
        }
        len = next;
    }
    format!("{} {}", len, body)
}

#[derive(Debug, Default)]
pub struct TarBuilder {
    data: Vec<u8>,
    gnu: bool,
}

impl TarBuilder {
    pub fn new() -> TarBuilder {
        TarBuilder::default()
    }

    /// Write old-style GNU headers instead of POSIX ones.
    pub fn gnu() -> TarBuilder {
        TarBuilder {
            data: vec![],
            gnu: true,
        }
    }

    pub fn header(&self, name: &[u8], type_flag: u8, size: u64) -> Block {
        let mut block = [0u8; BLOCK_SIZE];
        let len = name.len().min(layout::NAME.end);
        block[..len].copy_from_slice(&name[..len]);
        octal(&mut block[layout::MODE], 0o644);
        octal(&mut block[layout::UID], 1000);
        octal(&mut block[layout::GID], 1000);
        octal(&mut block[layout::SIZE], size);
        octal(&mut block[layout::MTIME], MTIME as u64);
        block[layout::TYPE_FLAG] = type_flag;

        if self.gnu {
            block[layout::GNU_MAGIC].copy_from_slice(GNU_MAGIC);
        } else {
            block[layout::MAGIC].copy_from_slice(POSIX_MAGIC);
            block[layout::VERSION].copy_from_slice(POSIX_VERSION);
        }
        block
    }

    pub fn seal(mut block: Block) -> Block {
        let sum = compute_checksum(&block);
        block[layout::CHECKSUM].copy_from_slice(format!("{:06o}\0 ", sum).as_bytes());
        block
    }

    pub fn push_block(&mut self, block: Block) -> &mut Self {
        self.data.extend_from_slice(&block);
        self
    }

    pub fn push_payload(&mut self, payload: &[u8]) -> &mut Self {
        self.data.extend_from_slice(payload);
        let rem = payload.len() % BLOCK_SIZE;
        if rem != 0 {
            self.data
                .extend(std::iter::repeat(0u8).take(BLOCK_SIZE - rem));
        }
        self
    }

    pub fn entry(&mut self, name: &[u8], type_flag: u8, payload: &[u8]) -> &mut Self {
        let block = Self::seal(self.header(name, type_flag, payload.len() as u64));
        self.push_block(block).push_payload(payload)
    }

    pub fn file(&mut self, name: &str, payload: &[u8]) -> &mut Self {
        self.entry(name.as_bytes(), b'0', payload)
    }

    pub fn dir(&mut self, name: &str) -> &mut Self {
        self.entry(name.as_bytes(), b'5', &[])
    }

    fn link(&mut self, name: &str, type_flag: u8, target: &str) -> &mut Self {
        let mut block = self.header(name.as_bytes(), type_flag, 0);
        block[layout::LINK_NAME.start..layout::LINK_NAME.start + target.len()]
            .copy_from_slice(target.as_bytes());
        let block = Self::seal(block);
        self.push_block(block)
    }

    pub fn symlink(&mut self, name: &str, target: &str) -> &mut Self {
        self.link(name, b'2', target)
    }

    pub fn hardlink(&mut self, name: &str, target: &str) -> &mut Self {
        self.link(name, b'1', target)
    }

    /// A GNU long-name entry followed by the file it names.
    pub fn long_file(&mut self, name: &str, payload: &[u8]) -> &mut Self {
        let mut text = name.as_bytes().to_vec();
        text.push(0);
        self.entry(b"././@LongLink", b'L', &text);
        self.file(name, payload)
    }

    /// A GNU long-link entry followed by a symlink carrying it.
    pub fn long_symlink(&mut self, name: &str, target: &str) -> &mut Self {
        let mut text = target.as_bytes().to_vec();
        text.push(0);
        self.entry(b"././@LongLink", b'K', &text);
        self.symlink(name, &target[..target.len().min(100)])
    }

    /// A PAX extended header setting `path`, followed by the file.
    pub fn pax_file(&mut self, header_name: &str, path: &str, payload: &[u8]) -> &mut Self {
        let record = pax_record("path", path);
        self.entry(b"PaxHeader", b'x', record.as_bytes());
        self.file(header_name, payload)
    }

    /// A GNU sparse file. `spans` are `(offset, size)` pairs in the logical
    /// file; `stored` holds the bytes of all spans back to back.
    pub fn sparse(&mut self, name: &str, real_size: u64, spans: &[(u64, u64)], stored: &[u8]) -> &mut Self {
        let mut block = self.header(name.as_bytes(), b'S', stored.len() as u64);
        block[layout::MAGIC.start..layout::GNU_MAGIC.end].copy_from_slice(GNU_MAGIC);
        self.sparse_entry(
            block,
            (layout::GNU_SPARSE, layout::GNU_IS_EXTENDED, layout::GNU_REAL_SIZE),
            real_size,
            spans,
            stored,
        )
    }

    /// A star sparse file, laid out like [`sparse`](TarBuilder::sparse).
    pub fn star_sparse(&mut self, name: &str, real_size: u64, spans: &[(u64, u64)], stored: &[u8]) -> &mut Self {
        let mut block = self.header(name.as_bytes(), b'S', stored.len() as u64);
        block[layout::GNU_MAGIC].iter_mut().for_each(|b| *b = 0);
        block[layout::MAGIC].copy_from_slice(POSIX_MAGIC);
        block[layout::VERSION].copy_from_slice(POSIX_VERSION);
        block[layout::STAR_XMAGIC].copy_from_slice(STAR_XMAGIC);
        self.sparse_entry(
            block,
            (layout::STAR_SPARSE, layout::STAR_IS_EXTENDED, layout::STAR_REAL_SIZE),
            real_size,
            spans,
            stored,
        )
    }

    fn sparse_entry(
        &mut self,
        mut block: Block,
        (at_spans, at_extended, at_real_size): (usize, usize, Range<usize>),
        real_size: u64,
        spans: &[(u64, u64)],
        stored: &[u8],
    ) -> &mut Self {
        let (head, rest) = spans.split_at(spans.len().min(layout::HEADER_SPARSE_COUNT));
        for (i, (offset, size)) in head.iter().enumerate() {
            let at = at_spans + i * layout::SPARSE_SPAN_LEN;
            octal(&mut block[at..at + layout::SPARSE_FIELD_LEN], *offset);
            octal(
                &mut block[at + layout::SPARSE_FIELD_LEN..at + layout::SPARSE_SPAN_LEN],
                *size,
            );
        }
        octal(&mut block[at_real_size], real_size);
        if !rest.is_empty() {
            block[at_extended] = 1;
        }
        let block = Self::seal(block);
        self.push_block(block);

        let chunks: Vec<_> = rest.chunks(layout::EXT_SPARSE_COUNT).collect();
        for (n, chunk) in chunks.iter().enumerate() {
            let mut ext = [0u8; BLOCK_SIZE];
            for (i, (offset, size)) in chunk.iter().enumerate() {
                let at = i * layout::SPARSE_SPAN_LEN;
                octal(&mut ext[at..at + layout::SPARSE_FIELD_LEN], *offset);
                octal(
                    &mut ext[at + layout::SPARSE_FIELD_LEN..at + layout::SPARSE_SPAN_LEN],
                    *size,
                );
            }
            if n + 1 < chunks.len() {
                ext[layout::EXT_IS_EXTENDED] = 1;
            }
            self.push_block(ext);
        }

        self.push_payload(stored)
    }

    /// A PAX extended header with a raw `size` record, followed by a file
    /// whose own header claims no payload.
    pub fn pax_sized_file(&mut self, name: &str, size: &str) -> &mut Self {
        let record = pax_record("size", size);
        self.entry(b"PaxHeader", b'x', record.as_bytes());
        self.file(name, &[])
    }

    /// Append the end-of-archive blocks and return the archive.
    pub fn finish(&mut self) -> Vec<u8> {
        self.data.extend_from_slice(&[0u8; 2 * BLOCK_SIZE]);
        std::mem::take(&mut self.data)
    }

    /// Return the archive without end-of-archive blocks.
    pub fn truncated(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.data)
    }
}
