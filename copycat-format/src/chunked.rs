//! Read views over the data of one archive entry.
//!
//! A plain entry is a contiguous run of the archive ([`ArchiveRange`]); a
//! sparse entry is a list of runs separated by holes ([`VirtualChunkFile`]).
//! Both are handed to collaborators as [`EntryData`], which reads, seeks, and
//! is itself a [`ByteSource`], so an archive stored inside an archive can be
//! scanned without copying it out.

use std::io::{self, Read, Seek, SeekFrom};

use crate::sparse::ChunkList;
use crate::window::{read_full_at, ByteSource};

fn seek_position(position: u64, len: u64, pos: SeekFrom) -> io::Result<u64> {
    let target = match pos {
        SeekFrom::Start(offset) => Some(offset),
        SeekFrom::End(delta) => checked_offset(len, delta),
        SeekFrom::Current(delta) => checked_offset(position, delta),
    };

    target.ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            "invalid seek to a negative or overflowing position",
        )
    })
}

fn checked_offset(base: u64, delta: i64) -> Option<u64> {
    if delta >= 0 {
        base.checked_add(delta as u64)
    } else {
        base.checked_sub(delta.unsigned_abs())
    }
}

fn short_read(offset: u64) -> io::Error {
    io::Error::new(
        io::ErrorKind::UnexpectedEof,
        format!("archive ended inside entry data at offset {}", offset),
    )
}

/// A bounded, contiguous window of a byte source.
#[derive(Clone, Copy)]
pub struct ArchiveRange<'a> {
    source: &'a dyn ByteSource,
    start: u64,
    len: u64,
    position: u64,
}

impl<'a> ArchiveRange<'a> {
    pub fn new(source: &'a dyn ByteSource, start: u64, len: u64) -> ArchiveRange<'a> {
        ArchiveRange {
            source,
            start,
            len,
            position: 0,
        }
    }

    /// Offset of the first byte within the underlying source.
    #[inline(always)]
    pub fn source_offset(&self) -> u64 {
        self.start
    }

    #[inline(always)]
    pub fn len(&self) -> u64 {
        self.len
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl std::fmt::Debug for ArchiveRange<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveRange")
            .field("start", &self.start)
            .field("len", &self.len)
            .field("position", &self.position)
            .finish_non_exhaustive()
    }
}

impl ByteSource for ArchiveRange<'_> {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        if offset >= self.len {
            return Ok(0);
        }

        let n = (buf.len() as u64).min(self.len - offset) as usize;
        let got = read_full_at(self.source, self.start + offset, &mut buf[..n])?;
        if got < n {
            return Err(short_read(self.start + offset + got as u64));
        }
        Ok(n)
    }
}

impl Read for ArchiveRange<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = ByteSource::read_at(self, self.position, buf)?;
        self.position += n as u64;
        Ok(n)
    }
}

impl Seek for ArchiveRange<'_> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.position = seek_position(self.position, self.len, pos)?;
        Ok(self.position)
    }
}

/// One logical file assembled from the chunks of a [`ChunkList`], with the
/// gaps between chunks reading as zeros.
#[derive(Clone)]
pub struct VirtualChunkFile<'a> {
    source: &'a dyn ByteSource,
    chunks: ChunkList,
    position: u64,
}

impl<'a> VirtualChunkFile<'a> {
    pub fn new(source: &'a dyn ByteSource, chunks: ChunkList) -> VirtualChunkFile<'a> {
        VirtualChunkFile {
            source,
            chunks,
            position: 0,
        }
    }

    #[inline(always)]
    pub fn chunks(&self) -> &ChunkList {
        &self.chunks
    }

    #[inline(always)]
    pub fn virtual_size(&self) -> u64 {
        self.chunks.virtual_size()
    }
}

impl std::fmt::Debug for VirtualChunkFile<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VirtualChunkFile")
            .field("chunks", &self.chunks)
            .field("position", &self.position)
            .finish_non_exhaustive()
    }
}

impl ByteSource for VirtualChunkFile<'_> {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        let virtual_size = self.chunks.virtual_size();
        if offset >= virtual_size {
            return Ok(0);
        }

        let len = (buf.len() as u64).min(virtual_size - offset) as usize;
        let chunks = self.chunks.chunks();
        let mut done = 0;

        while done < len {
            let current = offset + done as u64;
            let wanted = (len - done) as u64;
            let index = self.chunks.find_chunk_index(current);

            match index.map(|i| &chunks[i]) {
                Some(chunk) if chunk.logical_end() > current => {
                    let within = current - chunk.logical_offset;
                    let n = wanted.min(chunk.size - within) as usize;
                    let at = chunk.source_offset + within;
                    let got = read_full_at(self.source, at, &mut buf[done..done + n])?;
                    if got < n {
                        return Err(short_read(at + got as u64));
                    }
                    done += n;
                }
                _ => {
                    // A hole, up to the next chunk or the end of the file.
                    let next = chunks
                        .get(index.map_or(0, |i| i + 1))
                        .map(|c| c.logical_offset)
                        .unwrap_or(virtual_size);
                    let n = wanted.min(next - current) as usize;
                    if n == 0 {
                        break;
                    }
                    buf[done..done + n].iter_mut().for_each(|b| *b = 0);
                    done += n;
                }
            }
        }

        Ok(done)
    }
}

impl Read for VirtualChunkFile<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = ByteSource::read_at(self, self.position, buf)?;
        self.position += n as u64;
        Ok(n)
    }
}

impl Seek for VirtualChunkFile<'_> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.position = seek_position(self.position, self.virtual_size(), pos)?;
        Ok(self.position)
    }
}

/// The data of one discovered file, whichever way it is stored.
#[derive(Debug, Clone)]
pub enum EntryData<'a> {
    Contiguous(ArchiveRange<'a>),
    Chunked(VirtualChunkFile<'a>),
}

impl<'a> EntryData<'a> {
    /// Logical length of the file.
    pub fn len(&self) -> u64 {
        match self {
            EntryData::Contiguous(range) => range.len(),
            EntryData::Chunked(file) => file.virtual_size(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline(always)]
    pub fn as_contiguous(&self) -> Option<&ArchiveRange<'a>> {
        match self {
            EntryData::Contiguous(range) => Some(range),
            _ => None,
        }
    }

    #[inline(always)]
    pub fn as_chunked(&self) -> Option<&VirtualChunkFile<'a>> {
        match self {
            EntryData::Chunked(file) => Some(file),
            _ => None,
        }
    }
}

impl ByteSource for EntryData<'_> {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            EntryData::Contiguous(range) => range.read_at(offset, buf),
            EntryData::Chunked(file) => file.read_at(offset, buf),
        }
    }
}

impl Read for EntryData<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            EntryData::Contiguous(range) => range.read(buf),
            EntryData::Chunked(file) => file.read(buf),
        }
    }
}

impl Seek for EntryData<'_> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        match self {
            EntryData::Contiguous(range) => range.seek(pos),
            EntryData::Chunked(file) => file.seek(pos),
        }
    }
}
