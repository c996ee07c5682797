//! The sliding read window over an archive.

use std::io;
use std::sync::Arc;

use crate::header::BLOCK_SIZE;

/// A random-access source of archive bytes.
///
/// Reads are positional, so a source can be shared between the window and the
/// per-file views handed to collaborators without any of them disturbing the
/// others. Callers of the cataloger only ever request increasing offsets from
/// the window; random access is for the per-file views.
pub trait ByteSource {
    /// Read up to `buf.len()` bytes starting at `offset`. Returns 0 at the end
    /// of the source.
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize>;
}

impl ByteSource for [u8] {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        if offset >= self.len() as u64 {
            return Ok(0);
        }
        let start = offset as usize;
        let n = buf.len().min(self.len() - start);
        buf[..n].copy_from_slice(&self[start..start + n]);
        Ok(n)
    }
}

impl ByteSource for Vec<u8> {
    #[inline(always)]
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        self.as_slice().read_at(offset, buf)
    }
}

impl ByteSource for memmap2::Mmap {
    #[inline(always)]
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        (**self).read_at(offset, buf)
    }
}

impl ByteSource for std::fs::File {
    #[cfg(unix)]
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        std::os::unix::fs::FileExt::read_at(self, buf, offset)
    }

    #[cfg(windows)]
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        std::os::windows::fs::FileExt::seek_read(self, buf, offset)
    }
}

impl<T: ByteSource + ?Sized> ByteSource for &T {
    #[inline(always)]
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        (**self).read_at(offset, buf)
    }
}

impl<T: ByteSource + ?Sized> ByteSource for Arc<T> {
    #[inline(always)]
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        (**self).read_at(offset, buf)
    }
}

/// Read until `buf` is full or the source is exhausted.
pub fn read_full_at<S: ByteSource + ?Sized>(
    source: &S,
    mut offset: u64,
    mut buf: &mut [u8],
) -> io::Result<usize> {
    let mut total = 0;
    while !buf.is_empty() {
        match source.read_at(offset, buf) {
            Ok(0) => break,
            Ok(n) => {
                total += n;
                offset += n as u64;
                buf = &mut buf[n..];
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(total)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum WindowError {
    /// The range is not loaded yet; shift the window and retry.
    #[error("{len} bytes at offset {offset} are not in the window")]
    NeedMoreBytes { offset: u64, len: u64 },

    /// The range can never fit, however the window is shifted.
    #[error("{len} bytes do not fit a window of {capacity} bytes")]
    Overflow { len: u64, capacity: usize },

    /// The range starts before the window; those bytes were discarded.
    #[error("offset {offset} was already discarded from the window")]
    Discarded { offset: u64 },
}

/// A fixed-capacity window holding archive bytes `[position, position_limit)`.
///
/// The parser reports where it wants to resume through
/// [`advance_to`](WindowBuffer::advance_to); [`fill`](WindowBuffer::fill) then
/// moves the window forward, keeping any bytes at or after that point.
#[derive(Debug)]
pub struct WindowBuffer<S> {
    source: S,
    buf: Box<[u8]>,
    position: u64,
    position_limit: u64,
    position_new: u64,
}

impl<S: ByteSource> WindowBuffer<S> {
    /// Create an empty window. `capacity` is rounded up to whole blocks, with
    /// a minimum of two blocks.
    pub fn new(source: S, capacity: usize) -> WindowBuffer<S> {
        let blocks = (capacity.saturating_add(BLOCK_SIZE - 1) / BLOCK_SIZE).max(2);
        WindowBuffer {
            source,
            buf: vec![0u8; blocks * BLOCK_SIZE].into_boxed_slice(),
            position: 0,
            position_limit: 0,
            position_new: 0,
        }
    }

    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Archive offset of the first byte in the window.
    #[inline(always)]
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Archive offset one past the last valid byte in the window.
    #[inline(always)]
    pub fn position_limit(&self) -> u64 {
        self.position_limit
    }

    /// Archive offset the parser resumes from.
    #[inline(always)]
    pub fn position_new(&self) -> u64 {
        self.position_new
    }

    #[inline(always)]
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Mark everything before `offset` as consumed. Offsets only move forward.
    pub fn advance_to(&mut self, offset: u64) {
        debug_assert!(offset >= self.position_new, "window moved backwards");
        self.position_new = self.position_new.max(offset);
    }

    /// Shift the window to start at `position_new` and top it up from the
    /// source. Returns the number of bytes read; 0 means the source is
    /// exhausted at `position_limit`.
    pub fn fill(&mut self) -> std::io::Result<usize> {
        let keep = if self.position_new >= self.position_limit {
            self.position_limit = self.position_new;
            0
        } else {
            let start = (self.position_new - self.position) as usize;
            let end = (self.position_limit - self.position) as usize;
            self.buf.copy_within(start..end, 0);
            end - start
        };
        self.position = self.position_new;

        let read = read_full_at(&self.source, self.position_limit, &mut self.buf[keep..])?;
        self.position_limit += read as u64;

        tracing::trace!(
            position = self.position,
            position_limit = self.position_limit,
            kept = keep,
            read,
            "window filled"
        );

        Ok(read)
    }

    /// Borrow `len` bytes at archive offset `offset` from the window.
    pub fn bytes(&self, offset: u64, len: u64) -> Result<&[u8], WindowError> {
        if offset < self.position {
            return Err(WindowError::Discarded { offset });
        }

        let end = offset
            .checked_add(len)
            .ok_or(WindowError::Overflow {
                len,
                capacity: self.buf.len(),
            })?;

        // The window always starts at the resume point, so anything measured
        // from there that exceeds the capacity can never be loaded.
        let from_resume = end.saturating_sub(self.position_new);
        if from_resume > self.buf.len() as u64 {
            return Err(WindowError::Overflow {
                len: from_resume,
                capacity: self.buf.len(),
            });
        }

        if end > self.position_limit {
            return Err(WindowError::NeedMoreBytes { offset, len });
        }

        let start = (offset - self.position) as usize;
        Ok(&self.buf[start..start + len as usize])
    }

    /// Whether the window holds no bytes past the resume point.
    #[inline(always)]
    pub fn is_drained(&self) -> bool {
        self.position_new >= self.position_limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    #[test]
    fn capacity_rounds_to_blocks() {
        let w = WindowBuffer::new(Vec::new(), 1);
        assert_eq!(w.capacity(), 2 * BLOCK_SIZE);
        let w = WindowBuffer::new(Vec::new(), 3 * BLOCK_SIZE + 1);
        assert_eq!(w.capacity(), 4 * BLOCK_SIZE);
    }

    #[test]
    fn shift_keeps_straddling_bytes() {
        let data = numbered(5 * BLOCK_SIZE);
        let mut w = WindowBuffer::new(data.clone(), 2 * BLOCK_SIZE);

        assert_eq!(w.fill().unwrap(), 2 * BLOCK_SIZE);
        assert_eq!(w.position(), 0);
        assert_eq!(w.position_limit(), 2 * BLOCK_SIZE as u64);

        // A range straddling the end of the window.
        let offset = BLOCK_SIZE as u64 + 100;
        w.advance_to(offset);
        assert!(matches!(
            w.bytes(offset, BLOCK_SIZE as u64),
            Err(WindowError::NeedMoreBytes { .. })
        ));

        assert_eq!(w.fill().unwrap(), 2 * BLOCK_SIZE - (BLOCK_SIZE - 100));
        assert_eq!(w.position(), offset);
        let got = w.bytes(offset, BLOCK_SIZE as u64).unwrap();
        assert_eq!(got, &data[offset as usize..offset as usize + BLOCK_SIZE]);
    }

    #[test]
    fn skip_past_window_rereads() {
        let data = numbered(8 * BLOCK_SIZE);
        let mut w = WindowBuffer::new(data.clone(), 2 * BLOCK_SIZE);
        w.fill().unwrap();

        w.advance_to(5 * BLOCK_SIZE as u64);
        assert!(w.is_drained());
        w.fill().unwrap();
        assert_eq!(w.position(), 5 * BLOCK_SIZE as u64);
        let got = w.bytes(5 * BLOCK_SIZE as u64, 10).unwrap();
        assert_eq!(got, &data[5 * BLOCK_SIZE..5 * BLOCK_SIZE + 10]);
    }

    #[test]
    fn overflow_and_eof() {
        let data = numbered(3 * BLOCK_SIZE);
        let mut w = WindowBuffer::new(data, 2 * BLOCK_SIZE);
        w.fill().unwrap();

        assert!(matches!(
            w.bytes(0, 3 * BLOCK_SIZE as u64),
            Err(WindowError::Overflow { .. })
        ));

        w.advance_to(2 * BLOCK_SIZE as u64);
        assert_eq!(w.fill().unwrap(), BLOCK_SIZE);
        w.advance_to(3 * BLOCK_SIZE as u64);
        assert_eq!(w.fill().unwrap(), 0);
        assert_eq!(w.position(), w.position_limit());
    }

    #[test]
    fn ranges_past_u64_overflow() {
        let mut w = WindowBuffer::new(numbered(2 * BLOCK_SIZE), 2 * BLOCK_SIZE);
        w.fill().unwrap();
        assert!(matches!(
            w.bytes(BLOCK_SIZE as u64, u64::MAX),
            Err(WindowError::Overflow { len: u64::MAX, .. })
        ));
    }

    #[test]
    fn discarded_bytes_are_refused() {
        let mut w = WindowBuffer::new(numbered(4 * BLOCK_SIZE), 2 * BLOCK_SIZE);
        w.fill().unwrap();
        w.advance_to(BLOCK_SIZE as u64);
        w.fill().unwrap();
        assert_eq!(w.bytes(0, 1), Err(WindowError::Discarded { offset: 0 }));
    }
}
