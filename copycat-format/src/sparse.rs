//! Sparse file maps.
//!
//! A sparse entry stores only the non-hole parts of a file, back to back,
//! and describes where each part lives in the logical file with a list of
//! `(offset, size)` spans. [`SparseReconstructor`] turns those spans into a
//! [`ChunkList`] that also knows where each part starts in the archive.

/// One physically stored span of a logical file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Chunk {
    /// Offset of the span within the logical file.
    pub logical_offset: u64,
    /// Offset of the span within the byte source.
    pub source_offset: u64,
    pub size: u64,
}

impl Chunk {
    #[inline(always)]
    pub fn logical_end(&self) -> u64 {
        self.logical_offset + self.size
    }
}

/// Ordered, non-overlapping chunks plus the size of the logical file they
/// belong to. Ranges not covered by a chunk read as zeros.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkList {
    chunks: Vec<Chunk>,
    virtual_size: u64,
}

impl ChunkList {
    /// Build a chunk list from chunks already in logical order. Empty chunks
    /// are dropped.
    pub fn new(mut chunks: Vec<Chunk>, virtual_size: u64) -> Result<ChunkList, SparseError> {
        chunks.retain(|c| c.size > 0);

        let mut end = 0;
        for chunk in &chunks {
            if chunk.logical_offset < end {
                return Err(SparseError::Unordered {
                    offset: chunk.logical_offset,
                    previous_end: end,
                });
            }
            end = chunk.logical_end();
        }

        if end > virtual_size {
            return Err(SparseError::BeyondRealSize {
                end,
                real_size: virtual_size,
            });
        }

        Ok(ChunkList {
            chunks,
            virtual_size,
        })
    }

    /// A list describing one contiguous run of `size` bytes at `source_offset`.
    pub fn contiguous(source_offset: u64, size: u64) -> ChunkList {
        let chunks = if size == 0 {
            vec![]
        } else {
            vec![Chunk {
                logical_offset: 0,
                source_offset,
                size,
            }]
        };

        ChunkList {
            chunks,
            virtual_size: size,
        }
    }

    #[inline(always)]
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    #[inline(always)]
    pub fn virtual_size(&self) -> u64 {
        self.virtual_size
    }

    /// Number of bytes actually stored in the source.
    pub fn stored_size(&self) -> u64 {
        self.chunks.iter().map(|c| c.size).sum()
    }

    /// Index of the last chunk starting at or before `offset`.
    pub(crate) fn find_chunk_index(&self, offset: u64) -> Option<usize> {
        match self
            .chunks
            .binary_search_by(|c| c.logical_offset.cmp(&offset))
        {
            Ok(idx) => Some(idx),
            Err(0) => None,
            Err(idx) => Some(idx - 1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SparseError {
    #[error("sparse span at {offset} starts before the previous span ends at {previous_end}")]
    Unordered { offset: u64, previous_end: u64 },

    #[error("sparse spans end at {end}, past the real size {real_size}")]
    BeyondRealSize { end: u64, real_size: u64 },

    #[error("sparse spans hold {spans} bytes but only {stored} are stored")]
    StoredSizeMismatch { spans: u64, stored: u64 },

    #[error("negative sparse field ({0})")]
    Negative(i64),

    #[error("sparse spans run past the largest representable offset")]
    Overflow,
}

/// Collects the spans of one sparse entry, across the header and any number of
/// continuation blocks, then lays them out over the stored payload.
#[derive(Debug, Clone, Default)]
pub struct SparseReconstructor {
    spans: Vec<(u64, u64)>,
    real_size: u64,
}

impl SparseReconstructor {
    /// `real_size` is the declared size of the logical file; zero means "not
    /// recorded" and is replaced by the end of the last span.
    pub fn new(real_size: i64) -> Result<SparseReconstructor, SparseError> {
        if real_size < 0 {
            return Err(SparseError::Negative(real_size));
        }

        Ok(SparseReconstructor {
            spans: vec![],
            real_size: real_size as u64,
        })
    }

    /// Record one span. Zero-size spans are dropped.
    pub fn push(&mut self, offset: i64, size: i64) -> Result<(), SparseError> {
        if offset < 0 {
            return Err(SparseError::Negative(offset));
        }
        if size < 0 {
            return Err(SparseError::Negative(size));
        }
        if size == 0 {
            return Ok(());
        }

        let offset = offset as u64;
        if let Some(&(prev_offset, prev_size)) = self.spans.last() {
            let previous_end = prev_offset + prev_size;
            if offset < previous_end {
                return Err(SparseError::Unordered {
                    offset,
                    previous_end,
                });
            }
        }

        self.spans.push((offset, size as u64));
        Ok(())
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.spans.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// Assign source offsets back to back from `payload_start`.
    ///
    /// The spans may not hold more bytes than the `stored_size` bytes that
    /// follow the header.
    pub fn finish(self, payload_start: u64, stored_size: u64) -> Result<ChunkList, SparseError> {
        let spans = self
            .spans
            .iter()
            .try_fold(0u64, |acc, (_, size)| acc.checked_add(*size))
            .ok_or(SparseError::Overflow)?;
        payload_start
            .checked_add(spans)
            .ok_or(SparseError::Overflow)?;
        if spans > stored_size {
            return Err(SparseError::StoredSizeMismatch {
                spans,
                stored: stored_size,
            });
        }

        let end = self
            .spans
            .last()
            .map(|(offset, size)| offset + size)
            .unwrap_or(0);

        let virtual_size = if self.real_size == 0 {
            end
        } else {
            self.real_size
        };

        let mut source_offset = payload_start;
        let chunks = self
            .spans
            .into_iter()
            .map(|(logical_offset, size)| {
                let chunk = Chunk {
                    logical_offset,
                    source_offset,
                    size,
                };
                // Bounded by `payload_start + spans`, checked above.
                source_offset += size;
                chunk
            })
            .collect();

        ChunkList::new(chunks, virtual_size)
    }
}
