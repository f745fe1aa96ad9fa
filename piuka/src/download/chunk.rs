//! Chunk planning for ranged downloads.
//!
//! A resource of `L` bytes is split into `c = max(1, L / F)` chunks of
//! `s = L / c` bytes, where `F` is the flush threshold. The final chunk absorbs
//! the remainder and always ends at `L - 1`.
//!
//! ```text
//! L = 1003, F = 250  ->  c = 4, s = 250
//!
//! [0 ......... 249][250 ....... 499][500 ....... 749][750 ......... 1002]
//!     chunk 0          chunk 1          chunk 2       chunk 3 (+3 bytes)
//! ```

use std::fmt;

/// Inclusive byte range `[start, end]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    /// Creates an inclusive range. `end` must not be less than `start`.
    pub fn new(start: u64, end: u64) -> Self {
        debug_assert!(end >= start, "inverted byte range {}-{}", start, end);
        Self { start, end }
    }

    /// Number of bytes covered by the range.
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Inclusive ranges always cover at least one byte.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Value for the `range` request header.
    pub fn header_value(&self) -> String {
        format!("bytes={}-{}", self.start, self.end)
    }
}

impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Split of a resource into contiguous ranged requests.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChunkPlan {
    total_length: u64,
    chunk_count: u64,
    chunk_size: u64,
}

impl ChunkPlan {
    /// Plans the chunks for a resource of `total_length` bytes.
    ///
    /// A zero `flush_threshold` is treated as one byte. A zero-length resource
    /// yields a plan with no chunks.
    pub fn new(total_length: u64, flush_threshold: u64) -> Self {
        if total_length == 0 {
            return Self {
                total_length: 0,
                chunk_count: 0,
                chunk_size: 0,
            };
        }

        let chunk_count = (total_length / flush_threshold.max(1)).max(1);
        Self {
            total_length,
            chunk_count,
            chunk_size: total_length / chunk_count,
        }
    }

    pub fn total_length(&self) -> u64 {
        self.total_length
    }

    pub fn chunk_count(&self) -> u64 {
        self.chunk_count
    }

    /// Size of every chunk except possibly the last.
    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }

    pub fn is_empty(&self) -> bool {
        self.chunk_count == 0
    }

    /// Returns the range of chunk `index`, or `None` past the end.
    pub fn range(&self, index: u64) -> Option<ByteRange> {
        if index >= self.chunk_count {
            return None;
        }
        let start = index * self.chunk_size;
        let end = if index + 1 == self.chunk_count {
            self.total_length - 1
        } else {
            start + self.chunk_size - 1
        };
        Some(ByteRange::new(start, end))
    }

    /// Iterates over chunk ranges in increasing offset order.
    pub fn iter(&self) -> impl Iterator<Item = ByteRange> + '_ {
        (0..self.chunk_count).filter_map(move |i| self.range(i))
    }
}
