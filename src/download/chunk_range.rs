use std::num::NonZeroU64;
use std::sync::Arc;

/// A planned chunk job: its position in the plan plus the byte span it covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkInfo {
    pub index: usize,
    pub range: ChunkRange,
}

/// Inclusive byte span `start..=end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkRange {
    pub start: u64,
    pub end: u64,
}

impl ChunkRange {
    pub fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    /// `len` must be non-zero.
    pub fn from_len(start: u64, len: u64) -> Self {
        Self { start, end: start + len - 1 }
    }

    /// `None` when the span would run past `u64::MAX`.
    pub fn checked_from_len(start: u64, len: u64) -> Option<Self> {
        let end = start.checked_add(len.checked_sub(1)?)?;
        Some(Self { start, end })
    }

    pub fn len(&self) -> u64 {
        (self.end - self.start) + 1
    }

    /// Value of the `Range` request header for this span.
    pub fn to_header_value(&self) -> String {
        format!("bytes={}-{}", self.start, self.end)
    }
}

/// Iterates the spans tiling `[0, total_len)`, each `chunk_size` long except possibly the last.
#[derive(Debug, Clone)]
pub struct ChunkPlan {
    chunk_size: u64,
    total_len: u64,
    next_offset: u64,
    iter_count: usize,
}

impl ChunkPlan {
    pub fn new(chunk_size: NonZeroU64, total_len: u64) -> Self {
        Self::starting_at(chunk_size, total_len, 0)
    }

    /// Plan that skips everything before `offset`. `offset` is expected to be a multiple of
    /// `chunk_size`, so the remaining spans line up with the full plan.
    pub fn starting_at(chunk_size: NonZeroU64, total_len: u64, offset: u64) -> Self {
        let chunk_size = chunk_size.get();
        let next_offset = offset.min(total_len);
        Self {
            chunk_size,
            total_len,
            next_offset,
            iter_count: (next_offset / chunk_size) as usize,
        }
    }

    /// Bytes not yet handed out.
    pub fn remaining_len(&self) -> u64 {
        self.total_len - self.next_offset
    }
}

impl Iterator for ChunkPlan {
    type Item = ChunkInfo;

    fn next(&mut self) -> Option<ChunkInfo> {
        let remaining = self.remaining_len();
        if remaining == 0 {
            return None;
        }

        let len = remaining.min(self.chunk_size);
        let info = ChunkInfo {
            index: self.iter_count,
            range: ChunkRange::from_len(self.next_offset, len),
        };
        self.next_offset += len;
        self.iter_count += 1;

        Some(info)
    }
}

/// Plans every chunk of a resource of `total_len` bytes, in ascending offset order.
pub fn plan_chunks(total_len: u64, chunk_size: NonZeroU64) -> Vec<ChunkInfo> {
    ChunkPlan::new(chunk_size, total_len).collect()
}

/// Job queue shared by the workers. Every chunk is handed to exactly one caller of `next`.
#[derive(Clone)]
pub struct ChunkRangeIterator {
    data: Arc<parking_lot::Mutex<ChunkPlan>>,
}

impl ChunkRangeIterator {
    pub fn new(plan: ChunkPlan) -> Self {
        Self {
            data: Arc::new(parking_lot::Mutex::new(plan)),
        }
    }

    pub fn next(&self) -> Option<ChunkInfo> {
        self.data.lock().next()
    }

    pub fn remaining_len(&self) -> u64 {
        self.data.lock().remaining_len()
    }
}
