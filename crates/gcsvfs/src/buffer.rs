//! Buffer management utilities

use std::ops::Range;

/// Read buffer owned by a single handle
///
/// Holds the window `[start, end)` of the object together with the read
/// position `idx` inside it. `available` is the number of window bytes at or
/// after `idx` that can be served without a fetch.
#[derive(Debug)]
pub(crate) struct ReadBuffer {
    /// Backing storage, allocated once at open
    data: Box<[u8]>,
    /// Object offset of the first buffered byte
    start: u64,
    /// Object offset one past the last buffered byte
    end: u64,
    /// Position inside `data` matching the handle cursor
    idx: usize,
    /// Bytes servable from `idx` onwards
    available: usize,
}

impl ReadBuffer {
    /// Create an empty window over `capacity` bytes of storage
    pub fn new(capacity: usize) -> Self {
        Self {
            data: vec![0u8; capacity].into_boxed_slice(),
            start: 0,
            end: 0,
            idx: 0,
            available: 0,
        }
    }

    /// Size of the backing storage
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// The object range currently held
    pub fn window(&self) -> Range<u64> {
        self.start..self.end
    }

    pub fn available(&self) -> usize {
        self.available
    }

    /// Check if the window holds the given object offset
    pub fn contains(&self, pos: u64) -> bool {
        pos >= self.start && pos < self.end
    }

    /// Point the read position at `pos`, which must lie inside the window
    pub fn reposition(&mut self, pos: u64) {
        debug_assert!(self.contains(pos));
        self.idx = (pos - self.start) as usize;
        self.available = (self.end - self.start) as usize - self.idx;
    }

    /// Stop serving bytes from the window without forgetting its range.
    ///
    /// A later read landing inside `[start, end)` repositions and reuses it.
    pub fn invalidate(&mut self) {
        self.available = 0;
        self.idx = 0;
    }

    /// Storage to fetch a new window of `len` bytes into.
    ///
    /// The old window is dropped first, so a failed fetch never leaves
    /// half-overwritten bytes reachable.
    pub fn fill_slot(&mut self, len: usize) -> &mut [u8] {
        self.start = 0;
        self.end = 0;
        self.invalidate();
        &mut self.data[..len]
    }

    /// Record that `len` bytes fetched into [`fill_slot`](Self::fill_slot)
    /// start at object offset `start`
    pub fn filled(&mut self, start: u64, len: usize) {
        self.start = start;
        self.end = start + len as u64;
        self.idx = 0;
        self.available = len;
    }

    /// Copy as many buffered bytes as fit into `out`, advancing the read
    /// position. Returns the number of bytes copied.
    pub fn take_into(&mut self, out: &mut [u8]) -> usize {
        let n = self.available.min(out.len());
        if n == 0 {
            return 0;
        }
        debug_assert!(self.start + (self.idx + n) as u64 <= self.end);

        out[..n].copy_from_slice(&self.data[self.idx..self.idx + n]);
        self.idx += n;
        self.available -= n;
        n
    }

    /// Free the storage and forget the window
    pub fn release(&mut self) {
        self.data = Box::default();
        self.start = 0;
        self.end = 0;
        self.invalidate();
    }
}
