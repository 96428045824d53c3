//! Growable staging buffers for the mrelay I/O paths.
//!
//! Every receive, parse and stage-for-send path in the relay runs over a
//! [`Buffer`]: one contiguous byte region with independent read and write
//! cursors, so that repeated reads and writes do not copy data around on
//! every I/O event.
//!
//! ```text
//!  0         read            write              capacity
//!  |          |XXXX unread XXXX|                   |
//!  [------------------ region ---------------------]
//!                              [---- free tail ----]
//! ```
//!
//! The unread span is `read..write`. Producing advances `write`, consuming
//! advances `read`. When the tail runs out of room, the buffer first slides
//! the unread span back to offset zero ([`Buffer::realign`]) and only
//! reallocates if that did not free enough space, which bounds memory growth
//! for steady-state workloads where consumption keeps pace with production.
//!
//! [`BufferView`] is the non-owning counterpart: a read-only cursor over
//! externally owned bytes. It exposes only the consume side of the contract,
//! so growing or mutating through a view is impossible by construction.

#![warn(missing_docs)]

use std::collections::TryReserveError;

/// Initial capacity of buffers created through [`Buffer::new`].
const INITIAL_BUFFER_SIZE: usize = 4096;

/// An error returned from buffer operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum BufferError {
    /// The underlying allocation or reallocation failed.
    #[error("out of memory")]
    OutOfMemory,
    /// A consume or produce would move a cursor out of bounds.
    ///
    /// This is a contract violation by the caller, not a runtime condition to
    /// recover from: callers must pre-validate amounts against [`Buffer::len`]
    /// and [`Buffer::free_len`] when they want best-effort behavior.
    #[error("cursor would move out of buffer bounds")]
    InvalidRange,
}

impl From<TryReserveError> for BufferError {
    fn from(_: TryReserveError) -> Self {
        BufferError::OutOfMemory
    }
}

/// A growable byte region with independent read and write cursors.
///
/// See the [module documentation](self) for the cursor layout. Invariants:
/// `read <= write <= capacity` at all times, and the capacity only ever
/// grows. Reallocation preserves the cursor offsets and the unread content.
#[derive(Debug, Default)]
pub struct Buffer {
    region: Vec<u8>,
    read: usize,
    write: usize,
}

impl Buffer {
    /// Creates a buffer with the default initial capacity.
    pub fn new() -> Result<Self, BufferError> {
        Self::with_capacity(INITIAL_BUFFER_SIZE)
    }

    /// Creates a buffer with the given initial capacity.
    pub fn with_capacity(capacity: usize) -> Result<Self, BufferError> {
        let mut region = Vec::new();
        region.try_reserve_exact(capacity)?;
        region.resize(capacity, 0);
        Ok(Self {
            region,
            read: 0,
            write: 0,
        })
    }

    /// Creates a buffer holding a copy of `data` as its unread span.
    pub fn with_contents(data: &[u8]) -> Result<Self, BufferError> {
        let mut buffer = Self::with_capacity(data.len().max(INITIAL_BUFFER_SIZE))?;
        buffer.set(data)?;
        Ok(buffer)
    }

    /// Returns the total capacity of the region.
    pub fn capacity(&self) -> usize {
        self.region.len()
    }

    /// Returns the number of unread bytes.
    pub fn len(&self) -> usize {
        self.write - self.read
    }

    /// Returns `true` if there are no unread bytes.
    pub fn is_empty(&self) -> bool {
        self.read == self.write
    }

    /// Returns the number of free bytes in the tail of the region.
    pub fn free_len(&self) -> usize {
        self.region.len() - self.write
    }

    /// Returns the unread span.
    pub fn data(&self) -> &[u8] {
        &self.region[self.read..self.write]
    }

    /// Returns the free tail of the region for external writes.
    ///
    /// After filling a prefix of the returned slice, the caller must commit
    /// the written length with [`produced`](Self::produced).
    pub fn tail_mut(&mut self) -> &mut [u8] {
        &mut self.region[self.write..]
    }

    /// Advances the read cursor by `amount` bytes.
    ///
    /// Fails with [`BufferError::InvalidRange`] if `amount` exceeds the
    /// unread length; the unread span is never silently clamped away.
    pub fn consume(&mut self, amount: usize) -> Result<(), BufferError> {
        if self.read + amount > self.write {
            return Err(BufferError::InvalidRange);
        }
        self.read += amount;
        Ok(())
    }

    /// Consumes through and including the first occurrence of `delimiter`.
    ///
    /// If the unread span contains no delimiter, the entire span is consumed.
    /// This deliberately discards an unterminated trailing line instead of
    /// stalling the pipeline on garbled input; callers that stream partial
    /// lines across reads must hold the partial line back themselves.
    pub fn consume_until(&mut self, delimiter: u8) {
        let amount = match memchr::memchr(delimiter, self.data()) {
            Some(index) => index + 1,
            None => self.len(),
        };
        // In bounds by construction, the error is unreachable.
        let _ = self.consume(amount);
    }

    /// Advances the write cursor by `amount` bytes.
    ///
    /// Commits bytes that were written into [`tail_mut`](Self::tail_mut) by
    /// an external producer. Fails with [`BufferError::InvalidRange`] if the
    /// cursor would pass the end of the region.
    pub fn produced(&mut self, amount: usize) -> Result<(), BufferError> {
        if self.write + amount > self.region.len() {
            return Err(BufferError::InvalidRange);
        }
        self.write += amount;
        Ok(())
    }

    /// Appends `data` to the unread span, growing the region if needed.
    pub fn write(&mut self, data: &[u8]) -> Result<(), BufferError> {
        self.grow(data.len())?;
        self.region[self.write..self.write + data.len()].copy_from_slice(data);
        self.produced(data.len())
    }

    /// Replaces the entire contents with `data` and resets both cursors.
    pub fn set(&mut self, data: &[u8]) -> Result<(), BufferError> {
        if self.region.len() < data.len() {
            self.resize_region(data.len())?;
        }
        self.region[..data.len()].copy_from_slice(data);
        self.read = 0;
        self.write = data.len();
        Ok(())
    }

    /// Slides the unread span down to offset zero.
    ///
    /// No-op if the read cursor has not advanced. The unread content and
    /// length are unchanged, only the offset moves.
    pub fn realign(&mut self) {
        if self.read != 0 {
            self.region.copy_within(self.read..self.write, 0);
            self.write -= self.read;
            self.read = 0;
        }
    }

    /// Ensures at least `minimum_free` bytes of free tail space.
    ///
    /// Realigns first to reclaim space behind the read cursor and only
    /// reallocates if that was not enough, to `capacity * 2 + minimum_free`.
    /// Doubling the current capacity rather than sizing to the request
    /// amortizes reallocation cost across many small writes.
    pub fn grow(&mut self, minimum_free: usize) -> Result<(), BufferError> {
        if self.free_len() < minimum_free {
            self.realign();
            if self.free_len() < minimum_free {
                self.resize_region(self.region.len() * 2 + minimum_free)?;
            }
        }
        Ok(())
    }

    /// Doubles the capacity of the region.
    pub fn expand(&mut self) -> Result<(), BufferError> {
        self.resize_region(self.region.len() * 2)
    }

    fn resize_region(&mut self, capacity: usize) -> Result<(), BufferError> {
        // Capacity only grows, never shrinks in place.
        if capacity > self.region.len() {
            self.region.try_reserve_exact(capacity - self.region.len())?;
            self.region.resize(capacity, 0);
        }
        Ok(())
    }
}

/// A read-only cursor over externally owned bytes.
///
/// The zero-copy counterpart of [`Buffer`] for callers that already hold a
/// byte region and only need the consume side of the staging contract. There
/// is no write cursor and no growth; the borrow checker ties the view's
/// lifetime to the underlying bytes.
#[derive(Clone, Copy, Debug)]
pub struct BufferView<'a> {
    region: &'a [u8],
    read: usize,
}

impl<'a> BufferView<'a> {
    /// Wraps `data` in a read-only view with the cursor at the start.
    pub fn wrap(data: &'a [u8]) -> Self {
        Self { region: data, read: 0 }
    }

    /// Returns the number of unread bytes.
    pub fn len(&self) -> usize {
        self.region.len() - self.read
    }

    /// Returns `true` if there are no unread bytes.
    pub fn is_empty(&self) -> bool {
        self.read == self.region.len()
    }

    /// Returns the unread span.
    pub fn data(&self) -> &'a [u8] {
        &self.region[self.read..]
    }

    /// Advances the read cursor by `amount` bytes.
    pub fn consume(&mut self, amount: usize) -> Result<(), BufferError> {
        if self.read + amount > self.region.len() {
            return Err(BufferError::InvalidRange);
        }
        self.read += amount;
        Ok(())
    }

    /// Consumes through and including the first occurrence of `delimiter`,
    /// or the entire unread span if the delimiter is absent.
    pub fn consume_until(&mut self, delimiter: u8) {
        let amount = match memchr::memchr(delimiter, self.data()) {
            Some(index) => index + 1,
            None => self.len(),
        };
        let _ = self.consume(amount);
    }
}
