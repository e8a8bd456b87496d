//! Bounded views over a file.

use super::Error;
use memmap2::{Mmap, MmapOptions};
use std::{
    fs::File,
    io::{Read, Seek, SeekFrom},
};

/// The largest window a single mapping or buffer may address (the signed 32-bit length limit).
pub const MAX_WINDOW: usize = i32::MAX as usize;

/// A readable view over `[start, start + len)` of a file.
///
/// Implementations only differ in how bytes are acquired. When to re-window and where the new
/// window starts is decided by the reader (see `place`), so every implementation satisfies the same
/// coverage invariant.
pub trait Window: Send {
    /// Offset in the file of the first byte covered.
    fn start(&self) -> u64;

    /// The bytes currently held (empty if nothing is held).
    fn bytes(&self) -> &[u8];

    /// Release the held window (if any) and acquire `[start, start + len)`.
    ///
    /// The previous window is always released first. If acquisition fails, the window is left
    /// empty.
    fn acquire(&mut self, start: u64, len: usize) -> Result<(), Error>;

    /// Release the held window.
    fn release(&mut self);

    /// Number of bytes currently held.
    fn len(&self) -> usize {
        self.bytes().len()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true if `[offset, offset + len)` lies entirely inside the held window.
    fn covers(&self, offset: u64, len: usize) -> bool {
        let start = self.start();
        offset >= start && offset + len as u64 <= start + self.len() as u64
    }
}

/// Choose the window that should be acquired to read the record at `target`.
///
/// Returns `(start, len)`. If more than `window_size` bytes remain after `target`, the window
/// starts at `target`. Otherwise it is pulled back so that it ends at the end of the file, which
/// keeps it as large as possible while still containing `target`.
pub(super) fn place(target: u64, file_size: u64, window_size: usize) -> (u64, usize) {
    let window_size = window_size as u64;
    let start = if file_size - target > window_size {
        target
    } else {
        file_size.saturating_sub(window_size)
    };
    let len = window_size.min(file_size - start);
    (start, len as usize)
}

/// A window mapped directly over the file.
pub struct Mapped {
    file: File,
    start: u64,
    map: Option<Mmap>,
}

impl Mapped {
    pub fn new(file: File) -> Self {
        Self {
            file,
            start: 0,
            map: None,
        }
    }
}

impl Window for Mapped {
    fn start(&self) -> u64 {
        self.start
    }

    fn bytes(&self) -> &[u8] {
        self.map.as_deref().unwrap_or(&[])
    }

    fn acquire(&mut self, start: u64, len: usize) -> Result<(), Error> {
        self.release();

        // SAFETY: the file is opened read-only and the table is never written while a reader holds
        // it. Modifying the file from elsewhere while it is mapped is not supported.
        let map = unsafe { MmapOptions::new().offset(start).len(len).map(&self.file)? };
        self.start = start;
        self.map = Some(map);
        Ok(())
    }

    fn release(&mut self) {
        self.map = None;
        self.start = 0;
    }
}

/// A window read into an owned buffer with a positioned read.
pub struct Buffered {
    file: File,
    start: u64,
    buffer: Vec<u8>,
    valid: usize,
}

impl Buffered {
    pub fn new(file: File) -> Self {
        Self {
            file,
            start: 0,
            buffer: Vec::new(),
            valid: 0,
        }
    }
}

impl Window for Buffered {
    fn start(&self) -> u64 {
        self.start
    }

    fn bytes(&self) -> &[u8] {
        &self.buffer[..self.valid]
    }

    fn acquire(&mut self, start: u64, len: usize) -> Result<(), Error> {
        self.release();

        // The buffer only grows, so re-windowing reuses the allocation
        if self.buffer.len() < len {
            self.buffer.resize(len, 0);
        }
        self.file.seek(SeekFrom::Start(start))?;
        self.file.read_exact(&mut self.buffer[..len])?;
        self.start = start;
        self.valid = len;
        Ok(())
    }

    fn release(&mut self) {
        self.valid = 0;
        self.start = 0;
    }
}
