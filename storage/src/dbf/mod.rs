//! Read dBase tables sequentially, by record number, or by the value of a key field.
//!
//! # Record numbers
//!
//! Records are numbered from ONE. Record `n` starts at byte
//! `header_length + record_length * (n - 1)`. Every public operation that accepts or returns a
//! record number uses this convention; there is no zero-based record API.
//!
//! # Windows
//!
//! A [Reader] never holds more than [Config::window_size] bytes of the file in memory (and never
//! more than [MAX_WINDOW]). When a record is requested that is not fully covered by the current
//! window, the window is released and a new one is acquired that covers the record. Two
//! strategies are available (see [Strategy]) and both re-window under the same conditions.
//!
//! # Indexing
//!
//! An [IndexedReader] scans every record once to map the decoded value of a key field to the
//! number of the record holding it. If a value occurs more than once, the last record wins. The
//! resulting [Index] is immutable and can be handed to other readers opened on the same file
//! (see [IndexedReader::set_index]) to avoid repeating the scan.
//!
//! # Example
//!
//! ```rust,no_run
//! use dbjoin_storage::dbf::{Config, IndexedReader, Reader, Value};
//!
//! let reader = Reader::open("parcels.dbf", Config::default()).unwrap();
//! let mut reader = IndexedReader::new(reader);
//! reader.build("PARCEL_ID").unwrap();
//! if reader.seek_to_value(&Value::from("A-17")).unwrap() {
//!     reader.advance().unwrap();
//!     println!("{:?}", reader.values().unwrap());
//! }
//! ```

mod header;
mod index;
mod reader;
mod value;
mod window;

#[cfg(test)]
pub(crate) mod fixtures;

pub use header::{Field, FieldType, Header};
pub use index::{Index, IndexedReader, Join, KeyField};
pub use reader::Reader;
pub use value::{Charset, Value};
pub use window::{Buffered, Mapped, Window, MAX_WINDOW};

use thiserror::Error;

/// Default size of a [Strategy::Buffered] window.
pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// Errors that can occur when reading a dBase table.
#[derive(Debug, Error)]
pub enum Error {
    #[error("record number {number} is greater than the record count {count}")]
    RecordTooLarge { number: u32, count: u32 },
    #[error("record numbers are one based, got {0}")]
    RecordBelowMinimum(u32),
    #[error("unknown field: {0}")]
    UnknownField(String),
    #[error("invalid index: {0}")]
    InvalidIndex(String),
    #[error("index not built")]
    IndexNotBuilt,
    #[error("invalid header: {0}")]
    InvalidHeader(String),
    #[error("file truncated: expected at least {expected} bytes, found {actual}")]
    Truncated { expected: u64, actual: u64 },
    #[error("window of {window} bytes cannot hold a record of {record} bytes")]
    WindowTooSmall { window: usize, record: u16 },
    #[error("no records remain")]
    Exhausted,
    #[error("no current record")]
    NoCurrentRecord,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// How a [Reader] acquires its window over the file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Strategy {
    /// Map the window directly over the file (see [Mapped]).
    Mapped,
    /// Read the window into an owned buffer (see [Buffered]).
    Buffered,
}

/// Configuration for a [Reader].
#[derive(Clone, Debug)]
pub struct Config {
    /// How the window is acquired.
    pub strategy: Strategy,

    /// The largest window (in bytes) the reader may hold. Values above [MAX_WINDOW] are clamped.
    pub window_size: usize,

    /// The character set used to decode text fields.
    pub charset: Charset,
}

impl Config {
    /// A memory mapped configuration with the largest addressable window.
    pub fn mapped() -> Self {
        Self {
            strategy: Strategy::Mapped,
            window_size: MAX_WINDOW,
            charset: Charset::default(),
        }
    }

    /// A buffered configuration with a [DEFAULT_BUFFER_SIZE] window.
    pub fn buffered() -> Self {
        Self {
            strategy: Strategy::Buffered,
            window_size: DEFAULT_BUFFER_SIZE,
            charset: Charset::default(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::mapped()
    }
}
