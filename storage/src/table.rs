//! Share one key index between every reader opened on a table.
//!
//! Building an [Index] scans the whole table. When several consumers join against the same table
//! and key field, [Table] builds the index with the first reader it opens and hands the same
//! immutable handle to every reader opened afterwards.
//!
//! # Example
//!
//! ```rust,no_run
//! use dbjoin_storage::{dbf::{Config, Value}, table::Table};
//!
//! let mut table = Table::new("attributes.dbf", "GAUGE_ID", Config::default());
//!
//! // The first reader scans the table, the second reuses its index
//! let mut first = table.open().unwrap();
//! let mut second = table.open().unwrap();
//!
//! let gauges = ["01010000", "01013500"].map(Value::from);
//! for joined in first.join(gauges) {
//!     let (gauge, attributes) = joined.unwrap();
//!     println!("{gauge}: {attributes:?}");
//! }
//! # let _ = second.lookup(&Value::from("01010000"));
//! ```

use crate::dbf::{Config, Error, Index, IndexedReader, KeyField, Reader};
use std::path::{Path, PathBuf};
use tracing::debug;

/// A dBase table joined on a single key field.
pub struct Table {
    path: PathBuf,
    key: KeyField,
    config: Config,

    index: Option<Index>,
}

impl Table {
    /// Describe the table at `path`, keyed on `key`. Nothing is read until [Table::open].
    pub fn new(path: impl Into<PathBuf>, key: impl Into<KeyField>, config: Config) -> Self {
        Self {
            path: path.into(),
            key: key.into(),
            config,
            index: None,
        }
    }

    /// Open a new indexed reader on the table.
    ///
    /// The first successful call builds the index; later calls reuse it without scanning.
    pub fn open(&mut self) -> Result<IndexedReader, Error> {
        let reader = Reader::open(&self.path, self.config.clone())?;
        let mut reader = IndexedReader::new(reader);
        match &self.index {
            Some(index) if !index.is_empty() => {
                reader.set_index(index.clone())?;
                debug!(path = ?self.path, "reused index");
            }
            _ => {
                reader.build(self.key.clone())?;
                self.index = reader.index().cloned();
                debug!(path = ?self.path, "built index for table");
            }
        }
        Ok(reader)
    }

    /// The shared index, once built.
    pub fn index(&self) -> Option<&Index> {
        self.index.as_ref()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn key(&self) -> &KeyField {
        &self.key
    }
}
