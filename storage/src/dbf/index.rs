use super::{Error, Header, Reader, Value};
use prometheus_client::{metrics::counter::Counter, registry::Registry};
use std::{
    collections::{hash_map::Entry, HashMap},
    sync::Arc,
    time::Instant,
};
use tracing::{debug, warn};

/// An immutable map from the value of a key field to the (ONE based) number of the last record
/// holding it.
///
/// [Index] is cheap to clone and can be shared with other readers (and threads) opened on the
/// same table and key field.
pub type Index = Arc<HashMap<Value, u32>>;

/// Selects the key field of an [Index].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KeyField {
    /// Zero based position in the schema.
    Position(usize),
    /// Field name, matched ignoring ASCII case.
    Name(String),
}

impl KeyField {
    /// Resolve the key to a position in the schema of `header`.
    pub fn resolve(&self, header: &Header) -> Result<usize, Error> {
        match self {
            Self::Position(position) if *position < header.num_fields() => Ok(*position),
            Self::Position(position) => Err(Error::UnknownField(format!(
                "position {position} >= field count {}",
                header.num_fields()
            ))),
            Self::Name(name) => header
                .position(name)
                .ok_or_else(|| Error::UnknownField(name.clone())),
        }
    }
}

impl From<usize> for KeyField {
    fn from(position: usize) -> Self {
        Self::Position(position)
    }
}

impl From<&str> for KeyField {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for KeyField {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

/// A [Reader] that can seek to a record by the value of its key field.
///
/// An [IndexedReader] starts unindexed. Calling [IndexedReader::build] or
/// [IndexedReader::set_index] indexes it, after which [IndexedReader::seek_to_value] may be used.
/// [IndexedReader::seek_to_record] works in either state.
///
/// # Duplicate keys
///
/// Key values are not required to be unique. When a value occurs in more than one record, the
/// index maps it to the last record holding it, so earlier records with that value can only be
/// reached by record number.
pub struct IndexedReader {
    reader: Reader,
    index: Option<Index>,

    duplicates: Counter,
}

impl IndexedReader {
    /// Wrap `reader` without an index.
    pub fn new(reader: Reader) -> Self {
        Self {
            reader,
            index: None,
            duplicates: Counter::default(),
        }
    }

    /// Register the metrics of the reader and its index with `registry`.
    pub fn register(&self, registry: &mut Registry) {
        self.reader.register(registry);
        registry.register(
            "duplicates",
            "Number of key values replaced by a later record during index builds",
            self.duplicates.clone(),
        );
    }

    /// Scan every record to build an index over `key`.
    ///
    /// Any existing index is dropped first. If the scan fails, the reader is left unindexed.
    pub fn build(&mut self, key: impl Into<KeyField>) -> Result<(), Error> {
        let field = key.into().resolve(self.reader.header())?;
        self.index = None;

        let start = Instant::now();
        let count = self.reader.header().num_records();
        let mut map = HashMap::with_capacity(count as usize);
        let mut duplicates = 0u64;
        if count > 0 {
            self.reader.seek_to_record(1)?;
        }
        for number in 1..=count {
            self.reader.advance()?;
            let value = self.reader.decode_field(field)?;
            match map.entry(value) {
                Entry::Occupied(mut entry) => {
                    debug!(
                        value = %entry.key(),
                        previous = *entry.get(),
                        record = number,
                        "duplicate key, keeping later record"
                    );
                    entry.insert(number);
                    duplicates += 1;
                }
                Entry::Vacant(entry) => {
                    entry.insert(number);
                }
            }
        }

        let name = self.reader.header().fields()[field].name();
        if duplicates > 0 {
            self.duplicates.inc_by(duplicates);
            warn!(
                field = name,
                duplicates, "key values are not unique, lookups resolve to the last record"
            );
        }
        debug!(
            field = name,
            keys = map.len(),
            records = count,
            elapsed = ?start.elapsed(),
            "built index"
        );
        self.index = Some(Arc::new(map));
        Ok(())
    }

    /// Use an index built elsewhere (typically by another reader on the same table).
    ///
    /// Fails if `index` is empty or has more keys than the table has records. Fewer keys than
    /// records is accepted (duplicate keys collapse records) but logged. On failure the reader is
    /// left unindexed.
    pub fn set_index(&mut self, index: Index) -> Result<(), Error> {
        self.index = None;
        let count = self.reader.header().num_records();
        if index.is_empty() {
            return Err(Error::InvalidIndex("index is empty".into()));
        }
        if index.len() as u64 > count as u64 {
            return Err(Error::InvalidIndex(format!(
                "index has {} keys but the table has {count} records",
                index.len()
            )));
        }
        if (index.len() as u64) < count as u64 {
            warn!(
                keys = index.len(),
                records = count,
                "index has fewer keys than records, most likely due to duplicate key values"
            );
        }
        self.index = Some(index);
        Ok(())
    }

    /// The current index, if one has been built or set.
    pub fn index(&self) -> Option<&Index> {
        self.index.as_ref()
    }

    /// Returns true if [IndexedReader::seek_to_value] may be called.
    pub fn is_indexed(&self) -> bool {
        self.index.as_ref().is_some_and(|index| !index.is_empty())
    }

    /// Position the reader at the record holding `value`.
    ///
    /// Returns false (and leaves the position unspecified) if no record holds `value`. Calling
    /// this on an unindexed reader is an error.
    pub fn seek_to_value(&mut self, value: &Value) -> Result<bool, Error> {
        let number = match &self.index {
            Some(index) if !index.is_empty() => index.get(value).copied(),
            _ => return Err(Error::IndexNotBuilt),
        };
        let Some(number) = number else {
            return Ok(false);
        };
        self.reader.seek_to_record(number)?;
        Ok(true)
    }

    /// Decode every field of the record holding `value`.
    pub fn lookup(&mut self, value: &Value) -> Result<Option<Vec<Value>>, Error> {
        if !self.seek_to_value(value)? {
            return Ok(None);
        }
        self.reader.advance()?;
        self.reader.values().map(Some)
    }

    /// Pair each key in `keys` with the record holding it.
    pub fn join<I>(&mut self, keys: I) -> Join<'_, I::IntoIter>
    where
        I: IntoIterator<Item = Value>,
    {
        Join {
            reader: self,
            keys: keys.into_iter(),
        }
    }

    /// See [Reader::seek_to_record].
    pub fn seek_to_record(&mut self, number: u32) -> Result<(), Error> {
        self.reader.seek_to_record(number)
    }

    pub fn header(&self) -> &Header {
        self.reader.header()
    }

    /// See [Reader::has_next].
    pub fn has_next(&self) -> bool {
        self.reader.has_next()
    }

    /// See [Reader::advance].
    pub fn advance(&mut self) -> Result<(), Error> {
        self.reader.advance()
    }

    /// See [Reader::record_number].
    pub fn record_number(&self) -> Option<u32> {
        self.reader.record_number()
    }

    /// See [Reader::decode_field].
    pub fn decode_field(&self, index: usize) -> Result<Value, Error> {
        self.reader.decode_field(index)
    }

    /// See [Reader::values].
    pub fn values(&self) -> Result<Vec<Value>, Error> {
        self.reader.values()
    }

    pub fn reader(&self) -> &Reader {
        &self.reader
    }

    /// Release the index handle and return the underlying reader.
    pub fn into_inner(self) -> Reader {
        self.reader
    }

    /// Release the window and close the file.
    pub fn close(self) -> Result<(), Error> {
        self.reader.close()
    }
}

/// Iterator returned by [IndexedReader::join].
///
/// Yields each key together with the decoded record holding it, or `None` if no record does.
pub struct Join<'a, I> {
    reader: &'a mut IndexedReader,
    keys: I,
}

impl<I: Iterator<Item = Value>> Iterator for Join<'_, I> {
    type Item = Result<(Value, Option<Vec<Value>>), Error>;

    fn next(&mut self) -> Option<Self::Item> {
        let key = self.keys.next()?;
        Some(self.reader.lookup(&key).map(|record| (key, record)))
    }
}
