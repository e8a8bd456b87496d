use super::{
    window::{place, Buffered, Mapped, Window, MAX_WINDOW},
    Charset, Config, Error, Header, Strategy, Value,
};
use prometheus_client::{metrics::counter::Counter, registry::Registry};
use std::{fs::File, path::Path};
use tracing::debug;

/// Marks a deleted record.
const DELETED: u8 = b'*';

#[derive(Default)]
struct Metrics {
    seeks: Counter,
    rewindows: Counter,
    records_read: Counter,
}

/// Reads the records of a dBase table through a bounded [Window].
///
/// Records can be read sequentially ([Reader::has_next], [Reader::advance]) starting from any
/// record positioned to with [Reader::seek_to_record]. Record numbers are ONE based.
///
/// A [Reader] is not safe for concurrent use: the window and cursor are mutable state without
/// internal synchronization. Open one reader per thread instead.
pub struct Reader {
    header: Header,
    charset: Charset,
    strategy: Strategy,
    window_size: usize,
    file_size: u64,

    window: Box<dyn Window>,

    // Position within the window of the record numbered `next`
    cursor: usize,

    // Number of the record that the next call to `advance` reads. Wider than a record number so
    // that it can step past the last record of a table holding `u32::MAX` records.
    next: u64,

    // Number and bytes of the most recently advanced record
    current: Option<u32>,
    row: Vec<u8>,

    metrics: Metrics,
}

impl Reader {
    /// Open the table at `path`.
    pub fn open(path: impl AsRef<Path>, config: Config) -> Result<Self, Error> {
        let file = File::open(path)?;
        Self::from_file(file, config)
    }

    /// Read the header of `file` and prepare to read its records.
    ///
    /// No window is acquired until the first record is accessed.
    pub fn from_file(mut file: File, config: Config) -> Result<Self, Error> {
        let file_size = file.metadata()?.len();
        let header = Header::read(&mut file)?;
        if file_size < header.data_length() {
            return Err(Error::Truncated {
                expected: header.data_length(),
                actual: file_size,
            });
        }
        let window_size = config.window_size.min(MAX_WINDOW);
        if window_size < header.record_length() as usize {
            return Err(Error::WindowTooSmall {
                window: window_size,
                record: header.record_length(),
            });
        }
        let window: Box<dyn Window> = match config.strategy {
            Strategy::Mapped => Box::new(Mapped::new(file)),
            Strategy::Buffered => Box::new(Buffered::new(file)),
        };
        debug!(
            records = header.num_records(),
            fields = header.num_fields(),
            header_length = header.header_length(),
            record_length = header.record_length(),
            file_size,
            window_size,
            strategy = ?config.strategy,
            "opened table"
        );

        Ok(Self {
            row: Vec::with_capacity(header.record_length() as usize),
            header,
            charset: config.charset,
            strategy: config.strategy,
            window_size,
            file_size,
            window,
            cursor: 0,
            next: 1,
            current: None,
            metrics: Metrics::default(),
        })
    }

    /// Register the reader's metrics with `registry`.
    pub fn register(&self, registry: &mut Registry) {
        registry.register(
            "seeks",
            "Number of seeks by record number",
            self.metrics.seeks.clone(),
        );
        registry.register(
            "rewindows",
            "Number of times the window was re-acquired",
            self.metrics.rewindows.clone(),
        );
        registry.register(
            "records_read",
            "Number of records advanced over",
            self.metrics.records_read.clone(),
        );
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Position the reader so that the next call to [Reader::advance] reads record `number`.
    ///
    /// `number` is ONE based and must be in `[1, num_records]`. If the current window already
    /// covers the record, only the cursor moves. Otherwise the window is re-acquired.
    pub fn seek_to_record(&mut self, number: u32) -> Result<(), Error> {
        let count = self.header.num_records();
        if number > count {
            return Err(Error::RecordTooLarge { number, count });
        }
        if number < 1 {
            return Err(Error::RecordBelowMinimum(number));
        }
        self.metrics.seeks.inc();
        self.position(number)?;
        self.next = number.into();
        self.current = None;
        Ok(())
    }

    /// Ensure the window covers record `number` and point the cursor at it.
    fn position(&mut self, number: u32) -> Result<(), Error> {
        let target = self.header.record_offset(number);
        let record_length = self.header.record_length() as usize;

        // Fast path: no I/O if the record is already in the window
        if self.window.covers(target, record_length) {
            self.cursor = (target - self.window.start()) as usize;
            return Ok(());
        }

        // Re-window. A failed acquisition leaves the window empty, so the cursor is reset to
        // keep it inside what is actually held.
        self.metrics.rewindows.inc();
        let (start, len) = place(target, self.file_size, self.window_size);
        if let Err(err) = self.window.acquire(start, len) {
            self.cursor = 0;
            return Err(err);
        }
        debug!(
            record = number,
            start,
            len,
            strategy = ?self.strategy,
            "re-windowed"
        );
        self.cursor = (target - start) as usize;
        Ok(())
    }

    /// Returns true while records remain after the cursor.
    pub fn has_next(&self) -> bool {
        self.next <= u64::from(self.header.num_records())
    }

    /// Read the record under the cursor and move the cursor to the following record.
    ///
    /// Must be called before decoding fields of a record positioned to by
    /// [Reader::seek_to_record].
    pub fn advance(&mut self) -> Result<(), Error> {
        if !self.has_next() {
            return Err(Error::Exhausted);
        }
        let number = u32::try_from(self.next).map_err(|_| Error::Exhausted)?;
        self.current = None;
        self.position(number)?;

        let record_length = self.header.record_length() as usize;
        let end = self.cursor + record_length;
        self.row.clear();
        self.row
            .extend_from_slice(&self.window.bytes()[self.cursor..end]);
        self.cursor = end;
        self.next = u64::from(number) + 1;
        self.current = Some(number);
        self.metrics.records_read.inc();
        Ok(())
    }

    /// The number of the most recently advanced record, if any.
    pub fn record_number(&self) -> Option<u32> {
        self.current
    }

    /// Returns true if the most recently advanced record is marked as deleted.
    pub fn is_deleted(&self) -> bool {
        self.current.is_some() && self.row.first() == Some(&DELETED)
    }

    /// Decode field `index` (zero based position in the schema) of the most recently advanced
    /// record.
    pub fn decode_field(&self, index: usize) -> Result<Value, Error> {
        if self.current.is_none() {
            return Err(Error::NoCurrentRecord);
        }
        let field = self
            .header
            .field(index)
            .ok_or_else(|| Error::UnknownField(format!("position {index}")))?;
        let start = field.offset();
        let raw = &self.row[start..start + field.width() as usize];
        Ok(Value::decode(field, raw, self.charset))
    }

    /// Decode every field of the most recently advanced record.
    pub fn values(&self) -> Result<Vec<Value>, Error> {
        (0..self.header.num_fields())
            .map(|index| self.decode_field(index))
            .collect()
    }

    /// Offset in the file of the first byte of the window.
    pub fn window_start(&self) -> u64 {
        self.window.start()
    }

    /// Number of bytes held by the window.
    pub fn window_len(&self) -> usize {
        self.window.len()
    }

    /// Position of the cursor within the window.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Release the window and close the file.
    pub fn close(mut self) -> Result<(), Error> {
        self.window.release();
        Ok(())
    }
}
