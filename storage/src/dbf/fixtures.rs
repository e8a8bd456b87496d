//! Write small dBase tables for tests.

use super::{
    header::{DESCRIPTOR_SIZE, PREAMBLE_SIZE, TERMINATOR},
    Value,
};
use std::io::Write;
use tempfile::NamedTempFile;

/// Marks the end of the record data.
const EOF_MARKER: u8 = 0x1A;

/// A field descriptor to write.
#[derive(Clone, Debug)]
pub struct Column {
    name: String,
    kind: u8,
    width: u8,
    decimals: u8,
}

impl Column {
    pub fn character(name: &str, width: u8) -> Self {
        Self::new(name, b'C', width, 0)
    }

    pub fn numeric(name: &str, width: u8, decimals: u8) -> Self {
        Self::new(name, b'N', width, decimals)
    }

    pub fn logical(name: &str) -> Self {
        Self::new(name, b'L', 1, 0)
    }

    pub fn date(name: &str) -> Self {
        Self::new(name, b'D', 8, 0)
    }

    fn new(name: &str, kind: u8, width: u8, decimals: u8) -> Self {
        assert!(name.len() <= 10, "field names are at most 10 bytes");
        Self {
            name: name.to_string(),
            kind,
            width,
            decimals,
        }
    }

    /// Encode `value` into exactly `width` bytes.
    fn encode(&self, value: &Value) -> Vec<u8> {
        let width = self.width as usize;
        let text = match value {
            Value::Null => String::new(),
            Value::Text(s) => format!("{s:<width$}"),
            Value::Integer(n) => format!("{n:>width$}"),
            Value::Float(n) => format!("{n:>width$.prec$}", prec = self.decimals as usize),
            Value::Bool(b) => (if *b { "T" } else { "F" }).to_string(),
            Value::Date(d) => d.format("%Y%m%d").to_string(),
        };
        let mut bytes = text.into_bytes();
        bytes.resize(width, b' ');
        bytes
    }
}

/// Builds the bytes of a table.
pub struct Builder {
    columns: Vec<Column>,
    records: Vec<Vec<u8>>,
    record_length: Option<u16>,
}

impl Builder {
    pub fn new(columns: Vec<Column>) -> Self {
        Self {
            columns,
            records: Vec::new(),
            record_length: None,
        }
    }

    /// Override the record length written to the header.
    pub fn record_length(mut self, record_length: u16) -> Self {
        self.record_length = Some(record_length);
        self
    }

    /// Append a live record.
    pub fn record(self, values: Vec<Value>) -> Self {
        self.encoded(b' ', values)
    }

    /// Append a record marked as deleted.
    pub fn deleted(self, values: Vec<Value>) -> Self {
        self.encoded(b'*', values)
    }

    /// Append a record exactly as given (deletion flag included).
    pub fn raw_record(mut self, bytes: &[u8]) -> Self {
        self.records.push(bytes.to_vec());
        self
    }

    fn encoded(mut self, flag: u8, values: Vec<Value>) -> Self {
        assert_eq!(values.len(), self.columns.len(), "one value per column");
        let mut record = vec![flag];
        for (column, value) in self.columns.iter().zip(values.iter()) {
            record.extend(column.encode(value));
        }
        self.records.push(record);
        self
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let header_length = if self.columns.is_empty() {
            PREAMBLE_SIZE
        } else {
            PREAMBLE_SIZE + DESCRIPTOR_SIZE * self.columns.len() + 1
        };
        let record_length = self.record_length.unwrap_or_else(|| {
            1 + self.columns.iter().map(|c| c.width as u16).sum::<u16>()
        });

        // Preamble
        let mut out = Vec::new();
        out.push(0x03);
        out.extend([124, 1, 1]);
        out.extend((self.records.len() as u32).to_le_bytes());
        out.extend((header_length as u16).to_le_bytes());
        out.extend(record_length.to_le_bytes());
        out.resize(PREAMBLE_SIZE, 0);

        // Descriptors
        for column in &self.columns {
            let mut descriptor = [0u8; DESCRIPTOR_SIZE];
            descriptor[..column.name.len()].copy_from_slice(column.name.as_bytes());
            descriptor[11] = column.kind;
            descriptor[16] = column.width;
            descriptor[17] = column.decimals;
            out.extend(descriptor);
        }
        if !self.columns.is_empty() {
            out.push(TERMINATOR);
        }

        // Records
        for record in &self.records {
            let mut record = record.clone();
            record.resize(record_length as usize, b' ');
            out.extend(record);
        }
        out.push(EOF_MARKER);
        out
    }

    /// Write the table to a temporary file.
    pub fn write(&self) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&self.to_bytes()).unwrap();
        file.flush().unwrap();
        file
    }
}
