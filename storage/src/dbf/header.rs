use super::Error;
use bytes::Buf;
use chrono::NaiveDate;
use std::io::{ErrorKind, Read};

/// Size of the fixed portion of the header that precedes the field descriptors.
pub(super) const PREAMBLE_SIZE: usize = 32;

/// Size of a single field descriptor.
pub(super) const DESCRIPTOR_SIZE: usize = 32;

/// Marks the end of the field descriptors.
pub(super) const TERMINATOR: u8 = 0x0D;

/// Width of the name slot in a field descriptor.
const NAME_SIZE: usize = 11;

/// The declared type of a [Field].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldType {
    /// `C`: text padded with trailing spaces.
    Character,
    /// `N`: a number stored as right aligned ASCII.
    Numeric,
    /// `F`: a floating point number stored as right aligned ASCII.
    Float,
    /// `L`: a single byte boolean.
    Logical,
    /// `D`: a date stored as `YYYYMMDD`.
    Date,
    /// Any other type code (decoded as text).
    Other(u8),
}

impl FieldType {
    fn from_code(code: u8) -> Self {
        match code.to_ascii_uppercase() {
            b'C' => Self::Character,
            b'N' => Self::Numeric,
            b'F' => Self::Float,
            b'L' => Self::Logical,
            b'D' => Self::Date,
            _ => Self::Other(code),
        }
    }

    /// The type code stored in the field descriptor.
    pub fn code(&self) -> u8 {
        match self {
            Self::Character => b'C',
            Self::Numeric => b'N',
            Self::Float => b'F',
            Self::Logical => b'L',
            Self::Date => b'D',
            Self::Other(code) => *code,
        }
    }
}

/// A single column of the table schema.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Field {
    name: String,
    kind: FieldType,
    width: u8,
    decimals: u8,

    // Byte offset of the field within a record (after the deletion flag)
    offset: usize,
}

impl Field {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> FieldType {
        self.kind
    }

    /// Width of the field in bytes.
    pub fn width(&self) -> u8 {
        self.width
    }

    /// Number of digits after the decimal point (numeric fields only).
    pub fn decimals(&self) -> u8 {
        self.decimals
    }

    /// Byte offset of the field from the start of its record.
    pub fn offset(&self) -> usize {
        self.offset
    }
}

/// The parsed header of a dBase table.
#[derive(Clone, Debug)]
pub struct Header {
    version: u8,
    last_update: Option<NaiveDate>,
    num_records: u32,
    header_length: u16,
    record_length: u16,
    fields: Vec<Field>,
}

impl Header {
    /// Read a header from the start of `source`.
    ///
    /// Exactly `header_length` bytes are consumed.
    pub fn read(source: &mut impl Read) -> Result<Self, Error> {
        let mut buf = vec![0u8; PREAMBLE_SIZE];
        read_exact(source, &mut buf)?;

        // The header length is needed to know how many descriptor bytes follow
        let header_length = u16::from_le_bytes([buf[8], buf[9]]) as usize;
        if header_length < PREAMBLE_SIZE {
            return Err(Error::InvalidHeader(format!(
                "header length {header_length} is shorter than the {PREAMBLE_SIZE} byte preamble"
            )));
        }
        buf.resize(header_length, 0);
        read_exact(source, &mut buf[PREAMBLE_SIZE..])?;
        Self::parse(&buf)
    }

    /// Parse a header from a buffer holding at least the full header.
    pub fn parse(mut buf: &[u8]) -> Result<Self, Error> {
        if buf.len() < PREAMBLE_SIZE {
            return Err(Error::InvalidHeader(format!(
                "header is {} bytes, expected at least {PREAMBLE_SIZE}",
                buf.len()
            )));
        }
        let available = buf.len();

        // Preamble
        let version = buf.get_u8();
        let (year, month, day) = (buf.get_u8(), buf.get_u8(), buf.get_u8());
        let last_update = NaiveDate::from_ymd_opt(1900 + year as i32, month as u32, day as u32);
        let num_records = buf.get_u32_le();
        let header_length = buf.get_u16_le();
        let record_length = buf.get_u16_le();
        buf.advance(PREAMBLE_SIZE - 12);
        if (header_length as usize) < PREAMBLE_SIZE || header_length as usize > available {
            return Err(Error::InvalidHeader(format!(
                "header length {header_length} outside of [{PREAMBLE_SIZE}, {available}]"
            )));
        }
        if record_length == 0 {
            return Err(Error::InvalidHeader("record length is zero".into()));
        }

        // Field descriptors run until the terminator or the end of the header
        let mut remaining = header_length as usize - PREAMBLE_SIZE;
        let mut fields = Vec::new();
        let mut offset = 1; // skip the deletion flag
        while remaining >= DESCRIPTOR_SIZE && buf.chunk()[0] != TERMINATOR {
            let mut name = [0u8; NAME_SIZE];
            buf.copy_to_slice(&mut name);
            let kind = FieldType::from_code(buf.get_u8());
            buf.advance(4);
            let width = buf.get_u8();
            let decimals = buf.get_u8();
            buf.advance(14);
            remaining -= DESCRIPTOR_SIZE;

            let end = name.iter().position(|b| *b == 0).unwrap_or(NAME_SIZE);
            let name = String::from_utf8_lossy(&name[..end]).trim().to_string();
            if width == 0 {
                return Err(Error::InvalidHeader(format!("field {name} has zero width")));
            }
            fields.push(Field {
                name,
                kind,
                width,
                decimals,
                offset,
            });
            offset += width as usize;
        }
        if offset > record_length as usize {
            return Err(Error::InvalidHeader(format!(
                "fields span {offset} bytes but records are {record_length} bytes"
            )));
        }

        Ok(Self {
            version,
            last_update,
            num_records,
            header_length,
            record_length,
            fields,
        })
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    /// The date of the last update recorded in the header, if valid.
    pub fn last_update(&self) -> Option<NaiveDate> {
        self.last_update
    }

    pub fn num_records(&self) -> u32 {
        self.num_records
    }

    /// Length of the header in bytes (the offset of record 1).
    pub fn header_length(&self) -> u16 {
        self.header_length
    }

    /// Length of every record in bytes, including the deletion flag.
    pub fn record_length(&self) -> u16 {
        self.record_length
    }

    pub fn num_fields(&self) -> usize {
        self.fields.len()
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, index: usize) -> Option<&Field> {
        self.fields.get(index)
    }

    /// Find the position of a field by name, ignoring ASCII case.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.fields
            .iter()
            .position(|field| field.name.eq_ignore_ascii_case(name))
    }

    /// Byte offset of the one based record `number`.
    ///
    /// The caller is responsible for checking that `number` is in `[1, num_records]`.
    pub fn record_offset(&self, number: u32) -> u64 {
        self.header_length as u64 + self.record_length as u64 * (number as u64 - 1)
    }

    /// The number of bytes the header says the file must contain.
    pub fn data_length(&self) -> u64 {
        self.header_length as u64 + self.record_length as u64 * self.num_records as u64
    }
}

/// Fill `buf` from `source`, reporting a short read as an invalid header.
fn read_exact(source: &mut impl Read, buf: &mut [u8]) -> Result<(), Error> {
    match source.read_exact(buf) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::UnexpectedEof => {
            Err(Error::InvalidHeader("header truncated".into()))
        }
        Err(err) => Err(Error::Io(err)),
    }
}
