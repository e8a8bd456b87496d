use super::{Field, FieldType};
use chrono::NaiveDate;
use std::{
    fmt,
    hash::{Hash, Hasher},
};

/// The character set used to decode text fields.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Charset {
    /// ISO-8859-1: every byte is the code point of the same value.
    #[default]
    Latin1,
    /// UTF-8, with invalid sequences replaced by `U+FFFD`.
    Utf8,
}

impl Charset {
    fn decode(&self, bytes: &[u8]) -> String {
        match self {
            Self::Latin1 => bytes.iter().map(|b| *b as char).collect(),
            Self::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
        }
    }
}

/// The decoded value of a single field.
///
/// [Value] is used as the key of an [crate::dbf::Index], so it implements [Eq] and [Hash]. Floats
/// compare by bit pattern.
#[derive(Clone, Debug)]
pub enum Value {
    /// A blank or unparsable field.
    Null,
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Date(NaiveDate),
}

impl Value {
    /// Decode the bytes of `field` (exactly `field.width()` bytes).
    pub fn decode(field: &Field, raw: &[u8], charset: Charset) -> Self {
        match field.kind() {
            FieldType::Character | FieldType::Other(_) => {
                Self::Text(charset.decode(raw).trim_end().to_string())
            }
            FieldType::Numeric | FieldType::Float => decode_number(raw, field.decimals()),
            FieldType::Logical => match raw.first() {
                Some(b'T' | b't' | b'Y' | b'y') => Self::Bool(true),
                Some(b'F' | b'f' | b'N' | b'n') => Self::Bool(false),
                _ => Self::Null,
            },
            FieldType::Date => decode_date(raw),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

fn decode_number(raw: &[u8], decimals: u8) -> Value {
    let Ok(text) = std::str::from_utf8(raw) else {
        return Value::Null;
    };
    let text = text.trim();

    // Overflowed numbers are written as asterisks
    if text.is_empty() || text.bytes().all(|b| b == b'*') {
        return Value::Null;
    }
    if decimals == 0 {
        if let Ok(n) = text.parse::<i64>() {
            return Value::Integer(n);
        }
    }
    match text.parse::<f64>() {
        Ok(n) => Value::Float(n),
        Err(_) => Value::Null,
    }
}

fn decode_date(raw: &[u8]) -> Value {
    let Ok(text) = std::str::from_utf8(raw) else {
        return Value::Null;
    };
    let text = text.trim();
    if text.len() != 8 || !text.bytes().all(|b| b.is_ascii_digit()) {
        return Value::Null;
    }
    let year = text[0..4].parse::<i32>();
    let month = text[4..6].parse::<u32>();
    let day = text[6..8].parse::<u32>();
    match (year, month, day) {
        (Ok(year), Ok(month), Ok(day)) => NaiveDate::from_ymd_opt(year, month, day)
            .map(Value::Date)
            .unwrap_or(Value::Null),
        _ => Value::Null,
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a.to_bits() == b.to_bits(),
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Date(a), Self::Date(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Self::Null => {}
            Self::Text(s) => s.hash(state),
            Self::Integer(n) => n.hash(state),
            Self::Float(n) => n.to_bits().hash(state),
            Self::Bool(b) => b.hash(state),
            Self::Date(d) => d.hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Text(s) => write!(f, "{s}"),
            Self::Integer(n) => write!(f, "{n}"),
            Self::Float(n) => write!(f, "{n}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<NaiveDate> for Value {
    fn from(value: NaiveDate) -> Self {
        Self::Date(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dbf::{
        fixtures::{Builder, Column},
        Header,
    };
    use std::{collections::HashSet, io::Cursor};
    use test_case::test_case;

    /// Build a single field schema and return that field.
    fn field(column: Column) -> Field {
        let bytes = Builder::new(vec![column]).to_bytes();
        let header = Header::read(&mut Cursor::new(bytes)).unwrap();
        header.field(0).unwrap().clone()
    }

    #[test_case(b"hello     ", Value::from("hello"); "trailing spaces")]
    #[test_case(b"  indented", Value::from("  indented"); "leading spaces kept")]
    #[test_case(b"          ", Value::from(""); "blank")]
    fn test_decode_character(raw: &[u8], expected: Value) {
        let field = field(Column::character("NAME", 10));
        assert_eq!(Value::decode(&field, raw, Charset::Latin1), expected);
    }

    #[test]
    fn test_decode_charsets() {
        let field = field(Column::character("NAME", 4));
        let raw = [b'c', 0xE9, b' ', b' '];
        assert_eq!(
            Value::decode(&field, &raw, Charset::Latin1),
            Value::from("c\u{e9}")
        );
        assert_eq!(
            Value::decode(&field, &raw, Charset::Utf8),
            Value::from("c\u{fffd}")
        );
        let raw = "c\u{e9} ".as_bytes();
        assert_eq!(
            Value::decode(&field, raw, Charset::Utf8),
            Value::from("c\u{e9}")
        );
    }

    #[test_case(b"    42", 0, Value::Integer(42); "integer")]
    #[test_case(b"   -17", 0, Value::Integer(-17); "negative")]
    #[test_case(b"  4.25", 2, Value::Float(4.25); "decimal")]
    #[test_case(b"  1e30", 0, Value::Float(1e30); "float without decimals")]
    #[test_case(b"      ", 0, Value::Null; "blank")]
    #[test_case(b"******", 0, Value::Null; "overflow")]
    #[test_case(b"  abc ", 0, Value::Null; "garbage")]
    fn test_decode_numeric(raw: &[u8], decimals: u8, expected: Value) {
        let field = field(Column::numeric("N", 6, decimals));
        assert_eq!(Value::decode(&field, raw, Charset::Latin1), expected);
    }

    #[test_case(b"T", Value::Bool(true); "upper true")]
    #[test_case(b"y", Value::Bool(true); "lower yes")]
    #[test_case(b"F", Value::Bool(false); "upper false")]
    #[test_case(b"n", Value::Bool(false); "lower no")]
    #[test_case(b"?", Value::Null; "unknown")]
    #[test_case(b" ", Value::Null; "blank")]
    fn test_decode_logical(raw: &[u8], expected: Value) {
        let field = field(Column::logical("L"));
        assert_eq!(Value::decode(&field, raw, Charset::Latin1), expected);
    }

    #[test_case(b"20240517", Value::Date(NaiveDate::from_ymd_opt(2024, 5, 17).unwrap()); "valid")]
    #[test_case(b"        ", Value::Null; "blank")]
    #[test_case(b"00000000", Value::Null; "zero")]
    #[test_case(b"20240231", Value::Null; "impossible")]
    #[test_case(b"2024-5-1", Value::Null; "malformed")]
    fn test_decode_date(raw: &[u8], expected: Value) {
        let field = field(Column::date("D"));
        assert_eq!(Value::decode(&field, raw, Charset::Latin1), expected);
    }

    #[test]
    fn test_value_hash_and_eq() {
        let mut set = HashSet::new();
        assert!(set.insert(Value::from("A")));
        assert!(set.insert(Value::Integer(1)));
        assert!(set.insert(Value::Float(1.0)));
        assert!(set.insert(Value::Null));
        assert!(!set.insert(Value::from("A")));
        assert!(!set.insert(Value::Float(1.0)));
        assert!(!set.insert(Value::Null));

        // Same number, different variants
        assert_ne!(Value::Integer(1), Value::Float(1.0));
        assert_eq!(Value::Float(f64::NAN), Value::Float(f64::NAN));
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::from("abc").to_string(), "abc");
        assert_eq!(Value::Integer(-3).to_string(), "-3");
        assert_eq!(Value::Null.to_string(), "null");
        let date = NaiveDate::from_ymd_opt(1999, 12, 31).unwrap();
        assert_eq!(Value::from(date).to_string(), "1999-12-31");
    }
}
