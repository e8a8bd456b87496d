//! Helpers shared by the dBase benchmarks.

use std::io::{BufWriter, Write};
use tempfile::NamedTempFile;

/// Width of the key field.
const KEY_WIDTH: usize = 12;

/// Width of the padding field that makes records realistically wide.
const PAYLOAD_WIDTH: usize = 115;

/// Length of each record (deletion flag, key, payload).
pub const RECORD_LENGTH: usize = 1 + KEY_WIDTH + PAYLOAD_WIDTH;

/// The key stored in record `number` (ONE based). Every tenth key repeats the previous one.
pub fn key(number: u32) -> String {
    let base = if number % 10 == 0 { number - 1 } else { number };
    format!("{base:0width$}", width = KEY_WIDTH)
}

/// Write a table of `records` records with a character key and a character payload.
pub fn write_table(records: u32) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    let mut out = BufWriter::new(file.as_file_mut());

    // Preamble
    let header_length: u16 = 32 + 2 * 32 + 1;
    let mut preamble = [0u8; 32];
    preamble[0] = 0x03;
    preamble[4..8].copy_from_slice(&records.to_le_bytes());
    preamble[8..10].copy_from_slice(&header_length.to_le_bytes());
    preamble[10..12].copy_from_slice(&(RECORD_LENGTH as u16).to_le_bytes());
    out.write_all(&preamble).unwrap();

    // Descriptors
    for (name, width) in [(&b"KEY"[..], KEY_WIDTH), (&b"PAYLOAD"[..], PAYLOAD_WIDTH)] {
        let mut descriptor = [0u8; 32];
        descriptor[..name.len()].copy_from_slice(name);
        descriptor[11] = b'C';
        descriptor[16] = width as u8;
        out.write_all(&descriptor).unwrap();
    }
    out.write_all(&[0x0D]).unwrap();

    // Records
    let payload = vec![b'x'; PAYLOAD_WIDTH];
    for number in 1..=records {
        out.write_all(b" ").unwrap();
        out.write_all(key(number).as_bytes()).unwrap();
        out.write_all(&payload).unwrap();
    }
    out.write_all(&[0x1A]).unwrap();
    out.flush().unwrap();
    drop(out);
    file
}
