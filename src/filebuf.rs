//! gmon-profile file utilities module.

use crate::error::{Error, Result};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Opens a file for buffered reading with path context on failure.
pub fn open(filepath: &Path) -> Result<impl BufRead> {
    let file = File::open(filepath).map_err(|e| Error::OpenFile(e, filepath.into()))?;
    Ok(BufReader::new(file))
}

/// Opens a report file for buffered writing, truncating any previous one.
pub fn open_w(filepath: &Path) -> Result<impl Write> {
    let file = File::create(filepath).map_err(|e| Error::OpenFile(e, filepath.into()))?;
    Ok(BufWriter::new(file))
}

/// Reads one listing line as raw bytes, up to and including the newline,
/// replacing the buffer's contents. Returns the number of bytes read,
/// zero at end of input. Symbol names are not guaranteed to be UTF-8, so
/// the line stays bytes until a name is actually taken from it.
pub fn read_line_bytes(reader: &mut impl BufRead, line: &mut Vec<u8>) -> Result<usize> {
    line.clear();
    reader
        .read_until(b'\n', line)
        .map_err(|e| Error::ReadLine(e, String::from_utf8_lossy(line).into_owned()))
}
