//! gmon-profile symbol listing parser module.

use crate::config::{Address, NO_CLASS};
use crate::error::Result;
use crate::filebuf;
use std::io::BufRead;

/// Kind of a resolved symbol, derived from the listing's type letter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SymbolKind {
    /// Code symbol (`T` or `t` in the listing).
    Text,
    /// Anything else (data, weak, undefined, ...).
    Misc,
}

/// One resolved function symbol.
#[derive(Clone, Debug)]
pub struct FunctionEntry {
    /// Raw link-time address.
    pub address: Address,
    /// Address divided by the sample unit size; filled by the scale pass.
    pub scaled_address: Address,
    /// Symbol name, to the end of the listing line.
    pub name: String,
    /// Reserved, always [`NO_CLASS`] for this format.
    pub class_id: u32,
    pub kind: SymbolKind,
}

// Minimal line length worth parsing; filters headers and noise.
const MIN_LINE_LEN: usize = 8;

/// Parses a line-oriented symbol listing (`<hex-address> <type> <name>`
/// per line, the shape `nm` prints) into an unsorted function table.
///
/// Lines are handled as raw bytes; names outside UTF-8 are converted
/// lossily rather than failing the load. Short lines are skipped. A line
/// whose hex prefix leaves no room for the separator and type byte stops
/// consumption of the entire remaining input; the listing is treated as
/// corrupt from that point on. This mirrors the historical reader and
/// keeps old listings loading the same.
pub fn parse_listing(mut reader: impl BufRead) -> Result<Vec<FunctionEntry>> {
    let mut entries = Vec::new();
    let mut line = Vec::with_capacity(256);
    let mut bytes_read = usize::MAX;
    let mut count = 0_usize;

    while bytes_read != 0 {
        bytes_read = filebuf::read_line_bytes(&mut reader, &mut line)?;

        let line = trim_line_ending(&line);
        if line.len() < MIN_LINE_LEN {
            continue;
        }

        let hex_len = line
            .iter()
            .take_while(|b| b.is_ascii_hexdigit())
            .count();
        let address = parse_hex_prefix(&line[..hex_len]);

        if hex_len + 2 > line.len() {
            tracing::warn!(
                "Symbol listing corrupt at '{}', stopping",
                String::from_utf8_lossy(line)
            );
            break;
        }

        let kind = match line[hex_len + 1] {
            b'T' | b't' => SymbolKind::Text,
            _ => SymbolKind::Misc,
        };
        let name = String::from_utf8_lossy(line.get(hex_len + 3..).unwrap_or_default())
            .into_owned();

        entries.push(FunctionEntry {
            address,
            scaled_address: address,
            name,
            class_id: NO_CLASS,
            kind,
        });
        count += 1;
    }

    tracing::info!("Loaded {} symbols from the listing", count);
    Ok(entries)
}

/// Strips the trailing newline and carriage-return bytes.
fn trim_line_ending(line: &[u8]) -> &[u8] {
    let mut end = line.len();
    while end > 0 && (line[end - 1] == b'\n' || line[end - 1] == b'\r') {
        end -= 1;
    }
    &line[..end]
}

/// Parses the leading hex digits with strtol semantics: an empty prefix
/// yields address zero.
fn parse_hex_prefix(digits: &[u8]) -> Address {
    if digits.is_empty() {
        return 0;
    }
    std::str::from_utf8(digits)
        .ok()
        .and_then(|s| Address::from_str_radix(s, 16).ok())
        .unwrap_or(Address::MAX)
}
