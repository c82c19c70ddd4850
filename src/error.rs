//! gmon-profile error module.

use std::io;
use std::path::PathBuf;

/// Represents errors of the loader.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Cannot open file '{1}': {0}")]
    OpenFile(#[source] io::Error, PathBuf),
    #[error("Cannot read line '{1}': {0}")]
    ReadLine(#[source] io::Error, String),
    #[error("Input/output error: {0}")]
    Io(#[from] io::Error),

    #[error("File does not contain valid gmon magic cookie")]
    Magic,
    #[error("File does not contain valid gmon header")]
    Header,
    #[error("File contains invalid record tag: {0}")]
    UnknownTag(u8),

    #[error("Dimension unit changed between histogram records from '{0}' to '{1}'")]
    DimensionMismatch(String, String),
    #[error("Dimension unit abbreviation changed between histogram records from '{0}' to '{1}'")]
    AbbrevMismatch(char, char),
    #[error("Histogram scale changed between histogram records from {0} to {1}")]
    ScaleMismatch(f64, f64),
    #[error("Found overlapping histogram records: [{0:#x}, {1:#x}) vs [{2:#x}, {3:#x})")]
    HistogramOverlap(u64, u64, u64, u64),
    #[error("Histogram record with zero bins over [{0:#x}, {1:#x})")]
    EmptyHistogram(u64, u64),
}

impl Error {
    /// Checks if the error only truncates the record being decoded.
    /// Such records are dropped while the surrounding tag scan goes on.
    pub fn is_record_local(&self) -> bool {
        matches!(self, Error::Io(_))
    }
}

/// Represents results.
pub type Result<T> = std::result::Result<T, Error>;
