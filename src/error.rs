// ⚠️ Error types for loading and reporting
//
// Store mutations never fail loudly: an unknown farm is a `false` return.
// Only CSV ingestion and statistics have error types.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Why a single CSV row was rejected
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    #[error("expected 3 fields (date, farm, weight), found {found}")]
    MissingFields { found: usize },

    #[error("farm id is empty")]
    MissingFarmId,

    #[error("invalid date '{value}'")]
    InvalidDate { value: String },

    #[error("invalid weight '{value}'")]
    InvalidWeight { value: String },
}

/// Failure while loading a CSV file into the store
///
/// Rows applied before the failing line stay in the store.
#[derive(Error, Debug)]
pub enum DataLoadError {
    #[error("cannot open {path}: {source}")]
    FileAccess {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("read failure at line {line}: {source}")]
    Read {
        line: u64,
        #[source]
        source: csv::Error,
    },

    #[error("line {line}: {kind}")]
    Parse { line: u64, kind: ParseErrorKind },
}

impl DataLoadError {
    /// Line number (1-based, header included) where loading stopped
    pub fn line(&self) -> Option<u64> {
        match self {
            DataLoadError::FileAccess { .. } => None,
            DataLoadError::Read { line, .. } | DataLoadError::Parse { line, .. } => Some(*line),
        }
    }

    pub fn is_parse_error(&self) -> bool {
        matches!(self, DataLoadError::Parse { .. })
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReportError {
    #[error("no data in the selected range")]
    NoData,
}
