use std::path::PathBuf;

use thiserror::Error;

// ---------------------------------------------------------------------------
// Normalization errors – fatal to one raw report, never to the batch
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum NormalizeError {
    /// A numeric cell could not be coerced after cleaning.  Points at a
    /// misaligned section slice rather than at bad data.  `line` is the
    /// 1-based line in the source file.
    #[error("line {line}, column {column}: cannot parse {text:?} as a number")]
    Parse {
        column: &'static str,
        line: u64,
        text: String,
    },

    /// Section arithmetic produced a range that cannot exist.
    #[error("structural mismatch: {0}")]
    StructuralMismatch(String),

    #[error("file name {0:?} is not of the form <year>_<semester>.csv")]
    FileName(PathBuf),

    #[error("reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV: {0}")]
    Csv(#[from] csv::Error),
}

// ---------------------------------------------------------------------------
// Query errors – abort one query, dataset untouched
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("unknown column {0:?}")]
    UnknownColumn(String),

    #[error("malformed filter clause {0:?}")]
    MalformedFilter(String),
}
