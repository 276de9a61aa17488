use thiserror::Error;

use crate::market::types::Column;

/// Failures that stop the market engine before any row is produced.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Missing column: flight batch has no {0} column")]
    MissingColumn(Column),

    #[error("Worker failed: {0} stage panicked")]
    Worker(&'static str),
}

/// Failures while reading flight CSV files.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error in {origin}: {source}")]
    Csv {
        origin: String,
        #[source]
        source: csv::Error,
    },

    #[error("Missing column in {origin}: {column} (accepted headers: {aliases})")]
    MissingColumn {
        origin: String,
        column: &'static str,
        aliases: String,
    },
}
