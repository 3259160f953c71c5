use std::path::PathBuf;

use thiserror::Error;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of a rejected line
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    MalformedRecord,
    NonFiniteValue,
}

/// Why a single line could not be turned into a record
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum RecordError {
    #[error("no delimiter found")]
    MissingDelimiter,

    #[error("value field contains another delimiter")]
    AmbiguousValue,

    #[error("key field is empty")]
    EmptyKey,

    #[error("value field is empty")]
    EmptyValue,

    #[error("key is not valid UTF-8")]
    InvalidUtf8,

    #[error("value `{0}` is not a number")]
    InvalidNumber(String),

    #[error("value `{0}` is not finite")]
    NonFinite(String),
}

impl RecordError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RecordError::NonFinite(_) => ErrorKind::NonFiniteValue,
            _ => ErrorKind::MalformedRecord,
        }
    }
}

/// Failures that abort a whole aggregation run
#[derive(Error, Debug)]
pub enum Error {
    /// Input or output could not be opened, mapped, read or written
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A rejected line while running in strict mode
    #[error("partition {partition}: malformed record at byte {offset}: {source}")]
    Malformed {
        partition: usize,
        offset: usize,
        #[source]
        source: RecordError,
    },

    #[error("worker for partition {partition} panicked")]
    WorkerPanicked { partition: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}
