//! Error types for the pipeline

use thiserror::Error;

/// Main error type for the crate
///
/// Every per-concern error converges here via `#[from]`, so callers that
/// don't care which stage failed can work with a single type while the
/// stage-specific enums stay available for precise matching.
#[derive(Error, Debug)]
pub enum Error {
    /// Partition-key codec error
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    /// Query construction error
    #[error("Query error: {0}")]
    Query(#[from] QueryBuildError),

    /// Result normalization error
    #[error("Normalize error: {0}")]
    Normalize(#[from] NormalizeError),

    /// Table/frame manipulation error
    #[error("Frame error: {0}")]
    Frame(#[from] FrameError),

    /// Table-store client error
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// CSV source error
    #[error("CSV error: {0}")]
    Csv(#[from] CsvError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Partition-key codec errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Key is too short to hold a seconds portion, or is not a decimal
    /// integer once the millisecond digits are stripped
    #[error("Malformed partition key: {key:?}")]
    MalformedKey {
        /// The offending key string
        key: String,
    },

    /// Encoding a timestamp before the Unix epoch would produce a signed,
    /// non-sortable key
    #[error("Timestamp {timestamp} predates the Unix epoch")]
    PreEpochTimestamp {
        /// The rejected timestamp, RFC 3339
        timestamp: String,
    },
}

/// Query construction errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryBuildError {
    /// `from` and `to` are both set and equal, an ambiguous
    /// empty-or-single-instant range
    #[error("from and to are the same instant: {at}")]
    InvalidRange {
        /// The coincident bound, RFC 3339
        at: String,
    },

    /// Range bound could not be encoded as a partition key
    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Result normalization errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NormalizeError {
    /// The store returned no rows. Deliberately fatal: an empty result for
    /// a sensor has always meant a misconfigured query (wrong identity,
    /// wrong table), not legitimately absent data.
    #[error("Query returned no rows")]
    EmptyResult,

    /// A field value could not be parsed as a number
    #[error("Column {column:?} holds non-numeric value {value:?}")]
    TypeCoercion {
        /// Column name
        column: String,
        /// The unparseable value
        value: String,
    },

    /// A row's partition key could not be decoded
    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Table/frame manipulation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// A named column does not exist in the table
    #[error("Unknown column: {column:?}")]
    UnknownColumn {
        /// The missing column name
        column: String,
    },

    /// A row was supplied with the wrong number of cells
    #[error("Row has {got} cells, table has {expected} columns")]
    ColumnMismatch {
        /// Number of columns in the table
        expected: usize,
        /// Number of cells supplied
        got: usize,
    },

    /// Combining per-sensor tables requires exactly one data column each
    #[error("Table has {got} data columns, expected exactly one")]
    NotSingleColumn {
        /// Number of data columns found
        got: usize,
    },

    /// A column with this name already exists in the wide table
    #[error("Duplicate column: {column:?}")]
    DuplicateColumn {
        /// The colliding column name
        column: String,
    },
}

/// Table-store client errors
///
/// Connectivity and auth failures surface here unmodified; the core never
/// retries or swallows them.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Could not reach the store
    #[error("Connection failed: {0}")]
    Connection(String),

    /// The store rejected the request
    #[error("Request rejected: {0}")]
    Rejected(String),

    /// The store returned a response the client could not interpret
    #[error("Bad response: {0}")]
    BadResponse(String),
}

/// CSV source errors (secondary dataset and weather payloads)
#[derive(Error, Debug)]
pub enum CsvError {
    /// Underlying CSV parse failure
    #[error("CSV parse error: {0}")]
    Parse(#[from] csv::Error),

    /// A required column is missing from the header row
    #[error("Missing column: {column:?}")]
    MissingColumn {
        /// The absent column name
        column: String,
    },

    /// A cell could not be parsed as a number
    #[error("Column {column:?} holds non-numeric value {value:?}")]
    TypeCoercion {
        /// Column name
        column: String,
        /// The unparseable value
        value: String,
    },

    /// A timestamp cell could not be parsed
    #[error("Unparseable timestamp: {value:?}")]
    BadTimestamp {
        /// The unparseable value
        value: String,
    },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Config file is not valid TOML
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config parsed but failed validation
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Result type alias using the crate error
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codec_error_converts_through_layers() {
        let codec = CodecError::MalformedKey {
            key: "123".to_string(),
        };
        let normalize: NormalizeError = codec.clone().into();
        let top: Error = normalize.into();
        assert!(matches!(top, Error::Normalize(NormalizeError::Codec(_))));

        let top: Error = codec.into();
        assert!(matches!(top, Error::Codec(_)));
    }

    #[test]
    fn display_names_the_offending_value() {
        let err = NormalizeError::TypeCoercion {
            column: "pm25".to_string(),
            value: "n/a".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("pm25"));
        assert!(text.contains("n/a"));
    }
}
