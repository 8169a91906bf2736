use thiserror::Error;

/// Result alias for `membership`.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by filters, clusterers and option parsing.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// A filter was used before its input schema was set, or an output
    /// schema was requested before one exists.
    #[error("invalid state: {0}")]
    InvalidState(&'static str),

    /// Input was empty.
    #[error("empty input provided")]
    EmptyInput,

    /// Record or matrix dimension mismatch.
    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch {
        /// Expected dimension.
        expected: usize,
        /// Found dimension.
        found: usize,
    },

    /// Invalid number of clusters requested.
    #[error("cannot create {requested} clusters from {n_items} items")]
    InvalidClusterCount {
        /// Requested count.
        requested: usize,
        /// Number of items.
        n_items: usize,
    },

    /// Invalid parameter value.
    #[error("invalid parameter '{name}': {message}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Error message.
        message: &'static str,
    },

    /// A column range string could not be parsed.
    #[error("invalid column range '{range}': {reason}")]
    InvalidRange {
        /// The offending range text.
        range: String,
        /// What was wrong with it.
        reason: String,
    },

    /// Option parsing failed.
    #[error("configuration error: {0}")]
    Config(String),

    /// No clusterer is registered under this name.
    #[error("unknown clusterer '{0}'")]
    UnknownClusterer(String),

    /// The clusterer was queried before `fit`.
    #[error("clusterer has not been fitted")]
    NotFitted,

    /// Two schemas that must agree do not.
    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}
