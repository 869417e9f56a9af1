use std::path::PathBuf;

use thiserror::Error;

/// Errors returned by the categorization pipeline and its clustering primitives.
#[derive(Debug, Error)]
pub enum Error {
    /// The run configuration is invalid, or the input does not match it.
    ///
    /// Always raised before any embedding work is attempted.
    #[error("configuration error: {message}")]
    Configuration {
        /// Human-readable explanation naming the offending field.
        message: String,
    },

    /// The configuration file could not be read.
    #[error("failed to read config file at {path:?}")]
    ReadConfig {
        /// Path that was read.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML for [`crate::PipelineConfig`].
    #[error("failed to parse config file at {path:?}")]
    ParseConfig {
        /// Path that was parsed.
        path: PathBuf,
        /// Underlying TOML error.
        source: toml::de::Error,
    },

    /// No non-empty remarks remain after filtering.
    #[error("empty input: no non-empty remarks to cluster")]
    EmptyInput,

    /// Invalid parameter value.
    #[error("invalid parameter {name}: {message}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Human-readable explanation.
        message: &'static str,
    },

    /// Requested group count is incompatible with the dataset.
    #[error("invalid cluster count: requested {requested}, but dataset has {n_items} items")]
    InvalidClusterCount {
        /// Requested number of groups.
        requested: usize,
        /// Number of items in the dataset.
        n_items: usize,
    },

    /// Points in a dataset have inconsistent dimensionality.
    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch {
        /// Expected dimensionality.
        expected: usize,
        /// Found dimensionality.
        found: usize,
    },
}

impl Error {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}

/// Result type used by this crate.
pub type Result<T> = std::result::Result<T, Error>;
