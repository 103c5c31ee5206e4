// SPDX-License-Identifier: Apache-2.0

use datafusion::common::DataFusionError;
use thiserror::Error;

/// Result type for JDBC connector operations
pub type JdbcResult<T> = Result<T, JdbcError>;

/// Errors raised while provisioning drivers and scanning JDBC tables
#[derive(Debug, Error)]
pub enum JdbcError {
    /// The driver artifact could not be fetched, verified, or loaded from the cache
    #[error("failed to resolve JDBC driver {name}: {message}")]
    DriverResolution { name: String, message: String },

    /// The remote scan could not be opened (connection, authentication, query)
    #[error("failed to open JDBC scan: {0}")]
    ScanOpen(String),

    /// The remote scan failed while reading batches
    #[error("failed to read JDBC scan: {0}")]
    ScanRead(String),

    /// The operation is not allowed in the current scan state
    #[error("invalid scan state: {0}")]
    InvalidState(String),

    /// A caller contract was violated
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Invalid data source options
    #[error("invalid JDBC options: {0}")]
    InvalidOptions(String),

    /// Configuration could not be loaded
    #[error("configuration error: {0}")]
    Config(#[from] figment::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Python bridge error
    #[cfg(feature = "python")]
    #[error("Python bridge error: {0}")]
    Python(#[from] pyo3::PyErr),
}

impl JdbcError {
    pub fn driver(name: impl Into<String>, message: impl Into<String>) -> Self {
        JdbcError::DriverResolution {
            name: name.into(),
            message: message.into(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        JdbcError::InvalidArgument(message.into())
    }

    pub fn state(message: impl Into<String>) -> Self {
        JdbcError::InvalidState(message.into())
    }

    pub fn options(message: impl Into<String>) -> Self {
        JdbcError::InvalidOptions(message.into())
    }
}

impl From<JdbcError> for DataFusionError {
    fn from(err: JdbcError) -> Self {
        DataFusionError::External(Box::new(err))
    }
}
