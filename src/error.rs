// src/error.rs
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IsinError {
    #[error("Missing configuration value: {0}")]
    MissingConfig(String),

    #[error("Invalid configuration value for {key}: {reason}")]
    InvalidConfig { key: String, reason: String },

    #[error("Identifier list must not be empty")]
    EmptyIdentifiers,

    #[error("Mapping request list must not be empty")]
    EmptyRequests,

    #[error("Invalid table name: {0}")]
    InvalidTableName(String),

    #[error("Error connecting to database: {0}")]
    Connection(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Unsupported column type for {column}: {kind}")]
    UnsupportedColumn { column: String, kind: String },

    #[error("Mapping API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Spreadsheet error: {0}")]
    Spreadsheet(#[from] rust_xlsxwriter::XlsxError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unexpected error: {0:#}")]
    Unexpected(#[from] anyhow::Error),
}

impl IsinError {
    /// True for failures that happen before or while opening the database connection.
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            IsinError::MissingConfig(_)
                | IsinError::InvalidConfig { .. }
                | IsinError::Connection(_)
        )
    }
}
