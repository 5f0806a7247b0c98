//! Error types for model-sync

use thiserror::Error;

/// Result type for model-sync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for model-sync
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed connection config or data model. Raised before any
    /// database work.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A module connection could not be opened or authenticated.
    #[error("Connection error for module '{module}': {message}")]
    Connect { module: String, message: String },

    /// Model references an unknown module, or a module's default storage
    /// engine is not InnoDB.
    #[error("Integrity error: {0}")]
    Integrity(String),

    /// A SHOW or information_schema query failed.
    #[error("Introspection failed on module '{module}' (schema {schema}): {message}\n  Statement: {statement}")]
    Introspection {
        module: String,
        schema: String,
        statement: String,
        message: String,
    },

    /// An emitted DDL statement failed.
    #[error("DDL failed on module '{module}' (schema {schema}): {message}\n  Statement: {statement}")]
    Ddl {
        module: String,
        schema: String,
        statement: String,
        message: String,
    },

    /// The operator declined the master prompt or aborted a menu.
    #[error("Cancelled by user")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a Connect error for a module
    pub fn connect(module: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Connect {
            module: module.into(),
            message: message.into(),
        }
    }

    /// Create an Introspection error carrying the offending statement
    pub fn introspection(
        module: impl Into<String>,
        schema: impl Into<String>,
        statement: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Error::Introspection {
            module: module.into(),
            schema: schema.into(),
            statement: statement.into(),
            message: message.into(),
        }
    }

    /// Create a Ddl error carrying the offending statement
    pub fn ddl(
        module: impl Into<String>,
        schema: impl Into<String>,
        statement: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Error::Ddl {
            module: module.into(),
            schema: schema.into(),
            statement: statement.into(),
            message: message.into(),
        }
    }

    /// Process exit code for this error: 1 for failures caught before any
    /// database work, 2 for database-side failures, 3 when the operator
    /// cancelled.
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::Config(_) | Error::Integrity(_) | Error::Io(_) => 1,
            Error::Connect { .. } | Error::Introspection { .. } | Error::Ddl { .. } => 2,
            Error::Cancelled => 3,
        }
    }
}
