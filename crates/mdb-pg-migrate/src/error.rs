//! Error types for the migration library.

use thiserror::Error;

/// Main error type for migration operations.
#[derive(Error, Debug)]
pub enum MigrateError {
    /// Configuration error (invalid YAML, missing fields, missing source file, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Source introspection failed (table list, column list, or schema dump)
    #[error("Introspection error: {0}")]
    Introspection(String),

    /// The rewritten DDL document failed to execute on the target
    #[error("Schema application error: {0}")]
    SchemaApply(String),

    /// Data transfer failed for a specific table
    #[error("Transfer failed for table {table}: {message}")]
    Transfer { table: String, message: String },

    /// Clearing a target table failed
    #[error("Clear failed for table {table}: {message}")]
    Clear { table: String, message: String },

    /// Target database connection or query error
    #[error("Target database error: {0}")]
    Target(#[from] tokio_postgres::Error),

    /// IO error (file operations, subprocess pipes)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MigrateError {
    /// Create an Introspection error
    pub fn introspection(message: impl Into<String>) -> Self {
        MigrateError::Introspection(message.into())
    }

    /// Create a Transfer error
    pub fn transfer(table: impl Into<String>, message: impl Into<String>) -> Self {
        MigrateError::Transfer {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Create a Clear error
    pub fn clear(table: impl Into<String>, message: impl Into<String>) -> Self {
        MigrateError::Clear {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        // Add error chain for wrapped errors
        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }

    /// Process exit code for this error category.
    pub fn exit_code(&self) -> u8 {
        match self {
            MigrateError::Config(_) | MigrateError::Yaml(_) => 1,
            MigrateError::Introspection(_) => 2,
            MigrateError::SchemaApply(_) => 3,
            MigrateError::Transfer { .. } => 4,
            MigrateError::Clear { .. } => 5,
            MigrateError::Target(_) => 6,
            MigrateError::Io(_) => 7,
            MigrateError::Json(_) => 8,
        }
    }
}

/// Result type alias for migration operations.
pub type Result<T> = std::result::Result<T, MigrateError>;
