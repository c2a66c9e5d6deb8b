//! # mdb-pg-migrate
//!
//! Streaming MS Access (.mdb) to PostgreSQL migration library.
//!
//! This library provides the core functionality for migrating an Access
//! database file to PostgreSQL with support for:
//!
//! - **Streaming imports** using the PostgreSQL COPY protocol
//! - **snake_case renaming** of every table and column on the way in
//! - **Schema rewriting** of the mdb-tools DDL dump before it is applied
//! - **Failure isolation** so one broken table never aborts the run
//! - **Rename scripts** for converting an already-imported database in place
//!
//! ## Example
//!
//! ```rust,no_run
//! use mdb_pg_migrate::{Config, Orchestrator};
//!
//! #[tokio::main]
//! async fn main() -> mdb_pg_migrate::Result<()> {
//!     let config = Config::load("config.yaml")?;
//!     let orchestrator = Orchestrator::new(config).await?;
//!     let result = orchestrator.run().await?;
//!     println!("Imported {} rows", result.rows_transferred);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod identifier;
pub mod orchestrator;
pub mod rename;
pub mod schema;
pub mod source;
pub mod stream;
pub mod target;

// Re-exports for convenient access
pub use config::{Config, MigrationConfig, SourceConfig, TargetConfig, TargetMode};
pub use error::{MigrateError, Result};
pub use identifier::{normalize, IdentifierMap};
pub use orchestrator::{MigrationResult, Orchestrator, TableReport, TableStatus};
pub use rename::{build_rename_statements, default_script_name, render_script};
pub use source::{MdbFile, SchemaSource, TableInfo};
pub use target::{PgStore, TargetStore};
