//! Configuration type definitions.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Source database file configuration (.mdb).
    pub source: SourceConfig,

    /// Target database configuration (PostgreSQL).
    pub target: TargetConfig,

    /// Migration behavior configuration.
    #[serde(default)]
    pub migration: MigrationConfig,
}

/// Source database file configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Path to the Access database file.
    pub file: PathBuf,
}

/// Target database (PostgreSQL) configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Database host.
    pub host: String,

    /// Database port (default: 5432).
    #[serde(default = "default_pg_port")]
    pub port: u16,

    /// Database name.
    pub database: String,

    /// Username.
    pub user: String,

    /// Password.
    pub password: String,

    /// Target schema (default: "public").
    #[serde(default = "default_public_schema")]
    pub schema: String,
}

/// Migration behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationConfig {
    /// Target mode (default: drop_recreate).
    #[serde(default)]
    pub target_mode: TargetMode,

    /// Recreate secondary indexes on the target (default: true).
    /// When false, CREATE INDEX statements are dropped from the rewritten schema.
    #[serde(default = "default_true")]
    pub create_indexes: bool,

    /// Source tables to exclude, matched by exact name.
    #[serde(default)]
    pub exclude_tables: Vec<String>,

    /// Bytes read from the export stream per chunk (default: 64 KiB).
    #[serde(default = "default_chunk_bytes")]
    pub chunk_bytes: usize,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            target_mode: TargetMode::default(),
            create_indexes: default_true(),
            exclude_tables: Vec::new(),
            chunk_bytes: default_chunk_bytes(),
        }
    }
}

/// Policy for clearing target tables before import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetMode {
    /// Drop and recreate target tables.
    #[default]
    DropRecreate,

    /// Truncate existing tables, create only the missing ones.
    Truncate,
}

// Default value functions for serde
fn default_pg_port() -> u16 {
    5432
}

fn default_public_schema() -> String {
    "public".to_string()
}

fn default_true() -> bool {
    true
}

fn default_chunk_bytes() -> usize {
    64 * 1024
}
