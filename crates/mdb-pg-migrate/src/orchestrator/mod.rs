//! Migration orchestrator - main workflow coordinator.

use crate::config::{Config, TargetMode};
use crate::error::{MigrateError, Result};
use crate::identifier::{normalize, IdentifierMap};
use crate::schema::SchemaRewriter;
use crate::source::{MdbFile, SchemaSource, TableInfo};
use crate::stream::{rewrite_header, HeaderRewriteStream};
use crate::target::{PgStore, TargetStore};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::time::Instant;
use tracing::{error, info, warn};

/// Migration orchestrator. Tables are processed strictly one at a time;
/// a table that fails is recorded and the run moves on to the next one.
pub struct Orchestrator {
    config: Config,
    source: Box<dyn SchemaSource>,
    target: Box<dyn TargetStore>,
}

/// Result of a migration run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationResult {
    /// Unique run identifier.
    pub run_id: String,

    /// Final status.
    pub status: String,

    /// Total duration in seconds.
    pub duration_seconds: f64,

    /// When the migration started.
    pub started_at: DateTime<Utc>,

    /// When the migration completed.
    pub completed_at: DateTime<Utc>,

    /// Tables discovered after exclusions.
    pub tables_total: usize,

    /// Tables copied to the target.
    pub tables_imported: usize,

    /// Tables skipped because the source reports them empty.
    pub tables_skipped: usize,

    /// Tables that failed.
    pub tables_failed: usize,

    /// Total rows copied.
    pub rows_transferred: u64,

    /// Source names of failed tables.
    pub failed_tables: Vec<String>,

    /// Per-table outcomes in processing order.
    pub tables: Vec<TableReport>,
}

impl MigrationResult {
    /// Convert to JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Outcome of one table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableReport {
    /// Source table name.
    pub table: String,

    /// Table name on the target.
    pub target_table: String,

    pub status: TableStatus,

    /// Rows copied.
    pub rows: u64,

    pub duration_seconds: f64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableStatus {
    Imported,
    Skipped,
    Failed,
}

impl TableStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TableStatus::Imported => "imported",
            TableStatus::Skipped => "skipped",
            TableStatus::Failed => "failed",
        }
    }
}

impl Orchestrator {
    /// Create a new orchestrator connected to the configured source and target.
    pub async fn new(config: Config) -> Result<Self> {
        let source = MdbFile::new(&config.source, config.migration.chunk_bytes)?;
        let target = PgStore::connect(&config.target).await?;
        Ok(Self {
            config,
            source: Box::new(source),
            target: Box::new(target),
        })
    }

    /// Assemble an orchestrator from preconstructed collaborators.
    pub fn from_parts(
        config: Config,
        source: Box<dyn SchemaSource>,
        target: Box<dyn TargetStore>,
    ) -> Self {
        Self {
            config,
            source,
            target,
        }
    }

    /// Run the migration.
    pub async fn run(mut self) -> Result<MigrationResult> {
        let started_at = Utc::now();
        let run_id = uuid::Uuid::new_v4().to_string();
        info!(run_id = %run_id, "starting migration run");

        let tables = self.discover_tables().await?;
        info!(count = tables.len(), "discovered tables");

        let map = IdentifierMap::build(&tables)?;

        self.prepare_target(&tables, &map).await?;

        let reports = self.import_tables(&tables, &map).await;

        let completed_at = Utc::now();
        let duration = (completed_at - started_at).num_milliseconds() as f64 / 1000.0;

        let tables_imported = reports
            .iter()
            .filter(|r| r.status == TableStatus::Imported)
            .count();
        let tables_skipped = reports
            .iter()
            .filter(|r| r.status == TableStatus::Skipped)
            .count();
        let failed_tables: Vec<String> = reports
            .iter()
            .filter(|r| r.status == TableStatus::Failed)
            .map(|r| r.table.clone())
            .collect();
        let rows_transferred: u64 = reports.iter().map(|r| r.rows).sum();

        let status = if failed_tables.is_empty() {
            "completed"
        } else {
            "completed_with_failures"
        };

        info!(
            status,
            tables = reports.len(),
            imported = tables_imported,
            failed = failed_tables.len(),
            rows = rows_transferred,
            duration_seconds = duration,
            "migration finished"
        );

        Ok(MigrationResult {
            run_id,
            status: status.to_string(),
            duration_seconds: duration,
            started_at,
            completed_at,
            tables_total: reports.len(),
            tables_imported,
            tables_skipped,
            tables_failed: failed_tables.len(),
            rows_transferred,
            failed_tables,
            tables: reports,
        })
    }

    /// Discover tables with their row counts and columns, applying the
    /// configured exclusions. A source without tables is a hard error.
    async fn discover_tables(&self) -> Result<Vec<TableInfo>> {
        let names = self.source.table_names().await?;
        if names.is_empty() {
            return Err(MigrateError::introspection("source database lists no tables"));
        }

        let excluded = &self.config.migration.exclude_tables;
        let names: Vec<String> = names
            .into_iter()
            .filter(|name| !excluded.contains(name))
            .collect();
        if names.is_empty() {
            return Err(MigrateError::introspection(
                "every table is excluded by configuration",
            ));
        }

        let counts: HashMap<String, i64> = self.source.row_counts().await?.into_iter().collect();

        let mut tables = Vec::with_capacity(names.len());
        for name in names {
            let columns = self.source.column_names(&name).await?;
            tables.push(TableInfo {
                row_count: counts.get(&name).copied(),
                columns,
                name,
            });
        }
        Ok(tables)
    }

    /// Clear target tables per the configured mode, then rewrite and apply
    /// the schema. A clear failure is logged and skipped; a schema failure
    /// stops the run before any data moves.
    async fn prepare_target(&mut self, tables: &[TableInfo], map: &IdentifierMap) -> Result<()> {
        let mode = self.config.migration.target_mode;
        info!(mode = ?mode, "preparing target");

        for table in tables {
            let target_name = target_name(map, &table.name);
            if let Err(e) = self.clear_table(&target_name, mode).await {
                warn!(table = %table.name, error = %e, "clear failed, continuing");
            }
        }

        let dump = self.source.schema_dump().await?;
        let rewriter = SchemaRewriter::new(map, tables, self.config.migration.create_indexes);
        let mut doc = rewriter.rewrite(&dump)?;

        if mode == TargetMode::Truncate {
            // Truncated tables keep their schema; only create what is missing.
            let mut missing = HashSet::new();
            for table in tables {
                let target = target_name(map, &table.name);
                if !self.target.table_exists(&target).await? {
                    missing.insert(table.name.clone());
                }
            }
            doc.statements.retain(|s| match &s.table {
                Some(source) => missing.contains(source),
                None => false,
            });
        }

        if doc.is_empty() {
            info!("no schema statements to apply");
            return Ok(());
        }
        self.target.apply_schema(&doc.render()).await?;
        info!(statements = doc.statements.len(), "schema applied");
        Ok(())
    }

    async fn clear_table(&mut self, table: &str, mode: TargetMode) -> Result<()> {
        match mode {
            TargetMode::DropRecreate => self.target.drop_table(table).await,
            TargetMode::Truncate => match self.target.table_exists(table).await {
                Ok(true) => self.target.truncate_table(table).await,
                Ok(false) => Ok(()),
                Err(e) => Err(e),
            },
        }
        .map_err(|e| MigrateError::clear(table, e.to_string()))
    }

    /// Import every table, one at a time. Failures are recorded in the
    /// report and never abort the loop.
    async fn import_tables(
        &mut self,
        tables: &[TableInfo],
        map: &IdentifierMap,
    ) -> Vec<TableReport> {
        let mut reports = Vec::with_capacity(tables.len());
        for table in tables {
            let target_table = target_name(map, &table.name);
            let started = Instant::now();

            if table.row_count == Some(0) {
                info!(table = %table.name, "skipping empty table");
                reports.push(TableReport {
                    table: table.name.clone(),
                    target_table,
                    status: TableStatus::Skipped,
                    rows: 0,
                    duration_seconds: started.elapsed().as_secs_f64(),
                    error: None,
                });
                continue;
            }

            let outcome = self
                .transfer_table(table, map, &target_table)
                .await
                .map_err(|e| match e {
                    e @ MigrateError::Transfer { .. } => e,
                    other => MigrateError::transfer(&table.name, other.to_string()),
                });

            let duration_seconds = started.elapsed().as_secs_f64();
            let report = match outcome {
                Ok(rows) => {
                    info!(table = %table.name, rows, "table imported");
                    TableReport {
                        table: table.name.clone(),
                        target_table,
                        status: TableStatus::Imported,
                        rows,
                        duration_seconds,
                        error: None,
                    }
                }
                Err(e) => {
                    error!(table = %table.name, error = %e, "table import failed");
                    TableReport {
                        table: table.name.clone(),
                        target_table,
                        status: TableStatus::Failed,
                        rows: 0,
                        duration_seconds,
                        error: Some(e.to_string()),
                    }
                }
            };
            reports.push(report);
        }
        reports
    }

    async fn transfer_table(
        &mut self,
        table: &TableInfo,
        map: &IdentifierMap,
        target_table: &str,
    ) -> Result<u64> {
        let mut export = self.source.export(&table.name).await?;
        let header = export.header_line().await?;
        let rewritten = rewrite_header(map, &table.name, &table.columns, &header)?;
        let mut stream = HeaderRewriteStream::new(rewritten, export);
        self.target.copy_rows(target_table, &mut stream).await
    }
}

fn target_name(map: &IdentifierMap, source: &str) -> String {
    map.table(source)
        .map(str::to_string)
        .unwrap_or_else(|| normalize(source))
}
