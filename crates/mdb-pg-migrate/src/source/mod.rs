//! MS Access source introspection and export via the mdb-tools suite.

mod types;

pub use types::*;

use crate::config::SourceConfig;
use crate::error::{MigrateError, Result};
use crate::stream::RowExport;
use async_trait::async_trait;
use bytes::Bytes;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStdout, Command};
use tracing::{debug, info};

/// Read access to the source database catalog and data.
#[async_trait]
pub trait SchemaSource: Send + Sync {
    /// List table names in catalog order.
    async fn table_names(&self) -> Result<Vec<String>>;

    /// Table names with row counts, for tables where the tooling reports one.
    async fn row_counts(&self) -> Result<Vec<(String, i64)>>;

    /// Column names of one table in declared order.
    async fn column_names(&self, table: &str) -> Result<Vec<String>>;

    /// Schema dump for the whole file in PostgreSQL dialect.
    async fn schema_dump(&self) -> Result<String>;

    /// Start a CSV export of one table.
    async fn export(&self, table: &str) -> Result<Box<dyn RowExport>>;
}

/// An Access database file read through the mdb-tools commands.
pub struct MdbFile {
    file: PathBuf,
    chunk_bytes: usize,
}

impl MdbFile {
    pub fn new(config: &SourceConfig, chunk_bytes: usize) -> Result<Self> {
        let file = config.file.clone();
        if !file.is_file() {
            return Err(MigrateError::Config(format!(
                "source file {} does not exist",
                file.display()
            )));
        }
        info!(file = %file.display(), "opened source database");
        Ok(Self { file, chunk_bytes })
    }

    /// Run one mdb-tools command to completion and return its stdout.
    /// A non-zero exit is an introspection failure carrying the stderr text.
    async fn run_tool(&self, mut cmd: Command, what: &str) -> Result<String> {
        debug!(command = what, "running introspection tool");
        let output = cmd.output().await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(MigrateError::introspection(format!(
                "{} failed with {}: {}",
                what,
                output.status,
                stderr.trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl SchemaSource for MdbFile {
    async fn table_names(&self) -> Result<Vec<String>> {
        let mut cmd = Command::new("mdb-tables");
        cmd.arg("-1").arg(&self.file);
        let out = self.run_tool(cmd, "mdb-tables -1").await?;
        let names = parse_table_list(&out);
        debug!(count = names.len(), "listed tables");
        Ok(names)
    }

    async fn row_counts(&self) -> Result<Vec<(String, i64)>> {
        let mut cmd = Command::new("mdb-tables");
        cmd.arg("-r").arg(&self.file);
        let out = self.run_tool(cmd, "mdb-tables -r").await?;
        Ok(parse_row_counts(&out))
    }

    async fn column_names(&self, table: &str) -> Result<Vec<String>> {
        let mut cmd = Command::new("mdb-describe");
        cmd.arg(&self.file).arg(table);
        let out = self.run_tool(cmd, "mdb-describe").await?;
        let columns = parse_column_names(&out);
        debug!(table, count = columns.len(), "described columns");
        Ok(columns)
    }

    async fn schema_dump(&self) -> Result<String> {
        let mut cmd = Command::new("mdb-schema");
        cmd.arg(&self.file).arg("postgres");
        self.run_tool(cmd, "mdb-schema").await
    }

    async fn export(&self, table: &str) -> Result<Box<dyn RowExport>> {
        let mut child = Command::new("mdb-export")
            .arg("-b")
            .arg("strip")
            .arg("-H")
            .arg(&self.file)
            .arg(table)
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()?;
        let stdout = child.stdout.take().ok_or_else(|| {
            MigrateError::transfer(table, "mdb-export stdout was not captured")
        })?;
        debug!(table, "started export");
        Ok(Box::new(TableExport {
            table: table.to_string(),
            child,
            reader: BufReader::with_capacity(self.chunk_bytes, stdout),
        }))
    }
}

/// A spawned mdb-export process streamed chunk by chunk.
///
/// The child is killed if the export is dropped mid-stream, and its exit
/// status is checked at end of stream so a failed export can never pass for
/// a complete one.
struct TableExport {
    table: String,
    child: Child,
    reader: BufReader<ChildStdout>,
}

impl TableExport {
    async fn check_exit(&mut self) -> Result<()> {
        let status = self.child.wait().await?;
        if !status.success() {
            return Err(MigrateError::transfer(
                &self.table,
                format!("mdb-export exited with {}", status),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl RowExport for TableExport {
    async fn header_line(&mut self) -> Result<String> {
        let mut line = String::new();
        let n = self.reader.read_line(&mut line).await?;
        if n == 0 {
            self.check_exit().await?;
            return Err(MigrateError::transfer(
                &self.table,
                "export produced no header line",
            ));
        }
        while line.ends_with('\n') || line.ends_with('\r') {
            line.pop();
        }
        Ok(line)
    }

    async fn next_chunk(&mut self) -> Result<Option<Bytes>> {
        let buf = self.reader.fill_buf().await?;
        if buf.is_empty() {
            self.check_exit().await?;
            return Ok(None);
        }
        let chunk = Bytes::copy_from_slice(buf);
        self.reader.consume(chunk.len());
        Ok(Some(chunk))
    }
}

fn parse_table_list(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}

/// Parse `mdb-tables -r` output. Lines that do not hold exactly a name and
/// a numeric count, such as names containing spaces, are skipped; those
/// tables simply migrate without a known row count.
fn parse_row_counts(output: &str) -> Vec<(String, i64)> {
    output
        .lines()
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() != 2 {
                return None;
            }
            let count = fields[1].parse::<i64>().ok()?;
            Some((fields[0].to_string(), count))
        })
        .collect()
}

fn parse_column_names(output: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(|line| line.split_whitespace().next().map(String::from))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_table_list_skips_blank_lines() {
        let out = "Orders\n\nOrderItem\n  \nCustomers\n";
        assert_eq!(
            parse_table_list(out),
            vec!["Orders", "OrderItem", "Customers"]
        );
    }

    #[test]
    fn test_parse_row_counts_skips_malformed_lines() {
        let out = "Orders 120\nOrder Item 5\nCustomers 0\nNotes abc\n\n";
        assert_eq!(
            parse_row_counts(out),
            vec![("Orders".to_string(), 120), ("Customers".to_string(), 0)]
        );
    }

    #[test]
    fn test_parse_column_names_takes_first_token() {
        let out = "OrderId Long Integer\nShipDate DateTime\n\nNotes Memo/Hyperlink\n";
        assert_eq!(
            parse_column_names(out),
            vec!["OrderId", "ShipDate", "Notes"]
        );
    }

    #[tokio::test]
    async fn test_export_nonzero_exit_fails_the_stream() {
        // A child that produces output and then fails must error the stream
        // at end of output instead of passing for a complete export.
        let mut child = Command::new("sh")
            .arg("-c")
            .arg("printf 'Id,Name\\n1,Widget\\n'; exit 3")
            .stdout(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .unwrap();
        let stdout = child.stdout.take().unwrap();
        let mut export = TableExport {
            table: "Orders".to_string(),
            child,
            reader: BufReader::with_capacity(64, stdout),
        };

        assert_eq!(export.header_line().await.unwrap(), "Id,Name");

        let mut tail = Vec::new();
        let err = loop {
            match export.next_chunk().await {
                Ok(Some(chunk)) => tail.extend_from_slice(&chunk),
                Ok(None) => panic!("exit status 3 must fail the stream"),
                Err(e) => break e,
            }
        };
        assert_eq!(tail, b"1,Widget\n");
        assert!(err.to_string().contains("mdb-export exited with"));
    }
}
