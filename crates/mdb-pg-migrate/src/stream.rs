//! Row streaming between the source export and the COPY sink.

use crate::error::{MigrateError, Result};
use crate::identifier::{normalize, IdentifierMap};
use async_trait::async_trait;
use bytes::Bytes;

/// A running CSV export for one table. The header line is consumed
/// separately so it can be rewritten before the rows follow it.
#[async_trait]
pub trait RowExport: Send {
    /// First line of the export, without the trailing newline.
    async fn header_line(&mut self) -> Result<String>;

    /// Next chunk of row bytes after the header. Returns None at end of
    /// stream, after the producer has been checked for a clean exit.
    async fn next_chunk(&mut self) -> Result<Option<Bytes>>;
}

/// Chunked byte stream fed into the COPY sink.
#[async_trait]
pub trait RowStream: Send {
    async fn next_chunk(&mut self) -> Result<Option<Bytes>>;
}

/// Prepends a rewritten header line to an export's row chunks.
///
/// The header is emitted as its own chunk; row bytes pass through exactly as
/// the export produced them, so no part of the stream is buffered beyond the
/// export's own chunking.
pub struct HeaderRewriteStream {
    header: Option<Bytes>,
    inner: Box<dyn RowExport>,
}

impl HeaderRewriteStream {
    pub fn new(header: String, inner: Box<dyn RowExport>) -> Self {
        let mut line = header.into_bytes();
        line.push(b'\n');
        Self {
            header: Some(Bytes::from(line)),
            inner,
        }
    }
}

#[async_trait]
impl RowStream for HeaderRewriteStream {
    async fn next_chunk(&mut self) -> Result<Option<Bytes>> {
        if let Some(header) = self.header.take() {
            return Ok(Some(header));
        }
        self.inner.next_chunk().await
    }
}

/// Rewrite an export header line to target column names.
///
/// Fields map positionally onto the declared column list, so a width
/// mismatch means the export and the catalog disagree about the table and
/// the transfer must not proceed.
pub fn rewrite_header(
    map: &IdentifierMap,
    table: &str,
    declared: &[String],
    header: &str,
) -> Result<String> {
    let fields: Vec<&str> = header.split(',').collect();
    if fields.len() != declared.len() {
        return Err(MigrateError::transfer(
            table,
            format!(
                "export header has {} fields but the table declares {} columns",
                fields.len(),
                declared.len()
            ),
        ));
    }
    let renamed: Vec<String> = fields
        .iter()
        .zip(declared)
        .map(|(field, source)| {
            map.column(table, source)
                .map(str::to_string)
                .unwrap_or_else(|| normalize(field))
        })
        .collect();
    Ok(renamed.join(","))
}
