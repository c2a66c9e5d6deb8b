//! PostgreSQL target database operations.

use crate::config::TargetConfig;
use crate::error::{MigrateError, Result};
use crate::rename::{CatalogIndex, CatalogRelation, RelationKind};
use crate::stream::RowStream;
use async_trait::async_trait;
use futures::SinkExt;
use tokio_postgres::{Client, Config as PgConfig, NoTls};
use tracing::{debug, error, info};

/// Write access to the target database, scoped to one schema.
#[async_trait]
pub trait TargetStore: Send {
    /// Drop a table if it exists.
    async fn drop_table(&mut self, table: &str) -> Result<()>;

    /// Truncate a table.
    async fn truncate_table(&mut self, table: &str) -> Result<()>;

    /// Check if a table exists in the configured schema.
    async fn table_exists(&mut self, table: &str) -> Result<bool>;

    /// Apply schema DDL inside a single transaction.
    async fn apply_schema(&mut self, sql: &str) -> Result<()>;

    /// Stream rows into a table with COPY and return the copied row count.
    async fn copy_rows(&mut self, table: &str, rows: &mut dyn RowStream) -> Result<u64>;
}

/// PostgreSQL target on a single connection. The migration writes tables one
/// at a time, so one connection is all it ever needs.
pub struct PgStore {
    client: Client,
    schema: String,
}

impl PgStore {
    /// Connect and verify the connection with a round trip.
    pub async fn connect(config: &TargetConfig) -> Result<Self> {
        let mut pg_config = PgConfig::new();
        pg_config.host(&config.host);
        pg_config.port(config.port);
        pg_config.dbname(&config.database);
        pg_config.user(&config.user);
        pg_config.password(&config.password);

        let (client, connection) = pg_config.connect(NoTls).await?;
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!(error = %e, "postgres connection ended");
            }
        });

        client.simple_query("SELECT 1").await?;
        info!(
            host = %config.host,
            port = config.port,
            database = %config.database,
            "connected to PostgreSQL"
        );

        Ok(Self {
            client,
            schema: config.schema.clone(),
        })
    }

    /// Quote a PostgreSQL identifier.
    fn quote_ident(name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    /// Fully qualify a table name with the configured schema.
    fn qualify(&self, table: &str) -> String {
        format!(
            "{}.{}",
            Self::quote_ident(&self.schema),
            Self::quote_ident(table)
        )
    }

    /// Load tables and views of the schema with their columns in ordinal
    /// order, for rename script generation.
    pub async fn relations(&self) -> Result<Vec<CatalogRelation>> {
        let rows = self
            .client
            .query(
                "SELECT t.table_name, t.table_type, c.column_name
                 FROM information_schema.tables t
                 JOIN information_schema.columns c
                   ON c.table_schema = t.table_schema AND c.table_name = t.table_name
                 WHERE t.table_schema = $1 AND t.table_type IN ('BASE TABLE', 'VIEW')
                 ORDER BY t.table_name, c.ordinal_position",
                &[&self.schema],
            )
            .await?;

        let mut relations: Vec<CatalogRelation> = Vec::new();
        for row in rows {
            let name: String = row.get(0);
            let table_type: String = row.get(1);
            let column: String = row.get(2);
            match relations.last_mut() {
                Some(rel) if rel.name == name => rel.columns.push(column),
                _ => relations.push(CatalogRelation {
                    name,
                    kind: if table_type == "VIEW" {
                        RelationKind::View
                    } else {
                        RelationKind::Table
                    },
                    columns: vec![column],
                }),
            }
        }
        debug!(count = relations.len(), "loaded relations");
        Ok(relations)
    }

    /// Load index names of the schema with the table each one belongs to.
    pub async fn indexes(&self) -> Result<Vec<CatalogIndex>> {
        let rows = self
            .client
            .query(
                "SELECT indexname, tablename FROM pg_indexes
                 WHERE schemaname = $1 ORDER BY indexname",
                &[&self.schema],
            )
            .await?;
        Ok(rows
            .iter()
            .map(|row| CatalogIndex {
                name: row.get(0),
                table: row.get(1),
            })
            .collect())
    }

    /// Run a generated rename script inside a single transaction.
    pub async fn execute_script(&mut self, sql: &str) -> Result<()> {
        let tx = self.client.transaction().await?;
        tx.batch_execute(sql).await?;
        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl TargetStore for PgStore {
    async fn drop_table(&mut self, table: &str) -> Result<()> {
        let sql = format!("DROP TABLE IF EXISTS {} CASCADE", self.qualify(table));
        self.client.execute(&sql, &[]).await?;
        debug!(table, "dropped table");
        Ok(())
    }

    async fn truncate_table(&mut self, table: &str) -> Result<()> {
        let sql = format!("TRUNCATE TABLE {} CASCADE", self.qualify(table));
        self.client.execute(&sql, &[]).await?;
        debug!(table, "truncated table");
        Ok(())
    }

    async fn table_exists(&mut self, table: &str) -> Result<bool> {
        let row = self
            .client
            .query_one(
                "SELECT EXISTS (
                    SELECT 1 FROM information_schema.tables
                    WHERE table_schema = $1 AND table_name = $2
                )",
                &[&self.schema, &table],
            )
            .await?;
        Ok(row.get(0))
    }

    async fn apply_schema(&mut self, sql: &str) -> Result<()> {
        let tx = self.client.transaction().await?;
        tx.batch_execute(sql)
            .await
            .map_err(|e| MigrateError::SchemaApply(e.to_string()))?;
        tx.commit().await?;
        debug!("applied schema");
        Ok(())
    }

    /// COPY the stream into the table. A stream error propagates before the
    /// sink is finished, which drops the sink and aborts the COPY, so a
    /// failed export never leaves a partial load behind.
    async fn copy_rows(&mut self, table: &str, rows: &mut dyn RowStream) -> Result<u64> {
        let stmt = format!(
            "COPY {} FROM STDIN WITH (FORMAT csv, HEADER true)",
            self.qualify(table)
        );
        let sink = self.client.copy_in(&stmt).await?;
        futures::pin_mut!(sink);

        while let Some(chunk) = rows.next_chunk().await? {
            sink.send(chunk).await?;
        }

        let copied = sink.finish().await?;
        debug!(table, rows = copied, "copy complete");
        Ok(copied)
    }
}
