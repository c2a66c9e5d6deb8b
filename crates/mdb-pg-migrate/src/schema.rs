//! Parsing and rewrite of the schema dump produced by mdb-schema.

use crate::error::{MigrateError, Result};
use crate::identifier::{guess_primary_key, normalize, IdentifierMap};
use crate::source::TableInfo;
use once_cell::sync::Lazy;
use regex::Regex;

static STATEMENT_SPLIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*;\s*").unwrap());
static CREATE_TABLE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)CREATE\s+TABLE\s+(?:IF\s+NOT\s+EXISTS\s+)?"([^"]+)""#).unwrap());
static ALTER_TABLE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)ALTER\s+TABLE\s+(?:ONLY\s+)?"([^"]+)""#).unwrap());
static INDEX_ON: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)\bON\s+"([^"]+)"\s*\(([^)]*)\)"#).unwrap());
static LEADING_COLUMN: Lazy<Regex> = Lazy::new(|| Regex::new(r#"^(\s*)"([^"]+)""#).unwrap());
static EMPTY_PRIMARY_KEY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)PRIMARY\s+KEY\s*\(\s*\)").unwrap());

/// Statement classification, decided by the first non-comment line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    CreateTable,
    CreateIndex,
    AlterTable,
    Other,
}

/// One statement of the schema dump.
#[derive(Debug, Clone)]
pub struct SchemaStatement {
    /// Statement text without the trailing semicolon.
    pub sql: String,

    pub kind: StatementKind,

    /// Source table the statement applies to, captured at parse time so
    /// lookups keyed by source names survive the rename steps.
    pub table: Option<String>,
}

/// A schema dump split into classified statements.
#[derive(Debug, Clone, Default)]
pub struct SchemaDocument {
    pub statements: Vec<SchemaStatement>,
}

impl SchemaDocument {
    /// Split a dump on semicolon boundaries and classify each statement.
    /// Comment lines stay attached to the statement that follows them.
    pub fn parse(ddl: &str) -> Self {
        let statements = STATEMENT_SPLIT
            .split(ddl)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|sql| {
                let kind = classify(sql);
                let table = attribute(sql, kind);
                SchemaStatement {
                    sql: sql.to_string(),
                    kind,
                    table,
                }
            })
            .collect();
        Self { statements }
    }

    /// Join the statements back into executable SQL, one semicolon after
    /// each. Parsing then rendering canonical input is byte-identical.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for stmt in &self.statements {
            out.push_str(&stmt.sql);
            out.push(';');
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}

fn classify(sql: &str) -> StatementKind {
    let first = sql
        .lines()
        .map(str::trim_start)
        .find(|line| !line.is_empty() && !line.starts_with("--"));
    let Some(line) = first else {
        return StatementKind::Other;
    };
    let upper = line.to_uppercase();
    if upper.starts_with("CREATE TABLE") {
        StatementKind::CreateTable
    } else if upper.starts_with("CREATE INDEX") || upper.starts_with("CREATE UNIQUE INDEX") {
        StatementKind::CreateIndex
    } else if upper.starts_with("ALTER TABLE") {
        StatementKind::AlterTable
    } else {
        StatementKind::Other
    }
}

fn attribute(sql: &str, kind: StatementKind) -> Option<String> {
    let re = match kind {
        StatementKind::CreateTable => &CREATE_TABLE_NAME,
        StatementKind::CreateIndex => &INDEX_ON,
        StatementKind::AlterTable => &ALTER_TABLE_NAME,
        StatementKind::Other => return None,
    };
    re.captures(sql)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Rewrites a parsed schema dump to target naming.
///
/// The steps run per statement: quoted table names are replaced everywhere,
/// CREATE TABLE column lists and CREATE INDEX column lists are renamed
/// through the per-table column mapping, and an empty PRIMARY KEY clause is
/// filled with a guessed key. Whitespace outside the replaced tokens is
/// preserved byte for byte.
pub struct SchemaRewriter<'a> {
    map: &'a IdentifierMap,
    tables: &'a [TableInfo],
    create_indexes: bool,
}

impl<'a> SchemaRewriter<'a> {
    pub fn new(map: &'a IdentifierMap, tables: &'a [TableInfo], create_indexes: bool) -> Self {
        Self {
            map,
            tables,
            create_indexes,
        }
    }

    pub fn rewrite(&self, ddl: &str) -> Result<SchemaDocument> {
        let mut doc = SchemaDocument::parse(ddl);
        if !self.create_indexes {
            doc.statements
                .retain(|s| s.kind != StatementKind::CreateIndex);
        }
        for stmt in &mut doc.statements {
            self.rename_tables(stmt);
            match stmt.kind {
                StatementKind::CreateTable => self.rewrite_create_table(stmt)?,
                StatementKind::CreateIndex => self.rewrite_create_index(stmt),
                _ => {}
            }
            self.fix_empty_primary_key(stmt);
        }
        Ok(doc)
    }

    /// Replace every quoted occurrence of each source table name. Matching
    /// with the quotes included keeps "Order" from touching "OrderItem".
    fn rename_tables(&self, stmt: &mut SchemaStatement) {
        for (source, target) in self.map.tables() {
            if source == target {
                continue;
            }
            let from = format!("\"{}\"", source);
            if stmt.sql.contains(&from) {
                let to = format!("\"{}\"", target);
                stmt.sql = stmt.sql.replace(&from, &to);
            }
        }
    }

    /// Rename column definitions between the outermost parentheses of a
    /// CREATE TABLE. Fragments are split on commas and only a leading quoted
    /// name is ever replaced, so commas inside type arguments like
    /// numeric(10,2) cannot corrupt the statement.
    fn rewrite_create_table(&self, stmt: &mut SchemaStatement) -> Result<()> {
        let Some(source) = stmt.table.clone() else {
            return Ok(());
        };
        let Some(cols) = self.map.columns_for(&source) else {
            return Ok(());
        };
        let open = stmt.sql.find('(');
        let close = stmt.sql.rfind(')');
        let (open, close) = match (open, close) {
            (Some(o), Some(c)) if o < c => (o, c),
            _ => {
                return Err(MigrateError::introspection(format!(
                    "CREATE TABLE for {:?} has no column list",
                    source
                )))
            }
        };
        let body = &stmt.sql[open + 1..close];
        let rewritten = body
            .split(',')
            .map(|frag| {
                if let Some(caps) = LEADING_COLUMN.captures(frag) {
                    if let (Some(whole), Some(ws), Some(name)) =
                        (caps.get(0), caps.get(1), caps.get(2))
                    {
                        if let Some(target) = cols.get(name.as_str()) {
                            return format!(
                                "{}\"{}\"{}",
                                ws.as_str(),
                                target,
                                &frag[whole.end()..]
                            );
                        }
                    }
                }
                frag.to_string()
            })
            .collect::<Vec<_>>()
            .join(",");
        stmt.sql = format!(
            "{}({}){}",
            &stmt.sql[..open],
            rewritten,
            &stmt.sql[close + 1..]
        );
        Ok(())
    }

    /// Rename the indexed columns in the ON clause of a CREATE INDEX,
    /// keeping each token's quote style.
    fn rewrite_create_index(&self, stmt: &mut SchemaStatement) {
        let Some(source) = stmt.table.clone() else {
            return;
        };
        let Some(cols) = self.map.columns_for(&source) else {
            return;
        };
        let Some(inner) = INDEX_ON.captures(&stmt.sql).and_then(|c| c.get(2)) else {
            return;
        };
        let rewritten = inner
            .as_str()
            .split(',')
            .map(|tok| {
                let lead = &tok[..tok.len() - tok.trim_start().len()];
                let trail = &tok[tok.trim_end().len()..];
                let trimmed = tok.trim();
                let (core, quoted) =
                    if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
                        (&trimmed[1..trimmed.len() - 1], true)
                    } else {
                        (trimmed, false)
                    };
                match cols.get(core) {
                    Some(target) if quoted => format!("{}\"{}\"{}", lead, target, trail),
                    Some(target) => format!("{}{}{}", lead, target, trail),
                    None => tok.to_string(),
                }
            })
            .collect::<Vec<_>>()
            .join(",");
        let mut sql = String::with_capacity(stmt.sql.len());
        sql.push_str(&stmt.sql[..inner.start()]);
        sql.push_str(&rewritten);
        sql.push_str(&stmt.sql[inner.end()..]);
        stmt.sql = sql;
    }

    /// mdb-schema emits PRIMARY KEY () when the Access index metadata is
    /// unreadable. Fill the clause with a key guessed from the declared
    /// columns, mapped to its target name.
    fn fix_empty_primary_key(&self, stmt: &mut SchemaStatement) {
        if !EMPTY_PRIMARY_KEY.is_match(&stmt.sql) {
            return;
        }
        let Some(source) = stmt.table.as_deref() else {
            return;
        };
        let Some(info) = self.tables.iter().find(|t| t.name == source) else {
            return;
        };
        let Some(guess) = guess_primary_key(&info.columns) else {
            return;
        };
        let target = self
            .map
            .column(source, guess)
            .map(str::to_string)
            .unwrap_or_else(|| normalize(guess));
        stmt.sql = EMPTY_PRIMARY_KEY
            .replace(&stmt.sql, format!("PRIMARY KEY (\"{}\")", target))
            .into_owned();
    }
}
