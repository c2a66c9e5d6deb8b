//! Rename script generation for databases migrated before name
//! normalization existed.
//!
//! The generated script renames every mixed-case relation, index, and
//! column in a schema to its canonical form. Structural renames come first,
//! tables then indexes then views, each group alphabetical; column renames
//! follow, sorted by renamed relation and source column, and reference the
//! relation by its new name.

use crate::identifier::normalize;
use chrono::{DateTime, Local};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    Table,
    View,
}

/// A table or view of the target schema with its columns in ordinal order.
#[derive(Debug, Clone)]
pub struct CatalogRelation {
    pub name: String,
    pub kind: RelationKind,
    pub columns: Vec<String>,
}

/// An index of the target schema.
#[derive(Debug, Clone)]
pub struct CatalogIndex {
    pub name: String,
    pub table: String,
}

fn quote(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Build the rename statements for a schema. Names already in canonical
/// form produce no statement.
pub fn build_rename_statements(
    schema: &str,
    relations: &[CatalogRelation],
    indexes: &[CatalogIndex],
) -> Vec<String> {
    let mut statements = Vec::new();

    let mut sorted_relations: Vec<&CatalogRelation> = relations.iter().collect();
    sorted_relations.sort_by(|a, b| a.name.cmp(&b.name));
    let mut sorted_indexes: Vec<&CatalogIndex> = indexes.iter().collect();
    sorted_indexes.sort_by(|a, b| a.name.cmp(&b.name));

    for rel in sorted_relations
        .iter()
        .filter(|r| r.kind == RelationKind::Table)
    {
        let target = normalize(&rel.name);
        if target != rel.name {
            statements.push(format!(
                "ALTER TABLE {}.{} RENAME TO {};",
                quote(schema),
                quote(&rel.name),
                quote(&target)
            ));
        }
    }

    for index in &sorted_indexes {
        let target = normalize(&index.name);
        if target != index.name {
            statements.push(format!(
                "ALTER INDEX {}.{} RENAME TO {};",
                quote(schema),
                quote(&index.name),
                quote(&target)
            ));
        }
    }

    for rel in sorted_relations
        .iter()
        .filter(|r| r.kind == RelationKind::View)
    {
        let target = normalize(&rel.name);
        if target != rel.name {
            statements.push(format!(
                "ALTER VIEW {}.{} RENAME TO {};",
                quote(schema),
                quote(&rel.name),
                quote(&target)
            ));
        }
    }

    // Structural renames run first, so column statements must address each
    // relation by its renamed name.
    let mut column_renames: Vec<(String, RelationKind, String, String)> = Vec::new();
    for rel in relations {
        let rel_target = normalize(&rel.name);
        for col in &rel.columns {
            let col_target = normalize(col);
            if col_target != *col {
                column_renames.push((rel_target.clone(), rel.kind, col.clone(), col_target));
            }
        }
    }
    column_renames.sort_by(|a, b| (&a.0, &a.2).cmp(&(&b.0, &b.2)));
    for (relation, kind, old, new) in &column_renames {
        let verb = match kind {
            RelationKind::Table => "TABLE",
            RelationKind::View => "VIEW",
        };
        statements.push(format!(
            "ALTER {} {}.{} RENAME COLUMN {} TO {};",
            verb,
            quote(schema),
            quote(relation),
            quote(old),
            quote(new)
        ));
    }

    statements
}

/// Render the full script with its comment header.
pub fn render_script(schema: &str, statements: &[String], generated_at: DateTime<Local>) -> String {
    let mut script = format!(
        "-- Rename script generated at {}\n-- Schema: {}\n-- {} statements\n\n",
        generated_at.format("%Y-%m-%d %H:%M:%S"),
        schema,
        statements.len()
    );
    for stmt in statements {
        script.push_str(stmt);
        script.push('\n');
    }
    script
}

/// Timestamped default file name for a generated script.
pub fn default_script_name(now: DateTime<Local>) -> String {
    format!("rename_{}.sql", now.format("%Y%m%d_%H%M%S"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn relation(name: &str, kind: RelationKind, columns: &[&str]) -> CatalogRelation {
        CatalogRelation {
            name: name.to_string(),
            kind,
            columns: columns.iter().map(|c| c.to_string()).collect(),
        }
    }

    #[test]
    fn test_statements_grouped_and_ordered() {
        let relations = vec![
            relation("ZetaLog", RelationKind::Table, &["LogId"]),
            relation("OrderItem", RelationKind::Table, &["OrderId", "ItemCode"]),
            relation("ActiveOrders", RelationKind::View, &["OrderId"]),
        ];
        let indexes = vec![
            CatalogIndex {
                name: "ZetaLog_idx".to_string(),
                table: "ZetaLog".to_string(),
            },
            CatalogIndex {
                name: "OrderItem_idx".to_string(),
                table: "OrderItem".to_string(),
            },
        ];
        let stmts = build_rename_statements("public", &relations, &indexes);
        assert_eq!(
            stmts,
            vec![
                "ALTER TABLE \"public\".\"OrderItem\" RENAME TO \"order_item\";",
                "ALTER TABLE \"public\".\"ZetaLog\" RENAME TO \"zeta_log\";",
                "ALTER INDEX \"public\".\"OrderItem_idx\" RENAME TO \"order_item_idx\";",
                "ALTER INDEX \"public\".\"ZetaLog_idx\" RENAME TO \"zeta_log_idx\";",
                "ALTER VIEW \"public\".\"ActiveOrders\" RENAME TO \"active_orders\";",
                "ALTER VIEW \"public\".\"active_orders\" RENAME COLUMN \"OrderId\" TO \"order_id\";",
                "ALTER TABLE \"public\".\"order_item\" RENAME COLUMN \"ItemCode\" TO \"item_code\";",
                "ALTER TABLE \"public\".\"order_item\" RENAME COLUMN \"OrderId\" TO \"order_id\";",
                "ALTER TABLE \"public\".\"zeta_log\" RENAME COLUMN \"LogId\" TO \"log_id\";",
            ]
        );
    }

    #[test]
    fn test_canonical_names_produce_no_statements() {
        let relations = vec![relation(
            "order_item",
            RelationKind::Table,
            &["order_id", "item_code"],
        )];
        let indexes = vec![CatalogIndex {
            name: "order_item_idx".to_string(),
            table: "order_item".to_string(),
        }];
        assert!(build_rename_statements("public", &relations, &indexes).is_empty());
    }

    #[test]
    fn test_render_script_header() {
        let generated = Local
            .with_ymd_and_hms(2024, 5, 1, 12, 30, 45)
            .single()
            .unwrap();
        let stmts = vec!["ALTER TABLE \"public\".\"A\" RENAME TO \"a\";".to_string()];
        let script = render_script("public", &stmts, generated);
        assert!(script.starts_with("-- Rename script generated at 2024-05-01 12:30:45\n"));
        assert!(script.contains("-- Schema: public\n"));
        assert!(script.contains("-- 1 statements\n"));
        assert!(script.ends_with("RENAME TO \"a\";\n"));
    }

    #[test]
    fn test_default_script_name() {
        let now = Local
            .with_ymd_and_hms(2024, 5, 1, 12, 30, 45)
            .single()
            .unwrap();
        assert_eq!(default_script_name(now), "rename_20240501_123045.sql");
    }
}
