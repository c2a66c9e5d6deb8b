//! Identifier normalization and source-to-target name mapping.

use crate::error::{MigrateError, Result};
use crate::source::TableInfo;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

static UPPER_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"([A-Z]+)").unwrap());
static UPPER_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"([A-Z][a-z]+)").unwrap());

/// Misspellings and bad word splits present in the legacy schema vocabulary,
/// applied in order after the general snake_case transform.
const IRREGULAR_WORDS: &[(&str, &str)] = &[
    ("rigth", "right"),
    ("dateof", "date_of"),
    ("leve_l", "level"),
    ("retailmark_down", "retail_markdown"),
    ("retail_mark_down", "retail_markdown"),
    ("paltform", "platform"),
    ("re_build", "rebuild"),
];

/// Convert an identifier to its canonical lowercase underscore-delimited form.
///
/// Hyphens become word breaks, a word break is inserted before each maximal
/// run of uppercase letters and before each capitalized word, the words are
/// lowercased and joined with underscores, and the irregular-word corrections
/// are applied last. Idempotent for input already in canonical form.
pub fn normalize(name: &str) -> String {
    let unhyphenated = name.replace('-', " ");
    let spaced = UPPER_RUN.replace_all(&unhyphenated, " $1");
    let spaced = UPPER_WORD.replace_all(&spaced, " $1");
    let mut snake = spaced
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_lowercase();
    for (from, to) in IRREGULAR_WORDS {
        if snake.contains(from) {
            snake = snake.replace(from, to);
        }
    }
    snake
}

/// Guess the primary key column for a table whose declared key is unknown.
///
/// Scans columns in declared order and returns the first whose lowercase form
/// is exactly "id", "code", "pk", or "primarykey", or that contains "id" as a
/// substring. Falls back to the first column; returns None for an empty list.
pub fn guess_primary_key(columns: &[String]) -> Option<&str> {
    for col in columns {
        let lower = col.to_lowercase();
        if matches!(lower.as_str(), "id" | "code" | "pk" | "primarykey") || lower.contains("id") {
            return Some(col);
        }
    }
    columns.first().map(|c| c.as_str())
}

/// Immutable source-to-target name mappings for one run.
///
/// Total over the discovered tables and their declared columns. Built once
/// before any target work starts.
#[derive(Debug, Clone, Default)]
pub struct IdentifierMap {
    tables: BTreeMap<String, String>,
    columns: BTreeMap<String, BTreeMap<String, String>>,
}

impl IdentifierMap {
    /// Build the table and column mappings for the given tables.
    ///
    /// Two source names normalizing to the same target name would make the
    /// schema rewrite ambiguous, so collisions fail the build.
    pub fn build(tables: &[TableInfo]) -> Result<Self> {
        let mut table_map = BTreeMap::new();
        let mut seen_tables: BTreeMap<String, String> = BTreeMap::new();
        let mut column_map = BTreeMap::new();

        for table in tables {
            let target = normalize(&table.name);
            if let Some(other) = seen_tables.get(&target) {
                return Err(MigrateError::introspection(format!(
                    "tables {:?} and {:?} both normalize to {:?}",
                    other, table.name, target
                )));
            }
            seen_tables.insert(target.clone(), table.name.clone());
            table_map.insert(table.name.clone(), target);

            let mut cols = BTreeMap::new();
            let mut seen_cols: BTreeMap<String, String> = BTreeMap::new();
            for col in &table.columns {
                let target = normalize(col);
                if let Some(other) = seen_cols.get(&target) {
                    return Err(MigrateError::introspection(format!(
                        "columns {:?} and {:?} of table {:?} both normalize to {:?}",
                        other, col, table.name, target
                    )));
                }
                seen_cols.insert(target.clone(), col.clone());
                cols.insert(col.clone(), target);
            }
            column_map.insert(table.name.clone(), cols);
        }

        Ok(Self {
            tables: table_map,
            columns: column_map,
        })
    }

    /// Target name for a source table.
    pub fn table(&self, source: &str) -> Option<&str> {
        self.tables.get(source).map(|s| s.as_str())
    }

    /// Target name for a column of a source table.
    pub fn column(&self, table: &str, column: &str) -> Option<&str> {
        self.columns
            .get(table)
            .and_then(|cols| cols.get(column))
            .map(|s| s.as_str())
    }

    /// Column mapping for one source table.
    pub fn columns_for(&self, table: &str) -> Option<&BTreeMap<String, String>> {
        self.columns.get(table)
    }

    /// All table renames, in deterministic order.
    pub fn tables(&self) -> impl Iterator<Item = (&String, &String)> {
        self.tables.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(name: &str, columns: &[&str]) -> TableInfo {
        TableInfo {
            name: name.to_string(),
            row_count: None,
            columns: columns.iter().map(|c| c.to_string()).collect(),
        }
    }

    #[test]
    fn test_normalize_camel_case() {
        assert_eq!(normalize("CamelCase"), "camel_case");
    }

    #[test]
    fn test_normalize_all_caps() {
        assert_eq!(normalize("ALLCAPS"), "allcaps");
    }

    #[test]
    fn test_normalize_hyphenated() {
        assert_eq!(normalize("multi-word-name"), "multi_word_name");
    }

    #[test]
    fn test_normalize_acronym_prefix() {
        assert_eq!(normalize("ABCWidget"), "abc_widget");
    }

    #[test]
    fn test_normalize_irregular_words() {
        assert_eq!(normalize("CopyRigth"), "copy_right");
        assert_eq!(normalize("DateofBirth"), "date_of_birth");
        assert_eq!(normalize("RetailMarkDown"), "retail_markdown");
        assert_eq!(normalize("RetailmarkDown"), "retail_markdown");
        assert_eq!(normalize("PaltformCode"), "platform_code");
        assert_eq!(normalize("ReBuild"), "rebuild");
    }

    #[test]
    fn test_normalize_idempotent() {
        for input in [
            "CamelCase",
            "ALLCAPS",
            "multi-word-name",
            "DateofBirth",
            "RetailMarkDown",
            "already_canonical",
        ] {
            let once = normalize(input);
            assert_eq!(normalize(&once), once, "not idempotent for {:?}", input);
        }
    }

    #[test]
    fn test_guess_primary_key_prefers_id() {
        let cols = vec!["Id".to_string(), "Name".to_string()];
        assert_eq!(guess_primary_key(&cols), Some("Id"));
    }

    #[test]
    fn test_guess_primary_key_substring_match() {
        let cols = vec!["Name".to_string(), "OrderGuid".to_string()];
        assert_eq!(guess_primary_key(&cols), Some("OrderGuid"));
        // "Width" contains "id" and wins over the declared order fallback
        let cols = vec!["Name".to_string(), "Width".to_string()];
        assert_eq!(guess_primary_key(&cols), Some("Width"));
    }

    #[test]
    fn test_guess_primary_key_falls_back_to_first() {
        let cols = vec!["Name".to_string(), "Description".to_string()];
        assert_eq!(guess_primary_key(&cols), Some("Name"));
    }

    #[test]
    fn test_guess_primary_key_empty() {
        assert_eq!(guess_primary_key(&[]), None);
    }

    #[test]
    fn test_build_maps_tables_and_columns() {
        let tables = vec![
            table("OrderItem", &["OrderId", "ItemCode", "RetailMarkDown"]),
            table("Zeta", &["Id"]),
        ];
        let map = IdentifierMap::build(&tables).unwrap();
        assert_eq!(map.table("OrderItem"), Some("order_item"));
        assert_eq!(map.column("OrderItem", "OrderId"), Some("order_id"));
        assert_eq!(
            map.column("OrderItem", "RetailMarkDown"),
            Some("retail_markdown")
        );
        assert_eq!(map.column("Zeta", "Id"), Some("id"));
        assert_eq!(map.table("Missing"), None);
    }

    #[test]
    fn test_build_detects_table_collision() {
        let tables = vec![table("OrderItem", &[]), table("Order-Item", &[])];
        let err = IdentifierMap::build(&tables).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("OrderItem"));
        assert!(msg.contains("Order-Item"));
    }

    #[test]
    fn test_build_detects_column_collision() {
        let tables = vec![table("Orders", &["OrderId", "Order-Id"])];
        assert!(IdentifierMap::build(&tables).is_err());
    }
}
