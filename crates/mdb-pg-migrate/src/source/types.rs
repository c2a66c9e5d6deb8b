//! Source metadata types.

/// Metadata for one table discovered in the source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableInfo {
    /// Table name exactly as the source reports it.
    pub name: String,

    /// Row count from the source catalog, when the tooling reports one.
    pub row_count: Option<i64>,

    /// Column names in declared order.
    pub columns: Vec<String>,
}

impl TableInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            row_count: None,
            columns: Vec::new(),
        }
    }
}
