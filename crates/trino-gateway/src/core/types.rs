use serde::{Deserialize, Serialize};

/// Result column as reported to clients. `type` is the engine's native type name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
}

/// A single decoded cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int64(i64),
    Float64(f64),
    String(String),
}

/// One materialized page of a result set.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ResultPage {
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<Value>>,
}

impl ResultPage {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// SQL ready for the executor, with the values bound to its `?` placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<String>,
    pub rewritten: bool,
}

impl Statement {
    pub fn verbatim(sql: &str) -> Self {
        Self {
            sql: sql.to_string(),
            params: Vec::new(),
            rewritten: false,
        }
    }
}
