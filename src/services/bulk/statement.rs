//! Parameterized write statements produced per row.
//!
//! Table and column names come from the static operation registry. Row data
//! only ever travels as bound parameters.

use std::fmt;

/// A bound parameter value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Param {
    Text(String),
    Int(i32),
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Param::Text(s) => f.write_str(s),
            Param::Int(i) => write!(f, "{}", i),
        }
    }
}

impl From<&str> for Param {
    fn from(s: &str) -> Self {
        Param::Text(s.to_string())
    }
}

impl From<String> for Param {
    fn from(s: String) -> Self {
        Param::Text(s)
    }
}

impl From<i32> for Param {
    fn from(i: i32) -> Self {
        Param::Int(i)
    }
}

/// One INSERT, UPDATE or DELETE against a single table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    Insert {
        table: &'static str,
        columns: Vec<&'static str>,
        values: Vec<Param>,
    },
    Update {
        table: &'static str,
        assignments: Vec<(&'static str, Param)>,
        id_column: &'static str,
        id: String,
    },
    Delete {
        table: &'static str,
        id_column: &'static str,
        id: String,
    },
}

impl Statement {
    pub fn table(&self) -> &'static str {
        match self {
            Statement::Insert { table, .. }
            | Statement::Update { table, .. }
            | Statement::Delete { table, .. } => table,
        }
    }

    /// SQL text with `$n` placeholders, numbered in parameter order.
    pub fn sql(&self) -> String {
        match self {
            Statement::Insert { table, columns, .. } => {
                let placeholders: Vec<String> =
                    (1..=columns.len()).map(|i| format!("${}", i)).collect();
                format!(
                    "INSERT INTO {}({}) VALUES({})",
                    table,
                    columns.join(","),
                    placeholders.join(",")
                )
            }
            Statement::Update {
                table,
                assignments,
                id_column,
                ..
            } => {
                let set_clause: Vec<String> = assignments
                    .iter()
                    .enumerate()
                    .map(|(i, (column, _))| format!("{} = ${}", column, i + 1))
                    .collect();
                format!(
                    "UPDATE {} SET {} WHERE {} = ${}",
                    table,
                    set_clause.join(", "),
                    id_column,
                    assignments.len() + 1
                )
            }
            Statement::Delete {
                table, id_column, ..
            } => format!("DELETE FROM {} WHERE {} = $1", table, id_column),
        }
    }

    /// Parameters in placeholder order.
    pub fn params(&self) -> Vec<Param> {
        match self {
            Statement::Insert { values, .. } => values.clone(),
            Statement::Update { assignments, id, .. } => assignments
                .iter()
                .map(|(_, value)| value.clone())
                .chain(std::iter::once(Param::Text(id.clone())))
                .collect(),
            Statement::Delete { id, .. } => vec![Param::Text(id.clone())],
        }
    }
}
