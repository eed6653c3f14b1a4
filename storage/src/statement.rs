//! Statement builder: turns filters and values into executable descriptors.
//!
//! Building a [`Statement`] never touches the database; the [`Session`]
//! executes it later. [`StatementBuilder`] methods are override points: a
//! specialized repository can add ordering or scoping without changing
//! calling code.
//!
//! [`Session`]: crate::session::Session

use crate::entity::TableMeta;
use crate::error::StorageError;
use crate::value::{Value, Values};

/// SQLite expression for a UTC timestamp in RFC 3339 with milliseconds,
/// matching how chrono timestamps are stored.
const NOW_UTC: &str = "strftime('%Y-%m-%dT%H:%M:%fZ','now')";

/// An unexecuted database operation: SQL text plus bind values in order.
#[derive(Debug, Clone)]
pub struct Statement {
    sql: String,
    binds: Vec<Value>,
}

impl Statement {
    pub fn new(sql: String, binds: Vec<Value>) -> Self {
        Self { sql, binds }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn binds(&self) -> &[Value] {
        &self.binds
    }

    /// Appends raw SQL to the descriptor (e.g. an ORDER BY added by an
    /// overriding builder).
    pub fn push_sql(&mut self, sql: &str) {
        self.sql.push_str(sql);
    }
}

/// A single comparison on a named column.
#[derive(Debug, Clone)]
pub enum Predicate {
    Eq(&'static str, Value),
    Ne(&'static str, Value),
    Gt(&'static str, Value),
    Ge(&'static str, Value),
    Lt(&'static str, Value),
    Le(&'static str, Value),
    In(&'static str, Vec<Value>),
    IsNull(&'static str),
}

/// Conjunction of predicates. Equality shorthand and range comparisons mix
/// freely in one filter; predicates always compose with AND.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    predicates: Vec<Predicate>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(self, field: &'static str, value: impl Into<Value>) -> Self {
        self.push(Predicate::Eq(field, value.into()))
    }

    pub fn ne(self, field: &'static str, value: impl Into<Value>) -> Self {
        self.push(Predicate::Ne(field, value.into()))
    }

    pub fn gt(self, field: &'static str, value: impl Into<Value>) -> Self {
        self.push(Predicate::Gt(field, value.into()))
    }

    pub fn ge(self, field: &'static str, value: impl Into<Value>) -> Self {
        self.push(Predicate::Ge(field, value.into()))
    }

    pub fn lt(self, field: &'static str, value: impl Into<Value>) -> Self {
        self.push(Predicate::Lt(field, value.into()))
    }

    pub fn le(self, field: &'static str, value: impl Into<Value>) -> Self {
        self.push(Predicate::Le(field, value.into()))
    }

    pub fn is_null(self, field: &'static str) -> Self {
        self.push(Predicate::IsNull(field))
    }

    pub fn is_in(self, field: &'static str, values: Vec<Value>) -> Self {
        self.push(Predicate::In(field, values))
    }

    pub fn push(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    /// Renders `a = ? AND b > ? …`, appending bind values in order.
    fn to_sql(&self, binds: &mut Vec<Value>) -> Result<String, StorageError> {
        let mut clauses = Vec::with_capacity(self.predicates.len());
        for predicate in &self.predicates {
            match predicate {
                Predicate::Eq(field, value) => {
                    clauses.push(format!("{} = ?", field));
                    binds.push(value.clone());
                }
                Predicate::Ne(field, value) => {
                    clauses.push(format!("{} <> ?", field));
                    binds.push(value.clone());
                }
                Predicate::Gt(field, value) => {
                    clauses.push(format!("{} > ?", field));
                    binds.push(value.clone());
                }
                Predicate::Ge(field, value) => {
                    clauses.push(format!("{} >= ?", field));
                    binds.push(value.clone());
                }
                Predicate::Lt(field, value) => {
                    clauses.push(format!("{} < ?", field));
                    binds.push(value.clone());
                }
                Predicate::Le(field, value) => {
                    clauses.push(format!("{} <= ?", field));
                    binds.push(value.clone());
                }
                Predicate::In(field, values) => {
                    if values.is_empty() {
                        return Err(StorageError::Statement(format!(
                            "empty IN list for column {}",
                            field
                        )));
                    }
                    let placeholders = vec!["?"; values.len()].join(", ");
                    clauses.push(format!("{} IN ({})", field, placeholders));
                    binds.extend(values.iter().cloned());
                }
                Predicate::IsNull(field) => {
                    clauses.push(format!("{} IS NULL", field));
                }
            }
        }
        Ok(clauses.join(" AND "))
    }
}

fn where_clause(filter: &Filter, binds: &mut Vec<Value>) -> Result<String, StorageError> {
    if filter.is_empty() {
        return Ok(String::new());
    }
    Ok(format!(" WHERE {}", filter.to_sql(binds)?))
}

/// Builds statement descriptors for one table. Every method has a default
/// body; override single methods to inject ordering, soft-delete filters or
/// tenant scoping.
pub trait StatementBuilder: Send + Sync {
    /// Single or bulk insert. All rows must set the same columns; the
    /// statement returns the inserted rows including server-generated
    /// fields.
    fn insert(&self, meta: &TableMeta, rows: &[Values]) -> Result<Statement, StorageError> {
        let first = rows
            .first()
            .ok_or_else(|| StorageError::Statement("insert with no rows".to_string()))?;
        if first.is_empty() {
            return Err(StorageError::Statement("insert with no values".to_string()));
        }

        let columns: Vec<&'static str> = first.fields().collect();
        let mut binds = Vec::with_capacity(rows.len() * columns.len());
        for row in rows {
            let row_columns: Vec<&'static str> = row.fields().collect();
            if row_columns != columns {
                return Err(StorageError::Statement(format!(
                    "bulk insert rows set different columns: {:?} vs {:?}",
                    columns, row_columns
                )));
            }
            for (_, value) in row.iter() {
                binds.push(value.clone());
            }
        }

        let row_placeholders = format!("({})", vec!["?"; columns.len()].join(", "));
        let all_placeholders = vec![row_placeholders; rows.len()].join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES {} RETURNING *",
            meta.table,
            columns.join(", "),
            all_placeholders
        );
        Ok(Statement::new(sql, binds))
    }

    /// Full-table scan, unordered.
    fn select_all(&self, meta: &TableMeta) -> Result<Statement, StorageError> {
        Ok(Statement::new(
            format!("SELECT * FROM {}", meta.table),
            Vec::new(),
        ))
    }

    /// Filtered select; an empty filter degenerates to a full scan.
    fn select(&self, meta: &TableMeta, filter: &Filter) -> Result<Statement, StorageError> {
        let mut binds = Vec::new();
        let clause = where_clause(filter, &mut binds)?;
        Ok(Statement::new(
            format!("SELECT * FROM {}{}", meta.table, clause),
            binds,
        ))
    }

    /// Filtered update returning the updated rows. On audited tables the
    /// statement also refreshes `updated_at` server-side.
    fn update(
        &self,
        meta: &TableMeta,
        filter: &Filter,
        values: &Values,
    ) -> Result<Statement, StorageError> {
        if values.is_empty() {
            return Err(StorageError::Statement("update with no values".to_string()));
        }
        let mut binds = Vec::with_capacity(values.len());
        let mut assignments: Vec<String> = Vec::with_capacity(values.len() + 1);
        for (field, value) in values.iter() {
            assignments.push(format!("{} = ?", field));
            binds.push(value.clone());
        }
        if meta.audit {
            assignments.push(format!("updated_at = {}", NOW_UTC));
        }
        let clause = where_clause(filter, &mut binds)?;
        Ok(Statement::new(
            format!(
                "UPDATE {} SET {}{} RETURNING *",
                meta.table,
                assignments.join(", "),
                clause
            ),
            binds,
        ))
    }

    /// Filtered delete returning the deleted rows.
    fn delete(&self, meta: &TableMeta, filter: &Filter) -> Result<Statement, StorageError> {
        let mut binds = Vec::new();
        let clause = where_clause(filter, &mut binds)?;
        Ok(Statement::new(
            format!("DELETE FROM {}{} RETURNING *", meta.table, clause),
            binds,
        ))
    }
}

/// The vanilla statement builder used unless a repository overrides one.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultStatements;

impl StatementBuilder for DefaultStatements {}
