//! Compiled statements.
//!
//! Terminal operations compile a [`Query`] into a [`Statement`] (SQL text
//! with `$n` placeholders plus the bound parameters) before it is vetted and
//! executed. The builders are public so a statement can be inspected or
//! logged without touching the database.

use crate::column::Column;
use crate::fragment::Fragment;
use crate::param::ParamList;
use crate::query::Query;
use crate::values::Values;
use pgquill_check::to_alphanumeric;
use std::fmt;
use tokio_postgres::types::ToSql;

/// The kind of a compiled statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Select,
    Exists,
    Insert,
    Update,
    Delete,
    Drop,
    Create,
}

impl StatementKind {
    pub fn as_str(self) -> &'static str {
        match self {
            StatementKind::Select => "select",
            StatementKind::Exists => "exists",
            StatementKind::Insert => "insert",
            StatementKind::Update => "update",
            StatementKind::Delete => "delete",
            StatementKind::Drop => "drop",
            StatementKind::Create => "create",
        }
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// SQL text plus its ordered parameter list.
#[derive(Debug, Clone)]
pub struct Statement {
    pub kind: StatementKind,
    pub sql: String,
    pub params: ParamList,
}

impl Statement {
    fn new(kind: StatementKind, sql: String, params: ParamList) -> Self {
        Self { kind, sql, params }
    }

    /// Parameter refs compatible with `tokio-postgres`.
    pub fn param_refs(&self) -> Vec<&(dyn ToSql + Sync)> {
        self.params.as_refs()
    }
}

fn join_clauses(parts: &[&String]) -> String {
    parts
        .iter()
        .filter(|p| !p.is_empty())
        .map(|p| p.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

impl Query {
    /// `SELECT <keys|*> FROM t [WHERE ..] [ORDER BY ..]`
    pub fn select_statement(&self, keys: &[&str]) -> Statement {
        let keys: Vec<String> = keys
            .iter()
            .map(|k| to_alphanumeric(k))
            .filter(|k| !k.is_empty())
            .collect();
        let columns = if keys.is_empty() {
            "*".to_string()
        } else {
            keys.join(", ")
        };

        let head = format!("SELECT {columns} FROM {}", self.table);
        let (where_sql, order_sql) = (self.where_sql(0), self.order_sql());
        let sql = join_clauses(&[&head, &where_sql, &order_sql]);
        Statement::new(StatementKind::Select, sql, self.where_params().clone())
    }

    /// Existence check for `values`, merged with the current WHERE clause:
    /// `SELECT * FROM t WHERE k1 = $1 AND .. [AND (<where>)] LIMIT 1`.
    ///
    /// Returns `None` when `values` is empty.
    pub fn exists_statement(&self, values: &Values) -> Option<Statement> {
        if values.is_empty() {
            return None;
        }

        let mut cond = Fragment::new();
        for (i, (column, value)) in values.iter().enumerate() {
            if i > 0 {
                cond.push(" AND ");
            }
            cond.push(column).push(" = ").push_param(value.clone());
        }
        if self.has_where() {
            cond.push(" AND (").push_fragment(&self.where_clause).push(")");
        }

        let sql = format!(
            "SELECT * FROM {} WHERE {} LIMIT 1",
            self.table,
            cond.to_sql()
        );
        Some(Statement::new(
            StatementKind::Exists,
            sql,
            cond.params().clone(),
        ))
    }

    /// `INSERT INTO t (c1, c2) VALUES ($1, $2)`
    ///
    /// Returns `None` when `values` is empty.
    pub fn insert_statement(&self, values: &Values) -> Option<Statement> {
        if values.is_empty() {
            return None;
        }

        let columns = values.columns().collect::<Vec<_>>().join(", ");
        let mut placeholders = Fragment::new();
        placeholders.push_param_list(values.iter().map(|(_, p)| p.clone()));

        let sql = format!(
            "INSERT INTO {} ({columns}) VALUES ({})",
            self.table,
            placeholders.to_sql()
        );
        Some(Statement::new(
            StatementKind::Insert,
            sql,
            placeholders.params().clone(),
        ))
    }

    /// `UPDATE t SET c1 = $1, c2 = $2 [WHERE ..]`
    ///
    /// The WHERE placeholders are numbered after the SET values. Returns
    /// `None` when `values` is empty.
    pub fn update_statement(&self, values: &Values) -> Option<Statement> {
        if values.is_empty() {
            return None;
        }

        let mut assignments = Fragment::new();
        for (i, (column, value)) in values.iter().enumerate() {
            if i > 0 {
                assignments.push(", ");
            }
            assignments.push(column).push(" = ").push_param(value.clone());
        }

        let head = format!("UPDATE {} SET {}", self.table, assignments.to_sql());
        let where_sql = self.where_sql(assignments.param_count());
        let sql = join_clauses(&[&head, &where_sql]);

        let mut params = assignments.params().clone();
        params.extend(self.where_params());
        Some(Statement::new(StatementKind::Update, sql, params))
    }

    /// `DELETE FROM t [WHERE ..]`
    pub fn delete_statement(&self) -> Statement {
        let head = format!("DELETE FROM {}", self.table);
        let where_sql = self.where_sql(0);
        let sql = join_clauses(&[&head, &where_sql]);
        Statement::new(StatementKind::Delete, sql, self.where_params().clone())
    }

    /// `DROP TABLE t`. Any WHERE clause is ignored.
    pub fn drop_statement(&self) -> Statement {
        Statement::new(
            StatementKind::Drop,
            format!("DROP TABLE {}", self.table),
            ParamList::new(),
        )
    }

    /// `CREATE TABLE IF NOT EXISTS t (<columns>)`
    ///
    /// Returns `None` when no columns are given.
    pub fn create_statement(&self, columns: &[Column]) -> Option<Statement> {
        if columns.is_empty() {
            return None;
        }
        let defs = columns
            .iter()
            .map(Column::to_sql)
            .collect::<Vec<_>>()
            .join(", ");
        Some(Statement::new(
            StatementKind::Create,
            format!("CREATE TABLE IF NOT EXISTS {} ({defs})", self.table),
            ParamList::new(),
        ))
    }
}
