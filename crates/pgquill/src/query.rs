//! Table-bound query builder.
//!
//! A [`Query`] carries a sanitized table name, an accumulated WHERE
//! [`Fragment`] and ORDER BY terms. Connector methods (`where_`, `and`, `or`
//! and their `_not` forms) return a [`WhereQuery`] cursor; a predicate method
//! on the cursor (`equal`, `like`, `in_list`, ...) completes the condition and
//! hands back a new `Query`.
//!
//! Every call builds a new value. A shared base query is never modified:
//!
//! ```ignore
//! let users = db.table("users", &[]).await;
//!
//! let admins = users.where_("role").equal("admin");
//! let adults = users.where_("age").greater_equal(18).order_by_desc("age");
//!
//! assert!(!users.has_where());
//! assert_eq!(admins.to_where_sql(), "WHERE role = $1");
//! assert_eq!(adults.to_where_sql(), "WHERE age >= 18");
//! ```

use crate::fragment::Fragment;
use crate::param::{Param, ParamList};
use pgquill_check::to_alphanumeric;
use tokio_postgres::types::ToSql;

/// Sort direction of an ORDER BY term.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    fn as_sql(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// One ORDER BY term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderTerm {
    pub column: String,
    pub order: SortOrder,
}

/// A table-bound query: WHERE conditions and ordering, ready for a terminal
/// operation (`get`, `set`, `has`, `delete`, `drop_table`).
#[derive(Debug, Clone)]
pub struct Query {
    pub(crate) table: String,
    pub(crate) where_clause: Fragment,
    pub(crate) order: Vec<OrderTerm>,
}

#[derive(Debug, Clone, Copy)]
enum Connector {
    And,
    Or,
}

impl Query {
    /// Create a query for `table`. The name is sanitized.
    pub fn new(table: &str) -> Self {
        Self {
            table: to_alphanumeric(table),
            where_clause: Fragment::new(),
            order: Vec::new(),
        }
    }

    /// The sanitized table name.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Returns true if a WHERE condition has been added.
    pub fn has_where(&self) -> bool {
        !self.where_clause.is_empty()
    }

    /// The WHERE clause, including the `WHERE ` keyword, or an empty string.
    pub fn to_where_sql(&self) -> String {
        self.where_sql(0)
    }

    /// Parameters bound by the WHERE clause, in placeholder order.
    pub fn where_params(&self) -> &ParamList {
        self.where_clause.params()
    }

    /// ORDER BY terms, in call order.
    pub fn order_terms(&self) -> &[OrderTerm] {
        &self.order
    }

    pub(crate) fn where_sql(&self, offset: usize) -> String {
        if self.where_clause.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", self.where_clause.render(offset))
        }
    }

    pub(crate) fn order_sql(&self) -> String {
        if self.order.is_empty() {
            return String::new();
        }
        let terms = self
            .order
            .iter()
            .map(|t| format!("{} {}", t.column, t.order.as_sql()))
            .collect::<Vec<_>>()
            .join(", ");
        format!("ORDER BY {terms}")
    }

    // ── Connectors ──────────────────────────────────────────────────

    /// Start a condition on `column`. On a query that already has a
    /// condition this behaves like [`Query::and`].
    pub fn where_(&self, column: &str) -> WhereQuery {
        self.cursor(Connector::And, false, column)
    }

    /// Start a negated condition (`NOT column ...`).
    pub fn where_not(&self, column: &str) -> WhereQuery {
        self.cursor(Connector::And, true, column)
    }

    /// Join a condition with ` AND `. Leads the clause if none exists.
    pub fn and(&self, column: &str) -> WhereQuery {
        self.cursor(Connector::And, false, column)
    }

    /// Join a negated condition with ` AND NOT `.
    pub fn and_not(&self, column: &str) -> WhereQuery {
        self.cursor(Connector::And, true, column)
    }

    /// Join a condition with ` OR `. Leads the clause if none exists.
    pub fn or(&self, column: &str) -> WhereQuery {
        self.cursor(Connector::Or, false, column)
    }

    /// Join a negated condition with ` OR NOT `.
    pub fn or_not(&self, column: &str) -> WhereQuery {
        self.cursor(Connector::Or, true, column)
    }

    fn cursor(&self, connector: Connector, not: bool, column: &str) -> WhereQuery {
        let mut prefix = String::new();
        if self.has_where() {
            prefix.push_str(match connector {
                Connector::And => " AND ",
                Connector::Or => " OR ",
            });
        }
        if not {
            prefix.push_str("NOT ");
        }
        prefix.push_str(&to_alphanumeric(column));

        WhereQuery {
            query: self.clone(),
            prefix,
        }
    }

    // ── Ordering ────────────────────────────────────────────────────

    /// Append `column ASC` to the ORDER BY list.
    pub fn order_by(&self, column: &str) -> Query {
        self.push_order(column, SortOrder::Asc)
    }

    /// Append `column DESC` to the ORDER BY list.
    pub fn order_by_desc(&self, column: &str) -> Query {
        self.push_order(column, SortOrder::Desc)
    }

    fn push_order(&self, column: &str, order: SortOrder) -> Query {
        let mut q = self.clone();
        q.order.push(OrderTerm {
            column: to_alphanumeric(column),
            order,
        });
        q
    }
}

/// A pending condition: the connector and column are known, the predicate
/// is not. Consumed by exactly one predicate method.
#[derive(Debug, Clone)]
#[must_use = "a WhereQuery does nothing until a predicate such as `equal` completes it"]
pub struct WhereQuery {
    query: Query,
    prefix: String,
}

impl WhereQuery {
    /// `column = $n`
    pub fn equal<T>(self, value: T) -> Query
    where
        T: ToSql + Send + Sync + 'static,
    {
        self.bind(" = ", Param::new(value))
    }

    /// `column <> $n`
    pub fn not_equal<T>(self, value: T) -> Query
    where
        T: ToSql + Send + Sync + 'static,
    {
        self.bind(" <> ", Param::new(value))
    }

    /// `column LIKE $n`
    pub fn like<T>(self, pattern: T) -> Query
    where
        T: ToSql + Send + Sync + 'static,
    {
        self.bind(" LIKE ", Param::new(pattern))
    }

    /// `column IN ($n, $n+1, ...)`
    ///
    /// With no values the condition is discarded and the query is returned
    /// unchanged.
    pub fn in_list<T, I>(self, values: I) -> Query
    where
        T: ToSql + Send + Sync + 'static,
        I: IntoIterator<Item = T>,
    {
        let params: Vec<Param> = values.into_iter().map(Param::new).collect();
        if params.is_empty() {
            return self.query;
        }
        self.complete(|f| {
            f.push(" IN (").push_param_list(params).push(")");
        })
    }

    /// `column > n`, inlined.
    pub fn greater_than(self, value: i64) -> Query {
        self.literal(" > ", value)
    }

    /// `column < n`, inlined.
    pub fn less_than(self, value: i64) -> Query {
        self.literal(" < ", value)
    }

    /// `column >= n`, inlined.
    pub fn greater_equal(self, value: i64) -> Query {
        self.literal(" >= ", value)
    }

    /// `column <= n`, inlined.
    pub fn less_equal(self, value: i64) -> Query {
        self.literal(" <= ", value)
    }

    /// `column BETWEEN low AND high`, inlined.
    pub fn between(self, low: i64, high: i64) -> Query {
        self.complete(|f| {
            f.push(&format!(" BETWEEN {low} AND {high}"));
        })
    }

    /// `column IS NULL`
    pub fn is_null(self) -> Query {
        self.complete(|f| {
            f.push(" IS NULL");
        })
    }

    /// `column IS NOT NULL`
    pub fn is_not_null(self) -> Query {
        self.complete(|f| {
            f.push(" IS NOT NULL");
        })
    }

    pub(crate) fn bind(self, op: &str, param: Param) -> Query {
        self.complete(|f| {
            f.push(op).push_param(param);
        })
    }

    fn literal(self, op: &str, value: i64) -> Query {
        self.complete(|f| {
            f.push(op).push(&value.to_string());
        })
    }

    fn complete(self, predicate: impl FnOnce(&mut Fragment)) -> Query {
        let WhereQuery { mut query, prefix } = self;
        query.where_clause.push(&prefix);
        predicate(&mut query.where_clause);
        query
    }
}
