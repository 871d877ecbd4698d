//! Ordered column/value lists for `set` and `has`.

use crate::error::{DbError, DbResult};
use crate::param::Param;
use pgquill_check::to_alphanumeric;
use tokio_postgres::types::ToSql;

/// Ordered list of `(column, value)` pairs.
///
/// Column names are sanitized on insertion. Iteration follows insertion
/// order, so the column list, the placeholder list and the bound values of a
/// compiled statement always line up and the SQL text is reproducible.
/// Setting a column twice replaces the value but keeps the first position.
///
/// ```ignore
/// let values = Values::new()
///     .with("username", "admin")
///     .with("password", "12345");
///
/// users.set(&db, values, &["username"]).await?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct Values {
    entries: Vec<(String, Param)>,
}

impl Values {
    /// Create an empty value list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `column` to `value`.
    pub fn insert<T>(&mut self, column: &str, value: T) -> &mut Self
    where
        T: ToSql + Send + Sync + 'static,
    {
        self.insert_param(column, Param::new(value))
    }

    /// Set `column` to an already wrapped parameter.
    pub fn insert_param(&mut self, column: &str, param: Param) -> &mut Self {
        let column = to_alphanumeric(column);
        match self.entries.iter_mut().find(|(c, _)| *c == column) {
            Some(entry) => entry.1 = param,
            None => self.entries.push((column, param)),
        }
        self
    }

    /// Chainable form of [`Values::insert`].
    pub fn with<T>(mut self, column: &str, value: T) -> Self
    where
        T: ToSql + Send + Sync + 'static,
    {
        self.insert(column, value);
        self
    }

    /// Build a value list from a JSON object.
    ///
    /// Strings, integers, floats, booleans and `null` bind as `TEXT`, `INT8`,
    /// `FLOAT8`, `BOOL` and a typed `NULL`; arrays and nested objects bind as
    /// `JSONB`.
    pub fn from_json(value: serde_json::Value) -> DbResult<Self> {
        let serde_json::Value::Object(map) = value else {
            return Err(DbError::validation("Values::from_json: expected a JSON object"));
        };

        let mut values = Self::new();
        for (column, v) in map {
            let param = match v {
                serde_json::Value::Null => Param::new(Option::<String>::None),
                serde_json::Value::Bool(b) => Param::new(b),
                serde_json::Value::String(s) => Param::new(s),
                serde_json::Value::Number(n) => match n.as_i64() {
                    Some(i) => Param::new(i),
                    None => match n.as_f64() {
                        Some(f) => Param::new(f),
                        None => {
                            return Err(DbError::validation(format!(
                                "Values::from_json: number out of range for column '{column}'"
                            )));
                        }
                    },
                },
                other => Param::new(other),
            };
            values.insert_param(&column, param);
        }
        Ok(values)
    }

    /// Value bound to `column`, if present.
    pub fn get(&self, column: &str) -> Option<&Param> {
        let column = to_alphanumeric(column);
        self.entries
            .iter()
            .find(|(c, _)| *c == column)
            .map(|(_, p)| p)
    }

    /// Returns true if `column` has a value.
    pub fn contains(&self, column: &str) -> bool {
        self.get(column).is_some()
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no columns are set.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sanitized column names, in order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(c, _)| c.as_str())
    }

    /// Iterate over `(column, value)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Param)> {
        self.entries.iter().map(|(c, p)| (c.as_str(), p))
    }
}

impl<K, V> FromIterator<(K, V)> for Values
where
    K: AsRef<str>,
    V: ToSql + Send + Sync + 'static,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut values = Self::new();
        for (k, v) in iter {
            values.insert(k.as_ref(), v);
        }
        values
    }
}
