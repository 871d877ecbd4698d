//! Column descriptors for `CREATE TABLE`.
//!
//! Each constructor sanitizes the column name and emits a PostgreSQL column
//! definition. Modifiers return new values:
//!
//! ```ignore
//! let columns = [
//!     Column::bigint("id").identity().primary_key(),
//!     Column::varchar("username", Some(64)).unique().not_null(),
//!     Column::text("password").not_null(),
//!     Column::boolean("active").default(true),
//! ];
//! ```

use pgquill_check::{escape_quotes, to_alphanumeric};
use std::fmt::Display;

/// How a column's `DEFAULT` argument is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// Quoted and escaped (`E'...'`).
    String,
    /// Emitted verbatim.
    Numeric,
    /// Emitted verbatim (e.g. `now()`, `CURRENT_DATE`).
    DateTime,
    /// Emitted verbatim.
    Custom,
}

/// A column definition used when a table is first materialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    definition: String,
    default: Option<String>,
    kind: ValueKind,
}

impl Column {
    fn with_type(name: &str, sql_type: impl Display, kind: ValueKind) -> Self {
        Self {
            definition: format!("{} {}", to_alphanumeric(name), sql_type),
            default: None,
            kind,
        }
    }

    /// A column with a caller-supplied type (`custom("tags", "TEXT[]")`).
    pub fn custom(name: &str, sql_type: &str) -> Self {
        Self::with_type(name, sql_type, ValueKind::Custom)
    }

    // ── String types ────────────────────────────────────────────────

    /// `CHAR(n)`, or `CHAR` (length 1).
    pub fn char(name: &str, size: Option<u32>) -> Self {
        Self::with_type(name, sized("CHAR", size), ValueKind::String)
    }

    /// `VARCHAR(n)`, or unbounded `VARCHAR`.
    pub fn varchar(name: &str, size: Option<u32>) -> Self {
        Self::with_type(name, sized("VARCHAR", size), ValueKind::String)
    }

    /// `TEXT`.
    pub fn text(name: &str) -> Self {
        Self::with_type(name, "TEXT", ValueKind::String)
    }

    /// `TEXT` restricted to a fixed set of values.
    pub fn one_of(name: &str, variants: &[&str]) -> Self {
        let col = to_alphanumeric(name);
        let list = variants
            .iter()
            .map(|v| format!("E'{}'", escape_quotes(v)))
            .collect::<Vec<_>>()
            .join(", ");
        Self::with_type(
            &col,
            format!("TEXT CHECK ({col} IN ({list}))"),
            ValueKind::String,
        )
    }

    /// `BYTEA`.
    pub fn bytea(name: &str) -> Self {
        Self::with_type(name, "BYTEA", ValueKind::Custom)
    }

    // ── Numeric types ───────────────────────────────────────────────

    /// `BOOLEAN`.
    pub fn boolean(name: &str) -> Self {
        Self::with_type(name, "BOOLEAN", ValueKind::Numeric)
    }

    /// `SMALLINT`.
    pub fn smallint(name: &str) -> Self {
        Self::with_type(name, "SMALLINT", ValueKind::Numeric)
    }

    /// `INTEGER`.
    pub fn int(name: &str) -> Self {
        Self::with_type(name, "INTEGER", ValueKind::Numeric)
    }

    /// `BIGINT`.
    pub fn bigint(name: &str) -> Self {
        Self::with_type(name, "BIGINT", ValueKind::Numeric)
    }

    /// `REAL`.
    pub fn real(name: &str) -> Self {
        Self::with_type(name, "REAL", ValueKind::Numeric)
    }

    /// `DOUBLE PRECISION`.
    pub fn double(name: &str) -> Self {
        Self::with_type(name, "DOUBLE PRECISION", ValueKind::Numeric)
    }

    /// `NUMERIC(p, s)`.
    ///
    /// Precision is clamped to 1000 and scale to the precision. A scale
    /// without a precision is ignored.
    pub fn numeric(name: &str, precision: Option<u16>, scale: Option<u16>) -> Self {
        let sql_type = match (precision, scale) {
            (Some(p), Some(s)) => {
                let p = p.clamp(1, 1000);
                format!("NUMERIC({p}, {})", s.min(p))
            }
            (Some(p), None) => format!("NUMERIC({})", p.clamp(1, 1000)),
            (None, _) => "NUMERIC".to_string(),
        };
        Self::with_type(name, sql_type, ValueKind::Numeric)
    }

    // ── Date and time types ─────────────────────────────────────────

    /// `DATE`.
    pub fn date(name: &str) -> Self {
        Self::with_type(name, "DATE", ValueKind::DateTime)
    }

    /// `TIME`.
    pub fn time(name: &str) -> Self {
        Self::with_type(name, "TIME", ValueKind::DateTime)
    }

    /// `TIMESTAMP`.
    pub fn timestamp(name: &str) -> Self {
        Self::with_type(name, "TIMESTAMP", ValueKind::DateTime)
    }

    /// `TIMESTAMPTZ`.
    pub fn timestamptz(name: &str) -> Self {
        Self::with_type(name, "TIMESTAMPTZ", ValueKind::DateTime)
    }

    // ── Modifiers ───────────────────────────────────────────────────

    /// Append a raw constraint not covered by the other modifiers.
    pub fn append(&self, constraint: &str) -> Self {
        let mut col = self.clone();
        col.definition.push(' ');
        col.definition.push_str(constraint);
        col
    }

    /// `UNIQUE`.
    pub fn unique(&self) -> Self {
        self.append("UNIQUE")
    }

    /// `NOT NULL`.
    pub fn not_null(&self) -> Self {
        self.append("NOT NULL")
    }

    /// `PRIMARY KEY`.
    pub fn primary_key(&self) -> Self {
        self.append("PRIMARY KEY")
    }

    /// Auto-increment (`GENERATED BY DEFAULT AS IDENTITY`).
    pub fn identity(&self) -> Self {
        self.append("GENERATED BY DEFAULT AS IDENTITY")
    }

    /// `DEFAULT <value>`. String columns quote and escape the value.
    pub fn default(&self, value: impl Display) -> Self {
        let value = value.to_string();
        let rendered = match self.kind {
            ValueKind::String => format!("E'{}'", escape_quotes(&value)),
            ValueKind::Numeric | ValueKind::DateTime | ValueKind::Custom => value,
        };
        Self {
            default: Some(rendered),
            ..self.clone()
        }
    }

    /// The value kind controlling how `default` renders.
    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    /// Full column clause, including the `DEFAULT` clause.
    pub fn to_sql(&self) -> String {
        match &self.default {
            Some(default) => format!("{} DEFAULT {}", self.definition, default),
            None => self.definition.clone(),
        }
    }
}

fn sized(base: &str, size: Option<u32>) -> String {
    match size {
        Some(n) => format!("{base}({n})"),
        None => base.to_string(),
    }
}
