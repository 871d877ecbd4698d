//! Parameter-safe SQL fragment accumulator.
//!
//! A [`Fragment`] stores raw SQL pieces and parameter slots separately, and
//! renders `$1, $2, ...` placeholders when the final statement is assembled.
//! A slot can only be pushed together with its value, so the placeholder
//! count always equals the parameter count, in the same order.
//!
//! ```ignore
//! let mut f = Fragment::new();
//! f.push("username = ").push_bind("admin");
//! f.push(" AND age > 18");
//!
//! assert_eq!(f.to_sql(), "username = $1 AND age > 18");
//! assert_eq!(f.render(2), "username = $3 AND age > 18");
//! ```

use crate::param::{Param, ParamList};
use std::fmt::Write;
use tokio_postgres::types::ToSql;

#[derive(Debug, Clone)]
enum Part {
    Raw(String),
    Param,
}

/// Ordered SQL text segments interleaved with parameter slots.
#[derive(Debug, Clone, Default)]
pub struct Fragment {
    parts: Vec<Part>,
    params: ParamList,
}

impl Fragment {
    /// Create an empty fragment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a fragment from raw SQL (no parameters).
    pub fn raw(sql: impl Into<String>) -> Self {
        let mut f = Self::new();
        f.parts.push(Part::Raw(sql.into()));
        f
    }

    /// Append raw SQL (no parameters).
    pub fn push(&mut self, sql: &str) -> &mut Self {
        if sql.is_empty() {
            return self;
        }

        match self.parts.last_mut() {
            Some(Part::Raw(last)) => last.push_str(sql),
            _ => self.parts.push(Part::Raw(sql.to_string())),
        }
        self
    }

    /// Append a parameter placeholder and bind its value.
    pub fn push_bind<T>(&mut self, value: T) -> &mut Self
    where
        T: ToSql + Sync + Send + 'static,
    {
        self.push_param(Param::new(value))
    }

    /// Append a placeholder for an already wrapped parameter.
    pub fn push_param(&mut self, param: Param) -> &mut Self {
        self.parts.push(Part::Param);
        self.params.push_param(param);
        self
    }

    /// Append a comma-separated list of placeholders, one per value.
    pub fn push_param_list(&mut self, values: impl IntoIterator<Item = Param>) -> &mut Self {
        for (i, value) in values.into_iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            self.push_param(value);
        }
        self
    }

    /// Append another fragment, keeping its parameters in order.
    pub fn push_fragment(&mut self, other: &Fragment) -> &mut Self {
        for part in &other.parts {
            match part {
                Part::Raw(s) => {
                    self.push(s);
                }
                Part::Param => self.parts.push(Part::Param),
            }
        }
        self.params.extend(&other.params);
        self
    }

    /// Returns true if the fragment has no SQL text and no parameters.
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Bound parameters, in placeholder order.
    pub fn params(&self) -> &ParamList {
        &self.params
    }

    /// Number of placeholders (and parameters).
    pub fn param_count(&self) -> usize {
        self.params.len()
    }

    /// Render the fragment with placeholders numbered from `$1`.
    pub fn to_sql(&self) -> String {
        self.render(0)
    }

    /// Render the fragment with placeholders numbered from `$offset+1`.
    ///
    /// Used when the fragment follows other parameters in the final statement.
    pub fn render(&self, offset: usize) -> String {
        let mut out = String::new();
        let mut idx = offset;

        for part in &self.parts {
            match part {
                Part::Raw(s) => out.push_str(s),
                Part::Param => {
                    idx += 1;
                    let _ = write!(&mut out, "${idx}");
                }
            }
        }
        out
    }
}
