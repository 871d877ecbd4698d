//! Guarded database client.
//!
//! [`Db`] wraps any [`GenericClient`] and runs every statement through a
//! [`SafetyScanner`] before it reaches the database. It also owns the
//! [`SchemaRegistry`] used by [`Db::table`].
//!
//! # Example
//!
//! ```ignore
//! use pgquill::{Column, Db, Values};
//!
//! let db = Db::new(client);
//! let users = db
//!     .table("users", &[Column::text("username"), Column::text("password")])
//!     .await;
//!
//! users
//!     .set(&db, &Values::new().with("username", "admin").with("password", "12345"), &["username"])
//!     .await?;
//!
//! let found = users.where_("username").equal("admin").has(&db, &Values::new()).await;
//! ```

use crate::client::{GenericClient, RowStream, StreamingClient};
use crate::column::Column;
use crate::error::{DbError, DbResult};
use crate::param::text_hint;
use crate::query::Query;
use crate::registry::SchemaRegistry;
use crate::statement::Statement;
use pgquill_check::{SafetyScanner, check_global_bound};
use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_postgres::Row;
use tokio_postgres::types::ToSql;

/// Phrase required by [`DbConfig::unchecked`].
pub const UNCHECKED_CONFIRMATION: &str = "I Know What Im Doing!";

/// Whether statements are vetted by the safety scanner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ScanMode {
    /// Reject statements the scanner vetoes (default).
    #[default]
    Enforce,
    /// Skip scanning. Only reachable through [`DbConfig::unchecked`].
    Disabled,
}

/// Configuration for [`Db`].
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Safety scanner mode.
    pub scan_mode: ScanMode,
    /// Whether to emit a `debug` event per statement.
    pub log_sql: bool,
    /// Truncate logged SQL (in bytes). `None` means no truncation.
    pub max_sql_length: Option<usize>,
    /// Statement timeout.
    pub query_timeout: Option<Duration>,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            scan_mode: ScanMode::Enforce,
            log_sql: true,
            max_sql_length: Some(200),
            query_timeout: None,
        }
    }
}

impl DbConfig {
    /// Create a new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Disable the safety scanner.
    ///
    /// `confirmation` must be exactly [`UNCHECKED_CONFIRMATION`]; anything else
    /// is rejected and the scanner stays on.
    pub fn unchecked(mut self, confirmation: &str) -> DbResult<Self> {
        if confirmation != UNCHECKED_CONFIRMATION {
            return Err(DbError::validation(
                "unchecked mode requires the exact confirmation phrase",
            ));
        }
        self.scan_mode = ScanMode::Disabled;
        Ok(self)
    }

    /// Re-enable the safety scanner.
    pub fn enforce(mut self) -> Self {
        self.scan_mode = ScanMode::Enforce;
        self
    }

    /// Enable or disable per-statement logging.
    pub fn log_sql(mut self, enabled: bool) -> Self {
        self.log_sql = enabled;
        self
    }

    /// Set maximum SQL length to log.
    pub fn max_sql_length(mut self, len: usize) -> Self {
        self.max_sql_length = Some(len);
        self
    }

    /// Disable SQL truncation in logs.
    pub fn no_truncate(mut self) -> Self {
        self.max_sql_length = None;
        self
    }

    /// Set statement timeout.
    pub fn timeout(mut self, duration: Duration) -> Self {
        self.query_timeout = Some(duration);
        self
    }
}

/// Where a [`Db`] takes its scanner rules from.
#[derive(Debug, Clone)]
enum ScannerSource {
    /// The live process-wide registry, read on every scan.
    Global,
    Instance(Arc<SafetyScanner>),
}

/// A client wrapper that vets every statement with a [`SafetyScanner`].
///
/// `Db` implements [`GenericClient`] itself, so raw SQL sent through it is
/// scanned too. Query builders take `&Db<C>` for their terminal operations.
pub struct Db<C> {
    client: C,
    scanner: ScannerSource,
    registry: Arc<SchemaRegistry>,
    config: DbConfig,
}

impl<C> Db<C> {
    /// Wrap `client` with the process-wide scanner rules and table registry.
    ///
    /// Rules registered with [`pgquill_check::add_check`] and friends apply
    /// to every later statement, including those of clients built earlier.
    pub fn new(client: C) -> Self {
        Self {
            client,
            scanner: ScannerSource::Global,
            registry: SchemaRegistry::global(),
            config: DbConfig::default(),
        }
    }

    /// Wrap `client` with a custom configuration.
    pub fn with_config(client: C, config: DbConfig) -> Self {
        Self {
            config,
            ..Self::new(client)
        }
    }

    /// Use a specific scanner (e.g. one shared between several clients).
    pub fn with_scanner(mut self, scanner: Arc<SafetyScanner>) -> Self {
        self.scanner = ScannerSource::Instance(scanner);
        self
    }

    /// Use a specific table registry.
    pub fn with_registry(mut self, registry: Arc<SchemaRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn config(&self) -> &DbConfig {
        &self.config
    }

    /// The scanner set with [`Db::with_scanner`], or `None` when the
    /// process-wide rules are used.
    pub fn scanner(&self) -> Option<&Arc<SafetyScanner>> {
        match &self.scanner {
            ScannerSource::Global => None,
            ScannerSource::Instance(scanner) => Some(scanner),
        }
    }

    pub fn registry(&self) -> &Arc<SchemaRegistry> {
        &self.registry
    }

    /// The wrapped, unguarded client.
    pub fn inner(&self) -> &C {
        &self.client
    }

    pub fn into_inner(self) -> C {
        self.client
    }

    /// Run the safety scanner over `sql` and its bound parameters.
    ///
    /// Returns [`DbError::UnsafeQuery`] naming the first rule that vetoed it.
    pub fn vet(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> DbResult<()> {
        if self.config.scan_mode == ScanMode::Disabled {
            return Ok(());
        }

        let hints: Vec<Option<String>> = params.iter().map(|p| text_hint(*p)).collect();
        let bound: Vec<Option<&str>> = hints.iter().map(|h| h.as_deref()).collect();

        let result = match &self.scanner {
            ScannerSource::Global => check_global_bound(sql, &bound),
            ScannerSource::Instance(scanner) => scanner.check_bound(sql, &bound),
        };

        match result.issue {
            None => Ok(()),
            Some(issue) => {
                tracing::warn!(
                    target: "pgquill.sql",
                    rule = issue.rule.code(),
                    sql = %self.display_sql(sql),
                    "statement vetoed by safety scanner: {}",
                    issue.message
                );
                Err(DbError::UnsafeQuery(issue.to_string()))
            }
        }
    }

    fn display_sql<'a>(&self, sql: &'a str) -> Cow<'a, str> {
        match self.config.max_sql_length {
            Some(max) if sql.len() > max => {
                let mut end = max;
                while end > 0 && !sql.is_char_boundary(end) {
                    end -= 1;
                }
                Cow::Owned(format!("{}...", &sql[..end]))
            }
            _ => Cow::Borrowed(sql),
        }
    }

    fn log(&self, kind: &str, sql: &str, param_count: usize) {
        if self.config.log_sql {
            tracing::debug!(
                target: "pgquill.sql",
                kind,
                params = param_count,
                sql = %self.display_sql(sql),
                "executing statement"
            );
        }
    }

    async fn with_timeout<T, F>(&self, future: F) -> DbResult<T>
    where
        F: Future<Output = DbResult<T>> + Send,
    {
        match self.config.query_timeout {
            Some(timeout) => tokio::time::timeout(timeout, future)
                .await
                .map_err(|_| DbError::Timeout(timeout))?,
            None => future.await,
        }
    }
}

impl<C: GenericClient> Db<C> {
    /// Get a query bound to `name`, creating the table first if needed.
    ///
    /// The first call for a name (per registry) with a non-empty column list
    /// issues `CREATE TABLE IF NOT EXISTS`. Failures are logged and not
    /// returned: a `Query` is always produced.
    pub async fn table(&self, name: &str, columns: &[Column]) -> Query {
        let query = Query::new(name);
        if self.registry.contains(query.table()) {
            return query;
        }
        let Some(stmt) = query.create_statement(columns) else {
            return query;
        };

        match self.execute_statement(&stmt).await {
            Ok(_) => {
                if self.registry.insert(query.table()) {
                    tracing::info!(target: "pgquill.sql", table = query.table(), "table materialized");
                }
            }
            Err(e) => {
                tracing::warn!(
                    target: "pgquill.sql",
                    table = query.table(),
                    error = %e,
                    "failed to create table"
                );
            }
        }
        query
    }

    /// Vet and execute a compiled statement, returning the affected row count.
    pub async fn execute_statement(&self, stmt: &Statement) -> DbResult<u64> {
        let params = stmt.param_refs();
        self.guarded_execute(stmt.kind.as_str(), &stmt.sql, &params)
            .await
    }

    /// Vet and run a compiled statement, returning all rows.
    pub async fn query_statement(&self, stmt: &Statement) -> DbResult<Vec<Row>> {
        let params = stmt.param_refs();
        self.guarded_query(stmt.kind.as_str(), &stmt.sql, &params)
            .await
    }

    /// Execute a statement without scanning it.
    ///
    /// Reserved for `DROP TABLE`, which the scanner always vetoes.
    pub(crate) async fn execute_unscanned(&self, stmt: &Statement) -> DbResult<u64> {
        tracing::info!(
            target: "pgquill.sql",
            kind = stmt.kind.as_str(),
            sql = %self.display_sql(&stmt.sql),
            "executing without safety scan"
        );
        let params = stmt.param_refs();
        self.with_timeout(self.client.execute(&stmt.sql, &params))
            .await
    }

    async fn guarded_execute(
        &self,
        kind: &str,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> DbResult<u64> {
        self.vet(sql, params)?;
        self.log(kind, sql, params.len());
        self.with_timeout(self.client.execute(sql, params)).await
    }

    async fn guarded_query(
        &self,
        kind: &str,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> DbResult<Vec<Row>> {
        self.vet(sql, params)?;
        self.log(kind, sql, params.len());
        self.with_timeout(self.client.query(sql, params)).await
    }
}

impl<C: StreamingClient> Db<C> {
    /// Vet a compiled statement and stream its rows.
    pub async fn stream_statement(&self, stmt: &Statement) -> DbResult<RowStream> {
        let params = stmt.param_refs();
        self.guarded_stream(stmt.kind.as_str(), &stmt.sql, &params)
            .await
    }

    async fn guarded_stream(
        &self,
        kind: &str,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> DbResult<RowStream> {
        self.vet(sql, params)?;
        self.log(kind, sql, params.len());
        self.with_timeout(self.client.query_stream(sql, params))
            .await
    }
}

impl<C: GenericClient> GenericClient for Db<C> {
    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> DbResult<Vec<Row>> {
        self.guarded_query("query", sql, params).await
    }

    async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> DbResult<u64> {
        self.guarded_execute("execute", sql, params).await
    }

    async fn prepare_statement(&self, sql: &str) -> DbResult<tokio_postgres::Statement> {
        self.vet(sql, &[])?;
        self.log("prepare", sql, 0);
        self.with_timeout(self.client.prepare_statement(sql)).await
    }
}

impl<C: StreamingClient> StreamingClient for Db<C> {
    async fn query_stream(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> DbResult<RowStream> {
        self.guarded_stream("stream", sql, params).await
    }
}

#[cfg(test)]
mod tests;
