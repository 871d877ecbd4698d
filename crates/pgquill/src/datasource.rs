//! Data source descriptors and the pool limits derived from them.

use crate::error::{DbError, DbResult};
use pgquill_check::sanitize_path;
use std::fmt;
use std::time::Duration;

/// DSN of the shared-cache in-memory store.
pub const MEMORY_DSN: &str = "file::memory:?cache=shared";

/// Connection limits for a data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolLimits {
    /// Maximum number of live connections.
    pub max_open: usize,
    /// Maximum number of idle connections kept in the pool.
    pub max_idle: usize,
    /// Connections older than this are discarded instead of reused.
    pub max_lifetime: Option<Duration>,
}

impl PoolLimits {
    /// Single-writer stores: one connection, no lifetime bound.
    pub const SINGLE: PoolLimits = PoolLimits {
        max_open: 1,
        max_idle: 1,
        max_lifetime: None,
    };

    /// Networked servers: 10 open, 10 idle, recycled after 3 minutes.
    pub const SERVER: PoolLimits = PoolLimits {
        max_open: 10,
        max_idle: 10,
        max_lifetime: Some(Duration::from_secs(3 * 60)),
    };
}

/// A networked database server.
///
/// ```ignore
/// let server = Server::new("db.internal")
///     .port(5432)
///     .username("app")
///     .password("secret")
///     .database("app");
/// assert_eq!(server.dsn(), "app:secret@tcp(db.internal:5432)/app");
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Server {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub protocol: String,
    pub database: Option<String>,
}

impl Server {
    /// Default PostgreSQL port.
    pub const DEFAULT_PORT: u16 = 5432;

    /// A server at `host` on the default port, over `tcp`.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: Self::DEFAULT_PORT,
            username: String::new(),
            password: String::new(),
            protocol: "tcp".to_string(),
            database: None,
        }
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = username.into();
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = password.into();
        self
    }

    /// Transport: `tcp` (default) or `unix` (host is the socket directory).
    /// An empty protocol falls back to `tcp`.
    pub fn protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocol = protocol.into();
        self
    }

    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    fn effective_protocol(&self) -> &str {
        if self.protocol.is_empty() {
            "tcp"
        } else {
            &self.protocol
        }
    }

    /// `user:pass@protocol(host:port)[/database]`
    pub fn dsn(&self) -> String {
        let mut dsn = format!(
            "{}:{}@{}({}:{})",
            self.username,
            self.password,
            self.effective_protocol(),
            self.host,
            self.port
        );
        if let Some(db) = self.database.as_deref().filter(|d| !d.is_empty()) {
            dsn.push('/');
            dsn.push_str(db);
        }
        dsn
    }

    /// Driver configuration for this server.
    pub fn pg_config(&self) -> DbResult<tokio_postgres::Config> {
        let mut config = tokio_postgres::Config::new();
        match self.effective_protocol() {
            "tcp" => {
                config.host(&self.host);
            }
            #[cfg(unix)]
            "unix" => {
                config.host_path(&self.host);
            }
            other => {
                return Err(DbError::InvalidDataSource(format!(
                    "unsupported protocol '{other}'"
                )));
            }
        }
        config.port(self.port);
        if !self.username.is_empty() {
            config.user(&self.username);
        }
        if !self.password.is_empty() {
            config.password(&self.password);
        }
        if let Some(db) = self.database.as_deref().filter(|d| !d.is_empty()) {
            config.dbname(db);
        }
        Ok(config)
    }
}

impl fmt::Debug for Server {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Server")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("protocol", &self.effective_protocol())
            .field("database", &self.database)
            .finish()
    }
}

/// Where the database lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    /// A file-backed store. An empty path is the shared in-memory store.
    Path(String),
    /// A networked server.
    Server(Server),
}

impl DataSource {
    /// The shared-cache in-memory store.
    pub fn memory() -> Self {
        DataSource::Path(String::new())
    }

    /// A file-backed store at `path`.
    pub fn path(path: impl Into<String>) -> Self {
        DataSource::Path(path.into())
    }

    /// Returns true for file-backed and in-memory stores.
    pub fn is_file(&self) -> bool {
        matches!(self, DataSource::Path(_))
    }

    /// Connection string for this source.
    ///
    /// Paths are reduced to an allow-listed character set and wrapped as a
    /// shared-cache file reference.
    pub fn dsn(&self) -> String {
        match self {
            DataSource::Path(path) if path.is_empty() => MEMORY_DSN.to_string(),
            DataSource::Path(path) => format!("file:{}?cache=shared", sanitize_path(path)),
            DataSource::Server(server) => server.dsn(),
        }
    }

    /// Pool limits for this source.
    pub fn pool_limits(&self) -> PoolLimits {
        if self.is_file() {
            PoolLimits::SINGLE
        } else {
            PoolLimits::SERVER
        }
    }

    /// Driver configuration for this source.
    ///
    /// File-backed stores cannot be opened by the PostgreSQL driver and
    /// return [`DbError::InvalidDataSource`].
    pub fn pg_config(&self) -> DbResult<tokio_postgres::Config> {
        match self {
            DataSource::Path(_) => Err(DbError::InvalidDataSource(format!(
                "'{}' is a file store; the PostgreSQL driver needs a server",
                self.dsn()
            ))),
            DataSource::Server(server) => server.pg_config(),
        }
    }
}

impl From<Server> for DataSource {
    fn from(server: Server) -> Self {
        DataSource::Server(server)
    }
}
