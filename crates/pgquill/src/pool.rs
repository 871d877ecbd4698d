//! Connection pool utilities

use crate::datasource::{DataSource, PoolLimits};
use crate::db::{Db, DbConfig};
use crate::error::{DbError, DbResult};
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
use std::cell::Cell;
use tokio_postgres::NoTls;
use tokio_postgres::Socket;
use tokio_postgres::tls::{MakeTlsConnect, TlsConnect};

/// A connection pool sized for its data source.
///
/// `max_open` bounds the pool size. On every checkout, idle connections past
/// `max_lifetime` are discarded and at most `max_idle` idle connections are
/// kept.
///
/// ```ignore
/// let pool = DbPool::open(&Server::new("localhost").username("app").into())?;
/// let db = pool.db().await?;
/// let users = db.table("users", &[Column::text("username")]).await;
/// ```
#[derive(Clone)]
pub struct DbPool {
    pool: Pool,
    limits: PoolLimits,
    config: DbConfig,
}

impl DbPool {
    /// Open a pool for `source` without TLS.
    ///
    /// Connections are made lazily: an unreachable server is first reported
    /// by [`DbPool::get`]. Use [`DbPool::open_checked`] to fail early.
    pub fn open(source: &DataSource) -> DbResult<Self> {
        Self::open_with_tls(source, NoTls)
    }

    /// Open a pool for `source` and check out one connection to make sure the
    /// server is reachable. The connection goes back to the pool.
    pub async fn open_checked(source: &DataSource) -> DbResult<Self> {
        let pool = Self::open(source)?;
        if let Err(e) = pool.get().await {
            tracing::warn!(
                target: "pgquill.sql",
                source = ?source,
                error = %e,
                "data source unreachable"
            );
            return Err(e);
        }
        Ok(pool)
    }

    /// Open a pool for `source` using a custom TLS connector.
    pub fn open_with_tls<T>(source: &DataSource, tls: T) -> DbResult<Self>
    where
        T: MakeTlsConnect<Socket> + Clone + Sync + Send + 'static,
        T::Stream: Sync + Send,
        T::TlsConnect: Sync + Send,
        <T::TlsConnect as TlsConnect<Socket>>::Future: Send,
    {
        let pg_config = source.pg_config()?;
        build(pg_config, tls, source.pool_limits())
    }

    /// Open a pool from a `postgres://` URL with server limits.
    pub fn from_url(database_url: &str) -> DbResult<Self> {
        let pg_config: tokio_postgres::Config = database_url
            .parse()
            .map_err(|e: tokio_postgres::Error| DbError::Connection(e.to_string()))?;
        build(pg_config, NoTls, PoolLimits::SERVER)
    }

    /// Configuration applied to every [`Db`] handed out by [`DbPool::db`].
    pub fn with_db_config(mut self, config: DbConfig) -> Self {
        self.config = config;
        self
    }

    pub fn limits(&self) -> PoolLimits {
        self.limits
    }

    /// The underlying deadpool pool.
    pub fn inner(&self) -> &Pool {
        &self.pool
    }

    /// Check out a connection.
    pub async fn get(&self) -> DbResult<deadpool_postgres::Client> {
        self.prune();
        Ok(self.pool.get().await?)
    }

    /// Check out a connection wrapped in a guarded [`Db`].
    pub async fn db(&self) -> DbResult<Db<deadpool_postgres::Client>> {
        let client = self.get().await?;
        Ok(Db::with_config(client, self.config.clone()))
    }

    fn prune(&self) {
        let lifetime = self.limits.max_lifetime;
        let max_idle = self.limits.max_idle;
        let kept = Cell::new(0usize);
        let result = self.pool.retain(|_, metrics| {
            let fresh = lifetime.is_none_or(|max| metrics.age() < max);
            let keep = fresh && kept.get() < max_idle;
            if keep {
                kept.set(kept.get() + 1);
            }
            keep
        });
        if !result.removed.is_empty() {
            tracing::debug!(
                target: "pgquill.sql",
                removed = result.removed.len(),
                retained = result.retained,
                "pruned idle connections"
            );
        }
    }
}

fn build<T>(pg_config: tokio_postgres::Config, tls: T, limits: PoolLimits) -> DbResult<DbPool>
where
    T: MakeTlsConnect<Socket> + Clone + Sync + Send + 'static,
    T::Stream: Sync + Send,
    T::TlsConnect: Sync + Send,
    <T::TlsConnect as TlsConnect<Socket>>::Future: Send,
{
    let mgr = Manager::from_config(pg_config, tls, default_manager_config());
    let pool = Pool::builder(mgr)
        .max_size(limits.max_open)
        .build()
        .map_err(|e| DbError::Pool(e.to_string()))?;
    Ok(DbPool {
        pool,
        limits,
        config: DbConfig::default(),
    })
}

fn default_manager_config() -> ManagerConfig {
    ManagerConfig {
        recycling_method: RecyclingMethod::Fast,
    }
}
