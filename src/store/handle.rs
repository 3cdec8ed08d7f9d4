//! Connection handles for the supported relational back-ends.

use crate::config::StoreConfig;
use crate::{Error, Result};

use serde::{Deserialize, Serialize};
use sqlx::any::AnyPoolOptions;
use sqlx::AnyPool;
use std::fmt;
use tracing::info;

/// Supported relational back-ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// PostgreSQL
    Postgres,
    /// SQLite
    Sqlite,
    /// MySQL / MariaDB
    MySql,
}

impl Backend {
    /// URL schemes accepted for this back-end.
    pub fn schemes(&self) -> &'static [&'static str] {
        match self {
            Backend::Postgres => &["postgres:", "postgresql:"],
            Backend::Sqlite => &["sqlite:"],
            Backend::MySql => &["mysql:"],
        }
    }

    /// Check that a connection URL belongs to this back-end.
    pub fn check_url(&self, url: &str) -> Result<()> {
        if self.schemes().iter().any(|scheme| url.starts_with(scheme)) {
            Ok(())
        } else {
            Err(Error::config_key(
                format!("URL does not match the {} back-end", self),
                "store.url",
            ))
        }
    }

    /// Name of the back-end.
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Postgres => "postgres",
            Backend::Sqlite => "sqlite",
            Backend::MySql => "mysql",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An open connection pool to one of the supported back-ends.
///
/// The handle is closed explicitly with [`StoreHandle::close`]; dropping it
/// releases connections without waiting for them.
#[derive(Debug, Clone)]
pub struct StoreHandle {
    backend: Backend,
    pool: AnyPool,
}

impl StoreHandle {
    /// Open a PostgreSQL pool.
    pub async fn postgres(url: &str, config: &StoreConfig) -> Result<Self> {
        Self::connect(Backend::Postgres, url, config).await
    }

    /// Open a SQLite pool.
    ///
    /// In-memory databases live and die with their connection, so the pool is
    /// pinned to a single connection that is never recycled.
    pub async fn sqlite(url: &str, config: &StoreConfig) -> Result<Self> {
        Self::connect(Backend::Sqlite, url, config).await
    }

    /// Open a MySQL pool.
    pub async fn mysql(url: &str, config: &StoreConfig) -> Result<Self> {
        Self::connect(Backend::MySql, url, config).await
    }

    /// Open a pool for the given back-end.
    pub async fn connect(backend: Backend, url: &str, config: &StoreConfig) -> Result<Self> {
        backend.check_url(url)?;
        sqlx::any::install_default_drivers();

        let mut options = AnyPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout());
        if backend == Backend::Sqlite && is_memory_url(url) {
            options = options
                .min_connections(1)
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }

        let pool = options.connect(url).await?;
        info!(backend = %backend, "opened policy store connection pool");

        Ok(Self { backend, pool })
    }

    /// Wrap an already-open pool.
    pub fn from_pool(backend: Backend, pool: AnyPool) -> Self {
        Self { backend, pool }
    }

    /// The back-end this handle talks to.
    pub fn backend(&self) -> Backend {
        self.backend
    }

    /// The underlying pool.
    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    /// Close the pool, waiting for checked-out connections to be returned.
    pub async fn close(&self) {
        self.pool.close().await;
        info!(backend = %self.backend, "closed policy store connection pool");
    }

    /// Check whether the pool has been closed.
    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }
}

fn is_memory_url(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_url_check() {
        assert!(Backend::Postgres.check_url("postgres://localhost/db").is_ok());
        assert!(Backend::Postgres.check_url("postgresql://localhost/db").is_ok());
        assert!(Backend::Postgres.check_url("sqlite::memory:").is_err());
        assert!(Backend::Sqlite.check_url("sqlite::memory:").is_ok());
        assert!(Backend::Sqlite.check_url("mysql://localhost/db").is_err());
        assert!(Backend::MySql.check_url("mysql://root@localhost/casbin").is_ok());
        assert!(Backend::MySql.check_url("postgres://localhost/db").is_err());
    }

    #[test]
    fn test_memory_url_detection() {
        assert!(is_memory_url("sqlite::memory:"));
        assert!(is_memory_url("sqlite://rules?mode=memory&cache=shared"));
        assert!(!is_memory_url("sqlite://rules.db?mode=rwc"));
    }

    #[tokio::test]
    async fn test_sqlite_memory_mode_url_keeps_data() {
        let handle = StoreHandle::sqlite("sqlite://rules?mode=memory", &StoreConfig::default())
            .await
            .unwrap();
        sqlx::query("CREATE TABLE t (v TEXT)")
            .execute(handle.pool())
            .await
            .unwrap();
        sqlx::query("INSERT INTO t (v) VALUES ('x')")
            .execute(handle.pool())
            .await
            .unwrap();

        // Every statement runs on the one pinned connection, so the table is still there
        let rows = sqlx::query("SELECT v FROM t")
            .fetch_all(handle.pool())
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        handle.close().await;
    }

    #[test]
    fn test_backend_serde() {
        let backend: Backend = serde_json::from_str("\"postgres\"").unwrap();
        assert_eq!(backend, Backend::Postgres);
        assert_eq!(serde_json::to_string(&Backend::Sqlite).unwrap(), "\"sqlite\"");
        let backend: Backend = serde_json::from_str("\"mysql\"").unwrap();
        assert_eq!(backend, Backend::MySql);
    }

    #[tokio::test]
    async fn test_sqlite_memory_handle() {
        let handle = StoreHandle::sqlite("sqlite::memory:", &StoreConfig::default())
            .await
            .unwrap();
        assert_eq!(handle.backend(), Backend::Sqlite);
        assert!(!handle.is_closed());

        handle.close().await;
        assert!(handle.is_closed());
    }

    #[tokio::test]
    async fn test_connect_rejects_mismatched_url() {
        let err = StoreHandle::postgres("sqlite::memory:", &StoreConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }
}
