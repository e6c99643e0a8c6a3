use error_stack::ResultExt;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use std::{str::FromStr, time::Duration};

use crate::config;

mod error;
pub use error::*;

pub type Transaction = sqlx::Transaction<'static, sqlx::Postgres>;

/// Bounded pool of Postgres connections shared by every request.
#[derive(Clone)]
pub struct Pool {
    pool: sqlx::PgPool,
}

impl Pool {
    /// Builds the pool without connecting right away. Connections are
    /// opened on demand up to `max_open`, while up to `max_idle` of them
    /// are kept warm.
    pub fn new(cfg: &config::Database) -> Result<Self> {
        let pool_opts = PgPoolOptions::new()
            .acquire_timeout(Duration::from_secs(cfg.acquire_timeout_secs.get()))
            .max_connections(cfg.max_open.get())
            .min_connections(cfg.max_idle);

        let connect_opts =
            PgConnectOptions::from_str(cfg.url.as_str()).change_context(Error::InvalidUrl)?;

        Ok(Self {
            pool: pool_opts.connect_lazy_with(connect_opts),
        })
    }
}

impl From<sqlx::PgPool> for Pool {
    fn from(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

impl std::fmt::Debug for Pool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.pool.fmt(f)
    }
}

impl Pool {
    /// Gives direct access to the underlying [`sqlx::PgPool`] so that
    /// single statements can run without acquiring a connection first.
    #[inline(always)]
    pub fn inner(&self) -> &sqlx::PgPool {
        &self.pool
    }

    #[tracing::instrument(name = "db.transaction", skip(self))]
    pub async fn begin(&self) -> Result<Transaction> {
        self.pool.begin().await.into_db_error()
    }

    /// Waits for one connection. Only a pool that cannot hand one out
    /// in time is reported as [unhealthy](Error::UnhealthyPool), other
    /// failures (like bad credentials) are reported as they are.
    #[tracing::instrument(skip(self))]
    pub async fn wait_until_healthy(&self) -> Result<()> {
        self.pool.acquire().await.map(drop).into_db_error()
    }
}
