use serde::Deserialize;
use std::num::{NonZeroU32, NonZeroU64};

/// Configuration for connecting to the Postgres database
/// that stores posts and their comments.
#[derive(Deserialize)]
pub struct Database {
    /// Connection URL connecting to the Postgres database.
    ///
    /// **Environment variables**:
    /// - `POSTS_DB_URL` or `DATABASE_URL`
    pub url: String,
    /// Maximum amount of connections the pool may open at once.
    /// Requests wait for a free connection once this is reached.
    ///
    /// **Environment variables**:
    /// - `POSTS_DB_MAX_OPEN`
    #[serde(default = "Database::default_max_open")]
    pub max_open: NonZeroU32,
    /// Amount of idle connections kept around so requests don't
    /// have to wait for a new connection to be established.
    ///
    /// **Environment variables**:
    /// - `POSTS_DB_MAX_IDLE`
    #[serde(default = "Database::default_max_idle")]
    pub max_idle: u32,
    /// How long a request may wait for a pooled connection before
    /// giving up.
    ///
    /// **Environment variables**:
    /// - `POSTS_DB_ACQUIRE_TIMEOUT_SECS`
    #[serde(default = "Database::default_acquire_timeout_secs")]
    pub acquire_timeout_secs: NonZeroU64,
}

impl Database {
    const DEFAULT_MAX_OPEN: u32 = 10;
    const DEFAULT_MAX_IDLE: u32 = 5;
    const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 5;

    // Required by serde
    const fn default_max_open() -> NonZeroU32 {
        match NonZeroU32::new(Self::DEFAULT_MAX_OPEN) {
            Some(n) => n,
            None => panic!("DEFAULT_MAX_OPEN is accidentally set to 0"),
        }
    }

    const fn default_max_idle() -> u32 {
        Self::DEFAULT_MAX_IDLE
    }

    const fn default_acquire_timeout_secs() -> NonZeroU64 {
        match NonZeroU64::new(Self::DEFAULT_ACQUIRE_TIMEOUT_SECS) {
            Some(n) => n,
            None => panic!("DEFAULT_ACQUIRE_TIMEOUT_SECS is accidentally set to 0"),
        }
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("url", &"<hidden>")
            .field("max_open", &self.max_open)
            .field("max_idle", &self.max_idle)
            .field("acquire_timeout_secs", &self.acquire_timeout_secs)
            .finish()
    }
}
