use error_stack::{Report, Result};
use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use std::num::{NonZeroU64, NonZeroUsize};
use std::str::FromStr;
use std::time::Duration;

use super::ParseError;
use crate::util::figment::FigmentErrorAttachable;

#[derive(Debug, Deserialize)]
pub struct Server {
    pub db: super::Database,
    /// **Environment variables**:
    /// - `POSTS_ADDRESS`
    #[serde(default = "Server::default_address")]
    pub address: IpAddr,
    /// **Environment variables**:
    /// - `POSTS_PORT`
    #[serde(default = "Server::default_port")]
    pub port: u16,
    /// Amount of HTTP worker threads.
    ///
    /// **Environment variables**:
    /// - `POSTS_WORKERS`
    #[serde(default = "Server::default_workers")]
    pub workers: NonZeroUsize,
    /// Upper bound for every database operation a request performs.
    /// Operations taking longer are aborted and answered with an
    /// internal server error.
    ///
    /// **Environment variables**:
    /// - `POSTS_REQUEST_TIMEOUT_SECS`
    #[serde(default = "Server::default_request_timeout_secs")]
    pub request_timeout_secs: NonZeroU64,
    /// Maximum level of log events to print. Accepts `trace`, `debug`,
    /// `info`, `warn` or `error`.
    ///
    /// **Environment variables**:
    /// - `POSTS_LOG_LEVEL`
    #[serde(default = "Server::default_log_level")]
    pub log_level: String,
}

impl Server {
    pub fn load() -> Result<Self, ParseError> {
        dotenvy::dotenv().ok();

        let config = Self::figment()
            .extract::<Self>()
            .map_err(|e| Report::new(ParseError).attach_figment_error(e))?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ParseError> {
        let mut problems = Vec::new();
        if self.db.url.trim().is_empty() {
            problems.push("db.url: database url must not be empty".to_string());
        }
        if self.db.max_idle > self.db.max_open.get() {
            problems.push(format!(
                "db.max_idle: {} idle connections exceeds max_open ({})",
                self.db.max_idle, self.db.max_open
            ));
        }
        if tracing::Level::from_str(&self.log_level).is_err() {
            problems.push(format!("log_level: unknown log level {:?}", self.log_level));
        }

        if problems.is_empty() {
            return Ok(());
        }

        let mut report = Report::new(ParseError);
        for problem in problems {
            report = report.attach_printable(problem);
        }
        Err(report)
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.get())
    }

    #[must_use]
    pub fn log_level(&self) -> tracing::Level {
        tracing::Level::from_str(&self.log_level).unwrap_or(tracing::Level::INFO)
    }
}

impl Server {
    const DEFAULT_CONFIG_FILE: &'static str = "posts.toml";
    const DEFAULT_PORT: u16 = 8080;
    const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 5;

    /// Creates a default [`Figment`] object to load server
    /// configuration. This function is there for loading and testing.
    ///
    /// [`Figment`]: figment::Figment
    pub(crate) fn figment() -> figment::Figment {
        use figment::{
            providers::{Env, Format, Toml},
            Figment,
        };

        Figment::new()
            .merge(Toml::file(Self::DEFAULT_CONFIG_FILE))
            // Environment variable aliases
            .merge(Env::raw().only(&["DATABASE_URL"]).map(|_| "db.url".into()))
            // Fields with underscores in them need to be mapped by hand,
            // the env provider can't tell them apart from nested keys.
            .merge(Env::prefixed("POSTS_").map(|v| match v.as_str() {
                "DB_URL" => "db.url".into(),
                "DB_MAX_OPEN" => "db.max_open".into(),
                "DB_MAX_IDLE" => "db.max_idle".into(),
                "DB_ACQUIRE_TIMEOUT_SECS" => "db.acquire_timeout_secs".into(),
                "REQUEST_TIMEOUT_SECS" => "request_timeout_secs".into(),
                "LOG_LEVEL" => "log_level".into(),
                _ => v.as_str().to_ascii_lowercase().into(),
            }))
    }

    const fn default_address() -> IpAddr {
        IpAddr::V4(Ipv4Addr::UNSPECIFIED)
    }

    const fn default_port() -> u16 {
        Self::DEFAULT_PORT
    }

    fn default_workers() -> NonZeroUsize {
        std::thread::available_parallelism().unwrap_or(NonZeroUsize::MIN)
    }

    const fn default_request_timeout_secs() -> NonZeroU64 {
        match NonZeroU64::new(Self::DEFAULT_REQUEST_TIMEOUT_SECS) {
            Some(n) => n,
            None => panic!("DEFAULT_REQUEST_TIMEOUT_SECS is accidentally set to 0"),
        }
    }

    fn default_log_level() -> String {
        "info".into()
    }
}

#[cfg(test)]
impl Server {
    /// Configuration used by tests that never touch a real database.
    pub(crate) fn for_tests() -> Self {
        Self {
            db: super::Database {
                url: "postgres://localhost/posts".into(),
                max_open: std::num::NonZeroU32::MIN,
                max_idle: 0,
                acquire_timeout_secs: NonZeroU64::MIN,
            },
            address: Self::default_address(),
            port: 0,
            workers: NonZeroUsize::MIN,
            request_timeout_secs: Self::default_request_timeout_secs(),
            log_level: Self::default_log_level(),
        }
    }
}
