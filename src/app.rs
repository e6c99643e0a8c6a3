use error_stack::{Result, ResultExt};
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

use crate::{
    config,
    database::{self, ReportExt},
    repo::{PgPostsRepo, PostsRepo},
};

/// State shared by every request handler.
#[derive(Clone)]
pub struct App {
    pub config: Arc<config::Server>,
    pub posts: Arc<dyn PostsRepo>,
}

#[derive(Debug, Error)]
#[error("Failed to initialize App struct")]
pub struct AppError;

impl App {
    /// Creates an [`App`] that stores posts in the Postgres database
    /// from the given [configuration](config::Server).
    #[tracing::instrument(skip_all, name = "app.new")]
    pub async fn new(cfg: config::Server) -> Result<Self, AppError> {
        let pool = database::Pool::new(&cfg.db).change_context(AppError)?;

        // Connections are opened lazily so an unreachable database at
        // startup is only worth a warning.
        match pool.wait_until_healthy().await {
            Ok(..) => {}
            Err(error) if error.is_unhealthy() => {
                warn!(?error, "Database is not reachable yet");
            }
            Err(error) => return Err(error.change_context(AppError)),
        }

        Ok(Self::with_repo(cfg, Arc::new(PgPostsRepo::new(pool))))
    }

    #[must_use]
    pub fn with_repo(cfg: config::Server, posts: Arc<dyn PostsRepo>) -> Self {
        Self {
            config: Arc::new(cfg),
            posts,
        }
    }
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
