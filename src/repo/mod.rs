//! Persistence of the [`Post`] aggregate.
//!
//! [`PostsRepo`] is the port every HTTP handler talks to. There are two
//! implementations: [`PgPostsRepo`] stores posts in Postgres and
//! [`MemoryPostsRepo`] keeps them in memory, which is handy for testing
//! the handlers without a live database.
//!
//! None of the operations retry. Callers bound each call with a timeout
//! and dropping the returned future aborts whatever the store is doing.
use async_trait::async_trait;
use thiserror::Error;

use crate::model::Post;

mod memory;
mod postgres;

pub use self::memory::MemoryPostsRepo;
pub use self::postgres::PgPostsRepo;

/// Names the step of a repository operation that failed.
///
/// The error reported by the store itself is kept as the source
/// of the report, it is never reclassified.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum RepoError {
    #[error("could not begin transaction")]
    BeginTransaction,
    #[error("could not insert new post")]
    InsertPost,
    #[error("could not insert post's comments")]
    InsertComments,
    #[error("could not commit transaction")]
    Commit,
    #[error("could not rollback transaction")]
    Rollback,
    #[error("could not query posts table")]
    QueryPost,
    #[error("could not query comments table")]
    QueryComments,
    #[error("could not delete post")]
    DeletePost,
    #[error("likes count does not fit the likes column")]
    LikesOutOfRange,
}

pub type Result<T> = error_stack::Result<T, RepoError>;

#[async_trait]
pub trait PostsRepo: Send + Sync + 'static {
    /// Stores a post and all of its comments in one go.
    ///
    /// Either every row is written or none of them are. Saving a
    /// post or comment whose identifier already exists fails.
    async fn save(&self, post: &Post) -> Result<()>;

    /// Loads a post with its comments. A missing post is `Ok(None)`.
    ///
    /// The order of comments is not guaranteed to match the order
    /// they were saved in.
    async fn get(&self, id: &str) -> Result<Option<Post>>;

    /// Deletes a post together with its comments. Returns whether
    /// there was a post to delete.
    async fn delete(&self, id: &str) -> Result<bool>;
}
