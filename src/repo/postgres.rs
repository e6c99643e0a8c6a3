use async_trait::async_trait;
use error_stack::{Report, ResultExt};
use sqlx::{FromRow, Postgres, QueryBuilder};
use tracing::{debug, error};

use super::{PostsRepo, RepoError, Result};
use crate::database::{ErrorExt, Pool, Transaction};
use crate::model::{Comment, Post};

/// Postgres only accepts this many bind parameters in one statement.
const MAX_BIND_PARAMS: usize = u16::MAX as usize;
const COMMENT_COLUMNS: usize = 4;
const COMMENTS_PER_STATEMENT: usize = MAX_BIND_PARAMS / COMMENT_COLUMNS;

/// Stores posts in the `posts` table and their comments in the
/// `comments` table.
///
/// Removing comments of a deleted post is left to the
/// `ON DELETE CASCADE` foreign key of `comments.post_uuid`.
#[derive(Debug, Clone)]
pub struct PgPostsRepo {
    pool: Pool,
}

impl PgPostsRepo {
    #[must_use]
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct PostRow {
    uuid: String,
    title: String,
    likes: i16,
}

#[derive(Debug, FromRow)]
struct CommentRow {
    uuid: String,
    body: String,
    likes: i16,
}

impl CommentRow {
    fn into_comment(self) -> Result<Comment> {
        Ok(Comment {
            id: self.uuid,
            body: self.body,
            likes: likes_from_column(self.likes)?,
        })
    }
}

/// A comment ready to be bound into the batched insert.
#[derive(Debug)]
struct NewComment<'a> {
    id: &'a str,
    body: &'a str,
    likes: i16,
}

#[async_trait]
impl PostsRepo for PgPostsRepo {
    #[tracing::instrument(
        skip_all,
        fields(post.id = %post.id, post.comments = post.comments.len()),
        name = "repo.posts.save"
    )]
    async fn save(&self, post: &Post) -> Result<()> {
        let likes = likes_to_column(post.likes)?;
        let comments = post
            .comments
            .iter()
            .map(|comment| -> Result<NewComment<'_>> {
                Ok(NewComment {
                    id: &comment.id,
                    body: &comment.body,
                    likes: likes_to_column(comment.likes)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut tx = self
            .pool
            .begin()
            .await
            .change_context(RepoError::BeginTransaction)?;

        let result = sqlx::query("INSERT INTO posts (uuid, title, likes) VALUES ($1, $2, $3)")
            .bind(post.id.as_str())
            .bind(post.title.as_str())
            .bind(likes)
            .execute(&mut *tx)
            .await
            .into_db_error()
            .change_context(RepoError::InsertPost);

        if let Err(report) = result {
            return Err(rollback(tx, report).await);
        }

        for chunk in comments.chunks(COMMENTS_PER_STATEMENT) {
            let result = insert_comments_query(&post.id, chunk)
                .build()
                .execute(&mut *tx)
                .await
                .into_db_error()
                .change_context(RepoError::InsertComments);

            if let Err(report) = result {
                return Err(rollback(tx, report).await);
            }
        }

        tx.commit()
            .await
            .into_db_error()
            .change_context(RepoError::Commit)?;

        debug!("post saved");
        Ok(())
    }

    #[tracing::instrument(skip(self), name = "repo.posts.get")]
    async fn get(&self, id: &str) -> Result<Option<Post>> {
        let row = sqlx::query_as::<_, PostRow>(
            "SELECT uuid, title, likes FROM posts WHERE uuid = $1",
        )
        .bind(id)
        .fetch_optional(self.pool.inner())
        .await
        .into_db_error()
        .change_context(RepoError::QueryPost)?;

        let Some(row) = row else {
            debug!("post not found");
            return Ok(None);
        };

        let comments = sqlx::query_as::<_, CommentRow>(
            "SELECT uuid, body, likes FROM comments WHERE post_uuid = $1",
        )
        .bind(id)
        .fetch_all(self.pool.inner())
        .await
        .into_db_error()
        .change_context(RepoError::QueryComments)?
        .into_iter()
        .map(CommentRow::into_comment)
        .collect::<Result<Vec<_>>>()?;

        Ok(Some(Post {
            id: row.uuid,
            title: row.title,
            likes: likes_from_column(row.likes)?,
            comments,
        }))
    }

    #[tracing::instrument(skip(self), name = "repo.posts.delete")]
    async fn delete(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM posts WHERE uuid = $1")
            .bind(id)
            .execute(self.pool.inner())
            .await
            .into_db_error()
            .change_context(RepoError::DeletePost)?;

        Ok(result.rows_affected() > 0)
    }
}

/// Builds one `INSERT` with a `($n, $n+1, $n+2, $n+3)` parameter
/// group per comment.
fn insert_comments_query<'a>(
    post_id: &'a str,
    comments: &'a [NewComment<'a>],
) -> QueryBuilder<'a, Postgres> {
    let mut query = QueryBuilder::new("INSERT INTO comments (uuid, post_uuid, body, likes) ");
    query.push_values(comments, |mut row, comment| {
        row.push_bind(comment.id)
            .push_bind(post_id)
            .push_bind(comment.body)
            .push_bind(comment.likes);
    });
    query
}

async fn rollback(tx: Transaction, cause: Report<RepoError>) -> Report<RepoError> {
    with_rollback_result(cause, tx.rollback().await)
}

/// Keeps the original cause of a failed transaction and, if rolling
/// back failed as well, adds the rollback failure next to it.
fn with_rollback_result(
    mut cause: Report<RepoError>,
    rollback: std::result::Result<(), sqlx::Error>,
) -> Report<RepoError> {
    if let Err(rollback_error) = rollback {
        error!(%rollback_error, "Failed to rollback transaction");
        cause.extend_one(Report::new(rollback_error).change_context(RepoError::Rollback));
    }
    cause
}

fn likes_to_column(likes: u32) -> Result<i16> {
    i16::try_from(likes)
        .change_context(RepoError::LikesOutOfRange)
        .attach_printable_lazy(|| format!("likes = {likes}"))
}

fn likes_from_column(likes: i16) -> Result<u32> {
    u32::try_from(likes)
        .change_context(RepoError::LikesOutOfRange)
        .attach_printable_lazy(|| format!("likes = {likes}"))
}
