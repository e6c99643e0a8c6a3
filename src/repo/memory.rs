use async_trait::async_trait;
use error_stack::Report;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::{PostsRepo, RepoError, Result};
use crate::model::Post;

/// Keeps posts in memory while following the same rules as the
/// Postgres tables: identifiers of posts and comments are unique,
/// saving is all or nothing and deleting a post drops its comments.
///
/// Every call is counted, see [`MemoryPostsRepo::calls`].
#[derive(Debug, Default)]
pub struct MemoryPostsRepo {
    state: Mutex<State>,
    calls: AtomicUsize,
}

#[derive(Debug, Default)]
struct State {
    posts: HashMap<String, Post>,
    comment_ids: HashSet<String>,
}

impl MemoryPostsRepo {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// How many times any of the [`PostsRepo`] operations were called.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn enter(&self) -> MutexGuard<'_, State> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl PostsRepo for MemoryPostsRepo {
    #[tracing::instrument(skip_all, fields(post.id = %post.id), name = "repo.memory.save")]
    async fn save(&self, post: &Post) -> Result<()> {
        let mut state = self.enter();
        if state.posts.contains_key(&post.id) {
            return Err(Report::new(RepoError::InsertPost)
                .attach_printable(format!("duplicate post identifier {:?}", post.id)));
        }

        let mut seen = HashSet::with_capacity(post.comments.len());
        for comment in &post.comments {
            if state.comment_ids.contains(&comment.id) || !seen.insert(comment.id.as_str()) {
                return Err(Report::new(RepoError::InsertComments)
                    .attach_printable(format!("duplicate comment identifier {:?}", comment.id)));
            }
        }

        state
            .comment_ids
            .extend(post.comments.iter().map(|c| c.id.clone()));
        state.posts.insert(post.id.clone(), post.clone());
        Ok(())
    }

    #[tracing::instrument(skip(self), name = "repo.memory.get")]
    async fn get(&self, id: &str) -> Result<Option<Post>> {
        Ok(self.enter().posts.get(id).cloned())
    }

    #[tracing::instrument(skip(self), name = "repo.memory.delete")]
    async fn delete(&self, id: &str) -> Result<bool> {
        let mut state = self.enter();
        let Some(post) = state.posts.remove(id) else {
            return Ok(false);
        };
        for comment in &post.comments {
            state.comment_ids.remove(&comment.id);
        }
        Ok(true)
    }
}
