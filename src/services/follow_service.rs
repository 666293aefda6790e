// FollowService - follower -> author edges and the feed derived from them

use std::sync::Arc;
use tracing::{info, instrument};

use crate::{
    entities::{PostFilter, PostView, User},
    error::{AppError, AppResult},
    infrastructure::database::DatabaseInterface,
    pagination::{Page, Paginator},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowOutcome {
    Followed,
    /// The store refused a second edge for the same pair.
    AlreadyFollowing,
    /// Users cannot follow themselves.
    SelfFollow,
}

#[derive(Clone)]
pub struct FollowService {
    db: Arc<dyn DatabaseInterface>,
}

impl FollowService {
    pub fn new(db: Arc<dyn DatabaseInterface>) -> Self {
        Self { db }
    }

    /// Insert the edge `follower -> author`.
    ///
    /// Uniqueness is left to the store; its conflict is reported as
    /// `AlreadyFollowing` rather than an error.
    #[instrument(skip(self, follower, author), fields(follower = %follower.username, author = %author.username))]
    pub async fn follow(&self, follower: &User, author: &User) -> AppResult<FollowOutcome> {
        if follower.id == author.id {
            return Ok(FollowOutcome::SelfFollow);
        }

        match self.db.create_follow(follower.id, author.id).await {
            Ok(_) => {
                info!("{} now follows {}", follower.username, author.username);
                Ok(FollowOutcome::Followed)
            }
            Err(AppError::Conflict(_)) => Ok(FollowOutcome::AlreadyFollowing),
            Err(e) => Err(e),
        }
    }

    /// Remove the edge if present. Returns whether anything was removed.
    #[instrument(skip(self, follower, author), fields(follower = %follower.username, author = %author.username))]
    pub async fn unfollow(&self, follower: &User, author: &User) -> AppResult<bool> {
        let removed = self.db.delete_follow(follower.id, author.id).await?;
        if removed {
            info!("{} unfollowed {}", follower.username, author.username);
        }
        Ok(removed)
    }

    pub async fn is_following(&self, follower: Option<&User>, author: &User) -> AppResult<bool> {
        match follower {
            Some(follower) if follower.id != author.id => {
                self.db.follow_exists(follower.id, author.id).await
            }
            _ => Ok(false),
        }
    }

    /// Posts by the authors `follower` follows, newest first.
    pub async fn feed(
        &self,
        paginator: &Paginator,
        follower: &User,
        raw_page: Option<&str>,
    ) -> AppResult<Page<PostView>> {
        paginator
            .paginate(self.db.as_ref(), PostFilter::FollowedBy(follower.id), raw_page)
            .await
    }
}
