// Entity store interface - every read and write the views perform goes through here

use async_trait::async_trait;

use crate::entities::{
    Comment, CommentView, Follow, Group, NewComment, NewGroup, NewPost, Post, PostFilter,
    PostView, User,
};
use crate::error::AppResult;

/// Relational store for users, groups, posts, comments and follow edges.
///
/// Implementations must enforce the referential rules at the storage layer:
/// - `Group.slug` and `(Follow.user_id, Follow.author_id)` are unique; a
///   duplicate insert fails with `AppError::Conflict`.
/// - Deleting a user removes their posts, comments and follow edges.
/// - Deleting a group clears `group_id` on its posts.
/// - Deleting a post removes its comments.
#[async_trait]
pub trait DatabaseInterface: Send + Sync {
    async fn create_user(&self, username: &str) -> AppResult<User>;
    async fn get_user_by_username(&self, username: &str) -> AppResult<Option<User>>;
    async fn delete_user(&self, id: i64) -> AppResult<bool>;

    async fn create_group(&self, group: NewGroup) -> AppResult<Group>;
    async fn get_group(&self, id: i64) -> AppResult<Option<Group>>;
    async fn get_group_by_slug(&self, slug: &str) -> AppResult<Option<Group>>;
    async fn list_groups(&self) -> AppResult<Vec<Group>>;
    async fn delete_group(&self, id: i64) -> AppResult<bool>;

    async fn create_post(&self, post: NewPost) -> AppResult<Post>;
    async fn get_post(&self, id: i64) -> AppResult<Option<PostView>>;
    /// Updates the mutable fields only; author, date and image stay as stored.
    async fn update_post(&self, id: i64, text: &str, group_id: Option<i64>) -> AppResult<()>;
    async fn delete_post(&self, id: i64) -> AppResult<bool>;
    /// Newest first by publication date.
    async fn list_posts(&self, filter: PostFilter, limit: u32, offset: u32)
        -> AppResult<Vec<PostView>>;
    async fn count_posts(&self, filter: PostFilter) -> AppResult<u64>;

    async fn create_comment(&self, comment: NewComment) -> AppResult<Comment>;
    /// Oldest first, in the order they were written.
    async fn list_comments(&self, post_id: i64) -> AppResult<Vec<CommentView>>;
    async fn count_comments(&self) -> AppResult<u64>;

    async fn create_follow(&self, user_id: i64, author_id: i64) -> AppResult<Follow>;
    async fn delete_follow(&self, user_id: i64, author_id: i64) -> AppResult<bool>;
    async fn follow_exists(&self, user_id: i64, author_id: i64) -> AppResult<bool>;
    async fn count_follows(&self) -> AppResult<u64>;
}
