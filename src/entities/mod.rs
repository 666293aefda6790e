// Blog entities - plain records mapped onto the relational schema

pub mod ent_comment;
pub mod ent_follow;
pub mod ent_group;
pub mod ent_post;
pub mod ent_user;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use ent_comment::{Comment, CommentView, NewComment, COMMENT_MAX_LENGTH};
pub use ent_follow::Follow;
pub use ent_group::{Group, NewGroup, GROUP_TITLE_MAX_LENGTH};
pub use ent_post::{NewPost, Post, PostFilter, PostView, IMAGE_UPLOAD_TO};
pub use ent_user::{User, UserRef};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityType {
    User,
    Group,
    Post,
    Comment,
    Follow,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::User => "user",
            EntityType::Group => "group",
            EntityType::Post => "post",
            EntityType::Comment => "comment",
            EntityType::Follow => "follow",
        }
    }

    pub fn table(&self) -> &'static str {
        match self {
            EntityType::User => "users",
            EntityType::Group => "post_groups",
            EntityType::Post => "posts",
            EntityType::Comment => "comments",
            EntityType::Follow => "follows",
        }
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Timestamps are stored as microseconds since the epoch so that SQL
/// ordering matches chronological ordering.
pub fn to_storage_time(time: DateTime<Utc>) -> i64 {
    time.timestamp_micros()
}

pub fn from_storage_time(micros: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp_micros(micros).unwrap_or_default()
}
