// Post - owned by its author, optionally filed under a group

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Group, UserRef};

/// Directory prefix for stored post images.
pub const IMAGE_UPLOAD_TO: &str = "posts/";

const DISPLAY_CHARS: usize = 15;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub text: String,
    pub pub_date: DateTime<Utc>,
    pub author_id: i64,
    pub group_id: Option<i64>,
    pub image: Option<String>,
}

impl std::fmt::Display for Post {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&short_text(&self.text))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPost {
    pub text: String,
    pub author_id: i64,
    pub group_id: Option<i64>,
    pub image: Option<String>,
}

impl NewPost {
    pub fn new(author_id: i64, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            author_id,
            group_id: None,
            image: None,
        }
    }

    pub fn group(mut self, group_id: i64) -> Self {
        self.group_id = Some(group_id);
        self
    }

    pub fn image(mut self, name: impl Into<String>) -> Self {
        self.image = Some(name.into());
        self
    }
}

/// A post joined with its author and group, as shown in listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostView {
    pub id: i64,
    pub text: String,
    pub pub_date: DateTime<Utc>,
    pub author: UserRef,
    pub group: Option<Group>,
    pub image: Option<String>,
}

impl std::fmt::Display for PostView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&short_text(&self.text))
    }
}

/// Which posts a listing covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostFilter {
    All,
    Group(i64),
    Author(i64),
    /// Posts by every author the given user follows.
    FollowedBy(i64),
}

fn short_text(text: &str) -> String {
    text.chars().take(DISPLAY_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_post_displays_first_fifteen_chars() {
        let post = Post {
            id: 1,
            text: "Тестовый пост > 15 символов".to_string(),
            pub_date: Utc::now(),
            author_id: 1,
            group_id: None,
            image: None,
        };
        assert_eq!(post.to_string(), "Тестовый пост >");
        assert_eq!(post.to_string().chars().count(), 15);
    }

    #[test]
    fn test_new_post_builder() {
        let post = NewPost::new(3, "hello").group(9).image("posts/a.gif");
        assert_eq!(post.author_id, 3);
        assert_eq!(post.group_id, Some(9));
        assert_eq!(post.image.as_deref(), Some("posts/a.gif"));
    }
}
