// Group - administered independently, referenced weakly by posts

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

pub const GROUP_TITLE_MAX_LENGTH: usize = 200;
pub const GROUP_SLUG_MAX_LENGTH: usize = 50;

static SLUG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[-a-zA-Z0-9_]+$").expect("slug pattern is valid"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub description: String,
}

impl std::fmt::Display for Group {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.title)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewGroup {
    pub title: String,
    pub slug: String,
    pub description: String,
}

impl NewGroup {
    pub fn new(
        title: impl Into<String>,
        slug: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            slug: slug.into(),
            description: description.into(),
        }
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.title.trim().is_empty() {
            return Err(AppError::Validation("Group title is required".to_string()));
        }
        if self.title.chars().count() > GROUP_TITLE_MAX_LENGTH {
            return Err(AppError::Validation(format!(
                "Group title must be at most {} characters",
                GROUP_TITLE_MAX_LENGTH
            )));
        }
        if self.slug.len() > GROUP_SLUG_MAX_LENGTH || !SLUG_RE.is_match(&self.slug) {
            return Err(AppError::Validation(format!(
                "Invalid group slug '{}'",
                self.slug
            )));
        }
        Ok(())
    }
}
