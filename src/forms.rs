// Form validation - binds raw user input to persist-ready entities

use axum::{
    extract::{FromRequest, Multipart, Request},
    http::header,
    Form,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::entities::{
    Group, NewComment, NewPost, Post, PostView, User, COMMENT_MAX_LENGTH, IMAGE_UPLOAD_TO,
};
use crate::error::{AppError, AppResult};
use crate::infrastructure::{database::DatabaseInterface, media::MediaStorage};

/// Field name to messages. Empty means the form is valid.
pub type FormErrors = BTreeMap<String, Vec<String>>;

pub const REQUIRED_MESSAGE: &str = "This field is required.";
pub const INVALID_CHOICE_MESSAGE: &str =
    "Select a valid choice. That choice is not one of the available choices.";
pub const INVALID_IMAGE_MESSAGE: &str =
    "Upload a valid image. The file you uploaded was either not an image or a corrupted image.";

fn add_error(errors: &mut FormErrors, field: &str, message: impl Into<String>) {
    errors.entry(field.to_string()).or_default().push(message.into());
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageKind {
    Gif,
    Png,
    Jpeg,
    Webp,
}

impl ImageKind {
    /// Sniff the format from the leading bytes.
    pub fn detect(bytes: &[u8]) -> Option<ImageKind> {
        if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
            Some(ImageKind::Gif)
        } else if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
            Some(ImageKind::Png)
        } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(ImageKind::Jpeg)
        } else if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
            Some(ImageKind::Webp)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadedFile {
    pub filename: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Post create/edit input: `text`, optional `group` id, optional `image`.
#[derive(Debug, Clone, Default)]
pub struct PostForm {
    pub text: String,
    pub group: Option<String>,
    pub image: Option<UploadedFile>,
}

#[derive(Debug, Clone)]
pub struct CleanedPost {
    pub text: String,
    pub group: Option<Group>,
    pub image: Option<UploadedFile>,
}

#[derive(Debug, Deserialize)]
struct UrlEncodedPostForm {
    #[serde(default)]
    text: String,
    #[serde(default)]
    group: Option<String>,
}

impl PostForm {
    /// Prefilled form for editing an existing post.
    pub fn from_post(post: &PostView) -> Self {
        Self {
            text: post.text.clone(),
            group: post.group.as_ref().map(|g| g.id.to_string()),
            image: None,
        }
    }

    pub async fn clean(&self, db: &dyn DatabaseInterface) -> AppResult<Result<CleanedPost, FormErrors>> {
        let mut errors = FormErrors::new();

        let text = self.text.trim().to_string();
        if text.is_empty() {
            add_error(&mut errors, "text", REQUIRED_MESSAGE);
        }

        let group = match self.group.as_deref().map(str::trim).filter(|g| !g.is_empty()) {
            None => None,
            Some(raw) => match raw.parse::<i64>() {
                Ok(id) => {
                    let group = db.get_group(id).await?;
                    if group.is_none() {
                        add_error(&mut errors, "group", INVALID_CHOICE_MESSAGE);
                    }
                    group
                }
                Err(_) => {
                    add_error(&mut errors, "group", INVALID_CHOICE_MESSAGE);
                    None
                }
            },
        };

        if let Some(image) = &self.image {
            if ImageKind::detect(&image.bytes).is_none() {
                add_error(&mut errors, "image", INVALID_IMAGE_MESSAGE);
            }
        }

        if !errors.is_empty() {
            debug!("Post form rejected: {:?}", errors.keys().collect::<Vec<_>>());
            return Ok(Err(errors));
        }

        Ok(Ok(CleanedPost {
            text,
            group,
            image: self.image.clone(),
        }))
    }

    /// Validate and, on success, store the image and insert a post owned by `author`.
    pub async fn save_new(
        &self,
        db: &dyn DatabaseInterface,
        media: &MediaStorage,
        author: &User,
    ) -> AppResult<Result<Post, FormErrors>> {
        let cleaned = match self.clean(db).await? {
            Ok(cleaned) => cleaned,
            Err(errors) => return Ok(Err(errors)),
        };

        let mut new_post = NewPost::new(author.id, cleaned.text);
        if let Some(group) = cleaned.group {
            new_post = new_post.group(group.id);
        }
        let mut stored_image = None;
        if let Some(image) = cleaned.image {
            let name = media
                .save(IMAGE_UPLOAD_TO, &image.filename, &image.bytes)
                .await?;
            stored_image = Some(name.clone());
            new_post = new_post.image(name);
        }

        match db.create_post(new_post).await {
            Ok(post) => Ok(Ok(post)),
            Err(e) => {
                if let Some(name) = stored_image {
                    if let Err(cleanup) = media.delete(&name).await {
                        warn!("Failed to remove orphaned upload {}: {}", name, cleanup);
                    }
                }
                Err(e)
            }
        }
    }

    /// Validate and, on success, update text and group of `post_id`.
    pub async fn save_edit(
        &self,
        db: &dyn DatabaseInterface,
        post_id: i64,
    ) -> AppResult<Result<(), FormErrors>> {
        let cleaned = match self.clean(db).await? {
            Ok(cleaned) => cleaned,
            Err(errors) => return Ok(Err(errors)),
        };
        db.update_post(post_id, &cleaned.text, cleaned.group.map(|g| g.id))
            .await?;
        Ok(Ok(()))
    }

    pub fn context(&self, errors: &FormErrors) -> Value {
        json!({
            "fields": {
                "text": self.text,
                "group": self.group,
            },
            "errors": errors,
            "is_bound": !self.text.is_empty() || self.group.is_some() || !errors.is_empty(),
        })
    }
}

fn bad_request(err: impl std::fmt::Display) -> AppError {
    AppError::BadRequest(err.to_string())
}

impl<S> FromRequest<S> for PostForm
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|ct| ct.starts_with("multipart/form-data"))
            .unwrap_or(false);

        if !is_multipart {
            let Form(raw) = Form::<UrlEncodedPostForm>::from_request(req, state)
                .await
                .map_err(|e| AppError::BadRequest(e.body_text()))?;
            return Ok(PostForm {
                text: raw.text,
                group: raw.group,
                image: None,
            });
        }

        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;

        let mut form = PostForm::default();
        while let Some(field) = multipart.next_field().await.map_err(bad_request)? {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "text" => form.text = field.text().await.map_err(bad_request)?,
                "group" => form.group = Some(field.text().await.map_err(bad_request)?),
                "image" => {
                    let filename = field.file_name().unwrap_or_default().to_string();
                    let content_type = field.content_type().map(str::to_string);
                    let bytes = field.bytes().await.map_err(bad_request)?;
                    // Browsers send an empty part when no file was chosen.
                    if !(filename.is_empty() && bytes.is_empty()) {
                        form.image = Some(UploadedFile {
                            filename,
                            content_type,
                            bytes: bytes.to_vec(),
                        });
                    }
                }
                _ => {}
            }
        }
        Ok(form)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommentForm {
    #[serde(default)]
    pub text: String,
}

impl CommentForm {
    pub fn clean(&self) -> Result<String, FormErrors> {
        let mut errors = FormErrors::new();
        let text = self.text.trim();
        let length = text.chars().count();
        if length == 0 {
            add_error(&mut errors, "text", REQUIRED_MESSAGE);
        } else if length > COMMENT_MAX_LENGTH {
            add_error(
                &mut errors,
                "text",
                format!(
                    "Ensure this value has at most {} characters (it has {}).",
                    COMMENT_MAX_LENGTH, length
                ),
            );
        }

        if errors.is_empty() {
            Ok(text.to_string())
        } else {
            Err(errors)
        }
    }

    pub async fn save(
        &self,
        db: &dyn DatabaseInterface,
        post_id: i64,
        author: &User,
    ) -> AppResult<Result<crate::entities::Comment, FormErrors>> {
        let text = match self.clean() {
            Ok(text) => text,
            Err(errors) => return Ok(Err(errors)),
        };
        let comment = db
            .create_comment(NewComment {
                post_id,
                author_id: author.id,
                text,
            })
            .await?;
        Ok(Ok(comment))
    }

    pub fn empty_context() -> Value {
        json!({ "fields": { "text": "" }, "errors": {}, "is_bound": false })
    }
}
