// Media storage - uploaded files on local disk, addressed by relative name

use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

const MAX_NAME_ATTEMPTS: usize = 16;

#[derive(Debug, Clone)]
pub struct MediaStorage {
    root: PathBuf,
    base_url: String,
}

impl MediaStorage {
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            base_url: base_url.into(),
        }
    }

    /// Store `content` under `upload_to` and return its relative name,
    /// e.g. `posts/small.gif`. An existing file is never overwritten; a
    /// clashing name gets a random suffix instead.
    #[instrument(skip(self, content), fields(size = content.len()))]
    pub async fn save(&self, upload_to: &str, filename: &str, content: &[u8]) -> AppResult<String> {
        let directory = upload_to.trim_matches('/');
        tokio::fs::create_dir_all(self.root.join(directory)).await?;

        let clean = sanitize_filename(filename);
        for attempt in 0..MAX_NAME_ATTEMPTS {
            let candidate = if attempt == 0 {
                clean.clone()
            } else {
                with_random_suffix(&clean)
            };
            let name = format!("{}/{}", directory, candidate);

            let file = tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(self.root.join(&name))
                .await;

            match file {
                Ok(mut file) => {
                    file.write_all(content).await?;
                    file.flush().await?;
                    info!("Stored media file {}", name);
                    return Ok(name);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e.into()),
            }
        }

        Err(AppError::StorageError(format!(
            "Could not find a free name for {}",
            filename
        )))
    }

    pub async fn read(&self, name: &str) -> AppResult<Vec<u8>> {
        let path = self.path(name)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(AppError::NotFound(format!("Media file {} not found", name)))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn delete(&self, name: &str) -> AppResult<bool> {
        let path = self.path(name)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    pub fn path(&self, name: &str) -> AppResult<PathBuf> {
        if name.split('/').any(|part| part == ".." || part.is_empty()) || name.starts_with('/') {
            return Err(AppError::BadRequest(format!("Invalid media name {}", name)));
        }
        Ok(self.root.join(name))
    }

    pub fn url(&self, name: &str) -> String {
        format!("{}{}", self.base_url, name)
    }
}

/// Keep the final path component and only portable characters.
pub fn sanitize_filename(filename: &str) -> String {
    let base = filename
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or_default();

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');

    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned.to_string()
    }
}

fn with_random_suffix(filename: &str) -> String {
    let suffix: String = Uuid::new_v4().simple().to_string().chars().take(7).collect();
    match filename.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{}_{}.{}", stem, suffix, ext),
        _ => format!("{}_{}", filename, suffix),
    }
}
