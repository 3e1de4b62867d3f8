use std::path::PathBuf;

use async_trait::async_trait;
use futures::future::try_join_all;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("{filename} is not an image ({content_type})")]
    NotAnImage { filename: String, content_type: String },
    #[error("{0} is empty")]
    Empty(String),
    #[error("{0} was not stored here")]
    UnknownUrl(String),
    #[error("failed to write upload: {0}")]
    Io(#[from] std::io::Error),
}

/// One file picked by the user.
#[derive(Debug, Clone)]
pub struct PhotoFile {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Stores an image and hands back a URL usable directly as an image source.
#[async_trait]
pub trait PhotoStore: Send + Sync {
    async fn store(&self, file: &PhotoFile) -> Result<String, UploadError>;

    /// Deletes an image previously returned by `store`.
    async fn remove(&self, url: &str) -> Result<(), UploadError>;
}

/// Writes uploads into a local directory served under `url_prefix`.
#[derive(Debug, Clone)]
pub struct LocalPhotoStore {
    dir: PathBuf,
    url_prefix: String,
}

impl LocalPhotoStore {
    pub fn new(dir: impl Into<PathBuf>, url_prefix: impl Into<String>) -> Self {
        Self { dir: dir.into(), url_prefix: url_prefix.into() }
    }
}

fn extension_for(file: &PhotoFile) -> &str {
    match file.content_type.as_str() {
        "image/png" => "png",
        "image/jpeg" | "image/jpg" => "jpg",
        "image/gif" => "gif",
        "image/webp" => "webp",
        _ => file
            .filename
            .rsplit_once('.')
            .map(|(_, ext)| ext)
            .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
            .unwrap_or("img"),
    }
}

#[async_trait]
impl PhotoStore for LocalPhotoStore {
    async fn store(&self, file: &PhotoFile) -> Result<String, UploadError> {
        if !file.content_type.starts_with("image/") {
            return Err(UploadError::NotAnImage {
                filename: file.filename.clone(),
                content_type: file.content_type.clone(),
            });
        }
        if file.bytes.is_empty() {
            return Err(UploadError::Empty(file.filename.clone()));
        }

        tokio::fs::create_dir_all(&self.dir).await?;
        let name = format!("{}.{}", Uuid::new_v4(), extension_for(file));
        tokio::fs::write(self.dir.join(&name), &file.bytes).await?;
        debug!(%name, size = file.bytes.len(), "Stored uploaded photo");

        Ok(format!("{}/{}", self.url_prefix.trim_end_matches('/'), name))
    }

    async fn remove(&self, url: &str) -> Result<(), UploadError> {
        let name = url
            .strip_prefix(self.url_prefix.trim_end_matches('/'))
            .and_then(|rest| rest.strip_prefix('/'))
            .filter(|name| !name.is_empty() && !name.contains('/') && !name.contains(".."))
            .ok_or_else(|| UploadError::UnknownUrl(url.to_string()))?;
        tokio::fs::remove_file(self.dir.join(name)).await?;
        debug!(%name, "Removed uploaded photo");
        Ok(())
    }
}

/// Uploads every file concurrently and waits for all of them. A single
/// failure fails the whole batch.
pub async fn upload_all(store: &dyn PhotoStore, files: &[PhotoFile]) -> Result<Vec<String>, UploadError> {
    try_join_all(files.iter().map(|file| store.store(file)))
        .await
        .map_err(|e| {
            warn!(error = %e, files = files.len(), "Photo upload batch failed");
            e
        })
}

/// Deletes photos nobody will reference any more. Failures are only logged.
pub async fn discard_all(store: &dyn PhotoStore, urls: &[String]) {
    for url in urls {
        if let Err(e) = store.remove(url).await {
            warn!(%url, error = %e, "Failed to remove orphaned photo");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png(name: &str) -> PhotoFile {
        PhotoFile {
            filename: name.to_string(),
            content_type: "image/png".to_string(),
            bytes: vec![0x89, b'P', b'N', b'G'],
        }
    }

    #[tokio::test]
    async fn test_upload_all_writes_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalPhotoStore::new(dir.path(), "/uploads/");

        let urls = upload_all(&store, &[png("a.png"), png("b.png")]).await.unwrap();

        assert_eq!(urls.len(), 2);
        for url in &urls {
            assert!(url.starts_with("/uploads/"));
            assert!(url.ends_with(".png"));
            let file = dir.path().join(url.trim_start_matches("/uploads/"));
            assert!(file.exists());
        }
        assert_ne!(urls[0], urls[1]);
    }

    #[tokio::test]
    async fn test_batch_fails_on_non_image() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalPhotoStore::new(dir.path(), "/uploads");
        let text = PhotoFile {
            filename: "notes.txt".to_string(),
            content_type: "text/plain".to_string(),
            bytes: b"hello".to_vec(),
        };

        let result = upload_all(&store, &[png("a.png"), text]).await;

        assert!(matches!(result, Err(UploadError::NotAnImage { .. })));
    }

    #[tokio::test]
    async fn test_discard_removes_stored_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalPhotoStore::new(dir.path(), "/uploads");
        let urls = upload_all(&store, &[png("a.png")]).await.unwrap();

        discard_all(&store, &urls).await;

        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
        assert!(matches!(store.remove("/elsewhere/a.png").await, Err(UploadError::UnknownUrl(_))));
        assert!(matches!(store.remove("/uploads/../secret").await, Err(UploadError::UnknownUrl(_))));
    }

    #[test]
    fn test_extension_fallbacks() {
        let mut file = png("photo.HEIC");
        file.content_type = "image/heic".to_string();
        assert_eq!(extension_for(&file), "HEIC");
        file.filename = "noext".to_string();
        assert_eq!(extension_for(&file), "img");
    }
}
