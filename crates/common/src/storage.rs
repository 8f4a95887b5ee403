//! Media storage abstraction for report attachments.
//!
//! Uploads return durable public URLs; deletion is best-effort and never
//! blocks the owning record's lifecycle.

use std::path::PathBuf;
use std::sync::Arc;

use crate::{AppError, AppResult};

/// Shared handle to a storage backend.
pub type MediaStore = Arc<dyn StorageBackend>;

/// Uploaded file metadata.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Storage key (path or object key).
    pub key: String,
    /// Public URL to access the file.
    pub url: String,
    /// File size in bytes.
    pub size: u64,
    /// MIME content type.
    pub content_type: String,
    /// MD5 hash of the file.
    pub md5: String,
}

/// Storage backend trait.
#[async_trait::async_trait]
pub trait StorageBackend: Send + Sync {
    /// Upload a file.
    async fn upload(&self, key: &str, data: &[u8], content_type: &str) -> AppResult<UploadedFile>;

    /// Delete a file.
    async fn delete(&self, key: &str) -> AppResult<()>;

    /// Get the public URL for a key.
    fn public_url(&self, key: &str) -> String;

    /// Derive the storage key for a public URL issued by this backend, if any.
    fn key_for_url(&self, url: &str) -> Option<String>;
}

/// Local filesystem storage backend.
pub struct LocalStorage {
    base_path: PathBuf,
    base_url: String,
}

impl LocalStorage {
    /// Create a new local storage backend.
    #[must_use]
    pub const fn new(base_path: PathBuf, base_url: String) -> Self {
        Self {
            base_path,
            base_url,
        }
    }
}

#[async_trait::async_trait]
impl StorageBackend for LocalStorage {
    async fn upload(&self, key: &str, data: &[u8], content_type: &str) -> AppResult<UploadedFile> {
        let path = self.base_path.join(key);

        // Create parent directories if needed
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::Storage(format!("Failed to create directory: {e}")))?;
        }

        // Write file
        tokio::fs::write(&path, data)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to write file: {e}")))?;

        // Calculate MD5
        let md5 = format!("{:x}", md5::compute(data));

        Ok(UploadedFile {
            key: key.to_string(),
            url: self.public_url(key),
            size: data.len() as u64,
            content_type: content_type.to_string(),
            md5,
        })
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        let path = self.base_path.join(key);
        if path.exists() {
            tokio::fs::remove_file(&path)
                .await
                .map_err(|e| AppError::Storage(format!("Failed to delete file: {e}")))?;
        }
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), key)
    }

    fn key_for_url(&self, url: &str) -> Option<String> {
        let prefix = format!("{}/", self.base_url.trim_end_matches('/'));
        url.strip_prefix(&prefix).map(ToString::to_string)
    }
}

/// Generate a storage key for an uploaded file.
///
/// Keys are sharded by the first characters of the id to keep directory
/// fanout manageable.
#[must_use]
pub fn generate_storage_key(id: &str, file_name: &str) -> String {
    let ext = file_name.rsplit('.').next().filter(|e| {
        e.len() <= 8 && !e.is_empty() && e.chars().all(|c| c.is_ascii_alphanumeric())
    });

    let shard = &id[..2.min(id.len())];
    match ext {
        Some(ext) => format!("{shard}/{id}.{}", ext.to_lowercase()),
        None => format!("{shard}/{id}"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_storage_key_with_extension() {
        let key = generate_storage_key("01hx3example", "pothole.JPG");
        assert_eq!(key, "01/01hx3example.jpg");
    }

    #[test]
    fn test_generate_storage_key_without_extension() {
        let key = generate_storage_key("01hx3example", "upload");
        assert_eq!(key, "01/01hx3example");
    }

    #[test]
    fn test_public_url_and_key_roundtrip() {
        let storage = LocalStorage::new(PathBuf::from("/tmp/media"), "/media".to_string());
        let url = storage.public_url("ab/file.png");
        assert_eq!(url, "/media/ab/file.png");
        assert_eq!(storage.key_for_url(&url).unwrap(), "ab/file.png");
        assert!(storage.key_for_url("https://elsewhere/x.png").is_none());
    }

    #[tokio::test]
    async fn test_local_upload_and_delete() {
        let dir = std::env::temp_dir().join(format!("civicwatch-test-{}", uuid::Uuid::new_v4()));
        let storage = LocalStorage::new(dir.clone(), "/media".to_string());

        let uploaded = storage
            .upload("aa/test.txt", b"hello", "text/plain")
            .await
            .unwrap();
        assert_eq!(uploaded.size, 5);
        assert_eq!(uploaded.url, "/media/aa/test.txt");

        storage.delete("aa/test.txt").await.unwrap();
        // Deleting again is a no-op
        storage.delete("aa/test.txt").await.unwrap();

        tokio::fs::remove_dir_all(&dir).await.ok();
    }
}
