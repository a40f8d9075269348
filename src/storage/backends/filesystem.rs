use std::io::ErrorKind;
use std::path::Path;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::ThumbnailError;
use crate::processor::EncodedImage;
use crate::storage::{StorageBackend, ThumbnailPaths};

/// Reads originals from the media folder and writes thumbnails next to
/// their mirrored path under the thumbnail folder.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileSystemBackend;

impl FileSystemBackend {
    pub fn new() -> Self {
        Self
    }
}

/// Creates the directory and its parents, another writer creating it
/// first is not an error.
async fn ensure_directory(directory: &Path) -> std::io::Result<()> {
    match tokio::fs::create_dir_all(directory).await {
        Ok(()) => Ok(()),
        Err(ref e) if e.kind() == ErrorKind::AlreadyExists => Ok(()),
        Err(other) => Err(other),
    }
}

#[async_trait]
impl StorageBackend for FileSystemBackend {
    fn thumbnail_url(&self, paths: &ThumbnailPaths) -> Result<String, ThumbnailError> {
        Ok(paths.thumbnail_url.clone())
    }

    async fn prepare(&self, paths: &ThumbnailPaths) -> Result<(), ThumbnailError> {
        if let Some(directory) = paths.thumbnail.parent() {
            ensure_directory(directory).await?;
        }

        Ok(())
    }

    async fn exists(&self, paths: &ThumbnailPaths) -> bool {
        tokio::fs::metadata(&paths.thumbnail)
            .await
            .map(|meta| meta.is_file())
            .unwrap_or(false)
    }

    async fn fetch_original(&self, paths: &ThumbnailPaths) -> anyhow::Result<Bytes> {
        debug!("Reading original @ {:?}", &paths.original);
        let data = tokio::fs::read(&paths.original).await?;
        Ok(Bytes::from(data))
    }

    async fn store(&self, paths: &ThumbnailPaths, image: EncodedImage) -> anyhow::Result<()> {
        debug!("Storing thumbnail @ {:?}", &paths.thumbnail);
        match tokio::fs::write(&paths.thumbnail, &image.buff).await {
            Ok(()) => Ok(()),
            Err(ref e) if e.kind() == ErrorKind::NotFound => {
                if let Some(directory) = paths.thumbnail.parent() {
                    ensure_directory(directory).await?;
                }
                tokio::fs::write(&paths.thumbnail, &image.buff).await?;
                Ok(())
            },
            Err(other) => Err(other.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use image::ImageFormat;
    use tempfile::TempDir;

    use super::*;
    use crate::keys;
    use crate::request::Size;

    fn paths_in(root: &Path) -> ThumbnailPaths {
        let key = keys::derive("cat", ".png", Size::new(10, 10), None, None, 85);
        ThumbnailPaths {
            original: root.join("media").join("cat.png"),
            thumbnail: root.join("thumbs").join("pets").join(key.as_str()),
            thumbnail_url: format!("/thumbs/pets/{}", key),
            key,
        }
    }

    fn encoded(data: &'static [u8]) -> EncodedImage {
        EncodedImage {
            format: ImageFormat::Png,
            buff: Bytes::from_static(data),
        }
    }

    #[tokio::test]
    async fn test_prepare_creates_directories() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let paths = paths_in(dir.path());
        let backend = FileSystemBackend::new();

        backend.prepare(&paths).await?;
        assert!(dir.path().join("thumbs").join("pets").is_dir());

        // Already existing directories are fine.
        backend.prepare(&paths).await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_prepare_propagates_unexpected_errors() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        std::fs::write(dir.path().join("thumbs"), b"not a directory")?;

        let res = FileSystemBackend::new().prepare(&paths_in(dir.path())).await;
        assert!(matches!(res, Err(ThumbnailError::Io(_))));
        Ok(())
    }

    #[tokio::test]
    async fn test_store_then_exists() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let paths = paths_in(dir.path());
        let backend = FileSystemBackend::new();

        assert!(!backend.exists(&paths).await);
        backend.store(&paths, encoded(b"thumbnail")).await?;
        assert!(backend.exists(&paths).await);
        assert_eq!(std::fs::read(&paths.thumbnail)?, b"thumbnail");
        assert_eq!(backend.thumbnail_url(&paths)?, "/thumbs/pets/cat_10x10_85.png");
        Ok(())
    }

    #[tokio::test]
    async fn test_fetch_missing_original() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let res = FileSystemBackend::new().fetch_original(&paths_in(dir.path())).await;
        assert!(res.is_err());
        Ok(())
    }
}
