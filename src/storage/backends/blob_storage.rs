use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use super::transport::{ObjectTransport, ObjectUpload};
use crate::config::ObjectStoreConfig;
use crate::error::ThumbnailError;
use crate::processor::EncodedImage;
use crate::storage::{StorageBackend, ThumbnailPaths};

/// Characters left as they are in the path of a public object URL.
const KEY_PATH_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'/')
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Translates a local path into a bucket key by removing the configured
/// root parent from its front.
pub fn remote_key(root_parent: Option<&str>, path: &Path) -> Result<String, ThumbnailError> {
    let root_parent = root_parent
        .filter(|v| !v.is_empty())
        .ok_or(ThumbnailError::MissingRootParent)?;

    let root = root_parent.trim_end_matches('/');
    let path = path.to_string_lossy();
    let relative = match path.strip_prefix(root) {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => rest,
        _ => &path[..],
    };

    Ok(relative.trim_start_matches('/').to_string())
}

/// A single S3 bucket. Built per request as the bucket is chosen by
/// the caller.
pub struct BlobStorageBackend {
    bucket: String,
    settings: Arc<ObjectStoreConfig>,
    transport: Arc<dyn ObjectTransport>,
}

impl BlobStorageBackend {
    pub fn new(
        bucket: String,
        settings: Arc<ObjectStoreConfig>,
        transport: Arc<dyn ObjectTransport>,
    ) -> Self {
        Self {
            bucket,
            settings,
            transport,
        }
    }

    #[inline]
    pub fn remote_key(&self, path: &Path) -> Result<String, ThumbnailError> {
        remote_key(self.settings.static_root_parent.as_deref(), path)
    }

    pub fn public_url(&self, key: &str) -> String {
        let scheme = self.settings.scheme();
        let domain = &self.settings.domain;
        let key = utf8_percent_encode(key, KEY_PATH_SET);

        if self.settings.path_style {
            format!("{}://{}/{}/{}", scheme, domain, self.bucket, key)
        } else {
            format!("{}://{}.{}/{}", scheme, self.bucket, domain, key)
        }
    }
}

#[async_trait]
impl StorageBackend for BlobStorageBackend {
    fn thumbnail_url(&self, paths: &ThumbnailPaths) -> Result<String, ThumbnailError> {
        let key = self.remote_key(&paths.thumbnail)?;
        Ok(self.public_url(&key))
    }

    async fn exists(&self, paths: &ThumbnailPaths) -> bool {
        let url = match self.thumbnail_url(paths) {
            Ok(url) => url,
            Err(_) => return false,
        };

        match self.transport.probe(&url).await {
            Ok(status) => {
                debug!("Probed {} with status {}", &url, status);
                status < 400
            },
            Err(e) => {
                debug!("Probe of {} failed, treating as absent: {}", &url, e);
                false
            },
        }
    }

    async fn fetch_original(&self, paths: &ThumbnailPaths) -> anyhow::Result<Bytes> {
        let key = self.remote_key(&paths.original)?;
        let url = self.public_url(&key);

        debug!("Downloading original @ {}", &url);
        self.transport.download(&url).await
    }

    async fn store(&self, paths: &ThumbnailPaths, image: EncodedImage) -> anyhow::Result<()> {
        let upload = ObjectUpload {
            bucket: self.bucket.clone(),
            key: self.remote_key(&paths.thumbnail)?,
            content_type: image.content_type().to_string(),
            acl: self.settings.acl.clone(),
            data: image.buff,
        };

        self.transport.upload(upload).await
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use image::ImageFormat;

    use super::*;
    use crate::config::RuntimeConfig;
    use crate::keys;
    use crate::request::Size;
    use crate::storage::testing::MemoryTransport;

    const OBJECT_STORE_CONFIG: &str = include_str!("../../../tests/configs/object-store.yaml");

    fn settings() -> ObjectStoreConfig {
        RuntimeConfig::from_yaml(OBJECT_STORE_CONFIG)
            .expect("valid config")
            .object_store
            .expect("object store section")
    }

    fn backend(settings: ObjectStoreConfig, transport: Arc<MemoryTransport>) -> BlobStorageBackend {
        BlobStorageBackend::new("photos".to_string(), Arc::new(settings), transport)
    }

    fn paths() -> ThumbnailPaths {
        let key = keys::derive("cat", ".png", Size::new(10, 10), None, None, 85);
        ThumbnailPaths {
            original: PathBuf::from("/srv/app/static/media/pets/cat.png"),
            thumbnail: PathBuf::from("/srv/app/static/thumbs/pets").join(key.as_str()),
            thumbnail_url: format!("static/thumbs/pets/{}", key),
            key,
        }
    }

    #[test]
    fn test_remote_key_strips_root_parent() {
        let path = Path::new("/srv/app/static/thumbs/cat.png");
        assert_eq!(remote_key(Some("/srv/app"), path).unwrap(), "static/thumbs/cat.png");
        assert_eq!(remote_key(Some("/srv/app/"), path).unwrap(), "static/thumbs/cat.png");

        // Only whole leading components are removed.
        let path = Path::new("/srv/application/cat.png");
        assert_eq!(remote_key(Some("/srv/app"), path).unwrap(), "srv/application/cat.png");
    }

    #[test]
    fn test_remote_key_requires_root_parent() {
        let path = Path::new("/srv/app/static/thumbs/cat.png");

        let err = remote_key(None, path).unwrap_err();
        assert!(matches!(err, ThumbnailError::MissingRootParent));
        assert!(err.is_config_error());
        assert!(remote_key(Some(""), path).is_err());
    }

    #[test]
    fn test_public_urls() {
        let transport = Arc::new(MemoryTransport::default());
        let virtual_hosted = backend(settings(), transport.clone());
        assert_eq!(
            virtual_hosted.thumbnail_url(&paths()).unwrap(),
            "https://photos.s3.amazonaws.com/static/thumbs/pets/cat_10x10_85.png",
        );

        let mut cfg = settings();
        cfg.path_style = true;
        cfg.use_https = false;
        cfg.domain = "minio.local:9000".to_string();
        assert_eq!(
            backend(cfg, transport).thumbnail_url(&paths()).unwrap(),
            "http://minio.local:9000/photos/static/thumbs/pets/cat_10x10_85.png",
        );
    }

    #[tokio::test]
    async fn test_exists_is_best_effort() {
        let transport = Arc::new(MemoryTransport::default());
        let backend = backend(settings(), transport.clone());

        assert!(!backend.exists(&paths()).await);

        transport.insert("static/thumbs/pets/cat_10x10_85.png", Bytes::from_static(b"thumb"));
        assert!(backend.exists(&paths()).await);

        transport.set_unreachable(true);
        assert!(!backend.exists(&paths()).await);
    }

    #[tokio::test]
    async fn test_exists_without_root_parent_is_absent() {
        let mut cfg = settings();
        cfg.static_root_parent = None;
        let backend = backend(cfg, Arc::new(MemoryTransport::default()));

        assert!(!backend.exists(&paths()).await);
    }

    #[tokio::test]
    async fn test_store_uploads_with_acl() -> anyhow::Result<()> {
        let transport = Arc::new(MemoryTransport::default());
        let backend = backend(settings(), transport.clone());

        let image = EncodedImage {
            format: ImageFormat::Png,
            buff: Bytes::from_static(b"thumb"),
        };
        backend.store(&paths(), image).await?;

        let uploads = transport.uploads();
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0].bucket, "photos");
        assert_eq!(uploads[0].key, "static/thumbs/pets/cat_10x10_85.png");
        assert_eq!(uploads[0].acl, "public-read");
        assert_eq!(uploads[0].content_type, "image/png");
        Ok(())
    }

    #[test]
    fn test_public_url_encodes_key() {
        let backend = backend(settings(), Arc::new(MemoryTransport::default()));
        assert_eq!(
            backend.public_url("static/media/pets/cat #1?50%.png"),
            "https://photos.s3.amazonaws.com/static/media/pets/cat%20%231%3F50%25.png",
        );
    }

    #[tokio::test]
    async fn test_special_characters_reach_the_right_object() -> anyhow::Result<()> {
        let transport = Arc::new(MemoryTransport::default());
        transport.insert("static/media/pets/cat #1?.png", Bytes::from_static(b"original"));
        transport.insert("static/media/pets/cat ", Bytes::from_static(b"wrong object"));
        let backend = backend(settings(), transport.clone());

        let mut paths = paths();
        paths.original = PathBuf::from("/srv/app/static/media/pets/cat #1?.png");

        let data = backend.fetch_original(&paths).await?;
        assert_eq!(data, Bytes::from_static(b"original"));
        assert_eq!(
            transport.downloaded(),
            vec!["https://photos.s3.amazonaws.com/static/media/pets/cat%20%231%3F.png".to_string()],
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_fetch_original_from_public_url() -> anyhow::Result<()> {
        let transport = Arc::new(MemoryTransport::default());
        transport.insert("static/media/pets/cat.png", Bytes::from_static(b"original"));

        let data = backend(settings(), transport.clone()).fetch_original(&paths()).await?;
        assert_eq!(data, Bytes::from_static(b"original"));
        assert_eq!(
            transport.downloaded(),
            vec!["https://photos.s3.amazonaws.com/static/media/pets/cat.png".to_string()],
        );
        Ok(())
    }
}
