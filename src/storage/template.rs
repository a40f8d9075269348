use std::path::PathBuf;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::ThumbnailError;
use crate::keys::CacheKey;
use crate::processor::EncodedImage;

/// Where a thumbnail and its original live for a single request.
#[derive(Debug, Clone)]
pub struct ThumbnailPaths {
    pub key: CacheKey,

    /// The original under the media folder.
    pub original: PathBuf,

    /// The thumbnail under the thumbnail folder.
    pub thumbnail: PathBuf,

    /// The thumbnail under the thumbnail URL prefix.
    pub thumbnail_url: String,
}

/// A place thumbnails are looked up in and persisted to.
///
/// Only `thumbnail_url` and `prepare` may fail the resolution; fetch
/// and store failures are reported to the resolver, which degrades
/// them to an empty URL.
#[async_trait]
pub trait StorageBackend: Sync + Send {
    /// The public URL of the thumbnail, whether or not it exists yet.
    fn thumbnail_url(&self, paths: &ThumbnailPaths) -> Result<String, ThumbnailError>;

    /// Readies the destination before the thumbnail is looked up.
    async fn prepare(&self, _paths: &ThumbnailPaths) -> Result<(), ThumbnailError> {
        Ok(())
    }

    /// Whether the thumbnail already exists.
    ///
    /// Best effort, any error while checking counts as absent.
    async fn exists(&self, paths: &ThumbnailPaths) -> bool;

    async fn fetch_original(&self, paths: &ThumbnailPaths) -> anyhow::Result<Bytes>;

    async fn store(&self, paths: &ThumbnailPaths, image: EncodedImage) -> anyhow::Result<()>;
}
