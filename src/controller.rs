use std::sync::Arc;

use tracing::instrument;

use crate::config::RuntimeConfig;
use crate::error::ThumbnailError;
use crate::keys::{self, CacheKey};
use crate::processor::{self, Transform};
use crate::request::{ThumbnailParams, ThumbnailRequest};
use crate::storage::backends::transport::ObjectTransport;
use crate::storage::backends::BackendRegistry;
use crate::storage::ThumbnailPaths;
use crate::utils::{self, KeyLocks};

/// The number of locks resolutions of the same key are serialised on.
const LOCK_STRIPES: usize = 64;

/// Finds or creates thumbnails.
///
/// Thumbnails are created at most once per process for a given key,
/// separate processes racing on the same key may both create it and
/// the last write wins.
pub struct ThumbnailResolver {
    config: Arc<RuntimeConfig>,
    backends: BackendRegistry,
    locks: KeyLocks,
}

impl ThumbnailResolver {
    pub fn connect(config: RuntimeConfig) -> anyhow::Result<Self> {
        let backends = BackendRegistry::connect(&config)?;
        Ok(Self::with_backends(config, backends))
    }

    pub fn with_transport(config: RuntimeConfig, transport: Arc<dyn ObjectTransport>) -> Self {
        let backends = BackendRegistry::with_transport(&config, Some(transport));
        Self::with_backends(config, backends)
    }

    fn with_backends(config: RuntimeConfig, backends: BackendRegistry) -> Self {
        Self {
            config: Arc::new(config),
            backends,
            locks: KeyLocks::new(LOCK_STRIPES),
        }
    }

    #[inline]
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Validates the raw parameters and resolves them.
    pub async fn thumbnail(&self, params: ThumbnailParams) -> Result<String, ThumbnailError> {
        let request = params.into_request()?;
        self.resolve(&request).await
    }

    /// Returns the public URL of the requested thumbnail, creating it first
    /// if it does not exist yet.
    ///
    /// Failing to read, decode or store the image produces an empty URL.
    /// Errors are reserved for misconfiguration and for the thumbnail
    /// directory not being creatable.
    #[instrument(skip(self, request), fields(image = %request.reference.file_name))]
    pub async fn resolve(&self, request: &ThumbnailRequest) -> Result<String, ThumbnailError> {
        let backend = self.backends.select(&request.storage)?;
        let storage = backend.storage();

        let paths = self.paths_for(request, keys::for_request(request));
        let url = storage.thumbnail_url(&paths)?;
        storage.prepare(&paths).await?;

        let _guard = self.locks.acquire(paths.key.as_str()).await;

        if storage.exists(&paths).await {
            debug!("Cache hit for {}", &paths.key);
            return Ok(url);
        }
        debug!("Cache miss for {}", &paths.key);

        let original = match storage.fetch_original(&paths).await {
            Ok(data) => data,
            Err(e) => {
                warn!("Unable to read original for {}: {:#}", &paths.key, e);
                return Ok(String::new());
            },
        };

        let encoded = match processor::process_on_pool(original, Transform::from(request)).await {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!("Unable to create thumbnail {}: {:#}", &paths.key, e);
                return Ok(String::new());
            },
        };

        if let Err(e) = storage.store(&paths, encoded).await {
            warn!("Unable to store thumbnail {}: {:#}", &paths.key, e);
            return Ok(String::new());
        }

        info!("Created thumbnail {}", &paths.key);
        Ok(url)
    }

    /// Mirrors the original's directory under the thumbnail folder and URL.
    pub fn paths_for(&self, request: &ThumbnailRequest, key: CacheKey) -> ThumbnailPaths {
        let reference = &request.reference;

        let original = self.config
            .media_folder
            .join(&reference.directory)
            .join(&reference.file_name);
        let thumbnail = self.config
            .thumbnail_folder
            .join(&reference.directory)
            .join(key.as_str());
        let thumbnail_url = utils::join_url(
            &self.config.thumbnail_url,
            &[&reference.directory, key.as_str()],
        );

        ThumbnailPaths {
            key,
            original,
            thumbnail,
            thumbnail_url,
        }
    }
}
