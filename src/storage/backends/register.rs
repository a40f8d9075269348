use std::sync::Arc;

use crate::config::{ObjectStoreConfig, RuntimeConfig};
use crate::error::ThumbnailError;
use crate::request::StorageTarget;
use crate::storage::StorageBackend;

use super::blob_storage::BlobStorageBackend;
use super::filesystem::FileSystemBackend;
use super::transport::{ObjectTransport, S3Transport};

/// The backend selected for a single request.
pub enum Backend<'a> {
    Local(&'a FileSystemBackend),
    ObjectStore(BlobStorageBackend),
}

impl Backend<'_> {
    #[inline]
    pub fn storage(&self) -> &dyn StorageBackend {
        match self {
            Self::Local(backend) => *backend as &dyn StorageBackend,
            Self::ObjectStore(backend) => backend,
        }
    }
}

struct ObjectStore {
    settings: Arc<ObjectStoreConfig>,
    transport: Arc<dyn ObjectTransport>,
}

/// Holds the long lived state of each backend kind.
pub struct BackendRegistry {
    local: FileSystemBackend,
    object_store: Option<ObjectStore>,
}

impl BackendRegistry {
    /// Builds the registry, connecting the S3 transport if the config
    /// has an `object_store` section.
    pub fn connect(cfg: &RuntimeConfig) -> anyhow::Result<Self> {
        let transport = match cfg.object_store.as_ref() {
            Some(store) => {
                let transport: Arc<dyn ObjectTransport> = Arc::new(S3Transport::connect(store)?);
                Some(transport)
            },
            None => None,
        };

        Ok(Self::with_transport(cfg, transport))
    }

    /// Builds the registry over an existing transport.
    ///
    /// The transport is ignored when no `object_store` section is configured.
    pub fn with_transport(cfg: &RuntimeConfig, transport: Option<Arc<dyn ObjectTransport>>) -> Self {
        let object_store = cfg
            .object_store
            .clone()
            .zip(transport)
            .map(|(settings, transport)| ObjectStore {
                settings: Arc::new(settings),
                transport,
            });

        Self {
            local: FileSystemBackend::new(),
            object_store,
        }
    }

    pub fn select(&self, target: &StorageTarget) -> Result<Backend<'_>, ThumbnailError> {
        match target {
            StorageTarget::Local => Ok(Backend::Local(&self.local)),
            StorageTarget::ObjectStore { bucket } => {
                let store = self
                    .object_store
                    .as_ref()
                    .ok_or(ThumbnailError::ObjectStoreNotConfigured)?;

                Ok(Backend::ObjectStore(BlobStorageBackend::new(
                    bucket.clone(),
                    store.settings.clone(),
                    store.transport.clone(),
                )))
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::config::RawConfig;
    use crate::storage::testing::MemoryTransport;

    fn local_config() -> RuntimeConfig {
        RuntimeConfig::try_from(RawConfig {
            media_folder: Some(PathBuf::from("/srv/media")),
            ..Default::default()
        })
        .expect("valid config")
    }

    #[test]
    fn test_local_always_available() {
        let registry = BackendRegistry::with_transport(&local_config(), None);
        assert!(matches!(registry.select(&StorageTarget::Local), Ok(Backend::Local(_))));
    }

    #[test]
    fn test_object_store_requires_config() {
        let transport: Arc<dyn ObjectTransport> = Arc::new(MemoryTransport::default());
        let registry = BackendRegistry::with_transport(&local_config(), Some(transport));

        let target = StorageTarget::ObjectStore { bucket: "photos".into() };
        assert!(matches!(
            registry.select(&target),
            Err(ThumbnailError::ObjectStoreNotConfigured),
        ));
    }
}
