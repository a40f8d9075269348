use std::path::{Path, PathBuf};

use anyhow::anyhow;
use once_cell::sync::OnceCell;
use serde::Deserialize;

use crate::error::ThumbnailError;

static CONFIG: OnceCell<RuntimeConfig> = OnceCell::new();

/// Loads and validates the config file at the given path and sets it
/// as the process-wide config.
pub fn init(config_file: &Path) -> anyhow::Result<()> {
    let cfg = RuntimeConfig::from_file(config_file)?;
    CONFIG
        .set(cfg)
        .map_err(|_| anyhow!("the runtime config has already been initialised"))
}

/// The process-wide config.
///
/// # Panics
/// If `init` has not been called yet.
pub fn config() -> &'static RuntimeConfig {
    CONFIG.get().expect("config not initialised")
}

/// The config file as it is written on disk, before any defaults
/// are applied.
#[derive(Debug, Default, Deserialize)]
pub struct RawConfig {
    /// The directory original images are read from.
    pub media_folder: Option<PathBuf>,

    /// The public URL prefix of the media folder.
    ///
    /// Defaults to `/`.
    pub media_url: Option<String>,

    /// The directory thumbnails are written to.
    ///
    /// Defaults to the media folder.
    pub thumbnail_folder: Option<PathBuf>,

    /// The public URL prefix of the thumbnail folder.
    ///
    /// Defaults to the media URL, must be given if `thumbnail_folder` is.
    pub thumbnail_url: Option<String>,

    /// Settings used by requests which target an S3 bucket.
    pub object_store: Option<ObjectStoreConfig>,
}

/// The validated configuration, read-only once loaded.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "RawConfig")]
pub struct RuntimeConfig {
    pub media_folder: PathBuf,
    pub media_url: String,
    pub thumbnail_folder: PathBuf,
    pub thumbnail_url: String,
    pub object_store: Option<ObjectStoreConfig>,
}

impl RuntimeConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let data = std::fs::read_to_string(path)?;
        Self::from_yaml(&data)
    }

    pub fn from_yaml(data: &str) -> anyhow::Result<Self> {
        Ok(serde_yaml::from_str::<Self>(data)?)
    }
}

impl TryFrom<RawConfig> for RuntimeConfig {
    type Error = ThumbnailError;

    fn try_from(raw: RawConfig) -> Result<Self, Self::Error> {
        let media_folder = raw
            .media_folder
            .filter(|path| !path.as_os_str().is_empty())
            .ok_or(ThumbnailError::MissingSetting("media_folder"))?;

        let thumbnail_url = raw.thumbnail_url.filter(|url| !url.is_empty());
        if raw.thumbnail_folder.is_some() && thumbnail_url.is_none() {
            return Err(ThumbnailError::ThumbnailUrlRequired);
        }

        if let Some(store) = raw.object_store.as_ref() {
            if store.access_key_id.is_some() != store.access_key_secret.is_some() {
                return Err(ThumbnailError::PartialCredentials);
            }

            if store.static_root_parent.as_deref().map_or(true, str::is_empty) {
                return Err(ThumbnailError::MissingRootParent);
            }
        }

        let media_url = raw.media_url.unwrap_or_else(|| "/".to_string());
        let thumbnail_folder = raw
            .thumbnail_folder
            .unwrap_or_else(|| media_folder.clone());
        let thumbnail_url = thumbnail_url.unwrap_or_else(|| media_url.clone());

        Ok(Self {
            media_folder,
            media_url,
            thumbnail_folder,
            thumbnail_url,
            object_store: raw.object_store,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObjectStoreConfig {
    /// The access key used to sign uploads.
    ///
    /// When both keys are left unset the default AWS credential
    /// chain is used instead.
    pub access_key_id: Option<String>,

    /// The secret paired with `access_key_id`.
    pub access_key_secret: Option<String>,

    /// The path prefix removed from local paths to produce bucket keys.
    ///
    /// E.g. with `/srv/app` a thumbnail at
    /// `/srv/app/static/thumbs/cat_50x50_85.jpg` is uploaded as
    /// `static/thumbs/cat_50x50_85.jpg`.
    pub static_root_parent: Option<String>,

    #[serde(default = "default_acl")]
    /// The canned ACL applied to uploaded thumbnails.
    ///
    /// Defaults to `public-read`.
    pub acl: String,

    #[serde(default)]
    /// Build public URLs with `https` rather than `http`.
    ///
    /// Defaults to `false`.
    pub use_https: bool,

    #[serde(default = "default_region")]
    /// The bucket region.
    ///
    /// Defaults to `us-east-1`.
    pub region: String,

    /// A custom S3 compatible endpoint, e.g. a MinIO instance.
    pub endpoint: Option<String>,

    #[serde(default = "default_domain")]
    /// The domain public bucket URLs are built from.
    ///
    /// Defaults to `s3.amazonaws.com`.
    pub domain: String,

    #[serde(default)]
    /// Address buckets as `<domain>/<bucket>` rather than `<bucket>.<domain>`.
    ///
    /// Defaults to `false`.
    pub path_style: bool,

    #[serde(default = "default_request_timeout")]
    /// The timeout in seconds for existence probes and original downloads.
    ///
    /// Defaults to `10`.
    pub request_timeout: u64,
}

impl ObjectStoreConfig {
    #[inline]
    pub fn scheme(&self) -> &'static str {
        if self.use_https {
            "https"
        } else {
            "http"
        }
    }
}

fn default_acl() -> String {
    "public-read".to_string()
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_domain() -> String {
    "s3.amazonaws.com".to_string()
}

const fn default_request_timeout() -> u64 {
    10
}
