use thiserror::Error;

/// Errors which are raised to the caller rather than collapsed into
/// an empty thumbnail URL.
///
/// Everything here is detected before any fetch, transform or upload
/// work is attempted, with the exception of `Io` which covers the
/// thumbnail directory creation on the local backend.
#[derive(Debug, Error)]
pub enum ThumbnailError {
    #[error("missing required setting `{0}`")]
    MissingSetting(&'static str),

    #[error("`thumbnail_folder` is set, `thumbnail_url` must be set as well")]
    ThumbnailUrlRequired,

    #[error("`access_key_id` and `access_key_secret` must be set together")]
    PartialCredentials,

    #[error(
        "storage type {0:?} is invalid, the only supported storage type \
        (apart from default local storage) is s3"
    )]
    UnsupportedBackend(String),

    #[error("the s3 storage type requires a bucket name")]
    MissingBucket,

    #[error("an s3 thumbnail was requested but no `object_store` section is configured")]
    ObjectStoreNotConfigured,

    #[error("s3 storage requires `static_root_parent` to be set")]
    MissingRootParent,

    #[error(
        "invalid thumbnail size {0:?}, expected `<width>x<height>` with dimensions \
        between 1 and 4096"
    )]
    InvalidSize(String),

    #[error("invalid quality {0}, expected a value between 1 and 100")]
    InvalidQuality(u8),

    #[error("invalid crop mode {0:?}, the only supported crop mode is `fit`")]
    InvalidCrop(String),

    #[error("invalid background colour {0:?}")]
    InvalidBackground(String),

    #[error("invalid image path {0:?}")]
    InvalidImagePath(String),

    #[error("failed to prepare thumbnail directory: {0}")]
    Io(#[from] std::io::Error),
}

impl ThumbnailError {
    /// True for errors caused by the host configuration or by the
    /// storage selection of a request rather than by the request's
    /// transform parameters or the environment.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::MissingSetting(_)
                | Self::ThumbnailUrlRequired
                | Self::PartialCredentials
                | Self::UnsupportedBackend(_)
                | Self::MissingBucket
                | Self::ObjectStoreNotConfigured
                | Self::MissingRootParent
        )
    }

    /// True for malformed transform parameters or image paths.
    pub fn is_request_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidSize(_)
                | Self::InvalidQuality(_)
                | Self::InvalidCrop(_)
                | Self::InvalidBackground(_)
                | Self::InvalidImagePath(_)
        )
    }
}
