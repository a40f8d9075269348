use std::sync::Arc;

use poem_openapi::param::Query;
use poem_openapi::payload::{Json, PlainText};
use poem_openapi::{ApiResponse, Object, OpenApi};

use crate::controller::ThumbnailResolver;
use crate::error::ThumbnailError;
use crate::request::ThumbnailParams;

#[derive(Object, Debug)]
pub struct ThumbnailInfo {
    /// The public URL of the thumbnail.
    ///
    /// Empty if the thumbnail could not be created, e.g. because the
    /// original image is missing or is not a supported image.
    url: String,
}

#[derive(ApiResponse)]
pub enum ThumbnailResponse {
    /// The thumbnail exists and can be fetched from the returned URL.
    #[oai(status = 200)]
    Ok(Json<ThumbnailInfo>),

    /// The request parameters are invalid, name an unsupported storage
    /// backend or omit the bucket for s3.
    #[oai(status = 400)]
    InvalidRequest(PlainText<String>),

    /// The server is not configured for the requested storage backend or
    /// the thumbnail directory could not be created.
    #[oai(status = 500)]
    InternalError(PlainText<String>),
}

impl From<ThumbnailError> for ThumbnailResponse {
    fn from(e: ThumbnailError) -> Self {
        let client_error = e.is_request_error()
            || matches!(e, ThumbnailError::UnsupportedBackend(_) | ThumbnailError::MissingBucket);

        if client_error {
            Self::InvalidRequest(PlainText(e.to_string()))
        } else {
            error!("Failed to resolve thumbnail: {}", e);
            Self::InternalError(PlainText(e.to_string()))
        }
    }
}

pub struct ThumbnailApi {
    resolver: Arc<ThumbnailResolver>,
}

impl ThumbnailApi {
    pub fn new(resolver: Arc<ThumbnailResolver>) -> Self {
        Self { resolver }
    }
}

#[OpenApi]
impl ThumbnailApi {
    /// Get Thumbnail
    ///
    /// Resolves the public URL of a thumbnail of the given image, creating
    /// the thumbnail first if it does not exist yet.
    ///
    /// `size` is given as `<width>x<height>`. Without `crop` the image is
    /// shrunk to fit within the size keeping its aspect ratio, with
    /// `crop=fit` it is scaled and centre cropped to exactly the size.
    /// A `background` pads the result onto a square canvas of that colour.
    #[allow(clippy::too_many_arguments)]
    #[oai(path = "/thumbnail", method = "get")]
    pub async fn thumbnail(
        &self,
        image_url: Query<String>,
        size: Query<String>,
        crop: Query<Option<String>>,
        background: Query<Option<String>>,
        quality: Query<Option<u8>>,
        backend: Query<Option<String>>,
        bucket: Query<Option<String>>,
    ) -> ThumbnailResponse {
        let mut params = ThumbnailParams::new(image_url.0, size.0);
        params.crop = crop.0;
        params.background = background.0;
        params.quality = quality.0;
        params.backend = backend.0;
        params.bucket = bucket.0;

        match self.resolver.thumbnail(params).await {
            Ok(url) => ThumbnailResponse::Ok(Json(ThumbnailInfo { url })),
            Err(e) => ThumbnailResponse::from(e),
        }
    }
}
