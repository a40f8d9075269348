use std::panic::{self, AssertUnwindSafe};

use anyhow::anyhow;
use bytes::Bytes;
use futures::channel::oneshot;
use image::{load_from_memory_with_format, DynamicImage, ImageFormat};

use crate::request::{Background, CropMode, Size, ThumbnailRequest};

pub mod encoder;
pub mod resizer;

pub use encoder::EncodedImage;

/// The transform half of a thumbnail request.
#[derive(Debug, Clone, Copy)]
pub struct Transform {
    pub size: Size,
    pub crop: Option<CropMode>,
    pub background: Option<Background>,
    pub quality: u8,
}

impl From<&ThumbnailRequest> for Transform {
    fn from(request: &ThumbnailRequest) -> Self {
        Self {
            size: request.size,
            crop: request.crop,
            background: request.background,
            quality: request.quality,
        }
    }
}

/// Decodes the image, detecting its format from its content.
pub fn decode(data: &[u8]) -> anyhow::Result<(ImageFormat, DynamicImage)> {
    let format = image::guess_format(data)?;
    let img = load_from_memory_with_format(data, format)?;
    Ok((format, img))
}

/// Decodes, resizes and re-encodes the image in its original format.
pub fn process(data: &[u8], transform: Transform) -> anyhow::Result<EncodedImage> {
    let (format, original) = decode(data)?;

    let resized = resizer::resize(&original, transform.size, transform.crop, transform.background);
    let buff = encoder::encode_to(&resized, format, transform.quality)?;

    Ok(EncodedImage { format, buff })
}

/// Runs `process` on the rayon pool.
///
/// A panic inside the codec is returned as an error rather than
/// unwinding into the pool.
pub async fn process_on_pool(data: Bytes, transform: Transform) -> anyhow::Result<EncodedImage> {
    let (tx, rx) = oneshot::channel();

    rayon::spawn(move || {
        let res = panic::catch_unwind(AssertUnwindSafe(|| process(&data, transform)))
            .unwrap_or_else(|_| Err(anyhow!("image processing panicked")));

        // The receiver is only gone if the resolution was dropped.
        let _ = tx.send(res);
    });

    rx.await?
}
