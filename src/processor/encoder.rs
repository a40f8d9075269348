use std::io::Cursor;

use anyhow::anyhow;
use bytes::Bytes;
use image::{DynamicImage, ImageFormat, ImageOutputFormat};
use mime::Mime;

pub struct EncodedImage {
    pub format: ImageFormat,
    pub buff: Bytes,
}

impl EncodedImage {
    #[inline]
    pub fn content_type(&self) -> Mime {
        content_type(self.format)
    }
}

/// Re-encodes the image in the given format.
///
/// `quality` applies to JPEG and WebP, every other format is written
/// with its default settings.
pub fn encode_to(img: &DynamicImage, format: ImageFormat, quality: u8) -> anyhow::Result<Bytes> {
    if let ImageFormat::WebP = format {
        let rgba = DynamicImage::ImageRgba8(img.to_rgba8());
        let encoder = webp::Encoder::from_image(&rgba)
            .map_err(|e| anyhow!("failed to prepare webp encoder: {}", e))?;
        let encoded = encoder.encode(f32::from(quality));

        return Ok(Bytes::from(encoded.to_vec()));
    }

    let mut buff = Cursor::new(Vec::new());
    if let ImageFormat::Jpeg = format {
        // JPEG has no alpha channel.
        let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
        rgb.write_to(&mut buff, ImageOutputFormat::Jpeg(quality))?;
    } else {
        img.write_to(&mut buff, format)?;
    }

    Ok(Bytes::from(buff.into_inner()))
}

pub fn content_type(format: ImageFormat) -> Mime {
    match format {
        ImageFormat::Png => mime::IMAGE_PNG,
        ImageFormat::Jpeg => mime::IMAGE_JPEG,
        ImageFormat::Gif => mime::IMAGE_GIF,
        ImageFormat::Bmp => mime::IMAGE_BMP,
        ImageFormat::WebP => "image/webp".parse().unwrap_or(mime::APPLICATION_OCTET_STREAM),
        ImageFormat::Tiff => "image/tiff".parse().unwrap_or(mime::APPLICATION_OCTET_STREAM),
        ImageFormat::Ico => "image/x-icon".parse().unwrap_or(mime::APPLICATION_OCTET_STREAM),
        _ => mime::APPLICATION_OCTET_STREAM,
    }
}
