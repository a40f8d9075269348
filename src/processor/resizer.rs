use image::imageops::{self, FilterType};
use image::{DynamicImage, GenericImageView, Rgba, RgbaImage};

use crate::request::{Background, CropMode, Size};

const FILTER: FilterType = FilterType::Lanczos3;

pub fn resize(
    img: &DynamicImage,
    size: Size,
    crop: Option<CropMode>,
    background: Option<Background>,
) -> DynamicImage {
    let resized = match crop {
        Some(CropMode::Fit) => img.resize_to_fill(size.width, size.height, FILTER),
        None => shrink_within(img, size),
    };

    match background {
        Some(colour) => square_on(&resized, colour),
        None => resized,
    }
}

/// Scales the image down to fit within the bounds keeping its aspect
/// ratio. Images already within the bounds are left as they are.
fn shrink_within(img: &DynamicImage, size: Size) -> DynamicImage {
    let (width, height) = img.dimensions();
    if width <= size.width && height <= size.height {
        return img.clone();
    }

    img.resize(size.width, size.height, FILTER)
}

/// Centres the image on a square canvas as wide as its longest side.
fn square_on(img: &DynamicImage, colour: Background) -> DynamicImage {
    let (width, height) = img.dimensions();
    let side = width.max(height);

    let mut canvas = RgbaImage::from_pixel(side, side, Rgba(colour.0));
    imageops::overlay(
        &mut canvas,
        &img.to_rgba8(),
        i64::from((side - width) / 2),
        i64::from((side - height) / 2),
    );

    DynamicImage::ImageRgba8(canvas)
}
