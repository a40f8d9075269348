use std::fmt;

use crate::request::{Background, CropMode, Size, ThumbnailRequest};

/// Joins the name and every transform component of a key.
pub const SEPARATOR: char = '_';

/// The file name a thumbnail is cached under.
///
/// Keys are plain concatenations, never hashes, so they stay readable
/// and two parameter sets only collide if a component contains the
/// separator itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Builds the cache key for a thumbnail.
///
/// The components are appended in a fixed order: size, crop, background
/// and quality, followed by the extension. Changing the order orphans
/// every thumbnail cached so far.
pub fn derive(
    name: &str,
    extension: &str,
    size: Size,
    crop: Option<CropMode>,
    background: Option<Background>,
    quality: u8,
) -> CacheKey {
    let components = [
        Some(size.to_string()),
        crop.map(|v| v.to_string()),
        background.map(|v| v.to_string()),
        Some(quality).filter(|v| *v != 0).map(|v| v.to_string()),
    ];

    let mut key = String::from(name);
    for component in components.iter().flatten() {
        key.push(SEPARATOR);
        key.push_str(component);
    }
    key.push_str(extension);

    CacheKey(key)
}

/// The cache key of a validated request.
pub fn for_request(request: &ThumbnailRequest) -> CacheKey {
    derive(
        &request.reference.stem,
        &request.reference.extension,
        request.size,
        request.crop,
        request.background,
        request.quality,
    )
}
