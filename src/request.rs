use std::fmt;
use std::str::FromStr;

use strum::{AsRefStr, Display, EnumString};

use crate::error::ThumbnailError;

/// The quality used when a request does not give one.
pub const DEFAULT_QUALITY: u8 = 85;

/// The largest width or height a thumbnail may be requested at.
pub const MAX_DIMENSION: u32 = 4096;

/// The target bounds of a thumbnail, written as `<width>x<height>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl FromStr for Size {
    type Err = ThumbnailError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ThumbnailError::InvalidSize(s.to_string());

        let (width, height) = s.split_once('x').ok_or_else(invalid)?;
        let width: u32 = width.trim().parse().map_err(|_| invalid())?;
        let height: u32 = height.trim().parse().map_err(|_| invalid())?;

        let in_bounds = |v: u32| (1..=MAX_DIMENSION).contains(&v);
        if !in_bounds(width) || !in_bounds(height) {
            return Err(invalid());
        }

        Ok(Self { width, height })
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display, AsRefStr)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum CropMode {
    /// Crop to the target aspect ratio around the centre, then scale
    /// to exactly the target size.
    Fit,
}

/// An RGBA fill colour for squaring off thumbnails.
///
/// Accepted forms are a grey level (`255`), `#rgb`, `#rrggbb`,
/// `#rrggbbaa` and comma tuples such as `(255, 255, 255, 0)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Background(pub [u8; 4]);

impl FromStr for Background {
    type Err = ThumbnailError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let invalid = || ThumbnailError::InvalidBackground(raw.to_string());
        let s = raw.trim();

        if let Some(hex) = s.strip_prefix('#') {
            return parse_hex(hex).map(Self).ok_or_else(invalid);
        }

        let inner = s
            .strip_prefix('(')
            .and_then(|v| v.strip_suffix(')'))
            .unwrap_or(s);

        let channels = inner
            .split(',')
            .map(|part| part.trim().parse::<u8>())
            .collect::<Result<Vec<u8>, _>>()
            .map_err(|_| invalid())?;

        let rgba = match channels.as_slice() {
            [grey] => [*grey, *grey, *grey, 255],
            [r, g, b] => [*r, *g, *b, 255],
            [r, g, b, a] => [*r, *g, *b, *a],
            _ => return Err(invalid()),
        };

        Ok(Self(rgba))
    }
}

fn parse_hex(hex: &str) -> Option<[u8; 4]> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }

    let channel = |start: usize, width: usize| u8::from_str_radix(&hex[start..start + width], 16).ok();

    match hex.len() {
        3 => Some([
            channel(0, 1)? * 17,
            channel(1, 1)? * 17,
            channel(2, 1)? * 17,
            255,
        ]),
        6 => Some([channel(0, 2)?, channel(2, 2)?, channel(4, 2)?, 255]),
        8 => Some([channel(0, 2)?, channel(2, 2)?, channel(4, 2)?, channel(6, 2)?]),
        _ => None,
    }
}

/// Lowercase hex without a leading `#`, alpha only when not opaque.
impl fmt::Display for Background {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b, a] = self.0;
        if a == 255 {
            write!(f, "{:02x}{:02x}{:02x}", r, g, b)
        } else {
            write!(f, "{:02x}{:02x}{:02x}{:02x}", r, g, b, a)
        }
    }
}

/// An original image path split the way thumbnails are laid out:
/// `<directory>/<stem><extension>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    /// The directory relative to the media root, without leading or
    /// trailing separators. Empty for images at the root.
    pub directory: String,

    pub file_name: String,

    pub stem: String,

    /// The extension including its dot, e.g. `.jpg`. May be empty.
    pub extension: String,
}

impl ImageReference {
    pub fn parse(image_url: &str) -> Result<Self, ThumbnailError> {
        let invalid = || ThumbnailError::InvalidImagePath(image_url.to_string());

        let relative = image_url.trim().trim_start_matches('/');
        if relative.split('/').any(|component| component == "..") {
            return Err(invalid());
        }

        let (directory, file_name) = relative.rsplit_once('/').unwrap_or(("", relative));
        if file_name.is_empty() {
            return Err(invalid());
        }

        // Leading dots belong to the name, `.hidden` has no extension.
        let (stem, extension) = match file_name.rfind('.') {
            Some(idx) if file_name[..idx].chars().any(|c| c != '.') => file_name.split_at(idx),
            _ => (file_name, ""),
        };

        Ok(Self {
            directory: directory.trim_end_matches('/').to_string(),
            file_name: file_name.to_string(),
            stem: stem.to_string(),
            extension: extension.to_string(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display, AsRefStr)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum BackendKind {
    Local,
    S3,
}

/// Where a thumbnail is looked up and persisted.
///
/// A bucket only exists for the object store variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageTarget {
    Local,
    ObjectStore { bucket: String },
}

impl StorageTarget {
    /// Validates a backend name and bucket pair.
    ///
    /// No backend name means local storage, whatever the bucket.
    pub fn select(backend: Option<&str>, bucket: Option<String>) -> Result<Self, ThumbnailError> {
        let kind = match backend.map(str::trim).filter(|v| !v.is_empty()) {
            None => return Ok(Self::Local),
            Some(name) => BackendKind::from_str(name)
                .map_err(|_| ThumbnailError::UnsupportedBackend(name.to_string()))?,
        };

        match (kind, bucket.filter(|v| !v.is_empty())) {
            (BackendKind::Local, _) => Ok(Self::Local),
            (BackendKind::S3, Some(bucket)) => Ok(Self::ObjectStore { bucket }),
            (BackendKind::S3, None) => Err(ThumbnailError::MissingBucket),
        }
    }
}

/// A validated thumbnail request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThumbnailRequest {
    pub reference: ImageReference,
    pub size: Size,
    pub crop: Option<CropMode>,
    pub background: Option<Background>,
    pub quality: u8,
    pub storage: StorageTarget,
}

/// The raw parameters a template or HTTP caller hands over.
#[derive(Debug, Clone, Default)]
pub struct ThumbnailParams {
    /// The original image, e.g. `/assets/media/summer.jpg`.
    pub image_url: String,

    /// The thumbnail bounds, e.g. `100x100`.
    pub size: String,

    /// `fit` or nothing.
    pub crop: Option<String>,

    pub background: Option<String>,

    /// Defaults to `85`.
    pub quality: Option<u8>,

    /// `s3`, `local` or nothing.
    pub backend: Option<String>,

    pub bucket: Option<String>,
}

impl ThumbnailParams {
    pub fn new(image_url: impl Into<String>, size: impl Into<String>) -> Self {
        Self {
            image_url: image_url.into(),
            size: size.into(),
            ..Default::default()
        }
    }

    /// Validates the parameters.
    ///
    /// The storage selection is checked first so an unsupported backend
    /// is always reported as such.
    pub fn into_request(self) -> Result<ThumbnailRequest, ThumbnailError> {
        let storage = StorageTarget::select(self.backend.as_deref(), self.bucket)?;
        let reference = ImageReference::parse(&self.image_url)?;
        let size: Size = self.size.parse()?;

        let crop = self
            .crop
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| CropMode::from_str(v).map_err(|_| ThumbnailError::InvalidCrop(v.to_string())))
            .transpose()?;

        let background = self
            .background
            .as_deref()
            .filter(|v| !v.trim().is_empty())
            .map(Background::from_str)
            .transpose()?;

        let quality = self.quality.unwrap_or(DEFAULT_QUALITY);
        if !(1..=100).contains(&quality) {
            return Err(ThumbnailError::InvalidQuality(quality));
        }

        Ok(ThumbnailRequest {
            reference,
            size,
            crop,
            background,
            quality,
            storage,
        })
    }
}
