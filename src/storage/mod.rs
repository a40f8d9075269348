pub mod backends;
pub mod template;

#[cfg(test)]
pub(crate) mod testing;

pub use template::{StorageBackend, ThumbnailPaths};
