use std::hash::Hash;

use tokio::sync::{Mutex, MutexGuard};

pub fn crc_hash<H: Hash>(v: H) -> u32 {
    let mut hasher = crc32fast::Hasher::default();
    v.hash(&mut hasher);
    hasher.finalize()
}

/// Joins URL path segments onto a prefix with single separators,
/// skipping empty segments.
pub fn join_url(prefix: &str, segments: &[&str]) -> String {
    let mut url = prefix.trim_end_matches('/').to_string();
    for segment in segments.iter().map(|v| v.trim_matches('/')).filter(|v| !v.is_empty()) {
        url.push('/');
        url.push_str(segment);
    }

    url
}

/// A fixed set of async locks, keys are spread across them by their
/// crc32 hash.
///
/// Two keys may share a lock, which only costs some concurrency.
pub struct KeyLocks {
    stripes: Vec<Mutex<()>>,
}

impl KeyLocks {
    pub fn new(stripes: usize) -> Self {
        Self {
            stripes: (0..stripes.max(1)).map(|_| Mutex::new(())).collect(),
        }
    }

    #[inline]
    fn stripe_of(&self, key: &str) -> usize {
        crc_hash(key) as usize % self.stripes.len()
    }

    pub async fn acquire(&self, key: &str) -> MutexGuard<'_, ()> {
        self.stripes[self.stripe_of(key)].lock().await
    }
}
