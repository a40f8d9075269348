use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use anyhow::anyhow;
use async_trait::async_trait;
use bytes::Bytes;
use percent_encoding::percent_decode_str;

use super::backends::transport::{ObjectTransport, ObjectUpload};

/// An in-memory bucket, objects are matched by the decoded tail of the URL.
#[derive(Default)]
pub struct MemoryTransport {
    objects: Mutex<HashMap<String, Bytes>>,
    uploads: Mutex<Vec<ObjectUpload>>,
    downloads: Mutex<Vec<String>>,
    unreachable: AtomicBool,
    reject_uploads: AtomicBool,
}

impl MemoryTransport {
    pub fn insert(&self, key: &str, data: Bytes) {
        self.objects.lock().unwrap().insert(key.to_string(), data);
    }

    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    pub fn set_reject_uploads(&self, reject: bool) {
        self.reject_uploads.store(reject, Ordering::SeqCst);
    }

    pub fn uploads(&self) -> Vec<ObjectUpload> {
        self.uploads.lock().unwrap().clone()
    }

    pub fn downloaded(&self) -> Vec<String> {
        self.downloads.lock().unwrap().clone()
    }

    fn lookup(&self, url: &str) -> anyhow::Result<Option<Bytes>> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(anyhow!("connection refused"));
        }

        // Only the path names the object, as on a real server.
        let encoded_path = url.split(|c| c == '#' || c == '?').next().unwrap_or(url);
        let path = percent_decode_str(encoded_path).decode_utf8_lossy();

        let objects = self.objects.lock().unwrap();
        Ok(objects
            .iter()
            .find(|(key, _)| path.ends_with(&format!("/{}", key)))
            .map(|(_, data)| data.clone()))
    }
}

#[async_trait]
impl ObjectTransport for MemoryTransport {
    async fn probe(&self, url: &str) -> anyhow::Result<u16> {
        // Missing public objects are reported as forbidden by S3.
        Ok(self.lookup(url)?.map(|_| 200).unwrap_or(403))
    }

    async fn download(&self, url: &str) -> anyhow::Result<Bytes> {
        self.downloads.lock().unwrap().push(url.to_string());
        self.lookup(url)?
            .ok_or_else(|| anyhow!("HTTP status client error (404 Not Found) for url ({})", url))
    }

    async fn upload(&self, upload: ObjectUpload) -> anyhow::Result<()> {
        if self.unreachable.load(Ordering::SeqCst) || self.reject_uploads.load(Ordering::SeqCst) {
            return Err(anyhow!("AccessDenied: Access Denied"));
        }

        self.insert(&upload.key, upload.data.clone());
        self.uploads.lock().unwrap().push(upload);
        Ok(())
    }
}
