use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use rusoto_core::credential::{DefaultCredentialsProvider, StaticProvider};
use rusoto_core::{HttpClient, Region};
use rusoto_s3::{PutObjectRequest, S3Client, S3};

use crate::config::ObjectStoreConfig;

#[derive(Debug, Clone)]
pub struct ObjectUpload {
    pub bucket: String,
    pub key: String,
    pub data: Bytes,
    pub acl: String,
    pub content_type: String,
}

/// The network operations the object store backend is built on.
#[async_trait]
pub trait ObjectTransport: Sync + Send + 'static {
    /// Issues a HEAD request and returns the response status.
    async fn probe(&self, url: &str) -> anyhow::Result<u16>;

    /// Downloads a publicly readable object.
    async fn download(&self, url: &str) -> anyhow::Result<Bytes>;

    async fn upload(&self, upload: ObjectUpload) -> anyhow::Result<()>;
}

/// Public URLs are read over plain HTTP, writes go through the S3 API.
pub struct S3Transport {
    http: reqwest::Client,
    s3: S3Client,
}

impl S3Transport {
    pub fn connect(cfg: &ObjectStoreConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.request_timeout))
            .build()?;

        let region = match cfg.endpoint.as_ref() {
            Some(endpoint) => Region::Custom {
                name: cfg.region.clone(),
                endpoint: endpoint.clone(),
            },
            None => cfg.region.parse::<Region>()?,
        };

        let s3 = match (cfg.access_key_id.as_ref(), cfg.access_key_secret.as_ref()) {
            (Some(key), Some(secret)) => S3Client::new_with(
                HttpClient::new()?,
                StaticProvider::new_minimal(key.clone(), secret.clone()),
                region,
            ),
            _ => S3Client::new_with(
                HttpClient::new()?,
                DefaultCredentialsProvider::new()?,
                region,
            ),
        };

        Ok(Self { http, s3 })
    }
}

#[async_trait]
impl ObjectTransport for S3Transport {
    async fn probe(&self, url: &str) -> anyhow::Result<u16> {
        let response = self.http.head(url).send().await?;
        Ok(response.status().as_u16())
    }

    async fn download(&self, url: &str) -> anyhow::Result<Bytes> {
        let response = self.http
            .get(url)
            .send()
            .await?
            .error_for_status()?;

        Ok(response.bytes().await?)
    }

    async fn upload(&self, upload: ObjectUpload) -> anyhow::Result<()> {
        debug!("Uploading object to bucket {} @ {}", &upload.bucket, &upload.key);
        let request = PutObjectRequest {
            bucket: upload.bucket,
            key: upload.key,
            content_length: Some(upload.data.len() as i64),
            content_type: Some(upload.content_type),
            acl: Some(upload.acl),
            body: Some(upload.data.to_vec().into()),
            ..Default::default()
        };

        self.s3.put_object(request).await?;
        Ok(())
    }
}
