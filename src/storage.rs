use std::collections::HashMap;

use anyhow::Context;
use aws_config::{defaults, BehaviorVersion};
use aws_credential_types::Credentials;
use aws_sdk_s3::{
    config::{Builder as S3ConfigBuilder, Region},
    Client,
};
use aws_smithy_types::byte_stream::ByteStream;
use axum::async_trait;
use bytes::Bytes;

/// Metadata attached to an object on write.
#[derive(Debug, Clone)]
pub struct ObjectMeta {
    pub content_type: String,
    pub content_disposition: String,
    pub custom: HashMap<String, String>,
}

/// An object fetched by key.
#[derive(Debug, Clone)]
pub struct FetchedObject {
    pub body: Bytes,
    pub content_type: Option<String>,
}

#[async_trait]
pub trait StorageClient: Send + Sync {
    async fn put_object(&self, key: &str, body: Bytes, meta: &ObjectMeta) -> anyhow::Result<()>;
    async fn get_object(&self, key: &str) -> anyhow::Result<Option<FetchedObject>>;
    async fn delete_object(&self, key: &str) -> anyhow::Result<()>;
}

#[derive(Clone)]
pub struct Storage {
    client: Client,
    bucket: String,
}

impl Storage {
    pub async fn new(
        endpoint: &str,
        bucket: &str,
        access_key: &str,
        secret_key: &str,
        region: &str,
    ) -> anyhow::Result<Self> {
        let shared = defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .credentials_provider(Credentials::new(
                access_key, secret_key, None, None, "static",
            ))
            .endpoint_url(endpoint)
            .load()
            .await;

        let conf = S3ConfigBuilder::from(&shared)
            .endpoint_url(endpoint)
            .force_path_style(true)
            .build();

        Ok(Self {
            client: Client::from_conf(conf),
            bucket: bucket.to_string(),
        })
    }
}

#[async_trait]
impl StorageClient for Storage {
    async fn put_object(&self, key: &str, body: Bytes, meta: &ObjectMeta) -> anyhow::Result<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type(&meta.content_type)
            .content_disposition(&meta.content_disposition)
            .set_metadata(Some(meta.custom.clone()))
            .send()
            .await
            .context("s3 put_object")?;
        Ok(())
    }

    async fn get_object(&self, key: &str) -> anyhow::Result<Option<FetchedObject>> {
        let out = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(out) => out,
            Err(err) => {
                let service = err.into_service_error();
                if service.is_no_such_key() {
                    return Ok(None);
                }
                return Err(anyhow::Error::new(service).context("s3 get_object"));
            }
        };

        let content_type = out.content_type().map(|s| s.to_string());
        let body = out
            .body
            .collect()
            .await
            .context("s3 read object body")?
            .into_bytes();

        Ok(Some(FetchedObject { body, content_type }))
    }

    async fn delete_object(&self, key: &str) -> anyhow::Result<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .context("s3 delete_object")?;
        Ok(())
    }
}
