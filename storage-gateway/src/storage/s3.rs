//! S3-compatible store client (Storj gateway, MinIO, AWS S3)

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};
use aws_sdk_s3::Client;
use bytes::Bytes;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::StorageConfig;
use crate::storage::{ListPage, ObjectStore, ObjectSummary, StoreError};

/// S3 client wired to a single configured bucket
pub struct S3Store {
    client: Client,
    bucket: String,
    base_url: String,
}

impl S3Store {
    /// Build a client from validated configuration. Static credentials,
    /// custom endpoint, path-style addressing (Storj's gateway rejects
    /// virtual-hosted requests).
    pub async fn new(config: &StorageConfig) -> Self {
        info!("Initializing store client for bucket: {}", config.bucket);

        let credentials = Credentials::new(
            config.access_key.clone(),
            config.secret_key.clone(),
            None,
            None,
            "storage-gateway",
        );

        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials)
            .load()
            .await;

        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .endpoint_url(config.endpoint.as_str())
            .force_path_style(true)
            .build();

        let base_url = format!(
            "{}/{}",
            config.endpoint.trim_end_matches('/'),
            config.bucket
        );

        Self {
            client: Client::from_conf(s3_config),
            bucket: config.bucket.clone(),
            base_url,
        }
    }
}

fn store_err<E: std::error::Error>(err: E) -> StoreError {
    StoreError(DisplayErrorContext(err).to_string())
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn put_object(
        &self,
        key: &str,
        content_type: &str,
        body: Bytes,
    ) -> Result<(), StoreError> {
        debug!("PutObject: {} ({} bytes)", key, body.len());

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(store_err)?;

        Ok(())
    }

    async fn create_multipart_upload(
        &self,
        key: &str,
        content_type: &str,
    ) -> Result<String, StoreError> {
        debug!("CreateMultipartUpload: {}", key);

        let output = self
            .client
            .create_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .send()
            .await
            .map_err(store_err)?;

        output
            .upload_id()
            .map(str::to_string)
            .ok_or_else(|| StoreError("Store returned no upload id".to_string()))
    }

    async fn upload_part(
        &self,
        key: &str,
        upload_id: &str,
        part_number: i32,
        body: Bytes,
    ) -> Result<String, StoreError> {
        debug!("UploadPart: {} part {} ({} bytes)", key, part_number, body.len());

        let output = self
            .client
            .upload_part()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(upload_id)
            .part_number(part_number)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(store_err)?;

        Ok(output.e_tag().unwrap_or_default().to_string())
    }

    async fn complete_multipart_upload(
        &self,
        key: &str,
        upload_id: &str,
        part_etags: Vec<String>,
    ) -> Result<(), StoreError> {
        debug!("CompleteMultipartUpload: {} ({} parts)", key, part_etags.len());

        let parts: Vec<CompletedPart> = part_etags
            .into_iter()
            .enumerate()
            .map(|(i, etag)| {
                CompletedPart::builder()
                    .part_number(i as i32 + 1)
                    .e_tag(etag)
                    .build()
            })
            .collect();

        self.client
            .complete_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(upload_id)
            .multipart_upload(
                CompletedMultipartUpload::builder()
                    .set_parts(Some(parts))
                    .build(),
            )
            .send()
            .await
            .map_err(store_err)?;

        Ok(())
    }

    async fn abort_multipart_upload(&self, key: &str, upload_id: &str) -> Result<(), StoreError> {
        debug!("AbortMultipartUpload: {}", key);

        self.client
            .abort_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(upload_id)
            .send()
            .await
            .map_err(store_err)?;

        Ok(())
    }

    async fn list_page(&self, continuation_token: Option<String>) -> Result<ListPage, StoreError> {
        debug!("ListObjectsV2: token={:?}", continuation_token);

        let output = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .set_continuation_token(continuation_token)
            .send()
            .await
            .map_err(store_err)?;

        let objects = output
            .contents()
            .iter()
            .filter_map(|object| {
                let key = object.key()?.to_string();
                Some(ObjectSummary {
                    key,
                    size_in_bytes: object.size().unwrap_or(0).max(0) as u64,
                    last_modified: object.last_modified().and_then(|t| {
                        chrono::DateTime::from_timestamp(t.secs(), t.subsec_nanos())
                    }),
                })
            })
            .collect();

        Ok(ListPage {
            objects,
            continuation_token: output.next_continuation_token().map(str::to_string),
        })
    }

    async fn presign_download(&self, key: &str, ttl: Duration) -> Result<String, StoreError> {
        debug!("Presign GetObject: {} (ttl {:?})", key, ttl);

        let presigning = PresigningConfig::expires_in(ttl).map_err(store_err)?;

        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(store_err)?;

        Ok(request.uri().to_string())
    }

    async fn delete_object(&self, key: &str) -> Result<(), StoreError> {
        debug!("DeleteObject: {}", key);

        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(store_err)?;

        Ok(())
    }

    fn object_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url, key)
    }
}
