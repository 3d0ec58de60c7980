//! Storage gateway facade
//!
//! Normalizes the four file-management operations (upload, list, signed
//! download link, delete) over any [`ObjectStore`]. Holds no mutable state;
//! every call is a single-shot request against the store.
//!
//! Upload strategy: bodies are buffered only up to [`PART_SIZE`]. A body
//! that ends within that window is stored with one put carrying its exact
//! length; a larger body switches to multipart upload, where each part
//! declares its own length, so the total never has to be known up front and
//! memory stays bounded at one part. A length the decoder never computed is
//! never forwarded to the store.

use bytes::{Bytes, BytesMut};
use chrono::Utc;
use futures::{stream, Stream, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::error::{GatewayError, GatewayResult};
use crate::storage::{ObjectStore, ObjectSummary, SignedUrl, PART_SIZE};

/// Result of a completed upload
#[derive(Debug, Clone)]
pub struct UploadOutcome {
    pub file_name: String,
    pub size_in_bytes: u64,
    pub location: String,
}

/// Stateless facade over the configured bucket
pub struct StorageGateway {
    store: Arc<dyn ObjectStore>,
    default_ttl: Duration,
}

impl StorageGateway {
    pub fn new(store: Arc<dyn ObjectStore>, default_ttl_secs: u64) -> Self {
        Self {
            store,
            default_ttl: Duration::from_secs(default_ttl_secs),
        }
    }

    /// Upload fully materialized content (the JSON/base64 path and tests).
    pub async fn upload_bytes(
        &self,
        file_name: &str,
        content_type: &str,
        content: Bytes,
    ) -> GatewayResult<UploadOutcome> {
        self.upload(file_name, content_type, stream::iter([Ok(content)]))
            .await
    }

    /// Stream `content` into the store under `file_name`, overwriting any
    /// existing object (last write wins). The source is only polled after
    /// the previous part has been accepted, so the store's pace bounds how
    /// fast the input is drained.
    pub async fn upload<S>(
        &self,
        file_name: &str,
        content_type: &str,
        mut content: S,
    ) -> GatewayResult<UploadOutcome>
    where
        S: Stream<Item = Result<Bytes, GatewayError>> + Send + Unpin,
    {
        if file_name.trim().is_empty() {
            return Err(GatewayError::Validation(
                "File name must not be empty".to_string(),
            ));
        }

        // Buffer until the body ends or outgrows one part.
        let mut buffer = BytesMut::new();
        let exceeded = loop {
            if buffer.len() > PART_SIZE {
                break true;
            }
            match content.next().await {
                Some(chunk) => buffer.extend_from_slice(&chunk?),
                None => break false,
            }
        };

        if !exceeded {
            let body = buffer.freeze();
            let size_in_bytes = body.len() as u64;
            self.store
                .put_object(file_name, content_type, body)
                .await
                .map_err(|e| {
                    error!("Store rejected upload of {}: {}", file_name, e);
                    GatewayError::Upload(e.to_string())
                })?;

            info!("Uploaded {} ({} bytes, single put)", file_name, size_in_bytes);
            return Ok(UploadOutcome {
                file_name: file_name.to_string(),
                size_in_bytes,
                location: self.store.object_url(file_name),
            });
        }

        let upload_id = self
            .store
            .create_multipart_upload(file_name, content_type)
            .await
            .map_err(|e| GatewayError::Upload(e.to_string()))?;

        match self
            .stream_parts(file_name, &upload_id, buffer, content)
            .await
        {
            Ok(size_in_bytes) => {
                info!("Uploaded {} ({} bytes, multipart)", file_name, size_in_bytes);
                Ok(UploadOutcome {
                    file_name: file_name.to_string(),
                    size_in_bytes,
                    location: self.store.object_url(file_name),
                })
            }
            Err(err) => {
                // Best effort; an orphaned upload only costs storage until
                // the store expires it.
                if let Err(abort_err) = self
                    .store
                    .abort_multipart_upload(file_name, &upload_id)
                    .await
                {
                    warn!("Failed to abort multipart upload {}: {}", upload_id, abort_err);
                }
                Err(err)
            }
        }
    }

    /// Drain the remaining body as fixed-size parts. `buffer` already holds
    /// more than one part's worth of data when this is called.
    async fn stream_parts<S>(
        &self,
        file_name: &str,
        upload_id: &str,
        mut buffer: BytesMut,
        mut content: S,
    ) -> GatewayResult<u64>
    where
        S: Stream<Item = Result<Bytes, GatewayError>> + Send + Unpin,
    {
        let mut part_etags = Vec::new();
        let mut part_number: i32 = 1;
        let mut total: u64 = 0;
        let mut drained = false;

        loop {
            while !drained && buffer.len() < PART_SIZE {
                match content.next().await {
                    Some(chunk) => buffer.extend_from_slice(&chunk?),
                    None => drained = true,
                }
            }

            if buffer.is_empty() {
                break;
            }

            let part = buffer.split_to(buffer.len().min(PART_SIZE)).freeze();
            total += part.len() as u64;

            let etag = self
                .store
                .upload_part(file_name, upload_id, part_number, part)
                .await
                .map_err(|e| {
                    error!("Part {} of {} failed: {}", part_number, file_name, e);
                    GatewayError::Upload(e.to_string())
                })?;
            part_etags.push(etag);
            part_number += 1;

            if drained && buffer.is_empty() {
                break;
            }
        }

        self.store
            .complete_multipart_upload(file_name, upload_id, part_etags)
            .await
            .map_err(|e| GatewayError::Upload(e.to_string()))?;

        Ok(total)
    }

    /// Enumerate every object in the bucket, following continuation tokens
    /// until the store reports none.
    pub async fn list(&self) -> GatewayResult<Vec<ObjectSummary>> {
        let mut objects = Vec::new();
        let mut token = None;

        loop {
            let page = self
                .store
                .list_page(token)
                .await
                .map_err(|e| GatewayError::List(e.to_string()))?;

            objects.extend(page.objects);
            match page.continuation_token {
                Some(next) => token = Some(next),
                None => break,
            }
        }

        info!("Listed {} objects", objects.len());
        Ok(objects)
    }

    /// Produce a signed, time-limited download URL for `key`. Signing is a
    /// local operation and does not confirm the object exists; fetching a
    /// link for an absent key fails at the store, not here.
    pub async fn download_link(
        &self,
        key: &str,
        ttl: Option<Duration>,
    ) -> GatewayResult<SignedUrl> {
        if key.trim().is_empty() {
            return Err(GatewayError::Validation("Filename is required".to_string()));
        }

        let ttl = ttl.unwrap_or(self.default_ttl);
        if ttl.as_secs() == 0 {
            return Err(GatewayError::Validation(
                "Link TTL must be positive".to_string(),
            ));
        }
        let ttl_delta = chrono::Duration::from_std(ttl)
            .map_err(|_| GatewayError::Validation("Link TTL is too large".to_string()))?;

        let issued_at = Utc::now();
        let url = self
            .store
            .presign_download(key, ttl)
            .await
            .map_err(|e| GatewayError::Signing(e.to_string()))?;

        Ok(SignedUrl {
            url,
            expires_at: issued_at + ttl_delta,
        })
    }

    /// Remove the object under `key`. Succeeding twice is fine; the store
    /// treats deleting an absent key as a no-op.
    pub async fn delete(&self, key: &str) -> GatewayResult<()> {
        if key.trim().is_empty() {
            return Err(GatewayError::Validation("Filename is required".to_string()));
        }

        self.store
            .delete_object(key)
            .await
            .map_err(|e| GatewayError::Delete(e.to_string()))?;

        info!("Deleted {}", key);
        Ok(())
    }
}
