// Object store abstraction and S3-compatible implementation

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::time::Duration;

pub mod gateway;
pub mod s3;

pub use gateway::{StorageGateway, UploadOutcome};
pub use s3::S3Store;

/// S3 minimum part size. Bodies at or below this are buffered and stored
/// with a single put; anything larger goes through multipart upload.
pub const PART_SIZE: usize = 5 * 1024 * 1024;

/// One object as reported by the store
#[derive(Debug, Clone)]
pub struct ObjectSummary {
    pub key: String,
    pub size_in_bytes: u64,
    pub last_modified: Option<DateTime<Utc>>,
}

/// A single page of a bucket listing
#[derive(Debug, Clone)]
pub struct ListPage {
    pub objects: Vec<ObjectSummary>,
    pub continuation_token: Option<String>,
}

/// A time-limited signed download URL
#[derive(Debug, Clone)]
pub struct SignedUrl {
    pub url: String,
    pub expires_at: DateTime<Utc>,
}

/// Failure reported by the store, carrying the store's own message
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct StoreError(pub String);

/// Low-level operations against the configured bucket.
///
/// The facade owns all orchestration (part slicing, pagination loops,
/// expiry math); implementations only translate single calls. Injected as
/// a trait object so tests can substitute a mock or in-memory store.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store a fully buffered body under `key`, overwriting any existing
    /// object. The body's exact length is known, so the SDK can declare it.
    async fn put_object(
        &self,
        key: &str,
        content_type: &str,
        body: Bytes,
    ) -> Result<(), StoreError>;

    /// Begin a multipart upload, returning the store-issued upload id.
    async fn create_multipart_upload(
        &self,
        key: &str,
        content_type: &str,
    ) -> Result<String, StoreError>;

    /// Upload one part (1-based `part_number`), returning its ETag.
    async fn upload_part(
        &self,
        key: &str,
        upload_id: &str,
        part_number: i32,
        body: Bytes,
    ) -> Result<String, StoreError>;

    /// Finish a multipart upload from the collected part ETags, in order.
    async fn complete_multipart_upload(
        &self,
        key: &str,
        upload_id: &str,
        part_etags: Vec<String>,
    ) -> Result<(), StoreError>;

    /// Abandon a multipart upload so the store can reclaim its parts.
    async fn abort_multipart_upload(&self, key: &str, upload_id: &str) -> Result<(), StoreError>;

    /// Fetch one listing page, continuing from `continuation_token`.
    async fn list_page(&self, continuation_token: Option<String>) -> Result<ListPage, StoreError>;

    /// Produce a signed GET URL valid for `ttl`. Pure signing; the object
    /// is not checked for existence.
    async fn presign_download(&self, key: &str, ttl: Duration) -> Result<String, StoreError>;

    /// Delete the object under `key`.
    async fn delete_object(&self, key: &str) -> Result<(), StoreError>;

    /// Canonical path-style URL of the stored object.
    fn object_url(&self, key: &str) -> String;
}
