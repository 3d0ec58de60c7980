use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Response for a successful upload
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub message: String,
    pub file_name: String,
    pub size_in_bytes: u64,
    pub location: String,
}

/// JSON upload variant: content arrives base64-encoded in the body, so its
/// decoded length is always known up front.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonUploadRequest {
    pub file_name: String,
    pub file_content: String,
}

/// One stored object as reported by `?action=list`
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    pub name: String,
    pub size_in_bytes: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListResponse {
    pub files: Vec<FileEntry>,
}

/// Response for `?action=download`
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadLinkResponse {
    pub download_url: String,
    pub expires_at: DateTime<Utc>,
}

/// Response for a successful delete
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResponse {
    pub message: String,
    pub file_name: String,
}

/// Query parameters for GET and DELETE on the file endpoint
#[derive(Debug, Deserialize)]
pub struct FileQuery {
    pub action: Option<String>,
    pub filename: Option<String>,
}
