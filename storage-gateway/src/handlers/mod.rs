use axum::{
    extract::{FromRequest, Multipart, Query, Request, State},
    http::{header::CONTENT_TYPE, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use bytes::Bytes;
use futures::StreamExt;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{GatewayError, GatewayResult};
use crate::models::{
    DeleteResponse, DownloadLinkResponse, FileEntry, FileQuery, JsonUploadRequest, ListResponse,
    UploadResponse,
};
use crate::AppState;

/// Handle file upload. Two observed body shapes are accepted on the same
/// route: `multipart/form-data` with a `file` field, and a JSON body with
/// base64 content.
pub async fn upload(
    State(state): State<AppState>,
    request: Request,
) -> GatewayResult<Json<UploadResponse>> {
    let content_type = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();

    if content_type.starts_with("multipart/form-data") {
        let multipart = Multipart::from_request(request, &())
            .await
            .map_err(|e| GatewayError::Validation(format!("File parsing failed: {}", e)))?;
        upload_multipart(&state, multipart).await
    } else if content_type.starts_with("application/json") {
        let Json(body) = Json::<JsonUploadRequest>::from_request(request, &())
            .await
            .map_err(|e| GatewayError::Validation(format!("Invalid JSON body: {}", e)))?;
        upload_json(&state, body).await
    } else {
        Err(GatewayError::Validation(
            "Expected multipart/form-data or application/json".to_string(),
        ))
    }
}

/// Multipart path: the file arrives as a decoder stream with no reliable
/// total length, so the body is handed to the facade chunk by chunk and
/// never buffered whole.
async fn upload_multipart(
    state: &AppState,
    mut multipart: Multipart,
) -> GatewayResult<Json<UploadResponse>> {
    let upload_id = Uuid::new_v4();
    info!("Received file upload request ({})", upload_id);

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| GatewayError::Validation(format!("File parsing failed: {}", e)))?
    {
        let field_name = field.name().unwrap_or("unknown").to_string();
        debug!("Processing field: {}", field_name);

        if field_name != "file" {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().trim().to_string();
        if file_name.is_empty() {
            return Err(GatewayError::Validation("No file uploaded".to_string()));
        }

        let content_type = field
            .content_type()
            .map(str::to_string)
            .unwrap_or_else(|| mime::APPLICATION_OCTET_STREAM.to_string());

        let content = Box::pin(field.map(|chunk| {
            chunk.map_err(|e| GatewayError::Upload(format!("Failed to read file: {}", e)))
        }));

        let outcome = state.gateway.upload(&file_name, &content_type, content).await?;

        info!(
            "Upload {} stored {} ({} bytes)",
            upload_id, outcome.file_name, outcome.size_in_bytes
        );
        return Ok(Json(UploadResponse {
            message: "Upload successful".to_string(),
            file_name: outcome.file_name,
            size_in_bytes: outcome.size_in_bytes,
            location: outcome.location,
        }));
    }

    Err(GatewayError::Validation("No file uploaded".to_string()))
}

/// JSON path: base64 content is fully materialized, so its exact length is
/// known before the store is contacted.
async fn upload_json(
    state: &AppState,
    body: JsonUploadRequest,
) -> GatewayResult<Json<UploadResponse>> {
    if body.file_name.trim().is_empty() {
        return Err(GatewayError::Validation("No file uploaded".to_string()));
    }

    let content = BASE64
        .decode(body.file_content.as_bytes())
        .map_err(|e| GatewayError::Validation(format!("Invalid base64 content: {}", e)))?;

    let outcome = state
        .gateway
        .upload_bytes(
            &body.file_name,
            mime::APPLICATION_OCTET_STREAM.as_ref(),
            Bytes::from(content),
        )
        .await?;

    Ok(Json(UploadResponse {
        message: "Upload successful".to_string(),
        file_name: outcome.file_name,
        size_in_bytes: outcome.size_in_bytes,
        location: outcome.location,
    }))
}

/// Dispatch GET requests by `action`: `list` enumerates the bucket,
/// `download` returns a signed time-limited URL.
pub async fn query_files(
    State(state): State<AppState>,
    Query(query): Query<FileQuery>,
) -> GatewayResult<Response> {
    match query.action.as_deref() {
        Some("list") => {
            let objects = state.gateway.list().await?;
            let files = objects
                .into_iter()
                .map(|object| FileEntry {
                    name: object.key,
                    size_in_bytes: object.size_in_bytes,
                })
                .collect();

            Ok(Json(ListResponse { files }).into_response())
        }
        Some("download") => {
            let filename = query
                .filename
                .filter(|f| !f.trim().is_empty())
                .ok_or_else(|| {
                    GatewayError::Validation("Invalid action or missing filename".to_string())
                })?;

            let link = state.gateway.download_link(&filename, None).await?;

            Ok(Json(DownloadLinkResponse {
                download_url: link.url,
                expires_at: link.expires_at,
            })
            .into_response())
        }
        _ => Err(GatewayError::Validation(
            "Invalid action or missing filename".to_string(),
        )),
    }
}

pub async fn delete_file(
    State(state): State<AppState>,
    Query(query): Query<FileQuery>,
) -> GatewayResult<Json<DeleteResponse>> {
    let filename = query
        .filename
        .filter(|f| !f.trim().is_empty())
        .ok_or_else(|| GatewayError::Validation("Filename is required".to_string()))?;

    state.gateway.delete(&filename).await?;

    Ok(Json(DeleteResponse {
        message: "Delete successful".to_string(),
        file_name: filename,
    }))
}

/// Cross-origin preflight; the CORS layer fills in the headers.
pub async fn preflight() -> StatusCode {
    StatusCode::OK
}

pub async fn method_not_allowed() -> GatewayError {
    GatewayError::MethodNotAllowed
}
