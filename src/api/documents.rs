//! Document upload targets and metadata

use super::{json, present, require_session, ApiError, ApiRequest, ApiResponse, AppState};
use crate::s3::{FileDescriptor, StorageError};
use crate::store::DocumentRecord;
use hyper::StatusCode;
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info, warn};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadTargetsBody {
    class_id: Option<String>,
    #[serde(default)]
    files: Vec<FileDescriptor>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SaveDocumentBody {
    class_id: Option<String>,
    file_name: Option<String>,
    file_url: Option<String>,
}

/// `POST /api/documents/upload-document`
///
/// Issues one presigned PUT target per described file. The bytes never pass
/// through this server.
pub async fn upload_targets(
    state: &AppState,
    request: &ApiRequest,
) -> Result<ApiResponse, ApiError> {
    let session = require_session(state, request).await?;

    if request.body_is_blank() {
        return Err(ApiError::bad_request("No files received"));
    }
    let body: UploadTargetsBody = request.json(&ApiError::bad_request("Invalid JSON body"))?;
    if body.files.is_empty() {
        return Err(ApiError::bad_request("No files received"));
    }

    let class_id = present(&body.class_id).map(str::to_string);
    let count = body.files.len();

    let targets = state
        .issuer
        .issue_targets(class_id.clone(), body.files)
        .await
        .map_err(|e| {
            if matches!(e, StorageError::InvalidFile(_)) {
                warn!(error = %e, "Rejected upload target request");
                ApiError::bad_request(e.to_string())
            } else {
                error!(error = ?e, "Could not issue upload targets");
                crate::metrics::record_error("presign");
                ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
        })?;

    info!(
        user_id = %session.user_id,
        class_id = class_id.as_deref().unwrap_or("general"),
        files = count,
        "Upload targets issued"
    );
    Ok(json(
        StatusCode::OK,
        &json!({
            "message": "Upload URLs generated",
            "data": targets,
        }),
    ))
}

/// `POST /api/documents/save-document`
pub async fn save(state: &AppState, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
    let session = require_session(state, request).await?;

    let body: SaveDocumentBody = request.json(&ApiError::bad_request("Invalid JSON body"))?;
    let (Some(class_id), Some(file_name), Some(file_url)) = (
        present(&body.class_id),
        present(&body.file_name),
        present(&body.file_url),
    ) else {
        return Err(ApiError::bad_request("Missing required fields"));
    };

    let document = DocumentRecord::new(
        class_id.to_string(),
        file_name.to_string(),
        file_url.to_string(),
        session.user_id.clone(),
    );

    state
        .store
        .insert_document(document.clone())
        .await
        .map_err(|e| {
            error!(error = %e, file_url = %document.file_url, "Failed to save document");
            crate::metrics::record_error("store");
            ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Failed to save document")
        })?;

    info!(
        document_id = %document.document_id,
        class_id = %document.class_id,
        "Document saved"
    );
    Ok(json(
        StatusCode::OK,
        &json!({
            "message": "Document saved successfully",
            "document": document,
        }),
    ))
}

/// `GET /api/documents/classes/{classId}`
pub async fn for_class(
    state: &AppState,
    request: &ApiRequest,
    class_id: &str,
) -> Result<ApiResponse, ApiError> {
    require_session(state, request).await?;

    let documents = state
        .store
        .documents_for_class(class_id)
        .await
        .map_err(|e| {
            error!(error = %e, class_id, "Failed to fetch documents");
            crate::metrics::record_error("store");
            ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "An error occurred while fetching documents.",
            )
        })?;
    Ok(json(StatusCode::OK, &documents))
}
