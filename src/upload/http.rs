//! HTTP implementations of the pipeline steps
//!
//! Targets and metadata go through the EduLang API with the caller's session
//! token; bytes go straight to the presigned storage URL.

use super::{DocumentDraft, MetadataSink, ObjectTransfer, UploadTargetIssuer};
use crate::s3::{FileDescriptor, StorageError, UploadTarget};
use crate::store::{DocumentRecord, StoreError};
use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Authenticated client for the EduLang API
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl ApiClient {
    pub fn new(http: reqwest::Client, base_url: &str, token: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post_json<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<reqwest::Response, reqwest::Error> {
        self.http
            .post(self.url(path))
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await
    }
}

/// Best-effort error text from an API error body
async fn error_text(response: reqwest::Response) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: Option<String>,
        message: Option<String>,
    }

    let status = response.status();
    match response.json::<ErrorBody>().await {
        Ok(ErrorBody { error: Some(e), .. }) | Ok(ErrorBody { message: Some(e), .. }) => e,
        _ => status.to_string(),
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TargetsRequest {
    class_id: Option<String>,
    files: Vec<FileDescriptor>,
}

#[derive(Deserialize)]
struct TargetsResponse {
    data: Vec<UploadTarget>,
}

/// Step 1 over `POST /api/documents/upload-document`
pub struct ApiTargetIssuer {
    api: ApiClient,
}

impl ApiTargetIssuer {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

#[async_trait]
impl UploadTargetIssuer for ApiTargetIssuer {
    async fn issue_targets(
        &self,
        class_id: Option<String>,
        files: Vec<FileDescriptor>,
    ) -> Result<Vec<UploadTarget>, StorageError> {
        let response = self
            .api
            .post_json(
                "/api/documents/upload-document",
                &TargetsRequest { class_id, files },
            )
            .await
            .map_err(|e| StorageError::RequestError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(StorageError::Rejected {
                status: status.as_u16(),
                message: error_text(response).await,
            });
        }

        let body: TargetsResponse = response
            .json()
            .await
            .map_err(|e| StorageError::RequestError(e.to_string()))?;
        Ok(body.data)
    }
}

/// Step 2: PUT the bytes to the presigned URL
pub struct PresignedPut {
    http: reqwest::Client,
}

impl PresignedPut {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl ObjectTransfer for PresignedPut {
    #[tracing::instrument(
        name = "upload.put_object",
        skip(self, target, body),
        fields(upload.bytes = body.len(), http.status_code = tracing::field::Empty),
        err
    )]
    async fn put(
        &self,
        target: &UploadTarget,
        content_type: &str,
        body: Bytes,
    ) -> Result<(), StorageError> {
        let response = self
            .http
            .put(&target.upload_url)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(body)
            .send()
            .await
            .map_err(|e| StorageError::RequestError(e.to_string()))?;

        let status = response.status();
        tracing::Span::current().record("http.status_code", status.as_u16());

        if status.is_success() {
            Ok(())
        } else {
            Err(StorageError::Rejected {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            })
        }
    }
}

#[derive(Deserialize)]
struct SaveResponse {
    document: DocumentRecord,
}

/// Step 3 over `POST /api/documents/save-document`
pub struct ApiMetadataSink {
    api: ApiClient,
}

impl ApiMetadataSink {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

#[async_trait]
impl MetadataSink for ApiMetadataSink {
    async fn persist(&self, draft: DocumentDraft) -> Result<DocumentRecord, StoreError> {
        let response = self
            .api
            .post_json("/api/documents/save-document", &draft)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        let status = response.status();
        if status.is_client_error() {
            return Err(StoreError::Rejected(error_text(response).await));
        }
        if !status.is_success() {
            return Err(StoreError::Unavailable(error_text(response).await));
        }

        let body: SaveResponse = response
            .json()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(body.document)
    }
}
