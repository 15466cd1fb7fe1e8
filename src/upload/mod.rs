//! Upload-and-persist pipeline
//!
//! Moves a set of files into a class:
//!
//! 1. one presigned upload target per file from an [`UploadTargetIssuer`],
//! 2. each file's bytes PUT straight to storage through an [`ObjectTransfer`],
//! 3. a document metadata record written through a [`MetadataSink`] for
//!    every file whose transfer succeeded.
//!
//! Transfers for all files run concurrently with no cap, and each file's
//! transfer-then-persist chain runs to completion regardless of the others.
//! Any failing file fails the submission as a whole with one aggregated
//! [`UploadError::Failed`]. Nothing is retried, and a file whose bytes
//! landed but whose record could not be written stays in storage; its URL is
//! reported in the failure.

use crate::s3::{FileDescriptor, StorageError, UploadTarget};
use crate::store::{DocumentRecord, StoreError};
use async_trait::async_trait;
use bytes::Bytes;
use futures::future::join_all;
use serde::Serialize;
use std::fmt;
use thiserror::Error;
use tracing::{info, warn};

pub mod http;

#[cfg(test)]
use mockall::automock;

/// Step 1: issues presigned upload targets, one per file, in input order
#[cfg_attr(test, automock)]
#[async_trait]
pub trait UploadTargetIssuer: Send + Sync {
    async fn issue_targets(
        &self,
        class_id: Option<String>,
        files: Vec<FileDescriptor>,
    ) -> Result<Vec<UploadTarget>, StorageError>;
}

/// Step 2: sends bytes to a presigned target
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ObjectTransfer: Send + Sync {
    async fn put(
        &self,
        target: &UploadTarget,
        content_type: &str,
        body: Bytes,
    ) -> Result<(), StorageError>;
}

/// What the pipeline asks the document store to record
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentDraft {
    pub class_id: String,
    pub file_name: String,
    pub file_url: String,
}

/// Step 3: persists document metadata; the sink supplies id, timestamp and
/// uploader
#[cfg_attr(test, automock)]
#[async_trait]
pub trait MetadataSink: Send + Sync {
    async fn persist(&self, draft: DocumentDraft) -> Result<DocumentRecord, StoreError>;
}

/// A file to upload
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub file_name: String,
    pub content_type: String,
    pub body: Bytes,
}

impl UploadFile {
    pub fn new(file_name: &str, content_type: &str, body: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.to_string(),
            content_type: content_type.to_string(),
            body: body.into(),
        }
    }

    fn descriptor(&self) -> FileDescriptor {
        FileDescriptor::new(&self.file_name, &self.content_type)
    }
}

/// Pipeline step a file failed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureStage {
    Transfer,
    Persist,
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureStage::Transfer => f.write_str("transfer"),
            FailureStage::Persist => f.write_str("persist"),
        }
    }
}

/// One file's failure
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileFailure {
    pub file_name: String,
    pub stage: FailureStage,
    pub message: String,
    /// Set when the bytes reached storage but no record was written
    pub orphaned_url: Option<String>,
}

/// Upload pipeline errors
#[derive(Error, Debug)]
pub enum UploadError {
    #[error("No files to upload")]
    NoFiles,

    #[error("A class id is required")]
    MissingClass,

    #[error("Could not obtain upload targets: {0}")]
    Targets(#[source] StorageError),

    #[error("Expected {expected} upload targets, got {actual}")]
    TargetCountMismatch { expected: usize, actual: usize },

    #[error("{} of {total} files failed: {}", .failures.len(), summarize(.failures))]
    Failed {
        total: usize,
        failures: Vec<FileFailure>,
    },
}

fn summarize(failures: &[FileFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{} ({}): {}", f.file_name, f.stage, f.message))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Composes the three steps
pub struct UploadPipeline<I, T, S> {
    issuer: I,
    transfer: T,
    sink: S,
}

impl<I, T, S> UploadPipeline<I, T, S>
where
    I: UploadTargetIssuer,
    T: ObjectTransfer,
    S: MetadataSink,
{
    pub fn new(issuer: I, transfer: T, sink: S) -> Self {
        Self {
            issuer,
            transfer,
            sink,
        }
    }

    /// Upload `files` into `class_id` and record them
    ///
    /// Returns the persisted records in input order when every file made it
    /// through both steps.
    #[tracing::instrument(
        name = "upload.submit",
        skip(self, files),
        fields(class.id = %class_id, upload.files = files.len()),
        err
    )]
    pub async fn submit(
        &self,
        class_id: &str,
        files: Vec<UploadFile>,
    ) -> Result<Vec<DocumentRecord>, UploadError> {
        if files.is_empty() {
            return Err(UploadError::NoFiles);
        }
        if class_id.trim().is_empty() {
            return Err(UploadError::MissingClass);
        }

        let descriptors = files.iter().map(UploadFile::descriptor).collect();
        let targets = self
            .issuer
            .issue_targets(Some(class_id.to_string()), descriptors)
            .await
            .map_err(UploadError::Targets)?;

        if targets.len() != files.len() {
            return Err(UploadError::TargetCountMismatch {
                expected: files.len(),
                actual: targets.len(),
            });
        }

        let total = files.len();
        let outcomes = join_all(
            files
                .into_iter()
                .zip(targets)
                .map(|(file, target)| self.upload_one(class_id, file, target)),
        )
        .await;

        let mut records = Vec::with_capacity(total);
        let mut failures = Vec::new();
        for outcome in outcomes {
            match outcome {
                Ok(record) => records.push(record),
                Err(failure) => failures.push(failure),
            }
        }

        for failure in &failures {
            crate::metrics::record_pipeline_file(failure.stage.to_string().as_str());
        }
        for _ in &records {
            crate::metrics::record_pipeline_file("success");
        }

        if failures.is_empty() {
            info!(files = total, "Upload submission completed");
            Ok(records)
        } else {
            warn!(
                files = total,
                failed = failures.len(),
                "Upload submission failed"
            );
            Err(UploadError::Failed { total, failures })
        }
    }

    async fn upload_one(
        &self,
        class_id: &str,
        file: UploadFile,
        target: UploadTarget,
    ) -> Result<DocumentRecord, FileFailure> {
        if let Err(e) = self
            .transfer
            .put(&target, &file.content_type, file.body)
            .await
        {
            warn!(file = %file.file_name, error = %e, "Transfer to storage failed");
            return Err(FileFailure {
                file_name: file.file_name,
                stage: FailureStage::Transfer,
                message: e.to_string(),
                orphaned_url: None,
            });
        }

        let draft = DocumentDraft {
            class_id: class_id.to_string(),
            file_name: file.file_name.clone(),
            file_url: target.file_url.clone(),
        };

        self.sink.persist(draft).await.map_err(|e| {
            warn!(
                file = %file.file_name,
                file_url = %target.file_url,
                error = %e,
                "Stored file has no metadata record"
            );
            FileFailure {
                file_name: file.file_name,
                stage: FailureStage::Persist,
                message: e.to_string(),
                orphaned_url: Some(target.file_url),
            }
        })
    }
}
