//! S3 presigned upload targets
//!
//! Issues one time-limited `PutObject` URL per file so clients can send
//! document bytes straight to the bucket, and computes the permanent URL the
//! document metadata record points at.
//!
//! # Example
//!
//! ```no_run
//! use edulang_api::config::StorageConfig;
//! use edulang_api::s3::{FileDescriptor, S3Presigner};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = StorageConfig {
//!     bucket: "edulang-docs".to_string(),
//!     region: "us-east-1".to_string(),
//!     endpoint: None,
//!     access_key: None,
//!     secret_key: None,
//!     presign_expiry_secs: 3600,
//!     public_read: true,
//! };
//!
//! let presigner = S3Presigner::new(&config).await;
//! let file = FileDescriptor::new("syllabus.pdf", "application/pdf");
//! let target = presigner.presign("class-1", &file).await?;
//! println!("PUT to {}", target.upload_url);
//! # Ok(())
//! # }
//! ```

use crate::config::StorageConfig;
use crate::upload::UploadTargetIssuer;
use async_trait::async_trait;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::types::ObjectCannedAcl;
use futures::future::try_join_all;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Class prefix used when an upload names no class
pub const DEFAULT_CLASS_PREFIX: &str = "general";

/// Characters left alone by JavaScript's `encodeURIComponent`; file URLs
/// already stored by the dashboards use this encoding.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Invalid file: {0}")]
    InvalidFile(String),

    #[error("Could not process file: {file_name}")]
    Presign { file_name: String, message: String },

    #[error("Request error: {0}")]
    RequestError(String),

    #[error("Storage rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },
}

/// A file to be uploaded, described by name and MIME type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDescriptor {
    pub file_name: String,
    pub content_type: String,
}

impl FileDescriptor {
    pub fn new(file_name: &str, content_type: &str) -> Self {
        Self {
            file_name: file_name.to_string(),
            content_type: content_type.to_string(),
        }
    }

    fn validate(&self) -> Result<(), StorageError> {
        if self.file_name.trim().is_empty() || self.content_type.trim().is_empty() {
            return Err(StorageError::InvalidFile(self.file_name.clone()));
        }
        Ok(())
    }
}

/// Presigned upload target for one file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadTarget {
    /// Time-limited URL accepting a single PUT
    pub upload_url: String,
    /// Where the object is readable once uploaded
    pub file_url: String,
}

/// File extension derived from a MIME type's subtype, `bin` when absent
pub fn extension_for(content_type: &str) -> &str {
    content_type
        .split(';')
        .next()
        .and_then(|essence| essence.split('/').nth(1))
        .map(str::trim)
        .filter(|sub| !sub.is_empty())
        .unwrap_or("bin")
}

/// Object key: `<class>/<file name>-<unix millis>.<ext>`
pub fn object_key(class_id: &str, file: &FileDescriptor, unix_millis: i64) -> String {
    format!(
        "{}/{}-{}.{}",
        class_id,
        file.file_name,
        unix_millis,
        extension_for(&file.content_type)
    )
}

/// Permanent URL of an object
///
/// Virtual-hosted AWS style by default, path style under a custom endpoint.
/// The whole key is encoded as one component, slashes included.
pub fn file_url(config: &StorageConfig, key: &str) -> String {
    let encoded = utf8_percent_encode(key, URI_COMPONENT);
    match config.endpoint {
        Some(ref endpoint) => format!(
            "{}/{}/{}",
            endpoint.trim_end_matches('/'),
            config.bucket,
            encoded
        ),
        None => format!(
            "https://{}.s3.{}.amazonaws.com/{}",
            config.bucket, config.region, encoded
        ),
    }
}

/// Issues presigned `PutObject` URLs with the AWS SDK
pub struct S3Presigner {
    client: aws_sdk_s3::Client,
    config: StorageConfig,
}

impl S3Presigner {
    /// Create a presigner
    ///
    /// Static credentials from the configuration take precedence; otherwise
    /// the default AWS provider chain (environment, profile, instance role)
    /// is used.
    pub async fn new(config: &StorageConfig) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(config.region.clone()));

        if let (Some(access_key), Some(secret_key)) = (&config.access_key, &config.secret_key) {
            loader = loader.credentials_provider(Credentials::new(
                access_key.clone(),
                secret_key.clone(),
                None,
                None,
                "edulang-config",
            ));
        }

        let shared = loader.load().await;
        let mut s3_config = aws_sdk_s3::config::Builder::from(&shared);
        if let Some(ref endpoint) = config.endpoint {
            s3_config = s3_config.endpoint_url(endpoint.clone()).force_path_style(true);
        }

        Self {
            client: aws_sdk_s3::Client::from_conf(s3_config.build()),
            config: config.clone(),
        }
    }

    /// Presign an upload of one file into a class prefix
    #[tracing::instrument(
        name = "s3.presign_put_object",
        skip(self, file),
        fields(
            s3.bucket = %self.config.bucket,
            file.name = %file.file_name,
            file.content_type = %file.content_type,
            s3.key = tracing::field::Empty
        ),
        err
    )]
    pub async fn presign(
        &self,
        class_id: &str,
        file: &FileDescriptor,
    ) -> Result<UploadTarget, StorageError> {
        file.validate()?;

        let key = object_key(class_id, file, chrono::Utc::now().timestamp_millis());
        tracing::Span::current().record("s3.key", key.as_str());

        let presign_failed = |message: String| StorageError::Presign {
            file_name: file.file_name.clone(),
            message,
        };

        let presigning =
            PresigningConfig::expires_in(Duration::from_secs(self.config.presign_expiry_secs))
                .map_err(|e| presign_failed(e.to_string()))?;

        let mut request = self
            .client
            .put_object()
            .bucket(&self.config.bucket)
            .key(&key)
            .content_type(&file.content_type);
        if self.config.public_read {
            request = request.acl(ObjectCannedAcl::PublicRead);
        }

        let presigned = request
            .presigned(presigning)
            .await
            .map_err(|e| presign_failed(e.to_string()))?;

        let target = UploadTarget {
            upload_url: presigned.uri().to_string(),
            file_url: file_url(&self.config, &key),
        };

        tracing::debug!(file_url = %target.file_url, "Presigned upload target issued");
        crate::metrics::record_upload_target_issued();

        Ok(target)
    }
}

#[async_trait]
impl UploadTargetIssuer for S3Presigner {
    /// Presign every file concurrently; the first failure fails the batch
    async fn issue_targets(
        &self,
        class_id: Option<String>,
        files: Vec<FileDescriptor>,
    ) -> Result<Vec<UploadTarget>, StorageError> {
        let prefix = class_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
            .unwrap_or(DEFAULT_CLASS_PREFIX);

        try_join_all(files.iter().map(|file| self.presign(prefix, file))).await
    }
}
