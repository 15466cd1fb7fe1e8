//! Document store
//!
//! Records for users, classes, enrollments and document metadata, and the
//! [`Store`] trait the HTTP handlers persist them through.

use crate::auth::Role;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod memory;

pub use memory::MemoryStore;

/// Store errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Record rejected: {0}")]
    Rejected(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// User account
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub user_id: String,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub role: Role,
    pub tokens_available: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(
        name: String,
        email: String,
        password_hash: String,
        role: Role,
        tokens_available: u32,
    ) -> Self {
        let now = Utc::now();
        Self {
            user_id: uuid::Uuid::new_v4().to_string(),
            name,
            email,
            password_hash,
            role,
            tokens_available,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A class owned by a professor
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Class {
    pub class_id: String,
    pub title: String,
    pub description: String,
    pub subject: String,
    /// Join code handed to students
    pub code: String,
    pub professor_id: String,
    pub professor_name: String,
    pub created_at: DateTime<Utc>,
}

impl Class {
    pub fn new(
        title: String,
        description: String,
        subject: String,
        code: String,
        professor_id: String,
        professor_name: String,
    ) -> Self {
        Self {
            class_id: uuid::Uuid::new_v4().to_string(),
            title,
            description,
            subject,
            code,
            professor_id,
            professor_name,
            created_at: Utc::now(),
        }
    }
}

/// A student's membership in a class
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    pub class_id: String,
    pub student_id: String,
    pub professor_id: String,
    pub professor_name: String,
    pub title: String,
    pub joined_at: DateTime<Utc>,
}

impl Enrollment {
    pub fn new(class: &Class, student_id: &str) -> Self {
        Self {
            class_id: class.class_id.clone(),
            student_id: student_id.to_string(),
            professor_id: class.professor_id.clone(),
            professor_name: class.professor_name.clone(),
            title: class.title.clone(),
            joined_at: Utc::now(),
        }
    }
}

/// Metadata of an uploaded document; the bytes live in object storage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRecord {
    pub document_id: String,
    pub class_id: String,
    pub file_name: String,
    pub file_url: String,
    pub created_at: DateTime<Utc>,
    pub uploaded_by: String,
}

impl DocumentRecord {
    pub fn new(class_id: String, file_name: String, file_url: String, uploaded_by: String) -> Self {
        Self {
            document_id: uuid::Uuid::new_v4().to_string(),
            class_id,
            file_name,
            file_url,
            created_at: Utc::now(),
            uploaded_by,
        }
    }
}

/// Persistence backend
#[async_trait]
pub trait Store: Send + Sync {
    /// Insert a user; emails are unique, compared case-insensitively
    async fn insert_user(&self, user: User) -> Result<(), StoreError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn find_user_by_id(&self, user_id: &str) -> Result<Option<User>, StoreError>;

    /// Insert a class; join codes are unique
    async fn insert_class(&self, class: Class) -> Result<(), StoreError>;

    async fn find_class(&self, class_id: &str) -> Result<Option<Class>, StoreError>;

    async fn find_class_by_code(&self, code: &str) -> Result<Option<Class>, StoreError>;

    async fn classes_for_professor(&self, professor_id: &str) -> Result<Vec<Class>, StoreError>;

    /// Record an enrollment; joining the same class twice keeps the first record
    async fn insert_enrollment(&self, enrollment: Enrollment) -> Result<Enrollment, StoreError>;

    async fn enrollments_for_student(&self, student_id: &str)
        -> Result<Vec<Enrollment>, StoreError>;

    async fn insert_document(&self, document: DocumentRecord) -> Result<(), StoreError>;

    /// Documents of a class, oldest first
    async fn documents_for_class(&self, class_id: &str) -> Result<Vec<DocumentRecord>, StoreError>;
}
