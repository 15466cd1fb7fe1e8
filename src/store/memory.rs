//! In-memory store backed by `DashMap`

use super::{Class, DocumentRecord, Enrollment, Store, StoreError, User};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

/// In-memory [`Store`]
///
/// Secondary indexes (email, join code) are claimed through the entry API
/// before the primary record is written, so concurrent inserts cannot both
/// win the same key.
#[derive(Default)]
pub struct MemoryStore {
    users: DashMap<String, User>,
    emails: DashMap<String, String>,
    classes: DashMap<String, Class>,
    codes: DashMap<String, String>,
    enrollments: DashMap<(String, String), Enrollment>,
    documents: DashMap<String, DocumentRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn email_key(email: &str) -> String {
    email.trim().to_lowercase()
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_user(&self, user: User) -> Result<(), StoreError> {
        match self.emails.entry(email_key(&user.email)) {
            Entry::Occupied(_) => Err(StoreError::Conflict(format!(
                "email {} already registered",
                user.email
            ))),
            Entry::Vacant(slot) => {
                slot.insert(user.user_id.clone());
                self.users.insert(user.user_id.clone(), user);
                Ok(())
            }
        }
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let Some(user_id) = self.emails.get(&email_key(email)).map(|id| id.value().clone()) else {
            return Ok(None);
        };
        Ok(self.users.get(&user_id).map(|u| u.value().clone()))
    }

    async fn find_user_by_id(&self, user_id: &str) -> Result<Option<User>, StoreError> {
        Ok(self.users.get(user_id).map(|u| u.value().clone()))
    }

    async fn insert_class(&self, class: Class) -> Result<(), StoreError> {
        match self.codes.entry(class.code.clone()) {
            Entry::Occupied(_) => Err(StoreError::Conflict(format!(
                "class code {} already in use",
                class.code
            ))),
            Entry::Vacant(slot) => {
                slot.insert(class.class_id.clone());
                self.classes.insert(class.class_id.clone(), class);
                Ok(())
            }
        }
    }

    async fn find_class(&self, class_id: &str) -> Result<Option<Class>, StoreError> {
        Ok(self.classes.get(class_id).map(|c| c.value().clone()))
    }

    async fn find_class_by_code(&self, code: &str) -> Result<Option<Class>, StoreError> {
        let Some(class_id) = self.codes.get(code).map(|id| id.value().clone()) else {
            return Ok(None);
        };
        Ok(self.classes.get(&class_id).map(|c| c.value().clone()))
    }

    async fn classes_for_professor(&self, professor_id: &str) -> Result<Vec<Class>, StoreError> {
        let mut classes: Vec<Class> = self
            .classes
            .iter()
            .filter(|c| c.professor_id == professor_id)
            .map(|c| c.value().clone())
            .collect();
        classes.sort_by_key(|c| c.created_at);
        Ok(classes)
    }

    async fn insert_enrollment(&self, enrollment: Enrollment) -> Result<Enrollment, StoreError> {
        let key = (enrollment.class_id.clone(), enrollment.student_id.clone());
        let stored = self.enrollments.entry(key).or_insert(enrollment);
        Ok(stored.value().clone())
    }

    async fn enrollments_for_student(
        &self,
        student_id: &str,
    ) -> Result<Vec<Enrollment>, StoreError> {
        let mut enrollments: Vec<Enrollment> = self
            .enrollments
            .iter()
            .filter(|e| e.student_id == student_id)
            .map(|e| e.value().clone())
            .collect();
        enrollments.sort_by_key(|e| e.joined_at);
        Ok(enrollments)
    }

    async fn insert_document(&self, document: DocumentRecord) -> Result<(), StoreError> {
        self.documents
            .insert(document.document_id.clone(), document);
        Ok(())
    }

    async fn documents_for_class(&self, class_id: &str) -> Result<Vec<DocumentRecord>, StoreError> {
        let mut documents: Vec<DocumentRecord> = self
            .documents
            .iter()
            .filter(|d| d.class_id == class_id)
            .map(|d| d.value().clone())
            .collect();
        documents.sort_by_key(|d| d.created_at);
        Ok(documents)
    }
}
