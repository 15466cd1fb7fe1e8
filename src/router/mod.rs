//! API Router
//!
//! Maps a request method and path onto an [`ApiRoute`].

use thiserror::Error;

/// Router errors
#[derive(Error, Debug, PartialEq)]
pub enum RouterError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Method not allowed: {method} {path}")]
    MethodNotAllowed { method: String, path: String },
}

/// API operations
#[derive(Debug, Clone, PartialEq)]
pub enum ApiRoute {
    /// GET /health
    Health,
    /// POST /api/auth/signup
    Signup,
    /// POST /api/auth/login
    Login,
    /// POST /api/auth/logout
    Logout,
    /// GET /api/auth/user
    CurrentUser,
    /// POST /api/class/create
    CreateClass,
    /// GET /api/class/fetch
    ProfessorClasses,
    /// GET /api/class/get-classes
    StudentClasses,
    /// POST /api/class/join-class
    JoinClass,
    /// GET /api/class/get-class-info/{classId}
    ClassInfo { class_id: String },
    /// POST /api/documents/upload-document
    UploadTargets,
    /// POST /api/documents/save-document
    SaveDocument,
    /// GET /api/documents/classes/{classId}
    ClassDocuments { class_id: String },
    /// POST /api/ai-documents/text-extraction
    TextExtraction,
    /// POST /api/ai-documents/translate
    Translate,
    /// POST /api/ai-documents/text-to-speech
    TextToSpeech,
}

impl ApiRoute {
    /// Label used for metrics; path parameters are not included
    pub fn name(&self) -> &'static str {
        match self {
            ApiRoute::Health => "health",
            ApiRoute::Signup => "signup",
            ApiRoute::Login => "login",
            ApiRoute::Logout => "logout",
            ApiRoute::CurrentUser => "current_user",
            ApiRoute::CreateClass => "create_class",
            ApiRoute::ProfessorClasses => "professor_classes",
            ApiRoute::StudentClasses => "student_classes",
            ApiRoute::JoinClass => "join_class",
            ApiRoute::ClassInfo { .. } => "class_info",
            ApiRoute::UploadTargets => "upload_targets",
            ApiRoute::SaveDocument => "save_document",
            ApiRoute::ClassDocuments { .. } => "class_documents",
            ApiRoute::TextExtraction => "text_extraction",
            ApiRoute::Translate => "translate",
            ApiRoute::TextToSpeech => "text_to_speech",
        }
    }
}

/// API Request Parser
pub struct ApiRequestParser;

impl ApiRequestParser {
    /// Parse an HTTP method and path (query string allowed) into a route
    pub fn parse(method: &str, path: &str) -> Result<ApiRoute, RouterError> {
        let path = path.split('?').next().unwrap_or_default();
        let segments: Vec<&str> = path
            .trim_matches('/')
            .split('/')
            .filter(|s| !s.is_empty())
            .collect();

        let (allowed, route) = match segments.as_slice() {
            ["health"] => ("GET", ApiRoute::Health),
            ["api", "auth", "signup"] => ("POST", ApiRoute::Signup),
            ["api", "auth", "login"] => ("POST", ApiRoute::Login),
            ["api", "auth", "logout"] => ("POST", ApiRoute::Logout),
            ["api", "auth", "user"] => ("GET", ApiRoute::CurrentUser),
            ["api", "class", "create"] => ("POST", ApiRoute::CreateClass),
            ["api", "class", "fetch"] => ("GET", ApiRoute::ProfessorClasses),
            ["api", "class", "get-classes"] => ("GET", ApiRoute::StudentClasses),
            ["api", "class", "join-class"] => ("POST", ApiRoute::JoinClass),
            ["api", "class", "get-class-info", class_id] => (
                "GET",
                ApiRoute::ClassInfo {
                    class_id: class_id.to_string(),
                },
            ),
            ["api", "documents", "upload-document"] => ("POST", ApiRoute::UploadTargets),
            ["api", "documents", "save-document"] => ("POST", ApiRoute::SaveDocument),
            ["api", "documents", "classes", class_id] => (
                "GET",
                ApiRoute::ClassDocuments {
                    class_id: class_id.to_string(),
                },
            ),
            ["api", "ai-documents", "text-extraction"] => ("POST", ApiRoute::TextExtraction),
            ["api", "ai-documents", "translate"] => ("POST", ApiRoute::Translate),
            ["api", "ai-documents", "text-to-speech"] => ("POST", ApiRoute::TextToSpeech),
            _ => return Err(RouterError::NotFound(path.to_string())),
        };

        // HEAD is served as GET without a body
        if method == allowed || (method == "HEAD" && allowed == "GET") {
            Ok(route)
        } else {
            Err(RouterError::MethodNotAllowed {
                method: method.to_string(),
                path: path.to_string(),
            })
        }
    }
}
