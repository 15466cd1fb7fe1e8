//! API handlers
//!
//! Each route handler takes the shared [`AppState`] and a fully read
//! [`ApiRequest`] and produces a JSON response. Failures are [`ApiError`]s,
//! rendered as `{"error": ...}` or `{"message": ...}` depending on the route.

use crate::ai::AiClient;
use crate::auth::jwt::JwtAuthenticator;
use crate::auth::{AuthRequest, Authenticator, Session};
use crate::config::{AuthConfig, Config};
use crate::router::{ApiRequestParser, ApiRoute, RouterError};
use crate::store::Store;
use crate::upload::UploadTargetIssuer;
use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{HeaderValue, CONTENT_TYPE, SET_COOKIE, WWW_AUTHENTICATE};
use hyper::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{error, warn};

pub mod ai;
pub mod auth;
pub mod classes;
pub mod documents;

pub type ApiResponse = Response<Full<Bytes>>;

/// State shared by every connection
pub struct AppState {
    pub config: Config,
    pub authenticator: JwtAuthenticator,
    pub store: Arc<dyn Store>,
    pub issuer: Arc<dyn UploadTargetIssuer>,
    pub ai: AiClient,
}

/// A request with its body already read
#[derive(Debug, Default)]
pub struct ApiRequest {
    pub method: String,
    pub path: String,
    /// Header names are lowercase
    pub headers: HashMap<String, String>,
    pub body: Bytes,
}

impl ApiRequest {
    pub fn new(method: &str, path: &str) -> Self {
        Self {
            method: method.to_string(),
            path: path.to_string(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers
            .insert(name.to_ascii_lowercase(), value.to_string());
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    fn auth_request(&self) -> AuthRequest {
        AuthRequest {
            headers: self.headers.clone(),
        }
    }

    fn body_is_blank(&self) -> bool {
        self.body.iter().all(u8::is_ascii_whitespace)
    }

    /// Decode the JSON body; `invalid` becomes the 400 error text
    fn json<T: DeserializeOwned>(&self, invalid: &ApiError) -> Result<T, ApiError> {
        serde_json::from_slice(&self.body).map_err(|e| {
            warn!(path = %self.path, error = %e, "Rejected request body");
            invalid.clone()
        })
    }
}

/// Body key an error is reported under
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ErrorKey {
    Error,
    Message,
}

/// Handler failure, rendered as a JSON body
#[derive(Error, Debug, Clone)]
#[error("{status}: {text}")]
pub struct ApiError {
    status: StatusCode,
    key: ErrorKey,
    text: String,
    challenge: bool,
}

impl ApiError {
    /// `{"error": text}`
    pub fn new(status: StatusCode, text: impl Into<String>) -> Self {
        Self {
            status,
            key: ErrorKey::Error,
            text: text.into(),
            challenge: false,
        }
    }

    /// `{"message": text}`
    pub fn message(status: StatusCode, text: impl Into<String>) -> Self {
        Self {
            key: ErrorKey::Message,
            ..Self::new(status, text)
        }
    }

    pub fn bad_request(text: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, text)
    }

    /// 401 with a `WWW-Authenticate: Bearer` challenge
    pub fn unauthorized() -> Self {
        Self {
            challenge: true,
            ..Self::new(StatusCode::UNAUTHORIZED, "Unauthorized")
        }
    }

    /// Report under `message` instead of `error`
    #[must_use]
    pub fn as_message(mut self) -> Self {
        self.key = ErrorKey::Message;
        self
    }

    pub fn into_response(self) -> ApiResponse {
        let key = match self.key {
            ErrorKey::Error => "error",
            ErrorKey::Message => "message",
        };
        let mut body = serde_json::Map::new();
        body.insert(key.to_string(), serde_json::Value::String(self.text));
        let mut response = json(self.status, &body);
        if self.challenge {
            response
                .headers_mut()
                .insert(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

/// JSON response with `status`
pub fn json<T: Serialize + ?Sized>(status: StatusCode, value: &T) -> ApiResponse {
    match serde_json::to_vec(value) {
        Ok(body) => {
            let mut response = Response::new(Full::new(Bytes::from(body)));
            *response.status_mut() = status;
            response
                .headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            response
        }
        Err(e) => {
            error!(error = %e, "Failed to encode response body");
            let mut response = Response::new(Full::new(Bytes::from_static(
                br#"{"error":"Internal server error"}"#,
            )));
            *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
            response
        }
    }
}

/// Attach a `Set-Cookie` header
pub fn with_cookie(mut response: ApiResponse, cookie: &str) -> ApiResponse {
    match HeaderValue::from_str(cookie) {
        Ok(value) => {
            response.headers_mut().append(SET_COOKIE, value);
        }
        Err(e) => error!(error = %e, "Session cookie is not a valid header value"),
    }
    response
}

/// `Set-Cookie` value carrying a session token
pub fn session_cookie(config: &AuthConfig, token: &str) -> String {
    cookie(config, token, config.cookie_max_age_secs)
}

/// `Set-Cookie` value that clears the session cookie
pub fn expired_cookie(config: &AuthConfig) -> String {
    cookie(config, "", 0)
}

fn cookie(config: &AuthConfig, value: &str, max_age: u64) -> String {
    let mut cookie = format!(
        "{}={}; HttpOnly; SameSite=Strict; Path=/; Max-Age={}",
        config.cookie_name, value, max_age
    );
    if config.secure_cookies {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Authenticate the caller or fail with 401
pub(crate) async fn require_session(
    state: &AppState,
    request: &ApiRequest,
) -> Result<Session, ApiError> {
    match state
        .authenticator
        .authenticate(&request.auth_request())
        .await
    {
        Ok(session) => {
            crate::metrics::record_auth_attempt("jwt", true);
            Ok(session)
        }
        Err(e) => {
            warn!(path = %request.path, error = %e, "Authentication failed");
            crate::metrics::record_auth_attempt("jwt", false);
            Err(ApiError::unauthorized())
        }
    }
}

/// Route and handle one request
pub async fn handle(state: &AppState, request: ApiRequest) -> ApiResponse {
    let started = Instant::now();

    let (route_name, mut response) = match ApiRequestParser::parse(&request.method, &request.path)
    {
        Ok(route) => {
            let name = route.name();
            let result = dispatch(state, route, &request).await;
            (name, result.unwrap_or_else(ApiError::into_response))
        }
        Err(RouterError::NotFound(_)) => (
            "unmatched",
            ApiError::new(StatusCode::NOT_FOUND, "Not Found").into_response(),
        ),
        Err(RouterError::MethodNotAllowed { .. }) => (
            "unmatched",
            ApiError::new(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed").into_response(),
        ),
    };

    if request.method == "HEAD" {
        *response.body_mut() = Full::new(Bytes::new());
    }

    crate::metrics::record_http_request(
        route_name,
        response.status().as_u16(),
        started.elapsed().as_secs_f64(),
    );
    response
}

async fn dispatch(
    state: &AppState,
    route: ApiRoute,
    request: &ApiRequest,
) -> Result<ApiResponse, ApiError> {
    match route {
        ApiRoute::Health => Ok(health()),
        ApiRoute::Signup => auth::signup(state, request).await,
        ApiRoute::Login => auth::login(state, request).await,
        ApiRoute::Logout => auth::logout(state, request).await,
        ApiRoute::CurrentUser => auth::current_user(state, request).await,
        ApiRoute::CreateClass => classes::create(state, request).await,
        ApiRoute::ProfessorClasses => classes::for_professor(state, request).await,
        ApiRoute::StudentClasses => classes::for_student(state, request).await,
        ApiRoute::JoinClass => classes::join(state, request).await,
        ApiRoute::ClassInfo { class_id } => classes::info(state, &class_id).await,
        ApiRoute::UploadTargets => documents::upload_targets(state, request).await,
        ApiRoute::SaveDocument => documents::save(state, request).await,
        ApiRoute::ClassDocuments { class_id } => {
            documents::for_class(state, request, &class_id).await
        }
        ApiRoute::TextExtraction => ai::text_extraction(state, request).await,
        ApiRoute::Translate => ai::translate(state, request).await,
        ApiRoute::TextToSpeech => ai::text_to_speech(state, request).await,
    }
}

fn health() -> ApiResponse {
    let mut response = Response::new(Full::new(Bytes::from_static(b"ok")));
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
    response
}

/// Non-empty value of an optional string field
fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
