//! Authentication module
//!
//! Provides password hashing and JWT session tokens.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub mod jwt;
pub mod password;

/// Authentication errors
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Missing authentication")]
    MissingAuth,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Token signing failed: {0}")]
    SigningError(String),

    #[error("Password hashing failed: {0}")]
    HashError(String),

    #[error("Unknown role: {0}")]
    UnknownRole(String),
}

/// Account role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Professor,
    Student,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Professor => "professor",
            Role::Student => "student",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "professor" => Ok(Role::Professor),
            "student" => Ok(Role::Student),
            other => Err(AuthError::UnknownRole(other.to_string())),
        }
    }
}

/// Authenticated session
///
/// Doubles as the JWT claim set, so the wire names are the ones the
/// dashboards read from `/api/auth/user`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user_id: String,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub tokens_available: u32,
    pub iat: usize,
    pub exp: usize,
}

/// Authenticator trait
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Authenticate a request
    async fn authenticate(&self, request: &AuthRequest) -> Result<Session, AuthError>;
}

/// Authentication request context
#[derive(Debug, Default)]
pub struct AuthRequest {
    /// Header names are lowercase
    pub headers: HashMap<String, String>,
}

impl AuthRequest {
    /// Value of a cookie from the `Cookie` header
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.headers.get("cookie")?.split(';').find_map(|pair| {
            let (key, value) = pair.trim().split_once('=')?;
            (key == name).then_some(value)
        })
    }

    /// Bearer token from the `Authorization` header
    pub fn bearer_token(&self) -> Option<&str> {
        self.headers
            .get("authorization")?
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_with(header: &str, value: &str) -> AuthRequest {
        let mut headers = HashMap::new();
        headers.insert(header.to_string(), value.to_string());
        AuthRequest { headers }
    }

    #[test]
    fn test_cookie_lookup() {
        let request = request_with("cookie", "theme=dark; auth-token=abc.def.ghi; lang=en");
        assert_eq!(request.cookie("auth-token"), Some("abc.def.ghi"));
        assert_eq!(request.cookie("missing"), None);
    }

    #[test]
    fn test_bearer_token() {
        let request = request_with("authorization", "Bearer tok");
        assert_eq!(request.bearer_token(), Some("tok"));

        let request = request_with("authorization", "Basic dXNlcg==");
        assert_eq!(request.bearer_token(), None);
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!("professor".parse::<Role>().unwrap(), Role::Professor);
        assert_eq!("student".parse::<Role>().unwrap(), Role::Student);
        assert!("admin".parse::<Role>().is_err());
        assert!("Professor".parse::<Role>().is_err());
        assert!("STUDENT".parse::<Role>().is_err());
    }

    #[test]
    fn test_session_wire_names() {
        let session = Session {
            user_id: "u1".into(),
            email: "ada@example.edu".into(),
            name: "Ada".into(),
            role: Role::Professor,
            tokens_available: 1000,
            iat: 1,
            exp: 2,
        };
        let json = serde_json::to_value(&session).unwrap();
        assert_eq!(json["userId"], "u1");
        assert_eq!(json["tokensAvailable"], 1000);
        assert_eq!(json["role"], "professor");
    }
}
