//! JWT session tokens
//!
//! HS256 tokens carrying the [`Session`] claims. Issued at signup/login and
//! accepted from the session cookie or an `Authorization: Bearer` header.

use super::{AuthError, AuthRequest, Authenticator, Session};
use crate::config::AuthConfig;
use crate::store::User;
use async_trait::async_trait;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

/// JWT Authenticator
///
/// # Example
///
/// ```
/// use edulang_api::auth::jwt::JwtAuthenticator;
///
/// let auth = JwtAuthenticator::new_hs256("my-secret", 3600)
///     .with_cookie_name("auth-token");
/// ```
pub struct JwtAuthenticator {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl_secs: u64,
    cookie_name: String,
}

impl JwtAuthenticator {
    /// Create a new JWT authenticator with a shared secret (HS256)
    pub fn new_hs256(secret: &str, ttl_secs: u64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.validate_aud = false;

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl_secs,
            cookie_name: "auth-token".to_string(),
        }
    }

    /// Build from the `auth` configuration section
    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new_hs256(&config.jwt_secret, config.token_ttl_secs)
            .with_cookie_name(&config.cookie_name)
    }

    /// Set the name of the session cookie
    #[must_use]
    pub fn with_cookie_name(mut self, name: &str) -> Self {
        self.cookie_name = name.to_string();
        self
    }

    /// Name of the session cookie
    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    /// Issue a session token for a user
    pub fn issue(&self, user: &User) -> Result<String, AuthError> {
        let now = chrono::Utc::now().timestamp().max(0) as usize;
        let session = Session {
            user_id: user.user_id.clone(),
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role,
            tokens_available: user.tokens_available,
            iat: now,
            exp: now.saturating_add(usize::try_from(self.ttl_secs).unwrap_or(usize::MAX)),
        };

        encode(&Header::new(Algorithm::HS256), &session, &self.encoding_key)
            .map_err(|e| AuthError::SigningError(e.to_string()))
    }

    /// Verify a raw token and return its session
    pub fn verify(&self, token: &str) -> Result<Session, AuthError> {
        decode::<Session>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                jsonwebtoken::errors::ErrorKind::InvalidSignature => AuthError::InvalidSignature,
                _ => AuthError::InvalidToken(e.to_string()),
            })
    }

    /// Extract token from request, cookie first
    fn extract_token<'a>(&self, request: &'a AuthRequest) -> Option<&'a str> {
        request
            .cookie(&self.cookie_name)
            .filter(|t| !t.is_empty())
            .or_else(|| request.bearer_token())
    }
}

#[async_trait]
impl Authenticator for JwtAuthenticator {
    async fn authenticate(&self, request: &AuthRequest) -> Result<Session, AuthError> {
        let token = self.extract_token(request).ok_or(AuthError::MissingAuth)?;
        let session = self.verify(token)?;

        tracing::debug!(user_id = %session.user_id, "JWT authentication successful");
        Ok(session)
    }
}
