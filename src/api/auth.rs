//! Signup, login, logout and session lookup

use super::{
    expired_cookie, json, present, require_session, session_cookie, with_cookie, ApiError,
    ApiRequest, ApiResponse, AppState,
};
use crate::auth::password::{hash_password, verify_password};
use crate::auth::Role;
use crate::store::{StoreError, User};
use hyper::StatusCode;
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info, warn};

#[derive(Deserialize)]
struct SignupBody {
    name: Option<String>,
    email: Option<String>,
    password: Option<String>,
    role: Option<String>,
}

#[derive(Deserialize)]
struct LoginBody {
    email: Option<String>,
    password: Option<String>,
}

fn internal(e: impl std::fmt::Display) -> ApiError {
    error!(error = %e, "Auth handler failed");
    crate::metrics::record_error("auth");
    ApiError::message(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

/// `POST /api/auth/signup`
pub async fn signup(state: &AppState, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
    if request.body_is_blank() {
        return Err(ApiError::message(
            StatusCode::BAD_REQUEST,
            "Request body is missing",
        ));
    }
    let body: SignupBody =
        request.json(&ApiError::message(StatusCode::BAD_REQUEST, "Invalid JSON body"))?;

    let (Some(name), Some(email), Some(password), Some(role)) = (
        present(&body.name),
        present(&body.email),
        body.password.as_deref().filter(|p| !p.is_empty()),
        present(&body.role),
    ) else {
        return Err(ApiError::message(
            StatusCode::BAD_REQUEST,
            "Missing required fields",
        ));
    };

    let role: Role = role
        .parse()
        .map_err(|_| ApiError::message(StatusCode::BAD_REQUEST, "Invalid role"))?;

    if state
        .store
        .find_user_by_email(email)
        .await
        .map_err(internal)?
        .is_some()
    {
        return Err(user_exists());
    }

    let user = User::new(
        name.to_string(),
        email.to_string(),
        hash_password(password).map_err(internal)?,
        role,
        state.config.auth.initial_tokens,
    );
    let token = state.authenticator.issue(&user).map_err(internal)?;

    match state.store.insert_user(user.clone()).await {
        Ok(()) => {}
        Err(StoreError::Conflict(_)) => return Err(user_exists()),
        Err(e) => return Err(internal(e)),
    }

    info!(user_id = %user.user_id, role = %user.role, "User signed up");

    let response = json(
        StatusCode::OK,
        &json!({
            "message": "User created successfully",
            "newUser": user,
            "token": token,
        }),
    );
    Ok(with_cookie(
        response,
        &session_cookie(&state.config.auth, &token),
    ))
}

fn user_exists() -> ApiError {
    ApiError::message(StatusCode::CONFLICT, "User already exists")
}

/// `POST /api/auth/login`
pub async fn login(state: &AppState, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
    if request.body_is_blank() {
        return Err(ApiError::message(StatusCode::BAD_REQUEST, "Missing body"));
    }
    let body: LoginBody =
        request.json(&ApiError::message(StatusCode::BAD_REQUEST, "Invalid JSON"))?;

    let (Some(email), Some(password)) = (
        present(&body.email),
        body.password.as_deref().filter(|p| !p.is_empty()),
    ) else {
        return Err(ApiError::message(
            StatusCode::BAD_REQUEST,
            "Email and password are required",
        ));
    };

    let invalid = || ApiError::message(StatusCode::UNAUTHORIZED, "Invalid email or password");

    let Some(user) = state
        .store
        .find_user_by_email(email)
        .await
        .map_err(internal)?
    else {
        warn!("Login for unknown email");
        crate::metrics::record_auth_attempt("password", false);
        return Err(invalid());
    };

    if !verify_password(password, &user.password_hash) {
        warn!(user_id = %user.user_id, "Login with wrong password");
        crate::metrics::record_auth_attempt("password", false);
        return Err(invalid());
    }
    crate::metrics::record_auth_attempt("password", true);

    let token = state.authenticator.issue(&user).map_err(internal)?;
    info!(user_id = %user.user_id, "User logged in");

    let response = json(
        StatusCode::OK,
        &json!({
            "message": "Login successful",
            "user": user,
            "token": token,
        }),
    );
    Ok(with_cookie(
        response,
        &session_cookie(&state.config.auth, &token),
    ))
}

/// `POST /api/auth/logout`
pub async fn logout(state: &AppState, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
    let cookie_name = state.authenticator.cookie_name();
    let has_session = request
        .auth_request()
        .cookie(cookie_name)
        .is_some_and(|token| !token.is_empty());

    if !has_session {
        return Ok(json(
            StatusCode::OK,
            &json!({ "message": "Already logged out" }),
        ));
    }

    let response = json(
        StatusCode::OK,
        &json!({ "message": "Logged out successfully" }),
    );
    Ok(with_cookie(response, &expired_cookie(&state.config.auth)))
}

/// `GET /api/auth/user`
pub async fn current_user(
    state: &AppState,
    request: &ApiRequest,
) -> Result<ApiResponse, ApiError> {
    let session = require_session(state, request)
        .await
        .map_err(ApiError::as_message)?;

    Ok(json(
        StatusCode::OK,
        &json!({
            "message": "User session retrieved",
            "session": session,
        }),
    ))
}
