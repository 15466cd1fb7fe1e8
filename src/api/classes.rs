//! Class management

use super::{json, present, require_session, ApiError, ApiRequest, ApiResponse, AppState};
use crate::auth::Role;
use crate::store::{Class, Enrollment, StoreError};
use hyper::StatusCode;
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info, warn};

#[derive(Deserialize)]
struct CreateClassBody {
    title: Option<String>,
    description: Option<String>,
    subject: Option<String>,
    code: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct JoinClassBody {
    class_code: Option<String>,
}

fn store_failure(context: &'static str) -> impl Fn(StoreError) -> ApiError {
    move |e| {
        error!(error = %e, "{}", context);
        crate::metrics::record_error("store");
        ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, context)
    }
}

/// `POST /api/class/create`
pub async fn create(state: &AppState, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
    let session = require_session(state, request).await?;
    if session.role != Role::Professor {
        warn!(user_id = %session.user_id, "Non-professor tried to create a class");
        return Err(ApiError::new(
            StatusCode::FORBIDDEN,
            "Only professors can create classes",
        ));
    }

    let body: CreateClassBody = request.json(&ApiError::bad_request("Invalid JSON body"))?;
    let (Some(title), Some(description), Some(subject), Some(code)) = (
        present(&body.title),
        present(&body.description),
        present(&body.subject),
        present(&body.code),
    ) else {
        return Err(ApiError::bad_request("Missing required fields"));
    };

    // The class carries the account's current name, not the one in the token
    let Some(professor) = state
        .store
        .find_user_by_id(&session.user_id)
        .await
        .map_err(store_failure("Failed to create class"))?
    else {
        warn!(user_id = %session.user_id, "Session for an unknown account");
        return Err(ApiError::unauthorized());
    };

    let class = Class::new(
        title.to_string(),
        description.to_string(),
        subject.to_string(),
        code.to_string(),
        professor.user_id,
        professor.name,
    );
    let class_id = class.class_id.clone();

    match state.store.insert_class(class).await {
        Ok(()) => {}
        Err(StoreError::Conflict(_)) => {
            return Err(ApiError::new(
                StatusCode::CONFLICT,
                "Class code already in use",
            ))
        }
        Err(e) => return Err(store_failure("Failed to create class")(e)),
    }

    info!(class_id = %class_id, professor_id = %session.user_id, "Class created");
    Ok(json(
        StatusCode::CREATED,
        &json!({
            "message": "Class created successfully",
            "classId": class_id,
        }),
    ))
}

/// `GET /api/class/fetch`: classes the caller teaches
pub async fn for_professor(
    state: &AppState,
    request: &ApiRequest,
) -> Result<ApiResponse, ApiError> {
    let session = require_session(state, request).await?;
    let classes = state
        .store
        .classes_for_professor(&session.user_id)
        .await
        .map_err(store_failure("Failed to fetch classes"))?;
    Ok(json(StatusCode::OK, &classes))
}

/// `GET /api/class/get-classes`: classes the caller joined
pub async fn for_student(
    state: &AppState,
    request: &ApiRequest,
) -> Result<ApiResponse, ApiError> {
    let session = require_session(state, request).await?;
    let enrollments = state
        .store
        .enrollments_for_student(&session.user_id)
        .await
        .map_err(store_failure("An error occurred while fetching classes."))?;
    Ok(json(StatusCode::OK, &enrollments))
}

/// `POST /api/class/join-class`
pub async fn join(state: &AppState, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
    let session = require_session(state, request).await?;

    let body: JoinClassBody = request.json(&ApiError::bad_request("Invalid JSON body"))?;
    let Some(code) = present(&body.class_code) else {
        return Err(ApiError::bad_request("Class code is required."));
    };

    let join_failed = store_failure("An error occurred while joining the class.");
    let Some(class) = state
        .store
        .find_class_by_code(code)
        .await
        .map_err(&join_failed)?
    else {
        return Err(ApiError::message(StatusCode::NOT_FOUND, "Class not found"));
    };

    state
        .store
        .insert_enrollment(Enrollment::new(&class, &session.user_id))
        .await
        .map_err(&join_failed)?;

    info!(class_id = %class.class_id, student_id = %session.user_id, "Student joined class");
    Ok(json(
        StatusCode::OK,
        &json!({ "message": "Successfully joined the class." }),
    ))
}

/// `GET /api/class/get-class-info/{classId}`
pub async fn info(state: &AppState, class_id: &str) -> Result<ApiResponse, ApiError> {
    match state
        .store
        .find_class(class_id)
        .await
        .map_err(store_failure("Server error"))?
    {
        Some(class) => Ok(json(StatusCode::OK, &class)),
        None => Err(ApiError::message(StatusCode::NOT_FOUND, "Class not found")),
    }
}
