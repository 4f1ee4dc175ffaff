//! JSON API handlers.

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use bazaar_core::{Email, UserId};

use crate::middleware::RequireAuth;
use crate::state::AppState;

/// Request for creating a profile row.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProfileRequest {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// Successful response.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct CreateProfileResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
}

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ApiError>)>;

fn api_error(status: StatusCode, message: impl Into<String>) -> (StatusCode, Json<ApiError>) {
    (
        status,
        Json(ApiError {
            error: message.into(),
        }),
    )
}

/// Validate the request, returning the target id and email.
fn parse_request(
    body: &CreateProfileRequest,
) -> Result<(UserId, Email), (StatusCode, Json<ApiError>)> {
    let (Some(user_id), Some(email)) = (
        body.user_id.as_deref().filter(|s| !s.trim().is_empty()),
        body.email.as_deref().filter(|s| !s.trim().is_empty()),
    ) else {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "User ID and email are required",
        ));
    };
    let user_id = user_id
        .trim()
        .parse::<UserId>()
        .map_err(|_| api_error(StatusCode::BAD_REQUEST, "Invalid user ID"))?;
    let email = Email::parse(email).map_err(|e| api_error(StatusCode::BAD_REQUEST, e.to_string()))?;
    Ok((user_id, email))
}

/// Create the profile row for the signed-in user if it does not exist yet.
///
/// Uses the privileged client because row-level security does not let a
/// brand-new user insert their own row.
///
/// # Errors
///
/// 400 when `userId` or `email` is missing or malformed, 403 when `userId` is
/// not the caller, 500 when the backend fails.
#[instrument(skip(state, user, body), fields(user_id = %user.id))]
pub async fn create_user_profile(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Json(body): Json<CreateProfileRequest>,
) -> ApiResult<CreateProfileResponse> {
    let (user_id, email) = parse_request(&body)?;
    if user_id != user.id {
        tracing::warn!(target_user = %user_id, "Refused profile creation for another user");
        return Err(api_error(
            StatusCode::FORBIDDEN,
            "Cannot create a profile for another user",
        ));
    }

    match state
        .backend()
        .privileged()
        .users()
        .ensure(user_id, body.name.as_deref(), &email)
        .await
    {
        Ok((_, true)) => Ok(Json(CreateProfileResponse {
            success: true,
            message: None,
        })),
        Ok((_, false)) => Ok(Json(CreateProfileResponse {
            success: true,
            message: Some("User already exists"),
        })),
        Err(e) => {
            tracing::error!(error = %e, "Failed to create user profile");
            Err(api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to create user profile",
            ))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_are_rejected() {
        let body = CreateProfileRequest {
            user_id: Some("2b9f5f0e-6a43-4c3f-9d5e-6a3f1f0c2a11".into()),
            ..CreateProfileRequest::default()
        };
        let (status, Json(error)) = parse_request(&body).unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error.error, "User ID and email are required");
    }

    #[test]
    fn test_camel_case_request() {
        let body: CreateProfileRequest = serde_json::from_str(
            r#"{"userId":"2b9f5f0e-6a43-4c3f-9d5e-6a3f1f0c2a11","email":"ada@example.com"}"#,
        )
        .unwrap();
        let (user_id, email) = parse_request(&body).unwrap();
        assert_eq!(user_id.to_string(), "2b9f5f0e-6a43-4c3f-9d5e-6a3f1f0c2a11");
        assert_eq!(email.as_str(), "ada@example.com");
    }

    #[test]
    fn test_bad_user_id_is_rejected() {
        let body = CreateProfileRequest {
            user_id: Some("not-a-uuid".into()),
            name: None,
            email: Some("ada@example.com".into()),
        };
        assert_eq!(parse_request(&body).unwrap_err().0, StatusCode::BAD_REQUEST);
    }
}
