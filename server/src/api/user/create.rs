use super::UserResponse;
use crate::api::{ApiJson, ErrorResponse};
use crate::error::{ApiError, FieldErrors};
use crate::users::{
    self, normalize_email, validate_display_name, validate_email, validate_password, ExtraFields,
};
use crate::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Deserialize;
use utoipa::ToSchema;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateUserRequest {
    pub email: Option<String>,
    /// At least 5 characters
    pub password: Option<String>,
    pub name: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/user/create",
    tag = "user",
    request_body(content = CreateUserRequest, example = json!({"email": "cook@example.com", "password": "secret", "name": "Cook"})),
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 400, description = "Missing email, short password or email already taken", body = ErrorResponse)
    )
)]
pub async fn create_user(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CreateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let mut errors = FieldErrors::new();
    match req.email.as_deref().map(str::trim) {
        None | Some("") => errors.add("email", "This field is required."),
        Some(email) => validate_email(&normalize_email(email), &mut errors),
    }
    if let Some(name) = req.name.as_deref() {
        validate_display_name(name.trim(), &mut errors);
    }
    match req.password.as_deref() {
        None | Some("") => errors.add("password", "This field is required."),
        Some(password) => validate_password(password, &mut errors),
    }
    errors.into_result()?;

    let user = users::create_user(
        state.store.as_ref(),
        req.email.as_deref(),
        req.password.as_deref(),
        ExtraFields {
            name: req.name.map(|n| n.trim().to_string()),
            ..Default::default()
        },
    )?;

    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}
