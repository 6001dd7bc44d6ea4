use super::UserResponse;
use crate::api::{ApiJson, ErrorResponse};
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::users::{update_profile, ProfileUpdate};
use crate::AppState;
use axum::{extract::State, Json};
use serde::Deserialize;
use utoipa::ToSchema;

/// Partial profile update; absent fields are left unchanged
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateMeRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/user/me",
    tag = "user",
    responses(
        (status = 200, description = "The authenticated user", body = UserResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_me(AuthUser(user): AuthUser) -> Json<UserResponse> {
    Json(UserResponse::from(user))
}

#[utoipa::path(
    patch,
    path = "/api/user/me",
    tag = "user",
    request_body = UpdateMeRequest,
    responses(
        (status = 200, description = "Profile updated", body = UserResponse),
        (status = 400, description = "Invalid field values", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_me(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    ApiJson(req): ApiJson<UpdateMeRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = update_profile(
        state.store.as_ref(),
        &user,
        ProfileUpdate {
            name: req.name,
            email: req.email,
            password: req.password,
        },
    )?;
    Ok(Json(UserResponse::from(user)))
}
