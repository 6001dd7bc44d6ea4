use crate::api::{ApiJson, ErrorResponse};
use crate::auth::issue_token;
use crate::error::ApiError;
use crate::AppState;
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct TokenRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TokenResponse {
    pub token: String,
}

#[utoipa::path(
    post,
    path = "/api/user/token",
    tag = "user",
    request_body(content = TokenRequest, example = json!({"email": "cook@example.com", "password": "secret"})),
    responses(
        (status = 200, description = "Token issued", body = TokenResponse),
        (status = 400, description = "Missing fields or invalid credentials", body = ErrorResponse)
    )
)]
pub async fn create_token(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<TokenRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let token = issue_token(
        state.store.as_ref(),
        req.email.as_deref(),
        req.password.as_deref(),
        state.token_ttl,
    )?;
    Ok(Json(TokenResponse { token }))
}
