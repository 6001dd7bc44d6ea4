use super::RecipeDetailResponse;
use crate::api::{ApiJson, ApiPath, ErrorResponse};
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::scope::RECIPES;
use crate::AppState;
use axum::{extract::State, Json};
use serde::Deserialize;
use utoipa::ToSchema;

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct AttachRequest {
    #[serde(default)]
    pub tags: Vec<i32>,
    #[serde(default)]
    pub ingredients: Vec<i32>,
}

#[utoipa::path(
    post,
    path = "/api/recipe/recipes/{id}/attach",
    tag = "recipes",
    params(
        ("id" = i32, Path, description = "Recipe ID")
    ),
    request_body = AttachRequest,
    responses(
        (status = 200, description = "Recipe with its updated associations", body = RecipeDetailResponse),
        (status = 400, description = "Unknown tag/ingredient ids", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Recipe not found", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn attach_to_recipe(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
    ApiJson(req): ApiJson<AttachRequest>,
) -> Result<Json<RecipeDetailResponse>, ApiError> {
    let detail = RECIPES.attach(
        state.store.as_ref(),
        &user,
        id,
        &req.tags,
        &req.ingredients,
    )?;
    Ok(Json(RecipeDetailResponse::from(detail)))
}
