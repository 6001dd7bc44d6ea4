use super::RecipeDetailResponse;
use crate::api::{ApiPath, ErrorResponse};
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::scope::{OwnedResource, RECIPES};
use crate::AppState;
use axum::{extract::State, Json};

#[utoipa::path(
    get,
    path = "/api/recipe/recipes/{id}",
    tag = "recipes",
    params(
        ("id" = i32, Path, description = "Recipe ID")
    ),
    responses(
        (status = 200, description = "Recipe details", body = RecipeDetailResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Recipe not found", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_recipe(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
) -> Result<Json<RecipeDetailResponse>, ApiError> {
    let detail = RECIPES.retrieve(state.store.as_ref(), &user, id)?;
    Ok(Json(RecipeDetailResponse::from(detail)))
}
