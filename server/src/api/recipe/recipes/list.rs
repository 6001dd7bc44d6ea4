use super::RecipeResponse;
use crate::api::{ApiQuery, ErrorResponse};
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::scope::{OwnedResource, RECIPES};
use crate::store::RecipeFilter;
use crate::AppState;
use axum::{extract::State, Json};
use serde::Deserialize;
use utoipa::IntoParams;

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListRecipesQuery {
    /// Comma-separated tag ids; keeps recipes with any of them
    pub tags: Option<String>,
    /// Comma-separated ingredient ids; keeps recipes with any of them
    pub ingredients: Option<String>,
}

/// Parse `"1,2, 3"` into ids. Empty segments are ignored.
pub fn parse_ids(field: &str, value: Option<&str>) -> Result<Vec<i32>, ApiError> {
    let Some(value) = value else {
        return Ok(Vec::new());
    };
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<i32>()
                .map_err(|_| ApiError::field(field, format!("\"{}\" is not a valid id.", s)))
        })
        .collect()
}

#[utoipa::path(
    get,
    path = "/api/recipe/recipes",
    tag = "recipes",
    params(ListRecipesQuery),
    responses(
        (status = 200, description = "The requester's recipes, newest first", body = Vec<RecipeResponse>),
        (status = 400, description = "Invalid filter", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_recipes(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListRecipesQuery>,
) -> Result<Json<Vec<RecipeResponse>>, ApiError> {
    let filter = RecipeFilter {
        tag_ids: parse_ids("tags", query.tags.as_deref())?,
        ingredient_ids: parse_ids("ingredients", query.ingredients.as_deref())?,
    };
    let recipes = RECIPES.list(state.store.as_ref(), &user, &filter)?;
    Ok(Json(recipes.into_iter().map(RecipeResponse::from).collect()))
}
