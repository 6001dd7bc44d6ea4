//! `/api/recipe`: tags, ingredients and recipes, all scoped to the requester.

pub mod attributes;
pub mod ingredients;
pub mod recipes;
pub mod tags;

use crate::AppState;
use axum::routing::{get, post};
use axum::Router;
use utoipa::OpenApi;

/// Returns the router for /api/recipe endpoints (mounted at /api/recipe)
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/tags", get(tags::list_tags).post(tags::create_tag))
        .route("/tags/{id}", get(tags::get_tag))
        .route(
            "/ingredients",
            get(ingredients::list_ingredients).post(ingredients::create_ingredient),
        )
        .route("/ingredients/{id}", get(ingredients::get_ingredient))
        .route(
            "/recipes",
            get(recipes::list::list_recipes).post(recipes::create::create_recipe),
        )
        .route("/recipes/{id}", get(recipes::get::get_recipe))
        .route("/recipes/{id}/attach", post(recipes::attach::attach_to_recipe))
}

#[derive(OpenApi)]
#[openapi(
    paths(
        tags::list_tags,
        tags::create_tag,
        tags::get_tag,
        ingredients::list_ingredients,
        ingredients::create_ingredient,
        ingredients::get_ingredient,
        recipes::list::list_recipes,
        recipes::create::create_recipe,
        recipes::get::get_recipe,
        recipes::attach::attach_to_recipe,
    ),
    components(schemas(
        attributes::AttributeResponse,
        attributes::CreateAttributeRequest,
        recipes::RecipeResponse,
        recipes::RecipeDetailResponse,
        recipes::create::CreateRecipeRequest,
        recipes::attach::AttachRequest,
    ))
)]
pub struct ApiDoc;
