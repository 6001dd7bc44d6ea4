use super::attributes::{self, AttributeResponse, CreateAttributeRequest, ListAttributesQuery};
use crate::api::{ApiJson, ApiPath, ApiQuery, ErrorResponse};
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::scope::INGREDIENTS;
use crate::AppState;
use axum::{extract::State, response::IntoResponse, Json};

#[utoipa::path(
    get,
    path = "/api/recipe/ingredients",
    tag = "ingredients",
    params(ListAttributesQuery),
    responses(
        (status = 200, description = "The requester's ingredients, name descending", body = Vec<AttributeResponse>),
        (status = 400, description = "Invalid query", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_ingredients(
    user: AuthUser,
    state: State<AppState>,
    query: ApiQuery<ListAttributesQuery>,
) -> Result<Json<Vec<AttributeResponse>>, ApiError> {
    attributes::list(INGREDIENTS, user, state, query).await
}

#[utoipa::path(
    post,
    path = "/api/recipe/ingredients",
    tag = "ingredients",
    request_body = CreateAttributeRequest,
    responses(
        (status = 201, description = "Ingredient created", body = AttributeResponse),
        (status = 400, description = "Missing or blank name", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create_ingredient(
    user: AuthUser,
    state: State<AppState>,
    ApiJson(request): ApiJson<CreateAttributeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    attributes::create(INGREDIENTS, user, state, request).await
}

#[utoipa::path(
    get,
    path = "/api/recipe/ingredients/{id}",
    tag = "ingredients",
    params(
        ("id" = i32, Path, description = "Ingredient ID")
    ),
    responses(
        (status = 200, description = "Ingredient details", body = AttributeResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Ingredient not found", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_ingredient(
    user: AuthUser,
    state: State<AppState>,
    id: ApiPath<i32>,
) -> Result<Json<AttributeResponse>, ApiError> {
    attributes::get(INGREDIENTS, user, state, id).await
}
