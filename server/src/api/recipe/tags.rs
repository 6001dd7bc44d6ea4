use super::attributes::{self, AttributeResponse, CreateAttributeRequest, ListAttributesQuery};
use crate::api::{ApiJson, ApiPath, ApiQuery, ErrorResponse};
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::scope::TAGS;
use crate::AppState;
use axum::{extract::State, response::IntoResponse, Json};

#[utoipa::path(
    get,
    path = "/api/recipe/tags",
    tag = "tags",
    params(ListAttributesQuery),
    responses(
        (status = 200, description = "The requester's tags, name descending", body = Vec<AttributeResponse>),
        (status = 400, description = "Invalid query", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_tags(
    user: AuthUser,
    state: State<AppState>,
    query: ApiQuery<ListAttributesQuery>,
) -> Result<Json<Vec<AttributeResponse>>, ApiError> {
    attributes::list(TAGS, user, state, query).await
}

#[utoipa::path(
    post,
    path = "/api/recipe/tags",
    tag = "tags",
    request_body = CreateAttributeRequest,
    responses(
        (status = 201, description = "Tag created", body = AttributeResponse),
        (status = 400, description = "Missing or blank name", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create_tag(
    user: AuthUser,
    state: State<AppState>,
    ApiJson(request): ApiJson<CreateAttributeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    attributes::create(TAGS, user, state, request).await
}

#[utoipa::path(
    get,
    path = "/api/recipe/tags/{id}",
    tag = "tags",
    params(
        ("id" = i32, Path, description = "Tag ID")
    ),
    responses(
        (status = 200, description = "Tag details", body = AttributeResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Tag not found", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_tag(
    user: AuthUser,
    state: State<AppState>,
    id: ApiPath<i32>,
) -> Result<Json<AttributeResponse>, ApiError> {
    attributes::get(TAGS, user, state, id).await
}
