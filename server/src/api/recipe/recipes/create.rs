use super::RecipeResponse;
use crate::api::{ApiJson, ErrorResponse};
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::scope::{OwnedResource, RecipeDraft, RECIPES};
use crate::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Deserialize;
use utoipa::ToSchema;

/// Prices arrive either as a JSON number or as a decimal string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PriceInput {
    Number(serde_json::Number),
    Text(String),
}

impl PriceInput {
    fn into_text(self) -> String {
        match self {
            PriceInput::Number(n) => n.to_string(),
            PriceInput::Text(s) => s,
        }
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateRecipeRequest {
    pub title: Option<String>,
    pub time_minutes: Option<i64>,
    /// Non-negative, at most two decimal places, below 1000
    #[schema(value_type = Option<String>, example = "5.50")]
    pub price: Option<PriceInput>,
    /// Ids of the requester's tags
    #[serde(default)]
    pub tags: Vec<i32>,
    /// Ids of the requester's ingredients
    #[serde(default)]
    pub ingredients: Vec<i32>,
}

#[utoipa::path(
    post,
    path = "/api/recipe/recipes",
    tag = "recipes",
    request_body(content = CreateRecipeRequest, example = json!({"title": "Pancakes", "time_minutes": 20, "price": "4.50", "tags": [1], "ingredients": [2, 3]})),
    responses(
        (status = 201, description = "Recipe created", body = RecipeResponse),
        (status = 400, description = "Invalid fields or unknown tag/ingredient ids", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create_recipe(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CreateRecipeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let summary = RECIPES.create(
        state.store.as_ref(),
        &user,
        RecipeDraft {
            title: req.title,
            time_minutes: req.time_minutes,
            price: req.price.map(PriceInput::into_text),
            tags: req.tags,
            ingredients: req.ingredients,
        },
    )?;

    Ok((StatusCode::CREATED, Json(RecipeResponse::from(summary))))
}
