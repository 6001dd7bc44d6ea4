pub mod attach;
pub mod create;
pub mod get;
pub mod list;

use super::attributes::AttributeResponse;
use crate::models::{RecipeDetail, RecipeSummary};
use serde::Serialize;
use utoipa::ToSchema;

/// Lightweight recipe representation with tag and ingredient ids
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RecipeResponse {
    pub id: i32,
    pub title: String,
    pub time_minutes: i32,
    /// Decimal with two places, e.g. "5.50"
    pub price: String,
    pub tags: Vec<i32>,
    pub ingredients: Vec<i32>,
}

impl From<RecipeSummary> for RecipeResponse {
    fn from(summary: RecipeSummary) -> Self {
        let RecipeSummary { recipe, links } = summary;
        Self {
            id: recipe.id,
            title: recipe.title,
            time_minutes: recipe.time_minutes,
            price: recipe.price.with_scale(2).to_string(),
            tags: links.tag_ids,
            ingredients: links.ingredient_ids,
        }
    }
}

/// Recipe with its tags and ingredients inlined
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RecipeDetailResponse {
    pub id: i32,
    pub title: String,
    pub time_minutes: i32,
    pub price: String,
    pub tags: Vec<AttributeResponse>,
    pub ingredients: Vec<AttributeResponse>,
}

impl From<RecipeDetail> for RecipeDetailResponse {
    fn from(detail: RecipeDetail) -> Self {
        let RecipeDetail {
            recipe,
            tags,
            ingredients,
        } = detail;
        Self {
            id: recipe.id,
            title: recipe.title,
            time_minutes: recipe.time_minutes,
            price: recipe.price.with_scale(2).to_string(),
            tags: tags.into_iter().map(AttributeResponse::from).collect(),
            ingredients: ingredients.into_iter().map(AttributeResponse::from).collect(),
        }
    }
}
