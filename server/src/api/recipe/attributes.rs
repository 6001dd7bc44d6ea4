//! Request handling shared by tags and ingredients. The two resources have
//! the same shape; only the [`AttributeResource`] they delegate to differs.

use crate::api::{ApiPath, ApiQuery};
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::models::Attribute;
use crate::scope::{AttributeDraft, AttributeFilter, AttributeResource, OwnedResource};
use crate::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct AttributeResponse {
    pub id: i32,
    pub name: String,
}

impl From<Attribute> for AttributeResponse {
    fn from(attr: Attribute) -> Self {
        Self {
            id: attr.id,
            name: attr.name,
        }
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateAttributeRequest {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListAttributesQuery {
    /// `1` to only list entries attached to at least one recipe
    pub assigned_only: Option<String>,
}

/// Accepts the usual spellings of a boolean query flag.
pub fn parse_flag(field: &str, value: Option<&str>) -> Result<bool, ApiError> {
    match value.map(str::trim) {
        None | Some("") | Some("0") | Some("false") => Ok(false),
        Some("1") | Some("true") => Ok(true),
        Some(_) => Err(ApiError::field(field, "Must be 0 or 1.")),
    }
}

pub async fn list(
    resource: AttributeResource,
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListAttributesQuery>,
) -> Result<Json<Vec<AttributeResponse>>, ApiError> {
    let filter = AttributeFilter {
        assigned_only: parse_flag("assigned_only", query.assigned_only.as_deref())?,
    };
    let rows = resource.list(state.store.as_ref(), &user, &filter)?;
    Ok(Json(rows.into_iter().map(AttributeResponse::from).collect()))
}

pub async fn create(
    resource: AttributeResource,
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    request: CreateAttributeRequest,
) -> Result<impl IntoResponse, ApiError> {
    let row = resource.create(
        state.store.as_ref(),
        &user,
        AttributeDraft { name: request.name },
    )?;
    Ok((StatusCode::CREATED, Json(AttributeResponse::from(row))))
}

pub async fn get(
    resource: AttributeResource,
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
) -> Result<Json<AttributeResponse>, ApiError> {
    let row = resource.retrieve(state.store.as_ref(), &user, id)?;
    Ok(Json(AttributeResponse::from(row)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flag() {
        assert!(!parse_flag("f", None).unwrap());
        assert!(!parse_flag("f", Some("0")).unwrap());
        assert!(parse_flag("f", Some("1")).unwrap());
        assert!(parse_flag("f", Some("true")).unwrap());
        assert!(parse_flag("f", Some("yes")).is_err());
    }
}
