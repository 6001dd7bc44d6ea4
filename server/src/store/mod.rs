//! Storage abstraction for users, sessions and the recipe domain.
//!
//! Handlers never touch a connection directly: they receive a `&dyn Store`
//! from the application state. `PgStore` is the production backend; the
//! in-memory `MemoryStore` backs tests and `STORE_BACKEND=memory` runs.
//!
//! The store does not decide visibility on its own. Every domain query takes
//! the owning user's id and filters on it, and callers in [`crate::scope`]
//! always pass the authenticated requester.

#[cfg(test)]
mod contract;
mod memory;
mod pg;

pub use memory::MemoryStore;
pub use pg::PgStore;

use crate::models::{
    AttrKind, Attribute, NewRecipe, NewSession, NewUser, RecipeDetail, RecipeLinks,
    RecipeSummary, User, UserChanges,
};
use chrono::{DateTime, Utc};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,

    #[error("{0} already exists")]
    Conflict(&'static str),

    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("connection pool error: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),

    #[error("migration failed: {0}")]
    Migration(String),
}

/// Filters applied when listing recipes. Empty id lists mean "no filter".
#[derive(Debug, Clone, Default)]
pub struct RecipeFilter {
    /// Keep recipes carrying at least one of these tags
    pub tag_ids: Vec<i32>,
    /// Keep recipes using at least one of these ingredients
    pub ingredient_ids: Vec<i32>,
}

pub trait Store: Send + Sync + fmt::Debug {
    /// Short backend name for logs ("postgres", "memory").
    fn backend_name(&self) -> &'static str;

    /// Insert a user. Fails with `Conflict("email")` when the email is taken.
    fn insert_user(&self, user: NewUser<'_>) -> Result<User, StoreError>;

    fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// Apply `changes` to the user. Fails with `NotFound` for unknown ids and
    /// `Conflict("email")` when the new email belongs to someone else.
    fn update_user(&self, id: Uuid, changes: UserChanges<'_>) -> Result<User, StoreError>;

    fn insert_session(&self, session: NewSession<'_>) -> Result<(), StoreError>;

    /// Remove sessions whose expiry is at or before `now`. Returns how many
    /// were removed.
    fn delete_expired_sessions(&self, now: DateTime<Utc>) -> Result<usize, StoreError>;

    /// Resolve an unexpired session for an active user.
    fn find_user_by_session(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, StoreError>;

    /// Owner's tags or ingredients, name descending. With `assigned_only`,
    /// only rows attached to at least one recipe, each listed once.
    fn list_attributes(
        &self,
        kind: AttrKind,
        owner: Uuid,
        assigned_only: bool,
    ) -> Result<Vec<Attribute>, StoreError>;

    fn insert_attribute(
        &self,
        kind: AttrKind,
        owner: Uuid,
        name: &str,
    ) -> Result<Attribute, StoreError>;

    fn find_attribute(
        &self,
        kind: AttrKind,
        owner: Uuid,
        id: i32,
    ) -> Result<Option<Attribute>, StoreError>;

    /// The subset of `ids` that exist and belong to `owner`.
    fn owned_attribute_ids(
        &self,
        kind: AttrKind,
        owner: Uuid,
        ids: &[i32],
    ) -> Result<Vec<i32>, StoreError>;

    /// Owner's recipes, newest (highest id) first.
    fn list_recipes(
        &self,
        owner: Uuid,
        filter: &RecipeFilter,
    ) -> Result<Vec<RecipeSummary>, StoreError>;

    /// Insert a recipe and its associations atomically.
    fn insert_recipe(
        &self,
        recipe: NewRecipe<'_>,
        links: &RecipeLinks,
    ) -> Result<RecipeSummary, StoreError>;

    fn find_recipe(&self, owner: Uuid, id: i32) -> Result<Option<RecipeDetail>, StoreError>;

    /// Add associations to an existing recipe. Pairs already present are kept
    /// as they are.
    fn attach_to_recipe(&self, recipe_id: i32, links: &RecipeLinks) -> Result<(), StoreError>;
}
