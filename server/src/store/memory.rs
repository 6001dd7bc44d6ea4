use super::{RecipeFilter, Store, StoreError};
use crate::models::{
    AttrKind, Attribute, NewRecipe, NewSession, NewUser, Recipe, RecipeDetail, RecipeLinks,
    RecipeSummary, Session, User, UserChanges,
};
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::sync::{Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

/// Non-persistent store keeping every table in process memory.
///
/// Mirrors the ordering and uniqueness rules of the Postgres schema so that
/// handlers behave identically against either backend.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    users: Vec<User>,
    sessions: Vec<Session>,
    tags: Vec<Attribute>,
    ingredients: Vec<Attribute>,
    recipes: Vec<Recipe>,
    /// (recipe_id, tag_id)
    recipe_tags: BTreeSet<(i32, i32)>,
    /// (recipe_id, ingredient_id)
    recipe_ingredients: BTreeSet<(i32, i32)>,
}

impl MemoryState {
    fn attributes(&self, kind: AttrKind) -> &Vec<Attribute> {
        match kind {
            AttrKind::Tag => &self.tags,
            AttrKind::Ingredient => &self.ingredients,
        }
    }

    fn attributes_mut(&mut self, kind: AttrKind) -> &mut Vec<Attribute> {
        match kind {
            AttrKind::Tag => &mut self.tags,
            AttrKind::Ingredient => &mut self.ingredients,
        }
    }

    fn links(&self, kind: AttrKind) -> &BTreeSet<(i32, i32)> {
        match kind {
            AttrKind::Tag => &self.recipe_tags,
            AttrKind::Ingredient => &self.recipe_ingredients,
        }
    }

    fn links_mut(&mut self, kind: AttrKind) -> &mut BTreeSet<(i32, i32)> {
        match kind {
            AttrKind::Tag => &mut self.recipe_tags,
            AttrKind::Ingredient => &mut self.recipe_ingredients,
        }
    }

    fn linked_ids(&self, kind: AttrKind, recipe_id: i32) -> Vec<i32> {
        self.links(kind)
            .range((recipe_id, i32::MIN)..=(recipe_id, i32::MAX))
            .map(|(_, id)| *id)
            .collect()
    }

    fn uses_any(&self, kind: AttrKind, recipe_id: i32, ids: &[i32]) -> bool {
        ids.is_empty() || self.linked_ids(kind, recipe_id).iter().any(|id| ids.contains(id))
    }

    fn insert_links(&mut self, recipe_id: i32, links: &RecipeLinks) {
        for kind in [AttrKind::Tag, AttrKind::Ingredient] {
            let pairs: Vec<(i32, i32)> =
                links.ids(kind).iter().map(|id| (recipe_id, *id)).collect();
            self.links_mut(kind).extend(pairs);
        }
    }

    fn summary(&self, recipe: &Recipe) -> RecipeSummary {
        RecipeSummary {
            recipe: recipe.clone(),
            links: RecipeLinks {
                tag_ids: self.linked_ids(AttrKind::Tag, recipe.id),
                ingredient_ids: self.linked_ids(AttrKind::Ingredient, recipe.id),
            },
        }
    }

    fn email_taken(&self, email: &str, except: Option<Uuid>) -> bool {
        self.users
            .iter()
            .any(|u| u.email == email && Some(u.id) != except)
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored sessions, expired ones included.
    pub fn session_count(&self) -> usize {
        self.lock().sessions.len()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn next_id(len: usize) -> i32 {
    i32::try_from(len).map_or(i32::MAX, |n| n + 1)
}

impl Store for MemoryStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    fn insert_user(&self, user: NewUser<'_>) -> Result<User, StoreError> {
        let mut state = self.lock();
        if state.email_taken(user.email, None) {
            return Err(StoreError::Conflict("email"));
        }
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: user.email.to_string(),
            name: user.name.to_string(),
            password_hash: user.password_hash.to_string(),
            is_active: user.is_active,
            is_staff: user.is_staff,
            is_superuser: user.is_superuser,
            created_at: now,
            updated_at: now,
        };
        state.users.push(user.clone());
        Ok(user)
    }

    fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self.lock().users.iter().find(|u| u.email == email).cloned())
    }

    fn update_user(&self, id: Uuid, changes: UserChanges<'_>) -> Result<User, StoreError> {
        let mut state = self.lock();
        if let Some(email) = changes.email {
            if state.email_taken(email, Some(id)) {
                return Err(StoreError::Conflict("email"));
            }
        }
        let user = state
            .users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or(StoreError::NotFound)?;
        if changes.is_empty() {
            return Ok(user.clone());
        }
        if let Some(email) = changes.email {
            user.email = email.to_string();
        }
        if let Some(name) = changes.name {
            user.name = name.to_string();
        }
        if let Some(hash) = changes.password_hash {
            user.password_hash = hash.to_string();
        }
        if let Some(is_staff) = changes.is_staff {
            user.is_staff = is_staff;
        }
        if let Some(is_superuser) = changes.is_superuser {
            user.is_superuser = is_superuser;
        }
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    fn insert_session(&self, session: NewSession<'_>) -> Result<(), StoreError> {
        let mut state = self.lock();
        if state
            .sessions
            .iter()
            .any(|s| s.token_hash == session.token_hash)
        {
            return Err(StoreError::Conflict("session"));
        }
        state.sessions.push(Session {
            id: Uuid::new_v4(),
            user_id: session.user_id,
            token_hash: session.token_hash.to_string(),
            expires_at: session.expires_at,
            created_at: Utc::now(),
        });
        Ok(())
    }

    fn delete_expired_sessions(&self, now: DateTime<Utc>) -> Result<usize, StoreError> {
        let mut state = self.lock();
        let before = state.sessions.len();
        state.sessions.retain(|s| s.expires_at > now);
        Ok(before - state.sessions.len())
    }

    fn find_user_by_session(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, StoreError> {
        let state = self.lock();
        let Some(session) = state
            .sessions
            .iter()
            .find(|s| s.token_hash == token_hash && s.expires_at > now)
        else {
            return Ok(None);
        };
        Ok(state
            .users
            .iter()
            .find(|u| u.id == session.user_id && u.is_active)
            .cloned())
    }

    fn list_attributes(
        &self,
        kind: AttrKind,
        owner: Uuid,
        assigned_only: bool,
    ) -> Result<Vec<Attribute>, StoreError> {
        let state = self.lock();
        let assigned: BTreeSet<i32> = state.links(kind).iter().map(|(_, id)| *id).collect();
        let mut rows: Vec<Attribute> = state
            .attributes(kind)
            .iter()
            .filter(|a| a.user_id == owner)
            .filter(|a| !assigned_only || assigned.contains(&a.id))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.name.cmp(&a.name).then(b.id.cmp(&a.id)));
        Ok(rows)
    }

    fn insert_attribute(
        &self,
        kind: AttrKind,
        owner: Uuid,
        name: &str,
    ) -> Result<Attribute, StoreError> {
        let mut state = self.lock();
        let rows = state.attributes_mut(kind);
        let row = Attribute {
            id: next_id(rows.len()),
            user_id: owner,
            name: name.to_string(),
            created_at: Utc::now(),
        };
        rows.push(row.clone());
        Ok(row)
    }

    fn find_attribute(
        &self,
        kind: AttrKind,
        owner: Uuid,
        id: i32,
    ) -> Result<Option<Attribute>, StoreError> {
        Ok(self
            .lock()
            .attributes(kind)
            .iter()
            .find(|a| a.id == id && a.user_id == owner)
            .cloned())
    }

    fn owned_attribute_ids(
        &self,
        kind: AttrKind,
        owner: Uuid,
        ids: &[i32],
    ) -> Result<Vec<i32>, StoreError> {
        Ok(self
            .lock()
            .attributes(kind)
            .iter()
            .filter(|a| a.user_id == owner && ids.contains(&a.id))
            .map(|a| a.id)
            .collect())
    }

    fn list_recipes(
        &self,
        owner: Uuid,
        filter: &RecipeFilter,
    ) -> Result<Vec<RecipeSummary>, StoreError> {
        let state = self.lock();
        let mut rows: Vec<RecipeSummary> = state
            .recipes
            .iter()
            .filter(|r| r.user_id == owner)
            .filter(|r| state.uses_any(AttrKind::Tag, r.id, &filter.tag_ids))
            .filter(|r| state.uses_any(AttrKind::Ingredient, r.id, &filter.ingredient_ids))
            .map(|r| state.summary(r))
            .collect();
        rows.sort_by(|a, b| b.recipe.id.cmp(&a.recipe.id));
        Ok(rows)
    }

    fn insert_recipe(
        &self,
        new_recipe: NewRecipe<'_>,
        links: &RecipeLinks,
    ) -> Result<RecipeSummary, StoreError> {
        let mut state = self.lock();
        let now = Utc::now();
        let recipe = Recipe {
            id: next_id(state.recipes.len()),
            user_id: new_recipe.user_id,
            title: new_recipe.title.to_string(),
            time_minutes: new_recipe.time_minutes,
            price: new_recipe.price,
            created_at: now,
            updated_at: now,
        };
        state.recipes.push(recipe.clone());
        state.insert_links(recipe.id, links);
        Ok(state.summary(&recipe))
    }

    fn find_recipe(&self, owner: Uuid, id: i32) -> Result<Option<RecipeDetail>, StoreError> {
        let state = self.lock();
        let Some(recipe) = state
            .recipes
            .iter()
            .find(|r| r.id == id && r.user_id == owner)
        else {
            return Ok(None);
        };

        let load = |kind: AttrKind| {
            let ids = state.linked_ids(kind, recipe.id);
            let mut rows: Vec<Attribute> = state
                .attributes(kind)
                .iter()
                .filter(|a| ids.contains(&a.id))
                .cloned()
                .collect();
            rows.sort_by(|a, b| a.name.cmp(&b.name));
            rows
        };

        Ok(Some(RecipeDetail {
            recipe: recipe.clone(),
            tags: load(AttrKind::Tag),
            ingredients: load(AttrKind::Ingredient),
        }))
    }

    fn attach_to_recipe(&self, recipe_id: i32, links: &RecipeLinks) -> Result<(), StoreError> {
        let mut state = self.lock();
        if !state.recipes.iter().any(|r| r.id == recipe_id) {
            return Err(StoreError::NotFound);
        }
        state.insert_links(recipe_id, links);
        Ok(())
    }
}
