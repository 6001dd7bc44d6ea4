use super::{RecipeFilter, Store, StoreError};
use crate::db::DbPool;
use crate::models::{
    AttrKind, Attribute, NewRecipe, NewSession, NewUser, Recipe, RecipeDetail, RecipeLinks,
    RecipeSummary, User, UserChanges,
};
use crate::schema::{
    ingredients, recipe_ingredients, recipe_tags, recipes, sessions, tags, users,
};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, PooledConnection};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use std::collections::HashMap;
use uuid::Uuid;

/// Diesel/PostgreSQL store backed by an r2d2 pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> Result<PooledConnection<ConnectionManager<PgConnection>>, StoreError> {
        Ok(self.pool.get()?)
    }
}

fn unique_violation(err: DieselError, what: &'static str) -> StoreError {
    match err {
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
            StoreError::Conflict(what)
        }
        other => StoreError::Database(other),
    }
}

// Tags and ingredients live in separate tables with identical shape, and
// Diesel table types can't be abstracted over at runtime. These macros expand
// the same query against `$table` and its association table `$link`.

macro_rules! attribute_columns {
    ($table:ident) => {
        ($table::id, $table::user_id, $table::name, $table::created_at)
    };
}

macro_rules! list_attributes {
    ($conn:expr, $table:ident, $link:ident, $fk:ident, $owner:expr, $assigned_only:expr) => {{
        let mut query = $table::table
            .filter($table::user_id.eq($owner))
            .select(attribute_columns!($table))
            .into_boxed();
        if $assigned_only {
            // IN (subquery) yields each row once no matter how many recipes use it
            query = query.filter($table::id.eq_any($link::table.select($link::$fk)));
        }
        query
            .order($table::name.desc())
            .then_order_by($table::id.desc())
            .load::<Attribute>($conn)
    }};
}

macro_rules! insert_attribute {
    ($conn:expr, $table:ident, $owner:expr, $name:expr) => {
        diesel::insert_into($table::table)
            .values(($table::user_id.eq($owner), $table::name.eq($name)))
            .returning(attribute_columns!($table))
            .get_result::<Attribute>($conn)
    };
}

macro_rules! find_attribute {
    ($conn:expr, $table:ident, $owner:expr, $id:expr) => {
        $table::table
            .filter($table::id.eq($id))
            .filter($table::user_id.eq($owner))
            .select(attribute_columns!($table))
            .first::<Attribute>($conn)
            .optional()
    };
}

macro_rules! owned_attribute_ids {
    ($conn:expr, $table:ident, $owner:expr, $ids:expr) => {
        $table::table
            .filter($table::user_id.eq($owner))
            .filter($table::id.eq_any($ids))
            .select($table::id)
            .load::<i32>($conn)
    };
}

macro_rules! recipe_attributes {
    ($conn:expr, $table:ident, $link:ident, $recipe_id:expr) => {
        $table::table
            .inner_join($link::table)
            .filter($link::recipe_id.eq($recipe_id))
            .select(attribute_columns!($table))
            .order($table::name.asc())
            .load::<Attribute>($conn)
    };
}

macro_rules! link_pairs {
    ($conn:expr, $link:ident, $fk:ident, $recipe_ids:expr) => {
        $link::table
            .filter($link::recipe_id.eq_any($recipe_ids))
            .select(($link::recipe_id, $link::$fk))
            .order(($link::recipe_id, $link::$fk))
            .load::<(i32, i32)>($conn)
    };
}

macro_rules! insert_links {
    ($conn:expr, $link:ident, $fk:ident, $recipe_id:expr, $ids:expr) => {{
        let rows: Vec<_> = $ids
            .iter()
            .map(|id| ($link::recipe_id.eq($recipe_id), $link::$fk.eq(*id)))
            .collect();
        diesel::insert_into($link::table)
            .values(rows)
            .on_conflict_do_nothing()
            .execute($conn)
    }};
}

fn insert_all_links(
    conn: &mut PgConnection,
    recipe_id: i32,
    links: &RecipeLinks,
) -> Result<(), DieselError> {
    if !links.tag_ids.is_empty() {
        insert_links!(conn, recipe_tags, tag_id, recipe_id, links.tag_ids)?;
    }
    if !links.ingredient_ids.is_empty() {
        insert_links!(
            conn,
            recipe_ingredients,
            ingredient_id,
            recipe_id,
            links.ingredient_ids
        )?;
    }
    Ok(())
}

impl Store for PgStore {
    fn backend_name(&self) -> &'static str {
        "postgres"
    }

    fn insert_user(&self, user: NewUser<'_>) -> Result<User, StoreError> {
        let mut conn = self.conn()?;
        diesel::insert_into(users::table)
            .values(&user)
            .returning(User::as_returning())
            .get_result(&mut conn)
            .map_err(|e| unique_violation(e, "email"))
    }

    fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let mut conn = self.conn()?;
        Ok(users::table
            .filter(users::email.eq(email))
            .select(User::as_select())
            .first(&mut conn)
            .optional()?)
    }

    fn update_user(&self, id: Uuid, changes: UserChanges<'_>) -> Result<User, StoreError> {
        let mut conn = self.conn()?;
        if changes.is_empty() {
            return users::table
                .find(id)
                .select(User::as_select())
                .first(&mut conn)
                .optional()?
                .ok_or(StoreError::NotFound);
        }
        diesel::update(users::table.find(id))
            .set(&changes)
            .returning(User::as_returning())
            .get_result(&mut conn)
            .optional()
            .map_err(|e| unique_violation(e, "email"))?
            .ok_or(StoreError::NotFound)
    }

    fn insert_session(&self, session: NewSession<'_>) -> Result<(), StoreError> {
        let mut conn = self.conn()?;
        diesel::insert_into(sessions::table)
            .values(&session)
            .execute(&mut conn)?;
        Ok(())
    }

    fn delete_expired_sessions(&self, now: DateTime<Utc>) -> Result<usize, StoreError> {
        let mut conn = self.conn()?;
        Ok(diesel::delete(sessions::table.filter(sessions::expires_at.le(now)))
            .execute(&mut conn)?)
    }

    fn find_user_by_session(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, StoreError> {
        let mut conn = self.conn()?;
        Ok(sessions::table
            .inner_join(users::table)
            .filter(sessions::token_hash.eq(token_hash))
            .filter(sessions::expires_at.gt(now))
            .filter(users::is_active.eq(true))
            .select(User::as_select())
            .first(&mut conn)
            .optional()?)
    }

    fn list_attributes(
        &self,
        kind: AttrKind,
        owner: Uuid,
        assigned_only: bool,
    ) -> Result<Vec<Attribute>, StoreError> {
        let mut conn = self.conn()?;
        let rows = match kind {
            AttrKind::Tag => {
                list_attributes!(&mut conn, tags, recipe_tags, tag_id, owner, assigned_only)
            }
            AttrKind::Ingredient => list_attributes!(
                &mut conn,
                ingredients,
                recipe_ingredients,
                ingredient_id,
                owner,
                assigned_only
            ),
        }?;
        Ok(rows)
    }

    fn insert_attribute(
        &self,
        kind: AttrKind,
        owner: Uuid,
        name: &str,
    ) -> Result<Attribute, StoreError> {
        let mut conn = self.conn()?;
        let row = match kind {
            AttrKind::Tag => insert_attribute!(&mut conn, tags, owner, name),
            AttrKind::Ingredient => insert_attribute!(&mut conn, ingredients, owner, name),
        }?;
        Ok(row)
    }

    fn find_attribute(
        &self,
        kind: AttrKind,
        owner: Uuid,
        id: i32,
    ) -> Result<Option<Attribute>, StoreError> {
        let mut conn = self.conn()?;
        let row = match kind {
            AttrKind::Tag => find_attribute!(&mut conn, tags, owner, id),
            AttrKind::Ingredient => find_attribute!(&mut conn, ingredients, owner, id),
        }?;
        Ok(row)
    }

    fn owned_attribute_ids(
        &self,
        kind: AttrKind,
        owner: Uuid,
        ids: &[i32],
    ) -> Result<Vec<i32>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.conn()?;
        let found = match kind {
            AttrKind::Tag => owned_attribute_ids!(&mut conn, tags, owner, ids),
            AttrKind::Ingredient => owned_attribute_ids!(&mut conn, ingredients, owner, ids),
        }?;
        Ok(found)
    }

    fn list_recipes(
        &self,
        owner: Uuid,
        filter: &RecipeFilter,
    ) -> Result<Vec<RecipeSummary>, StoreError> {
        let mut conn = self.conn()?;

        let mut query = recipes::table
            .filter(recipes::user_id.eq(owner))
            .select(Recipe::as_select())
            .into_boxed();

        if !filter.tag_ids.is_empty() {
            query = query.filter(
                recipes::id.eq_any(
                    recipe_tags::table
                        .filter(recipe_tags::tag_id.eq_any(filter.tag_ids.clone()))
                        .select(recipe_tags::recipe_id),
                ),
            );
        }
        if !filter.ingredient_ids.is_empty() {
            query = query.filter(
                recipes::id.eq_any(
                    recipe_ingredients::table
                        .filter(
                            recipe_ingredients::ingredient_id
                                .eq_any(filter.ingredient_ids.clone()),
                        )
                        .select(recipe_ingredients::recipe_id),
                ),
            );
        }

        let rows: Vec<Recipe> = query.order(recipes::id.desc()).load(&mut conn)?;
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        // Two extra queries for all association ids instead of two per recipe
        let recipe_ids: Vec<i32> = rows.iter().map(|r| r.id).collect();
        let tag_pairs = link_pairs!(&mut conn, recipe_tags, tag_id, &recipe_ids)?;
        let ingredient_pairs =
            link_pairs!(&mut conn, recipe_ingredients, ingredient_id, &recipe_ids)?;

        let mut links: HashMap<i32, RecipeLinks> = HashMap::new();
        for (recipe_id, tag_id) in tag_pairs {
            links.entry(recipe_id).or_default().tag_ids.push(tag_id);
        }
        for (recipe_id, ingredient_id) in ingredient_pairs {
            links
                .entry(recipe_id)
                .or_default()
                .ingredient_ids
                .push(ingredient_id);
        }

        Ok(rows
            .into_iter()
            .map(|recipe| RecipeSummary {
                links: links.remove(&recipe.id).unwrap_or_default(),
                recipe,
            })
            .collect())
    }

    fn insert_recipe(
        &self,
        new_recipe: NewRecipe<'_>,
        links: &RecipeLinks,
    ) -> Result<RecipeSummary, StoreError> {
        let mut conn = self.conn()?;

        let recipe: Recipe = conn.transaction(|conn| {
            let recipe: Recipe = diesel::insert_into(recipes::table)
                .values(&new_recipe)
                .returning(Recipe::as_returning())
                .get_result(conn)?;
            insert_all_links(conn, recipe.id, links)?;
            Ok::<_, DieselError>(recipe)
        })?;

        let mut links = links.clone();
        links.tag_ids.sort_unstable();
        links.ingredient_ids.sort_unstable();
        Ok(RecipeSummary { recipe, links })
    }

    fn find_recipe(&self, owner: Uuid, id: i32) -> Result<Option<RecipeDetail>, StoreError> {
        let mut conn = self.conn()?;

        let Some(recipe) = recipes::table
            .filter(recipes::id.eq(id))
            .filter(recipes::user_id.eq(owner))
            .select(Recipe::as_select())
            .first(&mut conn)
            .optional()?
        else {
            return Ok(None);
        };

        let tags = recipe_attributes!(&mut conn, tags, recipe_tags, recipe.id)?;
        let ingredients =
            recipe_attributes!(&mut conn, ingredients, recipe_ingredients, recipe.id)?;

        Ok(Some(RecipeDetail {
            recipe,
            tags,
            ingredients,
        }))
    }

    fn attach_to_recipe(&self, recipe_id: i32, links: &RecipeLinks) -> Result<(), StoreError> {
        let mut conn = self.conn()?;
        conn.transaction(|conn| insert_all_links(conn, recipe_id, links))?;
        Ok(())
    }
}

/// These run against a real database when `TEST_DATABASE_URL` is set and
/// are skipped otherwise. Rows are created under fresh users, so the target
/// database can be shared and reused.
#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_pool;
    use crate::store::contract;
    use std::sync::OnceLock;

    fn store() -> Option<&'static PgStore> {
        static STORE: OnceLock<Option<PgStore>> = OnceLock::new();
        STORE
            .get_or_init(|| {
                let url = std::env::var("TEST_DATABASE_URL").ok()?;
                let pool = create_pool(&url).expect("test database should be reachable");
                Some(PgStore::new(pool))
            })
            .as_ref()
    }

    #[test]
    fn test_assigned_only_lists_each_row_once() {
        let Some(store) = store() else { return };
        contract::assigned_only_lists_each_row_once(store);
    }

    #[test]
    fn test_attributes_scoped_to_owner() {
        let Some(store) = store() else { return };
        contract::attributes_scoped_to_owner(store);
    }

    #[test]
    fn test_recipes_carry_links_and_filter() {
        let Some(store) = store() else { return };
        contract::recipes_carry_links_and_filter(store);
    }

    #[test]
    fn test_attach_keeps_pairs_unique() {
        let Some(store) = store() else { return };
        contract::attach_keeps_pairs_unique(store);
    }

    #[test]
    fn test_email_conflicts_reported() {
        let Some(store) = store() else { return };
        contract::email_conflicts_reported(store);
    }

    #[test]
    fn test_expired_sessions_pruned() {
        let Some(store) = store() else { return };
        contract::expired_sessions_pruned(store);
    }
}
