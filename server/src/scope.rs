//! Access-scoped queries over the recipe domain.
//!
//! Every operation takes the authenticated requester and only ever reads or
//! writes rows owned by them. Ownership always comes from the requester,
//! never from request input, and a row owned by someone else is reported as
//! not found so its existence isn't disclosed.

use crate::error::{ApiError, FieldErrors};
use crate::models::{
    AttrKind, Attribute, NewRecipe, RecipeDetail, RecipeLinks, RecipeSummary, User,
};
use crate::store::{RecipeFilter, Store};
use bigdecimal::BigDecimal;
use std::str::FromStr;

/// Longest accepted name or title, matching the VARCHAR(255) columns.
pub const MAX_NAME_LENGTH: usize = 255;

/// Prices are NUMERIC(5, 2): two decimal places, below 1000.
const PRICE_SCALE: i64 = 2;
const PRICE_WHOLE_DIGITS: usize = 3;

/// List/create/retrieve for one kind of user-owned record.
pub trait OwnedResource {
    /// Representation returned by `list` and `create`
    type Summary;
    /// Representation returned by `retrieve`
    type Detail;
    type Draft;
    type Filter;

    fn list(
        &self,
        store: &dyn Store,
        requester: &User,
        filter: &Self::Filter,
    ) -> Result<Vec<Self::Summary>, ApiError>;

    fn create(
        &self,
        store: &dyn Store,
        requester: &User,
        draft: Self::Draft,
    ) -> Result<Self::Summary, ApiError>;

    fn retrieve(
        &self,
        store: &dyn Store,
        requester: &User,
        id: i32,
    ) -> Result<Self::Detail, ApiError>;
}

/// Tags and ingredients: a name owned by a user.
#[derive(Debug, Clone, Copy)]
pub struct AttributeResource {
    kind: AttrKind,
    label: &'static str,
}

pub const TAGS: AttributeResource = AttributeResource {
    kind: AttrKind::Tag,
    label: "Tag",
};

pub const INGREDIENTS: AttributeResource = AttributeResource {
    kind: AttrKind::Ingredient,
    label: "Ingredient",
};

#[derive(Debug, Clone, Copy, Default)]
pub struct AttributeFilter {
    /// Only rows attached to at least one recipe
    pub assigned_only: bool,
}

#[derive(Debug, Clone, Default)]
pub struct AttributeDraft {
    pub name: Option<String>,
}

fn validate_name(field: &str, value: Option<&str>, errors: &mut FieldErrors) -> String {
    let value = value.map(str::trim).unwrap_or_default();
    if value.is_empty() {
        errors.add(field, "This field may not be blank.");
    } else if value.chars().count() > MAX_NAME_LENGTH {
        errors.add(
            field,
            format!(
                "Ensure this field has no more than {} characters.",
                MAX_NAME_LENGTH
            ),
        );
    }
    value.to_string()
}

impl OwnedResource for AttributeResource {
    type Summary = Attribute;
    type Detail = Attribute;
    type Draft = AttributeDraft;
    type Filter = AttributeFilter;

    fn list(
        &self,
        store: &dyn Store,
        requester: &User,
        filter: &AttributeFilter,
    ) -> Result<Vec<Attribute>, ApiError> {
        Ok(store.list_attributes(self.kind, requester.id, filter.assigned_only)?)
    }

    fn create(
        &self,
        store: &dyn Store,
        requester: &User,
        draft: AttributeDraft,
    ) -> Result<Attribute, ApiError> {
        let mut errors = FieldErrors::new();
        let name = validate_name("name", draft.name.as_deref(), &mut errors);
        errors.into_result()?;

        let row = store.insert_attribute(self.kind, requester.id, &name)?;
        tracing::debug!("Created {} {} for user {}", self.kind.label(), row.id, requester.id);
        Ok(row)
    }

    fn retrieve(
        &self,
        store: &dyn Store,
        requester: &User,
        id: i32,
    ) -> Result<Attribute, ApiError> {
        store
            .find_attribute(self.kind, requester.id, id)?
            .ok_or(ApiError::NotFound(self.label))
    }
}

/// Recipes with their tag and ingredient associations.
#[derive(Debug, Clone, Copy)]
pub struct RecipeResource;

pub const RECIPES: RecipeResource = RecipeResource;

#[derive(Debug, Clone, Default)]
pub struct RecipeDraft {
    pub title: Option<String>,
    pub time_minutes: Option<i64>,
    /// Decimal in its textual form, e.g. "5.50"
    pub price: Option<String>,
    pub tags: Vec<i32>,
    pub ingredients: Vec<i32>,
}

/// Parse and check a price: non-negative, at most two decimal places and
/// below 1000. Returned at scale 2.
///
/// Only plain `digits[.digits]` text is accepted. The shape and digit counts
/// are checked on the text itself, so exponent forms such as `1e30000000`
/// never reach a rescale.
pub fn parse_price(raw: &str) -> Result<BigDecimal, String> {
    const INVALID: &str = "A valid number is required.";

    let raw = raw.trim();
    let (negative, unsigned) = match raw.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, raw),
    };
    let (whole, fraction) = unsigned.split_once('.').unwrap_or((unsigned, ""));
    let is_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if whole.is_empty() || !is_digits(whole) || !is_digits(fraction) {
        return Err(INVALID.to_string());
    }

    let significant = whole.trim_start_matches('0');
    let is_zero = significant.is_empty() && fraction.bytes().all(|b| b == b'0');
    if negative && !is_zero {
        return Err("Ensure this value is greater than or equal to 0.".to_string());
    }
    if fraction.len() > PRICE_SCALE as usize {
        return Err(format!(
            "Ensure that there are no more than {} decimal places.",
            PRICE_SCALE
        ));
    }
    if significant.len() > PRICE_WHOLE_DIGITS {
        return Err("Ensure that there are no more than 5 digits in total.".to_string());
    }

    let price = BigDecimal::from_str(unsigned).map_err(|_| INVALID)?;
    Ok(price.with_scale(PRICE_SCALE))
}

/// Deduplicate `ids` and check every one of them is owned by `owner`.
/// Unknown and foreign ids get the same message.
fn resolve_links(
    store: &dyn Store,
    owner: &User,
    kind: AttrKind,
    field: &str,
    ids: &[i32],
    errors: &mut FieldErrors,
) -> Result<Vec<i32>, ApiError> {
    let mut ids = ids.to_vec();
    ids.sort_unstable();
    ids.dedup();

    let owned = store.owned_attribute_ids(kind, owner.id, &ids)?;
    for id in ids.iter().filter(|id| !owned.contains(id)) {
        errors.add(field, format!("Invalid pk \"{}\" - object does not exist.", id));
    }
    Ok(ids)
}

fn resolve_all_links(
    store: &dyn Store,
    owner: &User,
    tags: &[i32],
    ingredients: &[i32],
    errors: &mut FieldErrors,
) -> Result<RecipeLinks, ApiError> {
    Ok(RecipeLinks {
        tag_ids: resolve_links(store, owner, AttrKind::Tag, "tags", tags, errors)?,
        ingredient_ids: resolve_links(
            store,
            owner,
            AttrKind::Ingredient,
            "ingredients",
            ingredients,
            errors,
        )?,
    })
}

impl RecipeResource {
    /// Attach more of the requester's tags and ingredients to one of their
    /// recipes. Pairs that already exist are left alone.
    pub fn attach(
        &self,
        store: &dyn Store,
        requester: &User,
        id: i32,
        tags: &[i32],
        ingredients: &[i32],
    ) -> Result<RecipeDetail, ApiError> {
        // Existence first: a foreign recipe is a 404 even with bad ids
        self.retrieve(store, requester, id)?;

        let mut errors = FieldErrors::new();
        let links = resolve_all_links(store, requester, tags, ingredients, &mut errors)?;
        errors.into_result()?;

        if !links.is_empty() {
            store.attach_to_recipe(id, &links)?;
        }
        self.retrieve(store, requester, id)
    }
}

impl OwnedResource for RecipeResource {
    type Summary = RecipeSummary;
    type Detail = RecipeDetail;
    type Draft = RecipeDraft;
    type Filter = RecipeFilter;

    fn list(
        &self,
        store: &dyn Store,
        requester: &User,
        filter: &RecipeFilter,
    ) -> Result<Vec<RecipeSummary>, ApiError> {
        Ok(store.list_recipes(requester.id, filter)?)
    }

    fn create(
        &self,
        store: &dyn Store,
        requester: &User,
        draft: RecipeDraft,
    ) -> Result<RecipeSummary, ApiError> {
        let mut errors = FieldErrors::new();

        let title = validate_name("title", draft.title.as_deref(), &mut errors);

        let time_minutes = match draft.time_minutes {
            None => {
                errors.add("time_minutes", "This field is required.");
                0
            }
            Some(t) => match i32::try_from(t) {
                Ok(t) if t >= 0 => t,
                _ => {
                    errors.add(
                        "time_minutes",
                        "Ensure this value is a non-negative whole number of minutes.",
                    );
                    0
                }
            },
        };

        let price = match draft.price.as_deref() {
            None => {
                errors.add("price", "This field is required.");
                None
            }
            Some(raw) => parse_price(raw)
                .map_err(|message| errors.add("price", message))
                .ok(),
        };

        let links = resolve_all_links(
            store,
            requester,
            &draft.tags,
            &draft.ingredients,
            &mut errors,
        )?;

        errors.into_result()?;
        let Some(price) = price else {
            return Err(ApiError::field("price", "This field is required."));
        };

        let summary = store.insert_recipe(
            NewRecipe {
                user_id: requester.id,
                title: &title,
                time_minutes,
                price,
            },
            &links,
        )?;
        tracing::info!(
            "Created recipe {} for user {} with {} tag(s), {} ingredient(s)",
            summary.recipe.id,
            requester.id,
            summary.links.tag_ids.len(),
            summary.links.ingredient_ids.len()
        );
        Ok(summary)
    }

    fn retrieve(
        &self,
        store: &dyn Store,
        requester: &User,
        id: i32,
    ) -> Result<RecipeDetail, ApiError> {
        store
            .find_recipe(requester.id, id)?
            .ok_or(ApiError::NotFound("Recipe"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::users::{create_user, ExtraFields};

    fn user(store: &MemoryStore, email: &str) -> User {
        create_user(store, Some(email), Some("testpassword"), ExtraFields::default()).unwrap()
    }

    fn attr(
        store: &MemoryStore,
        resource: AttributeResource,
        owner: &User,
        name: &str,
    ) -> Attribute {
        resource
            .create(
                store,
                owner,
                AttributeDraft {
                    name: Some(name.to_string()),
                },
            )
            .unwrap()
    }

    fn draft(tags: Vec<i32>, ingredients: Vec<i32>) -> RecipeDraft {
        RecipeDraft {
            title: Some("sample recipe".to_string()),
            time_minutes: Some(5),
            price: Some("10.00".to_string()),
            tags,
            ingredients,
        }
    }

    #[test]
    fn test_tags_limited_to_requester() {
        let store = MemoryStore::new();
        let me = user(&store, "me@example.com");
        let other = user(&store, "other@example.com");
        attr(&store, TAGS, &other, "Fruity");
        let mine = attr(&store, TAGS, &me, "Comfort Food");

        let listed = TAGS.list(&store, &me, &AttributeFilter::default()).unwrap();
        assert_eq!(listed, vec![mine]);
    }

    #[test]
    fn test_same_name_for_two_users_is_two_records() {
        let store = MemoryStore::new();
        let me = user(&store, "me@example.com");
        let other = user(&store, "other@example.com");
        let a = attr(&store, TAGS, &me, "Vegan");
        let b = attr(&store, TAGS, &other, "Vegan");
        assert_ne!(a.id, b.id);
        assert_eq!(a.user_id, me.id);
        assert_eq!(b.user_id, other.id);
    }

    #[test]
    fn test_attributes_ordered_by_name_descending() {
        let store = MemoryStore::new();
        let me = user(&store, "me@example.com");
        attr(&store, INGREDIENTS, &me, "Kale");
        attr(&store, INGREDIENTS, &me, "Salt");
        attr(&store, INGREDIENTS, &me, "Pepper");

        let names: Vec<String> = INGREDIENTS
            .list(&store, &me, &AttributeFilter::default())
            .unwrap()
            .into_iter()
            .map(|a| a.name)
            .collect();
        assert_eq!(names, vec!["Salt", "Pepper", "Kale"]);
    }

    #[test]
    fn test_blank_name_rejected() {
        let store = MemoryStore::new();
        let me = user(&store, "me@example.com");
        for name in [None, Some(String::new()), Some("   ".to_string())] {
            let result = TAGS.create(&store, &me, AttributeDraft { name });
            assert!(matches!(result, Err(ApiError::Validation(_))));
        }
        assert!(TAGS
            .list(&store, &me, &AttributeFilter::default())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_assigned_only_filters_and_deduplicates() {
        let store = MemoryStore::new();
        let me = user(&store, "me@example.com");
        let tomato = attr(&store, INGREDIENTS, &me, "tomato");
        attr(&store, INGREDIENTS, &me, "onion");

        RECIPES.create(&store, &me, draft(vec![], vec![tomato.id])).unwrap();
        RECIPES.create(&store, &me, draft(vec![], vec![tomato.id])).unwrap();

        let assigned = INGREDIENTS
            .list(&store, &me, &AttributeFilter { assigned_only: true })
            .unwrap();
        assert_eq!(assigned, vec![tomato]);
    }

    #[test]
    fn test_retrieve_foreign_attribute_is_not_found() {
        let store = MemoryStore::new();
        let me = user(&store, "me@example.com");
        let other = user(&store, "other@example.com");
        let theirs = attr(&store, TAGS, &other, "Secret");

        assert!(matches!(
            TAGS.retrieve(&store, &me, theirs.id),
            Err(ApiError::NotFound(_))
        ));
        assert_eq!(TAGS.retrieve(&store, &other, theirs.id).unwrap(), theirs);
    }

    #[test]
    fn test_create_recipe_with_tags() {
        let store = MemoryStore::new();
        let me = user(&store, "me@example.com");
        let t1 = attr(&store, TAGS, &me, "Vegan");
        let t2 = attr(&store, TAGS, &me, "Dessert");

        let created = RECIPES
            .create(&store, &me, draft(vec![t1.id, t2.id, t1.id], vec![]))
            .unwrap();
        assert_eq!(created.links.tag_ids.len(), 2);

        let detail = RECIPES.retrieve(&store, &me, created.recipe.id).unwrap();
        assert_eq!(detail.tags.len(), 2);
        assert!(detail.tags.contains(&t1));
        assert!(detail.tags.contains(&t2));
        assert_eq!(detail.recipe.user_id, me.id);
    }

    #[test]
    fn test_create_recipe_rejects_foreign_ids() {
        let store = MemoryStore::new();
        let me = user(&store, "me@example.com");
        let other = user(&store, "other@example.com");
        let theirs = attr(&store, TAGS, &other, "Theirs");

        match RECIPES.create(&store, &me, draft(vec![theirs.id], vec![])) {
            Err(ApiError::Validation(fields)) => assert!(fields.contains("tags")),
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(RECIPES
            .list(&store, &me, &RecipeFilter::default())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_create_recipe_reports_every_bad_field() {
        let store = MemoryStore::new();
        let me = user(&store, "me@example.com");
        let result = RECIPES.create(
            &store,
            &me,
            RecipeDraft {
                title: Some(" ".to_string()),
                time_minutes: Some(-1),
                price: None,
                tags: vec![],
                ingredients: vec![99],
            },
        );
        match result {
            Err(ApiError::Validation(fields)) => {
                for field in ["title", "time_minutes", "price", "ingredients"] {
                    assert!(fields.contains(field), "missing error for {}", field);
                }
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_recipes_listed_newest_first_and_scoped() {
        let store = MemoryStore::new();
        let me = user(&store, "me@example.com");
        let other = user(&store, "other@example.com");
        let first = RECIPES.create(&store, &me, draft(vec![], vec![])).unwrap();
        RECIPES.create(&store, &other, draft(vec![], vec![])).unwrap();
        let second = RECIPES.create(&store, &me, draft(vec![], vec![])).unwrap();

        let ids: Vec<i32> = RECIPES
            .list(&store, &me, &RecipeFilter::default())
            .unwrap()
            .into_iter()
            .map(|r| r.recipe.id)
            .collect();
        assert_eq!(ids, vec![second.recipe.id, first.recipe.id]);
    }

    #[test]
    fn test_recipe_list_filtered_by_tag() {
        let store = MemoryStore::new();
        let me = user(&store, "me@example.com");
        let vegan = attr(&store, TAGS, &me, "Vegan");
        let tagged = RECIPES.create(&store, &me, draft(vec![vegan.id], vec![])).unwrap();
        RECIPES.create(&store, &me, draft(vec![], vec![])).unwrap();

        let filter = RecipeFilter {
            tag_ids: vec![vegan.id],
            ingredient_ids: vec![],
        };
        let listed = RECIPES.list(&store, &me, &filter).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].recipe.id, tagged.recipe.id);
    }

    #[test]
    fn test_attach_to_foreign_recipe_is_not_found() {
        let store = MemoryStore::new();
        let me = user(&store, "me@example.com");
        let other = user(&store, "other@example.com");
        let theirs = RECIPES.create(&store, &other, draft(vec![], vec![])).unwrap();
        let tag = attr(&store, TAGS, &me, "Mine");

        let result = RECIPES.attach(&store, &me, theirs.recipe.id, &[tag.id], &[]);
        assert!(matches!(result, Err(ApiError::NotFound(_))));
    }

    #[test]
    fn test_attach_adds_associations() {
        let store = MemoryStore::new();
        let me = user(&store, "me@example.com");
        let recipe = RECIPES.create(&store, &me, draft(vec![], vec![])).unwrap();
        let salt = attr(&store, INGREDIENTS, &me, "Salt");

        let detail = RECIPES
            .attach(&store, &me, recipe.recipe.id, &[], &[salt.id, salt.id])
            .unwrap();
        assert_eq!(detail.ingredients, vec![salt]);
    }

    #[test]
    fn test_parse_price() {
        assert_eq!(parse_price("5").unwrap().to_string(), "5.00");
        assert_eq!(parse_price("10.5").unwrap().to_string(), "10.50");
        assert_eq!(parse_price("999.99").unwrap().to_string(), "999.99");
        assert_eq!(parse_price("007.10").unwrap().to_string(), "7.10");
        assert_eq!(parse_price("-0.00").unwrap().to_string(), "0.00");
        assert!(parse_price("-1").is_err());
        assert!(parse_price("1.005").is_err());
        assert!(parse_price("1000").is_err());
        assert!(parse_price("abc").is_err());
        assert!(parse_price("").is_err());
        assert!(parse_price(".5").is_err());
    }

    #[test]
    fn test_parse_price_rejects_exponent_forms() {
        let started = std::time::Instant::now();
        for raw in [
            "1e30000000",
            "1E30000000",
            "1e-30000000",
            "-1e30000000",
            "9.99e2",
            "1e2",
            "0e999999999",
        ] {
            assert!(parse_price(raw).is_err(), "{} should be rejected", raw);
        }
        assert!(started.elapsed() < std::time::Duration::from_secs(1));
    }
}
