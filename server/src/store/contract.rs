//! Behaviour every `Store` backend must share. Each check creates its own
//! users with fresh emails, so the suite can run repeatedly against a live
//! database and in parallel with itself.

use super::{RecipeFilter, Store, StoreError};
use crate::models::{AttrKind, NewRecipe, NewSession, NewUser, RecipeLinks, User, UserChanges};
use bigdecimal::BigDecimal;
use chrono::{Duration, Utc};
use std::str::FromStr;
use uuid::Uuid;

fn user(store: &dyn Store) -> User {
    let email = format!("{}@example.com", Uuid::new_v4());
    store
        .insert_user(NewUser {
            email: &email,
            name: "",
            password_hash: "hash",
            is_active: true,
            is_staff: false,
            is_superuser: false,
        })
        .unwrap()
}

fn recipe(store: &dyn Store, owner: &User, title: &str, links: &RecipeLinks) -> i32 {
    store
        .insert_recipe(
            NewRecipe {
                user_id: owner.id,
                title,
                time_minutes: 5,
                price: BigDecimal::from_str("4.50").unwrap(),
            },
            links,
        )
        .unwrap()
        .recipe
        .id
}

fn names(rows: &[crate::models::Attribute]) -> Vec<&str> {
    rows.iter().map(|a| a.name.as_str()).collect()
}

pub fn assigned_only_lists_each_row_once(store: &dyn Store) {
    for kind in [AttrKind::Tag, AttrKind::Ingredient] {
        let owner = user(store);
        let used = store.insert_attribute(kind, owner.id, "used").unwrap();
        store.insert_attribute(kind, owner.id, "unused").unwrap();

        let links = match kind {
            AttrKind::Tag => RecipeLinks {
                tag_ids: vec![used.id],
                ingredient_ids: vec![],
            },
            AttrKind::Ingredient => RecipeLinks {
                tag_ids: vec![],
                ingredient_ids: vec![used.id],
            },
        };
        recipe(store, &owner, "first", &links);
        recipe(store, &owner, "second", &links);

        let assigned = store.list_attributes(kind, owner.id, true).unwrap();
        assert_eq!(assigned, vec![used], "{}", kind.label());

        let all = store.list_attributes(kind, owner.id, false).unwrap();
        assert_eq!(names(&all), vec!["used", "unused"], "{}", kind.label());
    }
}

pub fn attributes_scoped_to_owner(store: &dyn Store) {
    let me = user(store);
    let other = user(store);
    let mine = store.insert_attribute(AttrKind::Tag, me.id, "Mine").unwrap();
    let theirs = store
        .insert_attribute(AttrKind::Tag, other.id, "Theirs")
        .unwrap();

    assert_eq!(
        store.list_attributes(AttrKind::Tag, me.id, false).unwrap(),
        vec![mine.clone()]
    );
    assert!(store
        .find_attribute(AttrKind::Tag, me.id, theirs.id)
        .unwrap()
        .is_none());
    assert_eq!(
        store
            .owned_attribute_ids(AttrKind::Tag, me.id, &[mine.id, theirs.id])
            .unwrap(),
        vec![mine.id]
    );
}

pub fn recipes_carry_links_and_filter(store: &dyn Store) {
    let owner = user(store);
    let vegan = store.insert_attribute(AttrKind::Tag, owner.id, "Vegan").unwrap();
    let quick = store.insert_attribute(AttrKind::Tag, owner.id, "Quick").unwrap();
    let salt = store
        .insert_attribute(AttrKind::Ingredient, owner.id, "Salt")
        .unwrap();

    let tagged = recipe(
        store,
        &owner,
        "Tofu",
        &RecipeLinks {
            tag_ids: vec![vegan.id, quick.id],
            ingredient_ids: vec![salt.id],
        },
    );
    let plain = recipe(store, &owner, "Toast", &RecipeLinks::default());

    let all = store.list_recipes(owner.id, &RecipeFilter::default()).unwrap();
    let ids: Vec<i32> = all.iter().map(|r| r.recipe.id).collect();
    assert_eq!(ids, vec![plain, tagged]);

    let mut expected_tags = vec![vegan.id, quick.id];
    expected_tags.sort_unstable();
    assert_eq!(all[1].links.tag_ids, expected_tags);
    assert_eq!(all[1].links.ingredient_ids, vec![salt.id]);
    assert!(all[0].links.is_empty());

    let by_tag = store
        .list_recipes(
            owner.id,
            &RecipeFilter {
                tag_ids: vec![vegan.id, quick.id],
                ingredient_ids: vec![],
            },
        )
        .unwrap();
    assert_eq!(by_tag.len(), 1);
    assert_eq!(by_tag[0].recipe.id, tagged);

    let by_ingredient = store
        .list_recipes(
            owner.id,
            &RecipeFilter {
                tag_ids: vec![],
                ingredient_ids: vec![salt.id],
            },
        )
        .unwrap();
    assert_eq!(by_ingredient.len(), 1);

    let detail = store.find_recipe(owner.id, tagged).unwrap().unwrap();
    assert_eq!(names(&detail.tags), vec!["Quick", "Vegan"]);
    assert_eq!(detail.recipe.price.to_string(), "4.50");

    let stranger = user(store);
    assert!(store.find_recipe(stranger.id, tagged).unwrap().is_none());
    assert!(store
        .list_recipes(stranger.id, &RecipeFilter::default())
        .unwrap()
        .is_empty());
}

pub fn attach_keeps_pairs_unique(store: &dyn Store) {
    let owner = user(store);
    let tag = store.insert_attribute(AttrKind::Tag, owner.id, "Vegan").unwrap();
    let links = RecipeLinks {
        tag_ids: vec![tag.id],
        ingredient_ids: vec![],
    };
    let id = recipe(store, &owner, "Salad", &links);

    store.attach_to_recipe(id, &links).unwrap();
    store.attach_to_recipe(id, &links).unwrap();

    let detail = store.find_recipe(owner.id, id).unwrap().unwrap();
    assert_eq!(detail.tags, vec![tag]);
}

pub fn email_conflicts_reported(store: &dyn Store) {
    let taken = user(store);
    let me = user(store);

    let err = store
        .insert_user(NewUser {
            email: &taken.email,
            name: "",
            password_hash: "hash",
            is_active: true,
            is_staff: false,
            is_superuser: false,
        })
        .unwrap_err();
    assert!(matches!(err, StoreError::Conflict("email")));

    let err = store
        .update_user(
            me.id,
            UserChanges {
                email: Some(&taken.email),
                ..Default::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, StoreError::Conflict("email")));
}

pub fn expired_sessions_pruned(store: &dyn Store) {
    let owner = user(store);
    let now = Utc::now();
    let stale = format!("stale-{}", Uuid::new_v4());
    let live = format!("live-{}", Uuid::new_v4());

    for (hash, expires_at) in [
        (&stale, now - Duration::minutes(1)),
        (&live, now + Duration::days(1)),
    ] {
        store
            .insert_session(NewSession {
                user_id: owner.id,
                token_hash: hash,
                expires_at,
            })
            .unwrap();
    }
    assert!(store.find_user_by_session(&stale, now).unwrap().is_none());

    store.delete_expired_sessions(now).unwrap();

    // Looked up from before its expiry, the stale row would match if it still existed
    let earlier = now - Duration::minutes(2);
    assert!(store.find_user_by_session(&stale, earlier).unwrap().is_none());
    assert_eq!(
        store.find_user_by_session(&live, now).unwrap().map(|u| u.id),
        Some(owner.id)
    );
}

/// Run every check above against `store`.
pub fn run_all(store: &dyn Store) {
    assigned_only_lists_each_row_once(store);
    attributes_scoped_to_owner(store);
    recipes_carry_links_and_filter(store);
    attach_keeps_pairs_unique(store);
    email_conflicts_reported(store);
    expired_sessions_pruned(store);
}
