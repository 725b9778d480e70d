use std::collections::BTreeMap;

use anyhow::anyhow;
use serde_json::Value;
use tracing::{info, instrument, warn};

use super::dto::{dump_recipe, RecipeInput, RecipePatch};
use super::repo_types::Recipe;
use crate::error::ServiceError;
use crate::state::AppState;
use crate::users::repo_types::User;

async fn owner_of(st: &AppState, recipe: &Recipe) -> Result<User, ServiceError> {
    st.store
        .find_user(recipe.user_id())
        .await?
        .ok_or_else(|| anyhow!("recipe {} has no owner", recipe.id()).into())
}

/// Validate a creation payload and store the recipe under its owner.
#[instrument(skip(st, payload))]
pub async fn create_recipe(st: &AppState, payload: &Value) -> Result<Value, ServiceError> {
    let input = RecipeInput::load(payload).inspect_err(|e| {
        warn!(fields = ?e.fields().collect::<Vec<_>>(), "invalid recipe payload");
    })?;
    let owner = st
        .store
        .find_user(input.user_id)
        .await?
        .ok_or(ServiceError::NotFound("user"))?;
    let recipe = st.store.create_recipe(input.into_new_recipe()).await?;
    info!(recipe_id = recipe.id(), user_id = owner.id(), "recipe created");
    Ok(dump_recipe(&recipe, &owner))
}

#[instrument(skip(st))]
pub async fn get_recipe(st: &AppState, id: i64) -> Result<Value, ServiceError> {
    let recipe = st
        .store
        .find_recipe(id)
        .await?
        .ok_or(ServiceError::NotFound("recipe"))?;
    let owner = owner_of(st, &recipe).await?;
    Ok(dump_recipe(&recipe, &owner))
}

/// Every recipe in id order, each with its owner nested.
#[instrument(skip(st))]
pub async fn list_recipes(st: &AppState) -> Result<Value, ServiceError> {
    let recipes = st.store.list_recipes().await?;
    let mut owners: BTreeMap<i64, User> = BTreeMap::new();
    let mut out = Vec::with_capacity(recipes.len());
    for recipe in &recipes {
        if !owners.contains_key(&recipe.user_id()) {
            let owner = owner_of(st, recipe).await?;
            owners.insert(owner.id(), owner);
        }
        if let Some(owner) = owners.get(&recipe.user_id()) {
            out.push(dump_recipe(recipe, owner));
        }
    }
    Ok(Value::Array(out))
}

#[instrument(skip(st))]
pub async fn list_recipes_by_user(st: &AppState, user_id: i64) -> Result<Value, ServiceError> {
    let owner = st
        .store
        .find_user(user_id)
        .await?
        .ok_or(ServiceError::NotFound("user"))?;
    let recipes = st.store.list_recipes_by_user(user_id).await?;
    Ok(Value::Array(
        recipes.iter().map(|r| dump_recipe(r, &owner)).collect(),
    ))
}

/// Apply a partial update. The owner is fixed at creation.
#[instrument(skip(st, payload))]
pub async fn update_recipe(st: &AppState, id: i64, payload: &Value) -> Result<Value, ServiceError> {
    let patch = RecipePatch::load(payload).inspect_err(|e| {
        warn!(fields = ?e.fields().collect::<Vec<_>>(), "invalid recipe update payload");
    })?;
    let mut recipe = st
        .store
        .find_recipe(id)
        .await?
        .ok_or(ServiceError::NotFound("recipe"))?;
    patch.apply(&mut recipe);
    st.store.update_recipe(&recipe).await?;
    let owner = owner_of(st, &recipe).await?;
    info!(recipe_id = id, "recipe updated");
    Ok(dump_recipe(&recipe, &owner))
}

#[instrument(skip(st))]
pub async fn delete_recipe(st: &AppState, id: i64) -> Result<(), ServiceError> {
    if !st.store.delete_recipe(id).await? {
        return Err(ServiceError::NotFound("recipe"));
    }
    info!(recipe_id = id, "recipe deleted");
    Ok(())
}
