use serde_json::Value;
use tracing::{info, instrument, warn};

use super::dto::{dump_user, UserInput, UserPatch};
use crate::error::ServiceError;
use crate::state::AppState;

/// Validate a registration payload, hash the password and store the user.
#[instrument(skip(st, payload))]
pub async fn register(st: &AppState, payload: &Value) -> Result<Value, ServiceError> {
    let input = UserInput::load(payload).inspect_err(|e| {
        warn!(fields = ?e.fields().collect::<Vec<_>>(), "invalid registration payload");
    })?;
    let new = input.into_new_user(&st.hasher)?;
    let user = st.store.create_user(new).await?;
    info!(user_id = user.id(), username = %user.username(), "user registered");
    Ok(dump_user(&user, &[]))
}

/// Check a username/password pair. Unknown users and wrong passwords are
/// the same `InvalidCredentials` outcome.
#[instrument(skip(st, password))]
pub async fn login(st: &AppState, username: &str, password: &str) -> Result<Value, ServiceError> {
    let Some(user) = st.store.find_user_by_username(username).await? else {
        warn!("login unknown username");
        return Err(ServiceError::InvalidCredentials);
    };
    if !user.authenticate(password) {
        warn!(user_id = user.id(), "login invalid password");
        return Err(ServiceError::InvalidCredentials);
    }
    let recipes = st.store.list_recipes_by_user(user.id()).await?;
    info!(user_id = user.id(), "user logged in");
    Ok(dump_user(&user, &recipes))
}

#[instrument(skip(st))]
pub async fn get_user(st: &AppState, id: i64) -> Result<Value, ServiceError> {
    let user = st
        .store
        .find_user(id)
        .await?
        .ok_or(ServiceError::NotFound("user"))?;
    let recipes = st.store.list_recipes_by_user(id).await?;
    Ok(dump_user(&user, &recipes))
}

/// Apply a partial update. A new password is re-hashed; a new username is
/// subject to the store's uniqueness check.
#[instrument(skip(st, payload))]
pub async fn update_user(st: &AppState, id: i64, payload: &Value) -> Result<Value, ServiceError> {
    let patch = UserPatch::load(payload).inspect_err(|e| {
        warn!(fields = ?e.fields().collect::<Vec<_>>(), "invalid user update payload");
    })?;
    let mut user = st
        .store
        .find_user(id)
        .await?
        .ok_or(ServiceError::NotFound("user"))?;
    patch.apply(&mut user, &st.hasher)?;
    st.store.update_user(&user).await?;
    let recipes = st.store.list_recipes_by_user(id).await?;
    info!(user_id = id, "user updated");
    Ok(dump_user(&user, &recipes))
}

/// Delete a user and, with it, every recipe the user owns.
#[instrument(skip(st))]
pub async fn delete_user(st: &AppState, id: i64) -> Result<(), ServiceError> {
    if !st.store.delete_user(id).await? {
        return Err(ServiceError::NotFound("user"));
    }
    info!(user_id = id, "user deleted");
    Ok(())
}
