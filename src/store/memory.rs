use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use super::{Store, StoreError};
use crate::recipes::repo_types::{NewRecipe, Recipe};
use crate::users::repo_types::{NewUser, User};

#[derive(Debug, Default)]
struct Tables {
    users: BTreeMap<i64, User>,
    recipes: BTreeMap<i64, Recipe>,
    next_user_id: i64,
    next_recipe_id: i64,
}

impl Tables {
    fn username_taken(&self, username: &str, except: Option<i64>) -> bool {
        self.users
            .values()
            .any(|u| u.username() == username && Some(u.id()) != except)
    }
}

/// Store kept in process memory. Both tables sit behind one lock so the
/// uniqueness check and the cascade are atomic.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn create_user(&self, new: NewUser) -> Result<User, StoreError> {
        let mut t = self.tables.write().await;
        if t.username_taken(new.username(), None) {
            return Err(StoreError::UsernameTaken(new.username().to_string()));
        }
        t.next_user_id += 1;
        let user = User::from_parts(t.next_user_id, new);
        t.users.insert(user.id(), user.clone());
        Ok(user)
    }

    async fn find_user(&self, id: i64) -> Result<Option<User>, StoreError> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let t = self.tables.read().await;
        Ok(t.users.values().find(|u| u.username() == username).cloned())
    }

    async fn update_user(&self, user: &User) -> Result<(), StoreError> {
        let mut t = self.tables.write().await;
        if !t.users.contains_key(&user.id()) {
            return Err(StoreError::NotFound {
                entity: "user",
                id: user.id(),
            });
        }
        if t.username_taken(user.username(), Some(user.id())) {
            return Err(StoreError::UsernameTaken(user.username().to_string()));
        }
        t.users.insert(user.id(), user.clone());
        Ok(())
    }

    async fn delete_user(&self, id: i64) -> Result<bool, StoreError> {
        let mut t = self.tables.write().await;
        if t.users.remove(&id).is_none() {
            return Ok(false);
        }
        let before = t.recipes.len();
        t.recipes.retain(|_, r| r.user_id() != id);
        debug!(user_id = id, recipes = before - t.recipes.len(), "cascaded recipe delete");
        Ok(true)
    }

    async fn create_recipe(&self, new: NewRecipe) -> Result<Recipe, StoreError> {
        let mut t = self.tables.write().await;
        if !t.users.contains_key(&new.user_id()) {
            return Err(StoreError::MissingOwner(new.user_id()));
        }
        t.next_recipe_id += 1;
        let recipe = Recipe::from_parts(t.next_recipe_id, new);
        t.recipes.insert(recipe.id(), recipe.clone());
        Ok(recipe)
    }

    async fn find_recipe(&self, id: i64) -> Result<Option<Recipe>, StoreError> {
        Ok(self.tables.read().await.recipes.get(&id).cloned())
    }

    async fn list_recipes(&self) -> Result<Vec<Recipe>, StoreError> {
        Ok(self.tables.read().await.recipes.values().cloned().collect())
    }

    async fn list_recipes_by_user(&self, user_id: i64) -> Result<Vec<Recipe>, StoreError> {
        let t = self.tables.read().await;
        Ok(t.recipes
            .values()
            .filter(|r| r.user_id() == user_id)
            .cloned()
            .collect())
    }

    async fn update_recipe(&self, recipe: &Recipe) -> Result<(), StoreError> {
        let mut t = self.tables.write().await;
        match t.recipes.get_mut(&recipe.id()) {
            Some(slot) => {
                *slot = recipe.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound {
                entity: "recipe",
                id: recipe.id(),
            }),
        }
    }

    async fn delete_recipe(&self, id: i64) -> Result<bool, StoreError> {
        Ok(self.tables.write().await.recipes.remove(&id).is_some())
    }
}
