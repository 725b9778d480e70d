//! Persistence seam for users and recipes.

use async_trait::async_trait;
use thiserror::Error;

use crate::recipes::repo_types::{NewRecipe, Recipe};
use crate::users::repo_types::{NewUser, User};

pub mod memory;
pub mod postgres;

pub use memory::InMemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("username '{0}' is already taken")]
    UsernameTaken(String),
    #[error("user {0} does not exist")]
    MissingOwner(i64),
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Create/read/update/delete for both entities.
///
/// Implementations enforce `username` uniqueness atomically and delete a
/// user's recipes together with the user.
#[async_trait]
pub trait Store: Send + Sync {
    async fn create_user(&self, new: NewUser) -> Result<User, StoreError>;
    async fn find_user(&self, id: i64) -> Result<Option<User>, StoreError>;
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;
    async fn update_user(&self, user: &User) -> Result<(), StoreError>;
    /// Returns `false` when no such user existed.
    async fn delete_user(&self, id: i64) -> Result<bool, StoreError>;

    async fn create_recipe(&self, new: NewRecipe) -> Result<Recipe, StoreError>;
    async fn find_recipe(&self, id: i64) -> Result<Option<Recipe>, StoreError>;
    async fn list_recipes(&self) -> Result<Vec<Recipe>, StoreError>;
    async fn list_recipes_by_user(&self, user_id: i64) -> Result<Vec<Recipe>, StoreError>;
    async fn update_recipe(&self, recipe: &Recipe) -> Result<(), StoreError>;
    async fn delete_recipe(&self, id: i64) -> Result<bool, StoreError>;
}
