//! PostgreSQL store.
//!
//! Expected layout:
//!
//! ```sql
//! CREATE TABLE users (
//!     id            BIGSERIAL PRIMARY KEY,
//!     username      VARCHAR(20)  NOT NULL UNIQUE,
//!     password_hash VARCHAR(128) NOT NULL,
//!     image_url     VARCHAR      NOT NULL,
//!     bio           VARCHAR(240) NOT NULL
//! );
//!
//! CREATE TABLE recipes (
//!     id                  BIGSERIAL PRIMARY KEY,
//!     user_id             BIGINT       NOT NULL REFERENCES users (id),
//!     title               VARCHAR(100) NOT NULL,
//!     instructions        TEXT         NOT NULL,
//!     minutes_to_complete BIGINT       NOT NULL CHECK (minutes_to_complete > 0)
//! );
//! ```

use anyhow::Context;
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, FromRow, PgPool};
use tracing::{debug, error};

use super::{Store, StoreError};
use crate::config::AppConfig;
use crate::recipes::repo_types::{NewRecipe, Recipe};
use crate::users::repo_types::{NewUser, User};

#[derive(Debug, FromRow)]
struct UserRow {
    id: i64,
    username: String,
    password_hash: String,
    image_url: String,
    bio: String,
}

impl From<UserRow> for User {
    fn from(r: UserRow) -> Self {
        User::from_stored(r.id, r.username, r.password_hash, r.image_url, r.bio)
    }
}

#[derive(Debug, FromRow)]
struct RecipeRow {
    id: i64,
    user_id: i64,
    title: String,
    instructions: String,
    minutes_to_complete: i64,
}

impl From<RecipeRow> for Recipe {
    fn from(r: RecipeRow) -> Self {
        Recipe::from_stored(r.id, r.user_id, r.title, r.instructions, r.minutes_to_complete)
    }
}

#[derive(Clone)]
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn connect(config: &AppConfig) -> anyhow::Result<Self> {
        let db = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.database_url)
            .await
            .context("connect to database")?;
        Ok(Self::new(db))
    }
}

fn username_conflict(err: sqlx::Error, username: &str) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::UsernameTaken(username.to_string())
        }
        _ => {
            error!(error = %err, "user write failed");
            StoreError::Database(err)
        }
    }
}

fn missing_owner(err: sqlx::Error, user_id: i64) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
            StoreError::MissingOwner(user_id)
        }
        _ => {
            error!(error = %err, "recipe write failed");
            StoreError::Database(err)
        }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn create_user(&self, new: NewUser) -> Result<User, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (username, password_hash, image_url, bio)
            VALUES ($1, $2, $3, $4)
            RETURNING id, username, password_hash, image_url, bio
            "#,
        )
        .bind(&new.username)
        .bind(new.credential.as_stored())
        .bind(&new.image_url)
        .bind(&new.bio)
        .fetch_one(&self.db)
        .await
        .map_err(|e| username_conflict(e, &new.username))?;
        Ok(row.into())
    }

    async fn find_user(&self, id: i64) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"SELECT id, username, password_hash, image_url, bio FROM users WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(User::from))
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"SELECT id, username, password_hash, image_url, bio FROM users WHERE username = $1"#,
        )
        .bind(username)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(User::from))
    }

    async fn update_user(&self, user: &User) -> Result<(), StoreError> {
        let done = sqlx::query(
            r#"
            UPDATE users
               SET username = $2, password_hash = $3, image_url = $4, bio = $5
             WHERE id = $1
            "#,
        )
        .bind(user.id())
        .bind(user.username())
        .bind(user.credential().as_stored())
        .bind(user.image_url())
        .bind(user.bio())
        .execute(&self.db)
        .await
        .map_err(|e| username_conflict(e, user.username()))?;
        if done.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity: "user",
                id: user.id(),
            });
        }
        Ok(())
    }

    async fn delete_user(&self, id: i64) -> Result<bool, StoreError> {
        let mut tx = self.db.begin().await?;
        let recipes = sqlx::query(r#"DELETE FROM recipes WHERE user_id = $1"#)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let users = sqlx::query(r#"DELETE FROM users WHERE id = $1"#)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        debug!(user_id = id, recipes = recipes.rows_affected(), "cascaded recipe delete");
        Ok(users.rows_affected() > 0)
    }

    async fn create_recipe(&self, new: NewRecipe) -> Result<Recipe, StoreError> {
        let row = sqlx::query_as::<_, RecipeRow>(
            r#"
            INSERT INTO recipes (user_id, title, instructions, minutes_to_complete)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, title, instructions, minutes_to_complete
            "#,
        )
        .bind(new.user_id)
        .bind(&new.title)
        .bind(&new.instructions)
        .bind(new.minutes_to_complete)
        .fetch_one(&self.db)
        .await
        .map_err(|e| missing_owner(e, new.user_id))?;
        Ok(row.into())
    }

    async fn find_recipe(&self, id: i64) -> Result<Option<Recipe>, StoreError> {
        let row = sqlx::query_as::<_, RecipeRow>(
            r#"
            SELECT id, user_id, title, instructions, minutes_to_complete
              FROM recipes
             WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(Recipe::from))
    }

    async fn list_recipes(&self) -> Result<Vec<Recipe>, StoreError> {
        let rows = sqlx::query_as::<_, RecipeRow>(
            r#"
            SELECT id, user_id, title, instructions, minutes_to_complete
              FROM recipes
             ORDER BY id ASC
            "#,
        )
        .fetch_all(&self.db)
        .await?;
        Ok(rows.into_iter().map(Recipe::from).collect())
    }

    async fn list_recipes_by_user(&self, user_id: i64) -> Result<Vec<Recipe>, StoreError> {
        let rows = sqlx::query_as::<_, RecipeRow>(
            r#"
            SELECT id, user_id, title, instructions, minutes_to_complete
              FROM recipes
             WHERE user_id = $1
             ORDER BY id ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;
        Ok(rows.into_iter().map(Recipe::from).collect())
    }

    async fn update_recipe(&self, recipe: &Recipe) -> Result<(), StoreError> {
        let done = sqlx::query(
            r#"
            UPDATE recipes
               SET title = $2, instructions = $3, minutes_to_complete = $4
             WHERE id = $1
            "#,
        )
        .bind(recipe.id())
        .bind(recipe.title())
        .bind(recipe.instructions())
        .bind(recipe.minutes_to_complete())
        .execute(&self.db)
        .await?;
        if done.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity: "recipe",
                id: recipe.id(),
            });
        }
        Ok(())
    }

    async fn delete_recipe(&self, id: i64) -> Result<bool, StoreError> {
        let done = sqlx::query(r#"DELETE FROM recipes WHERE id = $1"#)
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(done.rows_affected() > 0)
    }
}
