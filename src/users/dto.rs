use serde::Deserialize;
use serde_json::Value;

use super::password::PasswordHasher;
use super::repo_types::{NewUser, User, DEFAULT_BIO, DEFAULT_IMAGE_URL};
use crate::recipes::dto::RECIPE_SHAPE;
use crate::recipes::repo_types::Recipe;
use crate::validation::{FieldRule, Shape, ValidationErrors};

pub const USERNAME_SPACES: &str = "Username cannot contain spaces.";
pub const PASSWORD_REQUIRED: &str = "Password is required.";

/// `UserSchema`: inbound registration/update payloads and outbound users.
pub static USER_SHAPE: Shape = Shape {
    name: "UserSchema",
    fields: &[
        FieldRule::int("id").dump_only(),
        FieldRule::string("username")
            .required()
            .length(Some(3), Some(20))
            .check(no_spaces),
        FieldRule::string("image_url"),
        FieldRule::string("bio").length(None, Some(240)),
        FieldRule::string("password")
            .load_only()
            .required_with(PASSWORD_REQUIRED)
            .length(Some(6), None),
        FieldRule::nested("recipes", recipe_shape, true, None),
    ],
};

fn recipe_shape() -> &'static Shape {
    &RECIPE_SHAPE
}

fn no_spaces(value: &Value) -> Result<(), &'static str> {
    match value.as_str() {
        Some(s) if s.contains(' ') => Err(USERNAME_SPACES),
        _ => Ok(()),
    }
}

/// Registration payload that passed `USER_SHAPE`.
#[derive(Debug, Deserialize)]
pub(crate) struct UserInput {
    pub username: String,
    pub password: String,
    pub image_url: Option<String>,
    pub bio: Option<String>,
}

impl UserInput {
    pub fn load(payload: &Value) -> Result<Self, ValidationErrors> {
        USER_SHAPE.load_as(payload)
    }

    pub fn into_new_user(self, hasher: &PasswordHasher) -> anyhow::Result<NewUser> {
        let new = NewUser::new(hasher, self.username, &self.password)?;
        Ok(new
            .with_image_url(self.image_url.unwrap_or_else(|| DEFAULT_IMAGE_URL.to_string()))
            .with_bio(self.bio.unwrap_or_else(|| DEFAULT_BIO.to_string())))
    }
}

/// Update payload that passed `USER_SHAPE` in partial mode.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct UserPatch {
    pub username: Option<String>,
    pub password: Option<String>,
    pub image_url: Option<String>,
    pub bio: Option<String>,
}

impl UserPatch {
    pub fn load(payload: &Value) -> Result<Self, ValidationErrors> {
        USER_SHAPE.load_partial_as(payload)
    }

    pub fn apply(self, user: &mut User, hasher: &PasswordHasher) -> anyhow::Result<()> {
        if let Some(username) = self.username {
            user.set_username(username);
        }
        if let Some(password) = self.password {
            user.set_password(hasher, &password)?;
        }
        if let Some(image_url) = self.image_url {
            user.set_image_url(image_url);
        }
        if let Some(bio) = self.bio {
            user.set_bio(bio);
        }
        Ok(())
    }
}

/// Outbound representation of `user` with its `recipes` nested in full.
pub fn dump_user(user: &User, recipes: &[Recipe]) -> Value {
    let owner = user.to_record(Vec::new());
    let recipes = recipes
        .iter()
        .map(|r| Value::Object(r.to_record(owner.clone())))
        .collect();
    Value::Object(USER_SHAPE.dump(&user.to_record(recipes)))
}
