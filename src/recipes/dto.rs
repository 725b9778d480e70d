use serde::Deserialize;
use serde_json::Value;

use super::repo_types::{NewRecipe, Recipe};
use crate::users::dto::USER_SHAPE;
use crate::users::repo_types::User;
use crate::validation::{into_typed, FieldRule, Shape, ValidationErrors};

pub const TITLE_LENGTH: &str = "Title must be between 1 and 100 characters.";
pub const INSTRUCTIONS_LENGTH: &str = "Instructions cannot be less than 50 characters.";
pub const MINUTES_POSITIVE: &str = "Minutes to complete must be a positive integer.";
pub const OWNER_IMMUTABLE: &str = "Recipe owner cannot be changed.";

/// Owner fields nested under a dumped recipe.
const OWNER_FIELDS: &[&str] = &["id", "username"];

/// `RecipeSchema`: inbound recipe payloads and outbound recipes.
pub static RECIPE_SHAPE: Shape = Shape {
    name: "RecipeSchema",
    fields: &[
        FieldRule::int("id").dump_only(),
        FieldRule::string("title")
            .required()
            .length_with(Some(1), Some(100), TITLE_LENGTH),
        FieldRule::string("instructions")
            .required()
            .length_with(Some(50), None, INSTRUCTIONS_LENGTH),
        FieldRule::int("minutes_to_complete")
            .required()
            .check(positive),
        FieldRule::int("user_id").load_only().required(),
        FieldRule::nested("user", user_shape, false, Some(OWNER_FIELDS)),
    ],
};

fn user_shape() -> &'static Shape {
    &USER_SHAPE
}

fn positive(value: &Value) -> Result<(), &'static str> {
    match value.as_i64() {
        Some(n) if n <= 0 => Err(MINUTES_POSITIVE),
        _ => Ok(()),
    }
}

/// Creation payload that passed `RECIPE_SHAPE`.
#[derive(Debug, Deserialize)]
pub(crate) struct RecipeInput {
    pub title: String,
    pub instructions: String,
    pub minutes_to_complete: i64,
    pub user_id: i64,
}

impl RecipeInput {
    pub fn load(payload: &Value) -> Result<Self, ValidationErrors> {
        RECIPE_SHAPE.load_as(payload)
    }

    pub fn into_new_recipe(self) -> NewRecipe {
        NewRecipe {
            user_id: self.user_id,
            title: self.title,
            instructions: self.instructions,
            minutes_to_complete: self.minutes_to_complete,
        }
    }
}

/// Update payload that passed `RECIPE_SHAPE` in partial mode. The owner is
/// fixed at creation, so `user_id` is refused here.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct RecipePatch {
    pub title: Option<String>,
    pub instructions: Option<String>,
    pub minutes_to_complete: Option<i64>,
}

impl RecipePatch {
    pub fn load(payload: &Value) -> Result<Self, ValidationErrors> {
        let loaded = RECIPE_SHAPE.load_partial(payload);
        if payload.get("user_id").is_some() {
            let mut errors = loaded.err().unwrap_or_default();
            errors.add("user_id", OWNER_IMMUTABLE);
            return Err(errors);
        }
        into_typed(loaded?)
    }

    pub fn apply(self, recipe: &mut Recipe) {
        if let Some(title) = self.title {
            recipe.set_title(title);
        }
        if let Some(instructions) = self.instructions {
            recipe.set_instructions(instructions);
        }
        if let Some(minutes) = self.minutes_to_complete {
            recipe.set_minutes_to_complete(minutes);
        }
    }
}

/// Outbound representation of `recipe`; `owner` is reduced to id and
/// username and `user_id` is not echoed.
pub fn dump_recipe(recipe: &Recipe, owner: &User) -> Value {
    let record = recipe.to_record(owner.to_record(Vec::new()));
    Value::Object(RECIPE_SHAPE.dump(&record))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::password::cheap_hasher;
    use crate::users::repo_types::NewUser;
    use crate::validation::{MISSING, NOT_AN_INTEGER};
    use serde_json::json;

    fn messages(errs: &ValidationErrors, field: &str) -> Vec<String> {
        errs.field(field).map(<[String]>::to_vec).unwrap_or_default()
    }

    fn valid_payload() -> Value {
        json!({
            "title": "Shakshuka",
            "instructions": "Simmer tomatoes and peppers, crack eggs in, cover and cook gently.",
            "minutes_to_complete": 25,
            "user_id": 1,
        })
    }

    #[test]
    fn valid_payload_loads() {
        let input = RecipeInput::load(&valid_payload()).unwrap();
        let new = input.into_new_recipe();
        assert_eq!(new.title(), "Shakshuka");
        assert_eq!(new.minutes_to_complete(), 25);
        assert_eq!(new.user_id(), 1);
    }

    #[test]
    fn short_instructions_and_zero_minutes_are_reported_together() {
        let errs = RecipeInput::load(&json!({
            "title": "T",
            "instructions": "x".repeat(49),
            "minutes_to_complete": 0,
            "user_id": 1,
        }))
        .unwrap_err();
        assert_eq!(errs.fields().collect::<Vec<_>>(), vec!["instructions", "minutes_to_complete"]);
        assert_eq!(messages(&errs, "instructions"), vec![INSTRUCTIONS_LENGTH]);
        assert_eq!(messages(&errs, "minutes_to_complete"), vec![MINUTES_POSITIVE]);
        assert!(errs.field("title").is_none());
    }

    #[test]
    fn minutes_rule_fires_exactly_for_non_positive_values() {
        for minutes in [-30, -1, 0] {
            let mut payload = valid_payload();
            payload["minutes_to_complete"] = json!(minutes);
            let errs = RecipeInput::load(&payload).unwrap_err();
            assert_eq!(messages(&errs, "minutes_to_complete"), vec![MINUTES_POSITIVE]);
        }
        for minutes in [1, 2, 600] {
            let mut payload = valid_payload();
            payload["minutes_to_complete"] = json!(minutes);
            assert!(RecipeInput::load(&payload).is_ok());
        }
    }

    #[test]
    fn title_bounds_use_custom_message() {
        for bad in [String::new(), "t".repeat(101)] {
            let mut payload = valid_payload();
            payload["title"] = json!(bad);
            let errs = RecipeInput::load(&payload).unwrap_err();
            assert_eq!(messages(&errs, "title"), vec![TITLE_LENGTH]);
        }
    }

    #[test]
    fn every_required_field_is_reported() {
        let errs = RecipeInput::load(&json!({})).unwrap_err();
        for field in ["title", "instructions", "minutes_to_complete", "user_id"] {
            assert_eq!(messages(&errs, field), vec![MISSING], "{field}");
        }
    }

    #[test]
    fn non_integer_minutes_skip_the_positive_check() {
        let mut payload = valid_payload();
        payload["minutes_to_complete"] = json!("soon");
        let errs = RecipeInput::load(&payload).unwrap_err();
        assert_eq!(messages(&errs, "minutes_to_complete"), vec![NOT_AN_INTEGER]);
    }

    #[test]
    fn patch_refuses_owner_change() {
        let errs = RecipePatch::load(&json!({"user_id": 2})).unwrap_err();
        assert_eq!(messages(&errs, "user_id"), vec![OWNER_IMMUTABLE]);

        let errs = RecipePatch::load(&json!({"user_id": 2, "minutes_to_complete": -4})).unwrap_err();
        assert_eq!(messages(&errs, "user_id"), vec![OWNER_IMMUTABLE]);
        assert_eq!(messages(&errs, "minutes_to_complete"), vec![MINUTES_POSITIVE]);
    }

    #[test]
    fn patch_applies_present_fields_only() {
        let mut recipe = Recipe::from_parts(5, RecipeInput::load(&valid_payload()).unwrap().into_new_recipe());
        RecipePatch::load(&json!({"minutes_to_complete": 30}))
            .unwrap()
            .apply(&mut recipe);
        assert_eq!(recipe.minutes_to_complete(), 30);
        assert_eq!(recipe.title(), "Shakshuka");
        assert_eq!(recipe.user_id(), 1);
    }

    #[test]
    fn dump_nests_only_owner_id_and_username() {
        let owner = User::from_parts(
            1,
            NewUser::new(&cheap_hasher(), "chefjoe", "abcdef")
                .unwrap()
                .with_bio("Secret bio")
                .with_image_url("https://img.example/joe.png"),
        );
        let recipe = Recipe::from_parts(5, RecipeInput::load(&valid_payload()).unwrap().into_new_recipe());
        let out = dump_recipe(&recipe, &owner);
        assert_eq!(out["user"], json!({"id": 1, "username": "chefjoe"}));
        assert_eq!(out["id"], json!(5));
        let obj = out.as_object().unwrap();
        assert!(!obj.contains_key("user_id"));
        let text = out.to_string();
        assert!(!text.contains("Secret bio"));
        assert!(!text.contains("joe.png"));
        assert!(!text.contains("argon2"));
    }
}
