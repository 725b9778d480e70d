use serde::Serialize;

use crate::validation::Record;

/// Recipe record as held by the store. `user_id` is fixed at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Recipe {
    id: i64,
    user_id: i64,
    title: String,
    instructions: String,
    minutes_to_complete: i64,
}

impl Recipe {
    pub(crate) fn from_parts(id: i64, new: NewRecipe) -> Self {
        Self {
            id,
            user_id: new.user_id,
            title: new.title,
            instructions: new.instructions,
            minutes_to_complete: new.minutes_to_complete,
        }
    }

    pub(crate) fn from_stored(
        id: i64,
        user_id: i64,
        title: String,
        instructions: String,
        minutes_to_complete: i64,
    ) -> Self {
        Self {
            id,
            user_id,
            title,
            instructions,
            minutes_to_complete,
        }
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn user_id(&self) -> i64 {
        self.user_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn instructions(&self) -> &str {
        &self.instructions
    }

    pub fn minutes_to_complete(&self) -> i64 {
        self.minutes_to_complete
    }

    pub(crate) fn set_title(&mut self, title: String) {
        self.title = title;
    }

    pub(crate) fn set_instructions(&mut self, instructions: String) {
        self.instructions = instructions;
    }

    pub(crate) fn set_minutes_to_complete(&mut self, minutes: i64) {
        self.minutes_to_complete = minutes;
    }

    /// All columns plus the owner's record under `user`.
    pub(crate) fn to_record(&self, owner: Record) -> Record {
        let mut record = Record::new();
        record.insert("id".into(), self.id.into());
        record.insert("title".into(), self.title.clone().into());
        record.insert("instructions".into(), self.instructions.clone().into());
        record.insert("minutes_to_complete".into(), self.minutes_to_complete.into());
        record.insert("user_id".into(), self.user_id.into());
        record.insert("user".into(), owner.into());
        record
    }
}

/// A validated recipe that has not been persisted yet. Only the recipe
/// shape produces these, so `minutes_to_complete` is always positive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecipe {
    pub(crate) user_id: i64,
    pub(crate) title: String,
    pub(crate) instructions: String,
    pub(crate) minutes_to_complete: i64,
}

impl NewRecipe {
    pub fn user_id(&self) -> i64 {
        self.user_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn instructions(&self) -> &str {
        &self.instructions
    }

    pub fn minutes_to_complete(&self) -> i64 {
        self.minutes_to_complete
    }
}
