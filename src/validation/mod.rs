//! Declarative payload shapes.
//!
//! A [`Shape`] is a static table of [`FieldRule`]s. One engine evaluates the
//! table: [`Shape::load`] validates an inbound JSON payload and collects every
//! violation keyed by field name, [`Shape::dump`] filters a record for
//! outbound use (load-only fields dropped, nested shapes applied).

use std::collections::BTreeMap;
use std::fmt;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Field name -> value map produced by `load` and consumed by `dump`.
pub type Record = Map<String, Value>;

/// Custom predicate evaluated after a field passed its structural rules.
pub type Check = fn(&Value) -> Result<(), &'static str>;

pub const MISSING: &str = "Missing data for required field.";
pub const NULL: &str = "Field may not be null.";
pub const UNKNOWN: &str = "Unknown field.";
pub const INVALID_INPUT: &str = "Invalid input type.";
pub const NOT_A_STRING: &str = "Not a valid string.";
pub const NOT_AN_INTEGER: &str = "Not a valid integer.";

/// Key used for errors that concern the payload as a whole.
pub const SCHEMA_KEY: &str = "_schema";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Both,
    /// Accepted on input, never emitted (plaintext password, owner id).
    LoadOnly,
    /// Emitted on output, never accepted (system-assigned ids, relations).
    DumpOnly,
}

#[derive(Clone, Copy)]
pub enum FieldType {
    Str,
    Int,
    Nested {
        shape: fn() -> &'static Shape,
        many: bool,
        only: Option<&'static [&'static str]>,
    },
}

#[derive(Debug, Clone, Copy)]
pub struct Length {
    pub min: Option<usize>,
    pub max: Option<usize>,
    pub message: Option<&'static str>,
}

impl Length {
    fn check(&self, value: &str) -> Result<(), String> {
        let len = value.chars().count();
        let too_short = self.min.is_some_and(|min| len < min);
        let too_long = self.max.is_some_and(|max| len > max);
        if !too_short && !too_long {
            return Ok(());
        }
        if let Some(message) = self.message {
            return Err(message.to_string());
        }
        Err(match (self.min, self.max) {
            (Some(min), Some(max)) => format!("Length must be between {min} and {max}."),
            (Some(min), None) => format!("Shorter than minimum length {min}."),
            (None, Some(max)) => format!("Longer than maximum length {max}."),
            (None, None) => String::new(),
        })
    }
}

#[derive(Clone, Copy)]
pub struct FieldRule {
    pub name: &'static str,
    pub kind: FieldType,
    pub direction: Direction,
    pub required: bool,
    pub required_message: Option<&'static str>,
    pub length: Option<Length>,
    pub check: Option<Check>,
}

impl FieldRule {
    const fn new(name: &'static str, kind: FieldType) -> Self {
        Self {
            name,
            kind,
            direction: Direction::Both,
            required: false,
            required_message: None,
            length: None,
            check: None,
        }
    }

    pub const fn string(name: &'static str) -> Self {
        Self::new(name, FieldType::Str)
    }

    pub const fn int(name: &'static str) -> Self {
        Self::new(name, FieldType::Int)
    }

    /// Nested fields are output-only.
    pub const fn nested(
        name: &'static str,
        shape: fn() -> &'static Shape,
        many: bool,
        only: Option<&'static [&'static str]>,
    ) -> Self {
        Self::new(name, FieldType::Nested { shape, many, only }).dump_only()
    }

    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub const fn required_with(mut self, message: &'static str) -> Self {
        self.required = true;
        self.required_message = Some(message);
        self
    }

    pub const fn load_only(mut self) -> Self {
        self.direction = Direction::LoadOnly;
        self
    }

    pub const fn dump_only(mut self) -> Self {
        self.direction = Direction::DumpOnly;
        self
    }

    pub const fn length(mut self, min: Option<usize>, max: Option<usize>) -> Self {
        self.length = Some(Length {
            min,
            max,
            message: None,
        });
        self
    }

    pub const fn length_with(
        mut self,
        min: Option<usize>,
        max: Option<usize>,
        message: &'static str,
    ) -> Self {
        self.length = Some(Length {
            min,
            max,
            message: Some(message),
        });
        self
    }

    pub const fn check(mut self, check: Check) -> Self {
        self.check = Some(check);
        self
    }

    fn loadable(&self) -> bool {
        self.direction != Direction::DumpOnly
    }

    fn dumpable(&self) -> bool {
        self.direction != Direction::LoadOnly
    }

    /// Presence, null, type and length rules.
    fn load_value(&self, raw: &Value) -> Result<Value, String> {
        if raw.is_null() {
            return Err(NULL.to_string());
        }
        let value = match self.kind {
            FieldType::Str => match raw {
                Value::String(_) => raw.clone(),
                _ => return Err(NOT_A_STRING.to_string()),
            },
            FieldType::Int => coerce_int(raw)
                .map(Value::from)
                .ok_or_else(|| NOT_AN_INTEGER.to_string())?,
            FieldType::Nested { .. } => raw.clone(),
        };
        if let (Some(length), Some(text)) = (self.length, value.as_str()) {
            length.check(text)?;
        }
        Ok(value)
    }
}

fn coerce_int(raw: &Value) -> Option<i64> {
    match raw {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= i64::MIN as f64 && *f <= i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

pub struct Shape {
    pub name: &'static str,
    pub fields: &'static [FieldRule],
}

impl fmt::Debug for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shape")
            .field("name", &self.name)
            .field("fields", &self.fields.iter().map(|r| r.name).collect::<Vec<_>>())
            .finish()
    }
}

impl Shape {
    pub fn field(&self, name: &str) -> Option<&FieldRule> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Validate a full payload; every required field must be present.
    pub fn load(&self, payload: &Value) -> Result<Record, ValidationErrors> {
        self.load_with(payload, false)
    }

    /// Validate an update payload: required-ness is not enforced, every
    /// other rule is.
    pub fn load_partial(&self, payload: &Value) -> Result<Record, ValidationErrors> {
        self.load_with(payload, true)
    }

    pub fn load_as<T: DeserializeOwned>(&self, payload: &Value) -> Result<T, ValidationErrors> {
        into_typed(self.load(payload)?)
    }

    pub fn load_partial_as<T: DeserializeOwned>(
        &self,
        payload: &Value,
    ) -> Result<T, ValidationErrors> {
        into_typed(self.load_partial(payload)?)
    }

    fn load_with(&self, payload: &Value, partial: bool) -> Result<Record, ValidationErrors> {
        let Some(input) = payload.as_object() else {
            let mut errors = ValidationErrors::default();
            errors.add(SCHEMA_KEY, INVALID_INPUT);
            return Err(errors);
        };

        let mut errors = ValidationErrors::default();
        for key in input.keys() {
            if !self.field(key).is_some_and(FieldRule::loadable) {
                errors.add(key, UNKNOWN);
            }
        }

        let mut record = Record::new();
        for rule in self.fields.iter().filter(|f| f.loadable()) {
            match input.get(rule.name) {
                None if rule.required && !partial => {
                    errors.add(rule.name, rule.required_message.unwrap_or(MISSING));
                }
                None => {}
                Some(raw) => match rule.load_value(raw) {
                    Ok(value) => {
                        record.insert(rule.name.to_string(), value);
                    }
                    Err(message) => errors.add(rule.name, message),
                },
            }
        }

        for rule in self.fields {
            if let (Some(check), Some(value)) = (rule.check, record.get(rule.name)) {
                if let Err(message) = check(value) {
                    errors.add(rule.name, message);
                }
            }
        }

        if errors.is_empty() {
            Ok(record)
        } else {
            Err(errors)
        }
    }

    pub fn dump(&self, record: &Record) -> Record {
        self.dump_fields(record, None)
    }

    fn dump_fields(&self, record: &Record, only: Option<&[&str]>) -> Record {
        let mut out = Record::new();
        for rule in self.fields.iter().filter(|f| f.dumpable()) {
            if only.is_some_and(|names| !names.contains(&rule.name)) {
                continue;
            }
            let Some(value) = record.get(rule.name) else {
                continue;
            };
            let dumped = match rule.kind {
                FieldType::Nested { shape, many, only } => dump_nested(shape(), value, many, only),
                FieldType::Str | FieldType::Int => value.clone(),
            };
            out.insert(rule.name.to_string(), dumped);
        }
        out
    }
}

/// Convert a loaded record into a typed value.
pub fn into_typed<T: DeserializeOwned>(record: Record) -> Result<T, ValidationErrors> {
    serde_json::from_value(Value::Object(record)).map_err(|e| {
        let mut errors = ValidationErrors::default();
        errors.add(SCHEMA_KEY, e.to_string());
        errors
    })
}

fn dump_nested(shape: &Shape, value: &Value, many: bool, only: Option<&[&str]>) -> Value {
    match value {
        Value::Array(items) if many => Value::Array(
            items
                .iter()
                .map(|item| dump_nested(shape, item, false, only))
                .collect(),
        ),
        Value::Object(record) => Value::Object(shape.dump_fields(record, only)),
        _ => Value::Null,
    }
}

/// Every violation found in one payload, keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Error)]
#[serde(transparent)]
#[error("validation failed for {} field(s)", .0.len())]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn field(&self, name: &str) -> Option<&[String]> {
        self.0.get(name).map(Vec::as_slice)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn into_inner(self) -> BTreeMap<String, Vec<String>> {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn not_blank(value: &Value) -> Result<(), &'static str> {
        match value.as_str() {
            Some(s) if s.trim().is_empty() => Err("Must not be blank."),
            _ => Ok(()),
        }
    }

    static TAG: Shape = Shape {
        name: "Tag",
        fields: &[
            FieldRule::int("id").dump_only(),
            FieldRule::string("label").required().length(Some(2), Some(5)),
        ],
    };

    fn tag() -> &'static Shape {
        &TAG
    }

    static NOTE: Shape = Shape {
        name: "Note",
        fields: &[
            FieldRule::int("id").dump_only(),
            FieldRule::string("body")
                .required_with("Body please.")
                .length(Some(1), None)
                .check(not_blank),
            FieldRule::int("rank"),
            FieldRule::string("secret").load_only(),
            FieldRule::nested("tags", tag, true, None),
            FieldRule::nested("main_tag", tag, false, Some(&["label"])),
        ],
    };

    #[test]
    fn accepts_valid_payload_and_coerces_ints() {
        let record = NOTE
            .load(&json!({"body": "hello", "rank": "7", "secret": "s"}))
            .expect("payload is valid");
        assert_eq!(record["body"], json!("hello"));
        assert_eq!(record["rank"], json!(7));
        assert_eq!(record["secret"], json!("s"));
    }

    #[test]
    fn integral_floats_pass_and_fractions_and_bools_fail() {
        assert_eq!(NOTE.load(&json!({"body": "b", "rank": 3.0})).unwrap()["rank"], json!(3));
        let errs = NOTE.load(&json!({"body": "b", "rank": 3.5})).unwrap_err();
        assert_eq!(errs.field("rank"), Some(&[NOT_AN_INTEGER.to_string()][..]));
        let errs = NOTE.load(&json!({"body": "b", "rank": true})).unwrap_err();
        assert_eq!(errs.field("rank"), Some(&[NOT_AN_INTEGER.to_string()][..]));
    }

    #[test]
    fn collects_every_violation() {
        let errs = NOTE
            .load(&json!({"id": 3, "rank": "x", "colour": "red"}))
            .unwrap_err();
        assert_eq!(errs.len(), 4);
        assert_eq!(errs.field("body"), Some(&["Body please.".to_string()][..]));
        assert_eq!(errs.field("rank"), Some(&[NOT_AN_INTEGER.to_string()][..]));
        assert_eq!(errs.field("id"), Some(&[UNKNOWN.to_string()][..]));
        assert_eq!(errs.field("colour"), Some(&[UNKNOWN.to_string()][..]));
    }

    #[test]
    fn null_and_wrong_type_are_structural_errors() {
        let errs = NOTE.load(&json!({"body": null})).unwrap_err();
        assert_eq!(errs.field("body"), Some(&[NULL.to_string()][..]));
        let errs = NOTE.load(&json!({"body": 12})).unwrap_err();
        assert_eq!(errs.field("body"), Some(&[NOT_A_STRING.to_string()][..]));
    }

    #[test]
    fn predicate_runs_only_after_structural_rules_pass() {
        let errs = NOTE.load(&json!({"body": "   "})).unwrap_err();
        assert_eq!(errs.field("body"), Some(&["Must not be blank.".to_string()][..]));
        // empty string fails length first, predicate is skipped
        let errs = NOTE.load(&json!({"body": ""})).unwrap_err();
        assert_eq!(
            errs.field("body"),
            Some(&["Shorter than minimum length 1.".to_string()][..])
        );
    }

    #[test]
    fn default_length_messages_count_characters() {
        let errs = TAG.load(&json!({"label": "a"})).unwrap_err();
        assert_eq!(
            errs.field("label"),
            Some(&["Length must be between 2 and 5.".to_string()][..])
        );
        assert!(TAG.load(&json!({"label": "ééééé"})).is_ok());
    }

    #[test]
    fn non_object_payload_is_rejected_as_a_whole() {
        let errs = NOTE.load(&json!(["body"])).unwrap_err();
        assert_eq!(errs.field(SCHEMA_KEY), Some(&[INVALID_INPUT.to_string()][..]));
    }

    #[test]
    fn partial_load_skips_required_but_keeps_other_rules() {
        let record = NOTE.load_partial(&json!({"rank": 2})).expect("partial ok");
        assert_eq!(record.len(), 1);
        let errs = NOTE.load_partial(&json!({"body": ""})).unwrap_err();
        assert!(errs.field("body").is_some());
    }

    #[test]
    fn dump_drops_load_only_and_applies_nested_only() {
        let record: Record = serde_json::from_value(json!({
            "id": 1,
            "body": "hi",
            "secret": "hidden",
            "tags": [{"id": 5, "label": "x"}],
            "main_tag": {"id": 5, "label": "x"},
        }))
        .unwrap();
        let out = Value::Object(NOTE.dump(&record));
        assert_eq!(
            out,
            json!({
                "id": 1,
                "body": "hi",
                "tags": [{"id": 5, "label": "x"}],
                "main_tag": {"label": "x"},
            })
        );
    }

    #[test]
    fn errors_serialize_as_field_map() {
        let mut errs = ValidationErrors::default();
        errs.add("a", "one");
        errs.add("a", "two");
        assert_eq!(serde_json::to_value(&errs).unwrap(), json!({"a": ["one", "two"]}));
        assert_eq!(errs.to_string(), "validation failed for 1 field(s)");
    }
}
