//! Whole-record evaluation.
//!
//! Runs every row of the field table against a raw submission and either
//! returns the normalized [`RegistrationRecord`] or every field error found.
//! Rule violations are values; only contract violations (a non-object
//! submission, a non-string field) come back as [`SchemaError`].

use crate::config::RulesConfig;
use crate::record::{Field, RegistrationRecord};
use crate::rules::{FieldError, RuleSet};
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// Submission shape the evaluator cannot work with
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("submission must be an object, got {0}")]
    NotAnObject(&'static str),
    #[error("field '{field}' must be a string, got {found}")]
    NotAString { field: Field, found: &'static str },
}

/// Outcome of validating one submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Validation {
    Valid { value: RegistrationRecord },
    Invalid { errors: Vec<FieldError> },
}

impl Validation {
    pub fn is_valid(&self) -> bool {
        matches!(self, Validation::Valid { .. })
    }

    pub fn record(&self) -> Option<&RegistrationRecord> {
        match self {
            Validation::Valid { value } => Some(value),
            Validation::Invalid { .. } => None,
        }
    }

    pub fn errors(&self) -> &[FieldError] {
        match self {
            Validation::Valid { .. } => &[],
            Validation::Invalid { errors } => errors,
        }
    }
}

/// Stateless registration validator
#[derive(Debug, Clone)]
pub struct Validator {
    rules: RuleSet,
}

impl Validator {
    pub fn new(config: &RulesConfig) -> Self {
        Self {
            rules: RuleSet::new(config),
        }
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Validate a raw JSON submission. Unknown keys are ignored and `null`
    /// counts as absent.
    pub fn validate(&self, raw: &Value) -> Result<Validation, SchemaError> {
        let object = raw
            .as_object()
            .ok_or_else(|| SchemaError::NotAnObject(json_type(raw)))?;
        self.validate_object(object)
    }

    /// Validate `key=value` style pairs, as collected from a command line or
    /// a form post. Later duplicates win.
    pub fn validate_fields<'a, I>(&self, fields: I) -> Result<Validation, SchemaError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let object: Map<String, Value> = fields
            .into_iter()
            .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
            .collect();
        self.validate_object(&object)
    }

    fn validate_object(&self, object: &Map<String, Value>) -> Result<Validation, SchemaError> {
        let mut record = RegistrationRecord::default();
        let mut errors = Vec::new();

        for rule in self.rules.rules() {
            let raw = lookup(object, rule.field)?;
            match self.rules.check(rule, raw) {
                Ok(value) => record.set(rule.field, value),
                Err(err) => errors.push(err),
            }
        }

        if errors.is_empty() {
            Ok(Validation::Valid { value: record })
        } else {
            Ok(Validation::Invalid { errors })
        }
    }
}

/// Find a field by its exact camelCase key; any other key is ignored
fn lookup(object: &Map<String, Value>, field: Field) -> Result<Option<&str>, SchemaError> {
    match object.get(field.as_str()) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(other) => Err(SchemaError::NotAString {
            field,
            found: json_type(other),
        }),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
