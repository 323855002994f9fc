//! Strict parsing of model replies against a draft's JSON Schema.

use schemars::{schema_for, JsonSchema};
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::normalize::strip_code_fence;
use super::GenerationError;

/// JSON Schema for `T`, as sent to the generation service.
pub fn schema_of<T: JsonSchema>() -> Value {
    schema_for!(T).to_value()
}

/// Result of parsing a raw reply into `T`.
#[derive(Debug)]
pub enum ParseOutcome<T> {
    Ok(T),
    /// The reply is not JSON at all.
    ParseError { raw: String, reason: String },
    /// The reply is JSON but does not fit the schema. One entry per field.
    ValidationError(Vec<String>),
}

impl<T> ParseOutcome<T> {
    pub fn into_result(self) -> Result<T, GenerationError> {
        match self {
            Self::Ok(value) => Ok(value),
            Self::ParseError { raw, reason } => {
                Err(GenerationError::MalformedResponse { raw, reason })
            }
            Self::ValidationError(errors) => Err(GenerationError::SchemaValidationFailed { errors }),
        }
    }
}

/// Normalizes fences, parses JSON, validates against `T`'s schema and
/// deserializes.
pub fn parse_json<T: JsonSchema + DeserializeOwned>(raw: &str) -> ParseOutcome<T> {
    let body = strip_code_fence(raw);
    let value: Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(e) => {
            return ParseOutcome::ParseError {
                raw: raw.to_string(),
                reason: e.to_string(),
            }
        }
    };

    let schema = schema_of::<T>();
    let validator = match jsonschema::validator_for(&schema) {
        Ok(validator) => validator,
        Err(e) => return ParseOutcome::ValidationError(vec![format!("invalid schema: {e}")]),
    };

    let errors: Vec<String> = validator
        .iter_errors(&value)
        .map(|e| {
            let path = e.instance_path.to_string();
            if path.is_empty() {
                e.to_string()
            } else {
                format!("{path}: {e}")
            }
        })
        .collect();
    if !errors.is_empty() {
        return ParseOutcome::ValidationError(errors);
    }

    match serde_json::from_value(value) {
        Ok(parsed) => ParseOutcome::Ok(parsed),
        Err(e) => ParseOutcome::ValidationError(vec![e.to_string()]),
    }
}
