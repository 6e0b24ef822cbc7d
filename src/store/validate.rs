//! Structural validation of untrusted config JSON.
//!
//! Input comes from the local cache, the remote `content` column, or an
//! imported file, so it is checked field by field before any typed decode.
//! The result names the first offending field; nothing here panics.

use serde_json::{Map, Value};

use crate::cards::{Card, SectionConfig};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("config must be a JSON object")]
    NotAnObject,
    #[error("field `{field}` must be {expected}")]
    Field { field: &'static str, expected: &'static str },
    #[error("items[{index}] must be a JSON object")]
    ItemNotAnObject { index: usize },
    #[error("items[{index}].{field} must be {expected}")]
    ItemField { index: usize, field: &'static str, expected: &'static str },
    #[error("config could not be decoded: {0}")]
    Decode(String),
}

pub type Validation = Result<(), ValidationError>;

/// Check that `raw` has the shape of a `SectionConfig<C>`.
///
/// # Errors
///
/// Returns the first structural mismatch found.
pub fn validate<C: Card>(raw: &Value) -> Validation {
    let Some(object) = raw.as_object() else {
        return Err(ValidationError::NotAnObject);
    };

    for field in ["sectionTitle", "sectionSubtitle"] {
        if !object.get(field).is_some_and(Value::is_string) {
            return Err(ValidationError::Field { field, expected: "a string" });
        }
    }

    let Some(items) = object.get("items").and_then(Value::as_array) else {
        return Err(ValidationError::Field { field: "items", expected: "an array" });
    };

    for (index, item) in items.iter().enumerate() {
        let Some(item) = item.as_object() else {
            return Err(ValidationError::ItemNotAnObject { index });
        };
        validate_item::<C>(index, item)?;
    }

    Ok(())
}

/// Boolean form of [`validate`].
#[must_use]
pub fn is_valid<C: Card>(raw: &Value) -> bool {
    validate::<C>(raw).is_ok()
}

/// Validate, then decode into the typed config.
///
/// # Errors
///
/// Returns a structural error, or `Decode` if serde still rejects the value.
pub fn decode<C: Card>(raw: &Value) -> Result<SectionConfig<C>, ValidationError> {
    validate::<C>(raw)?;
    serde_json::from_value(raw.clone()).map_err(|e| ValidationError::Decode(e.to_string()))
}

fn validate_item<C: Card>(index: usize, item: &Map<String, Value>) -> Validation {
    for &field in C::TEXT_FIELDS {
        if !item.get(field).is_some_and(Value::is_string) {
            return Err(ValidationError::ItemField { index, field, expected: "a string" });
        }
    }

    for &field in C::OPTIONAL_TEXT_FIELDS {
        match item.get(field) {
            None | Some(Value::Null | Value::String(_)) => {}
            Some(_) => return Err(ValidationError::ItemField { index, field, expected: "a string or null" }),
        }
    }

    if !item.get("enabled").is_some_and(Value::is_boolean) {
        return Err(ValidationError::ItemField { index, field: "enabled", expected: "a boolean" });
    }

    // Any number sorts; normalization rewrites it to the item's index.
    if !item.get("order").is_some_and(Value::is_number) {
        return Err(ValidationError::ItemField { index, field: "order", expected: "a number" });
    }

    Ok(())
}

#[cfg(test)]
#[path = "validate_test.rs"]
mod tests;
