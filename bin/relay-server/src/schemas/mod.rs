//! Request / response DTO (Data Transfer Object) types.
//!
//! These types are used by Axum handlers for JSON (de)serialisation and are
//! annotated with [`utoipa`] attributes to generate an OpenAPI 3.0 schema.

pub mod chat;
pub mod settings;

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Deserialize a field as `Some(string)` only when it is a JSON string; any
/// other JSON value (number, object, `null`, ...) reads as `None`.
pub(crate) fn string_or_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        _ => None,
    })
}
