use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// The persisted JSON document.
///
/// Only `persona` and `chats` are part of the schema; unknown fields found
/// on disk (such as a legacy `apiKey`) are ignored on load and therefore
/// dropped by the next save.  `null` or mistyped text fields read as empty
/// so a hand-edited document keeps its history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreDocument {
    #[serde(default, deserialize_with = "lenient_string")]
    pub persona: String,
    /// Append-only, in submission order.
    #[serde(default, deserialize_with = "null_as_default")]
    pub chats: Vec<Exchange>,
}

/// One user message and the assistant reply it produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exchange {
    #[serde(default, deserialize_with = "lenient_string")]
    pub user: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub ai: String,
    /// Milliseconds since the Unix epoch; absent in entries written by
    /// versions that did not record it.
    #[serde(
        default,
        with = "chrono::serde::ts_milliseconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub time: Option<DateTime<Utc>>,
}

impl Exchange {
    pub fn now(user: impl Into<String>, ai: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            ai: ai.into(),
            time: Some(Utc::now()),
        }
    }
}

/// Strings as-is; any other JSON value becomes `""`.
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        _ => String::new(),
    })
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
