use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::handlers::Settings;
use crate::schemas::string_or_none;

/// Body of `POST /save-setting`. Both fields are optional; fields that are
/// not strings are ignored.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SaveSettingsRequest {
    #[serde(default, deserialize_with = "string_or_none")]
    pub api_key: Option<String>,
    #[serde(default, deserialize_with = "string_or_none")]
    pub persona: Option<String>,
}

/// Body of `POST /validate-apikey`.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ValidateKeyRequest {
    #[serde(default, deserialize_with = "string_or_none")]
    pub api_key: Option<String>,
}

/// Outcome envelope shared by the settings endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StatusResponse {
    pub success: bool,
    pub message: String,
}

impl StatusResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

/// Body of `GET /get-setting`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SettingsResponse {
    /// Masked key (`sk-********abcd`), or `""` when none is configured.
    pub api_key: String,
    pub persona: String,
}

impl From<Settings> for SettingsResponse {
    fn from(s: Settings) -> Self {
        Self {
            api_key: s.api_key_masked,
            persona: s.persona,
        }
    }
}
