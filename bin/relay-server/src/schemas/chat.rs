use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::schemas::string_or_none;

/// Body of `POST /chat`.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ChatRequest {
    /// Sent to the model verbatim.
    #[serde(default, deserialize_with = "string_or_none")]
    pub message: Option<String>,
}

/// Body of every `POST /chat` response, including failures.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChatResponse {
    pub reply: String,
}
