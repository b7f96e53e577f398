//! Chat endpoint.
//!
//! Always answers `200 OK` with a `{reply}` body once the request body has
//! been parsed; upstream failures are reported inside the reply text.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::error::ServerError;
use crate::schemas::chat::{ChatRequest, ChatResponse};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(paths(chat), components(schemas(ChatRequest, ChatResponse)))]
pub struct ChatApi;

/// Register chat routes.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/chat", post(chat))
}

#[utoipa::path(
    post,
    path = "/chat",
    tag = "chat",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Model reply, or a message describing why there is none", body = ChatResponse),
        (status = 400, description = "Body is not valid JSON"),
    )
)]
pub async fn chat(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ServerError> {
    let Json(req) = payload?;
    let reply = state
        .chat
        .chat(req.message.as_deref().unwrap_or_default())
        .await;
    Ok(Json(ChatResponse { reply }))
}
