//! Persona / API key settings endpoints.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use tracing::info;
use utoipa::OpenApi;

use crate::error::ServerError;
use crate::schemas::settings::{
    SaveSettingsRequest, SettingsResponse, StatusResponse, ValidateKeyRequest,
};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(get_settings, save_settings, validate_api_key),
    components(schemas(
        SaveSettingsRequest,
        SettingsResponse,
        StatusResponse,
        ValidateKeyRequest
    ))
)]
pub struct SettingsApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/get-setting", get(get_settings))
        .route("/save-setting", post(save_settings))
        .route("/validate-apikey", post(validate_api_key))
}

#[utoipa::path(
    get,
    path = "/get-setting",
    tag = "settings",
    responses(
        (status = 200, description = "Current persona and masked API key", body = SettingsResponse),
    )
)]
pub async fn get_settings(State(state): State<Arc<AppState>>) -> Json<SettingsResponse> {
    Json(state.settings.get_settings().into())
}

#[utoipa::path(
    post,
    path = "/save-setting",
    tag = "settings",
    request_body = SaveSettingsRequest,
    responses(
        (status = 200, description = "Settings reconciled", body = StatusResponse),
        (status = 400, description = "Malformed body or unusable key", body = StatusResponse),
        (status = 500, description = "Settings could not be written", body = StatusResponse),
    )
)]
pub async fn save_settings(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SaveSettingsRequest>, JsonRejection>,
) -> Result<Json<StatusResponse>, ServerError> {
    let Json(req) = payload?;
    let outcome = state
        .settings
        .save_settings(req.api_key.as_deref(), req.persona.as_deref())?;
    info!(?outcome, "settings saved");
    Ok(Json(StatusResponse::ok(outcome.message())))
}

#[utoipa::path(
    post,
    path = "/validate-apikey",
    tag = "settings",
    request_body = ValidateKeyRequest,
    responses(
        (status = 200, description = "Key accepted by the completion API", body = StatusResponse),
        (status = 400, description = "No key supplied", body = StatusResponse),
        (status = 401, description = "Key rejected by the completion API", body = StatusResponse),
        (status = 500, description = "Completion API unreachable", body = StatusResponse),
    )
)]
pub async fn validate_api_key(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ValidateKeyRequest>, JsonRejection>,
) -> Result<Json<StatusResponse>, ServerError> {
    let Json(req) = payload?;
    state
        .validator
        .validate(req.api_key.as_deref().unwrap_or_default())
        .await?;
    Ok(Json(StatusResponse::ok("API key is valid")))
}
