use crate::routes::{chat, health, settings};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(info(
    title = "relay-server",
    description = "Persona chat relay API",
    version = "0.1.0",
))]
pub struct ApiDoc;

pub fn get_docs() -> utoipa::openapi::OpenApi {
    let mut root = ApiDoc::openapi();
    root.merge(health::HealthApi::openapi());
    root.merge(settings::SettingsApi::openapi());
    root.merge(chat::ChatApi::openapi());
    root
}
