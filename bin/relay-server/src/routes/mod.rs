//! Axum router construction.
//!
//! [`build`] assembles the complete application router, including:
//! - Middleware layers (CORS, per-request trace-ID injection)
//! - Optional Swagger UI / OpenAPI spec endpoint (disable with `RELAY_ENABLE_SWAGGER=false`)
//! - Health / heartbeat route
//! - Settings and chat routes

mod chat;
pub mod doc;
mod health;
mod settings;

use axum::{middleware, Router};
use std::sync::Arc;
use tower::ServiceBuilder;
use utoipa_swagger_ui::SwaggerUi;

use crate::middleware::{cors, trace};
use crate::state::AppState;

// ── Router builder ────────────────────────────────────────────────────────────

/// Build the complete Axum [`Router`] for the application.
pub fn build(state: Arc<AppState>) -> Router {
    let mut app = Router::new()
        .merge(health::router())
        .merge(settings::router())
        .merge(chat::router());

    if state.config.enable_swagger {
        app = app.merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", doc::get_docs()));
    }

    app
        // ServiceBuilder applies layers top to bottom: trace runs outermost.
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(trace::trace_middleware))
                .layer(cors::cors_layer(&state.config)),
        )
        .with_state(state)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
