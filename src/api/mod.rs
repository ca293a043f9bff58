mod handlers;

use std::sync::Arc;

use axum::{routing::get, Router};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::Settings;
use crate::query::DecodeOptions;
use crate::registry::FragmentSource;

/// Shared, read-only request context.
#[derive(Clone)]
pub struct AppState {
    pub source: Arc<dyn FragmentSource>,
    pub public_host: String,
    pub decode: DecodeOptions,
}

impl AppState {
    pub fn new(source: Arc<dyn FragmentSource>, settings: &Settings) -> Self {
        Self {
            source,
            public_host: settings.public_host.clone(),
            decode: settings.decode_options(),
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Ignore files
        .route("/api", get(handlers::ignore_usage))
        .route("/api/", get(handlers::ignore_usage))
        .route("/api/templates", get(handlers::list_templates))
        .route("/api/{slugs}", get(handlers::ignore_file))
        // Guardrail rule files
        .route("/api/guardrails", get(handlers::guardrails_usage))
        .route("/api/guardrails/", get(handlers::guardrails_usage))
        .route("/api/guardrails/{technologies}", get(handlers::rules_file))
        .route("/api/guardrails-index", get(handlers::guardrails_index))
        // Installer scripts
        .route("/api/init", get(handlers::init_script))
        // Health
        .route("/health", get(handlers::health))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
