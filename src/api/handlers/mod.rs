use axum::{
    extract::{Path, RawQuery, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use super::AppState;
use crate::engine::{Engine, EngineError, Policy};
use crate::models::{Format, Fragment, GuardrailsIndex, SelectionState, Surface, TEXT_PLAIN};
use crate::query::{self, QueryParams};
use crate::registry::{Catalog, RegistryError, Scope};
use crate::render::{self, Rendered};

// ============================================================
// Error Handling
// ============================================================

/// Errors surfaced to API clients.
///
/// Unknown slugs and missing fragments are 404s with a body naming what was
/// wrong. Storage and upstream failures are logged in full server-side and
/// returned as a 502 with a generic message to avoid leaking internal details.
#[derive(Debug)]
pub enum ApiError {
    Engine(EngineError),
    Registry(RegistryError),
}

impl From<EngineError> for ApiError {
    fn from(e: EngineError) -> Self {
        ApiError::Engine(e)
    }
}

impl From<RegistryError> for ApiError {
    fn from(e: RegistryError) -> Self {
        ApiError::Registry(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Engine(EngineError::InvalidSlugs {
                namespace,
                invalid,
                available,
            }) => plain_text(
                StatusCode::NOT_FOUND,
                format!(
                    "Unknown {}: {}\n\nAvailable: {}\n",
                    namespace.label(),
                    invalid.join(", "),
                    available.join(", ")
                ),
            ),
            ApiError::Engine(EngineError::Fetch(e)) | ApiError::Registry(e) => registry_error(e),
        }
    }
}

fn registry_error(e: RegistryError) -> Response {
    match e {
        RegistryError::NotFound { .. } | RegistryError::InvalidSlug(_) => {
            tracing::warn!("Fragment missing: {}", e);
            plain_text(StatusCode::NOT_FOUND, format!("{}\n", e))
        }
        _ => {
            tracing::error!("Registry error: {}", e);
            plain_text(
                StatusCode::BAD_GATEWAY,
                "Failed to load templates. Try again later.\n".to_string(),
            )
        }
    }
}

fn plain_text(status: StatusCode, body: String) -> Response {
    (status, [(header::CONTENT_TYPE, TEXT_PLAIN)], body).into_response()
}

fn rendered(output: Rendered) -> Response {
    ([(header::CONTENT_TYPE, output.content_type)], output.body).into_response()
}

fn params(state: &AppState, raw: Option<String>) -> QueryParams {
    query::decode_with(raw.as_deref().unwrap_or_default(), state.decode)
}

fn tool_list() -> String {
    Format::ALL
        .iter()
        .map(|f| f.rules_slug())
        .collect::<Vec<_>>()
        .join(", ")
}

// ============================================================
// Health
// ============================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ============================================================
// Registry listings
// ============================================================

pub async fn list_templates(State(state): State<AppState>) -> Result<Json<Vec<Fragment>>, ApiError> {
    let catalog = Catalog::load(state.source.as_ref(), Scope::Templates).await?;
    Ok(Json(catalog.templates))
}

pub async fn guardrails_index(State(state): State<AppState>) -> Result<Json<GuardrailsIndex>, ApiError> {
    let catalog = Catalog::load(state.source.as_ref(), Scope::Guardrails).await?;
    Ok(Json(catalog.guardrails))
}

// ============================================================
// Ignore files
// ============================================================

pub async fn ignore_usage(State(state): State<AppState>) -> Response {
    ignore_usage_text(&state)
}

fn ignore_usage_text(state: &AppState) -> Response {
    let host = &state.public_host;
    plain_text(
        StatusCode::OK,
        format!(
            "Usage: curl -L {host}/api/react,node,typescript\n\n\
             Parameters:\n  \
             o= format: aiignore, cursorignore, claudeignore, codeiumignore, aiexclude, geminiignore\n\n\
             See https://{host} for available templates.\n"
        ),
    )
}

pub async fn ignore_file(
    State(state): State<AppState>,
    Path(slugs): Path<String>,
    RawQuery(raw): RawQuery,
) -> Result<Response, ApiError> {
    let mut selection = SelectionState::from_query(Surface::Ignore, &params(&state, raw));
    selection.templates = query::parse_slug_list(&slugs);
    if selection.templates.is_empty() {
        return Ok(ignore_usage_text(&state));
    }

    let mut engine = Engine::load(
        state.source.clone(),
        Scope::Templates,
        state.public_host.as_str(),
        Policy::Strict,
    )
    .await?;
    let doc = engine.ignore_document(&selection).await?;
    Ok(rendered(render::render_text(&doc)))
}

// ============================================================
// Guardrail rule files
// ============================================================

pub async fn guardrails_usage(State(state): State<AppState>) -> Response {
    guardrails_usage_text(&state)
}

fn guardrails_usage_text(state: &AppState) -> Response {
    let host = &state.public_host;
    plain_text(
        StatusCode::OK,
        format!(
            "Usage: curl -L {host}/api/guardrails/react,node?o=cursor\n\n\
             Parameters:\n  \
             c= guardrails categories (optional filter)\n  \
             o= tool: {tools}\n\n\
             See https://{host}/guardrails for available technologies.\n",
            tools = tool_list()
        ),
    )
}

pub async fn rules_file(
    State(state): State<AppState>,
    Path(technologies): Path<String>,
    RawQuery(raw): RawQuery,
) -> Result<Response, ApiError> {
    let mut selection = SelectionState::from_query(Surface::Guardrails, &params(&state, raw));
    selection.technologies = query::parse_slug_list(&technologies);
    if selection.technologies.is_empty() {
        return Ok(guardrails_usage_text(&state));
    }

    let mut engine = Engine::load(
        state.source.clone(),
        Scope::Guardrails,
        state.public_host.as_str(),
        Policy::Strict,
    )
    .await?;
    let doc = engine.rules_document(&selection).await?;
    Ok(rendered(render::render_text(&doc)))
}

// ============================================================
// Installer scripts
// ============================================================

fn init_usage_text(state: &AppState) -> Response {
    let host = &state.public_host;
    plain_text(
        StatusCode::OK,
        format!(
            "Usage: curl -sL \"{host}/api/init?t=react,node?g=react,node?o=cursor\" | sh\n\n\
             Parameters:\n  \
             t= ignore templates (comma-separated)\n  \
             g= guardrails technologies (comma-separated)\n  \
             c= guardrails categories (optional filter)\n  \
             o= tool: {tools}\n  \
             s= shell: sh (default), ps (PowerShell)\n\n\
             Examples:\n  \
             curl -sL \"{host}/api/init?t=react,node?g=react,node\" | sh\n  \
             iex (iwr \"{host}/api/init?t=react,node?g=react,node?o=cursor?s=ps\").Content\n\n\
             See https://{host} for available templates and technologies.\n",
            tools = tool_list()
        ),
    )
}

pub async fn init_script(
    State(state): State<AppState>,
    RawQuery(raw): RawQuery,
) -> Result<Response, ApiError> {
    let selection = SelectionState::from_query(Surface::Init, &params(&state, raw));
    let scope = match (selection.templates.is_empty(), selection.technologies.is_empty()) {
        (true, true) => return Ok(init_usage_text(&state)),
        (false, true) => Scope::Templates,
        (true, false) => Scope::Guardrails,
        (false, false) => Scope::All,
    };

    let mut engine = Engine::load(
        state.source.clone(),
        scope,
        state.public_host.as_str(),
        Policy::Strict,
    )
    .await?;
    let script = engine.installer(&selection).await?;
    Ok(rendered(script))
}
