use axum::{
    Router,
    extract::FromRef,
    http::HeaderName,
    middleware,
};

use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Content API client and its in-memory counterpart.
pub mod backend;
pub mod memory;
pub mod models;

// Request-scoped state: session, access control, flash messages, language.
pub mod flash;
pub mod guard;
pub mod i18n;
pub mod session;

// Rendering and the logic behind the pages.
pub mod cache;
pub mod config;
pub mod editor;
pub mod error;
pub mod listing;
pub mod pages;
pub mod templates;

// Module for routing segregation (Public, Authenticated, Admin).
pub mod routes;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use backend::{ApiState, ContentApi, HttpContentApi};
pub use cache::ListCache;
pub use config::AppConfig;
pub use memory::MemoryContentApi;
pub use templates::Templates;

/// AppState
///
/// Everything a handler may need, shared by all requests. Cloning is cheap:
/// every field is reference-counted or small.
#[derive(Clone)]
pub struct AppState {
    /// The content API, over HTTP or in memory.
    pub api: ApiState,
    /// Short-lived cache of list responses.
    pub cache: ListCache,
    pub templates: Templates,
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for ApiState {
    fn from_ref(app_state: &AppState) -> ApiState {
        app_state.api.clone()
    }
}

impl FromRef<AppState> for Templates {
    fn from_ref(app_state: &AppState) -> Templates {
        app_state.templates.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// create_router
///
/// Assembles the three router tiers, applies the guards as route layers and
/// wraps everything in the flash and observability layers.
pub fn create_router(state: AppState) -> Router {
    // Header name constant for Request Correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        // Public Routes: No guard.
        .merge(public::public_routes())
        // Researcher tier: any valid session.
        .merge(
            authenticated::authenticated_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                guard::require_session,
            )),
        )
        // Admin tier: nested under '/admin', `super_admin` only.
        .nest(
            "/admin",
            admin::admin_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                guard::require_admin,
            )),
        )
        .fallback(pages::not_found)
        .layer(middleware::from_fn(flash::flash_middleware))
        .with_state(state);

    base_router.layer(
        ServiceBuilder::new()
            // Request ID Generation: a UUID for every incoming request.
            .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
            // Request Tracing: one span per request, carrying the request ID.
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(trace_span_logger)
                    .on_response(
                        DefaultOnResponse::new()
                            .level(Level::INFO)
                            .latency_unit(tower_http::LatencyUnit::Millis),
                    ),
            )
            // Request ID Propagation: echo x-request-id back to the client.
            .layer(PropagateRequestIdLayer::new(x_request_id)),
    )
}

/// trace_span_logger
///
/// Span for `TraceLayer`: method, URI and the `x-request-id` set above, so
/// every log line of one request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
