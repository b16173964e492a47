use pilabs_site::{
    ApiState, AppState, HttpContentApi, ListCache, MemoryContentApi, Templates,
    config::{AppConfig, Env},
    create_router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Entry point: configuration, logging, the content API client, templates
/// and the HTTP server.
#[tokio::main]
async fn main() {
    // 1. Configuration & Environment Loading (Fail-Fast)
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    // 2. Logging Filter Setup
    // RUST_LOG wins; otherwise debug for the site and info for tower_http.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "pilabs_site=debug,tower_http=info".into());

    // 3. Pretty logs locally, JSON in production.
    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Site starting in {:?} mode", config.env);

    // 4. Content API
    // Without API_BASE_URL (local only) the seeded in-memory API stands in.
    let api: ApiState = match &config.api_base_url {
        Some(base_url) => {
            tracing::info!(base_url, "using content API over HTTP");
            Arc::new(
                HttpContentApi::new(base_url, config.api_timeout)
                    .expect("FATAL: Failed to build the content API client."),
            )
        }
        None => {
            tracing::warn!("API_BASE_URL not set, serving the in-memory demo content");
            Arc::new(MemoryContentApi::seeded().await)
        }
    };

    // 5. Templates are parsed once; a broken template stops startup here.
    let templates = Templates::new().expect("FATAL: Failed to parse templates.");
    let cache = ListCache::new(config.cache_ttl);

    // 6. Unified State Assembly
    let bind_addr = config.bind_addr.clone();
    let app_state = AppState {
        api,
        cache,
        templates,
        config,
    };

    // 7. Router and Server Startup
    let app = create_router(app_state);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .expect("FATAL: Failed to bind the HTTP listener.");

    tracing::info!("Listening on {bind_addr}");

    axum::serve(listener, app)
        .await
        .expect("FATAL: HTTP server terminated unexpectedly.");
}
