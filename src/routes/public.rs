use crate::{AppState, pages};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Marketing pages, the content library and the session endpoints. Handlers
/// pass the visitor's token (if any) to the content API, which decides what
/// unpublished content an author or administrator may preview.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for the load balancer.
        .route("/health", get(|| async { "ok" }))
        .route("/", get(pages::public::home))
        .route("/about", get(pages::public::about))
        .route("/work", get(pages::public::work))
        .route("/centers", get(pages::public::centers))
        .route("/ecosystem", get(pages::public::ecosystem))
        // GET /publications?q=&category=&type=
        // Published posts, filtered server-side.
        .route("/publications", get(pages::public::publications))
        .route("/posts/{slug}", get(pages::public::post_detail))
        // GET /media/{id}/download
        // Attachment download proxied from the content API.
        .route("/media/{id}/download", get(pages::public::download_media))
        .route("/gallery", get(pages::gallery::gallery))
        .route("/videos", get(pages::videos::videos))
        .route(
            "/contact",
            get(pages::public::contact).post(pages::public::submit_contact),
        )
        // --- Session ---
        .route(
            "/login",
            get(pages::public::login_page).post(pages::public::login),
        )
        .route("/logout", post(pages::public::logout))
        // GET /language/{code}?next=/path
        .route("/language/{code}", get(pages::public::set_language))
}
