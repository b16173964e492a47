use crate::{
    AppState,
    pages::{self, MAX_UPLOAD_BYTES},
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};

/// Authenticated Router Module
///
/// The researcher dashboard and the post editor. Every handler here relies on
/// the `require_session` layer added in `create_router`, which puts the
/// authorized `Session` in the request extensions for the `SignedIn`
/// extractor. Ownership of posts is enforced by the content API.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /dashboard
        // The signed-in researcher's posts and counters.
        .route("/dashboard", get(pages::dashboard::dashboard))
        .route(
            "/dashboard/posts/{id}/delete",
            post(pages::dashboard::delete_post),
        )
        // --- Editor ---
        // Multipart forms carrying the featured image and PDF attachments.
        .route(
            "/dashboard/new-post",
            get(pages::editor::new_post).post(pages::editor::create_post),
        )
        .route(
            "/dashboard/edit/{id}",
            get(pages::editor::edit_post).post(pages::editor::update_post),
        )
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}
