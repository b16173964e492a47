use crate::{
    AppState,
    pages::{self, MAX_UPLOAD_BYTES},
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};

/// Admin Router Module
///
/// Moderation of posts and media, nested under `/admin`. The whole router is
/// wrapped in `guard::require_admin`; researchers and anonymous visitors are
/// sent to `/login` before any handler runs.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /admin?tab=overview|posts|researchers|responses
        .route("/", get(pages::admin::admin_dashboard))
        // --- Post moderation ---
        .route("/posts/{id}/approve", post(pages::admin::approve_post))
        // Feedback is mandatory.
        .route("/posts/{id}/reject", post(pages::admin::reject_post))
        // --- Gallery ---
        .route(
            "/gallery/upload",
            post(pages::gallery::upload_image).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/gallery/media/{id}", post(pages::gallery::update_image))
        .route(
            "/gallery/media/{id}/approve",
            post(pages::gallery::approve_image),
        )
        .route(
            "/gallery/media/{id}/delete",
            post(pages::gallery::delete_image),
        )
        .route(
            "/gallery/categories/{id}",
            post(pages::gallery::rename_category),
        )
        .route(
            "/gallery/categories/{id}/delete",
            post(pages::gallery::delete_category),
        )
        // --- Videos ---
        .route("/videos", post(pages::videos::submit_video))
        .route("/videos/{id}/approve", post(pages::videos::approve_video))
        .route("/videos/{id}/delete", post(pages::videos::delete_video))
}
