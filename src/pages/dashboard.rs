use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
};

use crate::{
    AppState,
    cache::Resource,
    error::SiteResult,
    guard::SignedIn,
    listing::PostStats,
    models::PostQuery,
    pages::{Chrome, finish, load_posts},
};

/// dashboard
///
/// [Authenticated Route] The researcher's own publications with their
/// counters (total, published, drafts, views).
pub async fn dashboard(
    State(state): State<AppState>,
    SignedIn(session): SignedIn,
    chrome: Chrome,
) -> SiteResult<Response> {
    let query = PostQuery::by_author(&session.profile.id);
    let posts = load_posts(&state, Some(session.token()), &session.profile.id, &query).await?;
    let stats = PostStats::of(&posts);

    let mut ctx = chrome.context();
    ctx.insert("posts", &posts);
    ctx.insert("stats", &stats);
    ctx.insert("profile", &session.profile);
    Ok(state.templates.render("dashboard.html", &ctx)?.into_response())
}

/// delete_post
///
/// [Authenticated Route]
pub async fn delete_post(
    State(state): State<AppState>,
    SignedIn(session): SignedIn,
    Path(id): Path<String>,
) -> Response {
    let result = state.api.delete_post(session.token(), &id).await;
    if result.is_ok() {
        tracing::info!(post_id = %id, author = %session.profile.id, "post deleted");
    }
    state.cache.invalidate(&[Resource::Posts, Resource::Media]);
    finish(result, "/dashboard", "Post deleted", "Failed to delete post")
}
