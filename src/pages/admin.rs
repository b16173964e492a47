use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::{
    AppState,
    cache::Resource,
    error::SiteResult,
    flash::Flash,
    guard::SignedIn,
    listing::DashboardStats,
    models::{ContactSubmission, Post, PostQuery, Profile, RejectRequest, Role},
    pages::{Chrome, finish, load_posts, redirect_with},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AdminTab {
    Overview,
    Posts,
    Researchers,
    Responses,
}

impl AdminTab {
    /// Unknown or missing tabs show the overview.
    pub fn parse(tab: Option<&str>) -> Self {
        match tab {
            Some("posts") => AdminTab::Posts,
            Some("researchers") => AdminTab::Researchers,
            Some("responses") => AdminTab::Responses,
            _ => AdminTab::Overview,
        }
    }

    fn href(self) -> &'static str {
        match self {
            AdminTab::Overview => "/admin",
            AdminTab::Posts => "/admin?tab=posts",
            AdminTab::Researchers => "/admin?tab=researchers",
            AdminTab::Responses => "/admin?tab=responses",
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TabQuery {
    tab: Option<String>,
}

/// admin_dashboard
///
/// [Admin Route] Overview counters, the moderation queue, the researcher
/// directory and contact responses, one tab at a time (`?tab=`).
pub async fn admin_dashboard(
    State(state): State<AppState>,
    SignedIn(session): SignedIn,
    chrome: Chrome,
    Query(TabQuery { tab }): Query<TabQuery>,
) -> SiteResult<Response> {
    let tab = AdminTab::parse(tab.as_deref());
    let token = session.token();

    let posts = load_posts(&state, Some(token), &session.profile.id, &PostQuery::default()).await?;
    let researchers: Vec<Profile> = state
        .cache
        .get_or_load(Resource::Users, &session.profile.id, "role=researcher", || {
            state.api.list_users(token, Some(Role::Researcher))
        })
        .await?;
    let responses: Vec<ContactSubmission> = state
        .cache
        .get_or_load(Resource::Contact, &session.profile.id, "", || {
            state.api.list_contact_submissions(token)
        })
        .await?;

    let stats = DashboardStats::of(&posts, &researchers);
    let pending: Vec<&Post> = posts.iter().filter(|p| p.status.is_pending()).collect();

    let mut ctx = chrome.context();
    ctx.insert("tab", &tab);
    ctx.insert("stats", &stats);
    ctx.insert("pending", &pending);
    ctx.insert("researchers", &researchers);
    ctx.insert("responses", &responses);
    ctx.insert(
        "tabs",
        &[
            ("overview", "Overview", AdminTab::Overview.href()),
            ("posts", "Posts", AdminTab::Posts.href()),
            ("researchers", "Researchers", AdminTab::Researchers.href()),
            ("responses", "Responses", AdminTab::Responses.href()),
        ],
    );
    Ok(state.templates.render("admin.html", &ctx)?.into_response())
}

/// approve_post
///
/// [Admin Route] Publishes a pending post.
pub async fn approve_post(
    State(state): State<AppState>,
    SignedIn(session): SignedIn,
    Path(id): Path<String>,
) -> Response {
    let result = state.api.approve_post(session.token(), &id).await;
    state.cache.invalidate(&[Resource::Posts]);
    finish(
        result,
        AdminTab::Posts.href(),
        "Post approved and published",
        "Failed to approve post",
    )
}

#[derive(Debug, Deserialize)]
pub struct RejectForm {
    #[serde(default)]
    pub feedback: String,
}

/// reject_post
///
/// [Admin Route] Rejects a pending post. Feedback for the author is mandatory.
pub async fn reject_post(
    State(state): State<AppState>,
    SignedIn(session): SignedIn,
    Path(id): Path<String>,
    Form(form): Form<RejectForm>,
) -> Response {
    let feedback = form.feedback.trim();
    if feedback.is_empty() {
        return redirect_with(
            AdminTab::Posts.href(),
            Flash::error("Please provide feedback for rejection"),
        );
    }

    let request = RejectRequest {
        feedback: feedback.to_string(),
    };
    let result = state.api.reject_post(session.token(), &id, &request).await;
    state.cache.invalidate(&[Resource::Posts]);
    finish(
        result,
        AdminTab::Posts.href(),
        "Post rejected",
        "Failed to reject post",
    )
}
