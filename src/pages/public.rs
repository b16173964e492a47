use axum::{
    Form,
    extract::{Path, Query, State},
    http::{HeaderValue, header},
    response::{IntoResponse, Redirect, Response},
};
use serde::{Deserialize, Serialize};

use crate::{
    AppState,
    error::{SiteError, SiteResult},
    flash::Flash,
    i18n::{LANGUAGE_COOKIE, Language},
    listing::PublicationFilter,
    models::{ContactRequest, PostQuery, PostStatus, PostType},
    pages::{Chrome, load_categories, load_posts, local_path, redirect_with, render_not_found},
    session::{self, build_cookie},
};

/// home
///
/// [Public Route] Landing page with the three most recent publications.
pub async fn home(State(state): State<AppState>, chrome: Chrome) -> SiteResult<Response> {
    // Anonymous on purpose: the landing page only ever shows published work.
    let latest = load_posts(&state, None, "public", &PostQuery::latest(3)).await?;

    let mut ctx = chrome.context();
    ctx.insert("latest", &latest);
    Ok(state.templates.render("home.html", &ctx)?.into_response())
}

/// Renders one of the static marketing pages.
async fn static_page(state: &AppState, chrome: &Chrome, template: &str) -> SiteResult<Response> {
    Ok(state
        .templates
        .render(template, &chrome.context())?
        .into_response())
}

pub async fn about(State(state): State<AppState>, chrome: Chrome) -> SiteResult<Response> {
    static_page(&state, &chrome, "about.html").await
}

pub async fn work(State(state): State<AppState>, chrome: Chrome) -> SiteResult<Response> {
    static_page(&state, &chrome, "work.html").await
}

pub async fn centers(State(state): State<AppState>, chrome: Chrome) -> SiteResult<Response> {
    static_page(&state, &chrome, "centers.html").await
}

pub async fn ecosystem(State(state): State<AppState>, chrome: Chrome) -> SiteResult<Response> {
    static_page(&state, &chrome, "ecosystem.html").await
}

/// publications
///
/// [Public Route] The library of published posts, filtered server-side by
/// search term, category and type (`?q=&category=&type=`).
pub async fn publications(
    State(state): State<AppState>,
    chrome: Chrome,
    Query(filter): Query<PublicationFilter>,
) -> SiteResult<Response> {
    let posts = load_posts(&state, None, "public", &PostQuery::published()).await?;
    let categories = load_categories(&state).await?;
    let total = posts.len();
    let posts = filter.apply(posts);

    let types: Vec<(&str, &str)> = PostType::ALL
        .iter()
        .map(|t| {
            let label = match t {
                PostType::Research => "Research Article",
                PostType::FieldStudy => "Field Study",
                _ => "Expert Opinion",
            };
            (t.as_str(), label)
        })
        .collect();

    let mut ctx = chrome.context();
    ctx.insert("posts", &posts);
    ctx.insert("total", &total);
    ctx.insert("categories", &categories);
    ctx.insert("types", &types);
    ctx.insert("filter", &filter);
    ctx.insert("filtering", &filter.is_active());
    Ok(state.templates.render("publications.html", &ctx)?.into_response())
}

/// A downloadable attachment as listed under a post.
#[derive(Serialize)]
struct DocumentLink {
    id: String,
    name: String,
}

/// post_detail
///
/// [Public Route] A single post by slug, with its downloadable attachments.
/// Authors and administrators can preview unpublished posts.
pub async fn post_detail(
    State(state): State<AppState>,
    chrome: Chrome,
    Path(slug): Path<String>,
) -> SiteResult<Response> {
    let post = match state.api.get_post(chrome.token(), &slug).await {
        Ok(post) => post,
        Err(SiteError::NotFound) => return Ok(render_not_found(&state, &chrome)),
        Err(e) => return Err(e),
    };

    let documents: Vec<DocumentLink> = post
        .documents()
        .map(|m| DocumentLink {
            id: m.id.clone(),
            name: m.display_name(),
        })
        .collect();

    let mut ctx = chrome.context();
    ctx.insert("post", &post);
    ctx.insert("documents", &documents);
    ctx.insert("is_preview", &(post.status != PostStatus::Published));
    Ok(state.templates.render("post_detail.html", &ctx)?.into_response())
}

/// download_media
///
/// [Public Route] Proxies an attachment download from the content API so the
/// browser never needs to know the API's address.
pub async fn download_media(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> SiteResult<Response> {
    let download = state.api.download_media(&id).await?;
    let disposition = format!(
        "attachment; filename=\"{}\"",
        download.filename.replace(['"', '\\', '\r', '\n'], "_")
    );

    let content_type = HeaderValue::from_str(&download.content_type)
        .unwrap_or(HeaderValue::from_static("application/octet-stream"));
    let disposition = HeaderValue::from_str(&disposition)
        .unwrap_or(HeaderValue::from_static("attachment"));

    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        download.bytes,
    )
        .into_response())
}

// --- Contact ---

fn render_contact(
    state: &AppState,
    chrome: &Chrome,
    form: &ContactRequest,
    error: Option<String>,
    sent: bool,
) -> SiteResult<Response> {
    let mut ctx = chrome.context();
    ctx.insert("form", form);
    ctx.insert("error", &error);
    ctx.insert("sent", &sent);
    Ok(state.templates.render("contact.html", &ctx)?.into_response())
}

pub async fn contact(State(state): State<AppState>, chrome: Chrome) -> SiteResult<Response> {
    render_contact(&state, &chrome, &ContactRequest::default(), None, false)
}

/// submit_contact
///
/// [Public Route] Sends the contact form. Success re-renders the page with
/// empty fields and a confirmation; failure keeps what was typed.
pub async fn submit_contact(
    State(state): State<AppState>,
    chrome: Chrome,
    Form(form): Form<ContactRequest>,
) -> SiteResult<Response> {
    if form.name.trim().is_empty() || form.message.trim().is_empty() || !form.email.contains('@') {
        let message = "Please provide your name, a valid email and a message.".to_string();
        return render_contact(&state, &chrome, &form, Some(message), false);
    }

    match state.api.submit_contact(&form).await {
        Ok(()) => {
            state.cache.invalidate(&[crate::cache::Resource::Contact]);
            tracing::info!("contact message received");
            render_contact(&state, &chrome, &ContactRequest::default(), None, true)
        }
        Err(e) => {
            tracing::warn!(error = %e, "contact submission failed");
            render_contact(&state, &chrome, &form, Some(e.user_message()), false)
        }
    }
}

// --- Session ---

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

fn render_login(
    state: &AppState,
    chrome: &Chrome,
    email: &str,
    error: Option<&str>,
) -> SiteResult<Response> {
    let mut ctx = chrome.context();
    ctx.insert("email", email);
    ctx.insert("error", &error);
    ctx.insert("demo", &state.config.api_base_url.is_none());
    Ok(state.templates.render("login.html", &ctx)?.into_response())
}

/// login_page
///
/// [Public Route] Signed-in visitors go straight to their dashboard.
pub async fn login_page(State(state): State<AppState>, chrome: Chrome) -> SiteResult<Response> {
    if chrome.session.is_some() {
        return Ok(Redirect::to("/dashboard").into_response());
    }
    render_login(&state, &chrome, "", None)
}

/// login
///
/// [Public Route] Exchanges the credentials for a session cookie.
pub async fn login(
    State(state): State<AppState>,
    chrome: Chrome,
    Form(form): Form<LoginForm>,
) -> SiteResult<Response> {
    match session::sign_in(state.api.as_ref(), &state.config, &form.email, &form.password).await {
        Ok((_, cookie)) => Ok(([(header::SET_COOKIE, cookie)], Redirect::to("/dashboard")).into_response()),
        Err(e) => {
            let message = match &e {
                SiteError::Validation(message) => message.clone(),
                SiteError::Api { message, .. } if !message.is_empty() => message.clone(),
                SiteError::Unauthorized => "Invalid email or password".to_string(),
                other => {
                    tracing::error!(error = %other, "sign in failed");
                    "An unexpected error occurred".to_string()
                }
            };
            render_login(&state, &chrome, &form.email, Some(&message))
        }
    }
}

/// logout
///
/// Clears the session and returns to the public root.
pub async fn logout() -> Response {
    (
        [(header::SET_COOKIE, session::sign_out())],
        Redirect::to("/"),
    )
        .into_response()
}

// --- Language ---

#[derive(Debug, Deserialize)]
pub struct NextPath {
    next: Option<String>,
}

/// set_language
///
/// Persists the interface language in a cookie and returns to `next`.
pub async fn set_language(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Query(NextPath { next }): Query<NextPath>,
) -> Response {
    let back = local_path(next.as_deref(), "/");
    let Some(lang) = Language::from_code(&code) else {
        return redirect_with(&back, Flash::error("Unsupported language"));
    };

    let cookie = build_cookie(
        LANGUAGE_COOKIE,
        lang.code(),
        std::time::Duration::from_secs(365 * 24 * 60 * 60),
        &state.config.env,
    );
    ([(header::SET_COOKIE, cookie)], Redirect::to(&back)).into_response()
}
