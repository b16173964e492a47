//! Page handlers. Every page loads what it needs through the `ContentApi`
//! (lists go through the `ListCache`), then renders a tera template on top of
//! the shared `Chrome` context.

use axum::{
    extract::{FromRef, FromRequestParts, Multipart, State},
    http::{StatusCode, header, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use chrono::{Datelike, Utc};
use serde::Serialize;
use std::{collections::HashMap, convert::Infallible};
use tera::Context;

use crate::{
    AppState,
    cache::Resource,
    config::AppConfig,
    error::{SiteError, SiteResult},
    flash::{Flash, IncomingFlash},
    i18n::Language,
    models::{
        Category, ImageCategory, Media, MediaQuery, Post, PostQuery, UploadFile, query_string,
    },
    session::{CurrentSession, Session},
};

pub mod admin;
pub mod dashboard;
pub mod editor;
pub mod gallery;
pub mod public;
pub mod videos;

/// Largest request body accepted by the upload forms.
pub const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

#[derive(Serialize)]
struct NavLink {
    label: &'static str,
    href: &'static str,
}

const NAV: &[NavLink] = &[
    NavLink { label: "About", href: "/about" },
    NavLink { label: "Work", href: "/work" },
    NavLink { label: "Centers", href: "/centers" },
    NavLink { label: "Ecosystem", href: "/ecosystem" },
    NavLink { label: "Publications", href: "/publications" },
    NavLink { label: "Multimedia", href: "/videos" },
    NavLink { label: "Gallery", href: "/gallery" },
    NavLink { label: "Contact", href: "/contact" },
];

#[derive(Serialize)]
struct LanguageOption {
    code: &'static str,
    name: &'static str,
}

/// Chrome
///
/// Per-request state every page template needs: who is signed in, the
/// interface language, the pending flash message and the current path.
#[derive(Debug, Clone)]
pub struct Chrome {
    pub session: Option<Session>,
    pub lang: Language,
    pub flash: Option<Flash>,
    pub path: String,
}

impl<S> FromRequestParts<S> for Chrome
where
    S: Send + Sync,
    AppConfig: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let CurrentSession(session) = CurrentSession::from_request_parts(parts, state).await?;
        let lang = Language::from_request_parts(parts, state).await?;
        let IncomingFlash(flash) = IncomingFlash::from_request_parts(parts, state).await?;
        Ok(Chrome {
            session,
            lang,
            flash,
            path: parts.uri.path().to_string(),
        })
    }
}

impl Chrome {
    pub fn token(&self) -> Option<&str> {
        self.session.as_ref().map(Session::token)
    }

    pub fn is_admin(&self) -> bool {
        self.session.as_ref().is_some_and(Session::is_admin)
    }

    /// Cache scope: what this visitor is allowed to see.
    pub fn scope(&self) -> &str {
        self.session
            .as_ref()
            .map(|s| s.profile.id.as_str())
            .unwrap_or("public")
    }

    /// Base template context.
    pub fn context(&self) -> Context {
        let mut ctx = Context::new();
        ctx.insert("nav", NAV);
        ctx.insert("path", &self.path);
        ctx.insert("year", &Utc::now().year());
        ctx.insert("flash", &self.flash);

        ctx.insert("signed_in", &self.session.is_some());
        ctx.insert("is_admin", &self.is_admin());
        ctx.insert(
            "user_name",
            &self.session.as_ref().map(|s| s.profile.display_name()),
        );

        let languages: Vec<LanguageOption> = Language::ALL
            .iter()
            .map(|l| LanguageOption {
                code: l.code(),
                name: l.native_name(),
            })
            .collect();
        ctx.insert("languages", &languages);
        ctx.insert("lang", self.lang.code());
        ctx.insert("t", &self.lang.translations());
        ctx
    }
}

/// Post/redirect/get: sends the visitor to `to` with a one-shot message.
pub fn redirect_with(to: &str, flash: Flash) -> Response {
    ([(header::SET_COOKIE, flash.cookie())], Redirect::to(to)).into_response()
}

/// finish
///
/// Turns the result of a mutation into a redirect back to `back` carrying a
/// success or failure message. An expired session still ends at `/login`.
pub fn finish(result: SiteResult<()>, back: &str, done: &str, failed: &str) -> Response {
    match result {
        Ok(()) => redirect_with(back, Flash::success(done)),
        Err(SiteError::Unauthorized) => SiteError::Unauthorized.into_response(),
        Err(e) => {
            tracing::warn!(error = %e, back, "{failed}");
            redirect_with(back, Flash::error(format!("{failed}: {}", e.user_message())))
        }
    }
}

/// Redirect target for "back to where the form was": only local paths are honoured.
/// Browsers treat `\` like `/`, so `/\host` leaves the site just as `//host` does.
pub fn local_path(candidate: Option<&str>, fallback: &'static str) -> String {
    match candidate {
        Some(path) if is_local_path(path) => path.to_string(),
        _ => fallback.to_string(),
    }
}

fn is_local_path(path: &str) -> bool {
    path.starts_with('/')
        && !path.starts_with("//")
        && !path.contains('\\')
        && !path.chars().any(char::is_control)
}

/// A submitted `multipart/form-data` body: text fields plus chosen files.
#[derive(Debug, Default)]
pub struct MultipartForm {
    pub fields: HashMap<String, String>,
    pub files: Vec<(String, UploadFile)>,
}

impl MultipartForm {
    /// read
    ///
    /// Drains the body. File inputs left empty by the browser (no name, no
    /// bytes) are dropped.
    pub async fn read(mut multipart: Multipart) -> SiteResult<Self> {
        let mut form = Self::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| SiteError::Validation(e.body_text()))?
        {
            let name = field.name().unwrap_or_default().to_string();
            match field.file_name().map(str::to_string) {
                Some(filename) => {
                    let content_type = field
                        .content_type()
                        .unwrap_or("application/octet-stream")
                        .to_string();
                    let bytes = field
                        .bytes()
                        .await
                        .map_err(|e| SiteError::Validation(e.body_text()))?;
                    if filename.is_empty() && bytes.is_empty() {
                        continue;
                    }
                    form.files.push((
                        name,
                        UploadFile {
                            filename,
                            content_type,
                            bytes: bytes.to_vec(),
                        },
                    ));
                }
                None => {
                    let value = field
                        .text()
                        .await
                        .map_err(|e| SiteError::Validation(e.body_text()))?;
                    form.fields.insert(name, value);
                }
            }
        }
        Ok(form)
    }

    pub fn text(&self, name: &str) -> String {
        self.fields.get(name).cloned().unwrap_or_default()
    }

    /// Trimmed value, `None` when blank.
    pub fn non_empty(&self, name: &str) -> Option<String> {
        self.fields
            .get(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    pub fn take_file(&mut self, name: &str) -> Option<UploadFile> {
        let index = self.files.iter().position(|(field, _)| field == name)?;
        Some(self.files.remove(index).1)
    }

    pub fn take_files(&mut self, name: &str) -> Vec<UploadFile> {
        let (matching, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut self.files)
            .into_iter()
            .partition(|(field, _)| field == name);
        self.files = rest;
        matching.into_iter().map(|(_, file)| file).collect()
    }
}

// --- Cached list loaders ---

pub async fn load_posts(
    state: &AppState,
    token: Option<&str>,
    scope: &str,
    query: &PostQuery,
) -> SiteResult<Vec<Post>> {
    let key = query_string(&query.to_pairs());
    tracing::debug!(call = crate::backend::describe_posts_call(query), scope, "loading posts");
    state
        .cache
        .get_or_load(Resource::Posts, scope, &key, || {
            state.api.list_posts(token, query)
        })
        .await
}

pub async fn load_media(
    state: &AppState,
    token: Option<&str>,
    scope: &str,
    query: &MediaQuery,
) -> SiteResult<Vec<Media>> {
    let key = query_string(&query.to_pairs());
    state
        .cache
        .get_or_load(Resource::Media, scope, &key, || {
            state.api.list_media(token, query)
        })
        .await
}

pub async fn load_categories(state: &AppState) -> SiteResult<Vec<Category>> {
    state
        .cache
        .get_or_load(Resource::Categories, "public", "", || {
            state.api.list_categories()
        })
        .await
}

pub async fn load_image_categories(state: &AppState) -> SiteResult<Vec<ImageCategory>> {
    state
        .cache
        .get_or_load(Resource::ImageCategories, "public", "", || {
            state.api.list_image_categories()
        })
        .await
}

/// not_found
///
/// Fallback for every unknown path ("Page not found").
pub async fn not_found(State(state): State<AppState>, chrome: Chrome) -> Response {
    render_not_found(&state, &chrome)
}

pub fn render_not_found(state: &AppState, chrome: &Chrome) -> Response {
    match state.templates.render("not_found.html", &chrome.context()) {
        Ok(html) => (StatusCode::NOT_FOUND, html).into_response(),
        Err(e) => e.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_same_site_paths_are_redirect_targets() {
        assert_eq!(local_path(Some("/publications?q=water"), "/"), "/publications?q=water");
        assert_eq!(local_path(Some("//evil.example"), "/"), "/");
        assert_eq!(local_path(Some("/\\evil.example"), "/"), "/");
        assert_eq!(local_path(Some("/about\\..\\x"), "/"), "/");
        assert_eq!(local_path(Some("/\tevil"), "/"), "/");
        assert_eq!(local_path(Some("https://evil.example"), "/"), "/");
        assert_eq!(local_path(None, "/"), "/");
    }
}
