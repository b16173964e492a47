use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::{
    AppState,
    cache::Resource,
    editor::{PostForm, SaveError, SaveRequest, save_post},
    error::{SiteError, SiteResult},
    flash::Flash,
    guard::SignedIn,
    models::{Post, PostStatus, PostType},
    pages::{Chrome, MultipartForm, load_categories, redirect_with, render_not_found},
};

/// What the editor template needs besides the chrome.
struct EditorView<'a> {
    form: &'a PostForm,
    existing: Option<&'a Post>,
    error: Option<String>,
}

async fn render_editor(
    state: &AppState,
    chrome: &Chrome,
    view: EditorView<'_>,
) -> SiteResult<Response> {
    let categories = load_categories(state).await?;
    let types: Vec<(&str, String)> = PostType::ALL
        .iter()
        .map(|t| (t.as_str(), t.label()))
        .collect();
    let action = match view.existing {
        Some(post) => format!("/dashboard/edit/{}", post.id),
        None => "/dashboard/new-post".to_string(),
    };

    let mut ctx = chrome.context();
    ctx.insert("form", view.form);
    ctx.insert("post", &view.existing);
    ctx.insert("is_edit", &view.existing.is_some());
    ctx.insert("action", &action);
    ctx.insert("categories", &categories);
    ctx.insert("types", &types);
    ctx.insert("error", &view.error);
    Ok(state.templates.render("editor.html", &ctx)?.into_response())
}

/// Loads the post being edited; `None` when it does not exist or is not the
/// visitor's to see.
async fn load_existing(
    state: &AppState,
    token: &str,
    id: &str,
) -> SiteResult<Option<Post>> {
    match state.api.get_post(Some(token), id).await {
        Ok(post) => Ok(Some(post)),
        Err(SiteError::NotFound) => Ok(None),
        Err(e) => Err(e),
    }
}

/// new_post
///
/// [Authenticated Route] Empty editor.
pub async fn new_post(
    State(state): State<AppState>,
    SignedIn(_session): SignedIn,
    chrome: Chrome,
) -> SiteResult<Response> {
    let form = PostForm {
        post_type: PostType::default().as_str().to_string(),
        ..PostForm::default()
    };
    render_editor(
        &state,
        &chrome,
        EditorView {
            form: &form,
            existing: None,
            error: None,
        },
    )
    .await
}

/// edit_post
///
/// [Authenticated Route] Editor prefilled from an existing post.
pub async fn edit_post(
    State(state): State<AppState>,
    SignedIn(session): SignedIn,
    chrome: Chrome,
    Path(id): Path<String>,
) -> SiteResult<Response> {
    let Some(post) = load_existing(&state, session.token(), &id).await? else {
        return Ok(render_not_found(&state, &chrome));
    };
    let form = PostForm::from_post(&post);
    render_editor(
        &state,
        &chrome,
        EditorView {
            form: &form,
            existing: Some(&post),
            error: None,
        },
    )
    .await
}

/// create_post
///
/// [Authenticated Route] Saves a new post (multipart, see `read_save_request`).
pub async fn create_post(
    State(state): State<AppState>,
    SignedIn(session): SignedIn,
    chrome: Chrome,
    multipart: Multipart,
) -> SiteResult<Response> {
    let request = read_save_request(multipart).await?;
    save(&state, &chrome, session.token(), None, request).await
}

/// update_post
///
/// [Authenticated Route]
pub async fn update_post(
    State(state): State<AppState>,
    SignedIn(session): SignedIn,
    chrome: Chrome,
    Path(id): Path<String>,
    multipart: Multipart,
) -> SiteResult<Response> {
    let Some(existing) = load_existing(&state, session.token(), &id).await? else {
        return Ok(render_not_found(&state, &chrome));
    };
    let request = read_save_request(multipart).await?;
    save(&state, &chrome, session.token(), Some(&existing), request).await
}

/// read_save_request
///
/// Text fields of `PostForm`, `status` (`draft` or `submitted`), an optional
/// `featured_image` file and any number of `attachments` files.
async fn read_save_request(multipart: Multipart) -> SiteResult<SaveRequest> {
    let mut body = MultipartForm::read(multipart).await?;
    let form = PostForm {
        title: body.text("title"),
        content: body.text("content"),
        excerpt: body.text("excerpt"),
        post_type: body.text("type"),
        category_id: body.text("category_id"),
        author_name: body.text("author_name"),
        featured_image_url: body.text("featured_image_url"),
        document_url: body.text("document_url"),
    };
    let status = match body.non_empty("status") {
        Some(status) => PostStatus::from(status),
        None => PostStatus::Draft,
    };

    Ok(SaveRequest {
        form,
        status,
        featured_image: body.take_file("featured_image"),
        attachments: body.take_files("attachments"),
    })
}

async fn save(
    state: &AppState,
    chrome: &Chrome,
    token: &str,
    existing: Option<&Post>,
    request: SaveRequest,
) -> SiteResult<Response> {
    let status = request.status;
    let form = request.form.clone();

    let result = save_post(state.api.as_ref(), token, existing, request).await;
    // Even a rolled-back save may have touched lists on the way.
    state.cache.invalidate(&[Resource::Posts, Resource::Media]);

    match result {
        Ok(post) => {
            let message = match status {
                PostStatus::Submitted => format!("\"{}\" submitted for review", post.title),
                _ => format!("\"{}\" saved as draft", post.title),
            };
            Ok(redirect_with("/dashboard", Flash::success(message)))
        }
        Err(e) if e.is_unauthorized() => Err(SiteError::Unauthorized),
        Err(e) => {
            match &e {
                SaveError::Invalid(_) => tracing::debug!(error = %e, "editor input rejected"),
                _ => tracing::warn!(error = %e, "post save failed"),
            }
            let mut response = render_editor(
                state,
                chrome,
                EditorView {
                    form: &form,
                    existing,
                    error: Some(e.user_message()),
                },
            )
            .await?;
            *response.status_mut() = StatusCode::UNPROCESSABLE_ENTITY;
            Ok(response)
        }
    }
}
