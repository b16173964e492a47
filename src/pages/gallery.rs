use axum::{
    Form,
    extract::{Multipart, Path, State},
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use crate::{
    AppState,
    backend::ContentApi,
    cache::Resource,
    error::{SiteError, SiteResult},
    flash::Flash,
    guard::SignedIn,
    listing::group_gallery,
    models::{CategoryPayload, MediaQuery, MediaType, MediaUpdate, MediaUpload, UploadFile},
    pages::{
        Chrome, MultipartForm, finish, load_image_categories, load_media, redirect_with,
    },
};

const BACK: &str = "/gallery";

/// gallery
///
/// [Public Route] Gallery images grouped by image category, with an
/// "Uncategorized" section. Administrators also see pending images, empty
/// categories and the moderation controls.
pub async fn gallery(State(state): State<AppState>, chrome: Chrome) -> SiteResult<Response> {
    let images = load_media(&state, chrome.token(), chrome.scope(), &MediaQuery::gallery()).await?;
    let categories = load_image_categories(&state).await?;
    let groups = group_gallery(&images, &categories, chrome.is_admin());

    let mut ctx = chrome.context();
    ctx.insert("groups", &groups);
    ctx.insert("categories", &categories);
    ctx.insert("empty", &images.is_empty());
    Ok(state.templates.render("gallery.html", &ctx)?.into_response())
}

/// resolve_category
///
/// The category an upload goes into. A typed new name wins over the selected
/// one; if creating it fails (typically because it already exists), an
/// existing category with the same name, compared case-insensitively, is
/// reused instead.
pub async fn resolve_category(
    api: &dyn ContentApi,
    token: &str,
    selected: Option<String>,
    new_name: Option<String>,
) -> SiteResult<Option<String>> {
    let Some(name) = new_name else {
        return Ok(selected);
    };

    let payload = CategoryPayload {
        name: name.clone(),
        description: String::new(),
    };
    match api.create_image_category(token, &payload).await {
        Ok(category) if !category.id.is_empty() => Ok(Some(category.id)),
        Ok(_) | Err(SiteError::Api { .. }) | Err(SiteError::Decode(_)) => {
            let existing = api
                .list_image_categories()
                .await?
                .into_iter()
                .find(|c| c.name.eq_ignore_ascii_case(&name));
            match existing {
                Some(category) => {
                    tracing::debug!(category_id = %category.id, "reusing existing image category");
                    Ok(Some(category.id))
                }
                None => Err(SiteError::Validation(format!(
                    "Could not create category \"{name}\""
                ))),
            }
        }
        Err(e) => Err(e),
    }
}

/// upload_image
///
/// [Admin Route] Adds an image to the gallery (multipart: `file`, `title`,
/// `description`, `category_id`, `new_category`). The title defaults to the
/// file name.
pub async fn upload_image(
    State(state): State<AppState>,
    SignedIn(session): SignedIn,
    multipart: Multipart,
) -> SiteResult<Response> {
    let mut form = MultipartForm::read(multipart).await?;
    let Some(file) = form.take_file("file") else {
        return Ok(redirect_with(BACK, Flash::error("Please choose an image file")));
    };

    let result = store_image(&state, session.token(), &form, file).await;
    state
        .cache
        .invalidate(&[Resource::Media, Resource::ImageCategories]);
    Ok(finish(result, BACK, "Image uploaded", "Failed to upload image"))
}

async fn store_image(
    state: &AppState,
    token: &str,
    form: &MultipartForm,
    file: UploadFile,
) -> SiteResult<()> {
    let category_id = resolve_category(
        state.api.as_ref(),
        token,
        form.non_empty("category_id"),
        form.non_empty("new_category"),
    )
    .await?;

    let title = form
        .non_empty("title")
        .unwrap_or_else(|| file.filename.clone());
    let upload = MediaUpload {
        title: Some(title),
        description: Some(form.text("description").trim().to_string()),
        media_type: Some(MediaType::Image),
        image_category_id: category_id,
        file,
        post_id: None,
    };
    let uploaded = state.api.upload_media(token, upload).await?;
    tracing::info!(media_id = uploaded.media_id(), "gallery image uploaded");
    Ok(())
}

/// approve_image
///
/// [Admin Route]
pub async fn approve_image(
    State(state): State<AppState>,
    SignedIn(session): SignedIn,
    Path(id): Path<String>,
) -> Response {
    let result = state.api.approve_media(session.token(), &id).await;
    state.cache.invalidate(&[Resource::Media]);
    finish(result, BACK, "Image approved", "Failed to approve image")
}

/// delete_image
///
/// [Admin Route]
pub async fn delete_image(
    State(state): State<AppState>,
    SignedIn(session): SignedIn,
    Path(id): Path<String>,
) -> Response {
    let result = state
        .api
        .delete_media(session.token(), &id, Some(MediaType::Image))
        .await;
    state.cache.invalidate(&[Resource::Media]);
    finish(result, BACK, "Image deleted", "Failed to delete image")
}

#[derive(Debug, Deserialize)]
pub struct ImageEditForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image_category_id: String,
}

/// update_image
///
/// [Admin Route] Edits title, description and category. An empty category
/// clears it.
pub async fn update_image(
    State(state): State<AppState>,
    SignedIn(session): SignedIn,
    Path(id): Path<String>,
    Form(form): Form<ImageEditForm>,
) -> Response {
    let update = MediaUpdate {
        title: form.title.trim().to_string(),
        description: form.description.trim().to_string(),
        image_category_id: Some(form.image_category_id).filter(|c| !c.is_empty()),
    };
    let result = state
        .api
        .update_media(session.token(), &id, &update)
        .await
        .map(|_| ());
    state.cache.invalidate(&[Resource::Media]);
    finish(result, BACK, "Image details updated", "Failed to update image details")
}

#[derive(Debug, Deserialize)]
pub struct CategoryForm {
    #[serde(default)]
    pub name: String,
}

/// rename_category
///
/// [Admin Route]
pub async fn rename_category(
    State(state): State<AppState>,
    SignedIn(session): SignedIn,
    Path(id): Path<String>,
    Form(form): Form<CategoryForm>,
) -> Response {
    let name = form.name.trim();
    if name.is_empty() {
        return redirect_with(BACK, Flash::error("Category name cannot be empty"));
    }

    let payload = CategoryPayload {
        name: name.to_string(),
        description: String::new(),
    };
    let result = state
        .api
        .update_image_category(session.token(), &id, &payload)
        .await;
    state.cache.invalidate(&[Resource::ImageCategories]);
    finish(result, BACK, "Category renamed", "Failed to update category")
}

/// delete_category
///
/// [Admin Route] Images in the category become uncategorized.
pub async fn delete_category(
    State(state): State<AppState>,
    SignedIn(session): SignedIn,
    Path(id): Path<String>,
) -> Response {
    let result = state.api.delete_image_category(session.token(), &id).await;
    state
        .cache
        .invalidate(&[Resource::ImageCategories, Resource::Media]);
    finish(result, BACK, "Category deleted", "Failed to delete category")
}
