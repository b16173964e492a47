use axum::{
    Form,
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::{
    AppState,
    cache::Resource,
    error::{SiteError, SiteResult},
    flash::Flash,
    guard::SignedIn,
    models::{Media, MediaQuery, MediaType, VideoSubmission, youtube_video_id},
    pages::{Chrome, finish, load_media, redirect_with},
};

const BACK: &str = "/videos";

#[derive(Serialize)]
struct VideoCard<'a> {
    #[serde(flatten)]
    media: &'a Media,
    embed_url: Option<String>,
}

/// videos
///
/// [Public Route] The multimedia library: embedded YouTube submissions.
pub async fn videos(State(state): State<AppState>, chrome: Chrome) -> SiteResult<Response> {
    let videos = load_media(&state, chrome.token(), chrome.scope(), &MediaQuery::videos()).await?;
    let cards: Vec<VideoCard> = videos
        .iter()
        .map(|media| VideoCard {
            media,
            embed_url: media.youtube_embed_url(),
        })
        .collect();

    let mut ctx = chrome.context();
    ctx.insert("videos", &cards);
    Ok(state.templates.render("videos.html", &ctx)?.into_response())
}

#[derive(Debug, Deserialize)]
pub struct VideoForm {
    #[serde(default)]
    pub youtube_url: String,
    #[serde(default)]
    pub title: String,
}

/// submit_video
///
/// [Admin Route] Adds a YouTube link to the library.
pub async fn submit_video(
    State(state): State<AppState>,
    SignedIn(session): SignedIn,
    Form(form): Form<VideoForm>,
) -> Response {
    let url = form.youtube_url.trim();
    if youtube_video_id(url).is_none() {
        return redirect_with(BACK, Flash::error("Invalid YouTube URL"));
    }

    let title = match form.title.trim() {
        "" => "YouTube Video",
        title => title,
    };
    let submission = VideoSubmission {
        media_type: MediaType::Video,
        youtube_url: url.to_string(),
        title: title.to_string(),
    };
    let result: SiteResult<()> = state.api.submit_video(session.token(), &submission).await;
    state.cache.invalidate(&[Resource::Media]);
    finish(result, BACK, "Video added", "Failed to add video")
}

/// approve_video
///
/// [Admin Route]
pub async fn approve_video(
    State(state): State<AppState>,
    SignedIn(session): SignedIn,
    Path(id): Path<String>,
) -> Response {
    let result = state.api.approve_media(session.token(), &id).await;
    state.cache.invalidate(&[Resource::Media]);
    finish(result, BACK, "Video approved", "Failed to approve video")
}

/// delete_video
///
/// [Admin Route] A video that is already gone counts as deleted.
pub async fn delete_video(
    State(state): State<AppState>,
    SignedIn(session): SignedIn,
    Path(id): Path<String>,
) -> Response {
    let result = match state
        .api
        .delete_media(session.token(), &id, Some(MediaType::Video))
        .await
    {
        Err(SiteError::NotFound) => Ok(()),
        other => other,
    };
    state.cache.invalidate(&[Resource::Media]);
    finish(result, BACK, "Video deleted", "Failed to delete video")
}
