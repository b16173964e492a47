use serde::{Deserialize, Serialize};

use crate::{
    backend::ContentApi,
    error::SiteError,
    models::{MediaType, MediaUpload, Post, PostPayload, PostStatus, PostType, UploadFile},
};

/// PostForm
///
/// The editor's text fields, exactly as typed. Kept verbatim so a failed save
/// can re-render the form without losing the author's work.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostForm {
    pub title: String,
    pub content: String,
    pub excerpt: String,
    #[serde(rename = "type")]
    pub post_type: String,
    pub category_id: String,
    pub author_name: String,
    pub featured_image_url: String,
    pub document_url: String,
}

impl PostForm {
    pub fn from_post(post: &Post) -> Self {
        Self {
            title: post.title.clone(),
            content: post.content.clone(),
            excerpt: post.excerpt.clone().unwrap_or_default(),
            post_type: post.post_type.as_str().to_string(),
            category_id: post.category_id.clone().unwrap_or_default(),
            author_name: post.author_name.clone().unwrap_or_default(),
            featured_image_url: post.featured_image_url.clone().unwrap_or_default(),
            document_url: post.document_url.clone().unwrap_or_default(),
        }
    }

    /// Builds the API payload. `document_urls` is not editable here and is
    /// carried over from the post being edited.
    pub fn to_payload(&self, status: PostStatus, document_urls: Vec<String>) -> PostPayload {
        let post_type = match PostType::from(self.post_type.clone()) {
            PostType::Unknown => PostType::default(),
            known => known,
        };
        PostPayload {
            title: self.title.trim().to_string(),
            content: self.content.clone(),
            excerpt: self.excerpt.trim().to_string(),
            post_type,
            category_id: Some(self.category_id.trim().to_string()).filter(|c| !c.is_empty()),
            author_name: self.author_name.trim().to_string(),
            featured_image_url: self.featured_image_url.trim().to_string(),
            document_url: self.document_url.trim().to_string(),
            document_urls,
            status,
            restore: false,
        }
    }
}

/// Everything submitted by one press of "Save Draft" / "Submit for Review".
#[derive(Debug, Clone, Default)]
pub struct SaveRequest {
    pub form: PostForm,
    pub status: PostStatus,
    pub featured_image: Option<UploadFile>,
    pub attachments: Vec<UploadFile>,
}

#[derive(Debug, thiserror::Error)]
pub enum SaveError {
    #[error("{0}")]
    Invalid(String),

    #[error("could not save the post: {0}")]
    Post(#[source] SiteError),

    /// `file` is the name of the upload that failed. `rolled_back` is false
    /// when undoing the earlier steps failed too.
    #[error("could not upload {file}: {source}")]
    Upload {
        file: String,
        #[source]
        source: SiteError,
        rolled_back: bool,
    },
}

impl SaveError {
    /// Message shown above the re-rendered form.
    pub fn user_message(&self) -> String {
        match self {
            SaveError::Invalid(message) => message.clone(),
            SaveError::Post(source) => format!("Failed to save post: {}", source.user_message()),
            SaveError::Upload {
                file,
                source,
                rolled_back: true,
            } => format!(
                "Failed to upload \"{file}\": {}. Nothing was saved; your changes are still below.",
                source.user_message()
            ),
            SaveError::Upload {
                file,
                source,
                rolled_back: false,
            } => format!(
                "Failed to upload \"{file}\": {}. Part of this save could not be undone; \
                 check the post on your dashboard before trying again.",
                source.user_message()
            ),
        }
    }

    /// The session expired mid-save; the caller should send the visitor to log in.
    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self,
            SaveError::Post(SiteError::Unauthorized)
                | SaveError::Upload {
                    source: SiteError::Unauthorized,
                    ..
                }
        )
    }
}

/// What has to be undone if a later step fails.
#[derive(Default)]
struct Compensation {
    uploaded_media: Vec<String>,
    created_post: Option<String>,
    previous: Option<(String, PostPayload)>,
}

impl Compensation {
    /// Best-effort rollback in reverse order. Returns false if any step could
    /// not be undone; those failures are logged.
    async fn run(self, api: &dyn ContentApi, token: &str) -> bool {
        let mut clean = true;
        for media_id in self.uploaded_media.iter().rev() {
            if let Err(e) = api.delete_media(token, media_id, None).await {
                tracing::warn!(media_id, error = %e, "rollback: could not delete uploaded media");
                clean = false;
            }
        }

        if let Some(post_id) = &self.created_post {
            if let Err(e) = api.delete_post(token, post_id).await {
                tracing::warn!(post_id, error = %e, "rollback: could not delete new post");
                clean = false;
            }
        }

        if let Some((post_id, payload)) = &self.previous {
            if let Err(e) = api.update_post(token, post_id, payload).await {
                tracing::error!(post_id, error = %e, "rollback: could not restore post");
                clean = false;
            }
        }
        clean
    }
}

/// save_post
///
/// Saves the editor form as a saga:
///
/// 1. Upload the featured image, if a file was chosen (its URL replaces the typed one).
/// 2. Create the post, or update `existing`.
/// 3. Upload each attachment sequentially with the post's id.
///
/// When step 2 or 3 fails, everything done by this call is undone: media
/// uploaded here are deleted, a newly created post is deleted and an updated
/// post is restored to its previous fields.
pub async fn save_post(
    api: &dyn ContentApi,
    token: &str,
    existing: Option<&Post>,
    request: SaveRequest,
) -> Result<Post, SaveError> {
    let SaveRequest {
        mut form,
        status,
        featured_image,
        attachments,
    } = request;

    if form.title.trim().is_empty() {
        return Err(SaveError::Invalid("Title is required".to_string()));
    }
    if !matches!(status, PostStatus::Draft | PostStatus::Submitted) {
        return Err(SaveError::Invalid(
            "Posts can only be saved as a draft or submitted for review".to_string(),
        ));
    }

    let mut undo = Compensation::default();

    // 1. Featured image
    if let Some(file) = featured_image {
        let filename = file.filename.clone();
        let upload = MediaUpload {
            file,
            media_type: Some(MediaType::Image),
            ..MediaUpload::default()
        };
        match api.upload_media(token, upload).await {
            Ok(uploaded) => {
                if let Some(id) = uploaded.media_id() {
                    undo.uploaded_media.push(id.to_string());
                }
                match uploaded.url() {
                    Some(url) => form.featured_image_url = url.to_string(),
                    None => tracing::warn!(filename, "featured image upload returned no url"),
                }
            }
            Err(source) => {
                let rolled_back = undo.run(api, token).await;
                return Err(SaveError::Upload {
                    file: filename,
                    source,
                    rolled_back,
                });
            }
        }
    }

    // 2. Create or update
    let document_urls = existing
        .map(|post| post.document_urls.clone())
        .unwrap_or_default();
    let payload = form.to_payload(status, document_urls);

    let saved = match existing {
        Some(previous) => api.update_post(token, &previous.id, &payload).await,
        None => api.create_post(token, &payload).await,
    };
    let post = match saved {
        Ok(post) => post,
        Err(source) => {
            undo.run(api, token).await;
            return Err(SaveError::Post(source));
        }
    };

    match existing {
        Some(previous) => {
            undo.previous = Some((previous.id.clone(), PostPayload::restoring(previous)));
        }
        None => undo.created_post = Some(post.id.clone()),
    }
    tracing::info!(post_id = %post.id, status = %status, attachments = attachments.len(), "post saved");

    // 3. Attachments, one at a time
    for file in attachments {
        let filename = file.filename.clone();
        let upload = MediaUpload {
            file,
            media_type: Some(MediaType::Pdf),
            post_id: Some(post.id.clone()),
            ..MediaUpload::default()
        };
        match api.upload_media(token, upload).await {
            Ok(uploaded) => match uploaded.media_id() {
                Some(id) => undo.uploaded_media.push(id.to_string()),
                None => tracing::warn!(filename, "attachment upload returned no id"),
            },
            Err(source) => {
                tracing::warn!(post_id = %post.id, filename, error = %source, "attachment upload failed, rolling back");
                let rolled_back = undo.run(api, token).await;
                return Err(SaveError::Upload {
                    file: filename,
                    source,
                    rolled_back,
                });
            }
        }
    }

    Ok(post)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_type_falls_back_to_research() {
        let form = PostForm {
            title: " Title ".into(),
            post_type: "poetry".into(),
            category_id: "".into(),
            ..PostForm::default()
        };
        let payload = form.to_payload(PostStatus::Draft, vec![]);
        assert_eq!(payload.post_type, PostType::Research);
        assert_eq!(payload.title, "Title");
        assert_eq!(payload.category_id, None);
    }

    #[test]
    fn form_round_trips_through_a_post() {
        let post = Post {
            title: "T".into(),
            post_type: PostType::Opinion,
            category_id: Some("c".into()),
            ..Post::default()
        };
        let form = PostForm::from_post(&post);
        assert_eq!(form.post_type, "opinion");
        assert_eq!(form.category_id, "c");
    }

    #[test]
    fn upload_errors_name_the_file() {
        let err = SaveError::Upload {
            file: "chapter-2.pdf".into(),
            source: SiteError::Api {
                status: 500,
                message: "Upload failed".into(),
            },
            rolled_back: true,
        };
        assert!(err.user_message().contains("chapter-2.pdf"));
        assert!(err.user_message().contains("Nothing was saved"));
        assert!(!err.is_unauthorized());
    }

    #[test]
    fn failed_rollback_is_not_reported_as_nothing_saved() {
        let err = SaveError::Upload {
            file: "chapter-2.pdf".into(),
            source: SiteError::Api {
                status: 502,
                message: "Bad gateway".into(),
            },
            rolled_back: false,
        };
        assert!(!err.user_message().contains("Nothing was saved"));
        assert!(err.user_message().contains("could not be undone"));
    }
}
