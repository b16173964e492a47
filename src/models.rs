use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

// --- Enumerations ---

/// Declares a string-backed enum whose unknown values decode to `Unknown`
/// instead of failing the whole response. The content API owns these values,
/// so the site only renders what it recognises.
macro_rules! api_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident { $($variant:ident => $wire:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(from = "String", into = "String")]
        pub enum $name {
            $($variant,)+
            Unknown,
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $wire,)+
                    $name::Unknown => "unknown",
                }
            }

            /// Human readable label ("field_study" -> "field study").
            pub fn label(&self) -> String {
                self.as_str().replace('_', " ")
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                match value.as_str() {
                    $($wire => $name::$variant,)+
                    _ => $name::Unknown,
                }
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> String {
                value.as_str().to_string()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

api_enum! {
    /// Editorial category of a post.
    pub enum PostType {
        Research => "research",
        FieldStudy => "field_study",
        Opinion => "opinion",
    }
}

api_enum! {
    /// Moderation lifecycle of a post. Transitions are owned by the content API;
    /// the site only triggers `approve` and `reject`.
    pub enum PostStatus {
        Draft => "draft",
        Submitted => "submitted",
        UnderReview => "under_review",
        Published => "published",
        Rejected => "rejected",
    }
}

api_enum! {
    pub enum MediaType {
        Image => "image",
        Video => "video",
        Pdf => "pdf",
        Document => "document",
    }
}

api_enum! {
    pub enum MediaStatus {
        Pending => "pending",
        Approved => "approved",
    }
}

api_enum! {
    /// RBAC field of a profile.
    pub enum Role {
        Researcher => "researcher",
        SuperAdmin => "super_admin",
    }
}

impl Default for PostType {
    fn default() -> Self {
        PostType::Research
    }
}

impl Default for PostStatus {
    fn default() -> Self {
        PostStatus::Draft
    }
}

impl Default for MediaType {
    fn default() -> Self {
        MediaType::Image
    }
}

impl Default for MediaStatus {
    fn default() -> Self {
        MediaStatus::Pending
    }
}

impl Default for Role {
    fn default() -> Self {
        Role::Researcher
    }
}

impl PostStatus {
    /// Waiting on an administrator decision.
    pub fn is_pending(&self) -> bool {
        matches!(self, PostStatus::Submitted | PostStatus::UnderReview)
    }
}

impl MediaType {
    /// Attachments listed under "Attachments & Resources" on a post.
    pub fn is_document(&self) -> bool {
        matches!(self, MediaType::Pdf | MediaType::Document)
    }
}

// --- Lenient field decoding ---

/// Identifiers arrive as strings or integers depending on the backend.
fn id_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(opt_id_string(deserializer)?.unwrap_or_default())
}

fn opt_id_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) if !s.is_empty() => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// `null` decodes to the type's default rather than an error.
fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// --- Resources (as served by the content API) ---

/// Post
///
/// A research / field-study / opinion publication. The shape is inferred from
/// the content API's responses, so every field beyond `id` tolerates absence.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Post {
    #[serde(deserialize_with = "id_string", default)]
    pub id: String,
    #[serde(default, deserialize_with = "null_default")]
    pub slug: String,
    #[serde(default, deserialize_with = "null_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_default")]
    pub content: String,
    #[serde(default)]
    pub excerpt: Option<String>,
    #[serde(rename = "type", default, deserialize_with = "null_default")]
    pub post_type: PostType,
    #[serde(default, deserialize_with = "null_default")]
    pub status: PostStatus,
    #[serde(default, deserialize_with = "opt_id_string")]
    pub category_id: Option<String>,
    #[serde(default, deserialize_with = "opt_id_string")]
    pub author_id: Option<String>,
    #[serde(default)]
    pub author_name: Option<String>,
    #[serde(default)]
    pub featured_image_url: Option<String>,
    #[serde(default)]
    pub document_url: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub document_urls: Vec<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub view_count: u64,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub published_at: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub media: Vec<Media>,
    // Reviewer feedback left on rejection.
    #[serde(default)]
    pub feedback: Option<String>,
}

impl Post {
    pub fn documents(&self) -> impl Iterator<Item = &Media> {
        self.media.iter().filter(|m| m.media_type.is_document())
    }
}

/// Media
///
/// An image, video or document, moderated independently of posts.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Media {
    #[serde(deserialize_with = "id_string", default)]
    pub id: String,
    #[serde(rename = "type", default, deserialize_with = "null_default")]
    pub media_type: MediaType,
    #[serde(default, deserialize_with = "null_default")]
    pub url: String,
    #[serde(default, deserialize_with = "null_default")]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "opt_id_string")]
    pub image_category_id: Option<String>,
    #[serde(default, deserialize_with = "opt_id_string")]
    pub post_id: Option<String>,
    #[serde(default)]
    pub youtube_url: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub status: MediaStatus,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl Media {
    /// Name shown for a downloadable attachment: its title, else the last URL segment.
    pub fn display_name(&self) -> String {
        if !self.title.trim().is_empty() {
            return self.title.clone();
        }
        self.url
            .rsplit('/')
            .next()
            .filter(|segment| !segment.is_empty())
            .unwrap_or("resource.pdf")
            .to_string()
    }

    /// Embeddable URL for a YouTube submission, if one can be derived.
    pub fn youtube_embed_url(&self) -> Option<String> {
        let source = self.youtube_url.as_deref().unwrap_or(&self.url);
        youtube_video_id(source).map(|id| format!("https://www.youtube.com/embed/{id}"))
    }
}

/// Extracts the video id from the common YouTube URL shapes.
pub fn youtube_video_id(url: &str) -> Option<String> {
    let url = url.trim();
    let candidate = if let Some((_, rest)) = url.split_once("youtu.be/") {
        rest
    } else if let Some((_, rest)) = url.split_once("/embed/") {
        rest
    } else if let Some((_, rest)) = url.split_once("/shorts/") {
        rest
    } else if let Some((_, query)) = url.split_once('?') {
        query
            .split('&')
            .find_map(|pair| pair.strip_prefix("v="))?
    } else {
        return None;
    };

    let id: String = candidate
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    (id.len() == 11).then_some(id)
}

/// Profile
///
/// The application-level user record linked to a session.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Profile {
    #[serde(deserialize_with = "id_string", default)]
    pub id: String,
    #[serde(default, deserialize_with = "null_default")]
    pub email: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub role: Role,
}

impl Profile {
    pub fn display_name(&self) -> &str {
        self.full_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(&self.email)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ContactSubmission {
    #[serde(deserialize_with = "id_string", default)]
    pub id: String,
    #[serde(default, deserialize_with = "null_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_default")]
    pub email: String,
    #[serde(default, deserialize_with = "null_default")]
    pub message: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Category
///
/// Used both for post categories (`/categories`) and gallery image
/// categories (`/image-categories`); the API serves the same shape for both.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Category {
    #[serde(deserialize_with = "id_string", default)]
    pub id: String,
    #[serde(default, deserialize_with = "null_default")]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

pub type ImageCategory = Category;

// --- Request payloads ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Response of `POST /auth/login`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    #[serde(alias = "user")]
    pub profile: Profile,
}

/// PostPayload
///
/// Body of `POST /posts` and `PUT /posts/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct PostPayload {
    pub title: String,
    pub content: String,
    pub excerpt: String,
    #[serde(rename = "type")]
    pub post_type: PostType,
    pub category_id: Option<String>,
    pub author_name: String,
    pub featured_image_url: String,
    pub document_url: String,
    pub document_urls: Vec<String>,
    pub status: PostStatus,
    /// Puts the post back as it was, whatever its status. Only sent when undoing
    /// a failed save.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub restore: bool,
}

impl PostPayload {
    /// Rebuilds the payload that would reproduce `post` as it currently stands.
    pub fn from_post(post: &Post) -> Self {
        Self {
            title: post.title.clone(),
            content: post.content.clone(),
            excerpt: post.excerpt.clone().unwrap_or_default(),
            post_type: post.post_type,
            category_id: post.category_id.clone(),
            author_name: post.author_name.clone().unwrap_or_default(),
            featured_image_url: post.featured_image_url.clone().unwrap_or_default(),
            document_url: post.document_url.clone().unwrap_or_default(),
            document_urls: post.document_urls.clone(),
            status: post.status,
            restore: false,
        }
    }

    /// The payload that undoes an update to `post`, prior status included.
    pub fn restoring(post: &Post) -> Self {
        Self {
            restore: true,
            ..Self::from_post(post)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectRequest {
    pub feedback: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ContactRequest {
    pub name: String,
    pub email: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CategoryPayload {
    pub name: String,
    pub description: String,
}

/// Partial update of a media item's descriptive fields (`PUT /media/{id}`).
/// `image_category_id: None` is serialized as `null` to clear the category.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MediaUpdate {
    pub title: String,
    pub description: String,
    pub image_category_id: Option<String>,
}

/// A YouTube link submitted through `/media/upload` as JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoSubmission {
    #[serde(rename = "type")]
    pub media_type: MediaType,
    pub youtube_url: String,
    pub title: String,
}

/// A file received from the browser, forwarded to the content API.
#[derive(Debug, Clone, Default)]
pub struct UploadFile {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// MediaUpload
///
/// Multipart body of `POST /media/upload`. Optional fields are only sent when set.
#[derive(Debug, Clone, Default)]
pub struct MediaUpload {
    pub file: UploadFile,
    pub title: Option<String>,
    pub description: Option<String>,
    pub media_type: Option<MediaType>,
    pub image_category_id: Option<String>,
    pub post_id: Option<String>,
}

/// Response of `POST /media/upload`: either `{ url, id }`, `{ media: {...} }` or both.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UploadedMedia {
    #[serde(default, deserialize_with = "opt_id_string")]
    pub id: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub media: Option<Media>,
}

impl UploadedMedia {
    pub fn media_id(&self) -> Option<&str> {
        self.media
            .as_ref()
            .map(|m| m.id.as_str())
            .filter(|id| !id.is_empty())
            .or(self.id.as_deref())
    }

    pub fn url(&self) -> Option<&str> {
        self.url
            .as_deref()
            .or_else(|| self.media.as_ref().map(|m| m.url.as_str()))
            .filter(|url| !url.is_empty())
    }
}

/// A downloaded attachment, proxied back to the browser.
#[derive(Debug, Clone)]
pub struct Download {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

// --- Query filters ---

/// PostQuery
///
/// Query parameters accepted by `GET /posts`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostQuery {
    pub status: Option<PostStatus>,
    pub author_id: Option<String>,
    pub limit: Option<u32>,
}

impl PostQuery {
    pub fn published() -> Self {
        Self {
            status: Some(PostStatus::Published),
            ..Self::default()
        }
    }

    pub fn latest(limit: u32) -> Self {
        Self {
            limit: Some(limit),
            ..Self::default()
        }
    }

    pub fn by_author(author_id: &str) -> Self {
        Self {
            author_id: Some(author_id.to_string()),
            ..Self::default()
        }
    }

    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(status) = self.status {
            pairs.push(("status", status.as_str().to_string()));
        }
        if let Some(author_id) = &self.author_id {
            pairs.push(("author_id", author_id.clone()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        pairs
    }
}

/// MediaQuery
///
/// Query parameters accepted by `GET /media`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaQuery {
    pub media_type: Option<MediaType>,
    // Only media not attached to a post.
    pub unattached: bool,
    // Only media uploaded through the admin gallery.
    pub admin_uploads: bool,
}

impl MediaQuery {
    pub fn gallery() -> Self {
        Self {
            media_type: Some(MediaType::Image),
            unattached: true,
            admin_uploads: true,
        }
    }

    pub fn videos() -> Self {
        Self {
            media_type: Some(MediaType::Video),
            ..Self::default()
        }
    }

    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(media_type) = self.media_type {
            pairs.push(("type", media_type.as_str().to_string()));
        }
        if self.unattached {
            pairs.push(("unattached", "1".to_string()));
        }
        if self.admin_uploads {
            pairs.push(("admin_uploads", "1".to_string()));
        }
        pairs
    }
}

/// Renders query pairs as a stable `k=v&k=v` string (cache keys, logging).
pub fn query_string(pairs: &[(&'static str, String)]) -> String {
    pairs
        .iter()
        .map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_status_decodes_to_unknown() {
        let post: Post = serde_json::from_str(r#"{"id": 7, "status": "archived"}"#).unwrap();
        assert_eq!(post.id, "7");
        assert_eq!(post.status, PostStatus::Unknown);
    }

    #[test]
    fn nulls_fall_back_to_defaults() {
        let post: Post = serde_json::from_str(
            r#"{"id": "a", "title": null, "view_count": null, "media": null, "document_urls": null}"#,
        )
        .unwrap();
        assert_eq!(post.title, "");
        assert_eq!(post.view_count, 0);
        assert!(post.media.is_empty());
    }

    #[test]
    fn post_type_serializes_under_type_key() {
        let payload = PostPayload {
            post_type: PostType::FieldStudy,
            ..PostPayload::default()
        };
        let json = serde_json::to_string(&payload).unwrap();
        assert!(json.contains(r#""type":"field_study""#));
        assert!(!json.contains("restore"));
        assert_eq!(PostType::FieldStudy.label(), "field study");
    }

    #[test]
    fn youtube_ids_are_extracted() {
        assert_eq!(
            youtube_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=1").as_deref(),
            Some("dQw4w9WgXcQ")
        );
        assert_eq!(
            youtube_video_id("https://youtu.be/dQw4w9WgXcQ").as_deref(),
            Some("dQw4w9WgXcQ")
        );
        assert_eq!(youtube_video_id("https://example.com/video"), None);
    }

    #[test]
    fn attachment_name_falls_back_to_url() {
        let media = Media {
            url: "https://cdn.example.org/files/report-2024.pdf".into(),
            ..Media::default()
        };
        assert_eq!(media.display_name(), "report-2024.pdf");
    }

    #[test]
    fn upload_response_accepts_either_shape() {
        let wrapped: UploadedMedia =
            serde_json::from_str(r#"{"media": {"id": 3, "url": "u", "type": "pdf"}}"#).unwrap();
        assert_eq!(wrapped.media_id(), Some("3"));
        assert_eq!(wrapped.url(), Some("u"));

        let bare: UploadedMedia = serde_json::from_str(r#"{"id": "m1", "url": "x"}"#).unwrap();
        assert_eq!(bare.media_id(), Some("m1"));
    }
}
