use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    backend::ContentApi,
    error::{SiteError, SiteResult},
    models::{
        Category, CategoryPayload, ContactRequest, ContactSubmission, Download, ImageCategory,
        LoginRequest, LoginResponse, Media, MediaQuery, MediaStatus, MediaType, MediaUpdate,
        MediaUpload, Post, PostPayload, PostQuery, PostStatus, PostType, Profile, RejectRequest,
        Role, UploadedMedia, VideoSubmission, youtube_video_id,
    },
};

/// MemoryContentApi
///
/// An in-process implementation of the content API contract. It backs the
/// local demo mode (no `API_BASE_URL`) and the integration tests, and applies
/// the same visibility and role rules the real service enforces:
///
/// - anonymous readers only see published posts and approved media;
/// - researchers additionally see their own posts;
/// - `super_admin` sees everything and is the only role allowed to moderate.
pub struct MemoryContentApi {
    store: RwLock<Store>,
}

#[derive(Default)]
struct Store {
    accounts: Vec<Account>,
    // token -> profile id
    tokens: HashMap<String, String>,
    posts: Vec<Post>,
    media: Vec<StoredMedia>,
    categories: Vec<Category>,
    image_categories: Vec<ImageCategory>,
    contacts: Vec<ContactSubmission>,
    // Uploads succeed this many more times, then fail. `None` never fails.
    uploads_before_failure: Option<usize>,
}

struct Account {
    profile: Profile,
    password: String,
}

struct StoredMedia {
    media: Media,
    uploaded_by: String,
    admin_upload: bool,
    bytes: Vec<u8>,
    content_type: String,
}

/// Who is making a call, resolved from the bearer token.
enum Caller {
    Anonymous,
    Member(Profile),
}

impl Caller {
    fn is_admin(&self) -> bool {
        matches!(self, Caller::Member(p) if p.role == Role::SuperAdmin)
    }

    fn id(&self) -> Option<&str> {
        match self {
            Caller::Anonymous => None,
            Caller::Member(p) => Some(p.id.as_str()),
        }
    }
}

fn forbidden() -> SiteError {
    SiteError::Api {
        status: 403,
        message: "You do not have permission to do that".to_string(),
    }
}

fn bad_request(message: &str) -> SiteError {
    SiteError::Api {
        status: 400,
        message: message.to_string(),
    }
}

fn now() -> String {
    Utc::now().to_rfc3339()
}

/// Lowercase, dash-separated slug of a title.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    for c in title.chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    let slug = slug.trim_end_matches('-').to_string();
    if slug.is_empty() { "post".to_string() } else { slug }
}

impl Default for MemoryContentApi {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryContentApi {
    /// new
    ///
    /// Demo accounts and categories only; no content.
    ///
    /// - `admin@example.com` / `password` (super_admin)
    /// - `researcher@example.com` / `password` (researcher)
    pub fn new() -> Self {
        let accounts = vec![
            Account {
                profile: Profile {
                    id: "admin-1".to_string(),
                    email: "admin@example.com".to_string(),
                    full_name: Some("Site Administrator".to_string()),
                    role: Role::SuperAdmin,
                },
                password: "password".to_string(),
            },
            Account {
                profile: Profile {
                    id: "researcher-1".to_string(),
                    email: "researcher@example.com".to_string(),
                    full_name: Some("Field Researcher".to_string()),
                    role: Role::Researcher,
                },
                password: "password".to_string(),
            },
        ];

        let categories = [
            ("cat-1", "Political Economy"),
            ("cat-2", "Technology & AI"),
            ("cat-3", "The Commons"),
            ("cat-4", "Field Reports"),
        ]
        .into_iter()
        .map(|(id, name)| Category {
            id: id.to_string(),
            name: name.to_string(),
            description: None,
        })
        .collect();

        Self {
            store: RwLock::new(Store {
                accounts,
                categories,
                ..Store::default()
            }),
        }
    }

    /// seeded
    ///
    /// `new()` plus a handful of posts so the local demo has something to show.
    pub async fn seeded() -> Self {
        let api = Self::new();
        let samples = [
            (
                "Data Commons in Rural Telangana",
                PostType::FieldStudy,
                PostStatus::Published,
                "Notes from two seasons of work with farming cooperatives on shared data infrastructure.",
            ),
            (
                "AI Beyond Extraction",
                PostType::Research,
                PostStatus::Published,
                "A political economy reading of large models and what collective ownership could mean.",
            ),
            (
                "On Platform Cooperatives",
                PostType::Opinion,
                PostStatus::Submitted,
                "Why worker-owned platforms need institutions, not only software.",
            ),
        ];
        for (title, post_type, status, excerpt) in samples {
            api.insert_post(Post {
                title: title.to_string(),
                excerpt: Some(excerpt.to_string()),
                content: format!("{excerpt}\n\nFull text forthcoming."),
                post_type,
                status,
                author_id: Some("researcher-1".to_string()),
                author_name: Some("Field Researcher".to_string()),
                category_id: Some("cat-1".to_string()),
                ..Post::default()
            })
            .await;
        }
        api
    }

    /// Stores `post` as-is, filling in id, slug and timestamps when missing.
    pub async fn insert_post(&self, mut post: Post) -> Post {
        let mut store = self.store.write().await;
        if post.id.is_empty() {
            post.id = Uuid::new_v4().to_string();
        }
        if post.slug.is_empty() {
            post.slug = store.unique_slug(&post.title);
        }
        post.created_at.get_or_insert_with(now);
        if post.status == PostStatus::Published {
            post.published_at.get_or_insert_with(now);
        }
        store.posts.push(post.clone());
        post
    }

    /// Stores a media item, attributed to the administrator.
    pub async fn insert_media(&self, media: Media) -> Media {
        let mut store = self.store.write().await;
        let mut media = media;
        if media.id.is_empty() {
            media.id = Uuid::new_v4().to_string();
        }
        media.created_at.get_or_insert_with(now);
        store.media.push(StoredMedia {
            media: media.clone(),
            uploaded_by: "admin-1".to_string(),
            admin_upload: true,
            bytes: Vec::new(),
            content_type: "application/octet-stream".to_string(),
        });
        media
    }

    pub async fn insert_image_category(&self, name: &str) -> ImageCategory {
        let category = ImageCategory {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            description: None,
        };
        self.store
            .write()
            .await
            .image_categories
            .push(category.clone());
        category
    }

    /// Lets `successes` more uploads through, then fails every following one.
    pub async fn fail_uploads_after(&self, successes: usize) {
        self.store.write().await.uploads_before_failure = Some(successes);
    }

    /// Raw post lookup, ignoring visibility rules.
    pub async fn post(&self, id: &str) -> Option<Post> {
        let store = self.store.read().await;
        store.posts.iter().find(|p| p.id == id).map(|p| store.with_media(p))
    }

    pub async fn post_count(&self) -> usize {
        self.store.read().await.posts.len()
    }

    /// Raw media listing, ignoring visibility rules.
    pub async fn all_media(&self) -> Vec<Media> {
        self.store
            .read()
            .await
            .media
            .iter()
            .map(|m| m.media.clone())
            .collect()
    }

    pub async fn contact_submissions(&self) -> Vec<ContactSubmission> {
        self.store.read().await.contacts.clone()
    }
}

impl Store {
    fn caller(&self, token: Option<&str>) -> SiteResult<Caller> {
        let Some(token) = token else {
            return Ok(Caller::Anonymous);
        };
        let profile_id = self.tokens.get(token).ok_or(SiteError::Unauthorized)?;
        self.accounts
            .iter()
            .find(|a| &a.profile.id == profile_id)
            .map(|a| Caller::Member(a.profile.clone()))
            .ok_or(SiteError::Unauthorized)
    }

    fn member(&self, token: &str) -> SiteResult<Profile> {
        match self.caller(Some(token))? {
            Caller::Member(profile) => Ok(profile),
            Caller::Anonymous => Err(SiteError::Unauthorized),
        }
    }

    fn admin(&self, token: &str) -> SiteResult<Profile> {
        let profile = self.member(token)?;
        if profile.role == Role::SuperAdmin {
            Ok(profile)
        } else {
            Err(forbidden())
        }
    }

    fn unique_slug(&self, title: &str) -> String {
        let base = slugify(title);
        let mut slug = base.clone();
        let mut n = 2;
        while self.posts.iter().any(|p| p.slug == slug) {
            slug = format!("{base}-{n}");
            n += 1;
        }
        slug
    }

    fn can_see_post(caller: &Caller, post: &Post) -> bool {
        post.status == PostStatus::Published
            || caller.is_admin()
            || (caller.id().is_some() && caller.id() == post.author_id.as_deref())
    }

    fn can_edit_post(caller: &Profile, post: &Post) -> bool {
        caller.role == Role::SuperAdmin || post.author_id.as_deref() == Some(caller.id.as_str())
    }

    fn post_index(&self, id: &str) -> SiteResult<usize> {
        self.posts
            .iter()
            .position(|p| p.id == id)
            .ok_or(SiteError::NotFound)
    }

    fn media_index(&self, id: &str) -> SiteResult<usize> {
        self.media
            .iter()
            .position(|m| m.media.id == id)
            .ok_or(SiteError::NotFound)
    }

    /// The post with its attached media filled in.
    fn with_media(&self, post: &Post) -> Post {
        let mut post = post.clone();
        post.media = self
            .media
            .iter()
            .filter(|m| m.media.post_id.as_deref() == Some(post.id.as_str()))
            .map(|m| m.media.clone())
            .collect();
        post
    }

    fn apply_payload(post: &mut Post, payload: &PostPayload) -> SiteResult<()> {
        if payload.title.trim().is_empty() {
            return Err(bad_request("Title is required"));
        }
        // A restore puts back whatever status the post had; authors otherwise
        // only choose between draft and submitted.
        let allowed = match payload.status {
            PostStatus::Draft | PostStatus::Submitted => true,
            PostStatus::Unknown => false,
            _ => payload.restore,
        };
        if !allowed {
            return Err(bad_request("Posts can only be saved as draft or submitted"));
        }
        let non_empty = |s: &str| (!s.trim().is_empty()).then(|| s.to_string());

        post.title = payload.title.clone();
        post.content = payload.content.clone();
        post.excerpt = non_empty(&payload.excerpt);
        post.post_type = payload.post_type;
        post.category_id = payload.category_id.clone().filter(|c| !c.is_empty());
        post.author_name = non_empty(&payload.author_name).or(post.author_name.take());
        post.featured_image_url = non_empty(&payload.featured_image_url);
        post.document_url = non_empty(&payload.document_url);
        post.document_urls = payload.document_urls.clone();
        post.status = payload.status;
        post.updated_at = Some(now());
        Ok(())
    }
}

#[async_trait]
impl ContentApi for MemoryContentApi {
    async fn login(&self, request: &LoginRequest) -> SiteResult<LoginResponse> {
        let mut store = self.store.write().await;
        let profile = store
            .accounts
            .iter()
            .find(|a| {
                a.profile.email.eq_ignore_ascii_case(request.email.trim())
                    && a.password == request.password
            })
            .map(|a| a.profile.clone())
            .ok_or_else(|| SiteError::Api {
                status: 400,
                message: "Invalid login credentials".to_string(),
            })?;

        let token = format!("mem-{}", Uuid::new_v4().simple());
        store.tokens.insert(token.clone(), profile.id.clone());
        Ok(LoginResponse { token, profile })
    }

    async fn list_posts(&self, token: Option<&str>, query: &PostQuery) -> SiteResult<Vec<Post>> {
        let store = self.store.read().await;
        let caller = store.caller(token)?;

        let mut posts: Vec<Post> = store
            .posts
            .iter()
            .rev()
            .filter(|p| Store::can_see_post(&caller, p))
            .filter(|p| query.status.is_none_or(|s| p.status == s))
            .filter(|p| {
                query
                    .author_id
                    .as_deref()
                    .is_none_or(|a| p.author_id.as_deref() == Some(a))
            })
            .map(|p| store.with_media(p))
            .collect();

        if let Some(limit) = query.limit {
            posts.truncate(limit as usize);
        }
        Ok(posts)
    }

    async fn get_post(&self, token: Option<&str>, key: &str) -> SiteResult<Post> {
        let mut store = self.store.write().await;
        let caller = store.caller(token)?;
        let index = store
            .posts
            .iter()
            .position(|p| (p.id == key || p.slug == key) && Store::can_see_post(&caller, p))
            .ok_or(SiteError::NotFound)?;

        if store.posts[index].status == PostStatus::Published {
            store.posts[index].view_count += 1;
        }
        Ok(store.with_media(&store.posts[index]))
    }

    async fn create_post(&self, token: &str, payload: &PostPayload) -> SiteResult<Post> {
        let mut store = self.store.write().await;
        let author = store.member(token)?;

        let mut post = Post {
            id: Uuid::new_v4().to_string(),
            slug: store.unique_slug(&payload.title),
            author_id: Some(author.id.clone()),
            author_name: Some(author.display_name().to_string()),
            created_at: Some(now()),
            ..Post::default()
        };
        Store::apply_payload(&mut post, payload)?;
        store.posts.push(post.clone());
        Ok(post)
    }

    async fn update_post(&self, token: &str, id: &str, payload: &PostPayload) -> SiteResult<Post> {
        let mut store = self.store.write().await;
        let caller = store.member(token)?;
        let index = store.post_index(id)?;
        if !Store::can_edit_post(&caller, &store.posts[index]) {
            return Err(forbidden());
        }

        let mut post = store.posts[index].clone();
        Store::apply_payload(&mut post, payload)?;
        store.posts[index] = post;
        Ok(store.with_media(&store.posts[index]))
    }

    async fn delete_post(&self, token: &str, id: &str) -> SiteResult<()> {
        let mut store = self.store.write().await;
        let caller = store.member(token)?;
        let index = store.post_index(id)?;
        if !Store::can_edit_post(&caller, &store.posts[index]) {
            return Err(forbidden());
        }

        store.posts.remove(index);
        store.media.retain(|m| m.media.post_id.as_deref() != Some(id));
        Ok(())
    }

    async fn approve_post(&self, token: &str, id: &str) -> SiteResult<()> {
        let mut store = self.store.write().await;
        store.admin(token)?;
        let index = store.post_index(id)?;

        let post = &mut store.posts[index];
        if !post.status.is_pending() {
            return Err(SiteError::Api {
                status: 409,
                message: format!("Post is {} and cannot be approved", post.status.label()),
            });
        }
        post.status = PostStatus::Published;
        post.published_at = Some(now());
        post.feedback = None;
        Ok(())
    }

    async fn reject_post(&self, token: &str, id: &str, request: &RejectRequest) -> SiteResult<()> {
        let mut store = self.store.write().await;
        store.admin(token)?;
        if request.feedback.trim().is_empty() {
            return Err(bad_request("Rejection feedback is required"));
        }
        let index = store.post_index(id)?;

        let post = &mut store.posts[index];
        if !post.status.is_pending() {
            return Err(SiteError::Api {
                status: 409,
                message: format!("Post is {} and cannot be rejected", post.status.label()),
            });
        }
        post.status = PostStatus::Rejected;
        post.feedback = Some(request.feedback.trim().to_string());
        Ok(())
    }

    async fn list_categories(&self) -> SiteResult<Vec<Category>> {
        Ok(self.store.read().await.categories.clone())
    }

    async fn list_image_categories(&self) -> SiteResult<Vec<ImageCategory>> {
        Ok(self.store.read().await.image_categories.clone())
    }

    async fn create_image_category(
        &self,
        token: &str,
        payload: &CategoryPayload,
    ) -> SiteResult<ImageCategory> {
        let mut store = self.store.write().await;
        store.admin(token)?;
        let name = payload.name.trim();
        if name.is_empty() {
            return Err(bad_request("Category name cannot be empty"));
        }
        if store
            .image_categories
            .iter()
            .any(|c| c.name.eq_ignore_ascii_case(name))
        {
            return Err(SiteError::Api {
                status: 409,
                message: "Category already exists".to_string(),
            });
        }

        let category = ImageCategory {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            description: Some(payload.description.clone()).filter(|d| !d.is_empty()),
        };
        store.image_categories.insert(0, category.clone());
        Ok(category)
    }

    async fn update_image_category(
        &self,
        token: &str,
        id: &str,
        payload: &CategoryPayload,
    ) -> SiteResult<()> {
        let mut store = self.store.write().await;
        store.admin(token)?;
        if payload.name.trim().is_empty() {
            return Err(bad_request("Category name cannot be empty"));
        }
        let category = store
            .image_categories
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(SiteError::NotFound)?;
        category.name = payload.name.trim().to_string();
        Ok(())
    }

    async fn delete_image_category(&self, token: &str, id: &str) -> SiteResult<()> {
        let mut store = self.store.write().await;
        store.admin(token)?;
        let before = store.image_categories.len();
        store.image_categories.retain(|c| c.id != id);
        if store.image_categories.len() == before {
            return Err(SiteError::NotFound);
        }
        // Images in the category become uncategorized.
        for stored in store.media.iter_mut() {
            if stored.media.image_category_id.as_deref() == Some(id) {
                stored.media.image_category_id = None;
            }
        }
        Ok(())
    }

    async fn list_media(&self, token: Option<&str>, query: &MediaQuery) -> SiteResult<Vec<Media>> {
        let store = self.store.read().await;
        let caller = store.caller(token)?;
        let is_admin = caller.is_admin();

        Ok(store
            .media
            .iter()
            .rev()
            .filter(|m| is_admin || m.media.status == MediaStatus::Approved)
            .filter(|m| query.media_type.is_none_or(|t| m.media.media_type == t))
            .filter(|m| !query.unattached || m.media.post_id.is_none())
            .filter(|m| !query.admin_uploads || m.admin_upload)
            .map(|m| m.media.clone())
            .collect())
    }

    async fn upload_media(&self, token: &str, upload: MediaUpload) -> SiteResult<UploadedMedia> {
        let mut store = self.store.write().await;
        let uploader = store.member(token)?;

        if let Some(remaining) = store.uploads_before_failure.as_mut() {
            if *remaining == 0 {
                return Err(SiteError::Api {
                    status: 500,
                    message: "Upload failed".to_string(),
                });
            }
            *remaining -= 1;
        }

        if upload.file.bytes.is_empty() {
            return Err(bad_request("Uploaded file is empty"));
        }
        if let Some(post_id) = upload.post_id.as_deref() {
            let index = store.post_index(post_id)?;
            if !Store::can_edit_post(&uploader, &store.posts[index]) {
                return Err(forbidden());
            }
        }

        let media_type = upload.media_type.unwrap_or_else(|| {
            if upload.file.content_type.starts_with("image/") {
                MediaType::Image
            } else if upload.file.content_type == "application/pdf" {
                MediaType::Pdf
            } else {
                MediaType::Document
            }
        });

        let id = Uuid::new_v4().to_string();
        let admin_upload = uploader.role == Role::SuperAdmin;
        let media = Media {
            id: id.clone(),
            media_type,
            url: format!("/uploads/{id}/{}", upload.file.filename),
            title: upload.title.unwrap_or_else(|| upload.file.filename.clone()),
            description: upload.description.filter(|d| !d.is_empty()),
            image_category_id: upload.image_category_id,
            post_id: upload.post_id,
            youtube_url: None,
            status: if admin_upload {
                MediaStatus::Approved
            } else {
                MediaStatus::Pending
            },
            created_at: Some(now()),
        };

        store.media.push(StoredMedia {
            media: media.clone(),
            uploaded_by: uploader.id,
            admin_upload,
            bytes: upload.file.bytes,
            content_type: upload.file.content_type,
        });

        Ok(UploadedMedia {
            id: Some(id),
            url: Some(media.url.clone()),
            media: Some(media),
        })
    }

    async fn submit_video(&self, token: &str, submission: &VideoSubmission) -> SiteResult<()> {
        let mut store = self.store.write().await;
        let uploader = store.member(token)?;
        youtube_video_id(&submission.youtube_url).ok_or_else(|| bad_request("Invalid YouTube URL"))?;

        let admin_upload = uploader.role == Role::SuperAdmin;
        store.media.push(StoredMedia {
            media: Media {
                id: Uuid::new_v4().to_string(),
                media_type: MediaType::Video,
                url: submission.youtube_url.clone(),
                title: submission.title.clone(),
                youtube_url: Some(submission.youtube_url.clone()),
                status: if admin_upload {
                    MediaStatus::Approved
                } else {
                    MediaStatus::Pending
                },
                created_at: Some(now()),
                ..Media::default()
            },
            uploaded_by: uploader.id,
            admin_upload,
            bytes: Vec::new(),
            content_type: String::new(),
        });
        Ok(())
    }

    async fn update_media(&self, token: &str, id: &str, update: &MediaUpdate) -> SiteResult<Media> {
        let mut store = self.store.write().await;
        store.admin(token)?;
        let index = store.media_index(id)?;

        let media = &mut store.media[index].media;
        if !update.title.trim().is_empty() {
            media.title = update.title.trim().to_string();
        }
        media.description = Some(update.description.clone()).filter(|d| !d.is_empty());
        media.image_category_id = update.image_category_id.clone().filter(|c| !c.is_empty());
        Ok(media.clone())
    }

    async fn approve_media(&self, token: &str, id: &str) -> SiteResult<()> {
        let mut store = self.store.write().await;
        store.admin(token)?;
        let index = store.media_index(id)?;
        store.media[index].media.status = MediaStatus::Approved;
        Ok(())
    }

    async fn delete_media(
        &self,
        token: &str,
        id: &str,
        _media_type: Option<MediaType>,
    ) -> SiteResult<()> {
        let mut store = self.store.write().await;
        let caller = store.member(token)?;
        let index = store.media_index(id)?;
        if caller.role != Role::SuperAdmin && store.media[index].uploaded_by != caller.id {
            return Err(forbidden());
        }
        store.media.remove(index);
        Ok(())
    }

    async fn download_media(&self, id: &str) -> SiteResult<Download> {
        let store = self.store.read().await;
        let stored = &store.media[store.media_index(id)?];
        if stored.bytes.is_empty() {
            return Err(SiteError::NotFound);
        }
        Ok(Download {
            filename: stored.media.display_name(),
            content_type: stored.content_type.clone(),
            bytes: stored.bytes.clone(),
        })
    }

    async fn list_users(&self, token: &str, role: Option<Role>) -> SiteResult<Vec<Profile>> {
        let store = self.store.read().await;
        store.admin(token)?;
        Ok(store
            .accounts
            .iter()
            .map(|a| a.profile.clone())
            .filter(|p| role.is_none_or(|r| p.role == r))
            .collect())
    }

    async fn list_contact_submissions(&self, token: &str) -> SiteResult<Vec<ContactSubmission>> {
        let store = self.store.read().await;
        store.admin(token)?;
        Ok(store.contacts.iter().rev().cloned().collect())
    }

    async fn submit_contact(&self, request: &ContactRequest) -> SiteResult<()> {
        if request.name.trim().is_empty() || request.message.trim().is_empty() {
            return Err(bad_request("Name and message are required"));
        }
        if !request.email.contains('@') {
            return Err(bad_request("A valid email address is required"));
        }

        let mut store = self.store.write().await;
        store.contacts.push(ContactSubmission {
            id: Uuid::new_v4().to_string(),
            name: request.name.trim().to_string(),
            email: request.email.trim().to_string(),
            message: request.message.trim().to_string(),
            created_at: Some(now()),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn token_for(api: &MemoryContentApi, email: &str) -> String {
        api.login(&LoginRequest {
            email: email.to_string(),
            password: "password".to_string(),
        })
        .await
        .unwrap()
        .token
    }

    #[test]
    fn slugs_are_url_safe() {
        assert_eq!(slugify("AI Beyond Extraction!"), "ai-beyond-extraction");
        assert_eq!(slugify("  --  "), "post");
    }

    #[tokio::test]
    async fn anonymous_readers_only_see_published_posts() {
        let api = MemoryContentApi::seeded().await;
        let posts = api.list_posts(None, &PostQuery::default()).await.unwrap();
        assert_eq!(posts.len(), 2);
        assert!(posts.iter().all(|p| p.status == PostStatus::Published));
    }

    #[tokio::test]
    async fn researchers_cannot_moderate() {
        let api = MemoryContentApi::seeded().await;
        let token = token_for(&api, "researcher@example.com").await;
        let pending = api
            .list_posts(Some(&token), &PostQuery::default())
            .await
            .unwrap()
            .into_iter()
            .find(|p| p.status.is_pending())
            .unwrap();

        let err = api.approve_post(&token, &pending.id).await.unwrap_err();
        assert!(matches!(err, SiteError::Api { status: 403, .. }));
    }

    #[tokio::test]
    async fn approve_publishes_pending_post() {
        let api = MemoryContentApi::seeded().await;
        let admin = token_for(&api, "admin@example.com").await;
        let pending = api
            .list_posts(Some(&admin), &PostQuery::default())
            .await
            .unwrap()
            .into_iter()
            .find(|p| p.status.is_pending())
            .unwrap();

        api.approve_post(&admin, &pending.id).await.unwrap();
        let post = api.post(&pending.id).await.unwrap();
        assert_eq!(post.status, PostStatus::Published);
        assert!(post.published_at.is_some());

        // A second approval is a conflict.
        let err = api.approve_post(&admin, &pending.id).await.unwrap_err();
        assert!(matches!(err, SiteError::Api { status: 409, .. }));
    }

    #[tokio::test]
    async fn unknown_token_is_unauthorized() {
        let api = MemoryContentApi::new();
        let err = api
            .list_posts(Some("stale"), &PostQuery::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SiteError::Unauthorized));
    }

    #[tokio::test]
    async fn deleting_image_category_uncategorizes_images() {
        let api = MemoryContentApi::new();
        let admin = token_for(&api, "admin@example.com").await;
        let category = api.insert_image_category("Workshops").await;
        api.insert_media(Media {
            media_type: MediaType::Image,
            status: MediaStatus::Approved,
            image_category_id: Some(category.id.clone()),
            ..Media::default()
        })
        .await;

        api.delete_image_category(&admin, &category.id).await.unwrap();
        let media = api.all_media().await;
        assert_eq!(media[0].image_category_id, None);
    }

    #[tokio::test]
    async fn upload_failure_injection() {
        let api = MemoryContentApi::new();
        let admin = token_for(&api, "admin@example.com").await;
        api.fail_uploads_after(1).await;

        let upload = || MediaUpload {
            file: crate::models::UploadFile {
                filename: "a.pdf".into(),
                content_type: "application/pdf".into(),
                bytes: vec![1, 2, 3],
            },
            ..MediaUpload::default()
        };
        assert!(api.upload_media(&admin, upload()).await.is_ok());
        assert!(api.upload_media(&admin, upload()).await.is_err());
    }
}
