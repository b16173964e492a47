use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode, header, multipart};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::{sync::Arc, time::Duration};

use crate::{
    error::{SiteError, SiteResult},
    models::{
        Category, CategoryPayload, ContactRequest, ContactSubmission, Download, ImageCategory,
        LoginRequest, LoginResponse, Media, MediaQuery, MediaType, MediaUpdate, MediaUpload, Post,
        PostPayload, PostQuery, Profile, RejectRequest, Role, UploadedMedia, VideoSubmission,
        query_string,
    },
};

/// ContentApi
///
/// The contract of the foundation's content REST API, as consumed by the site.
/// Handlers only see this trait, so the real HTTP client (`HttpContentApi`) and
/// the in-memory implementation (`MemoryContentApi`) are interchangeable.
///
/// Reads take an optional bearer token (anonymous visitors have none); every
/// mutation requires one.
#[async_trait]
pub trait ContentApi: Send + Sync {
    // --- Auth ---
    async fn login(&self, request: &LoginRequest) -> SiteResult<LoginResponse>;

    // --- Posts ---
    async fn list_posts(&self, token: Option<&str>, query: &PostQuery) -> SiteResult<Vec<Post>>;
    // Accepts either the id or the slug.
    async fn get_post(&self, token: Option<&str>, key: &str) -> SiteResult<Post>;
    async fn create_post(&self, token: &str, payload: &PostPayload) -> SiteResult<Post>;
    async fn update_post(&self, token: &str, id: &str, payload: &PostPayload) -> SiteResult<Post>;
    async fn delete_post(&self, token: &str, id: &str) -> SiteResult<()>;
    async fn approve_post(&self, token: &str, id: &str) -> SiteResult<()>;
    async fn reject_post(&self, token: &str, id: &str, request: &RejectRequest) -> SiteResult<()>;

    // --- Categories ---
    async fn list_categories(&self) -> SiteResult<Vec<Category>>;
    async fn list_image_categories(&self) -> SiteResult<Vec<ImageCategory>>;
    async fn create_image_category(
        &self,
        token: &str,
        payload: &CategoryPayload,
    ) -> SiteResult<ImageCategory>;
    async fn update_image_category(
        &self,
        token: &str,
        id: &str,
        payload: &CategoryPayload,
    ) -> SiteResult<()>;
    async fn delete_image_category(&self, token: &str, id: &str) -> SiteResult<()>;

    // --- Media ---
    async fn list_media(&self, token: Option<&str>, query: &MediaQuery) -> SiteResult<Vec<Media>>;
    async fn upload_media(&self, token: &str, upload: MediaUpload) -> SiteResult<UploadedMedia>;
    async fn submit_video(&self, token: &str, submission: &VideoSubmission) -> SiteResult<()>;
    async fn update_media(&self, token: &str, id: &str, update: &MediaUpdate) -> SiteResult<Media>;
    async fn approve_media(&self, token: &str, id: &str) -> SiteResult<()>;
    async fn delete_media(
        &self,
        token: &str,
        id: &str,
        media_type: Option<MediaType>,
    ) -> SiteResult<()>;
    async fn download_media(&self, id: &str) -> SiteResult<Download>;

    // --- Users & contact ---
    async fn list_users(&self, token: &str, role: Option<Role>) -> SiteResult<Vec<Profile>>;
    async fn list_contact_submissions(&self, token: &str) -> SiteResult<Vec<ContactSubmission>>;
    async fn submit_contact(&self, request: &ContactRequest) -> SiteResult<()>;
}

/// ApiState
///
/// The type used to share the content API client across the application state.
pub type ApiState = Arc<dyn ContentApi>;

// --- Response shape helpers ---

/// decode_list
///
/// Turns a list response into items. A body that is not a JSON array yields an
/// empty list, and individual elements that fail to decode are skipped, so one
/// malformed record never blanks a whole page.
pub fn decode_list<T: DeserializeOwned>(resource: &str, body: Value) -> Vec<T> {
    let items = match body {
        Value::Array(items) => items,
        other => {
            tracing::warn!(resource, kind = json_kind(&other), "expected a list, got something else");
            return Vec::new();
        }
    };

    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                tracing::warn!(resource, error = %e, "skipping malformed list element");
                None
            }
        })
        .collect()
}

/// unwrap_envelope
///
/// Create/update endpoints answer either with the bare resource or with it
/// wrapped under a key (`{ "post": {...} }`). Returns the resource either way.
pub fn unwrap_envelope(body: Value, key: &str) -> Value {
    match body {
        Value::Object(mut map) if map.get(key).is_some_and(Value::is_object) => {
            map.remove(key).unwrap_or(Value::Null)
        }
        other => other,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Pulls a human readable message out of an error body (`{"error": ...}` or `{"message": ...}`).
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|json| {
            ["error", "message"]
                .iter()
                .find_map(|key| json.get(*key).and_then(Value::as_str).map(str::to_string))
        })
        .unwrap_or_else(|| body.chars().take(200).collect())
}

/// HttpContentApi
///
/// `ContentApi` backed by the real REST service, using a shared reqwest client.
#[derive(Clone)]
pub struct HttpContentApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpContentApi {
    /// new
    ///
    /// Builds the client with the configured per-request timeout.
    pub fn new(base_url: &str, timeout: Duration) -> SiteResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("pilabs-site/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Starts a request, attaching the bearer token when there is one.
    fn request(&self, method: Method, path: &str, token: Option<&str>) -> RequestBuilder {
        let builder = self.client.request(method, self.url(path));
        match token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Sends the request and maps non-success statuses into `SiteError`.
    async fn send(&self, builder: RequestBuilder) -> SiteResult<Response> {
        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let url = response.url().path().to_string();
        let body = response.text().await.unwrap_or_default();
        tracing::debug!(%status, url, "content api call failed");

        Err(match status {
            StatusCode::UNAUTHORIZED => SiteError::Unauthorized,
            StatusCode::NOT_FOUND => SiteError::NotFound,
            _ => SiteError::Api {
                status: status.as_u16(),
                message: error_message(&body),
            },
        })
    }

    async fn send_value(&self, builder: RequestBuilder) -> SiteResult<Value> {
        let response = self.send(builder).await?;
        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        envelope: Option<&str>,
    ) -> SiteResult<T> {
        let mut body = self.send_value(builder).await?;
        if let Some(key) = envelope {
            body = unwrap_envelope(body, key);
        }
        Ok(serde_json::from_value(body)?)
    }

    async fn send_list<T: DeserializeOwned>(
        &self,
        resource: &str,
        builder: RequestBuilder,
    ) -> SiteResult<Vec<T>> {
        let body = self.send_value(builder).await?;
        Ok(decode_list(resource, body))
    }

    async fn send_empty(&self, builder: RequestBuilder) -> SiteResult<()> {
        self.send(builder).await.map(|_| ())
    }
}

#[async_trait]
impl ContentApi for HttpContentApi {
    async fn login(&self, request: &LoginRequest) -> SiteResult<LoginResponse> {
        let builder = self.request(Method::POST, "/auth/login", None).json(request);
        self.send_json(builder, None).await
    }

    async fn list_posts(&self, token: Option<&str>, query: &PostQuery) -> SiteResult<Vec<Post>> {
        let builder = self
            .request(Method::GET, "/posts", token)
            .query(&query.to_pairs());
        self.send_list("posts", builder).await
    }

    async fn get_post(&self, token: Option<&str>, key: &str) -> SiteResult<Post> {
        let path = item_path("posts", key);
        self.send_json(self.request(Method::GET, &path, token), Some("post"))
            .await
    }

    async fn create_post(&self, token: &str, payload: &PostPayload) -> SiteResult<Post> {
        let builder = self.request(Method::POST, "/posts", Some(token)).json(payload);
        self.send_json(builder, Some("post")).await
    }

    async fn update_post(&self, token: &str, id: &str, payload: &PostPayload) -> SiteResult<Post> {
        let builder = self
            .request(Method::PUT, &item_path("posts", id), Some(token))
            .json(payload);
        self.send_json(builder, Some("post")).await
    }

    async fn delete_post(&self, token: &str, id: &str) -> SiteResult<()> {
        let builder = self.request(Method::DELETE, &item_path("posts", id), Some(token));
        self.send_empty(builder).await
    }

    async fn approve_post(&self, token: &str, id: &str) -> SiteResult<()> {
        let builder = self
            .request(Method::POST, &format!("{}/approve", item_path("posts", id)), Some(token))
            .json(&serde_json::json!({}));
        self.send_empty(builder).await
    }

    async fn reject_post(&self, token: &str, id: &str, request: &RejectRequest) -> SiteResult<()> {
        let builder = self
            .request(Method::POST, &format!("{}/reject", item_path("posts", id)), Some(token))
            .json(request);
        self.send_empty(builder).await
    }

    async fn list_categories(&self) -> SiteResult<Vec<Category>> {
        self.send_list("categories", self.request(Method::GET, "/categories", None))
            .await
    }

    async fn list_image_categories(&self) -> SiteResult<Vec<ImageCategory>> {
        self.send_list(
            "image-categories",
            self.request(Method::GET, "/image-categories", None),
        )
        .await
    }

    async fn create_image_category(
        &self,
        token: &str,
        payload: &CategoryPayload,
    ) -> SiteResult<ImageCategory> {
        let builder = self
            .request(Method::POST, "/image-categories", Some(token))
            .json(payload);
        self.send_json(builder, Some("category")).await
    }

    async fn update_image_category(
        &self,
        token: &str,
        id: &str,
        payload: &CategoryPayload,
    ) -> SiteResult<()> {
        let builder = self
            .request(Method::PUT, &item_path("image-categories", id), Some(token))
            .json(payload);
        self.send_empty(builder).await
    }

    async fn delete_image_category(&self, token: &str, id: &str) -> SiteResult<()> {
        let path = item_path("image-categories", id);
        self.send_empty(self.request(Method::DELETE, &path, Some(token)))
            .await
    }

    async fn list_media(&self, token: Option<&str>, query: &MediaQuery) -> SiteResult<Vec<Media>> {
        let builder = self
            .request(Method::GET, "/media", token)
            .query(&query.to_pairs());
        self.send_list("media", builder).await
    }

    async fn upload_media(&self, token: &str, upload: MediaUpload) -> SiteResult<UploadedMedia> {
        let MediaUpload {
            file,
            title,
            description,
            media_type,
            image_category_id,
            post_id,
        } = upload;

        let part = multipart::Part::bytes(file.bytes)
            .file_name(file.filename)
            .mime_str(&file.content_type)?;
        let mut form = multipart::Form::new().part("file", part);

        let optional = [
            ("title", title),
            ("description", description),
            ("type", media_type.map(String::from)),
            ("image_category_id", image_category_id),
            ("post_id", post_id),
        ];
        for (name, value) in optional {
            if let Some(value) = value {
                form = form.text(name, value);
            }
        }

        let builder = self
            .request(Method::POST, "/media/upload", Some(token))
            .multipart(form);
        self.send_json(builder, None).await
    }

    async fn submit_video(&self, token: &str, submission: &VideoSubmission) -> SiteResult<()> {
        let builder = self
            .request(Method::POST, "/media/upload", Some(token))
            .json(submission);
        self.send_empty(builder).await
    }

    async fn update_media(&self, token: &str, id: &str, update: &MediaUpdate) -> SiteResult<Media> {
        let builder = self
            .request(Method::PUT, &item_path("media", id), Some(token))
            .json(update);
        self.send_json(builder, Some("media")).await
    }

    async fn approve_media(&self, token: &str, id: &str) -> SiteResult<()> {
        let builder = self
            .request(Method::POST, &format!("{}/approve", item_path("media", id)), Some(token))
            .json(&serde_json::json!({}));
        self.send_empty(builder).await
    }

    async fn delete_media(
        &self,
        token: &str,
        id: &str,
        media_type: Option<MediaType>,
    ) -> SiteResult<()> {
        let path = item_path("media", id);
        let mut builder = self.request(Method::DELETE, &path, Some(token));
        if let Some(media_type) = media_type {
            builder = builder.query(&[("type", media_type.as_str())]);
        }
        self.send_empty(builder).await
    }

    async fn download_media(&self, id: &str) -> SiteResult<Download> {
        let path = item_path("media", id) + "/download";
        let response = self.send(self.request(Method::GET, &path, None)).await?;

        let headers = response.headers().clone();
        let content_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();
        let filename = headers
            .get(header::CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(disposition_filename)
            .unwrap_or_else(|| format!("{id}.pdf"));
        let bytes = response.bytes().await?.to_vec();

        Ok(Download {
            filename,
            content_type,
            bytes,
        })
    }

    async fn list_users(&self, token: &str, role: Option<Role>) -> SiteResult<Vec<Profile>> {
        let mut builder = self.request(Method::GET, "/users", Some(token));
        if let Some(role) = role {
            builder = builder.query(&[("role", role.as_str())]);
        }
        self.send_list("users", builder).await
    }

    async fn list_contact_submissions(&self, token: &str) -> SiteResult<Vec<ContactSubmission>> {
        self.send_list("contact", self.request(Method::GET, "/contact", Some(token)))
            .await
    }

    async fn submit_contact(&self, request: &ContactRequest) -> SiteResult<()> {
        let builder = self.request(Method::POST, "/contact", None).json(request);
        self.send_empty(builder).await
    }
}

impl std::fmt::Debug for HttpContentApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpContentApi")
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Extracts `filename` from a `Content-Disposition` header value.
fn disposition_filename(value: &str) -> Option<String> {
    value.split(';').map(str::trim).find_map(|part| {
        part.strip_prefix("filename=")
            .map(|name| name.trim_matches('"').to_string())
            .filter(|name| !name.is_empty())
    })
}

/// `/{collection}/{id}` with the id percent-encoded.
fn item_path(collection: &str, id: &str) -> String {
    format!("/{collection}/{}", urlencoding::encode(id))
}

/// Debug helper for log lines: `/posts?status=published`.
pub fn describe_posts_call(query: &PostQuery) -> String {
    let qs = query_string(&query.to_pairs());
    if qs.is_empty() {
        "/posts".to_string()
    } else {
        format!("/posts?{qs}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn non_array_list_becomes_empty() {
        let posts: Vec<Post> = decode_list("posts", json!({"error": "db down"}));
        assert!(posts.is_empty());
        let posts: Vec<Post> = decode_list("posts", Value::Null);
        assert!(posts.is_empty());
    }

    #[test]
    fn malformed_elements_are_skipped() {
        let posts: Vec<Post> = decode_list("posts", json!([{"id": "1", "title": "ok"}, "garbage", 42]));
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].title, "ok");
    }

    #[test]
    fn item_ids_are_percent_encoded() {
        assert_eq!(item_path("posts", "abc-1"), "/posts/abc-1");
        assert_eq!(item_path("media", "a/b?c#d"), "/media/a%2Fb%3Fc%23d");
    }

    #[test]
    fn envelope_is_unwrapped_when_present() {
        let wrapped = json!({"post": {"id": "p1"}, "message": "created"});
        assert_eq!(unwrap_envelope(wrapped, "post"), json!({"id": "p1"}));

        let bare = json!({"id": "p2"});
        assert_eq!(unwrap_envelope(bare.clone(), "post"), bare);
    }

    #[test]
    fn error_messages_are_extracted() {
        assert_eq!(error_message(r#"{"error":"Invalid credentials"}"#), "Invalid credentials");
        assert_eq!(error_message(r#"{"message":"nope"}"#), "nope");
        assert_eq!(error_message("plain text"), "plain text");
    }

    #[test]
    fn content_disposition_filename() {
        assert_eq!(
            disposition_filename(r#"attachment; filename="report.pdf""#).as_deref(),
            Some("report.pdf")
        );
        assert_eq!(disposition_filename("inline"), None);
    }

    #[test]
    fn posts_call_description_includes_query() {
        assert_eq!(
            describe_posts_call(&PostQuery::published()),
            "/posts?status=published"
        );
        assert_eq!(describe_posts_call(&PostQuery::default()), "/posts");
    }
}
