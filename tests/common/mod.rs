#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, Response, header},
};
use pilabs_site::{
    AppConfig, AppState, ListCache, MemoryContentApi, Templates, create_router,
    models::{Post, PostStatus, PostType},
    session::{self, SESSION_COOKIE, Session, encode_session},
};
use std::sync::Arc;
use tower::ServiceExt;

/// A site wired to an in-memory content API the test can inspect.
pub struct TestSite {
    pub api: Arc<MemoryContentApi>,
    pub config: AppConfig,
    pub router: Router,
}

impl TestSite {
    pub fn new() -> Self {
        Self::with_api(MemoryContentApi::new())
    }

    pub fn with_api(api: MemoryContentApi) -> Self {
        let api = Arc::new(api);
        let config = AppConfig::default();
        let state = AppState {
            api: api.clone(),
            cache: ListCache::new(config.cache_ttl),
            templates: Templates::new().unwrap(),
            config: config.clone(),
        };
        Self {
            api,
            config,
            router: create_router(state),
        }
    }

    /// `Cookie` header value for a signed-in demo account.
    pub async fn login_cookie(&self, email: &str) -> String {
        let (_, set_cookie) = session::sign_in(self.api.as_ref(), &self.config, email, "password")
            .await
            .unwrap();
        cookie_pair(&set_cookie)
    }

    pub async fn researcher(&self) -> String {
        self.login_cookie("researcher@example.com").await
    }

    pub async fn admin(&self) -> String {
        self.login_cookie("admin@example.com").await
    }

    /// A session cookie the site accepts but whose API token is unknown.
    pub fn stale_cookie(&self, profile_id: &str) -> String {
        let session = Session {
            token: "revoked-token".to_string(),
            profile: pilabs_site::models::Profile {
                id: profile_id.to_string(),
                email: "gone@example.com".to_string(),
                ..Default::default()
            },
        };
        let jwt = encode_session(&session, &self.config.session_secret, self.config.session_ttl)
            .unwrap();
        format!("{SESSION_COOKIE}={jwt}")
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> Response<Body> {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    pub async fn post_form(&self, uri: &str, cookie: Option<&str>, body: &str) -> Response<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }

    pub async fn post_multipart(
        &self,
        uri: &str,
        cookie: &str,
        multipart: MultipartBody,
    ) -> Response<Body> {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::COOKIE, cookie)
            .header(header::CONTENT_TYPE, multipart.content_type())
            .body(Body::from(multipart.finish()))
            .unwrap();
        self.send(request).await
    }

    pub async fn submitted_post(&self, title: &str) -> Post {
        self.api
            .insert_post(Post {
                title: title.to_string(),
                content: "Body".to_string(),
                post_type: PostType::Research,
                status: PostStatus::Submitted,
                author_id: Some("researcher-1".to_string()),
                author_name: Some("Field Researcher".to_string()),
                ..Post::default()
            })
            .await
    }
}

/// `name=value` out of a `Set-Cookie` header value.
pub fn cookie_pair(set_cookie: &str) -> String {
    set_cookie.split(';').next().unwrap_or_default().to_string()
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub fn location(response: &Response<Body>) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

pub fn set_cookies(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok().map(str::to_string))
        .collect()
}

/// Hand-built `multipart/form-data` body.
pub struct MultipartBody {
    boundary: &'static str,
    body: Vec<u8>,
}

impl MultipartBody {
    pub fn new() -> Self {
        Self {
            boundary: "pilabs-test-boundary",
            body: Vec::new(),
        }
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n",
                self.boundary
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, filename: &str, content_type: &str, bytes: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n",
                self.boundary
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(bytes);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    pub fn finish(mut self) -> Vec<u8> {
        self.body
            .extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());
        self.body
    }
}
