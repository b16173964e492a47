use axum::{
    http::{StatusCode, header},
    response::{Html, IntoResponse, Redirect, Response},
};

use crate::session;

/// SiteError
///
/// Every failure a page handler can surface. Network and decoding failures from
/// the content API are folded into this taxonomy at the client boundary so the
/// handlers only ever deal with one error type.
#[derive(Debug, thiserror::Error)]
pub enum SiteError {
    /// The content API rejected the bearer token, or no session exists.
    #[error("session missing or expired")]
    Unauthorized,

    #[error("resource not found")]
    NotFound,

    /// Any other non-success status from the content API.
    #[error("content api returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("content api request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("malformed content api response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("template rendering failed: {0}")]
    Template(#[from] tera::Error),

    #[error("session token could not be issued: {0}")]
    Session(#[from] jsonwebtoken::errors::Error),

    /// Input rejected before anything was sent to the content API.
    #[error("{0}")]
    Validation(String),
}

pub type SiteResult<T> = Result<T, SiteError>;

impl SiteError {
    /// Message suitable for showing to the visitor in a flash banner.
    pub fn user_message(&self) -> String {
        match self {
            SiteError::Api { message, .. } if !message.is_empty() => message.clone(),
            SiteError::Validation(message) => message.clone(),
            SiteError::NotFound => "The requested item no longer exists".to_string(),
            SiteError::Unauthorized => "Please sign in again".to_string(),
            _ => "Something went wrong, please try again".to_string(),
        }
    }
}

impl IntoResponse for SiteError {
    fn into_response(self) -> Response {
        let status = match &self {
            // A stale session is dropped and the visitor sent back to sign in.
            SiteError::Unauthorized => {
                tracing::info!("content api rejected session, redirecting to login");
                return (
                    [(header::SET_COOKIE, session::clear_session_cookie())],
                    Redirect::to("/login"),
                )
                    .into_response();
            }
            SiteError::NotFound => StatusCode::NOT_FOUND,
            SiteError::Validation(_) => StatusCode::BAD_REQUEST,
            SiteError::Api { status, .. } if *status == 403 => StatusCode::FORBIDDEN,
            SiteError::Api { .. } | SiteError::Transport(_) | SiteError::Decode(_) => {
                tracing::error!(error = %self, "content api failure");
                StatusCode::BAD_GATEWAY
            }
            SiteError::Template(_) | SiteError::Session(_) => {
                tracing::error!(error = ?self, "internal failure");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, Html(error_page(status, &self.user_message()))).into_response()
    }
}

/// Bare fallback page; used where the template engine is unavailable.
fn error_page(status: StatusCode, message: &str) -> String {
    format!(
        "<!doctype html><html><head><meta charset=\"utf-8\"><title>{code}</title></head>\
         <body style=\"font-family:Georgia,serif;padding:10rem 2rem;text-align:center\">\
         <h1>{code}</h1><p>{message}</p><p><a href=\"/\">Return home</a></p></body></html>",
        code = status.as_u16(),
        message = escape_html(message),
    )
}

fn escape_html(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthorized_redirects_to_login_and_clears_cookie() {
        let response = SiteError::Unauthorized.into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/login");
        let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
        assert!(cookie.contains("Max-Age=0"));
    }

    #[test]
    fn api_failures_map_to_bad_gateway() {
        let response = SiteError::Api {
            status: 500,
            message: "boom".into(),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn messages_are_escaped() {
        let page = error_page(StatusCode::BAD_REQUEST, "<script>");
        assert!(page.contains("&lt;script&gt;"));
    }
}
