use axum::{
    extract::{FromRequestParts, Request},
    http::{HeaderValue, header, request::Parts},
    middleware::Next,
    response::Response,
};
use serde::Serialize;
use std::convert::Infallible;

use crate::session::read_cookie;

pub const FLASH_COOKIE: &str = "pilabs_flash";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashKind {
    Success,
    Error,
}

/// Flash
///
/// A one-shot message carried across a POST/redirect/GET in a cookie and shown
/// on the next rendered page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Flash {
    pub kind: FlashKind,
    pub message: String,
}

impl Flash {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Error,
            message: message.into(),
        }
    }

    /// `Set-Cookie` value carrying this message to the next request.
    pub fn cookie(&self) -> String {
        let kind = match self.kind {
            FlashKind::Success => "s",
            FlashKind::Error => "e",
        };
        format!(
            "{FLASH_COOKIE}={kind}:{}; Path=/; HttpOnly; SameSite=Lax; Max-Age=60",
            urlencoding::encode(&self.message)
        )
    }

    fn parse(raw: &str) -> Option<Self> {
        let (kind, message) = raw.split_once(':')?;
        let kind = match kind {
            "s" => FlashKind::Success,
            "e" => FlashKind::Error,
            _ => return None,
        };
        let message = urlencoding::decode(message).ok()?.into_owned();
        Some(Self { kind, message })
    }
}

fn clear_cookie() -> String {
    format!("{FLASH_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

/// flash_middleware
///
/// 1. Moves an incoming flash cookie into the request extensions.
/// 2. Runs the handler.
/// 3. Expires the consumed cookie, unless the handler queued a new message.
pub async fn flash_middleware(mut request: Request, next: Next) -> Response {
    // 1. Consume
    let incoming = read_cookie(request.headers(), FLASH_COOKIE).filter(|raw| !raw.is_empty());
    if let Some(flash) = incoming.as_deref().and_then(Flash::parse) {
        request.extensions_mut().insert(flash);
    }

    // 2. Handle
    let mut response = next.run(request).await;

    // 3. Expire
    if incoming.is_some() {
        let prefix = format!("{FLASH_COOKIE}=");
        let replaced = response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .any(|value| value.to_str().is_ok_and(|v| v.starts_with(&prefix)));
        if !replaced {
            if let Ok(value) = HeaderValue::from_str(&clear_cookie()) {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
        }
    }
    response
}

/// The flash message for this request, if any.
#[derive(Debug, Clone, Default)]
pub struct IncomingFlash(pub Option<Flash>);

impl<S> FromRequestParts<S> for IncomingFlash
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(IncomingFlash(parts.extensions.get::<Flash>().cloned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cookie_value_survives_parsing() {
        let flash = Flash::error("Upload failed: report; final.pdf");
        let cookie = flash.cookie();
        let value = cookie
            .strip_prefix("pilabs_flash=")
            .and_then(|rest| rest.split("; ").next())
            .unwrap();
        assert_eq!(Flash::parse(value), Some(flash));
    }

    #[test]
    fn garbage_is_ignored() {
        assert_eq!(Flash::parse("x:hello"), None);
        assert_eq!(Flash::parse("no-separator"), None);
    }
}
