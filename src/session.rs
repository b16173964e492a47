use axum::{
    extract::{FromRef, FromRequestParts},
    http::{HeaderMap, header, request::Parts},
};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::{convert::Infallible, time::Duration};

use crate::{
    backend::ContentApi,
    config::{AppConfig, Env},
    error::{SiteError, SiteResult},
    models::{LoginRequest, Profile, Role},
};

pub const SESSION_COOKIE: &str = "pilabs_session";

/// Session
///
/// The signed-in identity of a visitor: the content API's bearer token plus
/// the profile returned at login. It is passed explicitly to handlers through
/// the `CurrentSession` and `SignedIn` extractors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub profile: Profile,
}

impl Session {
    pub fn is_admin(&self) -> bool {
        self.profile.role == Role::SuperAdmin
    }

    pub fn is_researcher(&self) -> bool {
        self.profile.role == Role::Researcher
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

/// SessionClaims
///
/// Payload of the session cookie, signed with the site secret (HS256).
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject (sub): the profile id.
    pub sub: String,
    /// Expiration Time (exp): the cookie is rejected after this instant.
    pub exp: usize,
    /// Issued At (iat).
    pub iat: usize,
    /// Bearer token for the content API.
    pub token: String,
    pub profile: Profile,
}

/// encode_session
///
/// Signs `session` into a compact JWT valid for `ttl`.
pub fn encode_session(session: &Session, secret: &str, ttl: Duration) -> SiteResult<String> {
    let now = Utc::now().timestamp().max(0) as usize;
    let claims = SessionClaims {
        sub: session.profile.id.clone(),
        exp: now + ttl.as_secs() as usize,
        iat: now,
        token: session.token.clone(),
        profile: session.profile.clone(),
    };

    Ok(encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?)
}

/// decode_session
///
/// Verifies signature and expiry. Any failure (tampering, expiry, an old cookie
/// format) simply means "no session".
pub fn decode_session(cookie: &str, secret: &str) -> Option<Session> {
    let mut validation = Validation::default();
    validation.validate_exp = true;

    match decode::<SessionClaims>(
        cookie,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    ) {
        Ok(data) => Some(Session {
            token: data.claims.token,
            profile: data.claims.profile,
        }),
        Err(e) => {
            tracing::debug!(error = %e, "ignoring invalid session cookie");
            None
        }
    }
}

/// Returns the value of cookie `name` from the request's `Cookie` headers.
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .find_map(|pair| {
            let (key, value) = pair.trim().split_once('=')?;
            (key == name).then(|| value.to_string())
        })
}

/// Builds a `Set-Cookie` value. `secure` is only set outside local development.
pub fn build_cookie(name: &str, value: &str, max_age: Duration, env: &Env) -> String {
    let mut cookie = format!(
        "{name}={value}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        max_age.as_secs()
    );
    if *env == Env::Production {
        cookie.push_str("; Secure");
    }
    cookie
}

pub fn session_cookie(value: &str, config: &AppConfig) -> String {
    build_cookie(SESSION_COOKIE, value, config.session_ttl, &config.env)
}

pub fn clear_session_cookie() -> String {
    format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

/// sign_in
///
/// Exchanges credentials for a session with the content API and returns the
/// session together with the `Set-Cookie` value persisting it.
///
/// 1. Reject blank input before calling the API.
/// 2. `POST /auth/login`.
/// 3. Sign the resulting token + profile into the session cookie.
pub async fn sign_in(
    api: &dyn ContentApi,
    config: &AppConfig,
    email: &str,
    password: &str,
) -> SiteResult<(Session, String)> {
    // 1. Input check
    if email.trim().is_empty() || password.is_empty() {
        return Err(SiteError::Validation(
            "Email and password are required".to_string(),
        ));
    }

    // 2. Credential exchange
    let response = api
        .login(&LoginRequest {
            email: email.trim().to_string(),
            password: password.to_string(),
        })
        .await?;

    let session = Session {
        token: response.token,
        profile: response.profile,
    };

    // 3. Persist
    let cookie = encode_session(&session, &config.session_secret, config.session_ttl)?;
    tracing::info!(profile_id = %session.profile.id, role = %session.profile.role, "signed in");
    Ok((session, session_cookie(&cookie, config)))
}

/// `Set-Cookie` value that ends the session.
pub fn sign_out() -> String {
    clear_session_cookie()
}

/// CurrentSession Extractor
///
/// Resolves the visitor's session from the signed cookie. Never rejects:
/// public pages use it to decide whether to show signed-in navigation, and
/// the route guard decides what a missing session means.
#[derive(Debug, Clone)]
pub struct CurrentSession(pub Option<Session>);

impl<S> FromRequestParts<S> for CurrentSession
where
    S: Send + Sync,
    AppConfig: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // A session already resolved by the guard middleware wins.
        if let Some(session) = parts.extensions.get::<Session>() {
            return Ok(CurrentSession(Some(session.clone())));
        }

        let config = AppConfig::from_ref(state);
        let session = read_cookie(&parts.headers, SESSION_COOKIE)
            .filter(|value| !value.is_empty())
            .and_then(|value| decode_session(&value, &config.session_secret));
        Ok(CurrentSession(session))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn researcher() -> Session {
        Session {
            token: "api-token".into(),
            profile: Profile {
                id: "r1".into(),
                email: "r@example.com".into(),
                full_name: Some("R".into()),
                role: Role::Researcher,
            },
        }
    }

    #[test]
    fn session_cookie_round_trips() {
        let cookie = encode_session(&researcher(), "secret", Duration::from_secs(60)).unwrap();
        assert_eq!(decode_session(&cookie, "secret"), Some(researcher()));
    }

    #[test]
    fn tampered_or_foreign_cookies_are_ignored() {
        let cookie = encode_session(&researcher(), "secret", Duration::from_secs(60)).unwrap();
        assert_eq!(decode_session(&cookie, "other-secret"), None);
        assert_eq!(decode_session("not-a-jwt", "secret"), None);
    }

    #[test]
    fn expired_sessions_are_rejected() {
        let now = Utc::now().timestamp() as usize;
        let claims = SessionClaims {
            sub: "r1".into(),
            exp: now - 3600,
            iat: now - 7200,
            token: "t".into(),
            profile: researcher().profile,
        };
        let cookie = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"secret"),
        )
        .unwrap();
        assert_eq!(decode_session(&cookie, "secret"), None);
    }

    #[test]
    fn cookies_are_read_from_any_header() {
        let mut headers = HeaderMap::new();
        headers.append(header::COOKIE, HeaderValue::from_static("lang=te; theme=dark"));
        headers.append(header::COOKIE, HeaderValue::from_static("pilabs_session=abc.def"));

        assert_eq!(read_cookie(&headers, "lang").as_deref(), Some("te"));
        assert_eq!(read_cookie(&headers, SESSION_COOKIE).as_deref(), Some("abc.def"));
        assert_eq!(read_cookie(&headers, "missing"), None);
    }

    #[test]
    fn role_predicates() {
        let mut session = researcher();
        assert!(session.is_researcher() && !session.is_admin());
        session.profile.role = Role::SuperAdmin;
        assert!(session.is_admin() && !session.is_researcher());
    }

    #[test]
    fn production_cookies_are_secure() {
        let cookie = build_cookie("x", "1", Duration::from_secs(5), &Env::Production);
        assert!(cookie.ends_with("; Secure"));
        assert!(clear_session_cookie().contains("Max-Age=0"));
    }
}
