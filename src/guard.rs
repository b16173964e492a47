use axum::{
    extract::{FromRequestParts, Request},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use crate::session::{CurrentSession, Session};

/// What a router tier demands of the visitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    Authenticated,
    Admin,
}

/// authorize
///
/// The route guard. Pure and synchronous: a session must exist, and for
/// `Requirement::Admin` its profile must carry the `super_admin` role.
/// Returns the session that satisfied the requirement.
pub fn authorize(session: Option<Session>, requirement: Requirement) -> Option<Session> {
    let session = session?;
    match requirement {
        Requirement::Authenticated => Some(session),
        Requirement::Admin if session.is_admin() => Some(session),
        Requirement::Admin => None,
    }
}

/// Shared body of the tier middlewares.
///
/// 1. Resolve the session (already decoded by the `CurrentSession` extractor).
/// 2. Apply the guard; on failure send the visitor to `/login`.
/// 3. Stash the authorized session in the request extensions for `SignedIn`.
async fn guard(
    session: Option<Session>,
    requirement: Requirement,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    match authorize(session, requirement) {
        Some(session) => {
            request.extensions_mut().insert(session);
            next.run(request).await
        }
        None => {
            tracing::debug!(path, ?requirement, "guard redirecting to login");
            Redirect::to("/login").into_response()
        }
    }
}

/// require_session
///
/// Middleware for the researcher tier (`/dashboard/**`). Mounted with
/// `from_fn_with_state` so `CurrentSession` can reach the session secret.
pub async fn require_session(
    CurrentSession(session): CurrentSession,
    request: Request,
    next: Next,
) -> Response {
    guard(session, Requirement::Authenticated, request, next).await
}

/// require_admin
///
/// Middleware for the admin tier (`/admin/**`).
pub async fn require_admin(
    CurrentSession(session): CurrentSession,
    request: Request,
    next: Next,
) -> Response {
    guard(session, Requirement::Admin, request, next).await
}

/// SignedIn Extractor
///
/// The session authorized by the guard middleware. Only usable in handlers
/// mounted behind `require_session` or `require_admin`; anywhere else the
/// visitor is sent to `/login`.
#[derive(Debug, Clone)]
pub struct SignedIn(pub Session);

impl<S> FromRequestParts<S> for SignedIn
where
    S: Send + Sync,
{
    type Rejection = Redirect;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Session>()
            .cloned()
            .map(SignedIn)
            .ok_or_else(|| Redirect::to("/login"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Profile, Role};

    fn session(role: Role) -> Session {
        Session {
            token: "t".into(),
            profile: Profile {
                id: "p".into(),
                role,
                ..Profile::default()
            },
        }
    }

    #[test]
    fn anonymous_visitors_are_never_authorized() {
        assert_eq!(authorize(None, Requirement::Authenticated), None);
        assert_eq!(authorize(None, Requirement::Admin), None);
    }

    #[test]
    fn researchers_pass_only_the_authenticated_tier() {
        let researcher = session(Role::Researcher);
        assert!(authorize(Some(researcher.clone()), Requirement::Authenticated).is_some());
        assert_eq!(authorize(Some(researcher), Requirement::Admin), None);
    }

    #[test]
    fn admins_pass_both_tiers() {
        let admin = session(Role::SuperAdmin);
        assert!(authorize(Some(admin.clone()), Requirement::Authenticated).is_some());
        assert_eq!(authorize(Some(admin.clone()), Requirement::Admin), Some(admin));
    }

    #[test]
    fn unknown_roles_are_not_admins() {
        assert_eq!(authorize(Some(session(Role::Unknown)), Requirement::Admin), None);
    }
}
