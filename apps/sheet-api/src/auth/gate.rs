//! Path-based authorization gate.
//!
//! Runs in front of every route. Protected paths need a credential that
//! resolves to a durable user record; everyone else is redirected to sign in.

use axum::extract::{Request, State};
use axum::http::header::LOCATION;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::error::ApiError;
use crate::models::user::{UserDirectory, UserRecord};
use crate::AppState;

use super::session::Identity;

/// Which paths the gate guards and where rejected requests go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatePolicy {
    pub protected_prefixes: Vec<String>,
    pub signin_path: String,
}

impl Default for GatePolicy {
    fn default() -> Self {
        Self {
            protected_prefixes: vec!["/api".to_string(), "/dashboard".to_string()],
            signin_path: "/signin".to_string(),
        }
    }
}

impl GatePolicy {
    /// Prefix match on whole path segments: `/api` covers `/api` and
    /// `/api/sheets` but not `/apiary`.
    pub fn is_protected(&self, path: &str) -> bool {
        self.protected_prefixes.iter().any(|prefix| {
            let prefix = prefix.trim_end_matches('/');
            match path.strip_prefix(prefix) {
                Some(rest) => rest.is_empty() || rest.starts_with('/'),
                None => false,
            }
        })
    }
}

/// Result of a request that made it through the gate.
#[derive(Debug, Clone, PartialEq)]
pub enum GateOutcome {
    /// Path is not protected; nothing was checked.
    PassThrough,
    Authorized { identity: Identity, user: UserRecord },
}

/// Why the gate stopped a request.
#[derive(Debug)]
pub enum GateRejection {
    /// No session, or a session whose user record is gone. Both look the same
    /// to the caller.
    Unauthenticated { signin_path: String },
    /// The user lookup itself failed.
    Lookup(ApiError),
}

impl IntoResponse for GateRejection {
    fn into_response(self) -> Response {
        match self {
            GateRejection::Unauthenticated { signin_path } => {
                (StatusCode::FOUND, [(LOCATION, signin_path)]).into_response()
            }
            GateRejection::Lookup(err) => err.into_response(),
        }
    }
}

/// Decide whether a request for `path`, carrying `identity`, may proceed.
///
/// Performs at most one user lookup, and none at all for unprotected paths or
/// when there is no identity.
pub async fn authorize(
    policy: &GatePolicy,
    path: &str,
    identity: Option<Identity>,
    users: &dyn UserDirectory,
) -> Result<GateOutcome, GateRejection> {
    if !policy.is_protected(path) {
        return Ok(GateOutcome::PassThrough);
    }

    let unauthenticated = || GateRejection::Unauthenticated {
        signin_path: policy.signin_path.clone(),
    };

    let identity = identity.ok_or_else(unauthenticated)?;
    let email = identity.email.as_deref().ok_or_else(unauthenticated)?;

    let user = users
        .find_user_by_email(email)
        .await
        .map_err(GateRejection::Lookup)?
        .ok_or_else(unauthenticated)?;

    Ok(GateOutcome::Authorized { identity, user })
}

/// Middleware form of [`authorize`]. On success the resolved [`UserRecord`]
/// and [`Identity`] are stored in the request extensions.
pub async fn authorization_gate(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let policy = &state.config.gate;
    if !policy.is_protected(req.uri().path()) {
        return next.run(req).await;
    }

    let (mut parts, body) = req.into_parts();
    let identity = state.credentials.validate(&parts).await;

    match authorize(policy, parts.uri.path(), identity, state.users.as_ref()).await {
        Ok(GateOutcome::Authorized { identity, user }) => {
            tracing::debug!(user_id = %user.id, path = %parts.uri.path(), "request authorized");
            parts.extensions.insert(user);
            parts.extensions.insert(identity);
            next.run(Request::from_parts(parts, body)).await
        }
        Ok(GateOutcome::PassThrough) => next.run(Request::from_parts(parts, body)).await,
        Err(rejection) => {
            if let GateRejection::Unauthenticated { .. } = rejection {
                tracing::debug!(path = %parts.uri.path(), "unauthenticated request redirected");
            }
            rejection.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;

    struct Directory {
        users: Vec<UserRecord>,
        lookups: AtomicUsize,
        fail: bool,
    }

    impl Directory {
        fn with(users: Vec<UserRecord>) -> Self {
            Self {
                users,
                lookups: AtomicUsize::new(0),
                fail: false,
            }
        }
    }

    #[async_trait]
    impl UserDirectory for Directory {
        async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, ApiError> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(ApiError::internal("directory down"));
            }
            Ok(self
                .users
                .iter()
                .find(|u| u.email.as_deref() == Some(email))
                .cloned())
        }
    }

    fn alice() -> UserRecord {
        UserRecord {
            id: "usr_alice".to_string(),
            name: Some("Alice".to_string()),
            email: Some("alice@example.com".to_string()),
            email_verified: None,
            image: None,
        }
    }

    fn identity(email: &str) -> Identity {
        Identity {
            email: Some(email.to_string()),
            name: None,
        }
    }

    #[test]
    fn protection_matches_whole_segments() {
        let policy = GatePolicy::default();
        assert!(policy.is_protected("/api"));
        assert!(policy.is_protected("/api/sheets"));
        assert!(policy.is_protected("/dashboard/settings"));
        assert!(!policy.is_protected("/apiary"));
        assert!(!policy.is_protected("/signin"));
        assert!(!policy.is_protected("/ws"));
        assert!(!policy.is_protected("/"));
    }

    #[tokio::test]
    async fn unprotected_paths_pass_regardless_of_identity() {
        let policy = GatePolicy::default();
        let directory = Directory::with(vec![]);

        for id in [None, Some(identity("nobody@example.com"))] {
            let outcome = authorize(&policy, "/health", id, &directory).await.unwrap();
            assert_eq!(outcome, GateOutcome::PassThrough);
        }
        assert_eq!(directory.lookups.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_identity_redirects_without_lookup() {
        let policy = GatePolicy::default();
        let directory = Directory::with(vec![alice()]);

        let err = authorize(&policy, "/dashboard", None, &directory).await.unwrap_err();
        match err {
            GateRejection::Unauthenticated { signin_path } => assert_eq!(signin_path, "/signin"),
            other => panic!("expected redirect, got {other:?}"),
        }
        assert_eq!(directory.lookups.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn identity_without_email_redirects() {
        let policy = GatePolicy::default();
        let directory = Directory::with(vec![alice()]);
        let anonymous = Identity {
            email: None,
            name: Some("ghost".to_string()),
        };

        let err = authorize(&policy, "/api/sheets", Some(anonymous), &directory)
            .await
            .unwrap_err();
        assert!(matches!(err, GateRejection::Unauthenticated { .. }));
    }

    #[tokio::test]
    async fn unknown_user_redirects_like_missing_session() {
        let policy = GatePolicy::default();
        let directory = Directory::with(vec![alice()]);

        let err = authorize(&policy, "/api/sheets", Some(identity("mallory@example.com")), &directory)
            .await
            .unwrap_err();
        assert!(matches!(err, GateRejection::Unauthenticated { .. }));
        assert_eq!(directory.lookups.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn known_user_is_authorized() {
        let policy = GatePolicy::default();
        let directory = Directory::with(vec![alice()]);

        let outcome = authorize(&policy, "/api/sheets", Some(identity("alice@example.com")), &directory)
            .await
            .unwrap();
        match outcome {
            GateOutcome::Authorized { user, .. } => assert_eq!(user.id, "usr_alice"),
            other => panic!("expected authorized, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn lookup_failure_is_a_server_error() {
        let policy = GatePolicy::default();
        let mut directory = Directory::with(vec![alice()]);
        directory.fail = true;

        let err = authorize(&policy, "/api/sheets", Some(identity("alice@example.com")), &directory)
            .await
            .unwrap_err();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn redirect_response_is_302_to_signin() {
        let response = GateRejection::Unauthenticated {
            signin_path: "/signin".to_string(),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()[LOCATION], "/signin");
    }
}
