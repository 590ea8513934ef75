//! Session-cookie credential validation.

use async_trait::async_trait;
use axum::http::header::COOKIE;
use axum::http::request::Parts;

use crate::db::pool::DbPool;
use crate::models::session;

/// What a valid credential proves about the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub email: Option<String>,
    pub name: Option<String>,
}

/// Turns request credentials into an identity, or nothing.
///
/// Implementations swallow their own failures: a credential that cannot be
/// checked is treated as absent.
#[async_trait]
pub trait CredentialValidator: Send + Sync {
    async fn validate(&self, parts: &Parts) -> Option<Identity>;
}

/// Return the first session token found among `cookie_names`, searched in
/// order.
pub fn session_token<'a>(parts: &'a Parts, cookie_names: &[String]) -> Option<&'a str> {
    let pairs: Vec<(&str, &str)> = parts
        .headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|header| header.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .collect();

    cookie_names.iter().find_map(|name| {
        pairs
            .iter()
            .find(|(k, v)| *k == name.as_str() && !v.is_empty())
            .map(|(_, v)| *v)
    })
}

/// Validates database sessions issued by the sign-in flow.
pub struct SessionCookieValidator {
    db: DbPool,
    cookie_names: Vec<String>,
}

impl SessionCookieValidator {
    pub fn new(db: DbPool, cookie_names: Vec<String>) -> Self {
        Self { db, cookie_names }
    }
}

#[async_trait]
impl CredentialValidator for SessionCookieValidator {
    async fn validate(&self, parts: &Parts) -> Option<Identity> {
        let token = session_token(parts, &self.cookie_names)?;

        match session::find_active_owner(&self.db, token).await {
            Ok(Some((email, name))) => Some(Identity { email, name }),
            Ok(None) => None,
            Err(err) => {
                tracing::warn!(message = %err.message, "session lookup failed");
                None
            }
        }
    }
}
