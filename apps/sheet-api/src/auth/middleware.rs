//! Extractors for the user resolved by the authorization gate.

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::ApiError;
use crate::models::user::UserRecord;
use crate::AppState;

/// The signed-in user on a gate-protected route.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub UserRecord);

impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<UserRecord>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(|| ApiError::unauthorized("Not signed in"))
    }
}

/// The caller's user record if their credentials resolve to one.
///
/// Used on unprotected routes such as the realtime upgrade, where anonymous
/// callers are allowed but a known user should still be recognised. Reuses
/// the gate's result when the path was protected.
#[derive(Debug, Clone)]
pub struct OptionalUser(pub Option<UserRecord>);

impl FromRequestParts<AppState> for OptionalUser {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<UserRecord>() {
            return Ok(OptionalUser(Some(user.clone())));
        }

        let Some(email) = state
            .credentials
            .validate(parts)
            .await
            .and_then(|identity| identity.email)
        else {
            return Ok(OptionalUser(None));
        };

        match state.users.find_user_by_email(&email).await {
            Ok(user) => Ok(OptionalUser(user)),
            Err(err) => {
                tracing::warn!(message = %err.message, "user lookup failed; continuing anonymously");
                Ok(OptionalUser(None))
            }
        }
    }
}
