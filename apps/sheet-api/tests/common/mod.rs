#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::request::Parts;
use axum::Router;

use sheet_api::auth::session::{session_token, CredentialValidator, Identity};
use sheet_api::config::Config;
use sheet_api::error::ApiError;
use sheet_api::models::user::{UserDirectory, UserRecord};
use sheet_api::realtime::{ConnectionRegistry, EventPublisher};
use sheet_api::AppState;

/// Database URL for tests. The pool connects lazily, so tests that never
/// reach a handler touching the database run without PostgreSQL.
pub const TEST_DATABASE_URL: &str = "postgres://localhost/sheetsync_test";

/// Session cookie for the seeded user "alice".
pub const ALICE_COOKIE: &str = "authjs.session-token=tok-alice";
/// A valid session whose user record no longer exists.
pub const ORPHAN_COOKIE: &str = "authjs.session-token=tok-orphan";

/// Credentials double: maps session tokens to identities without a database.
pub struct StaticCredentials {
    cookie_names: Vec<String>,
    sessions: HashMap<String, Identity>,
}

#[async_trait]
impl CredentialValidator for StaticCredentials {
    async fn validate(&self, parts: &Parts) -> Option<Identity> {
        let token = session_token(parts, &self.cookie_names)?;
        self.sessions.get(token).cloned()
    }
}

/// In-memory user directory that counts lookups.
pub struct MemoryUserDirectory {
    users: Vec<UserRecord>,
    lookups: Arc<AtomicUsize>,
}

#[async_trait]
impl UserDirectory for MemoryUserDirectory {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, ApiError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .users
            .iter()
            .find(|u| u.email.as_deref() == Some(email))
            .cloned())
    }
}

pub fn alice() -> UserRecord {
    UserRecord {
        id: "usr_alice".to_string(),
        name: Some("Alice".to_string()),
        email: Some("alice@example.com".to_string()),
        email_verified: None,
        image: None,
    }
}

/// Everything a test needs to drive the app and observe its side effects.
pub struct TestContext {
    pub state: AppState,
    pub registry: Arc<ConnectionRegistry>,
    pub lookups: Arc<AtomicUsize>,
}

impl TestContext {
    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

/// Build app state around test doubles and a fresh connection registry.
///
/// Each test gets its own registry rather than the process-wide one so
/// parallel tests never see each other's connections.
pub async fn test_state() -> TestContext {
    let config = Config::new(TEST_DATABASE_URL);
    let db = sheet_api::db::pool::connect(&config.database_url).await;

    let mut sessions = HashMap::new();
    sessions.insert(
        "tok-alice".to_string(),
        Identity {
            email: Some("alice@example.com".to_string()),
            name: Some("Alice".to_string()),
        },
    );
    sessions.insert(
        "tok-orphan".to_string(),
        Identity {
            email: Some("gone@example.com".to_string()),
            name: None,
        },
    );

    let lookups = Arc::new(AtomicUsize::new(0));
    let registry = Arc::new(ConnectionRegistry::new());

    let state = AppState {
        db,
        credentials: Arc::new(StaticCredentials {
            cookie_names: config.session_cookies.clone(),
            sessions,
        }),
        users: Arc::new(MemoryUserDirectory {
            users: vec![alice()],
            lookups: lookups.clone(),
        }),
        publisher: EventPublisher::new(registry.clone()),
        config: Arc::new(config),
    };

    TestContext {
        state,
        registry,
        lookups,
    }
}

/// Full application router over test state.
pub async fn test_app() -> (Router, TestContext) {
    let ctx = test_state().await;
    let app = sheet_api::routes::app(ctx.state.clone());
    (app, ctx)
}
