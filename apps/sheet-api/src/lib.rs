pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod realtime;
pub mod routes;

use std::sync::Arc;

use auth::session::CredentialValidator;
use config::Config;
use db::pool::DbPool;
use models::user::UserDirectory;
use realtime::EventPublisher;

/// Shared application state available to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub config: Arc<Config>,
    pub credentials: Arc<dyn CredentialValidator>,
    pub users: Arc<dyn UserDirectory>,
    pub publisher: EventPublisher,
}
