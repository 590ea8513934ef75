use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::result::OptionalExtension;
use serde::Serialize;
use utoipa::ToSchema;

use crate::db::pool::DbPool;
use crate::db::schema::users;
use crate::error::ApiError;

/// A durable user record, owned by the sign-in flow.
#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Serialize, ToSchema)]
#[diesel(table_name = users)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub email_verified: Option<DateTime<Utc>>,
    pub image: Option<String>,
}

/// Lookup of durable user records by the email a session resolves to.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, ApiError>;
}

/// PostgreSQL-backed [`UserDirectory`].
pub struct PgUserDirectory {
    db: DbPool,
}

impl PgUserDirectory {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, ApiError> {
        let mut conn = self.db.get().await?;

        let user = diesel_async::RunQueryDsl::get_result(
            users::table
                .filter(users::email.eq(email))
                .select(UserRecord::as_select()),
            &mut conn,
        )
        .await
        .optional()?;

        Ok(user)
    }
}
