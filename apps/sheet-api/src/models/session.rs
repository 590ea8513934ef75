use chrono::Utc;
use diesel::prelude::*;
use diesel::result::OptionalExtension;

use crate::db::pool::DbPool;
use crate::db::schema::{sessions, users};
use crate::error::ApiError;

/// Resolve an unexpired session token to its owner's `(email, name)`.
pub async fn find_active_owner(
    pool: &DbPool,
    token: &str,
) -> Result<Option<(Option<String>, Option<String>)>, ApiError> {
    let mut conn = pool.get().await?;

    let owner = diesel_async::RunQueryDsl::get_result(
        sessions::table
            .inner_join(users::table)
            .filter(sessions::session_token.eq(token))
            .filter(sessions::expires.gt(Utc::now()))
            .select((users::email, users::name)),
        &mut conn,
    )
    .await
    .optional()?;

    Ok(owner)
}
