use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::Serialize;
use utoipa::ToSchema;

use crate::db::schema::field_values;

/// The value of one field in one row, with the reasoning that produced it.
#[derive(Debug, Clone, Queryable, Selectable, Serialize, ToSchema)]
#[diesel(table_name = field_values)]
#[serde(rename_all = "camelCase")]
pub struct FieldValue {
    pub id: String,
    pub row_id: String,
    pub field_id: String,
    pub value: Option<String>,
    pub reasoning: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
