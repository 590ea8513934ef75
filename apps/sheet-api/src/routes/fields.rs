//! Field (column) creation and deletion. Both publish a realtime event once
//! the change is committed.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, post};
use axum::{Json, Router};
use chrono::Utc;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::db::schema::{fields, sheets};
use crate::error::{ApiError, ApiErrorBody, FieldError};
use crate::models::field::{Field, FieldType, NewField};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/sheet/{sheet_id}/field", post(create_field))
        .route("/sheet/{sheet_id}/field/{field_id}", delete(delete_field))
}

// ---------------------------------------------------------------------------
// POST /api/sheet/:sheet_id/field
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateFieldRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, rename = "type")]
    pub field_type: Option<String>,
}

/// Validated contents of a [`CreateFieldRequest`].
#[derive(Debug, PartialEq)]
struct FieldInput {
    name: String,
    description: String,
    field_type: FieldType,
}

fn validate_field(body: &CreateFieldRequest) -> Result<FieldInput, ApiError> {
    let mut errors = Vec::new();

    let name = body.name.as_deref().unwrap_or("").trim();
    if name.is_empty() {
        errors.push(FieldError::new("name", "Field name is required"));
    }

    let description = body.description.as_deref().unwrap_or("").trim();
    if description.is_empty() {
        errors.push(FieldError::new("description", "Field description is required"));
    }

    let field_type = body.field_type.as_deref().and_then(|t| t.parse::<FieldType>().ok());
    if field_type.is_none() {
        let allowed: Vec<&str> = FieldType::ALL.iter().map(|t| t.as_str()).collect();
        errors.push(FieldError::new(
            "type",
            format!("Field type must be one of: {}", allowed.join(", ")),
        ));
    }

    match field_type {
        Some(field_type) if errors.is_empty() => Ok(FieldInput {
            name: name.to_string(),
            description: description.to_string(),
            field_type,
        }),
        _ => Err(ApiError::validation(errors)),
    }
}

#[utoipa::path(
    post,
    path = "/api/sheet/{sheet_id}/field",
    tag = "Fields",
    params(("sheet_id" = String, Path, description = "Sheet ID")),
    request_body = CreateFieldRequest,
    responses(
        (status = 201, description = "Field created", body = Field),
        (status = 400, description = "Validation error", body = ApiErrorBody),
        (status = 404, description = "Sheet not found", body = ApiErrorBody),
        (status = 302, description = "Not signed in; redirected to sign-in"),
    ),
)]
pub async fn create_field(
    State(state): State<AppState>,
    Path(sheet_id): Path<String>,
    Json(body): Json<CreateFieldRequest>,
) -> Result<(StatusCode, Json<Field>), ApiError> {
    let mut conn = state.db.get().await?;

    // A missing sheet is reported before anything about the body.
    let exists: Option<String> = diesel_async::RunQueryDsl::get_result(
        sheets::table.find(&sheet_id).select(sheets::id),
        &mut conn,
    )
    .await
    .optional()?;
    if exists.is_none() {
        return Err(ApiError::not_found("Sheet not found"));
    }

    let input = validate_field(&body)?;

    let now = Utc::now();
    let field_id = sheet_common::id::prefixed_ulid(sheet_common::id::prefix::FIELD);

    let field: Field = diesel_async::RunQueryDsl::get_result(
        diesel::insert_into(fields::table)
            .values(NewField {
                id: &field_id,
                sheet_id: &sheet_id,
                name: &input.name,
                description: Some(&input.description),
                type_: input.field_type.as_str(),
                created_at: now,
                updated_at: now,
            })
            .returning(Field::as_returning()),
        &mut conn,
    )
    .await?;

    tracing::info!(sheet_id = %sheet_id, field_id = %field.id, "field created");

    state.publisher.field_created(&sheet_id, &field);

    Ok((StatusCode::CREATED, Json(field)))
}

// ---------------------------------------------------------------------------
// DELETE /api/sheet/:sheet_id/field/:field_id
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeleteFieldResponse {
    pub success: bool,
    pub field_id: String,
}

#[utoipa::path(
    delete,
    path = "/api/sheet/{sheet_id}/field/{field_id}",
    tag = "Fields",
    params(
        ("sheet_id" = String, Path, description = "Sheet ID"),
        ("field_id" = String, Path, description = "Field ID"),
    ),
    responses(
        (status = 200, description = "Field deleted", body = DeleteFieldResponse),
        (status = 404, description = "Field not found on this sheet", body = ApiErrorBody),
        (status = 302, description = "Not signed in; redirected to sign-in"),
    ),
)]
pub async fn delete_field(
    State(state): State<AppState>,
    Path((sheet_id, field_id)): Path<(String, String)>,
) -> Result<Json<DeleteFieldResponse>, ApiError> {
    let mut conn = state.db.get().await?;

    // Field values go with it via ON DELETE CASCADE.
    let deleted = diesel_async::RunQueryDsl::execute(
        diesel::delete(
            fields::table
                .filter(fields::id.eq(&field_id))
                .filter(fields::sheet_id.eq(&sheet_id)),
        ),
        &mut conn,
    )
    .await?;

    if deleted == 0 {
        return Err(ApiError::not_found("Field not found"));
    }

    tracing::info!(sheet_id = %sheet_id, field_id = %field_id, "field deleted");

    state.publisher.field_deleted(&sheet_id, &field_id);

    Ok(Json(DeleteFieldResponse {
        success: true,
        field_id,
    }))
}
