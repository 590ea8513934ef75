//! Sheet listing, creation and the full-sheet loader.

use std::collections::HashMap;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::db::schema::{field_values, fields, rows, sheets};
use crate::error::{ApiError, ApiErrorBody, FieldError};
use crate::models::field::Field;
use crate::models::field_value::FieldValue;
use crate::models::row::Row;
use crate::models::sheet::{NewSheet, Sheet};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/sheets", get(list_sheets).post(create_sheet))
        .route("/sheet/{sheet_id}", get(load_sheet))
}

// ---------------------------------------------------------------------------
// GET /api/sheets
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/api/sheets",
    tag = "Sheets",
    responses(
        (status = 200, description = "All sheets, oldest first", body = Vec<Sheet>),
        (status = 302, description = "Not signed in; redirected to sign-in"),
    ),
)]
pub async fn list_sheets(State(state): State<AppState>) -> Result<Json<Vec<Sheet>>, ApiError> {
    let mut conn = state.db.get().await?;

    let list: Vec<Sheet> = diesel_async::RunQueryDsl::load(
        sheets::table
            .order(sheets::created_at.asc())
            .select(Sheet::as_select()),
        &mut conn,
    )
    .await?;

    Ok(Json(list))
}

// ---------------------------------------------------------------------------
// POST /api/sheets
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateSheetRequest {
    #[serde(default)]
    pub name: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/sheets",
    tag = "Sheets",
    request_body = CreateSheetRequest,
    responses(
        (status = 201, description = "Sheet created", body = Sheet),
        (status = 400, description = "Validation error", body = ApiErrorBody),
        (status = 302, description = "Not signed in; redirected to sign-in"),
    ),
)]
pub async fn create_sheet(
    State(state): State<AppState>,
    Json(body): Json<CreateSheetRequest>,
) -> Result<(StatusCode, Json<Sheet>), ApiError> {
    let name = body.name.as_deref().unwrap_or("").trim().to_string();
    if name.is_empty() {
        return Err(ApiError::validation(vec![FieldError::new(
            "name",
            "Sheet name is required and must be a non-empty string",
        )]));
    }

    let now = Utc::now();
    let sheet_id = sheet_common::id::prefixed_ulid(sheet_common::id::prefix::SHEET);

    let mut conn = state.db.get().await?;
    let sheet: Sheet = diesel_async::RunQueryDsl::get_result(
        diesel::insert_into(sheets::table)
            .values(NewSheet {
                id: &sheet_id,
                name: &name,
                created_at: now,
                updated_at: now,
            })
            .returning(Sheet::as_returning()),
        &mut conn,
    )
    .await?;

    tracing::info!(sheet_id = %sheet.id, "sheet created");

    Ok((StatusCode::CREATED, Json(sheet)))
}

// ---------------------------------------------------------------------------
// GET /api/sheet/:sheet_id
// ---------------------------------------------------------------------------

/// A field value together with the field it belongs to.
#[derive(Debug, Serialize, ToSchema)]
pub struct FieldValueWithField {
    #[serde(flatten)]
    pub value: FieldValue,
    pub field: Option<Field>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RowWithValues {
    #[serde(flatten)]
    pub row: Row,
    pub field_values: Vec<FieldValueWithField>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SheetDetail {
    #[serde(flatten)]
    pub sheet: Sheet,
    pub fields: Vec<Field>,
    pub rows: Vec<RowWithValues>,
}

/// Everything a client needs to render a sheet, including the state it
/// refetches after (re)connecting to the realtime stream.
#[derive(Debug, Serialize, ToSchema)]
pub struct LoadSheetResponse {
    pub sheet: SheetDetail,
    pub fields: Vec<Field>,
}

#[utoipa::path(
    get,
    path = "/api/sheet/{sheet_id}",
    tag = "Sheets",
    params(("sheet_id" = String, Path, description = "Sheet ID")),
    responses(
        (status = 200, description = "Sheet with fields, rows and values", body = LoadSheetResponse),
        (status = 404, description = "Sheet not found", body = ApiErrorBody),
        (status = 302, description = "Not signed in; redirected to sign-in"),
    ),
)]
pub async fn load_sheet(
    State(state): State<AppState>,
    Path(sheet_id): Path<String>,
) -> Result<Json<LoadSheetResponse>, ApiError> {
    let mut conn = state.db.get().await?;

    let sheet: Sheet = diesel_async::RunQueryDsl::get_result(
        sheets::table.find(&sheet_id).select(Sheet::as_select()),
        &mut conn,
    )
    .await
    .optional()?
    .ok_or_else(|| ApiError::not_found("Sheet not found"))?;

    let sheet_fields: Vec<Field> = diesel_async::RunQueryDsl::load(
        fields::table
            .filter(fields::sheet_id.eq(&sheet_id))
            .order(fields::created_at.asc())
            .select(Field::as_select()),
        &mut conn,
    )
    .await?;

    let sheet_rows: Vec<Row> = diesel_async::RunQueryDsl::load(
        rows::table
            .filter(rows::sheet_id.eq(&sheet_id))
            .order(rows::created_at.asc())
            .select(Row::as_select()),
        &mut conn,
    )
    .await?;

    let row_ids: Vec<String> = sheet_rows.iter().map(|r| r.id.clone()).collect();
    let values: Vec<FieldValue> = if row_ids.is_empty() {
        Vec::new()
    } else {
        diesel_async::RunQueryDsl::load(
            field_values::table
                .filter(field_values::row_id.eq_any(&row_ids))
                .select(FieldValue::as_select()),
            &mut conn,
        )
        .await?
    };

    let fields_by_id: HashMap<&str, &Field> =
        sheet_fields.iter().map(|f| (f.id.as_str(), f)).collect();

    let mut values_by_row: HashMap<String, Vec<FieldValueWithField>> = HashMap::new();
    for value in values {
        let field = fields_by_id.get(value.field_id.as_str()).map(|f| (*f).clone());
        values_by_row
            .entry(value.row_id.clone())
            .or_default()
            .push(FieldValueWithField { value, field });
    }

    let detail_rows = sheet_rows
        .into_iter()
        .map(|row| RowWithValues {
            field_values: values_by_row.remove(&row.id).unwrap_or_default(),
            row,
        })
        .collect();

    Ok(Json(LoadSheetResponse {
        sheet: SheetDetail {
            sheet,
            fields: sheet_fields.clone(),
            rows: detail_rows,
        },
        fields: sheet_fields,
    }))
}
