pub mod dashboard;
pub mod fields;
pub mod health;
pub mod sheets;

use axum::{middleware, Router};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::auth::gate::authorization_gate;
use crate::error::ApiError;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(dashboard::router())
        .merge(crate::realtime::server::router())
        .nest("/api", sheets::router().merge(fields::router()))
}

/// The full application: routes and API docs, all behind the authorization
/// gate. The gate wraps the fallback too, so an unknown protected path
/// redirects like a known one.
pub fn app(state: AppState) -> Router {
    router()
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            authorization_gate,
        ))
        .with_state(state)
}

async fn not_found() -> ApiError {
    ApiError::not_found("No such route")
}

#[derive(OpenApi)]
#[openapi(
    paths(
        // Health
        health::health,
        // Dashboard
        dashboard::dashboard,
        // Sheets
        sheets::list_sheets,
        sheets::create_sheet,
        sheets::load_sheet,
        // Fields
        fields::create_field,
        fields::delete_field,
    ),
    components(
        schemas(
            // Error types
            crate::error::ApiErrorBody,
            crate::error::ApiErrorDetail,
            crate::error::FieldError,
            // Models
            crate::models::user::UserRecord,
            crate::models::sheet::Sheet,
            crate::models::field::Field,
            crate::models::field::FieldType,
            crate::models::row::Row,
            crate::models::field_value::FieldValue,
            // Route request/response types
            health::HealthResponse,
            dashboard::DashboardResponse,
            sheets::CreateSheetRequest,
            sheets::LoadSheetResponse,
            sheets::SheetDetail,
            sheets::RowWithValues,
            sheets::FieldValueWithField,
            fields::CreateFieldRequest,
            fields::DeleteFieldResponse,
        )
    ),
    tags(
        (name = "Health", description = "Health check"),
        (name = "Dashboard", description = "Signed-in landing data"),
        (name = "Sheets", description = "Sheet management"),
        (name = "Fields", description = "Field (column) management"),
    )
)]
pub struct ApiDoc;
