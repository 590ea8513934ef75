//! Signed-in landing data.

use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use utoipa::ToSchema;

use crate::auth::middleware::CurrentUser;
use crate::models::user::UserRecord;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/dashboard", get(dashboard))
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DashboardResponse {
    pub user: UserRecord,
}

#[utoipa::path(
    get,
    path = "/dashboard",
    tag = "Dashboard",
    responses(
        (status = 200, description = "Signed-in user", body = DashboardResponse),
        (status = 302, description = "Not signed in; redirected to sign-in"),
    ),
)]
pub async fn dashboard(CurrentUser(user): CurrentUser) -> Json<DashboardResponse> {
    Json(DashboardResponse { user })
}
