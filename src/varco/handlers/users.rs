//! `GET /users` — redacted account directory.

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use tracing::error;

use crate::varco::store::{Account, SharedStore};

#[utoipa::path(
    get,
    path = "/users",
    responses(
        (status = 200, description = "All accounts, newest first, secrets stripped", body = [Account]),
        (status = 500, description = "Storage failure"),
    ),
    tag = "varco"
)]
pub async fn users(store: Extension<SharedStore>) -> impl IntoResponse {
    match store.0.list().await {
        Ok(accounts) => (StatusCode::OK, Json(accounts)).into_response(),
        Err(err) => {
            error!("Failed to list accounts: {err}");

            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"message": "Error fetching accounts"})),
            )
                .into_response()
        }
    }
}
