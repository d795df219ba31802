//! `POST /login` — authenticate or self-provision one email/secret pair.

use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use secrecy::SecretString;
use serde::Deserialize;
use serde_json::json;
use tracing::error;
use utoipa::ToSchema;

use crate::varco::gateway::{self, LoginError};
use crate::varco::store::SharedStore;

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub secret: String,
}

impl IntoResponse for LoginError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Validation(message) => (StatusCode::BAD_REQUEST, message.to_string()),
            Self::BadCredentials => (
                StatusCode::UNAUTHORIZED,
                "Invalid credentials".to_string(),
            ),
            Self::Store(err) => {
                error!("Login failed: {err}");

                (StatusCode::INTERNAL_SERVER_ERROR, "Server error".to_string())
            }
        };

        (
            status,
            Json(json!({"success": false, "message": message})),
        )
            .into_response()
    }
}

#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful, account provisioned on first use"),
        (status = 400, description = "Missing email or secret"),
        (status = 401, description = "Secret mismatch"),
        (status = 500, description = "Storage failure"),
    ),
    tag = "varco"
)]
pub async fn login(
    store: Extension<SharedStore>,
    payload: Option<Json<LoginRequest>>,
) -> impl IntoResponse {
    let request: LoginRequest = match payload {
        Some(Json(payload)) => payload,
        None => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"success": false, "message": "Missing payload"})),
            )
                .into_response()
        }
    };

    // Wrapped immediately so the secret never shows up in debug output
    let secret = SecretString::from(request.secret);

    match gateway::login(store.0.as_ref(), &request.email, &secret).await {
        Ok(account) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "message": "Login successful",
                "user": { "id": account.id, "email": account.email },
            })),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}
