//! End-to-end router tests.
//!
//! These exercise the axum router against the in-memory store: origin
//! gating (preflight answers, denied requests refused before the handlers),
//! login/provisioning and the redacted directory listing.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{
        header::{CONTENT_TYPE, ORIGIN},
        Method, Request, StatusCode,
    },
    Router,
};
use secrecy::SecretString;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use varco::varco::{
    app,
    origin::OriginPolicy,
    store::{Account, Credential, CredentialStore, InsertOutcome, MemoryStore},
};

/// Store double whose every operation fails, for the storage-failure path.
struct FailingStore;

#[async_trait]
impl CredentialStore for FailingStore {
    async fn insert_if_absent(
        &self,
        _email: &str,
        _secret: &SecretString,
    ) -> Result<InsertOutcome> {
        bail!("database down")
    }

    async fn find_by_email(&self, _email: &str) -> Result<Option<Credential>> {
        bail!("database down")
    }

    async fn list(&self) -> Result<Vec<Account>> {
        bail!("database down")
    }
}

fn gateway() -> Result<Router> {
    let policy = OriginPolicy::from_rules(&[
        "http://localhost:3000".to_string(),
        "*.example.com".to_string(),
    ])?;

    Ok(app(Arc::new(MemoryStore::new()), &policy, None))
}

fn login_request(email: &str, secret: &str, origin: Option<&str>) -> Result<Request<Body>> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri("/login")
        .header(CONTENT_TYPE, "application/json");

    if let Some(origin) = origin {
        builder = builder.header(ORIGIN, origin);
    }

    builder
        .body(Body::from(
            json!({"email": email, "secret": secret}).to_string(),
        ))
        .context("failed to build request")
}

async fn body_json(response: axum::response::Response) -> Result<Value> {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .context("failed to read body")?;
    serde_json::from_slice(&bytes).context("body is not JSON")
}

#[tokio::test]
async fn login_provisions_and_authenticates() -> Result<()> {
    let app = gateway()?;

    // First login provisions the account
    let response = app
        .clone()
        .oneshot(login_request("new@example.com", "s1", None)?)
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await?;
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["user"]["email"], json!("new@example.com"));
    assert!(body["user"]["id"].is_string());

    // Same pair logs in again
    let response = app
        .clone()
        .oneshot(login_request("new@example.com", "s1", None)?)
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    // Wrong secret is rejected with a generic message
    let response = app
        .clone()
        .oneshot(login_request("new@example.com", "wrong", None)?)
        .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body = body_json(response).await?;
    assert_eq!(body["success"], json!(false));

    // And only one account exists
    let response = app
        .oneshot(Request::builder().uri("/users").body(Body::empty())?)
        .await?;
    let body = body_json(response).await?;
    assert_eq!(body.as_array().map(Vec::len), Some(1));

    Ok(())
}

#[tokio::test]
async fn missing_fields_are_rejected_with_400() -> Result<()> {
    let app = gateway()?;

    let response = app
        .clone()
        .oneshot(login_request("", "x", None)?)
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await?;
    assert_eq!(body["message"], json!("Email is required"));

    let response = app.oneshot(login_request("a@b.com", "", None)?).await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await?;
    assert_eq!(body["message"], json!("Secret is required"));

    Ok(())
}

#[tokio::test]
async fn users_listing_is_redacted_and_newest_first() -> Result<()> {
    let app = gateway()?;

    for email in ["a@example.com", "b@example.com", "c@example.com"] {
        let response = app
            .clone()
            .oneshot(login_request(email, "secret", None)?)
            .await?;
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .oneshot(Request::builder().uri("/users").body(Body::empty())?)
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await?;
    let accounts = body.as_array().context("expected an array")?;

    let emails: Vec<_> = accounts
        .iter()
        .map(|account| account["email"].as_str().unwrap_or_default())
        .collect();
    assert_eq!(emails, vec!["c@example.com", "b@example.com", "a@example.com"]);

    for account in accounts {
        let object = account.as_object().context("expected an object")?;
        assert!(object.contains_key("id"));
        assert!(object.contains_key("createdAt"));
        assert!(object.contains_key("updatedAt"));
        assert!(!object.contains_key("secret"));
    }

    Ok(())
}

#[tokio::test]
async fn allowed_origin_passes_the_guard() -> Result<()> {
    let app = gateway()?;

    let response = app
        .clone()
        .oneshot(login_request(
            "new@example.com",
            "s1",
            Some("http://localhost:3000"),
        )?)
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .and_then(|value| value.to_str().ok()),
        Some("http://localhost:3000")
    );

    // Suffix rule
    let response = app
        .oneshot(login_request(
            "new@example.com",
            "s1",
            Some("https://app.example.com"),
        )?)
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    Ok(())
}

#[tokio::test]
async fn denied_origin_is_refused_before_the_store() -> Result<()> {
    let app = gateway()?;

    let response = app
        .clone()
        .oneshot(login_request(
            "new@example.com",
            "s1",
            Some("https://evil.tld"),
        )?)
        .await?;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let body = body_json(response).await?;
    assert_eq!(body["success"], json!(false));

    // The refused request must not have provisioned anything
    let response = app
        .oneshot(Request::builder().uri("/users").body(Body::empty())?)
        .await?;
    let body = body_json(response).await?;
    assert_eq!(body.as_array().map(Vec::len), Some(0));

    Ok(())
}

#[tokio::test]
async fn preflight_reflects_the_decision() -> Result<()> {
    let app = gateway()?;

    let preflight = |origin: &str| -> Result<Request<Body>> {
        Request::builder()
            .method(Method::OPTIONS)
            .uri("/login")
            .header(ORIGIN, origin)
            .header("access-control-request-method", "POST")
            .body(Body::empty())
            .context("failed to build preflight")
    };

    let response = app.clone().oneshot(preflight("http://localhost:3000")?).await?;
    assert!(response.status().is_success());
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .and_then(|value| value.to_str().ok()),
        Some("http://localhost:3000")
    );

    let response = app.oneshot(preflight("https://evil.tld")?).await?;
    assert!(response.status().is_success());
    assert!(response
        .headers()
        .get("access-control-allow-origin")
        .is_none());

    Ok(())
}

#[tokio::test]
async fn store_failure_surfaces_as_generic_500() -> Result<()> {
    let policy = OriginPolicy::from_rules(&[])?;
    let app = app(Arc::new(FailingStore), &policy, None);

    // Login: internal detail stays server-side, the caller gets the envelope
    let response = app
        .clone()
        .oneshot(login_request("new@example.com", "s1", None)?)
        .await?;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = body_json(response).await?;
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["message"], json!("Server error"));

    // Directory listing
    let response = app
        .oneshot(Request::builder().uri("/users").body(Body::empty())?)
        .await?;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = body_json(response).await?;
    assert_eq!(body["message"], json!("Error fetching accounts"));

    Ok(())
}

#[tokio::test]
async fn every_route_sits_behind_the_origin_guard() -> Result<()> {
    let app = gateway()?;

    // /health is gated like everything else
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/health")
                .header(ORIGIN, "https://evil.tld")
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // So is the fallback
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/nowhere")
                .header(ORIGIN, "https://evil.tld")
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Without a declared origin the probe still answers
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty())?)
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    Ok(())
}

#[tokio::test]
async fn health_answers_with_build_info() -> Result<()> {
    let app = gateway()?;

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty())?)
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-app"));

    let body = body_json(response).await?;
    assert_eq!(body["name"], json!("varco"));

    Ok(())
}
