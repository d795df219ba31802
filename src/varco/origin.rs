//! Origin validation.
//!
//! Every request is gated by the origin its caller declares before any
//! business logic runs. The allow-list is fixed at startup and injected into
//! [`OriginPolicy`]; nothing here reads ambient configuration.
//!
//! Two pieces cooperate:
//!
//! - [`cors_layer`] answers browser preflights and stamps the response
//!   headers that communicate the decision.
//! - [`guard`] refuses denied non-preflight requests with a generic failure
//!   before they reach the login or directory handlers. The CORS layer alone
//!   only shapes headers; without the guard a denied browser request would
//!   still execute.

use anyhow::{Context, Result};
use axum::{
    extract::{Request, State},
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE, ORIGIN},
        HeaderValue, Method, StatusCode,
    },
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::warn;
use url::Url;

/// Outcome of checking a declared origin against the allow-list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

/// A single allow-list entry.
#[derive(Debug, Clone)]
enum Rule {
    /// Byte-exact origin, e.g. `https://app.example.com`.
    Exact(String),
    /// Any host equal to or under the domain suffix, any scheme or port.
    Suffix(String),
}

impl Rule {
    fn matches(&self, origin: &str) -> bool {
        match self {
            Self::Exact(expected) => origin == expected,
            Self::Suffix(suffix) => origin_host(origin).is_some_and(|host| {
                host == *suffix
                    || host
                        .strip_suffix(suffix.as_str())
                        .is_some_and(|rest| rest.ends_with('.'))
            }),
        }
    }
}

fn origin_host(origin: &str) -> Option<String> {
    Url::parse(origin)
        .ok()?
        .host_str()
        .map(str::to_ascii_lowercase)
}

/// Ordered set of origin rules, fixed at process start.
#[derive(Debug, Clone, Default)]
pub struct OriginPolicy {
    rules: Vec<Rule>,
}

impl OriginPolicy {
    /// Parse configured allow-list entries.
    ///
    /// `*.domain` entries become suffix rules; anything else must parse as a
    /// URL and is normalized to `scheme://host[:port]`.
    ///
    /// # Errors
    /// Returns an error on an entry that is neither, so a typo in the
    /// configuration surfaces at startup.
    pub fn from_rules(entries: &[String]) -> Result<Self> {
        let mut rules = Vec::with_capacity(entries.len());

        for entry in entries {
            let entry = entry.trim();
            if entry.is_empty() {
                continue;
            }

            if let Some(suffix) = entry.strip_prefix("*.") {
                if suffix.is_empty() || suffix.contains('/') {
                    anyhow::bail!("Invalid origin rule: {entry}");
                }
                rules.push(Rule::Suffix(suffix.to_ascii_lowercase()));
            } else {
                rules.push(Rule::Exact(exact_origin(entry)?));
            }
        }

        Ok(Self { rules })
    }

    /// Decide whether the declared origin may proceed.
    ///
    /// An absent origin is a non-browser caller (server-to-server, curl,
    /// mobile app); there is no same-origin policy to enforce for those, so
    /// the answer is always [`Decision::Allow`].
    #[must_use]
    pub fn decide(&self, origin: Option<&str>) -> Decision {
        let Some(origin) = origin else {
            return Decision::Allow;
        };

        if self.rules.iter().any(|rule| rule.matches(origin)) {
            Decision::Allow
        } else {
            Decision::Deny
        }
    }
}

/// Normalize one exact allow-list entry to `scheme://host[:port]`, the shape
/// browsers put in the `Origin` header.
fn exact_origin(entry: &str) -> Result<String> {
    let url = Url::parse(entry).with_context(|| format!("Invalid origin rule: {entry}"))?;

    let host = url
        .host_str()
        .with_context(|| format!("Origin rule has no host: {entry}"))?;

    Ok(match url.port() {
        Some(port) => format!("{}://{host}:{port}", url.scheme()),
        None => format!("{}://{host}", url.scheme()),
    })
}

/// CORS layer driven by the policy: answers preflights immediately and emits
/// allow-origin/methods/headers/credentials headers per decision.
#[must_use]
pub fn cors_layer(policy: &OriginPolicy) -> CorsLayer {
    let policy = policy.clone();

    CorsLayer::new()
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_methods([Method::GET, Method::POST])
        .allow_credentials(true)
        .allow_origin(AllowOrigin::predicate(
            move |origin: &HeaderValue, _parts| {
                policy.decide(origin.to_str().ok()) == Decision::Allow
            },
        ))
}

/// Middleware refusing denied origins before any handler runs.
///
/// The rejection is generic on purpose: no account information leaks through
/// this path. The offending origin is logged for operational diagnosis.
pub async fn guard(State(policy): State<OriginPolicy>, request: Request, next: Next) -> Response {
    let decision = match request.headers().get(ORIGIN) {
        None => Decision::Allow,
        Some(value) => match value.to_str() {
            Ok(origin) => policy.decide(Some(origin)),
            // A present but non-UTF-8 origin is nothing a browser sends
            Err(_) => Decision::Deny,
        },
    };

    match decision {
        Decision::Allow => next.run(request).await,
        Decision::Deny => {
            let origin = request
                .headers()
                .get(ORIGIN)
                .map_or("<none>", |value| value.to_str().unwrap_or("<non-utf8>"));

            warn!(origin, "Blocked by origin allow-list");

            (
                StatusCode::FORBIDDEN,
                Json(json!({"success": false, "message": "Not allowed by CORS"})),
            )
                .into_response()
        }
    }
}
