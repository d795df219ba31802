//! Account registry.
//!
//! The store owns every `Account` record and the invariant that at most one
//! account exists per email, even under concurrent creation attempts. The
//! gateway and the directory listing only go through the operations below
//! and never mutate records directly.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Redacted view of one account. This is the only shape that ever leaves the
/// store on a read path, so a secret cannot end up in a response by accident.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: Uuid,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An account plus the secret it was provisioned with, for comparison only.
/// Not serializable.
pub struct Credential {
    pub account: Account,
    pub secret: SecretString,
}

/// Result of an atomic insert-if-absent.
#[derive(Debug)]
pub enum InsertOutcome {
    /// No account existed for the email; this caller created it.
    Created(Account),
    /// Another caller already holds the email; nothing was written.
    Conflict,
}

/// Shared store handle injected into the HTTP handlers.
pub type SharedStore = Arc<dyn CredentialStore>;

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Create an account unless the email is already taken.
    ///
    /// The check and the insert are one atomic operation against the unique
    /// email key; two racing callers can never both get `Created`.
    async fn insert_if_absent(
        &self,
        email: &str,
        secret: &SecretString,
    ) -> anyhow::Result<InsertOutcome>;

    /// Look up the credential for an email.
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<Credential>>;

    /// All accounts, most recently created first, secrets stripped.
    async fn list(&self) -> anyhow::Result<Vec<Account>>;
}
