//! Login resolution.
//!
//! One entry point, [`login`], composed from two named operations:
//! `authenticate` compares a supplied secret against an existing account,
//! `provision` creates the account on a first-time email. The original use
//! case conflates signup and login ("self-provisioning"), so keeping the two
//! steps named makes the merged behavior testable and easy to split later.

use secrecy::{ExposeSecret, SecretString};
use tracing::info;

use super::store::{Account, Credential, CredentialStore, InsertOutcome};

/// Terminal non-success outcomes of a login attempt.
#[derive(Debug)]
pub enum LoginError {
    /// Client input malformed; the message names the missing field (400).
    Validation(&'static str),
    /// Secret mismatch for an existing account (401). The message is generic
    /// so this path reveals nothing about whether the email exists.
    BadCredentials,
    /// Underlying storage failed (500). Detail is logged at the HTTP
    /// boundary, never returned to the caller.
    Store(anyhow::Error),
}

/// Resolve one login attempt.
///
/// Unknown emails are provisioned with the supplied secret; known emails must
/// present the stored one. Validation happens before the store is touched.
///
/// # Errors
/// See [`LoginError`].
pub async fn login(
    store: &dyn CredentialStore,
    email: &str,
    secret: &SecretString,
) -> Result<Account, LoginError> {
    if email.is_empty() {
        return Err(LoginError::Validation("Email is required"));
    }
    if secret.expose_secret().is_empty() {
        return Err(LoginError::Validation("Secret is required"));
    }

    match store.find_by_email(email).await.map_err(LoginError::Store)? {
        Some(credential) => authenticate(&credential, secret),
        None => provision(store, email, secret).await,
    }
}

/// Byte-compare the supplied secret against the stored one. On mismatch the
/// stored account is left untouched and the supplied secret is discarded.
fn authenticate(credential: &Credential, supplied: &SecretString) -> Result<Account, LoginError> {
    if credential.secret.expose_secret() == supplied.expose_secret() {
        Ok(credential.account.clone())
    } else {
        Err(LoginError::BadCredentials)
    }
}

/// Create the account for a first-time email.
///
/// The insert is atomic on the unique email key. Losing the race to a
/// concurrent first login is not an error: the winner's secret is
/// authoritative, so the loser falls back to comparing against it. Neither
/// caller can overwrite the other's secret, and both observe the same single
/// account afterwards.
async fn provision(
    store: &dyn CredentialStore,
    email: &str,
    secret: &SecretString,
) -> Result<Account, LoginError> {
    match store
        .insert_if_absent(email, secret)
        .await
        .map_err(LoginError::Store)?
    {
        InsertOutcome::Created(account) => {
            info!(email = %account.email, "Provisioned new account");

            Ok(account)
        }
        InsertOutcome::Conflict => {
            match store.find_by_email(email).await.map_err(LoginError::Store)? {
                Some(credential) => authenticate(&credential, secret),
                // Accounts are never deleted, so a conflict with no readable
                // record means the store itself is inconsistent.
                None => Err(LoginError::Store(anyhow::anyhow!(
                    "account vanished after insert conflict"
                ))),
            }
        }
    }
}
