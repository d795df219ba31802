//! In-memory credential store.
//!
//! Backs the test suite without a database; the server path always runs on
//! [`PgStore`](super::PgStore). The whole map sits behind one mutex, so
//! insert-if-absent is naturally atomic; the semantics mirror the Postgres
//! store, including deterministic newest-first ordering via an insertion
//! sequence number. Panicking on a poisoned mutex is fine here, the type
//! never carries production state.

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use secrecy::SecretString;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use super::{Account, Credential, CredentialStore, InsertOutcome};

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    accounts: HashMap<String, StoredAccount>,
    sequence: u64,
}

struct StoredAccount {
    account: Account,
    secret: SecretString,
    sequence: u64,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn insert_if_absent(
        &self,
        email: &str,
        secret: &SecretString,
    ) -> Result<InsertOutcome> {
        let mut inner = self.inner.lock().expect("memory store poisoned");

        if inner.accounts.contains_key(email) {
            return Ok(InsertOutcome::Conflict);
        }

        let now = Utc::now();
        let account = Account {
            id: Uuid::new_v4(),
            email: email.to_string(),
            created_at: now,
            updated_at: now,
        };

        inner.sequence += 1;
        let sequence = inner.sequence;
        inner.accounts.insert(
            email.to_string(),
            StoredAccount {
                account: account.clone(),
                secret: secret.clone(),
                sequence,
            },
        );

        Ok(InsertOutcome::Created(account))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Credential>> {
        let inner = self.inner.lock().expect("memory store poisoned");

        Ok(inner.accounts.get(email).map(|stored| Credential {
            account: stored.account.clone(),
            secret: stored.secret.clone(),
        }))
    }

    async fn list(&self) -> Result<Vec<Account>> {
        let inner = self.inner.lock().expect("memory store poisoned");

        let mut stored: Vec<_> = inner.accounts.values().collect();
        stored.sort_by(|a, b| {
            b.account
                .created_at
                .cmp(&a.account.created_at)
                .then(b.sequence.cmp(&a.sequence))
        });

        Ok(stored.iter().map(|s| s.account.clone()).collect())
    }
}
