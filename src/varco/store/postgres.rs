//! Postgres-backed credential store.
//!
//! Email uniqueness is enforced by the UNIQUE constraint in
//! `sql/schema.sql`, so the insert-if-absent below stays atomic across
//! multiple gateway instances sharing one database.

use anyhow::{Context, Result};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use sqlx::{postgres::PgRow, PgPool, Row};
use tracing::Instrument;

use super::{Account, Credential, CredentialStore, InsertOutcome};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialStore for PgStore {
    async fn insert_if_absent(
        &self,
        email: &str,
        secret: &SecretString,
    ) -> Result<InsertOutcome> {
        // ON CONFLICT DO NOTHING returns no row when another caller won the
        // race, which maps to InsertOutcome::Conflict. The existing record is
        // left untouched either way.
        let query = r"
            INSERT INTO accounts (email, secret)
            VALUES ($1, $2)
            ON CONFLICT (email) DO NOTHING
            RETURNING id, email, created_at, updated_at
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(email)
            .bind(secret.expose_secret())
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to insert account")?;

        Ok(row.map_or(InsertOutcome::Conflict, |row| {
            InsertOutcome::Created(account_from_row(&row))
        }))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Credential>> {
        let query = r"
            SELECT id, email, secret, created_at, updated_at
            FROM accounts
            WHERE email = $1
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(email)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to lookup account")?;

        Ok(row.map(|row| Credential {
            account: account_from_row(&row),
            secret: row.get::<String, _>("secret").into(),
        }))
    }

    async fn list(&self) -> Result<Vec<Account>> {
        // id as secondary key keeps the order deterministic when two accounts
        // share a creation timestamp.
        let query = r"
            SELECT id, email, created_at, updated_at
            FROM accounts
            ORDER BY created_at DESC, id DESC
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let rows = sqlx::query(query)
            .fetch_all(&self.pool)
            .instrument(span)
            .await
            .context("failed to list accounts")?;

        Ok(rows.iter().map(account_from_row).collect())
    }
}

fn account_from_row(row: &PgRow) -> Account {
    Account {
        id: row.get("id"),
        email: row.get("email"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}
