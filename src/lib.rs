//! # Varco (Origin-Gated Credential Gateway)
//!
//! `varco` is a small login gateway. It accepts an email/secret pair over
//! HTTP, validates the calling origin against a fixed allow-list before any
//! business logic runs, authenticates the pair against an account registry
//! (auto-provisioning unknown emails on first login), and exposes a redacted
//! listing of known accounts.
//!
//! ## Storage & concurrency
//!
//! Accounts live in `PostgreSQL` (see `sql/schema.sql`). The "one account per
//! email" invariant is enforced by the UNIQUE constraint on `email`, not by
//! an in-process lock: provisioning is an atomic `INSERT .. ON CONFLICT DO
//! NOTHING`, and a caller that loses the race falls back to comparing against
//! the secret that actually won. Multiple gateway instances can therefore
//! share one database safely.
//!
//! Secrets are stored and compared as opaque bytes, exactly as supplied.
//! Swap in a salted one-way hash with constant-time comparison before any
//! real deployment.

pub mod cli;
pub mod varco;
