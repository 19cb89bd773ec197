//! The generic select-or-insert persistence primitive.
//!
//! Every entity type persists through the same pair of operations: a
//! `select` by natural key and a bare `insert`. [`ensure`] combines them
//! into the single idempotency primitive used by every caller: a value is
//! inserted only when its natural key is absent, and an existing row is
//! never updated.

use async_trait::async_trait;
use sqlx::{Sqlite, Transaction};

use crate::error::StoreResult;
use crate::models::{AiaRow, CertificateRow, MembershipRow, ReleaseRow, RevocationRow};

/// A value persisted under a natural key.
#[async_trait]
pub trait Entity: Send + Sync {
    /// Load the stored row for this value's natural key into `self`,
    /// returning false when no row exists. The natural-key fields must be
    /// populated before the call; the remaining fields are overwritten
    /// with the stored values on a hit.
    async fn select(&mut self, tx: &mut Transaction<'_, Sqlite>) -> StoreResult<bool>;

    /// Store the value. Not idempotent on its own: a duplicate natural
    /// key violates a UNIQUE constraint and surfaces as
    /// [`StoreError::Conflict`](crate::StoreError::Conflict).
    async fn insert(&self, tx: &mut Transaction<'_, Sqlite>) -> StoreResult<()>;
}

/// Ensure the value is present, inserting it when its natural key is
/// absent. Returns true when the value was inserted; on false the stored
/// row is left untouched and loaded into the value.
///
/// The select and insert run on the caller's transaction and form one
/// atomic unit within it. Concurrent callers on the same key are not
/// mutually excluded: both may observe absence, and the loser's insert
/// fails with a retryable `Conflict` rather than corrupting state.
pub async fn ensure<E: Entity + ?Sized>(
    entity: &mut E,
    tx: &mut Transaction<'_, Sqlite>,
) -> StoreResult<bool> {
    if entity.select(tx).await? {
        return Ok(false);
    }
    entity.insert(tx).await?;
    Ok(true)
}

#[async_trait]
impl Entity for CertificateRow {
    async fn select(&mut self, tx: &mut Transaction<'_, Sqlite>) -> StoreResult<bool> {
        let row: Option<(String, i64, i64, Vec<u8>)> = sqlx::query_as(
            "SELECT aki, not_before, not_after, raw FROM certificates WHERE ski = ? AND serial = ?",
        )
        .bind(&self.ski)
        .bind(&self.serial)
        .fetch_optional(&mut **tx)
        .await?;

        match row {
            Some((aki, not_before, not_after, raw)) => {
                self.aki = aki;
                self.not_before = not_before;
                self.not_after = not_after;
                self.raw = raw;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn insert(&self, tx: &mut Transaction<'_, Sqlite>) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO certificates (ski, aki, serial, not_before, not_after, raw) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&self.ski)
        .bind(&self.aki)
        .bind(&self.serial)
        .bind(self.not_before)
        .bind(self.not_after)
        .bind(&self.raw)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl Entity for AiaRow {
    async fn select(&mut self, tx: &mut Transaction<'_, Sqlite>) -> StoreResult<bool> {
        let row: Option<(String,)> = sqlx::query_as("SELECT url FROM aia WHERE ski = ?")
            .bind(&self.ski)
            .fetch_optional(&mut **tx)
            .await?;

        match row {
            Some((url,)) => {
                self.url = url;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn insert(&self, tx: &mut Transaction<'_, Sqlite>) -> StoreResult<()> {
        sqlx::query("INSERT INTO aia (ski, url) VALUES (?, ?)")
            .bind(&self.ski)
            .bind(&self.url)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl Entity for ReleaseRow {
    async fn select(&mut self, tx: &mut Transaction<'_, Sqlite>) -> StoreResult<bool> {
        let query = format!(
            "SELECT released_at FROM {} WHERE version = ?",
            self.bundle.releases_table()
        );
        let row: Option<(i64,)> = sqlx::query_as(&query)
            .bind(&self.version)
            .fetch_optional(&mut **tx)
            .await?;

        match row {
            Some((released_at,)) => {
                self.released_at = released_at;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn insert(&self, tx: &mut Transaction<'_, Sqlite>) -> StoreResult<()> {
        let query = format!(
            "INSERT INTO {} (version, released_at) VALUES (?, ?)",
            self.bundle.releases_table()
        );
        sqlx::query(&query)
            .bind(&self.version)
            .bind(self.released_at)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl Entity for MembershipRow {
    async fn select(&mut self, tx: &mut Transaction<'_, Sqlite>) -> StoreResult<bool> {
        let query = format!(
            "SELECT 1 FROM {} WHERE ski = ? AND serial = ? AND release = ?",
            self.bundle.membership_table()
        );
        let row: Option<(i64,)> = sqlx::query_as(&query)
            .bind(&self.ski)
            .bind(&self.serial)
            .bind(&self.release)
            .fetch_optional(&mut **tx)
            .await?;
        Ok(row.is_some())
    }

    async fn insert(&self, tx: &mut Transaction<'_, Sqlite>) -> StoreResult<()> {
        let query = format!(
            "INSERT INTO {} (ski, serial, release) VALUES (?, ?, ?)",
            self.bundle.membership_table()
        );
        sqlx::query(&query)
            .bind(&self.ski)
            .bind(&self.serial)
            .bind(&self.release)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl Entity for RevocationRow {
    async fn select(&mut self, tx: &mut Transaction<'_, Sqlite>) -> StoreResult<bool> {
        let row: Option<(i64, String, String)> = sqlx::query_as(
            "SELECT revoked_at, mechanism, reason FROM revocations WHERE ski = ?",
        )
        .bind(&self.ski)
        .fetch_optional(&mut **tx)
        .await?;

        match row {
            Some((revoked_at, mechanism, reason)) => {
                self.revoked_at = revoked_at;
                self.mechanism = mechanism;
                self.reason = reason;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn insert(&self, tx: &mut Transaction<'_, Sqlite>) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO revocations (ski, revoked_at, mechanism, reason) VALUES (?, ?, ?, ?)",
        )
        .bind(&self.ski)
        .bind(self.revoked_at)
        .bind(&self.mechanism)
        .bind(&self.reason)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }
}
