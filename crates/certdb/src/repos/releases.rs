//! Release repository trait and transaction-scoped queries.

use async_trait::async_trait;
use sqlx::{Sqlite, Transaction};

use anchorage_core::Bundle;

use crate::error::{StoreError, StoreResult};
use crate::models::{CertificateRow, MembershipRow, ReleaseRow};

/// Repository for release records and their certificate membership.
#[async_trait]
pub trait ReleaseRepo: Send + Sync {
    /// Insert the release unless its `(bundle, version)` key is already
    /// present. Returns true when a row was inserted; on false the
    /// existing `released_at` is left untouched.
    async fn ensure_release(&self, release: &ReleaseRow) -> StoreResult<bool>;

    /// Fetch a release by exact version.
    async fn get_release(&self, bundle: Bundle, version: &str)
    -> StoreResult<Option<ReleaseRow>>;

    /// The most recent release for a bundle, by release time.
    async fn latest_release(&self, bundle: Bundle) -> StoreResult<Option<ReleaseRow>>;

    /// The release immediately preceding the given one, by release time.
    async fn previous_release(&self, release: &ReleaseRow) -> StoreResult<Option<ReleaseRow>>;

    /// All releases for a bundle, newest first.
    async fn list_releases(&self, bundle: Bundle) -> StoreResult<Vec<ReleaseRow>>;

    /// All certificates in a release, ordered by validity start (oldest
    /// first). Fails with [`StoreError::UnknownRelease`] when the release
    /// does not exist.
    async fn collect_release(
        &self,
        bundle: Bundle,
        version: &str,
    ) -> StoreResult<Vec<CertificateRow>>;

    /// Number of certificates in a release.
    async fn release_count(&self, bundle: Bundle, version: &str) -> StoreResult<u64>;

    /// Add a certificate to a release unless it is already a member.
    /// Returns true when the membership row was inserted.
    async fn ensure_membership(&self, membership: &MembershipRow) -> StoreResult<bool>;
}

pub(crate) async fn get_release_tx(
    tx: &mut Transaction<'_, Sqlite>,
    bundle: Bundle,
    version: &str,
) -> StoreResult<Option<ReleaseRow>> {
    let query = format!(
        "SELECT released_at FROM {} WHERE version = ?",
        bundle.releases_table()
    );
    let row: Option<(i64,)> = sqlx::query_as(&query)
        .bind(version)
        .fetch_optional(&mut **tx)
        .await?;

    Ok(row.map(|(released_at,)| ReleaseRow {
        bundle,
        version: version.to_string(),
        released_at,
    }))
}

pub(crate) async fn latest_release_tx(
    tx: &mut Transaction<'_, Sqlite>,
    bundle: Bundle,
) -> StoreResult<Option<ReleaseRow>> {
    let query = format!(
        "SELECT version, released_at FROM {} ORDER BY released_at DESC, version DESC LIMIT 1",
        bundle.releases_table()
    );
    let row: Option<(String, i64)> = sqlx::query_as(&query).fetch_optional(&mut **tx).await?;

    Ok(row.map(|(version, released_at)| ReleaseRow {
        bundle,
        version,
        released_at,
    }))
}

pub(crate) async fn previous_release_tx(
    tx: &mut Transaction<'_, Sqlite>,
    release: &ReleaseRow,
) -> StoreResult<Option<ReleaseRow>> {
    // A tie on released_at is broken by version so the predecessor is
    // deterministic when two releases land in the same second.
    let query = format!(
        "SELECT version, released_at FROM {} \
         WHERE released_at <= ? AND version != ? \
         ORDER BY released_at DESC, version DESC LIMIT 1",
        release.bundle.releases_table()
    );
    let row: Option<(String, i64)> = sqlx::query_as(&query)
        .bind(release.released_at)
        .bind(&release.version)
        .fetch_optional(&mut **tx)
        .await?;

    Ok(row.map(|(version, released_at)| ReleaseRow {
        bundle: release.bundle,
        version,
        released_at,
    }))
}

pub(crate) async fn collect_release_tx(
    tx: &mut Transaction<'_, Sqlite>,
    bundle: Bundle,
    version: &str,
) -> StoreResult<Vec<CertificateRow>> {
    if get_release_tx(tx, bundle, version).await?.is_none() {
        return Err(StoreError::UnknownRelease(format!(
            "{bundle}-{version}"
        )));
    }

    let table = bundle.membership_table();
    let query = format!(
        "SELECT certificates.ski, certificates.aki, certificates.serial, \
                certificates.not_before, certificates.not_after, certificates.raw \
           FROM certificates \
          INNER JOIN {table} ON certificates.ski = {table}.ski \
                            AND certificates.serial = {table}.serial \
                            AND {table}.release = ? \
          ORDER BY certificates.not_before"
    );

    let rows = sqlx::query_as::<_, CertificateRow>(&query)
        .bind(version)
        .fetch_all(&mut **tx)
        .await?;
    Ok(rows)
}
