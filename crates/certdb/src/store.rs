//! Trust store trait and SQLite implementation.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};

use crate::error::StoreResult;
use crate::repos::{CertificateRepo, ReleaseRepo, RevocationRepo};
use crate::roll::RollRepo;

/// Combined trust store trait.
#[async_trait]
pub trait CertStore:
    CertificateRepo + ReleaseRepo + RevocationRepo + RollRepo + Send + Sync
{
    /// Create or update the database schema.
    async fn migrate(&self) -> StoreResult<()>;

    /// Check database connectivity and health.
    async fn health_check(&self) -> StoreResult<()>;
}

/// SQLite-backed trust store.
///
/// Every public operation runs inside a single transaction against the
/// pool; the transaction is the unit of atomicity and isolation. The
/// store performs no write coordination of its own: deployments run one
/// writer at a time (one CLI invocation), and a lost select-or-insert
/// race against a second writer surfaces as a retryable
/// [`StoreError::Conflict`](crate::StoreError::Conflict).
pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    /// Open a trust database at the given path, creating it and its
    /// schema when missing.
    pub async fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}?mode=rwc", path.display()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .foreign_keys(true)
            // Prevent transient "database is locked" errors when a reader
            // overlaps a writer.
            .busy_timeout(Duration::from_secs(5));

        // A single connection serializes this process's writes, which is
        // all the coordination the single-writer model asks of the store.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(opts)
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }
}

#[async_trait]
impl CertStore for SqliteStore {
    async fn migrate(&self) -> StoreResult<()> {
        sqlx::query(SCHEMA_SQL).execute(&self.pool).await?;
        Ok(())
    }

    async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

// Repository implementations for SqliteStore.
mod sqlite_impl {
    use super::*;
    use crate::entity::ensure;
    use crate::models::*;
    use crate::repos::releases::{
        collect_release_tx, get_release_tx, latest_release_tx, previous_release_tx,
    };
    use crate::repos::revocations::is_revoked_tx;
    use anchorage_core::Bundle;

    #[async_trait]
    impl CertificateRepo for SqliteStore {
        async fn ensure_certificate(&self, cert: &CertificateRow) -> StoreResult<bool> {
            let mut tx = self.pool.begin().await?;
            let mut row = cert.clone();
            let inserted = ensure(&mut row, &mut tx).await?;
            tx.commit().await?;
            Ok(inserted)
        }

        async fn get_certificate(
            &self,
            ski: &str,
            serial: &[u8],
        ) -> StoreResult<Option<CertificateRow>> {
            let row = sqlx::query_as::<_, CertificateRow>(
                "SELECT ski, aki, serial, not_before, not_after, raw \
                   FROM certificates WHERE ski = ? AND serial = ?",
            )
            .bind(ski)
            .bind(serial)
            .fetch_optional(&self.pool)
            .await?;
            Ok(row)
        }

        async fn find_certificates_by_ski(&self, ski: &str) -> StoreResult<Vec<CertificateRow>> {
            let rows = sqlx::query_as::<_, CertificateRow>(
                "SELECT ski, aki, serial, not_before, not_after, raw \
                   FROM certificates WHERE ski = ? ORDER BY serial",
            )
            .bind(ski)
            .fetch_all(&self.pool)
            .await?;
            Ok(rows)
        }

        async fn all_certificates(&self) -> StoreResult<Vec<CertificateRow>> {
            let rows = sqlx::query_as::<_, CertificateRow>(
                "SELECT ski, aki, serial, not_before, not_after, raw \
                   FROM certificates ORDER BY not_before",
            )
            .fetch_all(&self.pool)
            .await?;
            Ok(rows)
        }

        async fn ensure_aia(&self, aia: &AiaRow) -> StoreResult<bool> {
            let mut tx = self.pool.begin().await?;
            let mut row = aia.clone();
            let inserted = ensure(&mut row, &mut tx).await?;
            tx.commit().await?;
            Ok(inserted)
        }

        async fn get_aia(&self, ski: &str) -> StoreResult<Option<AiaRow>> {
            let row = sqlx::query_as::<_, AiaRow>("SELECT ski, url FROM aia WHERE ski = ?")
                .bind(ski)
                .fetch_optional(&self.pool)
                .await?;
            Ok(row)
        }

        async fn certificate_releases(
            &self,
            ski: &str,
            serial: &[u8],
        ) -> StoreResult<Vec<ReleaseRow>> {
            let mut tx = self.pool.begin().await?;
            let mut releases = Vec::new();

            for bundle in [Bundle::Ca, Bundle::Int] {
                let query = format!(
                    "SELECT {releases}.version, {releases}.released_at \
                       FROM {releases} \
                      INNER JOIN {members} ON {members}.release = {releases}.version \
                      WHERE {members}.ski = ? AND {members}.serial = ? \
                      ORDER BY {releases}.released_at DESC",
                    releases = bundle.releases_table(),
                    members = bundle.membership_table(),
                );
                let rows: Vec<(String, i64)> = sqlx::query_as(&query)
                    .bind(ski)
                    .bind(serial)
                    .fetch_all(&mut *tx)
                    .await?;

                releases.extend(rows.into_iter().map(|(version, released_at)| ReleaseRow {
                    bundle,
                    version,
                    released_at,
                }));
            }

            tx.commit().await?;
            Ok(releases)
        }
    }

    #[async_trait]
    impl ReleaseRepo for SqliteStore {
        async fn ensure_release(&self, release: &ReleaseRow) -> StoreResult<bool> {
            let mut tx = self.pool.begin().await?;
            let mut row = release.clone();
            let inserted = ensure(&mut row, &mut tx).await?;
            tx.commit().await?;
            Ok(inserted)
        }

        async fn get_release(
            &self,
            bundle: Bundle,
            version: &str,
        ) -> StoreResult<Option<ReleaseRow>> {
            let mut tx = self.pool.begin().await?;
            let release = get_release_tx(&mut tx, bundle, version).await?;
            tx.commit().await?;
            Ok(release)
        }

        async fn latest_release(&self, bundle: Bundle) -> StoreResult<Option<ReleaseRow>> {
            let mut tx = self.pool.begin().await?;
            let release = latest_release_tx(&mut tx, bundle).await?;
            tx.commit().await?;
            Ok(release)
        }

        async fn previous_release(&self, release: &ReleaseRow) -> StoreResult<Option<ReleaseRow>> {
            let mut tx = self.pool.begin().await?;
            let previous = previous_release_tx(&mut tx, release).await?;
            tx.commit().await?;
            Ok(previous)
        }

        async fn list_releases(&self, bundle: Bundle) -> StoreResult<Vec<ReleaseRow>> {
            let query = format!(
                "SELECT version, released_at FROM {} ORDER BY released_at DESC, version DESC",
                bundle.releases_table()
            );
            let rows: Vec<(String, i64)> = sqlx::query_as(&query).fetch_all(&self.pool).await?;
            Ok(rows
                .into_iter()
                .map(|(version, released_at)| ReleaseRow {
                    bundle,
                    version,
                    released_at,
                })
                .collect())
        }

        async fn collect_release(
            &self,
            bundle: Bundle,
            version: &str,
        ) -> StoreResult<Vec<CertificateRow>> {
            let mut tx = self.pool.begin().await?;
            let certs = collect_release_tx(&mut tx, bundle, version).await?;
            tx.commit().await?;
            Ok(certs)
        }

        async fn release_count(&self, bundle: Bundle, version: &str) -> StoreResult<u64> {
            let mut tx = self.pool.begin().await?;
            if get_release_tx(&mut tx, bundle, version).await?.is_none() {
                return Err(crate::StoreError::UnknownRelease(format!(
                    "{bundle}-{version}"
                )));
            }

            let query = format!(
                "SELECT count(*) FROM {} WHERE release = ?",
                bundle.membership_table()
            );
            let (count,): (i64,) = sqlx::query_as(&query)
                .bind(version)
                .fetch_one(&mut *tx)
                .await?;
            tx.commit().await?;
            Ok(count as u64)
        }

        async fn ensure_membership(&self, membership: &MembershipRow) -> StoreResult<bool> {
            let mut tx = self.pool.begin().await?;
            let mut row = membership.clone();
            let inserted = ensure(&mut row, &mut tx).await?;
            tx.commit().await?;
            Ok(inserted)
        }
    }

    #[async_trait]
    impl RevocationRepo for SqliteStore {
        async fn revoke(&self, revocation: &RevocationRow) -> StoreResult<bool> {
            let mut tx = self.pool.begin().await?;
            let mut row = revocation.clone();
            let applied = ensure(&mut row, &mut tx).await?;
            tx.commit().await?;

            if !applied {
                tracing::debug!(
                    ski = %revocation.ski,
                    revoked_at = row.revoked_at,
                    "revocation already recorded, keeping the first"
                );
            }
            Ok(applied)
        }

        async fn is_revoked(&self, ski: &str, as_of: i64) -> StoreResult<bool> {
            let mut tx = self.pool.begin().await?;
            let revoked = is_revoked_tx(&mut tx, ski, as_of).await?;
            tx.commit().await?;
            Ok(revoked)
        }

        async fn get_revocation(&self, ski: &str) -> StoreResult<Option<RevocationRow>> {
            let row = sqlx::query_as::<_, RevocationRow>(
                "SELECT ski, revoked_at, mechanism, reason FROM revocations WHERE ski = ?",
            )
            .bind(ski)
            .fetch_optional(&self.pool)
            .await?;
            Ok(row)
        }
    }
}

const SCHEMA_SQL: &str = r#"
-- Certificates, keyed by subject key identifier and serial number.
CREATE TABLE IF NOT EXISTS certificates (
    ski TEXT NOT NULL,
    aki TEXT NOT NULL,
    serial BLOB NOT NULL,
    not_before INTEGER NOT NULL,
    not_after INTEGER NOT NULL,
    raw BLOB NOT NULL,
    PRIMARY KEY (ski, serial)
);
CREATE INDEX IF NOT EXISTS idx_certificates_aki ON certificates(aki);
CREATE INDEX IF NOT EXISTS idx_certificates_not_before ON certificates(not_before);

-- Issuer certificate URLs, keyed by the issuer's key identifier.
CREATE TABLE IF NOT EXISTS aia (
    ski TEXT PRIMARY KEY,
    url TEXT NOT NULL
);

-- Revocations: at most one per key identifier.
CREATE TABLE IF NOT EXISTS revocations (
    ski TEXT PRIMARY KEY,
    revoked_at INTEGER NOT NULL,
    mechanism TEXT NOT NULL,
    reason TEXT NOT NULL
);

-- Releases, one table per bundle.
CREATE TABLE IF NOT EXISTS root_releases (
    version TEXT PRIMARY KEY,
    released_at INTEGER NOT NULL
);
CREATE TABLE IF NOT EXISTS intermediate_releases (
    version TEXT PRIMARY KEY,
    released_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_root_releases_time ON root_releases(released_at);
CREATE INDEX IF NOT EXISTS idx_intermediate_releases_time ON intermediate_releases(released_at);

-- Certificate-to-release membership, one table per bundle.
CREATE TABLE IF NOT EXISTS roots (
    ski TEXT NOT NULL,
    serial BLOB NOT NULL,
    release TEXT NOT NULL,
    PRIMARY KEY (ski, serial, release),
    FOREIGN KEY (ski, serial) REFERENCES certificates(ski, serial),
    FOREIGN KEY (release) REFERENCES root_releases(version)
);
CREATE TABLE IF NOT EXISTS intermediates (
    ski TEXT NOT NULL,
    serial BLOB NOT NULL,
    release TEXT NOT NULL,
    PRIMARY KEY (ski, serial, release),
    FOREIGN KEY (ski, serial) REFERENCES certificates(ski, serial),
    FOREIGN KEY (release) REFERENCES intermediate_releases(version)
);
CREATE INDEX IF NOT EXISTS idx_roots_release ON roots(release);
CREATE INDEX IF NOT EXISTS idx_intermediates_release ON intermediates(release);
"#;
