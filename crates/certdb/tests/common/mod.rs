//! Common test utilities for the trust store.

use anchorage_core::Bundle;
use anchorage_certdb::models::{CertificateRow, ReleaseRow, RevocationRow};
use anchorage_certdb::store::SqliteStore;
use tempfile::TempDir;

/// A trust store backed by a temporary database, cleaned up on drop.
pub struct TestStore {
    store: SqliteStore,
    _temp_dir: TempDir,
}

impl TestStore {
    pub async fn new() -> Self {
        let temp_dir = tempfile::tempdir().expect("failed to create temp directory");
        let store = SqliteStore::open(temp_dir.path().join("trust.db"))
            .await
            .expect("failed to open trust store");
        Self {
            store,
            _temp_dir: temp_dir,
        }
    }

    pub fn store(&self) -> &SqliteStore {
        &self.store
    }
}

/// A synthetic certificate row. The store never parses `raw`, so a
/// placeholder body is enough for membership and filter tests.
#[allow(dead_code)]
pub fn cert(ski: &str, serial: &[u8], not_before: i64, not_after: i64) -> CertificateRow {
    CertificateRow {
        ski: ski.to_string(),
        aki: "issuer-key".to_string(),
        serial: serial.to_vec(),
        not_before,
        not_after,
        raw: vec![0x30, 0x03, 0x02, 0x01, 0x00],
    }
}

#[allow(dead_code)]
pub fn release(bundle: Bundle, version: &str, released_at: i64) -> ReleaseRow {
    ReleaseRow {
        bundle,
        version: version.to_string(),
        released_at,
    }
}

#[allow(dead_code)]
pub fn revocation(ski: &str, revoked_at: i64) -> RevocationRow {
    RevocationRow {
        ski: ski.to_string(),
        revoked_at,
        mechanism: "crl".to_string(),
        reason: "keyCompromise".to_string(),
    }
}
