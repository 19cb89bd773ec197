//! Database models mapping to the trust schema.

use anchorage_core::Bundle;
use sqlx::FromRow;

/// Certificate record. Natural key: `(ski, serial)`.
///
/// `serial` holds the big-endian serial number bytes; a zero serial is
/// stored as a single zero byte. Rows are immutable once inserted.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct CertificateRow {
    pub ski: String,
    pub aki: String,
    pub serial: Vec<u8>,
    pub not_before: i64,
    pub not_after: i64,
    pub raw: Vec<u8>,
}

/// Authority information access record, keyed by the issuer's key
/// identifier. The first URL observed is kept; later observations for the
/// same key are not written back.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct AiaRow {
    pub ski: String,
    pub url: String,
}

/// Release record for one bundle. Natural key: `(bundle, version)`.
///
/// `released_at` is fixed when the release is created and never updated,
/// even when the release is filled incrementally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseRow {
    pub bundle: Bundle,
    pub version: String,
    pub released_at: i64,
}

/// Certificate-to-release membership, scoped to one bundle's table.
/// Natural key: `(ski, serial, release)`. Membership is append-only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MembershipRow {
    pub bundle: Bundle,
    pub ski: String,
    pub serial: Vec<u8>,
    pub release: String,
}

impl MembershipRow {
    /// Membership of a certificate in a release.
    pub fn new(cert: &CertificateRow, release: &ReleaseRow) -> Self {
        Self {
            bundle: release.bundle,
            ski: cert.ski.clone(),
            serial: cert.serial.clone(),
            release: release.version.clone(),
        }
    }
}

/// Revocation record. Natural key: `ski` — at most one revocation per key
/// identifier is tracked.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct RevocationRow {
    pub ski: String,
    pub revoked_at: i64,
    pub mechanism: String,
    pub reason: String,
}
