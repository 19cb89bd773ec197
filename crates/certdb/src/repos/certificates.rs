//! Certificate and issuer-URL repository trait.

use async_trait::async_trait;

use crate::error::StoreResult;
use crate::models::{AiaRow, CertificateRow, ReleaseRow};

/// Repository for certificate records and their issuer URLs.
#[async_trait]
pub trait CertificateRepo: Send + Sync {
    /// Insert the certificate unless its `(ski, serial)` key is already
    /// present. Returns true when a row was inserted.
    async fn ensure_certificate(&self, cert: &CertificateRow) -> StoreResult<bool>;

    /// Fetch one certificate by natural key.
    async fn get_certificate(
        &self,
        ski: &str,
        serial: &[u8],
    ) -> StoreResult<Option<CertificateRow>>;

    /// All certificates sharing a subject key identifier. SKIs only need
    /// to be unique per issuer, so this can return more than one row.
    async fn find_certificates_by_ski(&self, ski: &str) -> StoreResult<Vec<CertificateRow>>;

    /// Full scan of every stored certificate, for ad hoc filtering by a
    /// search layer.
    async fn all_certificates(&self) -> StoreResult<Vec<CertificateRow>>;

    /// Record the issuer certificate URL for a key identifier unless one
    /// is already recorded (store-first policy). Returns true when the
    /// URL was recorded.
    async fn ensure_aia(&self, aia: &AiaRow) -> StoreResult<bool>;

    /// Fetch the recorded issuer certificate URL for a key identifier.
    async fn get_aia(&self, ski: &str) -> StoreResult<Option<AiaRow>>;

    /// Every release, across both bundles, containing the certificate.
    async fn certificate_releases(
        &self,
        ski: &str,
        serial: &[u8],
    ) -> StoreResult<Vec<ReleaseRow>>;
}
