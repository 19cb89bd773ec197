//! The release roll engine.
//!
//! Rolling a release copies every certificate from a source release into a
//! target release, leaving behind certificates that are revoked, expired,
//! or not yet valid as of the target's effective time. The same filter,
//! minus the copy, powers the expiring-soon report.

use async_trait::async_trait;
use std::fmt;
use time::OffsetDateTime;

use anchorage_core::{Bundle, Version};

use crate::entity::ensure;
use crate::error::{StoreError, StoreResult};
use crate::models::{CertificateRow, MembershipRow, ReleaseRow};
use crate::repos::releases::{
    collect_release_tx, get_release_tx, latest_release_tx, previous_release_tx,
};
use crate::repos::revocations::is_revoked_tx;
use crate::store::SqliteStore;

/// Why a certificate was excluded from a roll or flagged by the expiry
/// report.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExclusionReason {
    Revoked,
    Expired,
    NotYetValid,
}

impl ExclusionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExclusionReason::Revoked => "revoked",
            ExclusionReason::Expired => "expired",
            ExclusionReason::NotYetValid => "not-yet-valid",
        }
    }
}

impl fmt::Display for ExclusionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A certificate left out of a roll, with the reason.
#[derive(Clone, Debug)]
pub struct SkippedCertificate {
    pub certificate: CertificateRow,
    pub reason: ExclusionReason,
}

/// Result of rolling a release forward.
#[derive(Debug)]
pub struct RollOutcome {
    pub source: ReleaseRow,
    pub target: ReleaseRow,
    pub included: usize,
    pub skipped: Vec<SkippedCertificate>,
}

/// Expiry report for a release: the certificates that would not survive a
/// roll within the given window.
#[derive(Debug)]
pub struct ExpiryReport {
    pub release: ReleaseRow,
    pub flagged: Vec<SkippedCertificate>,
}

impl ExpiryReport {
    /// Number of flagged certificates with the given reason.
    pub fn count(&self, reason: ExclusionReason) -> usize {
        self.flagged.iter().filter(|s| s.reason == reason).count()
    }
}

/// Release rolling and expiry reporting.
#[async_trait]
pub trait RollRepo: Send + Sync {
    /// Roll a release forward.
    ///
    /// With an explicit target version, the target release must already
    /// exist (created by a prior import) and the source is the release
    /// immediately preceding it; rolling a release with no predecessor
    /// fails with [`StoreError::NoPriorRelease`]. Without a target, the
    /// source is the latest release and a fresh target is created whose
    /// version increments the source's at `now`.
    ///
    /// `window_secs` widens the effective cutoff for the revocation and
    /// expiry checks. All membership inserts commit in one transaction;
    /// any failure aborts the whole roll and no partial release becomes
    /// visible.
    async fn roll_release(
        &self,
        bundle: Bundle,
        target_version: Option<&str>,
        now: OffsetDateTime,
        window_secs: i64,
    ) -> StoreResult<RollOutcome>;

    /// Report the certificates of a release that are revoked, expired
    /// within the window, or not yet valid, without mutating anything.
    /// Defaults to the latest release when no version is given.
    async fn expiring_report(
        &self,
        bundle: Bundle,
        version: Option<&str>,
        now: OffsetDateTime,
        window_secs: i64,
    ) -> StoreResult<ExpiryReport>;
}

impl SqliteStore {
    /// Resolve the source and target releases for a roll. A fresh target
    /// is created (and committed) here so its release time is fixed
    /// before any filtering starts.
    async fn resolve_roll(
        &self,
        bundle: Bundle,
        target_version: Option<&str>,
        now: OffsetDateTime,
    ) -> StoreResult<(ReleaseRow, ReleaseRow)> {
        let mut tx = self.pool().begin().await?;

        let resolved = match target_version {
            Some(version) => {
                let target = get_release_tx(&mut tx, bundle, version)
                    .await?
                    .ok_or_else(|| StoreError::UnknownRelease(format!("{bundle}-{version}")))?;
                let source = previous_release_tx(&mut tx, &target)
                    .await?
                    .ok_or_else(|| StoreError::NoPriorRelease(target.version.clone()))?;
                (source, target)
            }
            None => {
                let source = latest_release_tx(&mut tx, bundle)
                    .await?
                    .ok_or_else(|| {
                        StoreError::NotFound(format!("no releases for bundle {bundle}"))
                    })?;

                let next = Version::parse(&source.version)?.increment_at(now)?;
                let mut target = ReleaseRow {
                    bundle,
                    version: next.to_string(),
                    released_at: now.unix_timestamp(),
                };
                ensure(&mut target, &mut tx).await?;
                (source, target)
            }
        };

        tx.commit().await?;
        Ok(resolved)
    }
}

#[async_trait]
impl RollRepo for SqliteStore {
    async fn roll_release(
        &self,
        bundle: Bundle,
        target_version: Option<&str>,
        now: OffsetDateTime,
        window_secs: i64,
    ) -> StoreResult<RollOutcome> {
        let (source, target) = self.resolve_roll(bundle, target_version, now).await?;

        let mut tx = self.pool().begin().await?;
        let certs = collect_release_tx(&mut tx, bundle, &source.version).await?;

        let effective = target.released_at + window_secs;
        let mut included = 0usize;
        let mut skipped = Vec::new();

        for cert in certs {
            let reason = if is_revoked_tx(&mut tx, &cert.ski, effective).await? {
                Some(ExclusionReason::Revoked)
            } else if cert.not_after <= effective {
                Some(ExclusionReason::Expired)
            } else if cert.not_before > target.released_at {
                Some(ExclusionReason::NotYetValid)
            } else {
                None
            };

            match reason {
                Some(reason) => skipped.push(SkippedCertificate {
                    certificate: cert,
                    reason,
                }),
                None => {
                    let mut membership = MembershipRow::new(&cert, &target);
                    ensure(&mut membership, &mut tx).await?;
                    included += 1;
                }
            }
        }

        tx.commit().await?;

        tracing::info!(
            bundle = %bundle,
            source = %source.version,
            target = %target.version,
            included,
            skipped = skipped.len(),
            "rolled release"
        );

        Ok(RollOutcome {
            source,
            target,
            included,
            skipped,
        })
    }

    async fn expiring_report(
        &self,
        bundle: Bundle,
        version: Option<&str>,
        now: OffsetDateTime,
        window_secs: i64,
    ) -> StoreResult<ExpiryReport> {
        let mut tx = self.pool().begin().await?;

        let release = match version {
            Some(version) => get_release_tx(&mut tx, bundle, version)
                .await?
                .ok_or_else(|| StoreError::UnknownRelease(format!("{bundle}-{version}")))?,
            None => latest_release_tx(&mut tx, bundle).await?.ok_or_else(|| {
                StoreError::NotFound(format!("no releases for bundle {bundle}"))
            })?,
        };

        let certs = collect_release_tx(&mut tx, bundle, &release.version).await?;

        // Revocation and validity-start are judged at the release time;
        // only expiry looks ahead through the window.
        let expires_at = now.unix_timestamp() + window_secs;
        let mut flagged = Vec::new();

        for cert in certs {
            let reason = if is_revoked_tx(&mut tx, &cert.ski, release.released_at).await? {
                Some(ExclusionReason::Revoked)
            } else if cert.not_after <= expires_at {
                Some(ExclusionReason::Expired)
            } else if cert.not_before > release.released_at {
                Some(ExclusionReason::NotYetValid)
            } else {
                None
            };

            if let Some(reason) = reason {
                flagged.push(SkippedCertificate {
                    certificate: cert,
                    reason,
                });
            }
        }

        tx.commit().await?;
        Ok(ExpiryReport { release, flagged })
    }
}
