//! Integration tests for the release roll engine.

mod common;

use anchorage_certdb::models::MembershipRow;
use anchorage_certdb::{
    CertificateRepo, ExclusionReason, ReleaseRepo, RevocationRepo, RollRepo, StoreError,
};
use anchorage_core::Bundle;
use common::{TestStore, cert, release, revocation};
use time::OffsetDateTime;

// 2023-11-14T22:13:20Z, inside the source release's month.
const T0: i64 = 1_700_000_000;

fn at(unix: i64) -> OffsetDateTime {
    OffsetDateTime::from_unix_timestamp(unix).unwrap()
}

/// Seed a ca release holding the given certificates.
async fn seed_release(
    store: &anchorage_certdb::SqliteStore,
    version: &str,
    released_at: i64,
    certs: &[anchorage_certdb::CertificateRow],
) {
    let rel = release(Bundle::Ca, version, released_at);
    store.ensure_release(&rel).await.unwrap();
    for c in certs {
        store.ensure_certificate(c).await.unwrap();
        store
            .ensure_membership(&MembershipRow::new(c, &rel))
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn test_roll_filters_revoked_expired_and_not_yet_valid() {
    let harness = TestStore::new().await;
    let store = harness.store();

    let valid = cert("cert-valid", &[0x01], T0 - 1_000, T0 + 10_000_000);
    let expired = cert("cert-expired", &[0x02], T0 - 50_000, T0 - 10);
    let revoked = cert("cert-revoked", &[0x03], T0 - 1_000, T0 + 10_000_000);
    let premature = cert("cert-early", &[0x04], T0 + 5_000, T0 + 20_000_000);
    let future_revoked = cert("cert-later", &[0x05], T0 - 1_000, T0 + 10_000_000);

    seed_release(
        store,
        "2023.11.0",
        T0 - 100_000,
        &[
            valid.clone(),
            expired.clone(),
            revoked.clone(),
            premature.clone(),
            future_revoked.clone(),
        ],
    )
    .await;

    store.revoke(&revocation("cert-revoked", T0 - 500)).await.unwrap();
    // Revoked after the effective time: still carried forward.
    store
        .revoke(&revocation("cert-later", T0 + 100_000))
        .await
        .unwrap();

    let outcome = store
        .roll_release(Bundle::Ca, None, at(T0), 0)
        .await
        .unwrap();

    assert_eq!(outcome.source.version, "2023.11.0");
    assert_eq!(outcome.target.version, "2023.11.1");
    assert_eq!(outcome.target.released_at, T0);
    assert_eq!(outcome.included, 2);
    assert_eq!(outcome.skipped.len(), 3);

    let reason_for = |ski: &str| {
        outcome
            .skipped
            .iter()
            .find(|s| s.certificate.ski == ski)
            .map(|s| s.reason)
    };
    assert_eq!(reason_for("cert-expired"), Some(ExclusionReason::Expired));
    assert_eq!(reason_for("cert-revoked"), Some(ExclusionReason::Revoked));
    assert_eq!(reason_for("cert-early"), Some(ExclusionReason::NotYetValid));

    let rolled = store.collect_release(Bundle::Ca, "2023.11.1").await.unwrap();
    let mut skis: Vec<&str> = rolled.iter().map(|c| c.ski.as_str()).collect();
    skis.sort_unstable();
    assert_eq!(skis, ["cert-later", "cert-valid"]);
}

#[tokio::test]
async fn test_roll_window_widens_expiry_cutoff() {
    let harness = TestStore::new().await;
    let store = harness.store();

    // Expires shortly after the release: survives a zero-window roll but
    // not one with a grace window covering the expiry.
    let brief = cert("cert-brief", &[0x01], T0 - 1_000, T0 + 500);
    seed_release(store, "2023.11.0", T0 - 100_000, &[brief.clone()]).await;

    let outcome = store
        .roll_release(Bundle::Ca, None, at(T0), 1_000)
        .await
        .unwrap();
    assert_eq!(outcome.included, 0);
    assert_eq!(outcome.skipped.len(), 1);
    assert_eq!(outcome.skipped[0].reason, ExclusionReason::Expired);
}

#[tokio::test]
async fn test_roll_into_explicit_target() {
    let harness = TestStore::new().await;
    let store = harness.store();

    let carried = cert("cert-carried", &[0x01], 500, 9_000_000);
    seed_release(store, "2024.1.0", 1_000, &[carried.clone()]).await;

    // The target already exists, created by an import.
    let target = release(Bundle::Ca, "2024.1.1", 2_000);
    store.ensure_release(&target).await.unwrap();
    let fresh = cert("cert-fresh", &[0x02], 1_500, 9_000_000);
    store.ensure_certificate(&fresh).await.unwrap();
    store
        .ensure_membership(&MembershipRow::new(&fresh, &target))
        .await
        .unwrap();

    let outcome = store
        .roll_release(Bundle::Ca, Some("2024.1.1"), at(2_500), 0)
        .await
        .unwrap();
    assert_eq!(outcome.source.version, "2024.1.0");
    assert_eq!(outcome.target.version, "2024.1.1");
    // The pre-existing release keeps its original timestamp.
    assert_eq!(outcome.target.released_at, 2_000);
    assert_eq!(outcome.included, 1);

    // The imported certificate and the carried one coexist.
    let members = store.collect_release(Bundle::Ca, "2024.1.1").await.unwrap();
    assert_eq!(members.len(), 2);
}

#[tokio::test]
async fn test_roll_first_release_has_no_prior() {
    let harness = TestStore::new().await;
    let store = harness.store();

    seed_release(store, "2024.1.0", 1_000, &[]).await;

    let err = store
        .roll_release(Bundle::Ca, Some("2024.1.0"), at(2_000), 0)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::NoPriorRelease(_)), "got {err:?}");
}

#[tokio::test]
async fn test_roll_unknown_target_fails() {
    let harness = TestStore::new().await;
    let store = harness.store();

    seed_release(store, "2024.1.0", 1_000, &[]).await;

    let err = store
        .roll_release(Bundle::Ca, Some("2030.1.0"), at(2_000), 0)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::UnknownRelease(_)), "got {err:?}");
}

#[tokio::test]
async fn test_roll_refuses_version_regression() {
    let harness = TestStore::new().await;
    let store = harness.store();

    // The latest release claims a version from the future relative to the
    // roll timestamp; incrementing it must not move backwards.
    seed_release(store, "2024.5.0", T0 - 100_000, &[]).await;

    let err = store
        .roll_release(Bundle::Ca, None, at(T0), 0)
        .await
        .unwrap_err();
    assert!(
        matches!(
            err,
            StoreError::Core(anchorage_core::Error::Regression(_))
        ),
        "got {err:?}"
    );
}

#[tokio::test]
async fn test_roll_is_repeatable_for_explicit_target() {
    let harness = TestStore::new().await;
    let store = harness.store();

    let carried = cert("cert-carried", &[0x01], 500, 9_000_000);
    seed_release(store, "2024.1.0", 1_000, &[carried.clone()]).await;
    store
        .ensure_release(&release(Bundle::Ca, "2024.1.1", 2_000))
        .await
        .unwrap();

    for _ in 0..2 {
        let outcome = store
            .roll_release(Bundle::Ca, Some("2024.1.1"), at(2_500), 0)
            .await
            .unwrap();
        assert_eq!(outcome.included, 1);
    }
    assert_eq!(store.release_count(Bundle::Ca, "2024.1.1").await.unwrap(), 1);
}

#[tokio::test]
async fn test_expiring_report_flags_without_mutating() {
    let harness = TestStore::new().await;
    let store = harness.store();

    let released_at = 10_000;
    let valid = cert("cert-valid", &[0x01], 5_000, 100_000);
    let expiring = cert("cert-expiring", &[0x02], 5_000, 25_000);
    let revoked = cert("cert-revoked", &[0x03], 5_000, 100_000);
    let late_revoked = cert("cert-late", &[0x04], 5_000, 100_000);

    seed_release(
        store,
        "2024.1.0",
        released_at,
        &[
            valid.clone(),
            expiring.clone(),
            revoked.clone(),
            late_revoked.clone(),
        ],
    )
    .await;

    store.revoke(&revocation("cert-revoked", 9_000)).await.unwrap();
    // Revoked after the release time: the report judges revocation at the
    // release, so this one is not flagged.
    store.revoke(&revocation("cert-late", 15_000)).await.unwrap();

    let report = store
        .expiring_report(Bundle::Ca, None, at(20_000), 10_000)
        .await
        .unwrap();

    assert_eq!(report.release.version, "2024.1.0");
    assert_eq!(report.count(ExclusionReason::Expired), 1);
    assert_eq!(report.count(ExclusionReason::Revoked), 1);
    assert_eq!(report.count(ExclusionReason::NotYetValid), 0);
    assert_eq!(report.flagged.len(), 2);

    // Reporting creates no release and removes no membership.
    assert_eq!(store.list_releases(Bundle::Ca).await.unwrap().len(), 1);
    assert_eq!(store.release_count(Bundle::Ca, "2024.1.0").await.unwrap(), 4);
}
