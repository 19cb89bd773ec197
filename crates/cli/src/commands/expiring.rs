//! `anchorage expiring` - show expiring (and revoked) certificates.

use anchorage_certdb::{CertStore, ExclusionReason, RollRepo};
use anchorage_core::Bundle;
use anyhow::Result;
use time::OffsetDateTime;

pub async fn run(
    store: &dyn CertStore,
    bundle: Bundle,
    version: Option<&str>,
    window: Option<&str>,
) -> Result<()> {
    let window_secs = match window {
        Some(window) => super::parse_window(window)?,
        None => 30 * 86_400,
    };

    let report = store
        .expiring_report(bundle, version, OffsetDateTime::now_utc(), window_secs)
        .await?;

    for flagged in &report.flagged {
        let cert = &flagged.certificate;
        println!(
            "{} certificate (SKI={}, serial={}, subject='{}')",
            flagged.reason,
            cert.ski,
            super::serial_to_string(&cert.serial),
            super::subject_line(cert),
        );
    }

    println!("Release: {} {}", bundle, report.release.version);
    println!(
        "{} certificates expiring.",
        report.count(ExclusionReason::Expired) + report.count(ExclusionReason::NotYetValid)
    );
    println!(
        "{} certificates revoked.",
        report.count(ExclusionReason::Revoked)
    );
    Ok(())
}
