//! `anchorage release` - roll a new release.

use anchorage_certdb::{CertStore, RollRepo};
use anchorage_core::Bundle;
use anyhow::Result;
use time::OffsetDateTime;

pub async fn run(
    store: &dyn CertStore,
    bundle: Bundle,
    target: Option<&str>,
    window: Option<&str>,
) -> Result<()> {
    let window_secs = match window {
        Some(window) => super::parse_window(window)?,
        None => 0,
    };

    let outcome = store
        .roll_release(bundle, target, OffsetDateTime::now_utc(), window_secs)
        .await?;

    for skipped in &outcome.skipped {
        let cert = &skipped.certificate;
        println!(
            "skipping {} certificate (SKI={}, serial={}, subject='{}')",
            skipped.reason,
            cert.ski,
            super::serial_to_string(&cert.serial),
            super::subject_line(cert),
        );
    }

    println!("{} certificates rolled", outcome.included);
    println!("{} certificates skipped", outcome.skipped.len());
    println!(
        "Successfully rolled new {} release {}",
        bundle, outcome.target.version
    );
    Ok(())
}
