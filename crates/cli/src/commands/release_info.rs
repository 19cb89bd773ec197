//! `anchorage release-info` - display the certificates in a release.

use anchorage_certdb::{CertStore, ReleaseRepo};
use anchorage_core::{Bundle, Version};
use anyhow::{Context, Result};

pub async fn run(store: &dyn CertStore, bundle: Bundle, version: Option<&str>) -> Result<()> {
    let release = match version {
        Some(version) => {
            Version::parse(version)?;
            store
                .get_release(bundle, version)
                .await?
                .with_context(|| format!("release {bundle}-{version} doesn't exist"))?
        }
        None => store
            .latest_release(bundle)
            .await?
            .with_context(|| format!("no releases for bundle {bundle}"))?,
    };

    let certs = store.collect_release(bundle, &release.version).await?;
    println!(
        "{} certificates in release {}-{}:",
        certs.len(),
        bundle,
        release.version
    );
    for cert in &certs {
        println!(
            "SKI: {}\tSerial: {}\tSubject: {}",
            cert.ski,
            super::serial_to_string(&cert.serial),
            super::subject_line(cert)
        );
    }
    Ok(())
}
