//! `anchorage bundle` - emit a certificate bundle for a release.

use std::path::Path;

use anchorage_certdb::{CertStore, ReleaseRepo};
use anchorage_core::Bundle;
use anyhow::{Context, Result};

pub async fn run(
    store: &dyn CertStore,
    bundle: Bundle,
    version: Option<&str>,
    out: Option<&Path>,
) -> Result<()> {
    let release = match version {
        Some(version) => store
            .get_release(bundle, version)
            .await?
            .with_context(|| format!("release {bundle}-{version} doesn't exist"))?,
        None => store
            .latest_release(bundle)
            .await?
            .with_context(|| format!("no releases for bundle {bundle}"))?,
    };

    let certs = store.collect_release(bundle, &release.version).await?;

    let mut pem = String::new();
    for cert in &certs {
        let x509 = super::parse_raw(cert)?;
        pem.push_str(std::str::from_utf8(&x509.to_pem()?)?);
    }

    match out {
        Some(path) => {
            std::fs::write(path, &pem)
                .with_context(|| format!("writing bundle to {}", path.display()))?;
            println!(
                "wrote {} certificates of release {}-{} to {}",
                certs.len(),
                bundle,
                release.version,
                path.display()
            );
        }
        None => print!("{pem}"),
    }
    Ok(())
}
