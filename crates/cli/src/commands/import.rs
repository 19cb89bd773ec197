//! `anchorage import` - import PEM certificates into the database.

use std::path::PathBuf;

use anchorage_certdb::{
    AiaRow, CertStore, CertificateRepo, CertificateRow, MembershipRow, ReleaseRepo, ReleaseRow,
};
use anchorage_core::{Bundle, Version, identity};
use anyhow::{Context, Result};
use openssl::x509::X509;
use time::OffsetDateTime;

pub async fn run(
    store: &dyn CertStore,
    bundle: Bundle,
    release: Option<&str>,
    files: &[PathBuf],
) -> Result<()> {
    // When a release is named, make sure it exists before any
    // certificate is attached to it. An existing release keeps its
    // original timestamp.
    let release_row = match release {
        Some(version) => {
            Version::parse(version)?;
            let row = ReleaseRow {
                bundle,
                version: version.to_string(),
                released_at: OffsetDateTime::now_utc().unix_timestamp(),
            };
            store.ensure_release(&row).await?;
            let row = store
                .get_release(bundle, version)
                .await?
                .context("release missing after ensure")?;
            Some(row)
        }
        None => None,
    };

    for path in files {
        let contents = std::fs::read(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let certs = X509::stack_from_pem(&contents)
            .with_context(|| format!("parsing certificates from {}", path.display()))?;

        for cert in &certs {
            import_certificate(store, cert, release_row.as_ref()).await?;
        }
    }

    Ok(())
}

async fn import_certificate(
    store: &dyn CertStore,
    cert: &X509,
    release: Option<&ReleaseRow>,
) -> Result<()> {
    let identity = identity::extract_identity(cert)?;
    let row = CertificateRow {
        ski: identity.ski,
        aki: identity.aki,
        serial: identity.serial,
        not_before: identity::asn1_time_to_unix(cert.not_before())?,
        not_after: identity::asn1_time_to_unix(cert.not_after())?,
        raw: cert.to_der()?,
    };

    println!(
        "- importing serial {} AKI {}",
        super::serial_to_string(&row.serial),
        row.aki
    );
    let inserted = store.ensure_certificate(&row).await?;
    tracing::debug!(ski = %row.ski, inserted, "imported certificate");

    if !row.aki.is_empty()
        && let Some(url) = identity::issuing_certificate_url(cert)
    {
        let aia = AiaRow {
            ski: row.aki.clone(),
            url,
        };
        store.ensure_aia(&aia).await?;
    }

    if let Some(release) = release {
        store
            .ensure_membership(&MembershipRow::new(&row, release))
            .await?;
    }

    Ok(())
}
