//! `anchorage info` - display stored information about certificates.

use anchorage_certdb::{CertStore, CertificateRepo, CertificateRow, RevocationRepo};
use anyhow::Result;

pub async fn run(store: &dyn CertStore, skis: &[String]) -> Result<()> {
    for ski in skis {
        let certs = store.find_certificates_by_ski(ski).await?;
        if certs.is_empty() {
            println!("no certificates with SKI {ski}");
            continue;
        }
        for cert in &certs {
            print_certificate(store, cert).await?;
        }
    }
    Ok(())
}

async fn print_certificate(store: &dyn CertStore, cert: &CertificateRow) -> Result<()> {
    println!("SKI: {}", cert.ski);
    println!("  Serial: {}", super::serial_to_string(&cert.serial));
    if !cert.aki.is_empty() {
        println!("  AKI: {}", cert.aki);
    }
    println!("  Subject: {}", super::subject_line(cert));
    println!("  Not before: {}", super::format_time(cert.not_before));
    println!("  Not after: {}", super::format_time(cert.not_after));

    if let Some(revocation) = store.get_revocation(&cert.ski).await? {
        println!(
            "  Revoked: {} via {} ({})",
            super::format_time(revocation.revoked_at),
            revocation.mechanism,
            revocation.reason
        );
    }

    if !cert.aki.is_empty()
        && let Some(aia) = store.get_aia(&cert.aki).await?
    {
        println!("  Issuer URL: {}", aia.url);
    }

    let releases = store.certificate_releases(&cert.ski, &cert.serial).await?;
    if !releases.is_empty() {
        let names: Vec<String> = releases
            .iter()
            .map(|r| format!("{}-{}", r.bundle, r.version))
            .collect();
        println!("  Releases: {}", names.join(", "));
    }
    Ok(())
}
