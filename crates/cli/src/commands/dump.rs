//! `anchorage dump` - dump certificates by SKI as PEM.

use anchorage_certdb::{CertStore, CertificateRepo};
use anyhow::{Result, bail};

pub async fn run(store: &dyn CertStore, ski: &str) -> Result<()> {
    // SKIs only need to be unique per issuer, so a single identifier can
    // legitimately match several certificates.
    let certs = store.find_certificates_by_ski(ski).await?;
    if certs.is_empty() {
        bail!("no certificates with SKI {ski}");
    }

    for cert in &certs {
        let x509 = super::parse_raw(cert)?;
        print!("{}", std::str::from_utf8(&x509.to_pem()?)?);
    }
    Ok(())
}
