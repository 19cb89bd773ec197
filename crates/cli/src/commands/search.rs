//! `anchorage search` - ad hoc certificate search.

use anchorage_certdb::{CertStore, CertificateRepo};
use anyhow::{Context, Result};
use regex::Regex;

pub async fn run(store: &dyn CertStore, ski: Option<&str>, aki: Option<&str>) -> Result<()> {
    let ski_filter = ski
        .map(Regex::new)
        .transpose()
        .context("invalid SKI pattern")?;
    let aki_filter = aki
        .map(Regex::new)
        .transpose()
        .context("invalid AKI pattern")?;

    let mut matched = 0usize;
    for cert in store.all_certificates().await? {
        if let Some(filter) = &ski_filter
            && !filter.is_match(&cert.ski)
        {
            continue;
        }
        if let Some(filter) = &aki_filter
            && !filter.is_match(&cert.aki)
        {
            continue;
        }

        matched += 1;
        println!(
            "SKI: {}\tSerial: {}\tSubject: {}",
            cert.ski,
            super::serial_to_string(&cert.serial),
            super::subject_line(&cert)
        );
    }

    println!("{matched} certificates matched.");
    Ok(())
}
