//! `anchorage releases` - list all releases for a bundle.

use anchorage_certdb::{CertStore, ReleaseRepo};
use anchorage_core::Bundle;
use anyhow::Result;

pub async fn run(store: &dyn CertStore, bundle: Bundle) -> Result<()> {
    for release in store.list_releases(bundle).await? {
        println!("- {}", release.version);
    }
    Ok(())
}
