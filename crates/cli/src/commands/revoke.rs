//! `anchorage revoke` - record a revocation by key identifier.

use anchorage_certdb::{CertStore, RevocationRepo, RevocationRow};
use anyhow::{Context, Result};
use time::OffsetDateTime;

pub async fn run(
    store: &dyn CertStore,
    ski: &str,
    mechanism: &str,
    reason: &str,
    at: Option<i64>,
) -> Result<()> {
    let revoked_at = at.unwrap_or_else(|| OffsetDateTime::now_utc().unix_timestamp());
    let row = RevocationRow {
        ski: ski.to_string(),
        revoked_at,
        mechanism: mechanism.to_string(),
        reason: reason.to_string(),
    };

    if store.revoke(&row).await? {
        println!("revoked {ski} as of {}", super::format_time(revoked_at));
    } else {
        let existing = store
            .get_revocation(ski)
            .await?
            .context("revocation missing after ensure")?;
        println!(
            "{ski} was already revoked at {} via {}; keeping the first revocation",
            super::format_time(existing.revoked_at),
            existing.mechanism
        );
    }
    Ok(())
}
