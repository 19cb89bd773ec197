//! Revocation ledger trait and transaction-scoped queries.

use async_trait::async_trait;
use sqlx::{Sqlite, Transaction};

use crate::error::StoreResult;
use crate::models::RevocationRow;

/// Repository for the revocation ledger.
#[async_trait]
pub trait RevocationRepo: Send + Sync {
    /// Record a revocation unless one already exists for the key
    /// identifier; the first revocation wins and there is no update path.
    /// Returns true when the revocation was applied.
    ///
    /// Only one revocation per SKI is tracked, even though RFC 5280
    /// permits an issuer to reuse an SKI across distinct certificates; a
    /// revocation therefore covers every certificate sharing the key.
    async fn revoke(&self, revocation: &RevocationRow) -> StoreResult<bool>;

    /// True iff a revocation exists for the key identifier with
    /// `revoked_at <= as_of`. A future-dated revocation does not yet
    /// apply.
    async fn is_revoked(&self, ski: &str, as_of: i64) -> StoreResult<bool>;

    /// Fetch the revocation record for a key identifier.
    async fn get_revocation(&self, ski: &str) -> StoreResult<Option<RevocationRow>>;
}

pub(crate) async fn is_revoked_tx(
    tx: &mut Transaction<'_, Sqlite>,
    ski: &str,
    as_of: i64,
) -> StoreResult<bool> {
    let (count,): (i64,) =
        sqlx::query_as("SELECT count(*) FROM revocations WHERE ski = ? AND revoked_at <= ?")
            .bind(ski)
            .bind(as_of)
            .fetch_one(&mut **tx)
            .await?;
    Ok(count > 0)
}
