//! Persistent trust store for anchorage.
//!
//! This crate provides the entity model and the release machinery:
//! - Certificates, issuer URLs and revocations, with their natural keys
//! - Immutable, versioned releases and per-bundle membership tables
//! - The select-or-insert primitive every entity persists through
//! - The roll engine that carries certificates between releases

pub mod entity;
pub mod error;
pub mod models;
pub mod repos;
pub mod roll;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use models::{AiaRow, CertificateRow, MembershipRow, ReleaseRow, RevocationRow};
pub use repos::{CertificateRepo, ReleaseRepo, RevocationRepo};
pub use roll::{ExclusionReason, ExpiryReport, RollOutcome, RollRepo, SkippedCertificate};
pub use store::{CertStore, SqliteStore};

use anchorage_core::config::DatabaseConfig;
use std::sync::Arc;

/// Open a trust store from configuration.
pub async fn from_config(config: &DatabaseConfig) -> StoreResult<Arc<dyn CertStore>> {
    let store = SqliteStore::open(&config.path).await?;
    Ok(Arc::new(store) as Arc<dyn CertStore>)
}
