//! Repository traits for trust store operations.

pub mod certificates;
pub mod releases;
pub mod revocations;

pub use certificates::CertificateRepo;
pub use releases::ReleaseRepo;
pub use revocations::RevocationRepo;
