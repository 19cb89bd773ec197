//! Bundle selection for root and intermediate trust stores.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A certificate bundle kind.
///
/// Releases and release membership are tracked in separate tables per
/// bundle; the enum maps to those table identifiers so an invalid bundle
/// name can only be rejected at the boundary, never deep in a query.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bundle {
    /// Root certificates (`ca`).
    Ca,
    /// Intermediate certificates (`int`).
    Int,
}

impl Bundle {
    /// Short name used on the command line and in config files.
    pub fn as_str(&self) -> &'static str {
        match self {
            Bundle::Ca => "ca",
            Bundle::Int => "int",
        }
    }

    /// Table holding the releases for this bundle.
    pub fn releases_table(&self) -> &'static str {
        match self {
            Bundle::Ca => "root_releases",
            Bundle::Int => "intermediate_releases",
        }
    }

    /// Table holding certificate-to-release membership for this bundle.
    pub fn membership_table(&self) -> &'static str {
        match self {
            Bundle::Ca => "roots",
            Bundle::Int => "intermediates",
        }
    }
}

impl FromStr for Bundle {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ca" => Ok(Bundle::Ca),
            "int" => Ok(Bundle::Int),
            other => Err(crate::Error::InvalidBundle(other.to_string())),
        }
    }
}

impl fmt::Display for Bundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
