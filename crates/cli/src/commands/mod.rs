//! CLI subcommand implementations.
//!
//! These drive the certdb APIs and format output; none of them carry
//! invariant-bearing logic of their own.

pub mod bundle;
pub mod dump;
pub mod expiring;
pub mod import;
pub mod info;
pub mod release;
pub mod release_info;
pub mod releases;
pub mod revoke;
pub mod search;
pub mod setup;

use anchorage_certdb::CertificateRow;
use anyhow::{Context, Result, anyhow, bail};
use openssl::bn::BigNum;
use openssl::x509::{X509, X509NameRef};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// Render a serial byte string as the decimal integer it encodes.
pub fn serial_to_string(serial: &[u8]) -> String {
    BigNum::from_slice(serial)
        .and_then(|bn| bn.to_dec_str())
        .map(|s| s.to_string())
        .unwrap_or_else(|_| hex::encode(serial))
}

/// Render an X.509 name as "C=US, O=Example Org" text.
pub fn name_to_string(name: &X509NameRef) -> String {
    let mut parts = Vec::new();
    for entry in name.entries() {
        let Ok(key) = entry.object().nid().short_name() else {
            continue;
        };
        let Ok(value) = entry.data().as_utf8() else {
            continue;
        };
        parts.push(format!("{key}={value}"));
    }
    parts.join(", ")
}

/// Parse the stored DER of a certificate for display.
pub fn parse_raw(cert: &CertificateRow) -> Result<X509> {
    X509::from_der(&cert.raw).context("stored certificate is not valid DER")
}

/// Subject line for a stored certificate.
pub fn subject_line(cert: &CertificateRow) -> String {
    parse_raw(cert)
        .map(|x509| name_to_string(x509.subject_name()))
        .unwrap_or_else(|_| "<unparseable>".to_string())
}

/// Parse a window like "30d", "72h", "15m" or "90s" into seconds. A bare
/// number is taken as seconds.
pub fn parse_window(input: &str) -> Result<i64> {
    let input = input.trim();
    let (digits, unit) = match input.find(|c: char| !c.is_ascii_digit()) {
        Some(idx) => input.split_at(idx),
        None => (input, ""),
    };
    let value: i64 = digits
        .parse()
        .map_err(|_| anyhow!("invalid window '{input}'"))?;
    let scale = match unit {
        "" | "s" => 1,
        "m" => 60,
        "h" => 3_600,
        "d" => 86_400,
        "w" => 7 * 86_400,
        other => bail!("invalid window unit '{other}' (use s, m, h, d or w)"),
    };
    Ok(value * scale)
}

/// Render epoch seconds as an RFC 3339 timestamp.
pub fn format_time(unix: i64) -> String {
    OffsetDateTime::from_unix_timestamp(unix)
        .ok()
        .and_then(|t| t.format(&Rfc3339).ok())
        .unwrap_or_else(|| unix.to_string())
}
