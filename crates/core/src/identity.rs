//! Certificate identity derivation.
//!
//! Certificates are indexed by subject key identifier and serial number.
//! Many early CA roots carry no SKI extension; for those the identifier is
//! derived from the public key with the method in RFC 5280 section 4.2.1.2
//! (1): the SHA-1 digest of the subjectPublicKey BIT STRING contents.

use openssl::asn1::{Asn1Time, Asn1TimeRef};
use openssl::nid::Nid;
use openssl::sha::sha1;
use openssl::x509::X509Ref;

use crate::{Error, Result};

/// The indexing identity of a certificate.
///
/// `aki` is empty for self-issued roots that carry no authority key
/// identifier. `serial` holds the big-endian serial number bytes, with a
/// zero serial normalized to a single zero byte.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CertificateIdentity {
    pub ski: String,
    pub aki: String,
    pub serial: Vec<u8>,
}

/// Extract the indexing identity from a certificate.
///
/// The SKI comes from the SubjectKeyIdentifier extension when present and
/// is derived from the public key otherwise.
pub fn extract_identity(cert: &X509Ref) -> Result<CertificateIdentity> {
    let ski = match cert.subject_key_id() {
        Some(id) => hex::encode(id.as_slice()),
        None => derive_ski(cert)?,
    };

    let aki = cert
        .authority_key_id()
        .map(|id| hex::encode(id.as_slice()))
        .unwrap_or_default();

    Ok(CertificateIdentity {
        ski,
        aki,
        serial: serial_bytes(cert)?,
    })
}

/// Big-endian serial number bytes of a certificate.
pub fn serial_bytes(cert: &X509Ref) -> Result<Vec<u8>> {
    let serial = cert.serial_number().to_bn()?;
    Ok(normalize_serial(serial.to_vec()))
}

/// Normalize a big-endian serial encoding: a zero serial (empty byte
/// sequence) becomes a single zero byte so it satisfies the store's
/// NOT NULL constraint without colliding with any nonzero serial.
pub fn normalize_serial(bytes: Vec<u8>) -> Vec<u8> {
    if bytes.is_empty() { vec![0] } else { bytes }
}

/// Derive a subject key identifier from the certificate's public key
/// (RFC 5280 section 4.2.1.2, method 1). Deterministic: the same public
/// key always derives the same identifier.
pub fn derive_ski(cert: &X509Ref) -> Result<String> {
    let spki = cert
        .public_key()
        .and_then(|key| key.public_key_to_der())
        .map_err(|err| Error::UnsupportedKeyKind(err.to_string()))?;

    let bits = subject_public_key_bits(&spki).ok_or_else(|| {
        Error::UnsupportedKeyKind("unparseable SubjectPublicKeyInfo".to_string())
    })?;

    Ok(hex::encode(sha1(bits)))
}

/// Extract the subjectPublicKey BIT STRING contents from a DER-encoded
/// SubjectPublicKeyInfo (SEQUENCE { AlgorithmIdentifier, BIT STRING }).
fn subject_public_key_bits(spki: &[u8]) -> Option<&[u8]> {
    let (tag, body, _) = read_tlv(spki)?;
    if tag != 0x30 {
        return None;
    }
    // Skip the AlgorithmIdentifier.
    let (_, _, rest) = read_tlv(body)?;
    let (tag, content, _) = read_tlv(rest)?;
    if tag != 0x03 || content.is_empty() {
        return None;
    }
    // The first octet of a BIT STRING counts unused trailing bits.
    Some(&content[1..])
}

/// Read one DER TLV, returning (tag, contents, remainder).
fn read_tlv(input: &[u8]) -> Option<(u8, &[u8], &[u8])> {
    let (&tag, rest) = input.split_first()?;
    let (&first, mut rest) = rest.split_first()?;

    let length = if first < 0x80 {
        first as usize
    } else {
        let count = (first & 0x7f) as usize;
        if count == 0 || count > size_of::<usize>() || rest.len() < count {
            return None;
        }
        let mut length = 0usize;
        for _ in 0..count {
            let (&byte, remainder) = rest.split_first()?;
            length = length << 8 | byte as usize;
            rest = remainder;
        }
        length
    };

    if rest.len() < length {
        return None;
    }
    Some((tag, &rest[..length], &rest[length..]))
}

/// First CA Issuers URI from the authority information access extension,
/// if the certificate carries one.
pub fn issuing_certificate_url(cert: &X509Ref) -> Option<String> {
    let aia = cert.authority_info()?;
    for desc in &aia {
        if desc.method().nid() == Nid::AD_CA_ISSUERS
            && let Some(uri) = desc.location().uri()
        {
            return Some(uri.to_string());
        }
    }
    None
}

/// Convert an ASN.1 time to Unix epoch seconds.
pub fn asn1_time_to_unix(when: &Asn1TimeRef) -> Result<i64> {
    let epoch = Asn1Time::from_unix(0)?;
    let diff = epoch.diff(when)?;
    Ok(i64::from(diff.days) * 86_400 + i64::from(diff.secs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use openssl::x509::X509;

    // Leaf issued by a CA whose key identifier is 9b3b73...; carries both
    // SKI and AKI extensions but no AIA extension.
    const LEAF_PEM: &str = "-----BEGIN CERTIFICATE-----
MIIEujCCAqKgAwIBAgIUE88us8tr5RRFX4RlooTtDDKao5owDQYJKoZIhvcNAQEN
BQAwZDELMAkGA1UEBhMCVVMxKDAmBgNVBAsTH0Ryb3Bzb25kZSBDZXJ0aWZpY2F0
ZSBBdXRob3JpdHkxFjAUBgNVBAcTDVNhbiBGcmFuY2lzY28xEzARBgNVBAgTCkNh
bGlmb3JuaWEwHhcNMTcwMzIyMjEyNDAwWhcNMTgwMzIyMjEyNDAwWjA7MQswCQYD
VQQGEwJVUzEWMBQGA1UEBxMNU2FuIEZyYW5jaXNjbzEUMBIGA1UEChMLRXhhbXBs
ZSBPcmcwggEiMA0GCSqGSIb3DQEBAQUAA4IBDwAwggEKAoIBAQDS8xbhnhoS9S8h
fOoyS5UEpRa/qxqe8+CrQ/hlLmND3p9igSaMpmDzz6rhgadPSOAhU4eNkuXU+0gL
c2qUny8TMZllS3bUzEVydRerDlz4ILsm0Pm/vvvOQxg+wAidKTpq6Mt9TjoXhqZW
FyZzYArGecIQhofl8Z0aHhBQx3vSLCl6i+5FdBHLbrE6WKSo5nWN+lImOVBOUDoe
KQvp9q3pX1WSzB02IEymBlMUfYuPx/Ak7q/ipgEcgQ9EkUQBR5G1fuuNzW/1WT8b
RdduT7quEOEOTB672g4zY+DG+oo3UjgvZNSkxS9MuAHD/vC0quTKSWYqOUFsW4wO
w+ymWO3dAgMBAAGjgYwwgYkwDgYDVR0PAQH/BAQDAgWgMBMGA1UdJQQMMAoGCCsG
AQUFBwMBMAwGA1UdEwEB/wQCMAAwHQYDVR0OBBYEFDg3gWdPbhl4INGDMdU/RCig
1PrXMB8GA1UdIwQYMBaAFJs7c+/33EDkoip7EOnUrU1dDOw9MBQGA1UdEQQNMAuC
CWxvY2FsaG9zdDANBgkqhkiG9w0BAQ0FAAOCAgEA3aqTKWrTgD3cZVuBTSz7nWRG
k5LyVYA1wlAD1o/msPwtO1eJ/doSc+gTUyzIYoUD3wyAkTrA3UJosYiY6BYdJvsh
AC5B/Kr+qwUjqqiE8ejPW/UzPjJldSa1zrhOMPDVDjnD+GMm9hLtxB7Mw0EWM3jn
+noiPjz6RFsbo4jhZigWrHmR1FKBoCWKEAJEzE0k5n0RljzyCk2nH6jfE1tHLaoe
njJ6XVu3RpW9RBJJcIyfyprhrG96ch8eet0VjV3Dn746sTKYY4yDMnvTc51aXc88
CeV6RxiqYObVbfyH8jX5v3rdJUA5FTTQU1IXx8Lt80L12Zhh+NqODlqJnnKVFAen
KpGINr31d0x2QE5C4uhb03OUgcQDT9pOu/VyLqZo7HUPZ/0HCUhPyvZrdiCAQCkQ
zjdxJ7iTVJibIjXjblURGsZnJ0TX1XdGcMOzQHsguNpZcDCE5lri+MlMX5Q7UVc8
2AOP0tNzvDb/dtaKJOYHC5vF+A8mC7ypoWqIPRpgl4Q1fNor92tlAXv+EbUQ+X4s
5IsbInK07y3bWprTUXCl9h2C3ZvZpnTDOhcwA2LppN7HRa0z86yrxMtTKXrRwzp7
cykDEvBNRzSMW4/JLLxWXX8xkgyof0FLOvKn6Vpa8yj3PO3LKPDYKXkMzMkyquAA
XHXWOlG/EIvvGpRRLGA=
-----END CERTIFICATE-----";

    // Same issuer, with an Authority Information Access extension naming
    // http://localhost/issuance as the CA Issuers URL.
    const LEAF_WITH_AIA_PEM: &str = "-----BEGIN CERTIFICATE-----
MIIE8TCCAtmgAwIBAgIUNf3QnXcvRrC+qV98F5/fqX7sSEYwDQYJKoZIhvcNAQEN
BQAwZDELMAkGA1UEBhMCVVMxKDAmBgNVBAsTH0Ryb3Bzb25kZSBDZXJ0aWZpY2F0
ZSBBdXRob3JpdHkxFjAUBgNVBAcTDVNhbiBGcmFuY2lzY28xEzARBgNVBAgTCkNh
bGlmb3JuaWEwHhcNMTcwMzIyMjM1NzAwWhcNMTgwMzIyMjM1NzAwWjA7MQswCQYD
VQQGEwJVUzEWMBQGA1UEBxMNU2FuIEZyYW5jaXNjbzEUMBIGA1UEChMLRXhhbXBs
ZSBPcmcwggEiMA0GCSqGSIb3DQEBAQUAA4IBDwAwggEKAoIBAQDVuvrIyN2KZd8V
LVrgydKirLSWTXLL4SnwhUElGd0Ng3mkm3+B/+bRqfku43oTgcCXSn2RBGO8FZ2h
tKLus2sE3lSiJeFIz+x6mjfxHQ0teAtcaZr8H3JzbFfP3G04DvszyOr2hUmZz3Zg
k+nJXwjBgXCswWJxIZ8b/PeWRsc3shUWSVED6IZIa/bBILbKPXi62cdDJxmHdMT3
8qIieamvP0EJemOQVSXPbUapVddOsZk9iXDJFYrmj89ngmyN/L+5XntVDELKKHFm
MN5PSFQ8Dc9In9xQfsWJQBS39iOUOwzj3aB3r8qapnJsJBEyaNnU71NQ/rOI7sbN
lPBiT/mDAgMBAAGjgcMwgcAwDgYDVR0PAQH/BAQDAgWgMBMGA1UdJQQMMAoGCCsG
AQUFBwMBMAwGA1UdEwEB/wQCMAAwHQYDVR0OBBYEFFoBtOYL2Aoxvqkin/dG0kyK
pKGGMB8GA1UdIwQYMBaAFJs7c+/33EDkoip7EOnUrU1dDOw9MDUGCCsGAQUFBwEB
BCkwJzAlBggrBgEFBQcwAoYZaHR0cDovL2xvY2FsaG9zdC9pc3N1YW5jZTAUBgNV
HREEDTALgglsb2NhbGhvc3QwDQYJKoZIhvcNAQENBQADggIBAEug5xSH5B62LDup
soBnGcpiup6778O9pNlmln7h2Lh538S33JPYLp1SYqLieQ0Ww/9CCFMg/VxKDuKE
vbF7n2ZDjLCgXNQpJwBRwCbSFiWY5lYyC4+wbKp04GywcV7HVct1YtqBlvRF+lO7
TXmeEmE15IdyZRjONLv1FMhRXKkU6CpU6Dfn++UcE9EQq2xgFWXYzKZVGrkWv4Gp
33fbCY7nuBSF3FAGyjHq+zBJM0ftcBkg1OrbTWqgJB4h41SXA5DT4dovBZ0AWuuv
84ft8FxFLwVqRMtH8Trc8qXhBmDUYfa4Iv51NF1Ji8xkiusuqt8z6kiTo+VJw1hj
z3ZQoYaj1Yk9UCHCbqHN3PxW+N/K451ib+i7CiSG8hhaxZMpX+cP8o3C65fVDquH
2gpcrHLt5CAGRk3YY+uMkBGLvSYhQ2By8tpX1YXcmAYleF6h7a5E5xTqR9ek9Nhj
PWnfrp07jugIsv2nFlYZjBaa1p1lWgabAaGHG47V0HRTFvKdtaxXCTMKofc3g0he
44Wg1V0EcvsLeDAmjBgBtnwFyeV33y1ytDwvl7/EAlX9OWdaDOSXnzotocSzFpKh
vxbpF0Bdu5S04wN5Qzc5sIQWCyPwtUsiq7A+xqqOCU9770bqraG3T7aBM7VuUm6O
huB5zfRBKm6VY4UQEj7kHjQO8nxW
-----END CERTIFICATE-----";

    fn leaf() -> X509 {
        X509::from_pem(LEAF_PEM.as_bytes()).unwrap()
    }

    #[test]
    fn test_extract_identity_uses_extensions() {
        let identity = extract_identity(&leaf()).unwrap();
        assert_eq!(identity.ski, "383781674f6e197820d18331d53f4428a0d4fad7");
        assert_eq!(identity.aki, "9b3b73eff7dc40e4a22a7b10e9d4ad4d5d0cec3d");
        assert_eq!(
            hex::encode(&identity.serial),
            "13cf2eb3cb6be514455f8465a284ed0c329aa39a"
        );
    }

    #[test]
    fn test_derive_ski_matches_embedded_extension() {
        // The fixture was issued with an RFC 5280 method-1 SKI, so the
        // derivation must reproduce the embedded extension value.
        let cert = leaf();
        let embedded = hex::encode(cert.subject_key_id().unwrap().as_slice());
        assert_eq!(derive_ski(&cert).unwrap(), embedded);
        // And it is stable across calls.
        assert_eq!(derive_ski(&cert).unwrap(), embedded);
    }

    #[test]
    fn test_normalize_serial_zero() {
        assert_eq!(normalize_serial(Vec::new()), vec![0]);
        assert_eq!(normalize_serial(vec![0x01, 0x02]), vec![0x01, 0x02]);
    }

    #[test]
    fn test_issuing_certificate_url() {
        assert_eq!(issuing_certificate_url(&leaf()), None);

        let with_aia = X509::from_pem(LEAF_WITH_AIA_PEM.as_bytes()).unwrap();
        assert_eq!(
            issuing_certificate_url(&with_aia).as_deref(),
            Some("http://localhost/issuance")
        );
    }

    #[test]
    fn test_validity_to_unix() {
        let cert = leaf();
        // Not before: 2017-03-22T21:24:00Z.
        assert_eq!(asn1_time_to_unix(cert.not_before()).unwrap(), 1490217840);
        // Not after: exactly one year later.
        assert_eq!(
            asn1_time_to_unix(cert.not_after()).unwrap(),
            1490217840 + 365 * 86_400
        );
    }

    #[test]
    fn test_subject_public_key_bits() {
        // SEQUENCE { SEQUENCE {}, BIT STRING { 0 unused, de ad be ef } }
        let spki = [0x30, 0x09, 0x30, 0x00, 0x03, 0x05, 0x00, 0xde, 0xad, 0xbe, 0xef];
        assert_eq!(
            subject_public_key_bits(&spki),
            Some(&[0xde, 0xad, 0xbe, 0xef][..])
        );

        // Truncated input must not panic.
        assert_eq!(subject_public_key_bits(&spki[..6]), None);
        assert_eq!(subject_public_key_bits(&[]), None);
    }
}
