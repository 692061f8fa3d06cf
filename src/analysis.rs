//! Signature scan of retrieved firmware images.
//!
//! Scans raw bytes for known textual markers of cryptographic primitives
//! and libraries. Findings are deterministic: each reports the marker's
//! actual first byte offset, and weak algorithms are flagged from a fixed
//! table rather than scored.

use serde::Serialize;

/// Category of a matched signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SignatureKind {
    /// Block/stream cipher with a shared key.
    SymmetricCipher,
    /// Public-key cipher or signature scheme.
    AsymmetricCipher,
    /// Cryptographic hash function.
    HashFunction,
    /// Embedded crypto library.
    Library,
}

/// One entry in the signature database.
struct Signature {
    marker: &'static [u8],
    primitive: &'static str,
    kind: SignatureKind,
    weak: bool,
}

/// Known textual markers. MD5 is flagged weak; everything else is reported
/// without judgment.
static SIGNATURES: &[Signature] = &[
    Signature {
        marker: b"AES",
        primitive: "AES",
        kind: SignatureKind::SymmetricCipher,
        weak: false,
    },
    Signature {
        marker: b"RSA",
        primitive: "RSA",
        kind: SignatureKind::AsymmetricCipher,
        weak: false,
    },
    Signature {
        marker: b"SHA256",
        primitive: "SHA-256",
        kind: SignatureKind::HashFunction,
        weak: false,
    },
    Signature {
        marker: b"OpenSSL",
        primitive: "OpenSSL Library",
        kind: SignatureKind::Library,
        weak: false,
    },
    Signature {
        marker: b"mbed TLS",
        primitive: "mbedTLS Library",
        kind: SignatureKind::Library,
        weak: false,
    },
    Signature {
        marker: b"libgcrypt",
        primitive: "Libgcrypt Library",
        kind: SignatureKind::Library,
        weak: false,
    },
    Signature {
        marker: b"MD5",
        primitive: "MD5",
        kind: SignatureKind::HashFunction,
        weak: true,
    },
];

/// One matched signature.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    /// Byte offset of the first occurrence, hex-formatted.
    pub location: String,
    /// Name of the matched primitive or library.
    pub primitive: &'static str,
    /// Category of the match.
    pub kind: SignatureKind,
    /// Advisory note, currently only set for weak algorithms.
    pub notes: &'static str,
}

/// Aggregated scan report.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    /// Number of signatures matched.
    pub functions_found: usize,
    /// Number of matches flagged as weak.
    pub vulnerabilities: usize,
    /// Individual matches, in database order.
    pub findings: Vec<Finding>,
}

/// Scans `content` for every known signature marker.
#[must_use]
pub fn analyze(content: &[u8]) -> AnalysisReport {
    let mut findings = Vec::new();
    for signature in SIGNATURES {
        if let Some(offset) = find_marker(content, signature.marker) {
            findings.push(Finding {
                location: format!("0x{offset:08X}"),
                primitive: signature.primitive,
                kind: signature.kind,
                notes: if signature.weak { "Weak Algorithm" } else { "" },
            });
        }
    }
    let vulnerabilities = findings.iter().filter(|f| !f.notes.is_empty()).count();
    AnalysisReport {
        functions_found: findings.len(),
        vulnerabilities,
        findings,
    }
}

/// First offset of `marker` in `content`, if present.
fn find_marker(content: &[u8], marker: &[u8]) -> Option<usize> {
    if marker.is_empty() || content.len() < marker.len() {
        return None;
    }
    content
        .windows(marker.len())
        .position(|window| window == marker)
}
