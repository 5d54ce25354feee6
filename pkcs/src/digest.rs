//! Message digests identified by their AlgorithmIdentifier OIDs.
//!
//! Used for the messageDigest check of signed attributes and for the
//! message imprint sent to a time stamping authority.

use std::fmt;

use digest::Digest;
use shirushi_asn1::ObjectIdentifier;

use crate::x509::AlgorithmIdentifier;

pub const SHA1: &str = "1.3.14.3.2.26";
pub const SHA224: &str = "2.16.840.1.101.3.4.2.4";
pub const SHA256: &str = "2.16.840.1.101.3.4.2.1";
pub const SHA384: &str = "2.16.840.1.101.3.4.2.2";
pub const SHA512: &str = "2.16.840.1.101.3.4.2.3";

/// Signature algorithm OIDs and the digest each one hashes with.
const SIGNATURE_DIGESTS: &[(&str, DigestAlgorithm)] = &[
    ("1.2.840.113549.1.1.5", DigestAlgorithm::Sha1),
    ("1.2.840.113549.1.1.14", DigestAlgorithm::Sha224),
    ("1.2.840.113549.1.1.11", DigestAlgorithm::Sha256),
    ("1.2.840.113549.1.1.12", DigestAlgorithm::Sha384),
    ("1.2.840.113549.1.1.13", DigestAlgorithm::Sha512),
    ("1.2.840.10045.4.1", DigestAlgorithm::Sha1),
    ("1.2.840.10045.4.3.1", DigestAlgorithm::Sha224),
    ("1.2.840.10045.4.3.2", DigestAlgorithm::Sha256),
    ("1.2.840.10045.4.3.3", DigestAlgorithm::Sha384),
    ("1.2.840.10045.4.3.4", DigestAlgorithm::Sha512),
    ("1.2.840.10040.4.3", DigestAlgorithm::Sha1),
    ("2.16.840.1.101.3.4.3.1", DigestAlgorithm::Sha224),
    ("2.16.840.1.101.3.4.3.2", DigestAlgorithm::Sha256),
    // Ed25519 signs with SHA-512 internally
    ("1.3.101.112", DigestAlgorithm::Sha512),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DigestAlgorithm {
    Sha1,
    Sha224,
    Sha256,
    Sha384,
    Sha512,
}

impl DigestAlgorithm {
    pub const ALL: [DigestAlgorithm; 5] = [
        DigestAlgorithm::Sha1,
        DigestAlgorithm::Sha224,
        DigestAlgorithm::Sha256,
        DigestAlgorithm::Sha384,
        DigestAlgorithm::Sha512,
    ];

    pub fn oid(&self) -> &'static str {
        match self {
            DigestAlgorithm::Sha1 => SHA1,
            DigestAlgorithm::Sha224 => SHA224,
            DigestAlgorithm::Sha256 => SHA256,
            DigestAlgorithm::Sha384 => SHA384,
            DigestAlgorithm::Sha512 => SHA512,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DigestAlgorithm::Sha1 => "SHA-1",
            DigestAlgorithm::Sha224 => "SHA-224",
            DigestAlgorithm::Sha256 => "SHA-256",
            DigestAlgorithm::Sha384 => "SHA-384",
            DigestAlgorithm::Sha512 => "SHA-512",
        }
    }

    pub fn output_len(&self) -> usize {
        match self {
            DigestAlgorithm::Sha1 => 20,
            DigestAlgorithm::Sha224 => 28,
            DigestAlgorithm::Sha256 => 32,
            DigestAlgorithm::Sha384 => 48,
            DigestAlgorithm::Sha512 => 64,
        }
    }

    pub fn from_oid(oid: &ObjectIdentifier) -> Option<Self> {
        Self::ALL.into_iter().find(|alg| *oid == alg.oid())
    }

    /// Accepts `SHA-256`, `SHA256` and `sha256` alike.
    pub fn from_name(name: &str) -> Option<Self> {
        let wanted: String = name
            .chars()
            .filter(|c| *c != '-')
            .collect::<String>()
            .to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|alg| alg.name().replace('-', "") == wanted)
    }

    /// Digest used by a combined signature algorithm such as
    /// sha256WithRSAEncryption or ecdsa-with-SHA384.
    pub fn for_signature_algorithm(oid: &ObjectIdentifier) -> Option<Self> {
        SIGNATURE_DIGESTS
            .iter()
            .find(|(sig, _)| *oid == *sig)
            .map(|(_, alg)| *alg)
    }

    /// AlgorithmIdentifier with absent parameters.
    pub fn algorithm_identifier(&self) -> AlgorithmIdentifier {
        AlgorithmIdentifier::new(self.object_identifier())
    }

    pub fn object_identifier(&self) -> ObjectIdentifier {
        let arcs: &[u64] = match self {
            DigestAlgorithm::Sha1 => &[1, 3, 14, 3, 2, 26],
            DigestAlgorithm::Sha224 => &[2, 16, 840, 1, 101, 3, 4, 2, 4],
            DigestAlgorithm::Sha256 => &[2, 16, 840, 1, 101, 3, 4, 2, 1],
            DigestAlgorithm::Sha384 => &[2, 16, 840, 1, 101, 3, 4, 2, 2],
            DigestAlgorithm::Sha512 => &[2, 16, 840, 1, 101, 3, 4, 2, 3],
        };
        match ObjectIdentifier::from_arcs(arcs) {
            Ok(oid) => oid,
            Err(_) => unreachable!("digest OIDs have a valid first arc pair"),
        }
    }

    pub fn digest(&self, data: &[u8]) -> Vec<u8> {
        match self {
            DigestAlgorithm::Sha1 => hash::<sha1::Sha1>(data),
            DigestAlgorithm::Sha224 => hash::<sha2::Sha224>(data),
            DigestAlgorithm::Sha256 => hash::<sha2::Sha256>(data),
            DigestAlgorithm::Sha384 => hash::<sha2::Sha384>(data),
            DigestAlgorithm::Sha512 => hash::<sha2::Sha512>(data),
        }
    }
}

fn hash<D: Digest>(data: &[u8]) -> Vec<u8> {
    D::digest(data).to_vec()
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;
    use rstest::rstest;

    use super::*;

    #[rstest(alg, expected,
        case(DigestAlgorithm::Sha1, hex!("a9993e364706816aba3e25717850c26c9cd0d89d").to_vec()),
        case(DigestAlgorithm::Sha256, hex!("ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad").to_vec()),
    )]
    fn test_digest_abc(alg: DigestAlgorithm, expected: Vec<u8>) {
        let out = alg.digest(b"abc");
        assert_eq!(alg.output_len(), out.len());
        assert_eq!(expected, out);
    }

    #[test]
    fn test_oid_round_trip() {
        for alg in DigestAlgorithm::ALL {
            let oid = alg.object_identifier();
            assert_eq!(alg.oid(), oid.to_string());
            assert_eq!(Some(alg), DigestAlgorithm::from_oid(&oid));
            assert_eq!(Some(alg), DigestAlgorithm::from_name(alg.name()));
        }
    }

    #[rstest(name, expected,
        case("sha256", Some(DigestAlgorithm::Sha256)),
        case("SHA-384", Some(DigestAlgorithm::Sha384)),
        case("SHA1", Some(DigestAlgorithm::Sha1)),
        case("MD5", None),
    )]
    fn test_from_name(name: &str, expected: Option<DigestAlgorithm>) {
        assert_eq!(expected, DigestAlgorithm::from_name(name));
    }

    #[rstest(sig, expected,
        case("1.2.840.113549.1.1.11", Some(DigestAlgorithm::Sha256)),
        case("1.2.840.10045.4.3.3", Some(DigestAlgorithm::Sha384)),
        case("1.3.101.112", Some(DigestAlgorithm::Sha512)),
        case("1.2.840.113549.1.1.1", None),
    )]
    fn test_for_signature_algorithm(sig: &str, expected: Option<DigestAlgorithm>) {
        let oid: ObjectIdentifier = sig.parse().unwrap();
        assert_eq!(expected, DigestAlgorithm::for_signature_algorithm(&oid));
    }
}
