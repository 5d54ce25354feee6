//! Fixture builders shared by the unit tests.

use chrono::{NaiveDate, NaiveDateTime};
use shirushi_asn1::{BitString, DerWriteExt, Integer, ObjectIdentifier};
use shirushi_der::{DerWriter, Tag};

use crate::digest::DigestAlgorithm;
use crate::pkcs7::{self, SignatureVerifier, SignerInfo};
use crate::pkcs9::AttributeSet;
use crate::x509::{AlgorithmIdentifier, Extension, Extensions, Name, SubjectPublicKeyInfo};

pub(crate) fn ed25519() -> ObjectIdentifier {
    "1.3.101.112".parse().unwrap()
}

pub(crate) fn jan_first_2024() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

fn signed(tbs: &DerWriter) -> Vec<u8> {
    let mut outer = DerWriter::new();
    outer.put_constructed(Tag::SEQUENCE, tbs);
    AlgorithmIdentifier::new(ed25519()).write(&mut outer);
    outer.put_bit_string(&BitString::from_bytes(vec![0x22; 64]));
    let mut out = DerWriter::new();
    out.put_constructed(Tag::SEQUENCE, &outer);
    out.into_bytes()
}

/// A v3 certificate with a fake signature; enough structure for lookups.
pub(crate) fn certificate_der(
    serial: i64,
    issuer: &str,
    subject: &str,
    extensions: &[Extension],
) -> Vec<u8> {
    let mut tbs = DerWriter::new();
    let mut version = DerWriter::new();
    version.put_small_integer(2);
    tbs.put_constructed(Tag::context(0), &version)
        .put_small_integer(serial);
    AlgorithmIdentifier::new(ed25519()).write(&mut tbs);
    tbs.put_raw(issuer.parse::<Name>().unwrap().encoded());
    let mut validity = DerWriter::new();
    validity
        .put_utc_time(&jan_first_2024())
        .put_generalized_time(&jan_first_2024());
    tbs.put_constructed(Tag::SEQUENCE, &validity)
        .put_raw(subject.parse::<Name>().unwrap().encoded())
        .put_raw(
            &SubjectPublicKeyInfo::new(
                AlgorithmIdentifier::new(ed25519()),
                BitString::from_bytes(vec![0x11; 32]),
            )
            .to_der(),
        );
    if !extensions.is_empty() {
        let mut explicit = DerWriter::new();
        explicit.put_raw(&Extensions::new(extensions.to_vec()).unwrap().to_der());
        tbs.put_constructed(Tag::context(3), &explicit);
    }
    signed(&tbs)
}

/// A v2 CRL revoking `serials`.
pub(crate) fn crl_der(issuer: &str, serials: &[i64]) -> Vec<u8> {
    let mut tbs = DerWriter::new();
    tbs.put_small_integer(1);
    AlgorithmIdentifier::new(ed25519()).write(&mut tbs);
    tbs.put_raw(issuer.parse::<Name>().unwrap().encoded())
        .put_utc_time(&jan_first_2024());
    if !serials.is_empty() {
        let mut entries = DerWriter::new();
        for serial in serials {
            let mut entry = DerWriter::new();
            entry
                .put_small_integer(*serial)
                .put_utc_time(&jan_first_2024());
            entries.put_constructed(Tag::SEQUENCE, &entry);
        }
        tbs.put_constructed(Tag::SEQUENCE, &entries);
    }
    signed(&tbs)
}

/// A SignerInfo with SHA-256 digest and an Ed25519 signature algorithm.
pub(crate) fn signer_info(
    issuer: &str,
    serial: i64,
    authenticated_attributes: Option<AttributeSet>,
    signature: Vec<u8>,
) -> SignerInfo {
    SignerInfo::new(
        issuer.parse().unwrap(),
        Integer::from(serial),
        DigestAlgorithm::Sha256.algorithm_identifier(),
        authenticated_attributes,
        AlgorithmIdentifier::new(ed25519()),
        signature,
        None,
    )
}

/// Accepts a signature equal to the digest of the signed bytes.
pub(crate) struct DigestVerifier;

impl SignatureVerifier for DigestVerifier {
    fn verify(
        &self,
        _signature_algorithm: &AlgorithmIdentifier,
        digest: DigestAlgorithm,
        _public_key: &SubjectPublicKeyInfo,
        data: &[u8],
        signature: &[u8],
    ) -> pkcs7::Result<bool> {
        Ok(digest.digest(data) == signature)
    }
}
