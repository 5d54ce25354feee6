//! Fixtures shared by the integration tests.

#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use shirushi_asn1::{BitString, DerWriteExt, Integer, ObjectIdentifier};
use shirushi_der::{DerWriter, Tag};
use shirushi_pkcs::digest::DigestAlgorithm;
use shirushi_pkcs::pkcs7::{self, ContentInfo, SignatureVerifier, SignedMessage, SignerInfo};
use shirushi_pkcs::tsp::{self, FailureInfo, PkiStatus, TimestampToken, Timestamper, TsRequest, TsResponse};
use shirushi_pkcs::x509::{
    AlgorithmIdentifier, Certificate, EXTENDED_KEY_USAGE, Extension, Extensions, KP_TIME_STAMPING,
    Name, SubjectPublicKeyInfo,
};

pub const ED25519: &str = "1.3.101.112";
pub const TSA_POLICY: &str = "1.2.3.4.5";
pub const KP_CODE_SIGNING: &str = "1.3.6.1.5.5.7.3.3";

pub fn oid(dotted: &str) -> ObjectIdentifier {
    dotted.parse().unwrap()
}

pub fn issued_at() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 6, 1)
        .unwrap()
        .and_hms_opt(12, 30, 0)
        .unwrap()
}

/// A v3 certificate with a placeholder signature.
pub fn certificate(serial: i64, issuer: &str, subject: &str, extensions: &[Extension]) -> Certificate {
    let mut tbs = DerWriter::new();
    let mut version = DerWriter::new();
    version.put_small_integer(2);
    tbs.put_constructed(Tag::context(0), &version)
        .put_small_integer(serial);
    AlgorithmIdentifier::new(oid(ED25519)).write(&mut tbs);
    tbs.put_raw(issuer.parse::<Name>().unwrap().encoded());
    let mut validity = DerWriter::new();
    validity
        .put_utc_time(&issued_at())
        .put_utc_time(&issued_at());
    tbs.put_constructed(Tag::SEQUENCE, &validity)
        .put_raw(subject.parse::<Name>().unwrap().encoded())
        .put_raw(
            &SubjectPublicKeyInfo::new(
                AlgorithmIdentifier::new(oid(ED25519)),
                BitString::from_bytes(vec![0x11; 32]),
            )
            .to_der(),
        );
    if !extensions.is_empty() {
        let mut explicit = DerWriter::new();
        explicit.put_raw(&Extensions::new(extensions.to_vec()).unwrap().to_der());
        tbs.put_constructed(Tag::context(3), &explicit);
    }

    let mut outer = DerWriter::new();
    outer.put_constructed(Tag::SEQUENCE, &tbs);
    AlgorithmIdentifier::new(oid(ED25519)).write(&mut outer);
    outer.put_bit_string(&BitString::from_bytes(vec![0x22; 64]));
    let mut der = DerWriter::new();
    der.put_constructed(Tag::SEQUENCE, &outer);
    Certificate::from_der(der.as_bytes()).unwrap()
}

/// ExtendedKeyUsage holding only id-kp-timeStamping.
pub fn time_stamping_eku(critical: bool) -> Extension {
    extended_key_usage(KP_TIME_STAMPING, critical)
}

pub fn extended_key_usage(purpose: &str, critical: bool) -> Extension {
    let mut purposes = DerWriter::new();
    purposes.put_oid(&oid(purpose));
    let mut value = DerWriter::new();
    value.put_constructed(Tag::SEQUENCE, &purposes);
    Extension::new(oid(EXTENDED_KEY_USAGE), critical, value.into_bytes())
}

/// Accepts a signature equal to the digest of the signed bytes.
pub struct DigestVerifier;

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

/// What the mock TSA gets wrong on purpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    None,
    Rejection,
    NoToken,
    Policy,
    HashAlgorithm,
    Imprint,
    DropNonce,
    Nonce,
    NoCertificate,
    NonCriticalEku,
    WrongPurpose,
    GrantedWithMods,
}

/// An in-process TSA answering with a SignedData over a TSTInfo.
pub struct MockTsa {
    pub certificate: Certificate,
    pub fault: Fault,
}

impl MockTsa {
    pub fn new(fault: Fault) -> Self {
        let eku = match fault {
            Fault::NonCriticalEku => time_stamping_eku(false),
            Fault::WrongPurpose => extended_key_usage(KP_CODE_SIGNING, true),
            _ => time_stamping_eku(true),
        };
        Self {
            certificate: certificate(42, "CN=Test Root", "CN=Test TSA", &[eku]),
            fault,
        }
    }

    fn token(&self, request: &TsRequest) -> Vec<u8> {
        let policy = match self.fault {
            Fault::Policy => oid("1.2.3.4.6"),
            _ => request
                .policy_id()
                .cloned()
                .unwrap_or_else(|| oid(TSA_POLICY)),
        };
        let hash_algorithm = match self.fault {
            Fault::HashAlgorithm => DigestAlgorithm::Sha1.algorithm_identifier(),
            _ => request.hash_algorithm().clone(),
        };
        let mut imprint = request.hashed_message().to_vec();
        if self.fault == Fault::Imprint {
            imprint[0] ^= 0xff;
        }
        let nonce = match self.fault {
            Fault::DropNonce => None,
            Fault::Nonce => Some(Integer::from(7i64)),
            _ => request.nonce().cloned(),
        };
        let tst_info = TimestampToken::new(
            policy,
            hash_algorithm,
            imprint,
            Integer::from(1001i64),
            issued_at(),
        )
        .with_nonce(nonce)
        .to_der();

        let mut octets = DerWriter::new();
        octets.put_octet_string(&tst_info);
        let content_info = ContentInfo::new(
            oid(pkcs7::TIMESTAMP_TOKEN_INFO),
            Some(octets.into_bytes()),
        );
        let signer = SignerInfo::new(
            self.certificate.issuer().clone(),
            self.certificate.serial_number().clone(),
            DigestAlgorithm::Sha256.algorithm_identifier(),
            None,
            AlgorithmIdentifier::new(oid(ED25519)),
            DigestAlgorithm::Sha256.digest(&tst_info),
            None,
        );
        let certificates = match self.fault {
            Fault::NoCertificate => None,
            _ => Some(vec![self.certificate.clone()]),
        };
        SignedMessage::new(
            vec![DigestAlgorithm::Sha256.algorithm_identifier()],
            content_info,
            certificates,
            None,
            vec![signer],
        )
        .encode_signed_data()
        .unwrap()
    }
}

impl Timestamper for MockTsa {
    fn generate_timestamp(&self, request: &TsRequest) -> tsp::Result<TsResponse> {
        assert!(request.cert_req());
        Ok(match self.fault {
            Fault::Rejection => TsResponse::new(
                PkiStatus::Rejection.code(),
                vec!["policy not served".to_string()],
                Some(FailureInfo::to_bit_string(&[FailureInfo::UnacceptedPolicy])),
                None,
            ),
            Fault::NoToken => TsResponse::new(PkiStatus::Granted.code(), Vec::new(), None, None),
            Fault::GrantedWithMods => TsResponse::new(
                PkiStatus::GrantedWithMods.code(),
                vec!["accuracy reduced".to_string()],
                None,
                Some(self.token(request)),
            ),
            _ => TsResponse::granted(self.token(request)),
        })
    }
}
