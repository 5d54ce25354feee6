/*
RFC 5280 Section 4.1

Certificate  ::=  SEQUENCE  {
    tbsCertificate       TBSCertificate,
    signatureAlgorithm   AlgorithmIdentifier,
    signatureValue       BIT STRING  }

TBSCertificate  ::=  SEQUENCE  {
    version         [0]  EXPLICIT Version DEFAULT v1,
    serialNumber         CertificateSerialNumber,
    signature            AlgorithmIdentifier,
    issuer               Name,
    validity             Validity,
    subject              Name,
    subjectPublicKeyInfo SubjectPublicKeyInfo,
    issuerUniqueID  [1]  IMPLICIT UniqueIdentifier OPTIONAL,
    subjectUniqueID [2]  IMPLICIT UniqueIdentifier OPTIONAL,
    extensions      [3]  EXPLICIT Extensions OPTIONAL
    }

SubjectPublicKeyInfo  ::=  SEQUENCE  {
    algorithm            AlgorithmIdentifier,
    subjectPublicKey     BIT STRING  }
*/

use std::fmt;

use chrono::NaiveDateTime;
use shirushi::decoder::{DecodableFrom, Decoder};
use shirushi_asn1::{BitString, DerReadExt, DerWriteExt, Integer};
use shirushi_der::{DerReader, DerWriter, Tag};
use shirushi_pem::{FromPem, Label, Pem, ToPem};

use super::algorithm::AlgorithmIdentifier;
use super::error::{Error, Result};
use super::extension::{
    EXTENDED_KEY_USAGE, ExtendedKeyUsage, Extension, Extensions, KEY_USAGE, KeyUsage,
};
use super::name::Name;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectPublicKeyInfo {
    algorithm: AlgorithmIdentifier,
    public_key: BitString,
}

impl SubjectPublicKeyInfo {
    pub fn new(algorithm: AlgorithmIdentifier, public_key: BitString) -> Self {
        Self {
            algorithm,
            public_key,
        }
    }

    pub fn algorithm(&self) -> &AlgorithmIdentifier {
        &self.algorithm
    }

    pub fn public_key(&self) -> &BitString {
        &self.public_key
    }

    pub fn read(reader: &mut DerReader<'_>) -> Result<Self> {
        let mut seq = reader.read_sequence()?;
        let algorithm = AlgorithmIdentifier::read(&mut seq)?;
        let public_key = seq.read_bit_string()?;
        seq.ensure_empty()?;
        Ok(Self {
            algorithm,
            public_key,
        })
    }

    pub fn from_der(bytes: &[u8]) -> Result<Self> {
        let mut reader = DerReader::new(bytes);
        let info = Self::read(&mut reader)?;
        reader.ensure_empty()?;
        Ok(info)
    }

    pub fn to_der(&self) -> Vec<u8> {
        let mut inner = DerWriter::new();
        self.algorithm.write(&mut inner);
        inner.put_bit_string(&self.public_key);
        let mut writer = DerWriter::new();
        writer.put_constructed(Tag::SEQUENCE, &inner);
        writer.into_bytes()
    }
}

/// An X.509 certificate, decoded far enough to locate signers and check
/// their key usage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Certificate {
    encoded: Vec<u8>,
    tbs_certificate: Vec<u8>,
    version: u8,
    serial_number: Integer,
    issuer: Name,
    not_before: NaiveDateTime,
    not_after: NaiveDateTime,
    subject: Name,
    public_key_info: SubjectPublicKeyInfo,
    extensions: Extensions,
    signature_algorithm: AlgorithmIdentifier,
    signature: BitString,
}

impl Certificate {
    pub fn from_der(bytes: &[u8]) -> Result<Self> {
        let mut reader = DerReader::new(bytes);
        let mut certificate = reader.read_sequence()?;
        reader.ensure_empty()?;

        let tbs_certificate = certificate.read_raw()?;
        let signature_algorithm = AlgorithmIdentifier::read(&mut certificate)?;
        let signature = certificate.read_bit_string()?;
        certificate.ensure_empty()?;

        let mut tbs = DerReader::new(tbs_certificate).read_sequence()?;
        let version = match tbs.peek_tag() {
            Some(tag) if tag.is_context_specific(0) => {
                let (_, mut explicit) = tbs.read_constructed()?;
                let version = explicit.read_small_integer()?;
                explicit.ensure_empty()?;
                version
            }
            _ => 0,
        };
        if !(0..=2).contains(&version) {
            return Err(Error::UnsupportedVersion(version));
        }
        let serial_number = tbs.read_integer()?;
        // the inner signature field repeats signatureAlgorithm
        AlgorithmIdentifier::read(&mut tbs)?;
        let issuer = Name::read(&mut tbs)?;
        let mut validity = tbs.read_sequence()?;
        let not_before = validity.read_time()?;
        let not_after = validity.read_time()?;
        validity.ensure_empty()?;
        let subject = Name::read(&mut tbs)?;
        let public_key_info = SubjectPublicKeyInfo::read(&mut tbs)?;

        let mut extensions = Extensions::default();
        while let Some(tag) = tbs.peek_tag() {
            if tag.is_context_specific(3) {
                let (_, mut explicit) = tbs.read_constructed()?;
                extensions = Extensions::read(&mut explicit)?;
                explicit.ensure_empty()?;
            } else if tag.is_context_specific(1) || tag.is_context_specific(2) {
                tbs.read_raw()?;
            } else {
                return Err(shirushi_der::Error::UnexpectedTag {
                    expected: Tag::context(3).byte(),
                    actual: tag.byte(),
                }
                .into());
            }
        }

        Ok(Self {
            encoded: bytes.to_vec(),
            tbs_certificate: tbs_certificate.to_vec(),
            version: version as u8 + 1,
            serial_number,
            issuer,
            not_before,
            not_after,
            subject,
            public_key_info,
            extensions,
            signature_algorithm,
            signature,
        })
    }

    /// The DER the certificate was decoded from.
    pub fn encoded(&self) -> &[u8] {
        &self.encoded
    }

    /// The signed portion, for signature checks by the caller.
    pub fn tbs_certificate(&self) -> &[u8] {
        &self.tbs_certificate
    }

    /// 1, 2 or 3.
    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn serial_number(&self) -> &Integer {
        &self.serial_number
    }

    pub fn issuer(&self) -> &Name {
        &self.issuer
    }

    pub fn subject(&self) -> &Name {
        &self.subject
    }

    pub fn not_before(&self) -> &NaiveDateTime {
        &self.not_before
    }

    pub fn not_after(&self) -> &NaiveDateTime {
        &self.not_after
    }

    pub fn public_key_info(&self) -> &SubjectPublicKeyInfo {
        &self.public_key_info
    }

    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    pub fn extension(&self, oid: &str) -> Option<&Extension> {
        self.extensions.get(oid)
    }

    pub fn signature_algorithm(&self) -> &AlgorithmIdentifier {
        &self.signature_algorithm
    }

    pub fn signature(&self) -> &BitString {
        &self.signature
    }

    pub fn key_usage(&self) -> Result<Option<KeyUsage>> {
        self.extension(KEY_USAGE)
            .map(KeyUsage::from_extension)
            .transpose()
    }

    pub fn extended_key_usage(&self) -> Result<Option<ExtendedKeyUsage>> {
        self.extension(EXTENDED_KEY_USAGE)
            .map(ExtendedKeyUsage::from_extension)
            .transpose()
    }

    pub fn is_self_issued(&self) -> bool {
        self.issuer.canonical_eq(&self.subject)
    }
}

impl fmt::Display for Certificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[Subject: {}, Issuer: {}, Serial: {:x}]",
            self.subject, self.issuer, self.serial_number
        )
    }
}

impl DecodableFrom<Pem> for Certificate {}

impl Decoder<Pem, Certificate> for Pem {
    type Error = Error;

    fn decode(&self) -> Result<Certificate> {
        Certificate::from_pem(self)
    }
}

impl FromPem for Certificate {
    type Error = Error;

    fn from_pem(pem: &Pem) -> Result<Self> {
        let der = pem.clone().expect_label(&[Label::Certificate])?;
        Certificate::from_der(&der)
    }
}

impl ToPem for Certificate {
    type Error = Error;

    fn to_pem(&self) -> Result<Pem> {
        Ok(Pem::new(Label::Certificate, self.encoded.clone()))
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::test_util::certificate_der;

    #[test]
    fn test_certificate_fields() {
        let key_usage = Extension::new(KEY_USAGE.parse().unwrap(), true, vec![0x03, 0x02, 0x07, 0x80]);
        let der = certificate_der(0x1234, "CN=Root CA", "CN=Signer, O=Example", &[key_usage]);
        let cert = Certificate::from_der(&der).unwrap();
        assert_eq!(3, cert.version());
        assert_eq!(Integer::from(0x1234i64), *cert.serial_number());
        assert_eq!("CN=Root CA", cert.issuer().to_string());
        assert_eq!("CN=Signer, O=Example", cert.subject().to_string());
        assert!(!cert.is_self_issued());
        assert_eq!(der, cert.encoded());
        assert!(cert.key_usage().unwrap().unwrap().digital_signature());
        assert!(cert.extended_key_usage().unwrap().is_none());
        assert_eq!(32, cert.public_key_info().public_key().as_bytes().len());
    }

    #[test]
    fn test_certificate_pem() {
        let der = certificate_der(7, "CN=CA", "CN=CA", &[]);
        let cert = Certificate::from_der(&der).unwrap();
        assert!(cert.is_self_issued());
        let pem = cert.to_pem().unwrap();
        let back: Certificate = pem.decode().unwrap();
        assert_eq!(cert, back);
    }

    #[rstest(input,
        case(vec![0x30, 0x00]),
        case(vec![0x31, 0x00]),
        case(vec![]),
    )]
    fn test_certificate_rejects(input: Vec<u8>) {
        assert!(Certificate::from_der(&input).is_err());
    }
}
