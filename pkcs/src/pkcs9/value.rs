//! Attribute values and the codecs the registry points at.

use std::fmt;

use chrono::{DateTime, Utc};
use shirushi_asn1::{DerReadExt, Element, Integer, ObjectIdentifier, time};
use shirushi_der::{DerReader, Tag};

use super::error::{Error, Result};
use crate::digest::DigestAlgorithm;
use crate::pkcs7::SignerInfo;
use crate::x509::{AlgorithmIdentifier, Certificate, Extensions, Name};

/// The kind of value an attribute carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    String,
    Oid,
    Bytes,
    Time,
    SignerInfo,
    Extensions,
    SigningCertificate,
    Der,
}

impl ValueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::String => "string",
            ValueKind::Oid => "object identifier",
            ValueKind::Bytes => "byte string",
            ValueKind::Time => "time",
            ValueKind::SignerInfo => "signer info",
            ValueKind::Extensions => "extensions",
            ValueKind::SigningCertificate => "signing certificate",
            ValueKind::Der => "DER encoded",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One decoded attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Oid(ObjectIdentifier),
    Bytes(Vec<u8>),
    Time(DateTime<Utc>),
    SignerInfo(Box<SignerInfo>),
    Extensions(Extensions),
    SigningCertificate(SigningCertificateInfo),
    /// A complete DER element kept as is.
    Der(Vec<u8>),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::String(_) => ValueKind::String,
            Value::Oid(_) => ValueKind::Oid,
            Value::Bytes(_) => ValueKind::Bytes,
            Value::Time(_) => ValueKind::Time,
            Value::SignerInfo(_) => ValueKind::SignerInfo,
            Value::Extensions(_) => ValueKind::Extensions,
            Value::SigningCertificate(_) => ValueKind::SigningCertificate,
            Value::Der(_) => ValueKind::Der,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_oid(&self) -> Option<&ObjectIdentifier> {
        match self {
            Value::Oid(oid) => Some(oid),
            _ => None,
        }
    }

    /// Bytes of a byte string or of a kept DER element.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) | Value::Der(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_time(&self) -> Option<&DateTime<Utc>> {
        match self {
            Value::Time(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_signer_info(&self) -> Option<&SignerInfo> {
        match self {
            Value::SignerInfo(si) => Some(si),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{}", s),
            Value::Oid(oid) => write!(f, "{}", oid),
            Value::Bytes(b) | Value::Der(b) => write!(f, "{}", hex_dump(b)),
            Value::Time(t) => write!(f, "{}", t.format("%a %b %d %H:%M:%S UTC %Y")),
            Value::SignerInfo(si) => write!(f, "{}", si),
            Value::Extensions(ext) => write!(f, "{}", ext),
            Value::SigningCertificate(info) => write!(f, "{}", info),
        }
    }
}

/// Sixteen bytes per line, hex pairs separated by spaces.
pub(crate) fn hex_dump(bytes: &[u8]) -> String {
    bytes
        .chunks(16)
        .map(|line| {
            line.iter()
                .map(|b| format!("{:02x}", b))
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn mismatch(expected: ValueKind, actual: &Value) -> Error {
    Error::MalformedAttribute(format!(
        "expected a {} value, got a {} value",
        expected,
        actual.kind()
    ))
}

pub(super) fn decode_string(der: &[u8]) -> Result<Value> {
    let element = Element::from_der(der)?;
    match element.as_str() {
        Some(s) => Ok(Value::String(s.to_string())),
        None => Err(Error::MalformedAttribute(format!(
            "expected a character string, got {}",
            element.kind()
        ))),
    }
}

/// IA5String, or UTF8String when the text is not ASCII.
pub(super) fn encode_ia5_string(value: &Value) -> Result<Vec<u8>> {
    let s = value.as_str().ok_or_else(|| mismatch(ValueKind::String, value))?;
    let element = match s.is_ascii() {
        true => Element::IA5String(s.to_string()),
        false => Element::UTF8String(s.to_string()),
    };
    Ok(element.to_der()?)
}

fn is_printable(s: &str) -> bool {
    s.chars()
        .all(|c| c.is_ascii_alphanumeric() || " '()+,-./:=?".contains(c))
}

/// PrintableString, or UTF8String when the text has other characters.
pub(super) fn encode_printable_string(value: &Value) -> Result<Vec<u8>> {
    let s = value.as_str().ok_or_else(|| mismatch(ValueKind::String, value))?;
    let element = match is_printable(s) {
        true => Element::PrintableString(s.to_string()),
        false => Element::UTF8String(s.to_string()),
    };
    Ok(element.to_der()?)
}

pub(super) fn encode_bmp_string(value: &Value) -> Result<Vec<u8>> {
    let s = value.as_str().ok_or_else(|| mismatch(ValueKind::String, value))?;
    Ok(Element::BMPString(s.to_string()).to_der()?)
}

pub(super) fn decode_oid(der: &[u8]) -> Result<Value> {
    let mut reader = DerReader::new(der);
    let oid = reader.read_oid()?;
    reader.ensure_empty()?;
    Ok(Value::Oid(oid))
}

pub(super) fn encode_oid(value: &Value) -> Result<Vec<u8>> {
    let oid = value.as_oid().ok_or_else(|| mismatch(ValueKind::Oid, value))?;
    Ok(Element::ObjectIdentifier(oid.clone()).to_der()?)
}

pub(super) fn decode_octets(der: &[u8]) -> Result<Value> {
    let mut reader = DerReader::new(der);
    let octets = reader.read_octet_string()?;
    reader.ensure_empty()?;
    Ok(Value::Bytes(octets.into_bytes()))
}

pub(super) fn encode_octets(value: &Value) -> Result<Vec<u8>> {
    match value {
        Value::Bytes(b) => Ok(Element::OctetString(b.as_slice().into()).to_der()?),
        other => Err(mismatch(ValueKind::Bytes, other)),
    }
}

pub(super) fn decode_time(der: &[u8]) -> Result<Value> {
    let mut reader = DerReader::new(der);
    let time = reader.read_time()?;
    reader.ensure_empty()?;
    Ok(Value::Time(time.and_utc()))
}

/// UTCTime for 1950 through 2049, GeneralizedTime otherwise.
pub(super) fn encode_time(value: &Value) -> Result<Vec<u8>> {
    let time = value
        .as_time()
        .ok_or_else(|| mismatch(ValueKind::Time, value))?
        .naive_utc();
    let element = match time::fits_utc_time(&time) {
        true => Element::UTCTime(time),
        false => Element::GeneralizedTime(time),
    };
    Ok(element.to_der()?)
}

pub(super) fn decode_signer_info(der: &[u8]) -> Result<Value> {
    let signer = SignerInfo::from_der(der).map_err(|e| Error::Countersignature(Box::new(e)))?;
    Ok(Value::SignerInfo(Box::new(signer)))
}

pub(super) fn encode_signer_info(value: &Value) -> Result<Vec<u8>> {
    let signer = value
        .as_signer_info()
        .ok_or_else(|| mismatch(ValueKind::SignerInfo, value))?;
    signer
        .to_der()
        .map_err(|e| Error::Countersignature(Box::new(e)))
}

pub(super) fn decode_extensions(der: &[u8]) -> Result<Value> {
    Ok(Value::Extensions(Extensions::from_der(der)?))
}

pub(super) fn encode_extensions(value: &Value) -> Result<Vec<u8>> {
    match value {
        Value::Extensions(ext) => Ok(ext.to_der()),
        other => Err(mismatch(ValueKind::Extensions, other)),
    }
}

pub(super) fn decode_signing_certificate(der: &[u8]) -> Result<Value> {
    Ok(Value::SigningCertificate(SigningCertificateInfo::from_der(
        der,
    )?))
}

pub(super) fn encode_signing_certificate(value: &Value) -> Result<Vec<u8>> {
    match value {
        Value::SigningCertificate(info) => Ok(info.encoded().to_vec()),
        other => Err(mismatch(ValueKind::SigningCertificate, other)),
    }
}

pub(super) fn decode_der(der: &[u8]) -> Result<Value> {
    let mut reader = DerReader::new(der);
    reader.read_raw()?;
    reader.ensure_empty()?;
    Ok(Value::Der(der.to_vec()))
}

pub(super) fn encode_der(value: &Value) -> Result<Vec<u8>> {
    match value {
        Value::Der(der) => Ok(der.clone()),
        other => Err(mismatch(ValueKind::Der, other)),
    }
}

/*
RFC 2634 Section 5.4 / RFC 5035 Section 3

SigningCertificate ::=  SEQUENCE {
    certs        SEQUENCE OF ESSCertID,
    policies     SEQUENCE OF PolicyInformation OPTIONAL
}

SigningCertificateV2 ::=  SEQUENCE {
    certs        SEQUENCE OF ESSCertIDv2,
    policies     SEQUENCE OF PolicyInformation OPTIONAL
}

ESSCertID ::=  SEQUENCE {
    certHash                 Hash,
    issuerSerial             IssuerSerial OPTIONAL
}

ESSCertIDv2 ::=  SEQUENCE {
    hashAlgorithm           AlgorithmIdentifier DEFAULT {algorithm id-sha256},
    certHash                 Hash,
    issuerSerial             IssuerSerial OPTIONAL
}

IssuerSerial ::= SEQUENCE {
    issuer                   GeneralNames,
    serialNumber             CertificateSerialNumber
}
*/

/// One ESSCertID or ESSCertIDv2.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EssCertId {
    hash_algorithm: Option<AlgorithmIdentifier>,
    cert_hash: Vec<u8>,
    issuer: Option<Name>,
    serial_number: Option<Integer>,
}

impl EssCertId {
    fn read(reader: &mut DerReader<'_>) -> Result<Self> {
        let mut seq = reader.read_sequence()?;
        let hash_algorithm = match seq.peek_tag() {
            Some(Tag::SEQUENCE) => Some(AlgorithmIdentifier::read(&mut seq)?),
            _ => None,
        };
        let cert_hash = seq.read_octet_string()?.into_bytes();
        let (issuer, serial_number) = match seq.is_empty() {
            true => (None, None),
            false => {
                let mut issuer_serial = seq.read_sequence()?;
                let mut general_names = issuer_serial.read_sequence()?;
                let mut issuer = None;
                while !general_names.is_empty() {
                    let (tag, mut inner) = match general_names.peek_tag() {
                        // directoryName [4] EXPLICIT Name
                        Some(tag) if tag.is_context_specific(4) => general_names.read_constructed()?,
                        _ => {
                            general_names.read_raw()?;
                            continue;
                        }
                    };
                    if issuer.is_none() && tag.is_constructed() {
                        issuer = Some(Name::read(&mut inner)?);
                    }
                }
                (issuer, Some(issuer_serial.read_integer()?))
            }
        };
        seq.ensure_empty()?;
        Ok(Self {
            hash_algorithm,
            cert_hash,
            issuer,
            serial_number,
        })
    }

    /// The explicit hash algorithm; absent means SHA-1 in a
    /// SigningCertificate and SHA-256 in a SigningCertificateV2.
    pub fn hash_algorithm(&self) -> Option<&AlgorithmIdentifier> {
        self.hash_algorithm.as_ref()
    }

    pub fn cert_hash(&self) -> &[u8] {
        &self.cert_hash
    }

    pub fn issuer(&self) -> Option<&Name> {
        self.issuer.as_ref()
    }

    pub fn serial_number(&self) -> Option<&Integer> {
        self.serial_number.as_ref()
    }
}

/// SigningCertificate and SigningCertificateV2 values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningCertificateInfo {
    encoded: Vec<u8>,
    cert_ids: Vec<EssCertId>,
}

impl SigningCertificateInfo {
    pub fn from_der(der: &[u8]) -> Result<Self> {
        let mut reader = DerReader::new(der);
        let mut seq = reader.read_sequence()?;
        reader.ensure_empty()?;
        let mut certs = seq.read_sequence()?;
        let mut cert_ids = Vec::new();
        while !certs.is_empty() {
            cert_ids.push(EssCertId::read(&mut certs)?);
        }
        // policies are not interpreted
        if !seq.is_empty() {
            seq.read_sequence()?;
        }
        seq.ensure_empty()?;
        Ok(Self {
            encoded: der.to_vec(),
            cert_ids,
        })
    }

    pub fn encoded(&self) -> &[u8] {
        &self.encoded
    }

    pub fn cert_ids(&self) -> &[EssCertId] {
        &self.cert_ids
    }

    /// Whether the first ESSCertID names `certificate`. `default_hash`
    /// applies when the identifier carries no algorithm.
    pub fn identifies(&self, certificate: &Certificate, default_hash: DigestAlgorithm) -> bool {
        let Some(first) = self.cert_ids.first() else {
            return false;
        };
        let hash = match &first.hash_algorithm {
            Some(id) => match DigestAlgorithm::from_oid(id.algorithm()) {
                Some(alg) => alg,
                None => return false,
            },
            None => default_hash,
        };
        if hash.digest(certificate.encoded()) != first.cert_hash {
            return false;
        }
        match &first.serial_number {
            Some(serial) => serial == certificate.serial_number(),
            None => true,
        }
    }
}

impl fmt::Display for SigningCertificateInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[")?;
        for id in &self.cert_ids {
            write!(f, "  certHash: {}", hex_dump(&id.cert_hash))?;
            if let Some(issuer) = &id.issuer {
                write!(f, ", issuer: {}", issuer)?;
            }
            if let Some(serial) = &id.serial_number {
                write!(f, ", serialNumber: {:x}", serial)?;
            }
            writeln!(f)?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use hex_literal::hex;
    use rstest::rstest;
    use shirushi_asn1::DerWriteExt;
    use shirushi_der::DerWriter;

    use super::*;
    use crate::test_util::certificate_der;

    #[rstest(input, expected,
        case(hex!("160b61406578616d706c652e6a70").to_vec(), "a@example.jp"),
        case(hex!("1303414243").to_vec(), "ABC"),
        case(hex!("0c03e697a5").to_vec(), "日"),
        case(hex!("1e0400410042").to_vec(), "AB"),
    )]
    fn test_decode_string(input: Vec<u8>, expected: &str) {
        assert_eq!(Value::String(expected.to_string()), decode_string(&input).unwrap());
    }

    #[test]
    fn test_decode_string_rejects_non_string() {
        assert!(decode_string(&hex!("020101")).is_err());
    }

    #[rstest(input, expected_tag,
        case("plain", 0x16),
        case("日本", 0x0c),
    )]
    fn test_encode_ia5_string(input: &str, expected_tag: u8) {
        let der = encode_ia5_string(&Value::String(input.to_string())).unwrap();
        assert_eq!(expected_tag, der[0]);
        assert_eq!(Value::String(input.to_string()), decode_string(&der).unwrap());
    }

    #[rstest(input, expected_tag,
        case("Tokyo 1-2-3", 0x13),
        case("a@b", 0x0c),
    )]
    fn test_encode_printable_string(input: &str, expected_tag: u8) {
        let der = encode_printable_string(&Value::String(input.to_string())).unwrap();
        assert_eq!(expected_tag, der[0]);
    }

    #[rstest(time, expected_tag,
        case(Utc.with_ymd_and_hms(2024, 2, 29, 12, 0, 0).unwrap(), 0x17),
        case(Utc.with_ymd_and_hms(2050, 1, 1, 0, 0, 0).unwrap(), 0x18),
        case(Utc.with_ymd_and_hms(1949, 12, 31, 23, 59, 59).unwrap(), 0x18),
    )]
    fn test_time_codec(time: DateTime<Utc>, expected_tag: u8) {
        let der = encode_time(&Value::Time(time)).unwrap();
        assert_eq!(expected_tag, der[0]);
        assert_eq!(Value::Time(time), decode_time(&der).unwrap());
    }

    #[test]
    fn test_encode_rejects_wrong_kind() {
        assert!(encode_oid(&Value::Bytes(vec![1])).is_err());
        assert!(encode_time(&Value::String("now".into())).is_err());
        assert!(encode_der(&Value::Bytes(vec![1])).is_err());
    }

    #[test]
    fn test_octets_codec() {
        let der = encode_octets(&Value::Bytes(vec![1, 2, 3])).unwrap();
        assert_eq!(vec![0x04, 0x03, 1, 2, 3], der);
        assert_eq!(Value::Bytes(vec![1, 2, 3]), decode_octets(&der).unwrap());
    }

    #[test]
    fn test_hex_dump() {
        let bytes: Vec<u8> = (0..18).collect();
        let dump = hex_dump(&bytes);
        assert_eq!(2, dump.lines().count());
        assert!(dump.starts_with("00 01 02"));
        assert!(dump.ends_with("10 11"));
    }

    fn signing_certificate_v2(cert: &[u8], serial: i64) -> Vec<u8> {
        let mut issuer = DerWriter::new();
        issuer.put_raw("CN=Root CA".parse::<Name>().unwrap().encoded());
        let mut general_names = DerWriter::new();
        general_names.put_constructed(Tag::context(4), &issuer);
        let mut issuer_serial = DerWriter::new();
        issuer_serial
            .put_constructed(Tag::SEQUENCE, &general_names)
            .put_small_integer(serial);

        let mut id = DerWriter::new();
        id.put_octet_string(&DigestAlgorithm::Sha256.digest(cert))
            .put_constructed(Tag::SEQUENCE, &issuer_serial);
        let mut ids = DerWriter::new();
        ids.put_constructed(Tag::SEQUENCE, &id);
        let mut certs = DerWriter::new();
        certs.put_constructed(Tag::SEQUENCE, &ids);
        let mut out = DerWriter::new();
        out.put_constructed(Tag::SEQUENCE, &certs);
        out.into_bytes()
    }

    #[test]
    fn test_signing_certificate_v2() {
        let cert_der = certificate_der(42, "CN=Root CA", "CN=Signer", &[]);
        let cert = Certificate::from_der(&cert_der).unwrap();
        let der = signing_certificate_v2(&cert_der, 42);

        let info = SigningCertificateInfo::from_der(&der).unwrap();
        assert_eq!(1, info.cert_ids().len());
        let id = &info.cert_ids()[0];
        assert!(id.hash_algorithm().is_none());
        assert_eq!("CN=Root CA", id.issuer().unwrap().to_string());
        assert_eq!(Some(&Integer::from(42i64)), id.serial_number());
        assert!(info.identifies(&cert, DigestAlgorithm::Sha256));
        assert!(!info.identifies(&cert, DigestAlgorithm::Sha1));

        let value = decode_signing_certificate(&der).unwrap();
        assert_eq!(der, encode_signing_certificate(&value).unwrap());
        assert!(value.to_string().contains("serialNumber: 2a"));
    }
}
