/*
RFC 5280 Section 4.1

Extensions ::= SEQUENCE SIZE (1..MAX) OF Extension

Extension ::= SEQUENCE {
    extnID      OBJECT IDENTIFIER,
    critical    BOOLEAN DEFAULT FALSE,
    extnValue   OCTET STRING
}

KeyUsage ::= BIT STRING {
    digitalSignature        (0),
    nonRepudiation          (1),
    keyEncipherment         (2),
    dataEncipherment        (3),
    keyAgreement            (4),
    keyCertSign             (5),
    cRLSign                 (6),
    encipherOnly            (7),
    decipherOnly            (8)
}

ExtKeyUsageSyntax ::= SEQUENCE SIZE (1..MAX) OF KeyPurposeId
*/

use std::fmt;

use shirushi_asn1::{BitString, DerReadExt, DerWriteExt, ObjectIdentifier};
use shirushi_der::{DerReader, DerWriter, Tag};

use super::error::{Error, Result};

pub const KEY_USAGE: &str = "2.5.29.15";
pub const EXTENDED_KEY_USAGE: &str = "2.5.29.37";
/// id-kp-timeStamping
pub const KP_TIME_STAMPING: &str = "1.3.6.1.5.5.7.3.8";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extension {
    oid: ObjectIdentifier,
    critical: bool,
    value: Vec<u8>,
}

impl Extension {
    /// `value` is the content of extnValue, itself a DER encoding.
    pub fn new(oid: ObjectIdentifier, critical: bool, value: Vec<u8>) -> Self {
        Self {
            oid,
            critical,
            value,
        }
    }

    pub fn oid(&self) -> &ObjectIdentifier {
        &self.oid
    }

    pub fn is_critical(&self) -> bool {
        self.critical
    }

    pub fn value(&self) -> &[u8] {
        &self.value
    }

    fn read(reader: &mut DerReader<'_>) -> Result<Self> {
        let mut seq = reader.read_sequence()?;
        let oid = seq.read_oid()?;
        let critical = match seq.peek_tag() {
            Some(Tag::BOOLEAN) => seq.read_boolean()?,
            _ => false,
        };
        let value = seq.read_octet_string()?.into_bytes();
        seq.ensure_empty()?;
        Ok(Self {
            oid,
            critical,
            value,
        })
    }

    fn write(&self, writer: &mut DerWriter) {
        let mut inner = DerWriter::new();
        inner.put_oid(&self.oid);
        if self.critical {
            inner.put_boolean(true);
        }
        inner.put_octet_string(&self.value);
        writer.put_constructed(Tag::SEQUENCE, &inner);
    }
}

/// An ordered list of extensions with unique OIDs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extensions {
    extensions: Vec<Extension>,
}

impl Extensions {
    pub fn new(extensions: Vec<Extension>) -> Result<Self> {
        for (i, ext) in extensions.iter().enumerate() {
            if extensions[..i].iter().any(|e| e.oid == ext.oid) {
                return Err(Error::DuplicateExtension(ext.oid.to_string()));
            }
        }
        Ok(Self { extensions })
    }

    pub fn read(reader: &mut DerReader<'_>) -> Result<Self> {
        let mut seq = reader.read_sequence()?;
        let mut extensions = Vec::new();
        while !seq.is_empty() {
            extensions.push(Extension::read(&mut seq)?);
        }
        Self::new(extensions)
    }

    pub fn from_der(bytes: &[u8]) -> Result<Self> {
        let mut reader = DerReader::new(bytes);
        let extensions = Self::read(&mut reader)?;
        reader.ensure_empty()?;
        Ok(extensions)
    }

    pub fn to_der(&self) -> Vec<u8> {
        let mut inner = DerWriter::new();
        for ext in &self.extensions {
            ext.write(&mut inner);
        }
        let mut writer = DerWriter::new();
        writer.put_constructed(Tag::SEQUENCE, &inner);
        writer.into_bytes()
    }

    pub fn get(&self, oid: &str) -> Option<&Extension> {
        self.extensions.iter().find(|e| e.oid == oid)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Extension> {
        self.extensions.iter()
    }

    pub fn critical_oids(&self) -> impl Iterator<Item = &ObjectIdentifier> {
        self.extensions
            .iter()
            .filter(|e| e.critical)
            .map(|e| &e.oid)
    }

    pub fn len(&self) -> usize {
        self.extensions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }
}

impl fmt::Display for Extensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let formatted = self
            .extensions
            .iter()
            .map(|e| match e.critical {
                true => format!("{} (critical)", e.oid),
                false => e.oid.to_string(),
            })
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "[{}]", formatted)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyUsage(BitString);

impl KeyUsage {
    pub fn from_extension(ext: &Extension) -> Result<Self> {
        let mut reader = DerReader::new(ext.value());
        let bits = reader
            .read_bit_string()
            .map_err(|e| Error::InvalidExtension {
                name: "KeyUsage",
                reason: e.to_string(),
            })?;
        reader.ensure_empty()?;
        Ok(Self(bits))
    }

    pub fn digital_signature(&self) -> bool {
        self.0.bit(0)
    }

    pub fn non_repudiation(&self) -> bool {
        self.0.bit(1)
    }

    pub fn key_encipherment(&self) -> bool {
        self.0.bit(2)
    }

    pub fn key_cert_sign(&self) -> bool {
        self.0.bit(5)
    }

    pub fn crl_sign(&self) -> bool {
        self.0.bit(6)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtendedKeyUsage(Vec<ObjectIdentifier>);

impl ExtendedKeyUsage {
    pub fn from_extension(ext: &Extension) -> Result<Self> {
        let invalid = |reason: String| Error::InvalidExtension {
            name: "ExtendedKeyUsage",
            reason,
        };
        let mut reader = DerReader::new(ext.value());
        let mut seq = reader.read_sequence()?;
        reader.ensure_empty()?;
        let mut purposes = Vec::new();
        while !seq.is_empty() {
            purposes.push(seq.read_oid().map_err(|e| invalid(e.to_string()))?);
        }
        if purposes.is_empty() {
            return Err(invalid("no key purposes".to_string()));
        }
        Ok(Self(purposes))
    }

    pub fn purposes(&self) -> &[ObjectIdentifier] {
        &self.0
    }

    pub fn contains(&self, purpose: &str) -> bool {
        self.0.iter().any(|p| *p == purpose)
    }
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;
    use rstest::rstest;

    use super::*;

    #[rstest(value, digital_signature, non_repudiation,
        // digitalSignature only
        case(hex!("03020780").to_vec(), true, false),
        // nonRepudiation only
        case(hex!("03020640").to_vec(), false, true),
        // keyCertSign | cRLSign
        case(hex!("03020106").to_vec(), false, false),
    )]
    fn test_key_usage(value: Vec<u8>, digital_signature: bool, non_repudiation: bool) {
        let ext = Extension::new(KEY_USAGE.parse().unwrap(), true, value);
        let usage = KeyUsage::from_extension(&ext).unwrap();
        assert_eq!(digital_signature, usage.digital_signature());
        assert_eq!(non_repudiation, usage.non_repudiation());
    }

    #[test]
    fn test_extended_key_usage() {
        // SEQUENCE { id-kp-timeStamping }
        let value = hex!("300a06082b06010505070308").to_vec();
        let ext = Extension::new(EXTENDED_KEY_USAGE.parse().unwrap(), true, value);
        let eku = ExtendedKeyUsage::from_extension(&ext).unwrap();
        assert!(eku.contains(KP_TIME_STAMPING));
        assert!(!eku.contains("1.3.6.1.5.5.7.3.3"));
    }

    #[test]
    fn test_extensions_round_trip() {
        let extensions = Extensions::new(vec![
            Extension::new(KEY_USAGE.parse().unwrap(), true, hex!("03020780").to_vec()),
            Extension::new(
                EXTENDED_KEY_USAGE.parse().unwrap(),
                false,
                hex!("300a06082b06010505070308").to_vec(),
            ),
        ])
        .unwrap();
        let der = extensions.to_der();
        let decoded = Extensions::from_der(&der).unwrap();
        assert_eq!(extensions, decoded);
        assert_eq!(vec![&KEY_USAGE.parse::<ObjectIdentifier>().unwrap()], decoded.critical_oids().collect::<Vec<_>>());
        assert!(decoded.get(EXTENDED_KEY_USAGE).is_some());
    }

    #[test]
    fn test_duplicate_extension() {
        let ext = Extension::new(KEY_USAGE.parse().unwrap(), false, hex!("03020780").to_vec());
        assert!(matches!(
            Extensions::new(vec![ext.clone(), ext]),
            Err(Error::DuplicateExtension(_))
        ));
    }
}
