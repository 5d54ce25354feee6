//! Distinguished names.
//!
//! RFC 5280 Section 4.1.2.4
//!
//! ```asn1
//! Name ::= CHOICE { -- only one possibility for now --
//!     rdnSequence  RDNSequence
//! }
//!
//! RDNSequence ::= SEQUENCE OF RelativeDistinguishedName
//!
//! RelativeDistinguishedName ::= SET OF AttributeTypeAndValue
//!
//! AttributeTypeAndValue ::= SEQUENCE {
//!     type     AttributeType,
//!     value    AttributeValue
//! }
//! ```

use std::fmt;
use std::str::FromStr;

use shirushi_asn1::{DerReadExt, DerWriteExt, Element, ObjectIdentifier};
use shirushi_der::{DerReader, DerWriter, Tag};

use super::error::{Error, Result};

const KEYWORDS: &[(&str, &str)] = &[
    ("CN", "2.5.4.3"),
    ("SERIALNUMBER", "2.5.4.5"),
    ("C", "2.5.4.6"),
    ("L", "2.5.4.7"),
    ("ST", "2.5.4.8"),
    ("STREET", "2.5.4.9"),
    ("O", "2.5.4.10"),
    ("OU", "2.5.4.11"),
    ("EMAILADDRESS", "1.2.840.113549.1.9.1"),
    ("DC", "0.9.2342.19200300.100.1.25"),
];

fn keyword(oid: &ObjectIdentifier) -> Option<&'static str> {
    KEYWORDS
        .iter()
        .find(|(_, dotted)| *oid == *dotted)
        .map(|(k, _)| *k)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeTypeAndValue {
    attribute_type: ObjectIdentifier,
    value: Element,
    /// Encoding of `value` as it appeared on the wire.
    value_der: Vec<u8>,
}

impl AttributeTypeAndValue {
    pub fn new(attribute_type: ObjectIdentifier, value: Element) -> Result<Self> {
        let value_der = value.to_der()?;
        Ok(Self {
            attribute_type,
            value,
            value_der,
        })
    }

    pub fn attribute_type(&self) -> &ObjectIdentifier {
        &self.attribute_type
    }

    pub fn value(&self) -> &Element {
        &self.value
    }

    fn read(reader: &mut DerReader<'_>) -> Result<Self> {
        let mut seq = reader.read_sequence()?;
        let attribute_type = seq.read_oid()?;
        let value_der = seq.read_raw()?;
        seq.ensure_empty()?;
        Ok(Self {
            attribute_type,
            value: Element::from_der(value_der)?,
            value_der: value_der.to_vec(),
        })
    }

    fn encode(&self) -> Vec<u8> {
        let mut inner = DerWriter::new();
        inner.put_oid(&self.attribute_type).put_raw(&self.value_der);
        let mut writer = DerWriter::new();
        writer.put_constructed(Tag::SEQUENCE, &inner);
        writer.into_bytes()
    }

    /// `type=value` with string values lowercased and whitespace collapsed;
    /// other values as `#` and the hex of their encoding.
    fn canonical(&self) -> String {
        let value = match self.value.as_str() {
            Some(s) => s
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
                .to_lowercase(),
            None => format!("#{}", hex(&self.value_der)),
        };
        format!("{}={}", self.attribute_type, value)
    }
}

impl fmt::Display for AttributeTypeAndValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match keyword(&self.attribute_type) {
            Some(k) => write!(f, "{}=", k)?,
            None => write!(f, "{}=", self.attribute_type)?,
        }
        match self.value.as_str() {
            Some(s) => write!(f, "{}", s),
            None => write!(f, "#{}", hex(&self.value_der)),
        }
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// X.509 Distinguished Name
///
/// Keeps its original encoding; equality of the encoded form is exact
/// while [`Name::canonical`] gives the form used to match an issuer to a
/// certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Name {
    encoded: Vec<u8>,
    rdns: Vec<Vec<AttributeTypeAndValue>>,
}

impl Name {
    /// Builds a name from relative distinguished names in order.
    pub fn new(rdns: Vec<Vec<AttributeTypeAndValue>>) -> Self {
        let mut sequence = DerWriter::new();
        for rdn in &rdns {
            let members: Vec<Vec<u8>> = rdn.iter().map(AttributeTypeAndValue::encode).collect();
            sequence.put_ordered_set_of(Tag::SET, &members);
        }
        let mut writer = DerWriter::new();
        writer.put_constructed(Tag::SEQUENCE, &sequence);
        Self {
            encoded: writer.into_bytes(),
            rdns,
        }
    }

    pub fn read(reader: &mut DerReader<'_>) -> Result<Self> {
        Self::from_der(reader.read_raw()?)
    }

    pub fn from_der(bytes: &[u8]) -> Result<Self> {
        let mut reader = DerReader::new(bytes);
        let mut sequence = reader.read_sequence()?;
        reader.ensure_empty()?;
        let mut rdns = Vec::new();
        while !sequence.is_empty() {
            let members = sequence.read_set_of(1, false)?;
            let rdn = members
                .into_iter()
                .map(|m| AttributeTypeAndValue::read(&mut DerReader::new(m)))
                .collect::<Result<Vec<_>>>()?;
            rdns.push(rdn);
        }
        Ok(Self {
            encoded: bytes.to_vec(),
            rdns,
        })
    }

    pub fn encoded(&self) -> &[u8] {
        &self.encoded
    }

    pub fn rdns(&self) -> &[Vec<AttributeTypeAndValue>] {
        &self.rdns
    }

    pub fn is_empty(&self) -> bool {
        self.rdns.is_empty()
    }

    /// Comparison form: RDNs in order joined by `,`, the members of a
    /// multi-valued RDN sorted and joined by `+`.
    pub fn canonical(&self) -> String {
        self.rdns
            .iter()
            .map(|rdn| {
                let mut members: Vec<String> =
                    rdn.iter().map(AttributeTypeAndValue::canonical).collect();
                members.sort();
                members.join("+")
            })
            .collect::<Vec<_>>()
            .join(",")
    }

    pub fn canonical_eq(&self, other: &Name) -> bool {
        self.encoded == other.encoded || self.canonical() == other.canonical()
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let formatted = self
            .rdns
            .iter()
            .map(|rdn| {
                rdn.iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("+")
            })
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "{}", formatted)
    }
}

/// Parses `CN=Example, O=Org` style names: one attribute per RDN, no
/// escaping. `C` is written as PrintableString, everything else as
/// UTF8String.
impl FromStr for Name {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut rdns = Vec::new();
        for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (key, value) = part
                .split_once('=')
                .ok_or_else(|| Error::InvalidName(part.to_string()))?;
            let key = key.trim();
            let oid: ObjectIdentifier = match KEYWORDS
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(key))
            {
                Some((_, dotted)) => dotted.parse()?,
                None => key
                    .parse()
                    .map_err(|_| Error::InvalidName(part.to_string()))?,
            };
            let value = value.trim().to_string();
            let element = match oid == "2.5.4.6" {
                true => Element::PrintableString(value),
                false => Element::UTF8String(value),
            };
            rdns.push(vec![AttributeTypeAndValue::new(oid, element)?]);
        }
        Ok(Name::new(rdns))
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn test_name_round_trip() {
        let name: Name = "CN=Test Signer, O=Example, C=JP".parse().unwrap();
        assert_eq!(3, name.rdns().len());
        let decoded = Name::from_der(name.encoded()).unwrap();
        assert_eq!(name, decoded);
        assert_eq!("CN=Test Signer, O=Example, C=JP", decoded.to_string());
    }

    #[rstest(a, b, equal,
        case("CN=Test  Signer, O=Example", "cn=test signer,o=EXAMPLE", true),
        case("CN=Test Signer", "CN=Other Signer", false),
        case("CN=A, O=B", "O=B, CN=A", false),
    )]
    fn test_canonical_eq(a: &str, b: &str, equal: bool) {
        let a: Name = a.parse().unwrap();
        let b: Name = b.parse().unwrap();
        assert_eq!(equal, a.canonical_eq(&b));
    }

    #[test]
    fn test_canonical_ignores_string_type() {
        let oid: ObjectIdentifier = "2.5.4.3".parse().unwrap();
        let printable = Name::new(vec![vec![
            AttributeTypeAndValue::new(oid.clone(), Element::PrintableString("TSA".into())).unwrap(),
        ]]);
        let utf8 = Name::new(vec![vec![
            AttributeTypeAndValue::new(oid, Element::UTF8String("tsa".into())).unwrap(),
        ]]);
        assert_ne!(printable.encoded(), utf8.encoded());
        assert!(printable.canonical_eq(&utf8));
        assert_eq!("2.5.4.3=tsa", printable.canonical());
    }

    #[test]
    fn test_empty_name() {
        let name = Name::from_der(&[0x30, 0x00]).unwrap();
        assert!(name.is_empty());
        assert_eq!("", name.canonical());
    }

    #[rstest(input,
        case("CN"),
        case("X=1"),
    )]
    fn test_from_str_rejects(input: &str) {
        assert!(input.parse::<Name>().is_err());
    }
}
