//! # shirushi-asn1
//!
//! Typed ASN.1 values for the shirushi workspace.
//!
//! Two styles of access are offered. [`Element`] is a generic tree decoded
//! from a [`Tlv`], handy for values whose shape varies (attribute values,
//! name components). The [`DerReadExt`] and [`DerWriteExt`] extension traits
//! read and write typed primitives directly on a
//! [`shirushi_der::DerReader`] or [`shirushi_der::DerWriter`], which is how
//! the PKCS structures walk their fixed layouts.

use std::fmt::Display;

use chrono::NaiveDateTime;
use shirushi::encoder::{EncodableTo, Encoder};
use shirushi_der::{PrimitiveTag, Tag, Tlv};

mod bit_string;
pub mod error;
mod ext;
mod integer;
mod octet_string;
mod oid;
mod string;
pub mod time;

pub use bit_string::BitString;
pub use error::{Error, Result};
pub use ext::{DerReadExt, DerWriteExt};
pub use integer::Integer;
pub use octet_string::OctetString;
pub use oid::{AsOid, ObjectIdentifier};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Element {
    Boolean(bool),
    Integer(Integer),
    BitString(BitString),
    OctetString(OctetString),
    Null,
    ObjectIdentifier(ObjectIdentifier),
    UTF8String(String),
    Sequence(Vec<Element>),
    Set(Vec<Element>),
    PrintableString(String),
    T61String(String),
    IA5String(String),
    UTCTime(NaiveDateTime),
    GeneralizedTime(NaiveDateTime),
    UniversalString(String),
    BMPString(String),
    /// EXPLICIT tagging keeps the inner element; IMPLICIT primitive values
    /// carry their content as an `OctetString`.
    ContextSpecific {
        slot: u8,
        constructed: bool,
        element: Box<Element>,
    },
    /// Anything else, kept as the raw TLV so it re-encodes unchanged.
    Unimplemented(Tlv),
}

impl Element {
    /// Decodes exactly one element from `bytes`.
    pub fn from_der(bytes: &[u8]) -> Result<Element> {
        let mut reader = shirushi_der::DerReader::new(bytes);
        let element = reader.read_element()?;
        reader.ensure_empty()?;
        Ok(element)
    }

    pub fn to_der(&self) -> Result<Vec<u8>> {
        Tlv::try_from(self).map(|tlv| tlv.to_der())
    }

    /// Text of any of the character string types.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Element::UTF8String(s)
            | Element::PrintableString(s)
            | Element::T61String(s)
            | Element::IA5String(s)
            | Element::UniversalString(s)
            | Element::BMPString(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_oid(&self) -> Option<&ObjectIdentifier> {
        match self {
            Element::ObjectIdentifier(oid) => Some(oid),
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Element::Boolean(_) => "BOOLEAN",
            Element::Integer(_) => "INTEGER",
            Element::BitString(_) => "BIT STRING",
            Element::OctetString(_) => "OCTET STRING",
            Element::Null => "NULL",
            Element::ObjectIdentifier(_) => "OBJECT IDENTIFIER",
            Element::UTF8String(_) => "UTF8String",
            Element::Sequence(_) => "SEQUENCE",
            Element::Set(_) => "SET",
            Element::PrintableString(_) => "PrintableString",
            Element::T61String(_) => "T61String",
            Element::IA5String(_) => "IA5String",
            Element::UTCTime(_) => "UTCTime",
            Element::GeneralizedTime(_) => "GeneralizedTime",
            Element::UniversalString(_) => "UniversalString",
            Element::BMPString(_) => "BMPString",
            Element::ContextSpecific { .. } => "context-specific",
            Element::Unimplemented(_) => "unimplemented",
        }
    }
}

fn primitive_data<'a>(tlv: &'a Tlv, slot: &'static str) -> Result<&'a [u8]> {
    tlv.data().ok_or(Error::UnexpectedElement {
        expected: slot,
        actual: "constructed encoding".to_string(),
    })
}

fn children(tlv: &Tlv) -> Result<Vec<Element>> {
    tlv.tlvs()
        .unwrap_or_default()
        .iter()
        .map(Element::try_from)
        .collect()
}

impl TryFrom<&Tlv> for Element {
    type Error = Error;

    fn try_from(tlv: &Tlv) -> Result<Self> {
        match tlv.tag() {
            Tag::Primitive(primitive_tag, _) => match primitive_tag {
                PrimitiveTag::Boolean => match primitive_data(tlv, "BOOLEAN")? {
                    [0x00] => Ok(Element::Boolean(false)),
                    [_] => Ok(Element::Boolean(true)),
                    _ => Err(Error::InvalidBoolean),
                },
                PrimitiveTag::Integer => {
                    let data = primitive_data(tlv, "INTEGER")?;
                    if data.is_empty() {
                        return Err(Error::IntegerNoData);
                    }
                    Ok(Element::Integer(Integer::from(data)))
                }
                PrimitiveTag::BitString => Ok(Element::BitString(BitString::try_from(
                    primitive_data(tlv, "BIT STRING")?,
                )?)),
                PrimitiveTag::OctetString => match tlv.data() {
                    Some(data) => Ok(Element::OctetString(OctetString::from(data))),
                    // BER constructed OCTET STRING: concatenate the segments
                    None => Ok(Element::OctetString(OctetString::from(
                        tlv.tlvs()
                            .unwrap_or_default()
                            .iter()
                            .flat_map(|t| t.data().unwrap_or_default().to_vec())
                            .collect::<Vec<u8>>(),
                    ))),
                },
                PrimitiveTag::Null => match primitive_data(tlv, "NULL")? {
                    [] => Ok(Element::Null),
                    _ => Err(Error::InvalidNull),
                },
                PrimitiveTag::ObjectIdentifier => Ok(Element::ObjectIdentifier(
                    ObjectIdentifier::try_from(primitive_data(tlv, "OBJECT IDENTIFIER")?)?,
                )),
                PrimitiveTag::UTF8String => Ok(Element::UTF8String(string::decode_utf8(
                    primitive_data(tlv, "UTF8String")?,
                )?)),
                PrimitiveTag::PrintableString => Ok(Element::PrintableString(
                    string::decode_printable(primitive_data(tlv, "PrintableString")?)?,
                )),
                PrimitiveTag::T61String => Ok(Element::T61String(string::decode_t61(
                    primitive_data(tlv, "T61String")?,
                ))),
                PrimitiveTag::IA5String => Ok(Element::IA5String(string::decode_ia5(
                    primitive_data(tlv, "IA5String")?,
                )?)),
                PrimitiveTag::UniversalString => Ok(Element::UniversalString(
                    string::decode_universal(primitive_data(tlv, "UniversalString")?)?,
                )),
                PrimitiveTag::BMPString => Ok(Element::BMPString(string::decode_bmp(
                    primitive_data(tlv, "BMPString")?,
                )?)),
                PrimitiveTag::UTCTime => Ok(Element::UTCTime(time::parse_utc_time(
                    primitive_data(tlv, "UTCTime")?,
                )?)),
                PrimitiveTag::GeneralizedTime => Ok(Element::GeneralizedTime(
                    time::parse_generalized_time(primitive_data(tlv, "GeneralizedTime")?)?,
                )),
                PrimitiveTag::Sequence if tlv.tag().is_constructed() => {
                    Ok(Element::Sequence(children(tlv)?))
                }
                PrimitiveTag::Set if tlv.tag().is_constructed() => {
                    Ok(Element::Set(children(tlv)?))
                }
                _ => Ok(Element::Unimplemented(tlv.clone())),
            },
            Tag::ContextSpecific { slot, constructed } => match (constructed, tlv.value()) {
                (false, shirushi_der::Value::Data(data)) => Ok(Element::ContextSpecific {
                    slot: *slot,
                    constructed: false,
                    element: Box::new(Element::OctetString(OctetString::from(data.as_slice()))),
                }),
                (true, shirushi_der::Value::Tlvs(tlvs)) if tlvs.len() == 1 => {
                    Ok(Element::ContextSpecific {
                        slot: *slot,
                        constructed: true,
                        element: Box::new(Element::try_from(&tlvs[0])?),
                    })
                }
                // IMPLICIT SEQUENCE OF / SET OF and friends
                _ => Ok(Element::Unimplemented(tlv.clone())),
            },
            Tag::Other(_) => Ok(Element::Unimplemented(tlv.clone())),
        }
    }
}

impl TryFrom<&Element> for Tlv {
    type Error = Error;

    fn try_from(element: &Element) -> Result<Self> {
        let tlv = match element {
            Element::Boolean(b) => {
                Tlv::new_primitive(Tag::BOOLEAN, vec![if *b { 0xff } else { 0x00 }])
            }
            Element::Integer(i) => Tlv::new_primitive(Tag::INTEGER, i.to_der_content()),
            Element::BitString(bs) => Tlv::new_primitive(Tag::BIT_STRING, bs.to_der_content()),
            Element::OctetString(os) => {
                Tlv::new_primitive(Tag::OCTET_STRING, os.as_bytes().to_vec())
            }
            Element::Null => Tlv::new_primitive(Tag::NULL, vec![]),
            Element::ObjectIdentifier(oid) => {
                Tlv::new_primitive(Tag::OBJECT_IDENTIFIER, oid.to_der_content())
            }
            Element::UTF8String(s) => Tlv::new_primitive(Tag::UTF8_STRING, s.as_bytes().to_vec()),
            Element::PrintableString(s) => {
                Tlv::new_primitive(Tag::PRINTABLE_STRING, s.as_bytes().to_vec())
            }
            Element::T61String(s) => Tlv::new_primitive(Tag::T61_STRING, string::encode_t61(s)),
            Element::IA5String(s) => Tlv::new_primitive(Tag::IA5_STRING, s.as_bytes().to_vec()),
            Element::UniversalString(s) => {
                Tlv::new_primitive(Tag::UNIVERSAL_STRING, string::encode_universal(s))
            }
            Element::BMPString(s) => Tlv::new_primitive(Tag::BMP_STRING, string::encode_bmp(s)?),
            Element::UTCTime(dt) => {
                Tlv::new_primitive(Tag::UTC_TIME, time::format_utc_time(dt).into_bytes())
            }
            Element::GeneralizedTime(dt) => Tlv::new_primitive(
                Tag::GENERALIZED_TIME,
                time::format_generalized_time(dt).into_bytes(),
            ),
            Element::Sequence(elements) => Tlv::new_constructed(
                Tag::SEQUENCE,
                elements
                    .iter()
                    .map(Tlv::try_from)
                    .collect::<Result<Vec<_>>>()?,
            ),
            Element::Set(elements) => {
                let mut tlvs = elements
                    .iter()
                    .map(Tlv::try_from)
                    .collect::<Result<Vec<_>>>()?;
                // DER orders SET OF members by encoding
                tlvs.sort_by_cached_key(Tlv::to_der);
                Tlv::new_constructed(Tag::SET, tlvs)
            }
            Element::ContextSpecific {
                slot,
                constructed,
                element,
            } => {
                let tag = Tag::ContextSpecific {
                    slot: *slot,
                    constructed: *constructed,
                };
                let inner = Tlv::try_from(element.as_ref())?;
                if *constructed {
                    Tlv::new_constructed(tag, vec![inner])
                } else {
                    match inner.data() {
                        Some(data) => Tlv::new_primitive(tag, data.to_vec()),
                        None => {
                            return Err(Error::InvalidContextSpecific {
                                slot: *slot,
                                msg: "IMPLICIT tagging requires primitive inner element"
                                    .to_string(),
                            });
                        }
                    }
                }
            }
            Element::Unimplemented(tlv) => tlv.clone(),
        };
        Ok(tlv)
    }
}

impl EncodableTo<Element> for Tlv {}

impl Encoder<Element, Tlv> for Element {
    type Error = Error;

    fn encode(&self) -> Result<Tlv> {
        Tlv::try_from(self)
    }
}

impl Display for Element {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Element::Boolean(b) => write!(f, "{}", b),
            Element::Integer(i) => write!(f, "{}", i),
            Element::BitString(bs) => write!(f, "{}", bs),
            Element::OctetString(os) => write!(f, "{}", os),
            Element::Null => write!(f, "NULL"),
            Element::ObjectIdentifier(oid) => write!(f, "{}", oid),
            Element::UTF8String(s)
            | Element::PrintableString(s)
            | Element::T61String(s)
            | Element::IA5String(s)
            | Element::UniversalString(s)
            | Element::BMPString(s) => write!(f, "{}", s),
            Element::UTCTime(dt) | Element::GeneralizedTime(dt) => write!(f, "{} UTC", dt),
            Element::Sequence(items) | Element::Set(items) => {
                let parts = items.iter().map(ToString::to_string).collect::<Vec<_>>();
                write!(f, "{{{}}}", parts.join(", "))
            }
            Element::ContextSpecific { slot, element, .. } => write!(f, "[{}] {}", slot, element),
            Element::Unimplemented(tlv) => write!(f, "<tag {}>", tlv.tag()),
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest(input, expected,
        case(vec![0x01, 0x01, 0xff], Element::Boolean(true)),
        case(vec![0x02, 0x01, 0x2a], Element::Integer(Integer::from(42i64))),
        case(vec![0x05, 0x00], Element::Null),
        case(vec![0x16, 0x02, 0x68, 0x69], Element::IA5String("hi".to_string())),
        case(vec![0x1e, 0x04, 0x00, 0x68, 0x00, 0x69], Element::BMPString("hi".to_string())),
        case(vec![0x14, 0x02, 0x68, 0x69], Element::T61String("hi".to_string())),
        case(vec![0x0c, 0x04, 0xf0, 0x9f, 0x98, 0x8e], Element::UTF8String("\u{1F60E}".to_string())),
        case(
            vec![0x30, 0x06, 0x02, 0x01, 0x01, 0x01, 0x01, 0x00],
            Element::Sequence(vec![Element::Integer(Integer::from(1i64)), Element::Boolean(false)])
        ),
        case(
            vec![0xa0, 0x03, 0x02, 0x01, 0x02],
            Element::ContextSpecific { slot: 0, constructed: true, element: Box::new(Element::Integer(Integer::from(2i64))) }
        ),
        case(
            vec![0x80, 0x02, 0xca, 0xfe],
            Element::ContextSpecific { slot: 0, constructed: false, element: Box::new(Element::OctetString(OctetString::from(vec![0xca, 0xfe]))) }
        ),
    )]
    fn test_element_round_trip(input: Vec<u8>, expected: Element) {
        let element = Element::from_der(&input).unwrap();
        assert_eq!(expected, element);
        assert_eq!(input, element.to_der().unwrap());
    }

    #[test]
    fn test_unimplemented_is_kept() {
        // [1] IMPLICIT SET OF with two members
        let input = vec![0xa1, 0x06, 0x02, 0x01, 0x01, 0x02, 0x01, 0x02];
        let element = Element::from_der(&input).unwrap();
        assert!(matches!(element, Element::Unimplemented(_)));
        assert_eq!(input, element.to_der().unwrap());
    }

    #[test]
    fn test_set_is_sorted_on_encode() {
        let set = Element::Set(vec![
            Element::Integer(Integer::from(2i64)),
            Element::Integer(Integer::from(1i64)),
        ]);
        assert_eq!(
            vec![0x31, 0x06, 0x02, 0x01, 0x01, 0x02, 0x01, 0x02],
            set.to_der().unwrap()
        );
    }

    #[rstest(input,
        case(vec![0x01, 0x02, 0x00, 0x00]),
        case(vec![0x05, 0x01, 0x00]),
        case(vec![0x02, 0x00]),
        case(vec![0x13, 0x01, 0x3b]),
    )]
    fn test_element_rejects(input: Vec<u8>) {
        assert!(Element::from_der(&input).is_err());
    }
}
