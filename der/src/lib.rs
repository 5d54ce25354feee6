//! # shirushi-der
//!
//! Tag-length-value layer of the workspace. [`Tlv::parse`] turns bytes into a
//! tree of TLVs (definite and indefinite lengths are both accepted),
//! [`DerReader`] walks an encoding without materialising it, and
//! [`DerWriter`] produces canonical DER.

use nom::{IResult, Parser};

pub mod error;
mod reader;
mod writer;

pub use error::{Error, Result};
pub use reader::DerReader;
pub use writer::{DerWriter, encode_length};

/// Bit marking a constructed encoding in the identifier octet.
pub const TAG_CONSTRUCTED: u8 = 0x20;
/// Class bits for context-specific tags.
pub const TAG_CONTEXT: u8 = 0x80;

const CLASS_MASK: u8 = 0xc0;
const NUMBER_MASK: u8 = 0x1f;

/// Universal tag numbers understood by the workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveTag {
    Boolean,
    Integer,
    BitString,
    OctetString,
    Null,
    ObjectIdentifier,
    UTF8String,
    Sequence,
    Set,
    PrintableString,
    T61String,
    IA5String,
    UTCTime,
    GeneralizedTime,
    UniversalString,
    BMPString,
    Unimplemented(u8),
}

impl From<u8> for PrimitiveTag {
    fn from(number: u8) -> Self {
        match number & NUMBER_MASK {
            0x01 => Self::Boolean,
            0x02 => Self::Integer,
            0x03 => Self::BitString,
            0x04 => Self::OctetString,
            0x05 => Self::Null,
            0x06 => Self::ObjectIdentifier,
            0x0c => Self::UTF8String,
            0x10 => Self::Sequence,
            0x11 => Self::Set,
            0x13 => Self::PrintableString,
            0x14 => Self::T61String,
            0x16 => Self::IA5String,
            0x17 => Self::UTCTime,
            0x18 => Self::GeneralizedTime,
            0x1c => Self::UniversalString,
            0x1e => Self::BMPString,
            n => Self::Unimplemented(n),
        }
    }
}

impl From<&PrimitiveTag> for u8 {
    fn from(tag: &PrimitiveTag) -> Self {
        match tag {
            PrimitiveTag::Boolean => 0x01,
            PrimitiveTag::Integer => 0x02,
            PrimitiveTag::BitString => 0x03,
            PrimitiveTag::OctetString => 0x04,
            PrimitiveTag::Null => 0x05,
            PrimitiveTag::ObjectIdentifier => 0x06,
            PrimitiveTag::UTF8String => 0x0c,
            PrimitiveTag::Sequence => 0x10,
            PrimitiveTag::Set => 0x11,
            PrimitiveTag::PrintableString => 0x13,
            PrimitiveTag::T61String => 0x14,
            PrimitiveTag::IA5String => 0x16,
            PrimitiveTag::UTCTime => 0x17,
            PrimitiveTag::GeneralizedTime => 0x18,
            PrimitiveTag::UniversalString => 0x1c,
            PrimitiveTag::BMPString => 0x1e,
            PrimitiveTag::Unimplemented(n) => *n,
        }
    }
}

/// A single-octet identifier.
///
/// `Primitive` covers the universal class and keeps the raw identifier
/// octet, so a constructed universal type such as SEQUENCE is
/// `Primitive(PrimitiveTag::Sequence, 0x30)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    Primitive(PrimitiveTag, u8),
    ContextSpecific { slot: u8, constructed: bool },
    /// Application and private classes.
    Other(u8),
}

impl Tag {
    pub const BOOLEAN: Tag = Tag::Primitive(PrimitiveTag::Boolean, 0x01);
    pub const INTEGER: Tag = Tag::Primitive(PrimitiveTag::Integer, 0x02);
    pub const BIT_STRING: Tag = Tag::Primitive(PrimitiveTag::BitString, 0x03);
    pub const OCTET_STRING: Tag = Tag::Primitive(PrimitiveTag::OctetString, 0x04);
    pub const NULL: Tag = Tag::Primitive(PrimitiveTag::Null, 0x05);
    pub const OBJECT_IDENTIFIER: Tag = Tag::Primitive(PrimitiveTag::ObjectIdentifier, 0x06);
    pub const UTF8_STRING: Tag = Tag::Primitive(PrimitiveTag::UTF8String, 0x0c);
    pub const SEQUENCE: Tag = Tag::Primitive(PrimitiveTag::Sequence, 0x30);
    pub const SET: Tag = Tag::Primitive(PrimitiveTag::Set, 0x31);
    pub const PRINTABLE_STRING: Tag = Tag::Primitive(PrimitiveTag::PrintableString, 0x13);
    pub const T61_STRING: Tag = Tag::Primitive(PrimitiveTag::T61String, 0x14);
    pub const IA5_STRING: Tag = Tag::Primitive(PrimitiveTag::IA5String, 0x16);
    pub const UTC_TIME: Tag = Tag::Primitive(PrimitiveTag::UTCTime, 0x17);
    pub const GENERALIZED_TIME: Tag = Tag::Primitive(PrimitiveTag::GeneralizedTime, 0x18);
    pub const UNIVERSAL_STRING: Tag = Tag::Primitive(PrimitiveTag::UniversalString, 0x1c);
    pub const BMP_STRING: Tag = Tag::Primitive(PrimitiveTag::BMPString, 0x1e);

    /// `[slot]` with the constructed bit set, as used by EXPLICIT tagging
    /// and IMPLICIT SET OF / SEQUENCE OF.
    pub const fn context(slot: u8) -> Tag {
        Tag::ContextSpecific {
            slot,
            constructed: true,
        }
    }

    /// `[slot]` with the constructed bit clear.
    pub const fn context_primitive(slot: u8) -> Tag {
        Tag::ContextSpecific {
            slot,
            constructed: false,
        }
    }

    pub fn byte(&self) -> u8 {
        u8::from(self)
    }

    pub fn is_constructed(&self) -> bool {
        self.byte() & TAG_CONSTRUCTED != 0
    }

    pub fn is_context_specific(&self, slot: u8) -> bool {
        matches!(self, Tag::ContextSpecific { slot: s, .. } if *s == slot)
    }
}

impl From<u8> for Tag {
    fn from(value: u8) -> Self {
        match value & CLASS_MASK {
            0x00 => Tag::Primitive(PrimitiveTag::from(value), value),
            TAG_CONTEXT => Tag::ContextSpecific {
                slot: value & NUMBER_MASK,
                constructed: value & TAG_CONSTRUCTED != 0,
            },
            _ => Tag::Other(value),
        }
    }
}

impl From<&Tag> for u8 {
    fn from(tag: &Tag) -> Self {
        match tag {
            Tag::Primitive(_, raw) => *raw,
            Tag::ContextSpecific { slot, constructed } => {
                let mut b = TAG_CONTEXT | (slot & NUMBER_MASK);
                if *constructed {
                    b |= TAG_CONSTRUCTED;
                }
                b
            }
            Tag::Other(raw) => *raw,
        }
    }
}

impl std::fmt::Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{:02x}", self.byte())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tlv {
    tag: Tag,
    value: Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Tlvs(Vec<Tlv>),
    Data(Vec<u8>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Length {
    Definite(usize),
    Indefinite,
}

impl Tlv {
    pub fn new_primitive(tag: Tag, data: Vec<u8>) -> Self {
        Tlv {
            tag,
            value: Value::Data(data),
        }
    }

    pub fn new_constructed(tag: Tag, tlvs: Vec<Tlv>) -> Self {
        Tlv {
            tag,
            value: Value::Tlvs(tlvs),
        }
    }

    pub fn tag(&self) -> &Tag {
        &self.tag
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn data(&self) -> Option<&[u8]> {
        match &self.value {
            Value::Data(d) => Some(d),
            Value::Tlvs(_) => None,
        }
    }

    pub fn tlvs(&self) -> Option<&[Tlv]> {
        match &self.value {
            Value::Tlvs(t) => Some(t),
            Value::Data(_) => None,
        }
    }

    /// Same value under another identifier (IMPLICIT retagging).
    pub fn with_tag(self, tag: Tag) -> Self {
        Tlv {
            tag,
            value: self.value,
        }
    }

    /// Content octets in DER form.
    pub fn content(&self) -> Vec<u8> {
        match &self.value {
            Value::Data(d) => d.clone(),
            Value::Tlvs(tlvs) => tlvs.iter().flat_map(Tlv::to_der).collect(),
        }
    }

    /// Full DER encoding. Indefinite-length input comes back definite.
    pub fn to_der(&self) -> Vec<u8> {
        let content = self.content();
        let mut out = Vec::with_capacity(content.len() + 6);
        out.push(self.tag.byte());
        encode_length(content.len(), &mut out);
        out.extend_from_slice(&content);
        out
    }

    pub fn parse(input: &[u8]) -> IResult<&[u8], Tlv> {
        let (rest, (tag, length)) = parse_header(input)?;

        match length {
            Length::Definite(length) => {
                let (rest, data) = nom::bytes::complete::take(length).parse(rest)?;
                if !tag.is_constructed() {
                    return Ok((rest, Tlv::new_primitive(tag, data.to_vec())));
                }
                let mut tlvs = Vec::new();
                let mut data = data;
                while !data.is_empty() {
                    let (next, v) = Self::parse(data)?;
                    data = next;
                    tlvs.push(v);
                }
                Ok((rest, Tlv::new_constructed(tag, tlvs)))
            }
            Length::Indefinite => {
                if !tag.is_constructed() {
                    return Err(nom::Err::Failure(nom::error::Error::new(
                        input,
                        nom::error::ErrorKind::Verify,
                    )));
                }
                let mut tlvs = Vec::new();
                let mut rest = rest;
                loop {
                    if let [0x00, 0x00, tail @ ..] = rest {
                        return Ok((tail, Tlv::new_constructed(tag, tlvs)));
                    }
                    let (next, v) = Self::parse(rest)?;
                    rest = next;
                    tlvs.push(v);
                }
            }
        }
    }
}

pub(crate) fn parse_header(input: &[u8]) -> IResult<&[u8], (Tag, Length)> {
    let (input, tag) = parse_tag(input)?;
    let (input, length) = parse_length(input)?;
    Ok((input, (tag, length)))
}

fn parse_tag(input: &[u8]) -> IResult<&[u8], Tag> {
    let (rest, n) = nom::number::be_u8().parse(input)?;
    if n & NUMBER_MASK == NUMBER_MASK {
        // multi-octet identifiers do not occur in the structures handled here
        return Err(nom::Err::Failure(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Tag,
        )));
    }
    Ok((rest, Tag::from(n)))
}

fn parse_length(input: &[u8]) -> IResult<&[u8], Length> {
    let (rest, n) = nom::number::be_u8().parse(input)?;
    if n == 0x80 {
        return Ok((rest, Length::Indefinite));
    }
    if n & 0x80 == 0 {
        return Ok((rest, Length::Definite(n as usize)));
    }
    let count = (n & 0x7f) as usize;
    if count > std::mem::size_of::<usize>() {
        return Err(nom::Err::Failure(nom::error::Error::new(
            input,
            nom::error::ErrorKind::TooLarge,
        )));
    }
    let (rest, bs) = nom::bytes::complete::take(count).parse(rest)?;
    let length = bs.iter().fold(0usize, |acc, &b| (acc << 8) | b as usize);
    Ok((rest, Length::Definite(length)))
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest(input, expected,
        case(0x02, Tag::INTEGER),
        case(0x30, Tag::SEQUENCE),
        case(0x31, Tag::SET),
        case(0x1e, Tag::BMP_STRING),
        case(0xa0, Tag::context(0)),
        case(0x81, Tag::context_primitive(1)),
        case(0x61, Tag::Other(0x61)),
    )]
    fn test_tag_from_u8(input: u8, expected: Tag) {
        let tag = Tag::from(input);
        assert_eq!(expected, tag);
        assert_eq!(input, tag.byte());
    }

    #[rstest(input, expected,
        case(vec![0x02], Length::Definite(0x02)),
        case(vec![0x7f], Length::Definite(0x7f)),
        case(vec![0x81, 0x80], Length::Definite(0x80)),
        case(vec![0x82, 0x02, 0x10], Length::Definite(256 * 0x02 + 0x10)),
        case(vec![0x83, 0x01, 0x00, 0x00], Length::Definite(256 * 256)),
        case(vec![0x80], Length::Indefinite),
    )]
    fn test_parse_length(input: Vec<u8>, expected: Length) {
        let (_, actual) = parse_length(&input).unwrap();
        assert_eq!(expected, actual);
    }

    #[rstest(input, expected,
        case(vec![0x02, 0x01, 0x01], Tlv::new_primitive(Tag::INTEGER, vec![0x01])),
        case(vec![0x13, 0x02, 0x68, 0x69], Tlv::new_primitive(Tag::PRINTABLE_STRING, vec![0x68, 0x69])),
        case(vec![0x05, 0x00], Tlv::new_primitive(Tag::NULL, vec![])),
        case(vec![0x81, 0x02, 0x00, 0xff], Tlv::new_primitive(Tag::context_primitive(1), vec![0x00, 0xff])),
    )]
    fn test_tlv_parse_primitive(input: Vec<u8>, expected: Tlv) {
        let (rest, actual) = Tlv::parse(&input).unwrap();
        assert!(rest.is_empty());
        assert_eq!(expected, actual);
        assert_eq!(input, actual.to_der());
    }

    #[test]
    fn test_tlv_parse_constructed() {
        let input = vec![0x30, 0x0b, 0x02, 0x01, 0x07, 0x02, 0x01, 0x08, 0xa0, 0x03, 0x02, 0x01, 0x09];
        let (_, actual) = Tlv::parse(&input).unwrap();
        let expected = Tlv::new_constructed(
            Tag::SEQUENCE,
            vec![
                Tlv::new_primitive(Tag::INTEGER, vec![0x07]),
                Tlv::new_primitive(Tag::INTEGER, vec![0x08]),
                Tlv::new_constructed(Tag::context(0), vec![Tlv::new_primitive(Tag::INTEGER, vec![0x09])]),
            ],
        );
        assert_eq!(expected, actual);
        assert_eq!(input, actual.to_der());
    }

    #[test]
    fn test_tlv_parse_indefinite_length() {
        let input = vec![0x30, 0x80, 0x02, 0x01, 0x05, 0x00, 0x00, 0xff];
        let (rest, actual) = Tlv::parse(&input).unwrap();
        assert_eq!(&[0xff], rest);
        assert_eq!(vec![0x30, 0x03, 0x02, 0x01, 0x05], actual.to_der());
    }

    #[rstest(input,
        case(vec![0x02, 0x05, 0x01]),
        case(vec![0x04, 0x80, 0x00, 0x00]),
        case(vec![0x1f, 0x81, 0x00]),
    )]
    fn test_tlv_parse_rejects(input: Vec<u8>) {
        assert!(Tlv::parse(&input).is_err());
    }
}
