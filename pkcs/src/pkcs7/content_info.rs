/*
RFC 2315 Section 7

ContentInfo ::= SEQUENCE {
  contentType ContentType,
  content
    [0] EXPLICIT ANY DEFINED BY contentType OPTIONAL }

ContentType ::= OBJECT IDENTIFIER

The legacy profile omits the [0] wrapper and places content directly after
contentType.
*/

use std::fmt;

use shirushi_asn1::{DerReadExt, DerWriteExt, ObjectIdentifier};
use shirushi_der::{DerReader, DerWriter, Tag};

use super::error::{Context, Result};
use super::{DATA, OLD_DATA, TIMESTAMP_TOKEN_INFO, oid};
use crate::pkcs9::hex_dump;

/// Content type plus the encoding of the content, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentInfo {
    content_type: ObjectIdentifier,
    content: Option<Vec<u8>>,
}

impl ContentInfo {
    /// `content` is a complete encoding, tag and length included.
    pub fn new(content_type: ObjectIdentifier, content: Option<Vec<u8>>) -> Self {
        Self {
            content_type,
            content,
        }
    }

    /// Data content wrapping `bytes` in an OCTET STRING.
    pub fn data(bytes: &[u8]) -> Self {
        let mut writer = DerWriter::new();
        writer.put_octet_string(bytes);
        Self::new(oid(DATA), Some(writer.into_bytes()))
    }

    /// Data content type with the content left out, as in detached
    /// signatures.
    pub fn detached() -> Self {
        Self::new(oid(DATA), None)
    }

    pub fn read(reader: &mut DerReader<'_>, legacy: bool) -> Result<Self> {
        let mut seq = reader.read_sequence().context("ContentInfo")?;
        let content_type = seq.read_oid().context("contentType")?;
        let content = if seq.is_empty() {
            None
        } else if legacy {
            Some(seq.read_raw()?.to_vec())
        } else {
            let tag = seq.peek_tag().unwrap_or(Tag::NULL);
            if !tag.is_context_specific(0) || !tag.is_constructed() {
                return Err(shirushi_der::Error::UnexpectedTag {
                    expected: Tag::context(0).byte(),
                    actual: tag.byte(),
                })
                .context("ContentInfo content");
            }
            let (_, mut explicit) = seq.read_constructed()?;
            let content = explicit.read_raw().context("ContentInfo content")?;
            explicit.ensure_empty().context("ContentInfo content")?;
            Some(content.to_vec())
        };
        seq.ensure_empty().context("ContentInfo")?;
        Ok(Self {
            content_type,
            content,
        })
    }

    pub fn from_der(der: &[u8]) -> Result<Self> {
        let mut reader = DerReader::new(der);
        let info = Self::read(&mut reader, false)?;
        reader.ensure_empty()?;
        Ok(info)
    }

    pub fn content_type(&self) -> &ObjectIdentifier {
        &self.content_type
    }

    /// The content's encoding, tag and length included.
    pub fn content(&self) -> Option<&[u8]> {
        self.content.as_deref()
    }

    /// Value octets of the content without its tag and length.
    pub fn content_bytes(&self) -> Option<&[u8]> {
        let content = self.content.as_deref()?;
        DerReader::new(content)
            .read_tagged()
            .ok()
            .map(|(_, value)| value)
    }

    /// The octets carried by Data, legacy Data and TSTInfo content.
    ///
    /// Other content types, and a type without content, give `None`. A
    /// constructed (BER) OCTET STRING is reassembled from its segments.
    pub fn data_bytes(&self) -> Result<Option<Vec<u8>>> {
        let is_data = self.content_type == DATA
            || self.content_type == OLD_DATA
            || self.content_type == TIMESTAMP_TOKEN_INFO;
        match (&self.content, is_data) {
            (Some(content), true) => octets(content).context("Data content").map(Some),
            _ => Ok(None),
        }
    }

    pub fn write(&self, writer: &mut DerWriter) {
        let mut inner = DerWriter::new();
        inner.put_oid(&self.content_type);
        if let Some(content) = &self.content {
            let mut explicit = DerWriter::new();
            explicit.put_raw(content);
            inner.put_constructed(Tag::context(0), &explicit);
        }
        writer.put_constructed(Tag::SEQUENCE, &inner);
    }

    pub fn to_der(&self) -> Vec<u8> {
        let mut writer = DerWriter::new();
        self.write(&mut writer);
        writer.into_bytes()
    }
}

fn octets(encoded: &[u8]) -> Result<Vec<u8>> {
    let mut reader = DerReader::new(encoded);
    let (tag, value) = reader.read_tagged()?;
    reader.ensure_empty()?;
    if tag == Tag::OCTET_STRING {
        return Ok(value.to_vec());
    }
    if tag.byte() != (Tag::OCTET_STRING.byte() | 0x20) {
        return Err(shirushi_der::Error::UnexpectedTag {
            expected: Tag::OCTET_STRING.byte(),
            actual: tag.byte(),
        }
        .into());
    }
    let mut segments = DerReader::new(value);
    let mut out = Vec::new();
    while !segments.is_empty() {
        out.extend(octets(segments.read_raw()?)?);
    }
    Ok(out)
}

impl fmt::Display for ContentInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Content Info Sequence\n\tContent type: {}", self.content_type)?;
        match (self.data_bytes(), &self.content) {
            (Ok(Some(data)), _) if !data.is_empty() => {
                write!(f, "\n\tContent: {}", hex_dump(&data))
            }
            (_, Some(content)) => write!(f, "\n\tContent: [{} bytes]", content.len()),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;
    use rstest::rstest;

    use super::*;
    use crate::pkcs7::SIGNED_DATA;

    #[test]
    fn test_data_round_trip() {
        let info = ContentInfo::data(b"hello");
        let der = info.to_der();
        assert_eq!(
            hex!("3014 0609 2a864886f70d010701 a007 0405 68656c6c6f").to_vec(),
            der
        );
        let back = ContentInfo::from_der(&der).unwrap();
        assert_eq!(info, back);
        assert_eq!(Some(b"hello".to_vec()), back.data_bytes().unwrap());
        assert_eq!(Some(&b"hello"[..]), back.content_bytes());
    }

    #[test]
    fn test_detached_has_no_content() {
        let der = ContentInfo::detached().to_der();
        assert_eq!(hex!("300b 0609 2a864886f70d010701").to_vec(), der);
        let back = ContentInfo::from_der(&der).unwrap();
        assert!(back.content().is_none());
        assert_eq!(None, back.data_bytes().unwrap());
    }

    #[test]
    fn test_legacy_profile_bare_content() {
        // old Data OID with the OCTET STRING directly after it
        let der = hex!("300e 0609 2a8648c3fb4d010701 0401 aa");
        let mut reader = DerReader::new(&der);
        assert!(ContentInfo::read(&mut reader, false).is_err());

        let mut reader = DerReader::new(&der);
        let info = ContentInfo::read(&mut reader, true).unwrap();
        assert_eq!(OLD_DATA, info.content_type().to_string());
        assert_eq!(Some(vec![0xaa]), info.data_bytes().unwrap());
    }

    #[test]
    fn test_constructed_octet_string() {
        let der = hex!("3016 0609 2a864886f70d010701 a009 2407 0402 0102 0401 03");
        let info = ContentInfo::from_der(&der).unwrap();
        assert_eq!(Some(vec![1, 2, 3]), info.data_bytes().unwrap());
    }

    #[rstest(
        der,
        case(hex!("3010 0609 2a864886f70d010701 0403 010203").to_vec()),
        case(hex!("3014 0609 2a864886f70d010701 a007 0403 010203 0500").to_vec()),
    )]
    fn test_modern_profile_rejects(der: Vec<u8>) {
        assert!(ContentInfo::from_der(&der).is_err());
    }

    #[test]
    fn test_non_data_content_has_no_data() {
        let info = ContentInfo::new(
            SIGNED_DATA.parse().unwrap(),
            Some(hex!("3000").to_vec()),
        );
        assert_eq!(None, info.data_bytes().unwrap());
        assert_eq!(Some(&[][..]), info.content_bytes());
    }
}
