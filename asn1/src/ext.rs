use chrono::NaiveDateTime;
use shirushi_der::{DerReader, DerWriter, PrimitiveTag, Tag};

use crate::error::{Error, Result};
use crate::{BitString, Element, Integer, ObjectIdentifier, OctetString, time};

/// Typed reads on a [`DerReader`].
pub trait DerReadExt<'a> {
    fn read_integer(&mut self) -> Result<Integer>;
    /// An INTEGER that must fit in `i64`, such as a version number.
    fn read_small_integer(&mut self) -> Result<i64>;
    fn read_oid(&mut self) -> Result<ObjectIdentifier>;
    fn read_octet_string(&mut self) -> Result<OctetString>;
    fn read_bit_string(&mut self) -> Result<BitString>;
    fn read_boolean(&mut self) -> Result<bool>;
    fn read_null(&mut self) -> Result<()>;
    /// UTCTime or GeneralizedTime, whichever comes next.
    fn read_time(&mut self) -> Result<NaiveDateTime>;
    fn read_element(&mut self) -> Result<Element>;
}

impl<'a> DerReadExt<'a> for DerReader<'a> {
    fn read_integer(&mut self) -> Result<Integer> {
        let data = self.read_expected(Tag::INTEGER)?;
        if data.is_empty() {
            return Err(Error::IntegerNoData);
        }
        Ok(Integer::from(data))
    }

    fn read_small_integer(&mut self) -> Result<i64> {
        let integer = self.read_integer()?;
        i64::try_from(&integer)
    }

    fn read_oid(&mut self) -> Result<ObjectIdentifier> {
        ObjectIdentifier::try_from(self.read_expected(Tag::OBJECT_IDENTIFIER)?)
    }

    fn read_octet_string(&mut self) -> Result<OctetString> {
        match self.read_element()? {
            Element::OctetString(os) => Ok(os),
            other => Err(Error::UnexpectedElement {
                expected: "OCTET STRING",
                actual: other.kind().to_string(),
            }),
        }
    }

    fn read_bit_string(&mut self) -> Result<BitString> {
        BitString::try_from(self.read_expected(Tag::BIT_STRING)?)
    }

    fn read_boolean(&mut self) -> Result<bool> {
        match self.read_expected(Tag::BOOLEAN)? {
            [0x00] => Ok(false),
            [_] => Ok(true),
            _ => Err(Error::InvalidBoolean),
        }
    }

    fn read_null(&mut self) -> Result<()> {
        match self.read_expected(Tag::NULL)? {
            [] => Ok(()),
            _ => Err(Error::InvalidNull),
        }
    }

    fn read_time(&mut self) -> Result<NaiveDateTime> {
        match self.peek_tag() {
            Some(Tag::Primitive(PrimitiveTag::UTCTime, _)) => {
                time::parse_utc_time(self.read_expected(Tag::UTC_TIME)?)
            }
            Some(Tag::Primitive(PrimitiveTag::GeneralizedTime, _)) => {
                time::parse_generalized_time(self.read_expected(Tag::GENERALIZED_TIME)?)
            }
            Some(tag) => Err(Error::UnexpectedElement {
                expected: "UTCTime or GeneralizedTime",
                actual: format!("tag {}", tag),
            }),
            None => Err(shirushi_der::Error::EndOfInput.into()),
        }
    }

    fn read_element(&mut self) -> Result<Element> {
        let tlv = self.read_tlv()?;
        Element::try_from(&tlv)
    }
}

/// Typed writes on a [`DerWriter`].
pub trait DerWriteExt {
    fn put_integer(&mut self, value: &Integer) -> &mut Self;
    fn put_small_integer(&mut self, value: i64) -> &mut Self;
    fn put_oid(&mut self, oid: &ObjectIdentifier) -> &mut Self;
    fn put_octet_string(&mut self, data: &[u8]) -> &mut Self;
    fn put_bit_string(&mut self, bits: &BitString) -> &mut Self;
    fn put_boolean(&mut self, value: bool) -> &mut Self;
    fn put_null(&mut self) -> &mut Self;
    fn put_utc_time(&mut self, time: &NaiveDateTime) -> &mut Self;
    fn put_generalized_time(&mut self, time: &NaiveDateTime) -> &mut Self;
    fn put_element(&mut self, element: &Element) -> Result<&mut Self>;
}

impl DerWriteExt for DerWriter {
    fn put_integer(&mut self, value: &Integer) -> &mut Self {
        self.put(Tag::INTEGER, &value.to_der_content())
    }

    fn put_small_integer(&mut self, value: i64) -> &mut Self {
        self.put_integer(&Integer::from(value))
    }

    fn put_oid(&mut self, oid: &ObjectIdentifier) -> &mut Self {
        self.put(Tag::OBJECT_IDENTIFIER, &oid.to_der_content())
    }

    fn put_octet_string(&mut self, data: &[u8]) -> &mut Self {
        self.put(Tag::OCTET_STRING, data)
    }

    fn put_bit_string(&mut self, bits: &BitString) -> &mut Self {
        self.put(Tag::BIT_STRING, &bits.to_der_content())
    }

    fn put_boolean(&mut self, value: bool) -> &mut Self {
        self.put(Tag::BOOLEAN, &[if value { 0xff } else { 0x00 }])
    }

    fn put_null(&mut self) -> &mut Self {
        self.put(Tag::NULL, &[])
    }

    fn put_utc_time(&mut self, time: &NaiveDateTime) -> &mut Self {
        self.put(Tag::UTC_TIME, time::format_utc_time(time).as_bytes())
    }

    fn put_generalized_time(&mut self, time: &NaiveDateTime) -> &mut Self {
        self.put(
            Tag::GENERALIZED_TIME,
            time::format_generalized_time(time).as_bytes(),
        )
    }

    fn put_element(&mut self, element: &Element) -> Result<&mut Self> {
        let bytes = element.to_der()?;
        Ok(self.put_raw(&bytes))
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    #[test]
    fn test_write_then_read_fields() {
        let oid: ObjectIdentifier = "1.2.840.113549.1.7.1".parse().unwrap();
        let when = NaiveDate::from_ymd_opt(2024, 2, 29)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();

        let mut inner = DerWriter::new();
        inner
            .put_small_integer(1)
            .put_oid(&oid)
            .put_octet_string(&[0xaa, 0xbb])
            .put_bit_string(&BitString::from_bytes(vec![0x01]))
            .put_boolean(true)
            .put_null()
            .put_utc_time(&when)
            .put_generalized_time(&when);
        let mut outer = DerWriter::new();
        outer.put_constructed(Tag::SEQUENCE, &inner);
        let bytes = outer.into_bytes();

        let mut reader = DerReader::new(&bytes);
        let mut seq = reader.read_sequence().unwrap();
        assert_eq!(1, seq.read_small_integer().unwrap());
        assert_eq!(oid, seq.read_oid().unwrap());
        assert_eq!(&[0xaa, 0xbb], seq.read_octet_string().unwrap().as_bytes());
        assert_eq!(&[0x01], seq.read_bit_string().unwrap().as_bytes());
        assert!(seq.read_boolean().unwrap());
        seq.read_null().unwrap();
        assert_eq!(when, seq.read_time().unwrap());
        assert_eq!(when, seq.read_time().unwrap());
        seq.ensure_empty().unwrap();
    }

    #[test]
    fn test_read_wrong_type() {
        let bytes = [0x02, 0x01, 0x00];
        let mut reader = DerReader::new(&bytes);
        assert!(reader.read_octet_string().is_err());
        let mut reader = DerReader::new(&bytes);
        assert!(reader.read_time().is_err());
    }
}
