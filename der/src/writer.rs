use crate::error::{Error, Result};
use crate::{Tag, Tlv};

/// Appends the DER length octets for `len`.
pub fn encode_length(len: usize, out: &mut Vec<u8>) {
    if len < 0x80 {
        out.push(len as u8);
        return;
    }
    let bytes = len.to_be_bytes();
    let skip = bytes.iter().take_while(|&&b| b == 0).count();
    out.push(0x80 | (bytes.len() - skip) as u8);
    out.extend_from_slice(&bytes[skip..]);
}

/// Output buffer for DER encodings.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DerWriter {
    buf: Vec<u8>,
}

impl DerWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    /// Writes `tag`, the length of `content` and `content`.
    pub fn put(&mut self, tag: Tag, content: &[u8]) -> &mut Self {
        self.buf.push(tag.byte());
        encode_length(content.len(), &mut self.buf);
        self.buf.extend_from_slice(content);
        self
    }

    /// Appends an already encoded value.
    pub fn put_raw(&mut self, encoded: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(encoded);
        self
    }

    pub fn put_tlv(&mut self, tlv: &Tlv) -> &mut Self {
        self.put_raw(&tlv.to_der())
    }

    /// Wraps everything written to `inner` under `tag`.
    pub fn put_constructed(&mut self, tag: Tag, inner: &DerWriter) -> &mut Self {
        self.put(tag, inner.as_bytes())
    }

    /// Writes an encoded value with its identifier octet replaced.
    pub fn put_implicit(&mut self, tag: Tag, encoded: &[u8]) -> Result<&mut Self> {
        let (_, rest) = encoded.split_first().ok_or(Error::EmptyEncoding)?;
        self.buf.push(tag.byte());
        self.buf.extend_from_slice(rest);
        Ok(self)
    }

    /// Writes a SET OF (or an implicitly tagged one) with members in
    /// ascending order of their encodings.
    pub fn put_ordered_set_of<T: AsRef<[u8]>>(&mut self, tag: Tag, items: &[T]) -> &mut Self {
        let mut sorted: Vec<&[u8]> = items.iter().map(AsRef::as_ref).collect();
        sorted.sort();
        let content: Vec<u8> = sorted.concat();
        self.put(tag, &content)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest(len, expected,
        case(0, vec![0x00]),
        case(0x7f, vec![0x7f]),
        case(0x80, vec![0x81, 0x80]),
        case(0x0210, vec![0x82, 0x02, 0x10]),
        case(0x010000, vec![0x83, 0x01, 0x00, 0x00]),
    )]
    fn test_encode_length(len: usize, expected: Vec<u8>) {
        let mut out = Vec::new();
        encode_length(len, &mut out);
        assert_eq!(expected, out);
    }

    #[test]
    fn test_nested_sequence() {
        let mut inner = DerWriter::new();
        inner.put(Tag::INTEGER, &[0x01]).put(Tag::NULL, &[]);
        let mut outer = DerWriter::new();
        outer.put_constructed(Tag::SEQUENCE, &inner);
        assert_eq!(
            vec![0x30, 0x05, 0x02, 0x01, 0x01, 0x05, 0x00],
            outer.into_bytes()
        );
    }

    #[test]
    fn test_ordered_set_of() {
        let items = vec![vec![0x04, 0x01, 0x02], vec![0x02, 0x01, 0x09], vec![0x04, 0x01, 0x01]];
        let mut w = DerWriter::new();
        w.put_ordered_set_of(Tag::SET, &items);
        assert_eq!(
            vec![0x31, 0x09, 0x02, 0x01, 0x09, 0x04, 0x01, 0x01, 0x04, 0x01, 0x02],
            w.into_bytes()
        );
    }

    #[test]
    fn test_put_implicit() {
        let mut w = DerWriter::new();
        w.put_implicit(Tag::context(0), &[0x31, 0x03, 0x02, 0x01, 0x00])
            .unwrap();
        assert_eq!(vec![0xa0, 0x03, 0x02, 0x01, 0x00], w.into_bytes());
        assert_eq!(
            Err(Error::EmptyEncoding),
            DerWriter::new().put_implicit(Tag::SET, &[]).map(|_| ())
        );
    }
}
