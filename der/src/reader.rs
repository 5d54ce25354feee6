use crate::error::{Error, Result};
use crate::{Length, Tag, Tlv, parse_header};

/// Cursor over an encoding.
///
/// Values are handed out as sub-slices of the input, so callers that need the
/// exact bytes of a component (signed attributes, certificates) get them
/// without a re-encode.
#[derive(Debug, Clone)]
pub struct DerReader<'a> {
    input: &'a [u8],
    position: usize,
    mark: usize,
}

impl<'a> DerReader<'a> {
    pub fn new(input: &'a [u8]) -> Self {
        DerReader {
            input,
            position: 0,
            mark: 0,
        }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn remaining(&self) -> &'a [u8] {
        &self.input[self.position..]
    }

    pub fn available(&self) -> usize {
        self.input.len() - self.position
    }

    pub fn is_empty(&self) -> bool {
        self.available() == 0
    }

    pub fn peek_byte(&self) -> Option<u8> {
        self.remaining().first().copied()
    }

    pub fn peek_tag(&self) -> Option<Tag> {
        self.peek_byte().map(Tag::from)
    }

    pub fn mark(&mut self) {
        self.mark = self.position;
    }

    /// Rewinds to the last [`DerReader::mark`] (or the start).
    pub fn reset(&mut self) {
        self.position = self.mark;
    }

    /// Reads the next complete TLV and returns its identifier, the span
    /// covering the whole encoding and the span covering its content.
    fn next_spans(&mut self) -> Result<(Tag, &'a [u8], &'a [u8])> {
        let input = self.remaining();
        if input.is_empty() {
            return Err(Error::EndOfInput);
        }
        let (after_header, (tag, length)) = parse_header(input)?;
        let header_len = input.len() - after_header.len();
        let (total, content_end) = match length {
            Length::Definite(length) => {
                if after_header.len() < length {
                    return Err(Error::ParserIncomplete(nom::Needed::new(
                        length - after_header.len(),
                    )));
                }
                (header_len + length, header_len + length)
            }
            Length::Indefinite => {
                let (rest, _) = Tlv::parse(input)?;
                let total = input.len() - rest.len();
                // content stops before the end-of-contents octets
                (total, total - 2)
            }
        };
        self.position += total;
        Ok((tag, &input[..total], &input[header_len..content_end]))
    }

    /// Whole encoding of the next value, tag and length included.
    pub fn read_raw(&mut self) -> Result<&'a [u8]> {
        self.next_spans().map(|(_, raw, _)| raw)
    }

    /// Identifier and content of the next value.
    pub fn read_tagged(&mut self) -> Result<(Tag, &'a [u8])> {
        self.next_spans().map(|(tag, _, content)| (tag, content))
    }

    pub fn read_tlv(&mut self) -> Result<Tlv> {
        let input = self.remaining();
        if input.is_empty() {
            return Err(Error::EndOfInput);
        }
        let (rest, tlv) = Tlv::parse(input)?;
        self.position += input.len() - rest.len();
        Ok(tlv)
    }

    /// Content of the next value, which must carry `tag`.
    pub fn read_expected(&mut self, tag: Tag) -> Result<&'a [u8]> {
        let actual = self.peek_tag().ok_or(Error::EndOfInput)?;
        if actual != tag {
            return Err(Error::UnexpectedTag {
                expected: tag.byte(),
                actual: actual.byte(),
            });
        }
        self.read_tagged().map(|(_, content)| content)
    }

    /// Reader over the content of the next SEQUENCE.
    pub fn read_sequence(&mut self) -> Result<DerReader<'a>> {
        self.read_expected(Tag::SEQUENCE).map(DerReader::new)
    }

    /// Reader over the content of the next constructed value, whatever its
    /// identifier.
    pub fn read_constructed(&mut self) -> Result<(Tag, DerReader<'a>)> {
        let tag = self.peek_tag().ok_or(Error::EndOfInput)?;
        if !tag.is_constructed() {
            return Err(Error::ExpectedConstructed(tag.byte()));
        }
        let (tag, content) = self.read_tagged()?;
        Ok((tag, DerReader::new(content)))
    }

    /// Raw encodings of the members of the next SET OF.
    ///
    /// With `implicit` the identifier is not checked, which is how
    /// `[n] IMPLICIT SET OF` fields are read.
    pub fn read_set_of(&mut self, min: usize, implicit: bool) -> Result<Vec<&'a [u8]>> {
        let tag = self.peek_tag().ok_or(Error::EndOfInput)?;
        let mut inner = if implicit {
            self.read_constructed()?.1
        } else {
            DerReader::new(self.read_expected(Tag::SET)?)
        };
        let mut items = Vec::new();
        while !inner.is_empty() {
            items.push(inner.read_raw()?);
        }
        if items.len() < min {
            return Err(Error::TooFewElements {
                min,
                actual: items.len(),
            });
        }
        log::trace!("read SET OF with {} members under tag {}", items.len(), tag);
        Ok(items)
    }

    pub fn ensure_empty(&self) -> Result<()> {
        match self.available() {
            0 => Ok(()),
            n => Err(Error::TrailingData(n)),
        }
    }
}
