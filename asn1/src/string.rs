//! Character string decoding and encoding.

use crate::error::{Error, Result};

pub(crate) fn decode_utf8(data: &[u8]) -> Result<String> {
    String::from_utf8(data.to_vec()).map_err(|_| Error::Utf8StringInvalidUtf8)
}

fn is_printable(c: u8) -> bool {
    c.is_ascii_alphanumeric() || b" '()+,-./:=?".contains(&c)
}

pub(crate) fn decode_printable(data: &[u8]) -> Result<String> {
    // '*', '@' and '&' show up in real-world PrintableStrings
    if data
        .iter()
        .all(|c| is_printable(*c) || b"*@&".contains(c))
    {
        decode_ascii(data).ok_or(Error::PrintableStringInvalidEncoding)
    } else {
        Err(Error::PrintableStringInvalidEncoding)
    }
}

pub(crate) fn decode_ia5(data: &[u8]) -> Result<String> {
    decode_ascii(data).ok_or(Error::Ia5StringInvalidEncoding)
}

fn decode_ascii(data: &[u8]) -> Option<String> {
    data.is_ascii()
        .then(|| data.iter().map(|b| *b as char).collect())
}

/// T61String is read as ISO 8859-1, which is what deployed encoders emit.
pub(crate) fn decode_t61(data: &[u8]) -> String {
    data.iter().map(|b| *b as char).collect()
}

pub(crate) fn decode_bmp(data: &[u8]) -> Result<String> {
    if data.len() % 2 != 0 {
        return Err(Error::BmpStringOddLength(data.len()));
    }
    data.chunks_exact(2)
        .enumerate()
        .map(|(position, pair)| {
            let code_point = u16::from_be_bytes([pair[0], pair[1]]);
            char::from_u32(code_point as u32)
                .ok_or(Error::BmpStringInvalidCodePoint {
                    position,
                    code_point,
                })
        })
        .collect()
}

pub(crate) fn decode_universal(data: &[u8]) -> Result<String> {
    if data.len() % 4 != 0 {
        return Err(Error::UniversalStringInvalidLength(data.len()));
    }
    data.chunks_exact(4)
        .map(|quad| {
            let code_point = u32::from_be_bytes([quad[0], quad[1], quad[2], quad[3]]);
            char::from_u32(code_point).ok_or(Error::UniversalStringInvalidCodePoint(code_point))
        })
        .collect()
}

/// Characters outside the Basic Multilingual Plane cannot be written.
pub(crate) fn encode_bmp(s: &str) -> Result<Vec<u8>> {
    s.chars()
        .enumerate()
        .map(|(position, c)| {
            u16::try_from(c as u32)
                .map(u16::to_be_bytes)
                .map_err(|_| Error::BmpStringInvalidCodePoint {
                    position,
                    code_point: 0xFFFD,
                })
        })
        .collect::<Result<Vec<[u8; 2]>>>()
        .map(|pairs| pairs.concat())
}

pub(crate) fn encode_universal(s: &str) -> Vec<u8> {
    s.chars().flat_map(|c| (c as u32).to_be_bytes()).collect()
}

pub(crate) fn encode_t61(s: &str) -> Vec<u8> {
    s.chars()
        .map(|c| u8::try_from(c as u32).unwrap_or(b'?'))
        .collect()
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest(input, expected,
        case(vec![0x00, 0x4d, 0x00, 0x79], "My"),
        case(vec![0x30, 0x42], "\u{3042}"),
        case(vec![], ""),
    )]
    fn test_bmp(input: Vec<u8>, expected: &str) {
        assert_eq!(expected, decode_bmp(&input).unwrap());
        assert_eq!(input, encode_bmp(expected).unwrap());
    }

    #[test]
    fn test_bmp_rejects() {
        assert!(decode_bmp(&[0x00]).is_err());
        assert!(decode_bmp(&[0xd8, 0x00]).is_err());
        assert!(encode_bmp("\u{1F600}").is_err());
    }

    #[rstest(input, ok,
        case(b"Test CA 1".to_vec(), true),
        case(b"a@b".to_vec(), true),
        case(b"caf\xe9".to_vec(), false),
        case(b"semi;colon".to_vec(), false),
    )]
    fn test_printable(input: Vec<u8>, ok: bool) {
        assert_eq!(ok, decode_printable(&input).is_ok());
    }

    #[test]
    fn test_universal_and_t61() {
        let s = "x\u{e9}";
        assert_eq!(s, decode_universal(&encode_universal(s)).unwrap());
        assert_eq!(s, decode_t61(&encode_t61(s)));
        assert!(decode_universal(&[0x00, 0x00, 0x00]).is_err());
    }
}
