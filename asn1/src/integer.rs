use std::fmt::Display;

use num_bigint::BigInt;
use num_traits::ToPrimitive;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Error, Result};

/// INTEGER of arbitrary size. Certificate serial numbers routinely exceed
/// 64 bits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Integer {
    inner: BigInt,
}

impl Integer {
    pub fn as_bigint(&self) -> &BigInt {
        &self.inner
    }

    pub fn to_i64(&self) -> Option<i64> {
        self.inner.to_i64()
    }

    pub fn to_u64(&self) -> Option<u64> {
        self.inner.to_u64()
    }

    /// Content octets of the DER encoding (minimal two's complement).
    pub fn to_der_content(&self) -> Vec<u8> {
        self.inner.to_signed_bytes_be()
    }

    /// Interprets `bytes` as an unsigned big-endian magnitude.
    pub fn from_unsigned_bytes(bytes: &[u8]) -> Self {
        Integer {
            inner: BigInt::from_bytes_be(num_bigint::Sign::Plus, bytes),
        }
    }
}

impl From<&[u8]> for Integer {
    fn from(value: &[u8]) -> Self {
        Integer {
            inner: BigInt::from_signed_bytes_be(value),
        }
    }
}

impl From<Vec<u8>> for Integer {
    fn from(value: Vec<u8>) -> Self {
        Integer::from(value.as_slice())
    }
}

impl From<i64> for Integer {
    fn from(value: i64) -> Self {
        Integer {
            inner: BigInt::from(value),
        }
    }
}

impl From<u64> for Integer {
    fn from(value: u64) -> Self {
        Integer {
            inner: BigInt::from(value),
        }
    }
}

impl From<BigInt> for Integer {
    fn from(inner: BigInt) -> Self {
        Integer { inner }
    }
}

impl TryFrom<&Integer> for i64 {
    type Error = Error;

    fn try_from(value: &Integer) -> Result<Self> {
        value.to_i64().ok_or(Error::IntegerOutOfRange("i64"))
    }
}

impl TryFrom<&Integer> for u64 {
    type Error = Error;

    fn try_from(value: &Integer) -> Result<Self> {
        value.to_u64().ok_or(Error::IntegerOutOfRange("u64"))
    }
}

impl Display for Integer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl std::fmt::LowerHex for Integer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.inner.to_str_radix(16))
    }
}

impl Serialize for Integer {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.inner.to_string())
    }
}

impl<'de> Deserialize<'de> for Integer {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let inner = s.parse::<BigInt>().map_err(serde::de::Error::custom)?;
        Ok(Integer { inner })
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest(input, expected,
        case(vec![0x00], 0),
        case(vec![0x01], 1),
        case(vec![0x7f], 127),
        case(vec![0x00, 0x80], 128),
        case(vec![0xff], -1),
        case(vec![0x80], -128),
    )]
    fn test_integer_content(input: Vec<u8>, expected: i64) {
        let integer = Integer::from(input.as_slice());
        assert_eq!(Some(expected), integer.to_i64());
        assert_eq!(input, Integer::from(expected).to_der_content());
    }

    #[test]
    fn test_large_serial() {
        let bytes = vec![0x00, 0xde, 0xad, 0xbe, 0xef, 0xca, 0xfe, 0xba, 0xbe, 0x01];
        let serial = Integer::from(bytes.clone());
        assert_eq!(None, serial.to_u64());
        assert_eq!(bytes, serial.to_der_content());
        assert_eq!("deadbeefcafebabe01", format!("{:x}", serial));
        assert_eq!(serial, Integer::from_unsigned_bytes(&bytes[1..]));
    }

    #[test]
    fn test_integer_serde() {
        let integer = Integer::from(65537i64);
        let json = serde_json::to_string(&integer).unwrap();
        assert_eq!("\"65537\"", json);
        let back: Integer = serde_json::from_str(&json).unwrap();
        assert_eq!(integer, back);
    }
}
