use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// BIT STRING: the count of unused trailing bits plus the packed bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BitString {
    unused: u8,
    data: Vec<u8>,
}

impl BitString {
    pub fn new(unused: u8, data: Vec<u8>) -> Result<Self> {
        if unused > 7 || (data.is_empty() && unused != 0) {
            return Err(Error::BitStringUnusedBitsOutOfRange(unused));
        }
        Ok(BitString { unused, data })
    }

    /// A bit string made of whole octets, as used for keys and signatures.
    pub fn from_bytes(data: Vec<u8>) -> Self {
        BitString { unused: 0, data }
    }

    pub fn unused_bits(&self) -> u8 {
        self.unused
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    pub fn bit_len(&self) -> usize {
        if self.data.is_empty() {
            0
        } else {
            self.data.len() * 8 - self.unused as usize
        }
    }

    /// Named-bit lookup, bit 0 being the most significant bit of the first
    /// octet. Bits past the end read as clear.
    pub fn bit(&self, index: usize) -> bool {
        if index >= self.bit_len() {
            return false;
        }
        self.data[index / 8] & (0x80 >> (index % 8)) != 0
    }

    /// Content octets of the DER encoding.
    pub fn to_der_content(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.data.len() + 1);
        out.push(self.unused);
        out.extend_from_slice(&self.data);
        out
    }
}

impl AsRef<[u8]> for BitString {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

impl TryFrom<&[u8]> for BitString {
    type Error = Error;

    fn try_from(value: &[u8]) -> Result<Self> {
        match value.split_first() {
            Some((&unused, data)) => BitString::new(unused, data.to_vec()),
            None => Err(Error::BitStringNoData),
        }
    }
}

impl Display for BitString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for i in 0..self.bit_len() {
            write!(f, "{}", if self.bit(i) { '1' } else { '0' })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest(input, expected_len, expected_bits,
        case(vec![0x07, 0x80], 1, vec![0]),
        case(vec![0x05, 0x86], 3, vec![0]),
        case(vec![0x01, 0x06, 0x6e], 15, vec![5, 6, 9, 10, 12, 13, 14]),
        case(vec![0x00], 0, vec![]),
    )]
    fn test_bit_string_decode(input: Vec<u8>, expected_len: usize, expected_bits: Vec<usize>) {
        let bits = BitString::try_from(input.as_slice()).unwrap();
        assert_eq!(expected_len, bits.bit_len());
        let set: Vec<usize> = (0..bits.bit_len()).filter(|i| bits.bit(*i)).collect();
        assert_eq!(expected_bits, set);
        assert_eq!(input, bits.to_der_content());
    }

    #[rstest(input,
        case(vec![]),
        case(vec![0x08, 0x00]),
        case(vec![0x01]),
    )]
    fn test_bit_string_rejects(input: Vec<u8>) {
        assert!(BitString::try_from(input.as_slice()).is_err());
    }
}
