use std::fmt::Display;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct OctetString {
    inner: Vec<u8>,
}

impl OctetString {
    pub fn as_bytes(&self) -> &[u8] {
        &self.inner
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.inner
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl AsRef<[u8]> for OctetString {
    fn as_ref(&self) -> &[u8] {
        &self.inner
    }
}

impl From<Vec<u8>> for OctetString {
    fn from(value: Vec<u8>) -> Self {
        OctetString { inner: value }
    }
}

impl From<&[u8]> for OctetString {
    fn from(value: &[u8]) -> Self {
        OctetString {
            inner: value.to_vec(),
        }
    }
}

impl Display for OctetString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for b in &self.inner {
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

impl Serialize for OctetString {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_string())
        } else {
            self.inner.serialize(serializer)
        }
    }
}

impl<'de> Deserialize<'de> for OctetString {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        if !deserializer.is_human_readable() {
            let inner = Vec::<u8>::deserialize(deserializer)?;
            return Ok(OctetString { inner });
        }
        let hex = String::deserialize(deserializer)?;
        let cleaned: Vec<char> = hex
            .chars()
            .filter(|c| !c.is_whitespace() && *c != ':')
            .collect();
        if cleaned.len() % 2 != 0 {
            return Err(serde::de::Error::custom("hex string must have even length"));
        }
        let inner = cleaned
            .chunks(2)
            .map(|pair| {
                let s: String = pair.iter().collect();
                u8::from_str_radix(&s, 16)
                    .map_err(|e| serde::de::Error::custom(format!("invalid hex string: {}", e)))
            })
            .collect::<Result<Vec<u8>, D::Error>>()?;
        Ok(OctetString { inner })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_octet_string_serde_hex() {
        let os = OctetString::from(vec![0xde, 0xad, 0x01]);
        let json = serde_json::to_string(&os).unwrap();
        assert_eq!("\"dead01\"", json);
        let back: OctetString = serde_json::from_str("\"de:ad:01\"").unwrap();
        assert_eq!(os, back);
        assert!(serde_json::from_str::<OctetString>("\"abc\"").is_err());
    }
}
