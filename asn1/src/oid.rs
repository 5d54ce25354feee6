use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Error, Result};

/// OBJECT IDENTIFIER.
///
/// Always holds at least two arcs with a valid first pair, so encoding
/// cannot fail. Ordering is arc-wise, which gives the natural ascending
/// order of dotted strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectIdentifier {
    inner: Vec<u64>,
}

impl ObjectIdentifier {
    pub fn from_arcs(arcs: &[u64]) -> Result<Self> {
        match arcs {
            [] | [_] => Err(Error::ObjectIdentifierTooFewComponents),
            [first, second, ..]
                if *first > 2
                    || (*first < 2 && *second >= 40)
                    || first.checked_mul(40).and_then(|v| v.checked_add(*second)).is_none() =>
            {
                Err(Error::ObjectIdentifierInvalidComponent(format!(
                    "{first}.{second}"
                )))
            }
            _ => Ok(ObjectIdentifier {
                inner: arcs.to_vec(),
            }),
        }
    }

    pub fn arcs(&self) -> &[u64] {
        &self.inner
    }

    /// Content octets of the DER encoding.
    pub fn to_der_content(&self) -> Vec<u8> {
        let mut out = Vec::new();
        push_base128(self.inner[0] * 40 + self.inner[1], &mut out);
        for arc in &self.inner[2..] {
            push_base128(*arc, &mut out);
        }
        out
    }
}

fn push_base128(mut value: u64, out: &mut Vec<u8>) {
    let mut groups = vec![(value & 0x7f) as u8];
    value >>= 7;
    while value > 0 {
        groups.push((value & 0x7f) as u8 | 0x80);
        value >>= 7;
    }
    out.extend(groups.iter().rev());
}

impl TryFrom<&[u8]> for ObjectIdentifier {
    type Error = Error;

    fn try_from(value: &[u8]) -> Result<Self> {
        if value.is_empty() {
            return Err(Error::ObjectIdentifierNoData);
        }

        let mut subidentifiers = Vec::new();
        let mut val = 0u64;
        let mut pending = false;
        for b in value {
            if val > (u64::MAX >> 7) {
                return Err(Error::ObjectIdentifierInvalidComponent(
                    "arc exceeds 64 bits".to_string(),
                ));
            }
            val = (val << 7) | (*b as u64 & 0x7f);
            pending = *b & 0x80 != 0;
            if !pending {
                subidentifiers.push(val);
                val = 0;
            }
        }
        if pending {
            return Err(Error::ObjectIdentifierIncompleteEncoding);
        }

        let first = subidentifiers[0];
        let mut inner = match first {
            0..40 => vec![0, first],
            40..80 => vec![1, first - 40],
            _ => vec![2, first - 80],
        };
        inner.extend_from_slice(&subidentifiers[1..]);
        Ok(ObjectIdentifier { inner })
    }
}

impl TryFrom<Vec<u8>> for ObjectIdentifier {
    type Error = Error;

    fn try_from(value: Vec<u8>) -> Result<Self> {
        Self::try_from(value.as_slice())
    }
}

impl From<&ObjectIdentifier> for Vec<u8> {
    fn from(oid: &ObjectIdentifier) -> Self {
        oid.to_der_content()
    }
}

impl Display for ObjectIdentifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = self
            .inner
            .iter()
            .map(u64::to_string)
            .collect::<Vec<_>>()
            .join(".");
        write!(f, "{}", s)
    }
}

impl FromStr for ObjectIdentifier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let arcs = s
            .split('.')
            .map(|part| {
                part.parse::<u64>()
                    .map_err(|_| Error::ObjectIdentifierInvalidComponent(part.to_string()))
            })
            .collect::<Result<Vec<u64>>>()?;
        Self::from_arcs(&arcs)
    }
}

impl PartialEq<&str> for ObjectIdentifier {
    fn eq(&self, other: &&str) -> bool {
        let mut parts = other.split('.');
        self.inner
            .iter()
            .all(|arc| parts.next().and_then(|p| p.parse::<u64>().ok()) == Some(*arc))
            && parts.next().is_none()
    }
}

impl PartialEq<ObjectIdentifier> for &str {
    fn eq(&self, other: &ObjectIdentifier) -> bool {
        other == self
    }
}

impl Serialize for ObjectIdentifier {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ObjectIdentifier {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Types that name an OID, so lookups accept both parsed values and dotted
/// strings.
pub trait AsOid {
    fn as_oid(&self) -> Result<ObjectIdentifier>;
}

impl AsOid for ObjectIdentifier {
    fn as_oid(&self) -> Result<ObjectIdentifier> {
        Ok(self.clone())
    }
}

impl AsOid for &ObjectIdentifier {
    fn as_oid(&self) -> Result<ObjectIdentifier> {
        Ok((*self).clone())
    }
}

impl AsOid for &str {
    fn as_oid(&self) -> Result<ObjectIdentifier> {
        self.parse()
    }
}

impl AsOid for String {
    fn as_oid(&self) -> Result<ObjectIdentifier> {
        self.parse()
    }
}
