/*
RFC 5958 - Asymmetric Key Packages

OneAsymmetricKey ::= SEQUENCE {
    version                   Version,
    privateKeyAlgorithm       PrivateKeyAlgorithmIdentifier,
    privateKey                PrivateKey,
    attributes            [0] Attributes OPTIONAL,
    ...,
    [[2: publicKey        [1] PublicKey OPTIONAL ]],
    ...
}

PrivateKeyInfo ::= OneAsymmetricKey

Version ::= INTEGER { v1(0), v2(1) } (v1, ..., v2)

PrivateKeyAlgorithmIdentifier ::= AlgorithmIdentifier

PrivateKey ::= OCTET STRING

PublicKey ::= BIT STRING

Attributes ::= SET OF Attribute
*/

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use shirushi::decoder::{DecodableFrom, Decoder};
use shirushi_asn1::{BitString, DerReadExt, DerWriteExt, Integer};
use shirushi_der::{DerReader, DerWriter, Tag};
use shirushi_pem::{FromPem, Label, Pem, ToPem};
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

use super::error::{Error, Result};
use crate::pkcs9::AttributeSet;
use crate::x509::{AlgorithmIdentifier, SubjectPublicKeyInfo};

/// PKCS#8 OneAsymmetricKey version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Version {
    /// Version 1 (no public key)
    V1 = 0,
    /// Version 2 (with public key)
    V2 = 1,
}

impl From<Version> for i64 {
    fn from(v: Version) -> Self {
        v as i64
    }
}

impl TryFrom<i64> for Version {
    type Error = Error;

    fn try_from(value: i64) -> Result<Self> {
        match value {
            0 => Ok(Version::V1),
            1 => Ok(Version::V2),
            _ => Err(Error::invalid(format!("unknown version: {}", value))),
        }
    }
}

impl From<Version> for Integer {
    fn from(v: Version) -> Self {
        Integer::from(v as i64)
    }
}

/// A PKCS#8 private key of any algorithm.
///
/// The `[0]` attributes are kept as they appeared on the wire and only
/// parsed when [`attributes`](Self::attributes) is called, so a key with
/// attribute values the registry would reject still decodes.
///
/// Equality compares the encodings in constant time. The key material and
/// the cached encoding are zeroized by [`clear`](Self::clear) and on drop.
#[derive(Clone)]
pub struct PrivateKeyContainer {
    version: Version,
    algorithm: AlgorithmIdentifier,
    private_key: Vec<u8>,
    /// Full `[0]` TLV.
    attributes: Option<Vec<u8>>,
    public_key: Option<BitString>,
    encoding: OnceLock<Vec<u8>>,
}

impl PrivateKeyContainer {
    /// A version 1 key.
    pub fn new(algorithm: AlgorithmIdentifier, private_key: Vec<u8>) -> Self {
        Self {
            version: Version::V1,
            algorithm,
            private_key,
            attributes: None,
            public_key: None,
            encoding: OnceLock::new(),
        }
    }

    /// A version 2 key carrying its public key.
    pub fn with_public_key(
        algorithm: AlgorithmIdentifier,
        private_key: Vec<u8>,
        public_key: BitString,
    ) -> Self {
        Self {
            version: Version::V2,
            algorithm,
            private_key,
            attributes: None,
            public_key: Some(public_key),
            encoding: OnceLock::new(),
        }
    }

    /// Attaches `attributes`, encoded as `[0] IMPLICIT SET OF`.
    pub fn with_attributes(mut self, attributes: &AttributeSet) -> Result<Self> {
        self.attributes = Some(attributes.encode(Tag::context(0))?);
        self.reset_encoding();
        Ok(self)
    }

    /// Assembles a key from decoded fields. `attributes` is the complete
    /// `[0]` element, as returned by [`attributes_der`](Self::attributes_der).
    pub fn from_parts(
        version: Version,
        algorithm: AlgorithmIdentifier,
        private_key: Vec<u8>,
        attributes: Option<Vec<u8>>,
        public_key: Option<BitString>,
    ) -> Result<Self> {
        if version == Version::V1 && public_key.is_some() {
            return Err(Error::invalid("publicKey seen in v1"));
        }
        if let Some(raw) = &attributes {
            let mut reader = DerReader::new(raw);
            match reader.peek_tag() {
                Some(tag) if tag.is_context_specific(0) => {
                    reader.read_raw()?;
                    reader.ensure_empty()?;
                }
                _ => return Err(Error::invalid("attributes are not tagged [0]")),
            }
        }
        Ok(Self {
            version,
            algorithm,
            private_key,
            attributes,
            public_key,
            encoding: OnceLock::new(),
        })
    }

    pub fn from_der(der: &[u8]) -> Result<Self> {
        let mut reader = DerReader::new(der);
        if reader.peek_tag() != Some(Tag::SEQUENCE) {
            return Err(Error::invalid("invalid key format"));
        }
        let mut seq = reader.read_sequence()?;
        reader.ensure_empty()?;

        let version = Version::try_from(seq.read_small_integer()?)?;
        let algorithm = AlgorithmIdentifier::read(&mut seq)?;
        let private_key = seq.read_octet_string()?.into_bytes();

        let attributes = match seq.peek_tag() {
            Some(tag) if tag.is_context_specific(0) => Some(seq.read_raw()?.to_vec()),
            _ => None,
        };

        let mut public_key = None;
        if version == Version::V2 && !seq.is_empty() {
            match seq.peek_tag() {
                Some(tag) if tag.is_context_specific(1) && !tag.is_constructed() => {
                    let (_, content) = seq.read_tagged()?;
                    public_key = Some(BitString::try_from(content)?);
                }
                _ => return Err(Error::invalid("Invalid context tag")),
            }
        }
        if !seq.is_empty() {
            return Err(Error::invalid("Extra bytes"));
        }

        let encoding = OnceLock::new();
        let _ = encoding.set(der.to_vec());
        Ok(Self {
            version,
            algorithm,
            private_key,
            attributes,
            public_key,
            encoding,
        })
    }

    /// The DER encoding, computed once.
    pub fn encode(&self) -> Result<&[u8]> {
        if let Some(encoding) = self.encoding.get() {
            return Ok(encoding);
        }
        let mut inner = DerWriter::new();
        inner.put_integer(&Integer::from(self.version));
        self.algorithm.write(&mut inner);
        inner.put_octet_string(&self.private_key);
        if let Some(attributes) = &self.attributes {
            inner.put_raw(attributes);
        }
        if let Some(public_key) = &self.public_key {
            inner.put(Tag::context_primitive(1), &public_key.to_der_content());
        }
        let mut writer = DerWriter::new();
        writer.put_constructed(Tag::SEQUENCE, &inner);
        Ok(self.encoding.get_or_init(|| writer.into_bytes()))
    }

    pub fn to_der(&self) -> Result<Vec<u8>> {
        self.encode().map(<[u8]>::to_vec)
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn algorithm(&self) -> &AlgorithmIdentifier {
        &self.algorithm
    }

    /// Algorithm-specific private key bytes.
    pub fn private_key(&self) -> &[u8] {
        &self.private_key
    }

    /// The `[0]` attributes parsed against the PKCS#9 registry. Attributes
    /// the registry knows but cannot decode are left out.
    pub fn attributes(&self) -> Option<Result<AttributeSet>> {
        self.attributes.as_deref().map(read_attributes)
    }

    /// The `[0]` attributes exactly as encoded.
    pub fn attributes_der(&self) -> Option<&[u8]> {
        self.attributes.as_deref()
    }

    pub fn has_public_key(&self) -> bool {
        self.public_key.is_some()
    }

    pub fn public_key(&self) -> Option<&BitString> {
        self.public_key.as_ref()
    }

    /// SubjectPublicKeyInfo for the embedded public key.
    pub fn public_key_info(&self) -> Option<SubjectPublicKeyInfo> {
        self.public_key
            .as_ref()
            .map(|key| SubjectPublicKeyInfo::new(self.algorithm.clone(), key.clone()))
    }

    /// Overwrites the key material and the cached encoding with zeros.
    pub fn clear(&mut self) {
        self.private_key.zeroize();
        self.reset_encoding();
    }

    fn reset_encoding(&mut self) {
        if let Some(mut encoding) = self.encoding.take() {
            encoding.zeroize();
        }
    }
}

/// Attributes are [0] IMPLICIT SET OF. An explicitly wrapped SET is accepted
/// too, since some encoders emit it.
fn read_attributes(raw: &[u8]) -> Result<AttributeSet> {
    let (_, content) = DerReader::new(raw).read_tagged()?;
    let mut inner = DerReader::new(content);
    if inner.peek_tag() == Some(Tag::SET) {
        let set = inner.read_raw()?;
        if inner.is_empty() {
            log::debug!("PKCS#8 attributes wrapped in an explicit SET");
            return Ok(AttributeSet::decode(set, None, true)?);
        }
    }
    Ok(AttributeSet::decode(raw, None, true)?)
}

impl Drop for PrivateKeyContainer {
    fn drop(&mut self) {
        self.clear();
    }
}

impl PartialEq for PrivateKeyContainer {
    fn eq(&self, other: &Self) -> bool {
        match (self.encode(), other.encode()) {
            (Ok(a), Ok(b)) => a.ct_eq(b).into(),
            _ => false,
        }
    }
}

impl Eq for PrivateKeyContainer {}

impl Hash for PrivateKeyContainer {
    fn hash<H: Hasher>(&self, state: &mut H) {
        if let Ok(encoding) = self.encode() {
            encoding.hash(state);
        }
    }
}

impl fmt::Debug for PrivateKeyContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKeyContainer")
            .field("version", &self.version)
            .field("algorithm", &self.algorithm)
            .field("private_key", &"<redacted>")
            .field("attributes", &self.attributes.as_ref().map(Vec::len))
            .field("public_key", &self.public_key.is_some())
            .finish()
    }
}

impl fmt::Display for PrivateKeyContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PKCS#8 {:?} private key, algorithm {}", self.version, self.algorithm)
    }
}

impl DecodableFrom<Pem> for PrivateKeyContainer {}

impl Decoder<Pem, PrivateKeyContainer> for Pem {
    type Error = Error;

    fn decode(&self) -> Result<PrivateKeyContainer> {
        PrivateKeyContainer::from_pem(self)
    }
}

impl FromPem for PrivateKeyContainer {
    type Error = Error;

    fn from_pem(pem: &Pem) -> Result<Self> {
        let mut der = pem.clone().expect_label(&[Label::PrivateKey])?;
        let key = PrivateKeyContainer::from_der(&der);
        der.zeroize();
        key
    }
}

impl ToPem for PrivateKeyContainer {
    type Error = Error;

    fn to_pem(&self) -> Result<Pem> {
        Ok(Pem::new(Label::PrivateKey, self.to_der()?))
    }
}
