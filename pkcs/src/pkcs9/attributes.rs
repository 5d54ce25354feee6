/*
RFC 2985 Section 5 / RFC 2315 Section 9.2

Attributes ::= SET OF Attribute

Signed and unsigned attributes of a SignerInfo are [0] IMPLICIT and
[1] IMPLICIT; PKCS#8 attributes are [0] IMPLICIT.
*/

use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

use shirushi_asn1::ObjectIdentifier;
use shirushi_der::{DerReader, DerWriter, Tag};

use super::attribute::{Attribute, AttributeValue};
use super::error::{Error, Result};
use super::registry::AttributeRegistry;
use super::value::Value;

/// A set of attributes, at most one per OID.
///
/// The canonical SET OF encoding is cached. A decoded set that dropped
/// nothing keeps the bytes it was read from, so signed attributes re-encode
/// exactly as they were signed.
#[derive(Debug, Clone, Default)]
pub struct AttributeSet {
    attributes: BTreeMap<ObjectIdentifier, Attribute>,
    encoding: OnceLock<Vec<u8>>,
}

impl AttributeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes a SET OF Attribute under any identifier.
    ///
    /// With `permitted`, any other OID fails the whole set. With
    /// `ignore_unsupported`, attributes the registry knows but cannot decode
    /// are dropped instead of failing.
    pub fn decode(
        der: &[u8],
        permitted: Option<&[ObjectIdentifier]>,
        ignore_unsupported: bool,
    ) -> Result<Self> {
        let mut reader = DerReader::new(der);
        let (_, content) = reader.read_tagged()?;
        reader.ensure_empty()?;

        let mut canonical = DerWriter::new();
        canonical.put(Tag::SET, content);

        let mut elements = DerReader::new(content);
        let mut reusable = true;
        let mut attributes = BTreeMap::new();
        while !elements.is_empty() {
            let element = elements.read_raw()?;
            let attribute = match Attribute::decode(element) {
                Ok(attribute) => attribute,
                Err(Error::UnsupportedAttribute(oid)) if ignore_unsupported => {
                    log::debug!("dropping unsupported attribute {}", oid);
                    reusable = false;
                    continue;
                }
                Err(e) => return Err(e),
            };
            let oid = attribute.oid().clone();
            if attributes.contains_key(&oid) {
                return Err(Error::DuplicateAttribute(oid));
            }
            if let Some(permitted) = permitted {
                if !permitted.contains(&oid) {
                    return Err(Error::AttributeNotPermitted(oid));
                }
            }
            attributes.insert(oid, attribute);
        }

        let encoding = OnceLock::new();
        if reusable {
            let _ = encoding.set(canonical.into_bytes());
        }
        Ok(Self {
            attributes,
            encoding,
        })
    }

    pub fn from_attributes(attributes: Vec<Attribute>) -> Result<Self> {
        let mut map = BTreeMap::new();
        for attribute in attributes {
            let oid = attribute.oid().clone();
            if map.contains_key(&oid) {
                return Err(Error::DuplicateAttribute(oid));
            }
            map.insert(oid, attribute);
        }
        Ok(Self {
            attributes: map,
            encoding: OnceLock::new(),
        })
    }

    /// The SET OF encoding, i.e. the image signed attributes are signed over.
    pub fn der_encoding(&self) -> Result<&[u8]> {
        if let Some(encoding) = self.encoding.get() {
            return Ok(encoding);
        }
        let encoded = self
            .attributes
            .values()
            .map(Attribute::encode)
            .collect::<Result<Vec<_>>>()?;
        let mut writer = DerWriter::new();
        writer.put_ordered_set_of(Tag::SET, &encoded);
        Ok(self.encoding.get_or_init(|| writer.into_bytes()))
    }

    /// The encoding with its identifier replaced by `tag`.
    pub fn encode(&self, tag: Tag) -> Result<Vec<u8>> {
        let mut writer = DerWriter::new();
        self.encode_to(&mut writer, tag)?;
        Ok(writer.into_bytes())
    }

    pub fn encode_to(&self, writer: &mut DerWriter, tag: Tag) -> Result<()> {
        writer.put_implicit(tag, self.der_encoding()?)?;
        Ok(())
    }

    pub fn get(&self, oid: &ObjectIdentifier) -> Option<&Attribute> {
        self.attributes.get(oid)
    }

    /// Values of the attribute `oid`, failing when it is absent.
    pub fn value(&self, oid: &ObjectIdentifier) -> Result<&AttributeValue> {
        self.get(oid)
            .map(Attribute::value)
            .ok_or_else(|| Error::MissingAttribute(oid.to_string()))
    }

    /// The value of a present single-valued attribute.
    pub fn single_value(&self, oid: &ObjectIdentifier) -> Option<&Value> {
        self.get(oid).and_then(Attribute::single_value)
    }

    pub fn get_by_name(&self, name: &str) -> Result<Option<&Attribute>> {
        let oid = AttributeRegistry::global()
            .oid_of(name)
            .ok_or_else(|| Error::UnknownAttributeName(name.to_string()))?;
        Ok(self.get(oid))
    }

    pub fn value_by_name(&self, name: &str) -> Result<&AttributeValue> {
        self.get_by_name(name)?
            .map(Attribute::value)
            .ok_or_else(|| Error::MissingAttribute(name.to_string()))
    }

    /// Known attributes in ascending OID order, then unknown ones.
    pub fn iter(&self) -> impl Iterator<Item = &Attribute> {
        let known = self.attributes.values().filter(|a| a.is_known());
        let unknown = self.attributes.values().filter(|a| !a.is_known());
        known.chain(unknown)
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Adds or replaces an attribute, returning the one it replaced.
    pub fn insert(&mut self, attribute: Attribute) -> Option<Attribute> {
        self.encoding.take();
        self.attributes.insert(attribute.oid().clone(), attribute)
    }

    pub fn remove(&mut self, oid: &ObjectIdentifier) -> Option<Attribute> {
        let removed = self.attributes.remove(oid);
        if removed.is_some() {
            self.encoding.take();
        }
        removed
    }
}

impl PartialEq for AttributeSet {
    fn eq(&self, other: &Self) -> bool {
        self.attributes == other.attributes
    }
}

impl fmt::Display for AttributeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "PKCS9 Attributes: [")?;
        for attribute in self.iter() {
            writeln!(f, "\t{}", attribute)?;
        }
        write!(f, "]")
    }
}

impl<'a> IntoIterator for &'a AttributeSet {
    type Item = &'a Attribute;
    type IntoIter = Box<dyn Iterator<Item = &'a Attribute> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}
