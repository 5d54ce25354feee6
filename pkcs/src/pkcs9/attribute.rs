/*
RFC 2985 Section 5

Attribute ::= SEQUENCE {
    type    OBJECT IDENTIFIER,
    values  SET SIZE (1..MAX) OF AttributeValue
}
*/

use std::fmt;
use std::slice;

use shirushi_asn1::{DerReadExt, DerWriteExt, ObjectIdentifier};
use shirushi_der::{DerReader, DerWriter, Tag};

use super::error::{Error, Result};
use super::registry::{AttributeInfo, AttributeRegistry};
use super::value::{Value, hex_dump};

/// The values an attribute holds.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Single(Value),
    Multi(Vec<Value>),
    /// The complete SET encoding of an attribute the registry does not know.
    Unknown(Vec<u8>),
}

impl From<Value> for AttributeValue {
    fn from(value: Value) -> Self {
        AttributeValue::Single(value)
    }
}

impl From<Vec<Value>> for AttributeValue {
    fn from(values: Vec<Value>) -> Self {
        AttributeValue::Multi(values)
    }
}

/// A single PKCS#9 attribute.
#[derive(Debug, Clone)]
pub struct Attribute {
    oid: ObjectIdentifier,
    info: Option<AttributeInfo>,
    value: AttributeValue,
}

impl Attribute {
    /// Decodes one attribute through the global registry.
    pub fn decode(der: &[u8]) -> Result<Self> {
        Self::decode_with(AttributeRegistry::global(), der)
    }

    pub fn decode_with(registry: &AttributeRegistry, der: &[u8]) -> Result<Self> {
        let mut reader = DerReader::new(der);
        let mut seq = reader.read_sequence()?;
        reader.ensure_empty()?;
        let oid = seq.read_oid()?;
        if seq.peek_tag() != Some(Tag::SET) {
            return Err(Error::MalformedAttribute(format!(
                "Values of attribute {} are not a SET",
                oid
            )));
        }
        let set = seq.read_raw()?;
        seq.ensure_empty()?;

        let Some(info) = registry.lookup(&oid) else {
            log::debug!("keeping unknown attribute {} opaque", oid);
            return Ok(Self {
                oid,
                info: None,
                value: AttributeValue::Unknown(set.to_vec()),
            });
        };

        let mut content = DerReader::new(set).read_expected(Tag::SET).map(DerReader::new)?;
        let mut elements = Vec::new();
        while !content.is_empty() {
            elements.push(content.read_raw()?);
        }

        if info.is_single_valued() && elements.len() > 1 {
            return Err(Error::MalformedAttribute(format!(
                "Single-value attribute {} ({}) has multiple values.",
                oid,
                info.name()
            )));
        }
        if info.is_single_valued() && elements.is_empty() {
            return Err(Error::MalformedAttribute(format!(
                "Single-value attribute {} ({}) has no value.",
                oid,
                info.name()
            )));
        }
        for element in &elements {
            let tag = Tag::from(element[0]);
            if !info.permits(tag) {
                return Err(Error::MalformedAttribute(format!(
                    "Value of attribute {} ({}) has wrong tag: {}.  Expected tags: {}",
                    oid,
                    info.name(),
                    tag,
                    info.expected_tags()
                )));
            }
        }

        let Some(decode) = info.decoder() else {
            return Err(Error::UnsupportedAttribute(oid));
        };
        let mut values = elements
            .into_iter()
            .map(decode)
            .collect::<Result<Vec<_>>>()?;
        let value = match (info.is_single_valued(), values.pop()) {
            (true, Some(single)) => AttributeValue::Single(single),
            (_, last) => {
                values.extend(last);
                AttributeValue::Multi(values)
            }
        };

        Ok(Self {
            oid,
            info: Some(*info),
            value,
        })
    }

    /// Builds an attribute, checking the value against the global registry.
    ///
    /// A lone value given for a multi-valued attribute becomes a one-element
    /// list. Unknown OIDs take an [`AttributeValue::Unknown`] SET encoding.
    pub fn new(oid: ObjectIdentifier, value: impl Into<AttributeValue>) -> Result<Self> {
        Self::new_with(AttributeRegistry::global(), oid, value)
    }

    pub fn new_with(
        registry: &AttributeRegistry,
        oid: ObjectIdentifier,
        value: impl Into<AttributeValue>,
    ) -> Result<Self> {
        let value = value.into();
        let Some(info) = registry.lookup(&oid) else {
            let AttributeValue::Unknown(set) = &value else {
                return Err(Error::MalformedAttribute(format!(
                    "Attribute {} is not registered; its values must be given as a SET encoding",
                    oid
                )));
            };
            let mut reader = DerReader::new(set);
            reader.read_expected(Tag::SET)?;
            reader.ensure_empty()?;
            return Ok(Self {
                oid,
                info: None,
                value,
            });
        };
        let Some(kind) = info.value_kind() else {
            return Err(Error::UnsupportedAttribute(oid));
        };

        let value = match (info.is_single_valued(), value) {
            (true, AttributeValue::Single(v)) => AttributeValue::Single(v),
            (false, AttributeValue::Single(v)) => AttributeValue::Multi(vec![v]),
            (false, AttributeValue::Multi(vs)) => AttributeValue::Multi(vs),
            (true, AttributeValue::Multi(_)) => {
                return Err(Error::MalformedAttribute(format!(
                    "Single-value attribute {} ({}) has multiple values.",
                    oid,
                    info.name()
                )));
            }
            (_, AttributeValue::Unknown(_)) => {
                return Err(Error::MalformedAttribute(format!(
                    "Attribute {} ({}) needs decoded values",
                    oid,
                    info.name()
                )));
            }
        };
        let values = match &value {
            AttributeValue::Single(v) => slice::from_ref(v),
            AttributeValue::Multi(vs) => vs.as_slice(),
            AttributeValue::Unknown(_) => &[],
        };
        if let Some(wrong) = values.iter().find(|v| v.kind() != kind) {
            return Err(Error::ValueMismatch {
                name: info.name(),
                expected: kind.as_str(),
                actual: wrong.kind().as_str(),
            });
        }

        Ok(Self {
            oid,
            info: Some(*info),
            value,
        })
    }

    /// Builds an attribute from its registered name, e.g. `"SigningTime"`.
    pub fn by_name(name: &str, value: impl Into<AttributeValue>) -> Result<Self> {
        let oid = AttributeRegistry::global()
            .oid_of(name)
            .ok_or_else(|| Error::UnknownAttributeName(name.to_string()))?;
        Self::new(oid.clone(), value)
    }

    pub fn oid(&self) -> &ObjectIdentifier {
        &self.oid
    }

    /// Registered name, `None` for unknown attributes.
    pub fn name(&self) -> Option<&'static str> {
        self.info.as_ref().map(AttributeInfo::name)
    }

    pub fn is_known(&self) -> bool {
        self.info.is_some()
    }

    pub fn is_single_valued(&self) -> bool {
        matches!(self.value, AttributeValue::Single(_))
    }

    pub fn value(&self) -> &AttributeValue {
        &self.value
    }

    /// The value of a single-valued attribute.
    pub fn single_value(&self) -> Option<&Value> {
        match &self.value {
            AttributeValue::Single(v) => Some(v),
            _ => None,
        }
    }

    /// All decoded values; empty for unknown attributes.
    pub fn values(&self) -> &[Value] {
        match &self.value {
            AttributeValue::Single(v) => slice::from_ref(v),
            AttributeValue::Multi(vs) => vs,
            AttributeValue::Unknown(_) => &[],
        }
    }

    /// SET encoding kept for an unknown attribute.
    pub fn opaque_values(&self) -> Option<&[u8]> {
        match &self.value {
            AttributeValue::Unknown(set) => Some(set),
            _ => None,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut inner = DerWriter::new();
        inner.put_oid(&self.oid);
        match (&self.value, self.info.as_ref().and_then(AttributeInfo::encoder)) {
            (AttributeValue::Unknown(set), _) => {
                inner.put_raw(set);
            }
            (_, Some(encode)) => {
                let encoded = self
                    .values()
                    .iter()
                    .map(encode)
                    .collect::<Result<Vec<_>>>()?;
                inner.put_ordered_set_of(Tag::SET, &encoded);
            }
            (_, None) => return Err(Error::UnsupportedAttribute(self.oid.clone())),
        }
        let mut writer = DerWriter::new();
        writer.put_constructed(Tag::SEQUENCE, &inner);
        Ok(writer.into_bytes())
    }
}

impl PartialEq for Attribute {
    fn eq(&self, other: &Self) -> bool {
        self.oid == other.oid && self.value == other.value
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        match self.name() {
            Some(name) => write!(f, "{}: ", name)?,
            None => write!(f, "{}: ", self.oid)?,
        }
        match &self.value {
            AttributeValue::Single(v) => write!(f, "{}", v)?,
            AttributeValue::Multi(vs) => {
                let joined = vs
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "{}", joined)?;
            }
            AttributeValue::Unknown(set) => write!(f, "{}", hex_dump(set))?,
        }
        write!(f, "]")
    }
}
