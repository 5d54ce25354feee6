/*
RFC 5280 Section 4.1.1.2

AlgorithmIdentifier ::= SEQUENCE {
    algorithm   OBJECT IDENTIFIER,
    parameters  ANY DEFINED BY algorithm OPTIONAL
}
*/

use std::fmt;

use serde::{Serialize, ser::SerializeStruct};
use shirushi::decoder::{DecodableFrom, Decoder};
use shirushi::encoder::{EncodableTo, Encoder};
use shirushi_asn1::{DerReadExt, DerWriteExt, Element, ObjectIdentifier};
use shirushi_der::{DerReader, DerWriter, Tag};

use super::error::Result;

const NULL_PARAMETERS: &[u8] = &[0x05, 0x00];

/// Algorithm Identifier
///
/// Parameters are kept as their encoded bytes since their syntax depends
/// on the algorithm.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AlgorithmIdentifier {
    algorithm: ObjectIdentifier,
    parameters: Option<Vec<u8>>,
}

impl AlgorithmIdentifier {
    /// Algorithm OID only, parameters absent.
    pub fn new(algorithm: ObjectIdentifier) -> Self {
        Self {
            algorithm,
            parameters: None,
        }
    }

    /// `parameters` is a complete DER value.
    pub fn with_parameters(algorithm: ObjectIdentifier, parameters: Vec<u8>) -> Self {
        Self {
            algorithm,
            parameters: Some(parameters),
        }
    }

    /// Explicit NULL parameters, the RSA convention.
    pub fn with_null_parameters(algorithm: ObjectIdentifier) -> Self {
        Self::with_parameters(algorithm, NULL_PARAMETERS.to_vec())
    }

    pub fn algorithm(&self) -> &ObjectIdentifier {
        &self.algorithm
    }

    pub fn parameters(&self) -> Option<&[u8]> {
        self.parameters.as_deref()
    }

    /// Same algorithm, treating absent parameters and NULL as equal.
    pub fn same_algorithm(&self, other: &AlgorithmIdentifier) -> bool {
        let normalized = |p: Option<&[u8]>| match p {
            Some(NULL_PARAMETERS) | None => None,
            Some(p) => Some(p.to_vec()),
        };
        self.algorithm == other.algorithm
            && normalized(self.parameters()) == normalized(other.parameters())
    }

    pub fn read(reader: &mut DerReader<'_>) -> Result<Self> {
        let mut seq = reader.read_sequence()?;
        let algorithm = seq.read_oid()?;
        let parameters = match seq.is_empty() {
            true => None,
            false => Some(seq.read_raw()?.to_vec()),
        };
        seq.ensure_empty()?;
        Ok(Self {
            algorithm,
            parameters,
        })
    }

    pub fn from_der(bytes: &[u8]) -> Result<Self> {
        let mut reader = DerReader::new(bytes);
        let id = Self::read(&mut reader)?;
        reader.ensure_empty()?;
        Ok(id)
    }

    pub fn write(&self, writer: &mut DerWriter) {
        let mut inner = DerWriter::new();
        inner.put_oid(&self.algorithm);
        if let Some(parameters) = &self.parameters {
            inner.put_raw(parameters);
        }
        writer.put_constructed(Tag::SEQUENCE, &inner);
    }

    pub fn to_der(&self) -> Vec<u8> {
        let mut writer = DerWriter::new();
        self.write(&mut writer);
        writer.into_bytes()
    }
}

impl fmt::Display for AlgorithmIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.algorithm)
    }
}

impl Serialize for AlgorithmIdentifier {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("AlgorithmIdentifier", 2)?;
        state.serialize_field("algorithm", &self.algorithm)?;
        if let Some(parameters) = &self.parameters {
            state.serialize_field("parameters", &hex(parameters))?;
        }
        state.end()
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

impl DecodableFrom<Element> for AlgorithmIdentifier {}

impl Decoder<Element, AlgorithmIdentifier> for Element {
    type Error = super::Error;

    fn decode(&self) -> Result<AlgorithmIdentifier> {
        AlgorithmIdentifier::from_der(&self.to_der()?)
    }
}

impl EncodableTo<AlgorithmIdentifier> for Element {}

impl Encoder<AlgorithmIdentifier, Element> for AlgorithmIdentifier {
    type Error = super::Error;

    fn encode(&self) -> Result<Element> {
        Ok(Element::from_der(&self.to_der())?)
    }
}
