/*
RFC 3161 Section 2.4.2

TSTInfo ::= SEQUENCE  {
   version                      INTEGER  { v1(1) },
   policy                       TSAPolicyId,
   messageImprint               MessageImprint,
   serialNumber                 INTEGER,
   genTime                      GeneralizedTime,
   accuracy                     Accuracy                 OPTIONAL,
   ordering                     BOOLEAN             DEFAULT FALSE,
   nonce                        INTEGER                  OPTIONAL,
   tsa                          [0] GeneralName          OPTIONAL,
   extensions                   [1] IMPLICIT Extensions  OPTIONAL  }

Accuracy ::= SEQUENCE {
   seconds        INTEGER              OPTIONAL,
   millis     [0] INTEGER  (1..999)    OPTIONAL,
   micros     [1] INTEGER  (1..999)    OPTIONAL  }
*/

use std::fmt;

use chrono::NaiveDateTime;
use shirushi_asn1::{DerReadExt, DerWriteExt, Integer, ObjectIdentifier};
use shirushi_der::{DerReader, DerWriter, Tag};

use super::error::Result;
use crate::x509::AlgorithmIdentifier;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Accuracy {
    pub seconds: Option<i64>,
    pub millis: Option<i64>,
    pub micros: Option<i64>,
}

impl Accuracy {
    fn read(reader: &mut DerReader<'_>) -> Result<Self> {
        let mut seq = reader.read_sequence()?;
        let mut accuracy = Accuracy::default();
        if seq.peek_tag() == Some(Tag::INTEGER) {
            accuracy.seconds = Some(seq.read_small_integer()?);
        }
        if seq.peek_tag() == Some(Tag::context_primitive(0)) {
            accuracy.millis = Some(read_implicit_integer(&mut seq, 0)?);
        }
        if seq.peek_tag() == Some(Tag::context_primitive(1)) {
            accuracy.micros = Some(read_implicit_integer(&mut seq, 1)?);
        }
        seq.ensure_empty()?;
        Ok(accuracy)
    }

    fn write(&self, writer: &mut DerWriter) {
        let mut inner = DerWriter::new();
        if let Some(seconds) = self.seconds {
            inner.put_small_integer(seconds);
        }
        if let Some(millis) = self.millis {
            inner.put(Tag::context_primitive(0), &Integer::from(millis).to_der_content());
        }
        if let Some(micros) = self.micros {
            inner.put(Tag::context_primitive(1), &Integer::from(micros).to_der_content());
        }
        writer.put_constructed(Tag::SEQUENCE, &inner);
    }
}

impl fmt::Display for Accuracy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}s {}ms {}us",
            self.seconds.unwrap_or(0),
            self.millis.unwrap_or(0),
            self.micros.unwrap_or(0)
        )
    }
}

fn read_implicit_integer(reader: &mut DerReader<'_>, slot: u8) -> Result<i64> {
    let content = reader.read_expected(Tag::context_primitive(slot))?;
    Integer::from(content)
        .to_i64()
        .ok_or(shirushi_asn1::Error::IntegerOutOfRange("i64").into())
}

/// The TSTInfo a TSA signs: what was stamped, when, and under which policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampToken {
    version: i64,
    policy_id: ObjectIdentifier,
    hash_algorithm: AlgorithmIdentifier,
    hashed_message: Vec<u8>,
    serial_number: Integer,
    gen_time: NaiveDateTime,
    accuracy: Option<Accuracy>,
    ordering: bool,
    nonce: Option<Integer>,
    // [0] GeneralName and [1] Extensions, kept encoded
    tsa: Option<Vec<u8>>,
    extensions: Option<Vec<u8>>,
}

impl TimestampToken {
    pub fn new(
        policy_id: ObjectIdentifier,
        hash_algorithm: AlgorithmIdentifier,
        hashed_message: Vec<u8>,
        serial_number: Integer,
        gen_time: NaiveDateTime,
    ) -> Self {
        Self {
            version: 1,
            policy_id,
            hash_algorithm,
            hashed_message,
            serial_number,
            gen_time,
            accuracy: None,
            ordering: false,
            nonce: None,
            tsa: None,
            extensions: None,
        }
    }

    pub fn with_nonce(mut self, nonce: Option<Integer>) -> Self {
        self.nonce = nonce;
        self
    }

    pub fn with_accuracy(mut self, accuracy: Accuracy) -> Self {
        self.accuracy = Some(accuracy);
        self
    }

    pub fn from_der(der: &[u8]) -> Result<Self> {
        let mut reader = DerReader::new(der);
        let mut seq = reader.read_sequence()?;
        reader.ensure_empty()?;

        let version = seq.read_small_integer()?;
        let policy_id = seq.read_oid()?;
        let mut imprint = seq.read_sequence()?;
        let hash_algorithm = AlgorithmIdentifier::read(&mut imprint)?;
        let hashed_message = imprint.read_octet_string()?.into_bytes();
        imprint.ensure_empty()?;
        let serial_number = seq.read_integer()?;
        let gen_time = seq.read_time()?;

        let accuracy = match seq.peek_tag() {
            Some(Tag::SEQUENCE) => Some(Accuracy::read(&mut seq)?),
            _ => None,
        };
        let ordering = match seq.peek_tag() {
            Some(Tag::BOOLEAN) => seq.read_boolean()?,
            _ => false,
        };
        let nonce = match seq.peek_tag() {
            Some(Tag::INTEGER) => Some(seq.read_integer()?),
            _ => None,
        };
        let tsa = match seq.peek_tag() {
            Some(tag) if tag.is_context_specific(0) => Some(seq.read_raw()?.to_vec()),
            _ => None,
        };
        let extensions = match seq.peek_tag() {
            Some(tag) if tag.is_context_specific(1) => Some(seq.read_raw()?.to_vec()),
            _ => None,
        };
        seq.ensure_empty()?;

        Ok(Self {
            version,
            policy_id,
            hash_algorithm,
            hashed_message,
            serial_number,
            gen_time,
            accuracy,
            ordering,
            nonce,
            tsa,
            extensions,
        })
    }

    pub fn to_der(&self) -> Vec<u8> {
        let mut imprint = DerWriter::new();
        self.hash_algorithm.write(&mut imprint);
        imprint.put_octet_string(&self.hashed_message);

        let mut inner = DerWriter::new();
        inner
            .put_small_integer(self.version)
            .put_oid(&self.policy_id)
            .put_constructed(Tag::SEQUENCE, &imprint)
            .put_integer(&self.serial_number)
            .put_generalized_time(&self.gen_time);
        if let Some(accuracy) = &self.accuracy {
            accuracy.write(&mut inner);
        }
        if self.ordering {
            inner.put_boolean(true);
        }
        if let Some(nonce) = &self.nonce {
            inner.put_integer(nonce);
        }
        if let Some(tsa) = &self.tsa {
            inner.put_raw(tsa);
        }
        if let Some(extensions) = &self.extensions {
            inner.put_raw(extensions);
        }
        let mut writer = DerWriter::new();
        writer.put_constructed(Tag::SEQUENCE, &inner);
        writer.into_bytes()
    }

    pub fn version(&self) -> i64 {
        self.version
    }

    pub fn policy_id(&self) -> &ObjectIdentifier {
        &self.policy_id
    }

    pub fn hash_algorithm(&self) -> &AlgorithmIdentifier {
        &self.hash_algorithm
    }

    pub fn hashed_message(&self) -> &[u8] {
        &self.hashed_message
    }

    pub fn serial_number(&self) -> &Integer {
        &self.serial_number
    }

    pub fn gen_time(&self) -> &NaiveDateTime {
        &self.gen_time
    }

    pub fn accuracy(&self) -> Option<&Accuracy> {
        self.accuracy.as_ref()
    }

    pub fn ordering(&self) -> bool {
        self.ordering
    }

    pub fn nonce(&self) -> Option<&Integer> {
        self.nonce.as_ref()
    }

    pub fn tsa(&self) -> Option<&[u8]> {
        self.tsa.as_deref()
    }
}

impl fmt::Display for TimestampToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "TSTInfo:")?;
        writeln!(f, "  policy: {}", self.policy_id)?;
        writeln!(f, "  serial: {:x}", self.serial_number)?;
        write!(f, "  genTime: {}", self.gen_time.format("%Y-%m-%d %H:%M:%S UTC"))?;
        if let Some(accuracy) = &self.accuracy {
            write!(f, "\n  accuracy: {}", accuracy)?;
        }
        if let Some(nonce) = &self.nonce {
            write!(f, "\n  nonce: {:x}", nonce)?;
        }
        Ok(())
    }
}
