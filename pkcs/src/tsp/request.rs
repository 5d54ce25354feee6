/*
RFC 3161 Section 2.4.1

TimeStampReq ::= SEQUENCE  {
   version                      INTEGER  { v1(1) },
   messageImprint               MessageImprint,
   reqPolicy             TSAPolicyId              OPTIONAL,
   nonce                 INTEGER                  OPTIONAL,
   certReq               BOOLEAN                  DEFAULT FALSE,
   extensions            [0] IMPLICIT Extensions  OPTIONAL  }

MessageImprint ::= SEQUENCE  {
   hashAlgorithm                AlgorithmIdentifier,
   hashedMessage                OCTET STRING  }
*/

use shirushi_asn1::{DerReadExt, DerWriteExt, Integer, ObjectIdentifier};
use shirushi_der::{DerReader, DerWriter, Tag};

use super::error::Result;
use crate::digest::DigestAlgorithm;
use crate::x509::AlgorithmIdentifier;

/// A TimeStampReq.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TsRequest {
    hash_algorithm: AlgorithmIdentifier,
    hashed_message: Vec<u8>,
    policy_id: Option<ObjectIdentifier>,
    nonce: Option<Integer>,
    cert_req: bool,
}

impl TsRequest {
    /// A request over the `digest` of `to_be_timestamped`.
    pub fn new(
        policy_id: Option<ObjectIdentifier>,
        to_be_timestamped: &[u8],
        digest: DigestAlgorithm,
    ) -> Self {
        Self {
            hash_algorithm: digest.algorithm_identifier(),
            hashed_message: digest.digest(to_be_timestamped),
            policy_id,
            nonce: None,
            cert_req: false,
        }
    }

    pub fn with_nonce(mut self, nonce: Integer) -> Self {
        self.nonce = Some(nonce);
        self
    }

    /// Asks the TSA to include its certificate in the token.
    pub fn request_certificate(mut self, cert_req: bool) -> Self {
        self.cert_req = cert_req;
        self
    }

    pub fn hash_algorithm(&self) -> &AlgorithmIdentifier {
        &self.hash_algorithm
    }

    pub fn hashed_message(&self) -> &[u8] {
        &self.hashed_message
    }

    pub fn policy_id(&self) -> Option<&ObjectIdentifier> {
        self.policy_id.as_ref()
    }

    pub fn nonce(&self) -> Option<&Integer> {
        self.nonce.as_ref()
    }

    pub fn cert_req(&self) -> bool {
        self.cert_req
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut imprint = DerWriter::new();
        self.hash_algorithm.write(&mut imprint);
        imprint.put_octet_string(&self.hashed_message);

        let mut inner = DerWriter::new();
        inner
            .put_small_integer(1)
            .put_constructed(Tag::SEQUENCE, &imprint);
        if let Some(policy_id) = &self.policy_id {
            inner.put_oid(policy_id);
        }
        if let Some(nonce) = &self.nonce {
            inner.put_integer(nonce);
        }
        if self.cert_req {
            inner.put_boolean(true);
        }
        let mut writer = DerWriter::new();
        writer.put_constructed(Tag::SEQUENCE, &inner);
        writer.into_bytes()
    }

    /// Reads a request, as a TSA would. Extensions are skipped.
    pub fn from_der(der: &[u8]) -> Result<Self> {
        let mut reader = DerReader::new(der);
        let mut seq = reader.read_sequence()?;
        reader.ensure_empty()?;
        seq.read_small_integer()?;
        let mut imprint = seq.read_sequence()?;
        let hash_algorithm = AlgorithmIdentifier::read(&mut imprint)?;
        let hashed_message = imprint.read_octet_string()?.into_bytes();
        imprint.ensure_empty()?;

        let policy_id = match seq.peek_tag() {
            Some(Tag::OBJECT_IDENTIFIER) => Some(seq.read_oid()?),
            _ => None,
        };
        let nonce = match seq.peek_tag() {
            Some(Tag::INTEGER) => Some(seq.read_integer()?),
            _ => None,
        };
        let cert_req = match seq.peek_tag() {
            Some(Tag::BOOLEAN) => seq.read_boolean()?,
            _ => false,
        };
        if seq.peek_tag().is_some_and(|t| t.is_context_specific(0)) {
            seq.read_raw()?;
        }
        seq.ensure_empty()?;

        Ok(Self {
            hash_algorithm,
            hashed_message,
            policy_id,
            nonce,
            cert_req,
        })
    }
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;

    use super::*;

    #[test]
    fn test_encode_minimal() {
        let request = TsRequest::new(None, b"abc", DigestAlgorithm::Sha256);
        let der = request.encode();
        let expected = [
            hex!("3034 020101 302f 300b 0609 608648016503040201 0420").as_slice(),
            DigestAlgorithm::Sha256.digest(b"abc").as_slice(),
        ]
        .concat();
        assert_eq!(expected, der);
    }

    #[test]
    fn test_encode_full_and_read_back() {
        let request = TsRequest::new(
            Some("1.2.3.4.1".parse().unwrap()),
            b"signature bytes",
            DigestAlgorithm::Sha384,
        )
        .with_nonce(Integer::from(0xfedc_ba98_7654_3210u64))
        .request_certificate(true);
        let der = request.encode();
        assert_eq!(&hex!("0101ff"), &der[der.len() - 3..]);

        let back = TsRequest::from_der(&der).unwrap();
        assert_eq!(request, back);
        assert_eq!(48, back.hashed_message().len());
        assert!(back.cert_req());
    }
}
