/*
RFC 2315 Section 9.2

SignerInfo ::= SEQUENCE {
  version Version,
  issuerAndSerialNumber IssuerAndSerialNumber,
  digestAlgorithm DigestAlgorithmIdentifier,
  authenticatedAttributes
    [0] IMPLICIT Attributes OPTIONAL,
  digestEncryptionAlgorithm
    DigestEncryptionAlgorithmIdentifier,
  encryptedDigest EncryptedDigest,
  unauthenticatedAttributes
    [1] IMPLICIT Attributes OPTIONAL }

IssuerAndSerialNumber ::= SEQUENCE {
  issuer Name,
  serialNumber CertificateSerialNumber }

EncryptedDigest ::= OCTET STRING

In the legacy profile both attribute fields are plain, always empty, SETs.
*/

use std::borrow::Cow;
use std::fmt;

use shirushi_asn1::{DerReadExt, DerWriteExt, Integer};
use shirushi_der::{DerReader, DerWriter, Tag};

use super::error::{Context, Error, Result};
use super::oid;
use super::signed_data::SignedMessage;
use crate::digest::DigestAlgorithm;
use crate::pkcs9::{self, AttributeSet, Value, hex_dump};
use crate::tsp::{self, TimestampToken};
use crate::x509::{AlgorithmIdentifier, Certificate, Name, SubjectPublicKeyInfo};

/// Critical extensions a signer certificate may carry.
const UNDERSTOOD_CRITICAL_EXTENSIONS: &[&str] = &[
    "2.5.29.15", // keyUsage
    "2.5.29.17", // subjectAltName
    "2.5.29.18", // issuerAltName
    "2.5.29.19", // basicConstraints
    "2.5.29.30", // nameConstraints
    "2.5.29.32", // certificatePolicies
    "2.5.29.33", // policyMappings
    "2.5.29.36", // policyConstraints
    "2.5.29.37", // extKeyUsage
    "2.5.29.54", // inhibitAnyPolicy
];

/// The signature primitive, supplied by the caller.
///
/// Returns `Ok(false)` for a signature that does not verify and an error
/// only when the check could not be carried out.
pub trait SignatureVerifier {
    fn verify(
        &self,
        signature_algorithm: &AlgorithmIdentifier,
        digest: DigestAlgorithm,
        public_key: &SubjectPublicKeyInfo,
        data: &[u8],
        signature: &[u8],
    ) -> Result<bool>;
}

impl<T: SignatureVerifier + ?Sized> SignatureVerifier for &T {
    fn verify(
        &self,
        signature_algorithm: &AlgorithmIdentifier,
        digest: DigestAlgorithm,
        public_key: &SubjectPublicKeyInfo,
        data: &[u8],
        signature: &[u8],
    ) -> Result<bool> {
        (**self).verify(signature_algorithm, digest, public_key, data, signature)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignerInfo {
    version: Integer,
    issuer: Name,
    serial_number: Integer,
    digest_algorithm: AlgorithmIdentifier,
    authenticated_attributes: Option<AttributeSet>,
    signature_algorithm: AlgorithmIdentifier,
    signature: Vec<u8>,
    unauthenticated_attributes: Option<AttributeSet>,
}

impl SignerInfo {
    pub fn new(
        issuer: Name,
        serial_number: Integer,
        digest_algorithm: AlgorithmIdentifier,
        authenticated_attributes: Option<AttributeSet>,
        signature_algorithm: AlgorithmIdentifier,
        signature: Vec<u8>,
        unauthenticated_attributes: Option<AttributeSet>,
    ) -> Self {
        Self {
            version: Integer::from(1i64),
            issuer,
            serial_number,
            digest_algorithm,
            authenticated_attributes,
            signature_algorithm,
            signature,
            unauthenticated_attributes,
        }
    }

    pub fn read(reader: &mut DerReader<'_>, legacy: bool) -> Result<Self> {
        let mut seq = reader.read_sequence().context("SignerInfo")?;
        let version = seq.read_integer().context("SignerInfo version")?;
        let mut issuer_and_serial = seq.read_sequence().context("issuerAndSerialNumber")?;
        let issuer = Name::read(&mut issuer_and_serial).context("issuerAndSerialNumber")?;
        let serial_number = issuer_and_serial
            .read_integer()
            .context("issuerAndSerialNumber")?;
        issuer_and_serial
            .ensure_empty()
            .context("issuerAndSerialNumber")?;
        let digest_algorithm = AlgorithmIdentifier::read(&mut seq).context("digestAlgorithm")?;

        let authenticated_attributes = if legacy {
            seq.read_set_of(0, false).context("authenticatedAttributes")?;
            None
        } else if seq.peek_tag().is_some_and(|t| t.is_context_specific(0)) {
            let raw = seq.read_raw()?;
            Some(AttributeSet::decode(raw, None, false).context("authenticatedAttributes")?)
        } else {
            None
        };

        let signature_algorithm =
            AlgorithmIdentifier::read(&mut seq).context("digestEncryptionAlgorithm")?;
        let signature = seq
            .read_octet_string()
            .context("encryptedDigest")?
            .into_bytes();

        let unauthenticated_attributes = if legacy {
            seq.read_set_of(0, false).context("unauthenticatedAttributes")?;
            None
        } else if seq.peek_tag().is_some_and(|t| t.is_context_specific(1)) {
            let raw = seq.read_raw()?;
            Some(AttributeSet::decode(raw, None, true).context("unauthenticatedAttributes")?)
        } else {
            None
        };

        if !seq.is_empty() {
            return Err(shirushi_der::Error::TrailingData(seq.available()))
                .context("SignerInfo, extra data at the end");
        }

        Ok(Self {
            version,
            issuer,
            serial_number,
            digest_algorithm,
            authenticated_attributes,
            signature_algorithm,
            signature,
            unauthenticated_attributes,
        })
    }

    pub fn from_der(der: &[u8]) -> Result<Self> {
        let mut reader = DerReader::new(der);
        let info = Self::read(&mut reader, false)?;
        reader.ensure_empty()?;
        Ok(info)
    }

    pub fn write(&self, writer: &mut DerWriter) -> Result<()> {
        let mut issuer_and_serial = DerWriter::new();
        issuer_and_serial
            .put_raw(self.issuer.encoded())
            .put_integer(&self.serial_number);

        let mut inner = DerWriter::new();
        inner
            .put_integer(&self.version)
            .put_constructed(Tag::SEQUENCE, &issuer_and_serial);
        self.digest_algorithm.write(&mut inner);
        if let Some(attributes) = &self.authenticated_attributes {
            attributes.encode_to(&mut inner, Tag::context(0))?;
        }
        self.signature_algorithm.write(&mut inner);
        inner.put_octet_string(&self.signature);
        if let Some(attributes) = &self.unauthenticated_attributes {
            attributes.encode_to(&mut inner, Tag::context(1))?;
        }
        writer.put_constructed(Tag::SEQUENCE, &inner);
        Ok(())
    }

    pub fn to_der(&self) -> Result<Vec<u8>> {
        let mut writer = DerWriter::new();
        self.write(&mut writer)?;
        Ok(writer.into_bytes())
    }

    pub fn version(&self) -> &Integer {
        &self.version
    }

    pub fn issuer(&self) -> &Name {
        &self.issuer
    }

    pub fn serial_number(&self) -> &Integer {
        &self.serial_number
    }

    pub fn digest_algorithm(&self) -> &AlgorithmIdentifier {
        &self.digest_algorithm
    }

    pub fn authenticated_attributes(&self) -> Option<&AttributeSet> {
        self.authenticated_attributes.as_ref()
    }

    /// The digestEncryptionAlgorithm field.
    pub fn signature_algorithm(&self) -> &AlgorithmIdentifier {
        &self.signature_algorithm
    }

    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    pub fn unauthenticated_attributes(&self) -> Option<&AttributeSet> {
        self.unauthenticated_attributes.as_ref()
    }

    /// The certificate this signer's issuer and serial number point at.
    pub fn certificate<'m>(&self, message: &'m SignedMessage) -> Option<&'m Certificate> {
        message.certificate(&self.serial_number, &self.issuer)
    }

    /// The signer certificate followed by the certificates of the message
    /// that chain up from it, ending at a self-issued one or at the first
    /// issuer the message does not carry.
    pub fn certificate_path<'m>(&self, message: &'m SignedMessage) -> Option<Vec<&'m Certificate>> {
        let signer = self.certificate(message)?;
        let mut path = vec![signer];
        let mut pool: Vec<&Certificate> = match message.certificates() {
            Some(certificates) if !signer.is_self_issued() => certificates.iter().collect(),
            _ => return Some(path),
        };
        let mut issuer = signer.issuer();
        let mut start = 0;
        while let Some(i) = (start..pool.len()).find(|i| pool[*i].subject().canonical_eq(issuer)) {
            let found = pool[i];
            path.push(found);
            if found.is_self_issued() {
                break;
            }
            issuer = found.issuer();
            pool.swap(start, i);
            start += 1;
        }
        Some(path)
    }

    /// The TSTInfo of the SignatureTimestampToken attribute, if present.
    ///
    /// The token's message imprint must be the digest of this signer's
    /// signature.
    pub fn timestamp(&self) -> Result<Option<TimestampToken>> {
        let Some(value) = self
            .unauthenticated_attributes
            .as_ref()
            .and_then(|attrs| attrs.single_value(&oid(pkcs9::SIGNATURE_TIMESTAMP_TOKEN)))
        else {
            return Ok(None);
        };
        let encoded = value.as_bytes().ok_or_else(|| {
            pkcs9::Error::MalformedAttribute("timestamp token is not DER".to_string())
        })?;
        let token = SignedMessage::from_der(encoded).context("timestamp token")?;
        let tst_info = token
            .content_info()
            .data_bytes()?
            .ok_or(tsp::Error::MissingToken)?;
        let tst_info = TimestampToken::from_der(&tst_info)?;

        let algorithm = tst_info.hash_algorithm().algorithm();
        let digest = DigestAlgorithm::from_oid(algorithm)
            .ok_or_else(|| Error::UnsupportedAlgorithm(algorithm.to_string()))?;
        if digest.digest(&self.signature) != tst_info.hashed_message() {
            return Err(tsp::Error::DigestMismatch.into());
        }
        Ok(Some(tst_info))
    }

    /// Checks this signer against `content`, or against the message's own
    /// content when `content` is `None`.
    ///
    /// A signer that does not verify gives `Ok(None)`. Errors are kept for
    /// malformed input, an unknown digest algorithm and a certificate whose
    /// key may not sign.
    pub fn verify<'a, V: SignatureVerifier + ?Sized>(
        &'a self,
        message: &SignedMessage,
        content: Option<&[u8]>,
        verifier: &V,
    ) -> Result<Option<&'a SignerInfo>> {
        let algorithm = self.digest_algorithm.algorithm();
        let digest = DigestAlgorithm::from_oid(algorithm)
            .ok_or_else(|| Error::UnsupportedAlgorithm(algorithm.to_string()))?;

        let content_info = message.content_info();
        let data: Cow<'_, [u8]> = match content {
            Some(content) => Cow::Borrowed(content),
            None => match content_info.data_bytes()? {
                Some(data) => Cow::Owned(data),
                None => Cow::Borrowed(content_info.content_bytes().ok_or(Error::MissingContent)?),
            },
        };

        let signed: Cow<'_, [u8]> = match &self.authenticated_attributes {
            None => data,
            Some(attributes) => {
                let content_type = attributes
                    .single_value(&oid(pkcs9::CONTENT_TYPE))
                    .and_then(Value::as_oid);
                if content_type != Some(content_info.content_type()) {
                    log::warn!(
                        "signer {:x}: contentType attribute does not match {}",
                        self.serial_number,
                        content_info.content_type()
                    );
                    return Ok(None);
                }
                let expected = attributes
                    .single_value(&oid(pkcs9::MESSAGE_DIGEST))
                    .and_then(Value::as_bytes);
                if expected != Some(digest.digest(&data).as_slice()) {
                    log::warn!(
                        "signer {:x}: messageDigest attribute missing or not the {} of the content",
                        self.serial_number,
                        digest
                    );
                    return Ok(None);
                }
                Cow::Borrowed(attributes.der_encoding()?)
            }
        };

        let Some(certificate) = self.certificate(message) else {
            log::warn!(
                "signer {:x}: no certificate issued by {} in the message",
                self.serial_number,
                self.issuer
            );
            return Ok(None);
        };
        let understood = certificate
            .extensions()
            .critical_oids()
            .all(|oid| UNDERSTOOD_CRITICAL_EXTENSIONS.iter().any(|known| *oid == *known));
        if !understood {
            return Err(Error::Certificate(
                "Certificate has unsupported critical extension(s)".to_string(),
            ));
        }
        if let Some(key_usage) = certificate.key_usage()? {
            if !key_usage.digital_signature() && !key_usage.non_repudiation() {
                return Err(Error::KeyUsageRestricted);
            }
        }

        let verified = verifier.verify(
            &self.signature_algorithm,
            digest,
            certificate.public_key_info(),
            &signed,
            &self.signature,
        )?;
        if !verified {
            log::warn!("signer {:x}: signature does not verify", self.serial_number);
            return Ok(None);
        }
        Ok(Some(self))
    }
}

impl fmt::Display for SignerInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Signer Info for (issuer): {}", self.issuer)?;
        writeln!(f, "\tversion: {:x}", self.version)?;
        writeln!(f, "\tcertificateSerialNumber: {:x}", self.serial_number)?;
        writeln!(f, "\tdigestAlgorithm: {}", self.digest_algorithm)?;
        if let Some(attributes) = &self.authenticated_attributes {
            writeln!(f, "\tauthenticatedAttributes: {}", attributes)?;
        }
        writeln!(f, "\tdigestEncryptionAlgorithm: {}", self.signature_algorithm)?;
        write!(f, "\tencryptedDigest:\n{}", hex_dump(&self.signature))?;
        if let Some(attributes) = &self.unauthenticated_attributes {
            write!(f, "\n\tunauthenticatedAttributes: {}", attributes)?;
        }
        Ok(())
    }
}
