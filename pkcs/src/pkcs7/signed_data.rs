/*
RFC 2315 Section 9.1

SignedData ::= SEQUENCE {
  version Version,
  digestAlgorithms DigestAlgorithmIdentifiers,
  contentInfo ContentInfo,
  certificates
     [0] IMPLICIT ExtendedCertificatesAndCertificates
       OPTIONAL,
  crls
    [1] IMPLICIT CertificateRevocationLists OPTIONAL,
  signerInfos SignerInfos }

DigestAlgorithmIdentifiers ::=
  SET OF DigestAlgorithmIdentifier

SignerInfos ::= SET OF SignerInfo

Legacy profile (OldSignedData):

  SEQUENCE {
    version, digestAlgorithms, contentInfo (bare content),
    certificates SET OF Certificate,
    crls SET OF CertificateRevocationList,
    signerInfos SET OF SignerInfo (plain attribute SETs) }

Netscape certificate sequence: SEQUENCE OF Certificate
*/

use std::fmt;
use std::sync::OnceLock;

use shirushi::decoder::{DecodableFrom, Decoder};
use shirushi_asn1::{DerReadExt, DerWriteExt, Integer, ObjectIdentifier};
use shirushi_der::{DerReader, DerWriter, Tag};
use shirushi_pem::{FromPem, Label, Pem, ToPem};

use super::content_info::ContentInfo;
use super::error::{Context, Error, Result};
use super::signer_info::{SignatureVerifier, SignerInfo};
use super::{NETSCAPE_CERT_SEQUENCE, OLD_SIGNED_DATA, SIGNED_DATA, oid};
use crate::digest::DigestAlgorithm;
use crate::pkcs9::{self, Attribute, AttributeSet, Value};
use crate::tsp::{self, TimestampToken, Timestamper, TsRequest};
use crate::x509::{
    AlgorithmIdentifier, Certificate, Crl, EXTENDED_KEY_USAGE, KP_TIME_STAMPING, Name,
};

/// A decoded PKCS#7 SignedData (or Netscape certificate sequence).
#[derive(Debug, Clone)]
pub struct SignedMessage {
    content_type: ObjectIdentifier,
    version: Option<Integer>,
    digest_algorithm_ids: Vec<AlgorithmIdentifier>,
    content_info: ContentInfo,
    certificates: Option<Vec<Certificate>>,
    crls: Option<Vec<Crl>>,
    signer_infos: Vec<SignerInfo>,
    old_style: bool,
    // canonical issuer of each certificate, by index
    canonical_issuers: OnceLock<Vec<String>>,
}

impl SignedMessage {
    pub fn new(
        digest_algorithm_ids: Vec<AlgorithmIdentifier>,
        content_info: ContentInfo,
        certificates: Option<Vec<Certificate>>,
        crls: Option<Vec<Crl>>,
        signer_infos: Vec<SignerInfo>,
    ) -> Self {
        Self {
            content_type: oid(SIGNED_DATA),
            version: Some(Integer::from(1i64)),
            digest_algorithm_ids,
            content_info,
            certificates,
            crls,
            signer_infos,
            old_style: false,
            canonical_issuers: OnceLock::new(),
        }
    }

    /// Decodes the current profile, falling back to the legacy profile.
    ///
    /// When both fail the error carries both causes. An unsupported content
    /// type is reported as is since both profiles place the type identically.
    pub fn from_der(der: &[u8]) -> Result<Self> {
        let mut reader = DerReader::new(der);
        reader.mark();
        let message = match Self::parse(&mut reader, false) {
            Ok(message) => message,
            Err(e @ Error::UnsupportedContentType(_)) => return Err(e),
            Err(modern) => {
                log::debug!("not a current profile message ({}), trying legacy profile", modern);
                reader.reset();
                match Self::parse(&mut reader, true) {
                    Ok(mut message) => {
                        message.old_style = true;
                        message
                    }
                    Err(legacy) => {
                        return Err(Error::Unparseable {
                            modern: Box::new(modern),
                            legacy: Box::new(legacy),
                        });
                    }
                }
            }
        };
        if !reader.is_empty() {
            log::debug!("ignoring {} bytes after the message", reader.available());
        }
        Ok(message)
    }

    fn parse(reader: &mut DerReader<'_>, legacy: bool) -> Result<Self> {
        let outer = ContentInfo::read(reader, legacy)?;
        let content_type = outer.content_type().clone();
        let content = outer
            .content()
            .ok_or(shirushi_der::Error::EndOfInput)
            .context("SignedData content")?;

        let mut message = if content_type == SIGNED_DATA {
            Self::parse_signed_data(content)?
        } else if content_type == OLD_SIGNED_DATA {
            Self::parse_old_signed_data(content)?
        } else if content_type == NETSCAPE_CERT_SEQUENCE {
            Self::parse_netscape_cert_chain(content)?
        } else {
            return Err(Error::UnsupportedContentType(content_type));
        };
        message.content_type = content_type;
        Ok(message)
    }

    fn parse_signed_data(content: &[u8]) -> Result<Self> {
        let mut reader = DerReader::new(content);
        let mut seq = reader.read_sequence().context("SignedData")?;
        let version = seq.read_integer().context("SignedData version")?;
        let digest_algorithm_ids = read_digest_algorithms(&mut seq)?;
        let content_info = ContentInfo::read(&mut seq, false)?;

        let certificates = if seq.peek_tag() == Some(Tag::context(0)) {
            let choices = seq.read_set_of(0, true).context("certificates")?;
            Some(read_certificate_choices(&choices)?)
        } else {
            None
        };
        let crls = if seq.peek_tag() == Some(Tag::context(1)) {
            let encoded = seq.read_set_of(0, true).context("crls")?;
            let crls = encoded
                .into_iter()
                .map(|crl| Crl::from_der(crl).context("crls"))
                .collect::<Result<Vec<_>>>()?;
            Some(crls)
        } else {
            None
        };

        let signer_infos = seq
            .read_set_of(0, false)
            .context("signerInfos")?
            .into_iter()
            .map(|raw| SignerInfo::read(&mut DerReader::new(raw), false))
            .collect::<Result<Vec<_>>>()?;
        seq.ensure_empty().context("SignedData")?;

        Ok(Self {
            version: Some(version),
            digest_algorithm_ids,
            content_info,
            certificates,
            crls,
            signer_infos,
            ..Self::new(Vec::new(), ContentInfo::detached(), None, None, Vec::new())
        })
    }

    fn parse_old_signed_data(content: &[u8]) -> Result<Self> {
        let mut reader = DerReader::new(content);
        let mut seq = reader.read_sequence().context("OldSignedData")?;
        let version = seq.read_integer().context("OldSignedData version")?;
        let digest_algorithm_ids = read_digest_algorithms(&mut seq)?;
        let content_info = ContentInfo::read(&mut seq, true)?;

        let certificates = seq
            .read_set_of(0, false)
            .context("certificates")?
            .into_iter()
            .map(|cert| Certificate::from_der(cert).context("certificates"))
            .collect::<Result<Vec<_>>>()?;
        // CRLs of the legacy profile are not kept
        seq.read_set_of(0, false).context("crls")?;

        let signer_infos = seq
            .read_set_of(0, false)
            .context("signerInfos")?
            .into_iter()
            .map(|raw| SignerInfo::read(&mut DerReader::new(raw), true))
            .collect::<Result<Vec<_>>>()?;
        seq.ensure_empty().context("OldSignedData")?;

        Ok(Self {
            version: Some(version),
            digest_algorithm_ids,
            content_info,
            certificates: Some(certificates),
            signer_infos,
            ..Self::new(Vec::new(), ContentInfo::detached(), None, None, Vec::new())
        })
    }

    fn parse_netscape_cert_chain(content: &[u8]) -> Result<Self> {
        let mut reader = DerReader::new(content);
        let mut seq = reader.read_sequence().context("certificate sequence")?;
        let mut certificates = Vec::new();
        while !seq.is_empty() {
            let encoded = seq.read_raw().context("certificate sequence")?;
            certificates.push(Certificate::from_der(encoded).context("certificate sequence")?);
        }
        Ok(Self {
            version: None,
            certificates: Some(certificates),
            ..Self::new(Vec::new(), ContentInfo::detached(), None, None, Vec::new())
        })
    }

    /// The outer content type: signedData, legacy signedData or the
    /// Netscape certificate sequence.
    pub fn content_type(&self) -> &ObjectIdentifier {
        &self.content_type
    }

    /// Absent for a Netscape certificate sequence.
    pub fn version(&self) -> Option<&Integer> {
        self.version.as_ref()
    }

    pub fn digest_algorithm_ids(&self) -> &[AlgorithmIdentifier] {
        &self.digest_algorithm_ids
    }

    pub fn content_info(&self) -> &ContentInfo {
        &self.content_info
    }

    /// `None` when the certificates field was omitted, which is not the
    /// same as an empty set.
    pub fn certificates(&self) -> Option<&[Certificate]> {
        self.certificates.as_deref()
    }

    pub fn crls(&self) -> Option<&[Crl]> {
        self.crls.as_deref()
    }

    pub fn signer_infos(&self) -> &[SignerInfo] {
        &self.signer_infos
    }

    /// Whether the message was decoded with the legacy profile.
    pub fn is_old_style(&self) -> bool {
        self.old_style
    }

    /// The certificate with `serial_number` whose issuer matches `issuer`
    /// after canonicalization.
    pub fn certificate(&self, serial_number: &Integer, issuer: &Name) -> Option<&Certificate> {
        let certificates = self.certificates.as_deref()?;
        let issuers = self.canonical_issuers.get_or_init(|| {
            certificates
                .iter()
                .map(|cert| cert.issuer().canonical())
                .collect()
        });
        let wanted = issuer.canonical();
        certificates
            .iter()
            .zip(issuers)
            .find(|(cert, canonical)| cert.serial_number() == serial_number && **canonical == wanted)
            .map(|(cert, _)| cert)
    }

    pub fn verify_signer<'a, V: SignatureVerifier + ?Sized>(
        &self,
        info: &'a SignerInfo,
        content: Option<&[u8]>,
        verifier: &V,
    ) -> Result<Option<&'a SignerInfo>> {
        info.verify(self, content, verifier)
    }

    /// Signers that verify over `content` (or the message's own content).
    /// `None` when no signer verifies.
    pub fn verify<V: SignatureVerifier + ?Sized>(
        &self,
        content: Option<&[u8]>,
        verifier: &V,
    ) -> Result<Option<Vec<&SignerInfo>>> {
        let mut verified = Vec::new();
        for info in &self.signer_infos {
            if let Some(info) = self.verify_signer(info, content, verifier)? {
                verified.push(info);
            }
        }
        Ok((!verified.is_empty()).then_some(verified))
    }

    /// The current profile SignedData wrapped in its ContentInfo. Empty or
    /// absent certificate and CRL sets are left out.
    pub fn encode_signed_data(&self) -> Result<Vec<u8>> {
        let mut inner = DerWriter::new();
        inner.put_integer(self.version.as_ref().unwrap_or(&Integer::from(1i64)));
        let algorithms: Vec<Vec<u8>> = self
            .digest_algorithm_ids
            .iter()
            .map(AlgorithmIdentifier::to_der)
            .collect();
        inner.put_ordered_set_of(Tag::SET, &algorithms);
        self.content_info.write(&mut inner);
        if let Some(certificates) = self.certificates.as_deref().filter(|c| !c.is_empty()) {
            let encoded: Vec<&[u8]> = certificates.iter().map(Certificate::encoded).collect();
            inner.put_ordered_set_of(Tag::context(0), &encoded);
        }
        if let Some(crls) = self.crls.as_deref().filter(|c| !c.is_empty()) {
            let encoded: Vec<&[u8]> = crls.iter().map(Crl::encoded).collect();
            inner.put_ordered_set_of(Tag::context(1), &encoded);
        }
        let signers = self
            .signer_infos
            .iter()
            .map(SignerInfo::to_der)
            .collect::<Result<Vec<_>>>()?;
        inner.put_ordered_set_of(Tag::SET, &signers);

        let mut signed_data = DerWriter::new();
        signed_data.put_constructed(Tag::SEQUENCE, &inner);
        Ok(ContentInfo::new(oid(SIGNED_DATA), Some(signed_data.into_bytes())).to_der())
    }

    /// Builds a single-signer message around an already computed
    /// `signature`.
    ///
    /// The digest algorithm is the one `signature_algorithm` hashes with.
    /// With a `timestamper` the signature is timestamped (SHA-256 unless
    /// `tsa_digest` says otherwise) and the token attached as an
    /// unauthenticated SignatureTimestampToken attribute.
    pub fn generate_signed_data(
        signature: &[u8],
        signer_chain: &[Certificate],
        content: Option<&[u8]>,
        signature_algorithm: &AlgorithmIdentifier,
        timestamper: Option<&dyn Timestamper>,
        tsa_policy_id: Option<&ObjectIdentifier>,
        tsa_digest: Option<DigestAlgorithm>,
    ) -> Result<Vec<u8>> {
        let signer = signer_chain
            .first()
            .ok_or_else(|| Error::Certificate("signer chain is empty".to_string()))?;
        let digest = DigestAlgorithm::for_signature_algorithm(signature_algorithm.algorithm())
            .ok_or_else(|| Error::UnsupportedAlgorithm(signature_algorithm.algorithm().to_string()))?;

        let unauthenticated_attributes = match timestamper {
            Some(timestamper) => {
                let token = Self::generate_timestamp_token(
                    timestamper,
                    tsa_policy_id,
                    tsa_digest.unwrap_or(DigestAlgorithm::Sha256),
                    signature,
                )?;
                let attribute = Attribute::new(
                    oid(pkcs9::SIGNATURE_TIMESTAMP_TOKEN),
                    Value::Der(token),
                )?;
                Some(AttributeSet::from_attributes(vec![attribute])?)
            }
            None => None,
        };

        let signer_info = SignerInfo::new(
            signer.issuer().clone(),
            signer.serial_number().clone(),
            digest.algorithm_identifier(),
            None,
            signature_algorithm.clone(),
            signature.to_vec(),
            unauthenticated_attributes,
        );
        let content_info = match content {
            Some(content) => ContentInfo::data(content),
            None => ContentInfo::detached(),
        };
        Self::new(
            vec![digest.algorithm_identifier()],
            content_info,
            Some(signer_chain.to_vec()),
            None,
            vec![signer_info],
        )
        .encode_signed_data()
    }

    /// Requests a timestamp over `to_be_timestamped` and checks that the
    /// token answers that request. Returns the token's encoding.
    pub fn generate_timestamp_token<T: Timestamper + ?Sized>(
        timestamper: &T,
        policy_id: Option<&ObjectIdentifier>,
        digest: DigestAlgorithm,
        to_be_timestamped: &[u8],
    ) -> Result<Vec<u8>> {
        let nonce = Integer::from(rand::random::<u64>());
        let request = TsRequest::new(policy_id.cloned(), to_be_timestamped, digest)
            .with_nonce(nonce.clone())
            .request_certificate(true);
        let reply = timestamper.generate_timestamp(&request)?;

        if !reply.pki_status().is_some_and(|s| s.is_granted()) {
            return Err(tsp::Error::Status {
                status: reply.status(),
                text: reply.status_code_text(),
                failure: reply.failure_code_text(),
            }
            .into());
        }
        let encoded = reply.token().ok_or(tsp::Error::MissingToken)?;
        let token = SignedMessage::from_der(encoded).context("timestamp token")?;
        let tst_info = token
            .content_info()
            .data_bytes()?
            .ok_or(tsp::Error::MissingToken)?;
        let tst_info = TimestampToken::from_der(&tst_info)?;

        if policy_id.is_some_and(|policy_id| policy_id != tst_info.policy_id()) {
            return Err(tsp::Error::PolicyMismatch.into());
        }
        if !tst_info.hash_algorithm().same_algorithm(request.hash_algorithm()) {
            return Err(tsp::Error::DigestAlgorithmMismatch(digest.name().to_string()).into());
        }
        if tst_info.hashed_message() != request.hashed_message() {
            return Err(tsp::Error::DigestMismatch.into());
        }
        match tst_info.nonce() {
            None => return Err(tsp::Error::NonceMissing.into()),
            Some(reply_nonce) if *reply_nonce != nonce => {
                return Err(tsp::Error::NonceMismatch.into());
            }
            Some(_) => {}
        }

        for signer in token.signer_infos() {
            let certificate = signer.certificate(&token).ok_or_else(|| {
                tsp::Error::Certificate("Certificate not included in timestamp token".to_string())
            })?;
            let critical = certificate
                .extension(EXTENDED_KEY_USAGE)
                .is_some_and(|ext| ext.is_critical());
            let timestamping = certificate
                .extended_key_usage()?
                .is_some_and(|eku| eku.contains(KP_TIME_STAMPING));
            if !critical || !timestamping {
                return Err(tsp::Error::Certificate(
                    "Certificate is not valid for timestamping".to_string(),
                )
                .into());
            }
        }
        log::info!(
            "timestamp token {:x} from {}",
            tst_info.serial_number(),
            tst_info.gen_time().format("%Y-%m-%d %H:%M:%S UTC")
        );
        Ok(encoded.to_vec())
    }
}

fn read_digest_algorithms(seq: &mut DerReader<'_>) -> Result<Vec<AlgorithmIdentifier>> {
    seq.read_set_of(0, false)
        .context("digestAlgorithms")?
        .into_iter()
        .map(|alg| AlgorithmIdentifier::from_der(alg).context("digestAlgorithms"))
        .collect()
}

/// Certificates among the CertificateChoices; the other alternatives are
/// skipped.
fn read_certificate_choices(choices: &[&[u8]]) -> Result<Vec<Certificate>> {
    let mut certificates = Vec::with_capacity(choices.len());
    for choice in choices {
        match DerReader::new(choice).peek_tag() {
            Some(tag) if tag == Tag::SEQUENCE => {
                certificates.push(Certificate::from_der(choice).context("certificates")?)
            }
            Some(tag) => log::debug!("skipping CertificateChoices alternative with tag {}", tag),
            None => {}
        }
    }
    Ok(certificates)
}

impl fmt::Display for SignedMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let profile = if self.old_style { "legacy" } else { "current" };
        writeln!(f, "PKCS7 ({} profile) :: content type: {}", profile, self.content_type)?;
        if let Some(version) = &self.version {
            writeln!(f, "PKCS7 :: version: {}", version)?;
        }
        writeln!(f, "PKCS7 :: digest AlgorithmIds:")?;
        for algorithm in &self.digest_algorithm_ids {
            writeln!(f, "\t{}", algorithm)?;
        }
        writeln!(f, "PKCS7 :: content info: {}", self.content_info)?;
        if let Some(certificates) = &self.certificates {
            writeln!(f, "PKCS7 :: certificates:")?;
            for (i, certificate) in certificates.iter().enumerate() {
                writeln!(f, "\t{}. {}", i, certificate)?;
            }
        }
        if let Some(crls) = &self.crls {
            writeln!(f, "PKCS7 :: crls:")?;
            for (i, crl) in crls.iter().enumerate() {
                writeln!(f, "\t{}. {}", i, crl)?;
            }
        }
        write!(f, "PKCS7 :: signer infos:")?;
        for (i, info) in self.signer_infos.iter().enumerate() {
            write!(f, "\n\t{}. {}", i, info)?;
        }
        Ok(())
    }
}

impl DecodableFrom<Pem> for SignedMessage {}

impl Decoder<Pem, SignedMessage> for Pem {
    type Error = Error;

    fn decode(&self) -> Result<SignedMessage> {
        SignedMessage::from_pem(self)
    }
}

impl FromPem for SignedMessage {
    type Error = Error;

    fn from_pem(pem: &Pem) -> Result<Self> {
        let der = pem.clone().expect_label(&[Label::Pkcs7, Label::Cms])?;
        SignedMessage::from_der(&der)
    }
}

impl ToPem for SignedMessage {
    type Error = Error;

    fn to_pem(&self) -> Result<Pem> {
        Ok(Pem::new(Label::Pkcs7, self.encode_signed_data()?))
    }
}
