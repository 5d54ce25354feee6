/*
RFC 5280 Section 5.1

CertificateList  ::=  SEQUENCE  {
    tbsCertList          TBSCertList,
    signatureAlgorithm   AlgorithmIdentifier,
    signatureValue       BIT STRING  }

TBSCertList  ::=  SEQUENCE  {
    version                 Version OPTIONAL,
    signature               AlgorithmIdentifier,
    issuer                  Name,
    thisUpdate              Time,
    nextUpdate              Time OPTIONAL,
    revokedCertificates     SEQUENCE OF SEQUENCE  {
        userCertificate         CertificateSerialNumber,
        revocationDate          Time,
        crlEntryExtensions      Extensions OPTIONAL
    }  OPTIONAL,
    crlExtensions           [0]  EXPLICIT Extensions OPTIONAL
}
*/

use std::fmt;

use chrono::NaiveDateTime;
use shirushi::decoder::{DecodableFrom, Decoder};
use shirushi_asn1::{DerReadExt, Integer};
use shirushi_der::{DerReader, PrimitiveTag, Tag};
use shirushi_pem::{FromPem, Label, Pem, ToPem};

use super::algorithm::AlgorithmIdentifier;
use super::error::{Error, Result};
use super::name::Name;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevokedCertificate {
    serial_number: Integer,
    revocation_date: NaiveDateTime,
}

impl RevokedCertificate {
    pub fn serial_number(&self) -> &Integer {
        &self.serial_number
    }

    pub fn revocation_date(&self) -> &NaiveDateTime {
        &self.revocation_date
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Crl {
    encoded: Vec<u8>,
    issuer: Name,
    this_update: NaiveDateTime,
    next_update: Option<NaiveDateTime>,
    revoked: Vec<RevokedCertificate>,
    signature_algorithm: AlgorithmIdentifier,
}

fn is_time(tag: Option<Tag>) -> bool {
    matches!(
        tag,
        Some(Tag::Primitive(
            PrimitiveTag::UTCTime | PrimitiveTag::GeneralizedTime,
            _
        ))
    )
}

impl Crl {
    pub fn from_der(bytes: &[u8]) -> Result<Self> {
        let mut reader = DerReader::new(bytes);
        let mut list = reader.read_sequence()?;
        reader.ensure_empty()?;

        let mut tbs = list.read_sequence()?;
        let signature_algorithm = AlgorithmIdentifier::read(&mut list)?;
        list.read_bit_string()?;
        list.ensure_empty()?;

        if tbs.peek_tag() == Some(Tag::INTEGER) {
            tbs.read_small_integer()?;
        }
        AlgorithmIdentifier::read(&mut tbs)?;
        let issuer = Name::read(&mut tbs)?;
        let this_update = tbs.read_time()?;
        let next_update = match is_time(tbs.peek_tag()) {
            true => Some(tbs.read_time()?),
            false => None,
        };
        let mut revoked = Vec::new();
        if tbs.peek_tag() == Some(Tag::SEQUENCE) {
            let mut entries = tbs.read_sequence()?;
            while !entries.is_empty() {
                let mut entry = entries.read_sequence()?;
                revoked.push(RevokedCertificate {
                    serial_number: entry.read_integer()?,
                    revocation_date: entry.read_time()?,
                });
            }
        }
        if tbs.peek_tag().is_some_and(|t| t.is_context_specific(0)) {
            tbs.read_raw()?;
        }
        tbs.ensure_empty()?;

        Ok(Self {
            encoded: bytes.to_vec(),
            issuer,
            this_update,
            next_update,
            revoked,
            signature_algorithm,
        })
    }

    pub fn encoded(&self) -> &[u8] {
        &self.encoded
    }

    pub fn issuer(&self) -> &Name {
        &self.issuer
    }

    pub fn this_update(&self) -> &NaiveDateTime {
        &self.this_update
    }

    pub fn next_update(&self) -> Option<&NaiveDateTime> {
        self.next_update.as_ref()
    }

    pub fn revoked_certificates(&self) -> &[RevokedCertificate] {
        &self.revoked
    }

    pub fn is_revoked(&self, serial_number: &Integer) -> bool {
        self.revoked
            .iter()
            .any(|r| &r.serial_number == serial_number)
    }

    pub fn signature_algorithm(&self) -> &AlgorithmIdentifier {
        &self.signature_algorithm
    }
}

impl fmt::Display for Crl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[Issuer: {}, This Update: {}, Revoked: {}]",
            self.issuer,
            self.this_update,
            self.revoked.len()
        )
    }
}

impl DecodableFrom<Pem> for Crl {}

impl Decoder<Pem, Crl> for Pem {
    type Error = Error;

    fn decode(&self) -> Result<Crl> {
        Crl::from_pem(self)
    }
}

impl FromPem for Crl {
    type Error = Error;

    fn from_pem(pem: &Pem) -> Result<Self> {
        let der = pem.clone().expect_label(&[Label::X509Crl])?;
        Crl::from_der(&der)
    }
}

impl ToPem for Crl {
    type Error = Error;

    fn to_pem(&self) -> Result<Pem> {
        Ok(Pem::new(Label::X509Crl, self.encoded.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::crl_der;

    #[test]
    fn test_crl_fields() {
        let der = crl_der("CN=Root CA", &[3, 5]);
        let crl = Crl::from_der(&der).unwrap();
        assert_eq!("CN=Root CA", crl.issuer().to_string());
        assert_eq!(2, crl.revoked_certificates().len());
        assert!(crl.is_revoked(&Integer::from(5i64)));
        assert!(!crl.is_revoked(&Integer::from(4i64)));
        assert!(crl.next_update().is_none());
        assert_eq!(der, crl.encoded());
    }

    #[test]
    fn test_crl_without_entries() {
        let der = crl_der("CN=Root CA", &[]);
        let crl = Crl::from_der(&der).unwrap();
        assert!(crl.revoked_certificates().is_empty());
        let pem = crl.to_pem().unwrap();
        let back: Crl = pem.decode().unwrap();
        assert_eq!(crl, back);
    }
}
