/*
RFC 3161 Section 2.4.2

TimeStampResp ::= SEQUENCE  {
   status                  PKIStatusInfo,
   timeStampToken          TimeStampToken     OPTIONAL  }

PKIStatusInfo ::= SEQUENCE {
   status        PKIStatus,
   statusString  PKIFreeText     OPTIONAL,
   failInfo      PKIFailureInfo  OPTIONAL  }

PKIFreeText ::= SEQUENCE SIZE (1..MAX) OF UTF8String

PKIFailureInfo ::= BIT STRING {
   badAlg               (0),
   badRequest           (2),
   badDataFormat        (5),
   timeNotAvailable    (14),
   unacceptedPolicy    (15),
   unacceptedExtension (16),
   addInfoNotAvailable (17),
   systemFailure       (25)  }

TimeStampToken ::= ContentInfo
*/

use std::fmt;

use shirushi_asn1::{BitString, DerReadExt, DerWriteExt};
use shirushi_der::{DerReader, DerWriter, Tag};

use super::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PkiStatus {
    Granted,
    GrantedWithMods,
    Rejection,
    Waiting,
    RevocationWarning,
    RevocationNotification,
}

impl PkiStatus {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(PkiStatus::Granted),
            1 => Some(PkiStatus::GrantedWithMods),
            2 => Some(PkiStatus::Rejection),
            3 => Some(PkiStatus::Waiting),
            4 => Some(PkiStatus::RevocationWarning),
            5 => Some(PkiStatus::RevocationNotification),
            _ => None,
        }
    }

    pub fn code(&self) -> i64 {
        *self as i64
    }

    /// Both granted forms carry a token.
    pub fn is_granted(&self) -> bool {
        matches!(self, PkiStatus::Granted | PkiStatus::GrantedWithMods)
    }

    pub fn text(&self) -> &'static str {
        match self {
            PkiStatus::Granted => "the timestamp request was granted.",
            PkiStatus::GrantedWithMods => {
                "the timestamp request was granted with some modifications."
            }
            PkiStatus::Rejection => "the timestamp request was rejected.",
            PkiStatus::Waiting => "the timestamp request has not yet been processed.",
            PkiStatus::RevocationWarning => "warning: a certificate revocation is imminent.",
            PkiStatus::RevocationNotification => {
                "notification: a certificate revocation has occurred."
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureInfo {
    BadAlg,
    BadRequest,
    BadDataFormat,
    TimeNotAvailable,
    UnacceptedPolicy,
    UnacceptedExtension,
    AddInfoNotAvailable,
    SystemFailure,
}

impl FailureInfo {
    const ALL: [FailureInfo; 8] = [
        FailureInfo::BadAlg,
        FailureInfo::BadRequest,
        FailureInfo::BadDataFormat,
        FailureInfo::TimeNotAvailable,
        FailureInfo::UnacceptedPolicy,
        FailureInfo::UnacceptedExtension,
        FailureInfo::AddInfoNotAvailable,
        FailureInfo::SystemFailure,
    ];

    /// Position of the named bit.
    pub fn bit(&self) -> usize {
        match self {
            FailureInfo::BadAlg => 0,
            FailureInfo::BadRequest => 2,
            FailureInfo::BadDataFormat => 5,
            FailureInfo::TimeNotAvailable => 14,
            FailureInfo::UnacceptedPolicy => 15,
            FailureInfo::UnacceptedExtension => 16,
            FailureInfo::AddInfoNotAvailable => 17,
            FailureInfo::SystemFailure => 25,
        }
    }

    pub fn from_bit(bit: usize) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.bit() == bit)
    }

    pub fn text(&self) -> &'static str {
        match self {
            FailureInfo::BadAlg => "Unrecognized or unsupported algorithm identifier.",
            FailureInfo::BadRequest => "The requested transaction is not permitted or supported.",
            FailureInfo::BadDataFormat => "The data submitted has the wrong format.",
            FailureInfo::TimeNotAvailable => "The TSA's time source is not available.",
            FailureInfo::UnacceptedPolicy => "The requested TSA policy is not supported by the TSA.",
            FailureInfo::UnacceptedExtension => "The requested extension is not supported by the TSA.",
            FailureInfo::AddInfoNotAvailable => {
                "The additional information requested could not be understood or is not available."
            }
            FailureInfo::SystemFailure => "The request cannot be handled due to system failure.",
        }
    }

    /// Smallest bit string with exactly the given bits set.
    pub fn to_bit_string(failures: &[FailureInfo]) -> BitString {
        let Some(highest) = failures.iter().map(|f| f.bit()).max() else {
            return BitString::from_bytes(Vec::new());
        };
        let mut data = vec![0u8; highest / 8 + 1];
        for failure in failures {
            let bit = failure.bit();
            data[bit / 8] |= 0x80 >> (bit % 8);
        }
        let unused = (7 - highest % 8) as u8;
        BitString::new(unused, data).unwrap_or_else(|_| unreachable!("unused bits are below 8"))
    }
}

impl fmt::Display for FailureInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text())
    }
}

/// A TimeStampResp. The token is kept as the raw ContentInfo encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TsResponse {
    status: i64,
    status_strings: Vec<String>,
    failure_info: Option<BitString>,
    token: Option<Vec<u8>>,
    encoded: Vec<u8>,
}

impl TsResponse {
    pub fn new(
        status: i64,
        status_strings: Vec<String>,
        failure_info: Option<BitString>,
        token: Option<Vec<u8>>,
    ) -> Self {
        let mut response = Self {
            status,
            status_strings,
            failure_info,
            token,
            encoded: Vec::new(),
        };
        response.encoded = response.encode_fields();
        response
    }

    /// A granted response around an encoded token.
    pub fn granted(token: Vec<u8>) -> Self {
        Self::new(PkiStatus::Granted.code(), Vec::new(), None, Some(token))
    }

    pub fn from_der(der: &[u8]) -> Result<Self> {
        let mut reader = DerReader::new(der);
        let mut seq = reader.read_sequence()?;
        reader.ensure_empty()?;

        let mut info = seq.read_sequence()?;
        let status = info.read_small_integer()?;
        let mut status_strings = Vec::new();
        if info.peek_tag() == Some(Tag::SEQUENCE) {
            let mut texts = info.read_sequence()?;
            while !texts.is_empty() {
                let content = texts.read_expected(Tag::UTF8_STRING)?;
                let text = String::from_utf8(content.to_vec())
                    .map_err(|_| shirushi_asn1::Error::Utf8StringInvalidUtf8)?;
                status_strings.push(text);
            }
        }
        let failure_info = match info.peek_tag() {
            Some(Tag::BIT_STRING) => Some(info.read_bit_string()?),
            _ => None,
        };
        info.ensure_empty()?;

        let token = if seq.is_empty() {
            None
        } else {
            Some(seq.read_raw()?.to_vec())
        };
        seq.ensure_empty()?;

        Ok(Self {
            status,
            status_strings,
            failure_info,
            token,
            encoded: der.to_vec(),
        })
    }

    fn encode_fields(&self) -> Vec<u8> {
        let mut info = DerWriter::new();
        info.put_small_integer(self.status);
        if !self.status_strings.is_empty() {
            let mut texts = DerWriter::new();
            for text in &self.status_strings {
                texts.put(Tag::UTF8_STRING, text.as_bytes());
            }
            info.put_constructed(Tag::SEQUENCE, &texts);
        }
        if let Some(failure_info) = &self.failure_info {
            info.put_bit_string(failure_info);
        }

        let mut inner = DerWriter::new();
        inner.put_constructed(Tag::SEQUENCE, &info);
        if let Some(token) = &self.token {
            inner.put_raw(token);
        }
        let mut writer = DerWriter::new();
        writer.put_constructed(Tag::SEQUENCE, &inner);
        writer.into_bytes()
    }

    pub fn encode(&self) -> &[u8] {
        &self.encoded
    }

    pub fn status(&self) -> i64 {
        self.status
    }

    pub fn pki_status(&self) -> Option<PkiStatus> {
        PkiStatus::from_code(self.status)
    }

    pub fn status_code_text(&self) -> String {
        match self.pki_status() {
            Some(status) => status.text().to_string(),
            None => format!("unknown status code {}.", self.status),
        }
    }

    pub fn status_strings(&self) -> &[String] {
        &self.status_strings
    }

    /// Named failure bits that are set. Unknown bits are left out.
    pub fn failure_info(&self) -> Vec<FailureInfo> {
        let Some(bits) = &self.failure_info else {
            return Vec::new();
        };
        (0..bits.bit_len())
            .filter(|i| bits.bit(*i))
            .filter_map(FailureInfo::from_bit)
            .collect()
    }

    /// Text for the lowest failure bit set, empty without a failInfo.
    pub fn failure_code_text(&self) -> String {
        let Some(bits) = &self.failure_info else {
            return String::new();
        };
        match (0..bits.bit_len()).find(|i| bits.bit(*i)) {
            Some(bit) => match FailureInfo::from_bit(bit) {
                Some(failure) => failure.text().to_string(),
                None => "unknown failure code".to_string(),
            },
            None => "unknown failure code".to_string(),
        }
    }

    /// Encoded TimeStampToken ContentInfo.
    pub fn token(&self) -> Option<&[u8]> {
        self.token.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;
    use rstest::rstest;

    use super::*;

    #[rstest(
        code,
        expected,
        case(0, "the timestamp request was granted."),
        case(2, "the timestamp request was rejected."),
        case(5, "notification: a certificate revocation has occurred."),
        case(9, "unknown status code 9.")
    )]
    fn test_status_code_text(code: i64, expected: &str) {
        let response = TsResponse::new(code, Vec::new(), None, None);
        assert_eq!(expected, response.status_code_text());
    }

    #[test]
    fn test_rejection_round_trip() {
        let failure = FailureInfo::to_bit_string(&[FailureInfo::BadAlg]);
        let response = TsResponse::new(
            2,
            vec!["algorithm not accepted".to_string()],
            Some(failure),
            None,
        );
        let back = TsResponse::from_der(response.encode()).unwrap();
        assert_eq!(response, back);
        assert_eq!(vec![FailureInfo::BadAlg], back.failure_info());
        assert_eq!(
            "Unrecognized or unsupported algorithm identifier.",
            back.failure_code_text()
        );
        assert_eq!(["algorithm not accepted"], back.status_strings());
        assert!(back.token().is_none());
    }

    #[test]
    fn test_failure_bits() {
        let bits = FailureInfo::to_bit_string(&[FailureInfo::SystemFailure, FailureInfo::BadRequest]);
        assert_eq!(6, bits.unused_bits());
        let response = TsResponse::new(2, Vec::new(), Some(bits), None);
        assert_eq!(
            vec![FailureInfo::BadRequest, FailureInfo::SystemFailure],
            response.failure_info()
        );
        assert_eq!(
            "The requested transaction is not permitted or supported.",
            response.failure_code_text()
        );
    }

    #[test]
    fn test_unknown_failure_bit() {
        // bit 1 has no name
        let bits = BitString::new(6, vec![0x40]).unwrap();
        let response = TsResponse::new(2, Vec::new(), Some(bits), None);
        assert!(response.failure_info().is_empty());
        assert_eq!("unknown failure code", response.failure_code_text());
        assert_eq!("", TsResponse::new(0, Vec::new(), None, None).failure_code_text());
    }

    #[test]
    fn test_decode_granted_with_token() {
        let der = hex!("3009 3003 020100 3002 0500");
        let response = TsResponse::from_der(&der).unwrap();
        assert_eq!(Some(PkiStatus::Granted), response.pki_status());
        assert_eq!(Some(&hex!("3002 0500")[..]), response.token());
        assert_eq!(&der[..], response.encode());
    }
}
