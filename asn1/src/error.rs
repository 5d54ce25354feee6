//! Error types for ASN.1 decoding and encoding.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid boolean")]
    InvalidBoolean,
    #[error("NULL: unexpected content")]
    InvalidNull,

    #[error("INTEGER: no data")]
    IntegerNoData,
    #[error("INTEGER: value out of range for {0}")]
    IntegerOutOfRange(&'static str),

    #[error("OBJECT IDENTIFIER: no data")]
    ObjectIdentifierNoData,
    #[error("OBJECT IDENTIFIER: incomplete encoding")]
    ObjectIdentifierIncompleteEncoding,
    #[error("OBJECT IDENTIFIER: too few components (need at least 2)")]
    ObjectIdentifierTooFewComponents,
    #[error("OBJECT IDENTIFIER: invalid component '{0}'")]
    ObjectIdentifierInvalidComponent(String),

    #[error("BIT STRING: no data")]
    BitStringNoData,
    #[error("BIT STRING: unused bits {0} out of range (must be 0-7)")]
    BitStringUnusedBitsOutOfRange(u8),

    #[error("UTF8String: invalid UTF-8")]
    Utf8StringInvalidUtf8,
    #[error("PrintableString: invalid encoding")]
    PrintableStringInvalidEncoding,
    #[error("IA5String: invalid encoding")]
    Ia5StringInvalidEncoding,
    #[error("BMPString: odd byte length {0}")]
    BmpStringOddLength(usize),
    #[error("BMPString: invalid code point at position {position}: 0x{code_point:04X}")]
    BmpStringInvalidCodePoint { position: usize, code_point: u16 },
    #[error("UniversalString: byte length {0} is not a multiple of 4")]
    UniversalStringInvalidLength(usize),
    #[error("UniversalString: invalid code point 0x{0:08X}")]
    UniversalStringInvalidCodePoint(u32),

    #[error("UTCTime: invalid format '{0}'")]
    UtcTimeInvalidFormat(String),
    #[error("GeneralizedTime: invalid format '{0}'")]
    GeneralizedTimeInvalidFormat(String),

    #[error("invalid context-specific value: {slot}, {msg}")]
    InvalidContextSpecific { slot: u8, msg: String },

    #[error("expected {expected}, got {actual}")]
    UnexpectedElement { expected: &'static str, actual: String },

    #[error("invalid DER encoding: {0}")]
    Der(#[from] shirushi_der::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
