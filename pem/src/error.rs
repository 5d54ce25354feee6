use base64::DecodeError;
use thiserror::Error;

/// Errors raised while reading RFC 7468 text.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// No `-----BEGIN ...-----` line was found.
    #[error("missing a pre-encapsulation boundary")]
    MissingPreEncapsulationBoundary,

    #[error("missing a post-encapsulation boundary")]
    MissingPostEncapsulationBoundary,

    #[error("missing PEM data")]
    MissingData,

    #[error("unsupported label '{0}'")]
    InvalidLabel(String),

    /// BEGIN and END lines name different labels.
    #[error("label mismatch: BEGIN {begin}, END {end}")]
    LabelMismatch { begin: String, end: String },

    #[error("expected label {expected}, got {actual}")]
    UnexpectedLabel { expected: String, actual: String },

    #[error("invalid base64 line: '{0}'")]
    InvalidBase64Line(String),

    #[error("base64 decode: {0}")]
    Base64Decode(#[from] DecodeError),
}

pub type Result<T> = std::result::Result<T, Error>;
