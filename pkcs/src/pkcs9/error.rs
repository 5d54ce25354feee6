//! Error types for PKCS#9

use shirushi_asn1::ObjectIdentifier;
use thiserror::Error;

/// Result type for PKCS#9 operations
pub type Result<T> = std::result::Result<T, Error>;

/// PKCS#9 error types
#[derive(Debug, Error)]
pub enum Error {
    /// The attribute or one of its values does not have the required shape
    #[error("{0}")]
    MalformedAttribute(String),

    /// An attribute set holds the same OID twice
    #[error("Duplicate PKCS9 attribute: {0}")]
    DuplicateAttribute(ObjectIdentifier),

    /// The attribute is outside the set of OIDs a context accepts
    #[error("Attribute {0} not permitted in this attribute set")]
    AttributeNotPermitted(ObjectIdentifier),

    /// A known attribute whose value syntax is not decoded
    #[error("PKCS9 attribute {0} is not supported")]
    UnsupportedAttribute(ObjectIdentifier),

    #[error("No value found for attribute {0}")]
    MissingAttribute(String),

    #[error("Unknown PKCS9 attribute name: {0}")]
    UnknownAttributeName(String),

    /// A value of the wrong kind was given for an attribute
    #[error("{name} expects a {expected} value, got {actual}")]
    ValueMismatch {
        name: &'static str,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("invalid countersignature: {0}")]
    Countersignature(#[source] Box<crate::pkcs7::Error>),

    #[error("ASN.1 error: {0}")]
    Asn1(#[from] shirushi_asn1::Error),

    #[error("DER error: {0}")]
    Der(#[from] shirushi_der::Error),

    #[error("X.509 error: {0}")]
    X509(#[from] crate::x509::Error),
}
