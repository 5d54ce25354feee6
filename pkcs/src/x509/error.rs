use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("unsupported certificate version: {0}")]
    UnsupportedVersion(i64),

    #[error("invalid name: {0}")]
    InvalidName(String),

    #[error("invalid {name} extension: {reason}")]
    InvalidExtension { name: &'static str, reason: String },

    #[error("duplicate extension: {0}")]
    DuplicateExtension(String),

    #[error("ASN.1 error: {0}")]
    Asn1(#[from] shirushi_asn1::Error),

    #[error("DER error: {0}")]
    Der(#[from] shirushi_der::Error),

    #[error("PEM error: {0}")]
    Pem(#[from] shirushi_pem::Error),
}
