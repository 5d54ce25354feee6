use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The TSA answered with a status other than granted.
    #[error("Error generating timestamp: {text} {failure}")]
    Status {
        status: i64,
        text: String,
        failure: String,
    },

    #[error("TSAPolicyID changed in timestamp token")]
    PolicyMismatch,

    #[error("Digest algorithm not {0} in timestamp token")]
    DigestAlgorithmMismatch(String),

    #[error("Digest octets changed in timestamp token")]
    DigestMismatch,

    #[error("Nonce missing in timestamp token")]
    NonceMissing,

    #[error("Nonce changed in timestamp token")]
    NonceMismatch,

    #[error("{0}")]
    Certificate(String),

    #[error("the TSA response carries no timestamp token")]
    MissingToken,

    #[error("invalid timestamper configuration: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    #[error("MIME Content-Type is not {expected}, got {actual}")]
    ContentType {
        expected: &'static str,
        actual: String,
    },

    #[error("ASN.1 error: {0}")]
    Asn1(#[from] shirushi_asn1::Error),

    #[error("DER error: {0}")]
    Der(#[from] shirushi_der::Error),

    #[error("X.509 error: {0}")]
    X509(#[from] crate::x509::Error),
}
