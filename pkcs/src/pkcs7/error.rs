use shirushi_asn1::ObjectIdentifier;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// A field could not be decoded. `context` names the field.
    #[error("malformed {context}: {source}")]
    Malformed {
        context: &'static str,
        #[source]
        source: Box<Error>,
    },

    #[error("content type {0} not supported")]
    UnsupportedContentType(ObjectIdentifier),

    /// Neither the current nor the legacy profile could decode the message.
    #[error("unable to parse the encoded bytes: {modern}; as legacy profile: {legacy}")]
    Unparseable {
        #[source]
        modern: Box<Error>,
        legacy: Box<Error>,
    },

    #[error("unsupported digest algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("no content to verify against")]
    MissingContent,

    #[error("Key usage restricted: cannot be used for digital signatures")]
    KeyUsageRestricted,

    #[error("{0}")]
    Certificate(String),

    /// The signature primitive itself failed, as opposed to a signature
    /// that did not verify.
    #[error("signature error: {0}")]
    Signature(String),

    #[error("timestamp error: {0}")]
    Timestamp(#[from] crate::tsp::Error),

    #[error("PKCS#9 error: {0}")]
    Pkcs9(#[from] crate::pkcs9::Error),

    #[error("X.509 error: {0}")]
    X509(#[from] crate::x509::Error),

    #[error("ASN.1 error: {0}")]
    Asn1(#[from] shirushi_asn1::Error),

    #[error("DER error: {0}")]
    Der(#[from] shirushi_der::Error),

    #[error("PEM error: {0}")]
    Pem(#[from] shirushi_pem::Error),
}

/// Names the field a lower level failure happened in.
pub(crate) trait Context<T> {
    fn context(self, context: &'static str) -> Result<T>;
}

impl<T, E: Into<Error>> Context<T> for std::result::Result<T, E> {
    fn context(self, context: &'static str) -> Result<T> {
        self.map_err(|e| Error::Malformed {
            context,
            source: Box::new(e.into()),
        })
    }
}
