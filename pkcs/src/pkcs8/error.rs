use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

type Cause = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum Error {
    /// The encoding is not a usable OneAsymmetricKey.
    #[error("invalid PKCS#8 key: {reason}")]
    InvalidKey {
        reason: String,
        #[source]
        source: Option<Cause>,
    },

    #[error("PEM error: {0}")]
    Pem(#[from] shirushi_pem::Error),
}

impl Error {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Error::InvalidKey {
            reason: reason.into(),
            source: None,
        }
    }

    fn caused_by(reason: &str, source: impl Into<Cause>) -> Self {
        Error::InvalidKey {
            reason: reason.to_string(),
            source: Some(source.into()),
        }
    }
}

impl From<shirushi_der::Error> for Error {
    fn from(err: shirushi_der::Error) -> Self {
        Error::caused_by("malformed DER", err)
    }
}

impl From<shirushi_asn1::Error> for Error {
    fn from(err: shirushi_asn1::Error) -> Self {
        Error::caused_by("malformed field", err)
    }
}

impl From<crate::x509::Error> for Error {
    fn from(err: crate::x509::Error) -> Self {
        Error::caused_by("invalid algorithm identifier", err)
    }
}

impl From<crate::pkcs9::Error> for Error {
    fn from(err: crate::pkcs9::Error) -> Self {
        Error::caused_by("invalid attributes", err)
    }
}
