use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("PKCS#7 error: {0}")]
    Pkcs7(#[from] crate::pkcs7::Error),

    #[error("PKCS#8 error: {0}")]
    Pkcs8(#[from] crate::pkcs8::Error),

    #[error("PKCS#9 error: {0}")]
    Pkcs9(#[from] crate::pkcs9::Error),

    #[error("timestamp error: {0}")]
    Tsp(#[from] crate::tsp::Error),

    #[error("X.509 error: {0}")]
    X509(#[from] crate::x509::Error),

    #[error(transparent)]
    Pem(#[from] shirushi_pem::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
